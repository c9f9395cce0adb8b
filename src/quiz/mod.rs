pub mod adaptive;
pub mod ai_helper;
pub mod parser;
pub mod progress;
pub mod prompts;

use std::fmt;

/// Letter of a multiple choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
            Letter::C => 'C',
            Letter::D => 'D',
        }
    }

    /// Reads the leading letter token of a recorded answer.
    ///
    /// Accepts "B", "B.", "B) text", "**B**" and "B. full choice text".
    /// A capital that starts a longer word ("Because ...") is not a letter
    /// token.
    pub fn from_answer(answer: &str) -> Option<Self> {
        let trimmed = answer.trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '*' | '(' | '[' | '_')
        });
        let mut chars = trimmed.chars();
        let letter = chars.next().and_then(Letter::from_char)?;
        match chars.next() {
            Some(next) if next.is_alphanumeric() => None,
            _ => Some(letter),
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Choice {
    pub letter: Letter,
    pub text: String,
}

impl Choice {
    pub fn new(letter: Letter, text: String) -> Self {
        Self { letter, text }
    }

    /// Recognises a "A. option" line. Returns `None` for anything else.
    pub fn from_line(line: &str) -> Option<Self> {
        let mut chars = line.chars();
        let letter = chars.next().and_then(Letter::from_char)?;
        let rest = chars.as_str().strip_prefix('.')?;
        Some(Self::new(letter, rest.trim().to_string()))
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.letter, self.text)
    }
}

/// A multiple choice question recovered from model output.
///
/// Every field may be empty: parsing is best-effort, so callers must cope
/// with a question that has no choices or no usable answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedQuestion {
    pub text: String,
    pub choices: Vec<Choice>,
    /// The answer as the model wrote it, usually a bare letter but
    /// sometimes "B. full choice text".
    pub correct: String,
    pub explanation: String,
}

impl GeneratedQuestion {
    pub fn new(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }

    pub fn correct_letter(&self) -> Option<Letter> {
        Letter::from_answer(&self.correct)
    }

    pub fn choice(&self, letter: Letter) -> Option<&Choice> {
        self.choices.iter().find(|c| c.letter == letter)
    }

    pub fn letters(&self) -> Vec<Letter> {
        self.choices.iter().map(|c| c.letter).collect()
    }

    /// Grades a selection. An answer that names no presented choice can
    /// never be matched, so everything is marked incorrect.
    pub fn is_correct(&self, selected: Letter) -> bool {
        match self.correct_letter() {
            Some(correct) => correct == selected && self.choice(correct).is_some(),
            None => false,
        }
    }

    pub fn is_answerable(&self) -> bool {
        !self.choices.is_empty()
    }
}

/// The easy/medium/hard ladder walked by the adaptive quiz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const LADDER: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn index(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }

    pub fn harder(self) -> Self {
        Self::LADDER[(self.index() + 1).min(Self::LADDER.len() - 1)]
    }

    pub fn easier(self) -> Self {
        Self::LADDER[self.index().saturating_sub(1)]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::LADDER
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much the learner already knows about the subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LearnerLevel {
    LacksFoundation,
    #[default]
    UnderstandsALittle,
    UnderstandsSomewhat,
    UnderstandsALot,
}

impl LearnerLevel {
    pub const ALL: [LearnerLevel; 4] = [
        LearnerLevel::LacksFoundation,
        LearnerLevel::UnderstandsALittle,
        LearnerLevel::UnderstandsSomewhat,
        LearnerLevel::UnderstandsALot,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LearnerLevel::LacksFoundation => "Lacks Foundation",
            LearnerLevel::UnderstandsALittle => "Understands a Little",
            LearnerLevel::UnderstandsSomewhat => "Understands Somewhat",
            LearnerLevel::UnderstandsALot => "Understands a Lot",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.label() == label.trim())
    }
}

impl fmt::Display for LearnerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const MIN_LESSONS: u32 = 3;
pub const MAX_LESSONS: u32 = 20;

const FOUNDATION_LESSONS: u32 = 3;
const FOUNDATION_CURRICULUM_NOTE: &str = " The first three lessons should cover the prerequisite knowledge \
a learner needs before the main subject, focusing on foundational concepts that are often missing or assumed.";
const FOUNDATION_LESSON_NOTE: &str = " Introduce and clearly explain any background ideas or terminology \
needed for later lessons. Assume no prior knowledge and keep the explanation beginner-friendly.";

/// Everything the learner told us before the curriculum was generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LearnerProfile {
    pub subject: String,
    pub level: LearnerLevel,
    pub lesson_count: u32,
    pub mistakes: String,
    pub challenges: String,
}

impl LearnerProfile {
    /// Learners without a foundation get extra prerequisite lessons up front.
    pub fn effective_lesson_count(&self) -> u32 {
        match self.level {
            LearnerLevel::LacksFoundation => self.lesson_count + FOUNDATION_LESSONS,
            _ => self.lesson_count,
        }
    }

    pub fn curriculum_mistakes(&self) -> String {
        match self.level {
            LearnerLevel::LacksFoundation => format!("{}{}", self.mistakes, FOUNDATION_CURRICULUM_NOTE),
            _ => self.mistakes.clone(),
        }
    }

    pub fn lesson_mistakes(&self, lesson_index: usize) -> String {
        match self.level {
            LearnerLevel::LacksFoundation if lesson_index < 2 => {
                format!("{}{}", self.mistakes, FOUNDATION_LESSON_NOTE)
            }
            _ => self.mistakes.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LessonExample {
    pub label: String,
    pub text: String,
}

/// A generated lesson: explanation, worked examples and the embedded quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LessonRecord {
    pub title: String,
    pub explanation: String,
    pub examples: Vec<LessonExample>,
    /// Keyed by 1-based question number, in the order the model wrote them.
    pub quiz: std::collections::BTreeMap<usize, GeneratedQuestion>,
    /// Everything before the quiz marker, shown to the learner as is.
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_letter_tokens() {
        assert_eq!(Letter::from_answer("B"), Some(Letter::B));
        assert_eq!(Letter::from_answer(" C. Photosynthesis"), Some(Letter::C));
        assert_eq!(Letter::from_answer("**D**"), Some(Letter::D));
        assert_eq!(Letter::from_answer("A) mass"), Some(Letter::A));
        assert_eq!(Letter::from_answer("Because of gravity"), None);
        assert_eq!(Letter::from_answer("E"), None);
        assert_eq!(Letter::from_answer(""), None);
    }

    #[test]
    fn choice_lines() {
        let choice = Choice::from_line("C. Newton's third law").unwrap();
        assert_eq!(choice.letter, Letter::C);
        assert_eq!(choice.text, "Newton's third law");
        assert_eq!(choice.to_string(), "C. Newton's third law");
        assert!(Choice::from_line("Choose wisely").is_none());
        assert!(Choice::from_line("A) no dot").is_none());
    }

    #[test]
    fn mismatched_answer_is_never_correct() {
        let question = GeneratedQuestion {
            text: "Pick one".into(),
            choices: vec![
                Choice::new(Letter::A, "one".into()),
                Choice::new(Letter::B, "two".into()),
            ],
            correct: "D".into(),
            explanation: String::new(),
        };
        for letter in Letter::ALL {
            assert!(!question.is_correct(letter));
        }
    }

    #[test]
    fn full_text_answer_matches_on_letter() {
        let question = GeneratedQuestion {
            text: "Pick one".into(),
            choices: vec![
                Choice::new(Letter::A, "one".into()),
                Choice::new(Letter::B, "two".into()),
            ],
            correct: "B. two".into(),
            explanation: String::new(),
        };
        assert!(question.is_correct(Letter::B));
        assert!(!question.is_correct(Letter::A));
    }

    #[test]
    fn difficulty_ladder_clamps() {
        assert_eq!(Difficulty::Hard.harder(), Difficulty::Hard);
        assert_eq!(Difficulty::Easy.easier(), Difficulty::Easy);
        assert_eq!(Difficulty::Medium.harder(), Difficulty::Hard);
        assert_eq!(Difficulty::Medium.easier(), Difficulty::Easy);
        assert_eq!(Difficulty::parse(" Hard "), Some(Difficulty::Hard));
    }

    #[test]
    fn foundation_profile_adds_lessons() {
        let profile = LearnerProfile {
            subject: "Physics".into(),
            level: LearnerLevel::LacksFoundation,
            lesson_count: 5,
            ..LearnerProfile::default()
        };
        assert_eq!(profile.effective_lesson_count(), 8);
        assert!(profile.curriculum_mistakes().contains("prerequisite"));
        assert!(profile.lesson_mistakes(1).contains("background"));
        assert_eq!(profile.lesson_mistakes(2), "");

        let confident = LearnerProfile {
            level: LearnerLevel::UnderstandsALot,
            ..profile
        };
        assert_eq!(confident.effective_lesson_count(), 5);
    }
}
