use std::fmt::Write;

use crate::quiz::{Difficulty, LearnerLevel, LearnerProfile, LessonRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Curriculum,
    Lesson,
    AdaptiveQuestion,
}

impl PromptKind {
    fn template(&self) -> &'static str {
        match self {
            PromptKind::Curriculum => CURRICULUM_TEMPLATE,
            PromptKind::Lesson => LESSON_TEMPLATE,
            PromptKind::AdaptiveQuestion => ADAPTIVE_QUESTION_TEMPLATE,
        }
    }
}

const CURRICULUM_TEMPLATE: &str = "Create a structured curriculum of {lesson_count} lesson topics for the subject: {topic}.
The learner's level of understanding is \"{level}\". Learning challenges: {challenges}. Mistakes and difficult areas: {mistakes}.
Take the level and the challenges into account when ordering the lessons and keep every lesson topic under 10 words.
Return only the numbered list:
1. ...
2. ...
3. ...";

const LESSON_TEMPLATE: &str = "You are a helpful and engaging tutor.

Write a personalized lesson for:
- Lesson title: {lesson}
- Broader unit: {topic}
- Level: {level}
- Learning challenges: {challenges} (adapt the explanation style, use analogies where they help)
- Mistakes: {mistakes} (address these directly, with clarification and repetition)

The lesson must contain:
1. A clear explanation of the key concepts (about two paragraphs)
2. Two examples, one basic and one advanced
3. A 3-question multiple choice quiz on the explanation and the examples

Use exactly this format:

**Title:** [Title]

**Explanation:**
[Explanation]

**Example 1: Basic**
[Example]

**Example 2: Advanced**
[Example]

**Quiz:**

**Q1:** [Question]
A. [Option]
B. [Option]
C. [Option]
D. [Option]
**Answer:** [Correct letter]

**Q2:** [Question]
A. [Option]
B. [Option]
C. [Option]
D. [Option]
**Answer:** [Correct letter]

**Q3:** [Question]
A. [Option]
B. [Option]
C. [Option]
D. [Option]
**Answer:** [Correct letter]";

const ADAPTIVE_QUESTION_TEMPLATE: &str = "You are a helpful tutor. Write one UNIQUE multiple choice question about \"{topic}\" at \"{difficulty}\" difficulty.
This is question #{question_number}, make sure it differs from earlier questions.

easy: definitions, simple concepts, direct applications
medium: relationships between concepts, multi-step reasoning, analysis
hard: advanced concepts, synthesis, critical thinking, complex scenarios

Use this EXACT format:

Question: <question>

A. <option>
B. <option>
C. <option>
D. <option>

**Correct Answer: X**

Explanation: <one sentence on why the answer is correct>

Vary which letter is correct and make sure exactly one option is clearly right.";

/// Named values substituted into a template. Values are inserted verbatim,
/// empty strings included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptFields {
    fields: Vec<(&'static str, String)>,
}

impl PromptFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn curriculum(profile: &LearnerProfile) -> Self {
        Self::new()
            .with("topic", &profile.subject)
            .with("level", profile.level)
            .with("lesson_count", profile.effective_lesson_count())
            .with("challenges", &profile.challenges)
            .with("mistakes", profile.curriculum_mistakes())
    }

    pub fn lesson(profile: &LearnerProfile, lesson_index: usize, lesson: &str) -> Self {
        Self::new()
            .with("lesson", lesson)
            .with("topic", &profile.subject)
            .with("level", profile.level)
            .with("challenges", &profile.challenges)
            .with("mistakes", profile.lesson_mistakes(lesson_index))
    }

    pub fn adaptive_question(topic: &str, difficulty: Difficulty, question_number: u32) -> Self {
        Self::new()
            .with("topic", topic)
            .with("difficulty", difficulty)
            .with("question_number", question_number)
    }

    /// Practice questions reuse the adaptive template, pitched at the
    /// learner's level instead of a ladder rung.
    pub fn practice_question(topic: &str, level: LearnerLevel, question_number: u32) -> Self {
        Self::new()
            .with("topic", topic)
            .with("difficulty", level)
            .with("question_number", question_number)
    }
}

pub fn build(kind: PromptKind, fields: &PromptFields) -> String {
    fill(kind.template(), fields)
}

/// Replaces every `{name}` in `template` in a single pass, so braces inside
/// substituted values are never expanded again. A placeholder with no value
/// renders empty; text that is not a `{identifier}` is copied unchanged.
pub fn fill(template: &str, fields: &PromptFields) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                out.push_str(fields.get(&after[..close]).unwrap_or_default());
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

/// Writes a lesson back out in the format the lesson template asks for.
pub fn format_lesson(lesson: &LessonRecord) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "**Title:** {}\n", lesson.title);
    let _ = writeln!(out, "**Explanation:**\n{}\n", lesson.explanation);
    for (i, example) in lesson.examples.iter().enumerate() {
        let _ = writeln!(out, "**Example {}: {}**\n{}\n", i + 1, example.label, example.text);
    }
    if !lesson.quiz.is_empty() {
        let _ = writeln!(out, "**Quiz:**\n");
        for (number, question) in &lesson.quiz {
            let _ = writeln!(out, "**Q{}:** {}", number, question.text);
            for choice in &question.choices {
                let _ = writeln!(out, "{}", choice);
            }
            let _ = writeln!(out, "**Answer:** {}\n", question.correct);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_named_fields() {
        let fields = PromptFields::new().with("topic", "Optics").with("level", "hard");
        assert_eq!(fill("{topic} at {level}", &fields), "Optics at hard");
    }

    #[test]
    fn values_are_inserted_verbatim() {
        let fields = PromptFields::new()
            .with("topic", "{level}")
            .with("level", "");
        assert_eq!(fill("[{topic}|{level}]", &fields), "[{level}|]");
    }

    #[test]
    fn missing_fields_render_empty_and_stray_braces_survive() {
        let fields = PromptFields::new();
        assert_eq!(fill("a {topic} b", &fields), "a  b");
        assert_eq!(fill("set {1, 2} and {", &fields), "set {1, 2} and {");
    }

    #[test]
    fn later_values_replace_earlier_ones() {
        let fields = PromptFields::new().with("topic", "x").with("topic", "y");
        assert_eq!(fields.get("topic"), Some("y"));
    }

    #[test]
    fn every_template_placeholder_is_supplied() {
        let profile = LearnerProfile {
            subject: "Chemistry".into(),
            level: LearnerLevel::UnderstandsSomewhat,
            lesson_count: 4,
            mistakes: "mixing up moles and mass".into(),
            challenges: "dyslexia".into(),
        };

        let curriculum = build(PromptKind::Curriculum, &PromptFields::curriculum(&profile));
        assert!(curriculum.contains("4 lesson topics for the subject: Chemistry"));
        assert!(curriculum.contains("Understands Somewhat"));
        assert!(curriculum.contains("dyslexia"));
        assert!(!curriculum.contains('{'));

        let lesson = build(PromptKind::Lesson, &PromptFields::lesson(&profile, 0, "Moles"));
        assert!(lesson.contains("Lesson title: Moles"));
        assert!(lesson.contains("mixing up moles and mass"));
        assert!(!lesson.contains('{'));

        let question = build(
            PromptKind::AdaptiveQuestion,
            &PromptFields::adaptive_question("Moles", Difficulty::Hard, 3),
        );
        assert!(question.contains("\"hard\" difficulty"));
        assert!(question.contains("question #3"));
        assert!(!question.contains('{'));
    }

    #[test]
    fn foundation_learners_get_longer_curricula() {
        let profile = LearnerProfile {
            subject: "Calculus".into(),
            level: LearnerLevel::LacksFoundation,
            lesson_count: 5,
            ..LearnerProfile::default()
        };
        let prompt = build(PromptKind::Curriculum, &PromptFields::curriculum(&profile));
        assert!(prompt.contains("8 lesson topics"));
    }
}
