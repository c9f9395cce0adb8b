//! Best-effort extraction of curricula, lessons and questions from model
//! output.
//!
//! Nothing in here fails. Text that does not match the expected markers is
//! skipped, and a field that never showed up stays empty. Callers decide
//! what an empty question means for them.

use std::collections::BTreeMap;

use crate::quiz::{Choice, GeneratedQuestion, LessonExample, LessonRecord};

/// The marker strings one output format uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    /// Line that opens the question section. `None` means questions start
    /// on the first line.
    pub section: Option<&'static str>,
    pub question: &'static str,
    /// Text that must follow the question marker before the question body.
    pub question_separator: Option<&'static str>,
    /// Each question marker opens a new record. When false there is exactly
    /// one record and the marker only sets its text.
    pub numbered: bool,
    pub answer: &'static str,
    /// When set, an answer line only counts if it also ends with this.
    pub answer_closing: Option<&'static str>,
    pub explanation: Option<&'static str>,
    /// Guess the answer from an emphasised choice when no answer line was
    /// recognised. Models rarely emphasise choices, so this seldom fires.
    pub emphasis_fallback: bool,
}

/// `**Q1:** ...` questions under a `**Quiz:**` heading in a lesson.
pub const LESSON_QUIZ: Markers = Markers {
    section: Some("**Quiz:**"),
    question: "**Q",
    question_separator: Some(":**"),
    numbered: true,
    answer: "**Answer:**",
    answer_closing: None,
    explanation: None,
    emphasis_fallback: false,
};

/// A single `Question:` block from the adaptive quiz template.
pub const ADAPTIVE_QUESTION: Markers = Markers {
    section: None,
    question: "Question:",
    question_separator: None,
    numbered: false,
    answer: "**Correct Answer:",
    answer_closing: Some("**"),
    explanation: Some("Explanation:"),
    emphasis_fallback: true,
};

/// Same template as the adaptive quiz, read more leniently: the answer line
/// may carry trailing commentary after the closing marker.
pub const PRACTICE_QUESTION: Markers = Markers {
    answer_closing: None,
    emphasis_fallback: false,
    ..ADAPTIVE_QUESTION
};

const EMPHASIS: &str = "**";

/// Topics from a numbered list. Lines without an `N. ` pattern are dropped,
/// and gaps in the numbering are not checked.
pub fn parse_curriculum(text: &str) -> Vec<String> {
    text.lines().filter_map(numbered_item).collect()
}

fn numbered_item(line: &str) -> Option<String> {
    let line = line.trim();
    let (idx, _) = line.match_indices(". ").find(|(idx, _)| {
        line[..*idx]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })?;
    let topic = line[idx + 2..].trim().trim_matches('*').trim();
    if topic.is_empty() {
        return None;
    }
    Some(topic.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Title,
    Explanation,
    Example,
    Quiz,
}

/// Splits a lesson into its title, explanation, examples and quiz.
pub fn parse_lesson(text: &str) -> LessonRecord {
    let quiz_marker = LESSON_QUIZ.section.unwrap_or("**Quiz:**");
    let mut section = Section::None;
    let mut title = String::new();
    let mut explanation: Vec<&str> = Vec::new();
    let mut examples: Vec<(String, Vec<&str>)> = Vec::new();
    let mut body: Vec<&str> = Vec::new();
    let mut questions = QuestionScanner::new(&LESSON_QUIZ);

    for raw in text.lines() {
        let line = raw.trim();

        if line.starts_with(quiz_marker) {
            section = Section::Quiz;
            continue;
        }
        if section == Section::Quiz {
            questions.feed(line);
            continue;
        }
        body.push(raw);

        if let Some(rest) = line.strip_prefix("**Title:**") {
            title = rest.trim().to_string();
            section = Section::Title;
        } else if let Some(rest) = line.strip_prefix("**Explanation:**") {
            section = Section::Explanation;
            push_content(&mut explanation, rest.trim());
        } else if let Some((label, rest)) = example_heading(line) {
            section = Section::Example;
            let mut lines = Vec::new();
            push_content(&mut lines, rest);
            examples.push((label, lines));
        } else {
            match section {
                Section::Title if title.is_empty() && !line.is_empty() => {
                    title = line.trim_matches(|c| c == '*' || c == '#').trim().to_string();
                }
                Section::Explanation => explanation.push(line),
                Section::Example => {
                    if let Some((_, lines)) = examples.last_mut() {
                        lines.push(line);
                    }
                }
                _ => {}
            }
        }
    }

    LessonRecord {
        title,
        explanation: join_block(&explanation),
        examples: examples
            .into_iter()
            .map(|(label, lines)| LessonExample {
                label,
                text: join_block(&lines),
            })
            .collect(),
        quiz: questions
            .finish()
            .into_iter()
            .enumerate()
            .map(|(i, q)| (i + 1, q))
            .collect::<BTreeMap<_, _>>(),
        body: body.join("\n").trim().to_string(),
    }
}

/// Only the quiz of a lesson. Empty when there is no quiz marker.
pub fn parse_lesson_quiz(text: &str) -> BTreeMap<usize, GeneratedQuestion> {
    parse_lesson(text).quiz
}

/// Reads one standalone question written in the adaptive template format.
pub fn parse_question(text: &str, markers: &Markers) -> GeneratedQuestion {
    let mut scanner = QuestionScanner::new(markers);
    for line in text.lines() {
        scanner.feed(line.trim());
    }
    scanner.finish().into_iter().next().unwrap_or_default()
}

/// `**Example 2: Advanced** trailing text` -> ("Advanced", "trailing text")
fn example_heading(line: &str) -> Option<(String, &str)> {
    let inner = line.strip_prefix(EMPHASIS)?;
    if !inner.starts_with("Example") {
        return None;
    }
    let (heading, rest) = inner.split_once(EMPHASIS).unwrap_or((inner, ""));
    let label = match heading.split_once(':') {
        Some((_, label)) => label.trim(),
        None => heading.trim(),
    };
    Some((label.to_string(), rest.trim()))
}

fn push_content<'a>(lines: &mut Vec<&'a str>, text: &'a str) {
    if !text.is_empty() {
        lines.push(text);
    }
}

fn join_block(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

struct QuestionScanner<'m> {
    markers: &'m Markers,
    questions: Vec<GeneratedQuestion>,
}

impl<'m> QuestionScanner<'m> {
    fn new(markers: &'m Markers) -> Self {
        let questions = if markers.numbered {
            Vec::new()
        } else {
            vec![GeneratedQuestion::default()]
        };
        Self { markers, questions }
    }

    fn feed(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        let markers = self.markers;

        if let Some(rest) = line.strip_prefix(markers.question) {
            let text = match markers.question_separator {
                Some(sep) => match rest.split_once(sep) {
                    Some((_, text)) => text,
                    None => return,
                },
                None => rest,
            };
            let text = text.trim().to_string();
            if markers.numbered {
                self.questions.push(GeneratedQuestion::new(text));
            } else if let Some(current) = self.questions.last_mut() {
                current.text = text;
            }
        } else if let Some(choice) = Choice::from_line(line) {
            if let Some(current) = self.questions.last_mut() {
                current.choices.push(choice);
            }
        } else if let Some(rest) = line.strip_prefix(markers.answer) {
            if markers.answer_closing.is_some_and(|close| !line.ends_with(close)) {
                return;
            }
            if let Some(current) = self.questions.last_mut() {
                current.correct = rest.replace(EMPHASIS, "").trim().to_string();
            }
        } else if let Some(rest) = markers.explanation.and_then(|m| line.strip_prefix(m)) {
            if let Some(current) = self.questions.last_mut() {
                current.explanation = rest.trim().to_string();
            }
        }
    }

    fn finish(mut self) -> Vec<GeneratedQuestion> {
        if self.markers.emphasis_fallback {
            for question in &mut self.questions {
                if question.correct.is_empty() {
                    if let Some(letter) = emphasised_choice(question) {
                        question.correct = letter;
                    }
                }
            }
        }
        self.questions
    }
}

/// Best-effort guess at the answer: the first choice the model emphasised.
fn emphasised_choice(question: &GeneratedQuestion) -> Option<String> {
    question
        .choices
        .iter()
        .find(|c| c.text.contains(EMPHASIS))
        .map(|c| c.letter.to_string())
}
