//! Plain-text views of lessons, quizzes and progress for chat messages.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::quiz::adaptive::{AdaptiveQuizSession, AnswerOutcome, Verdict};
use crate::quiz::progress::{LessonQuizResult, ProgressTracker};
use crate::quiz::{Difficulty, GeneratedQuestion, LessonRecord};

const BAR_WIDTH: usize = 10;

fn capitalized(difficulty: Difficulty) -> String {
    let name = difficulty.as_str();
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn choices(out: &mut String, question: &GeneratedQuestion) {
    for choice in &question.choices {
        let _ = writeln!(out, "{}", choice);
    }
}

/// The correct answer as the model wrote it, or a note that it is missing.
fn recorded_answer(question: &GeneratedQuestion) -> &str {
    if question.correct.is_empty() {
        "not given"
    } else {
        &question.correct
    }
}

/// Splits `text` into pieces of at most `limit` characters, preferring line
/// breaks. Always returns at least one piece.
pub fn chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let needed = if current.is_empty() { line_len } else { line_len + 1 };
        if current_len + needed > limit && !current.is_empty() {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for part in chars.chunks(limit) {
                pieces.push(part.iter().collect());
            }
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() || pieces.is_empty() {
        pieces.push(current);
    }
    pieces
}

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn curriculum(tracker: &ProgressTracker) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Progress Overview");
    let _ = writeln!(out, "{}", progress_bar(tracker.progress_percent()));
    let _ = writeln!(
        out,
        "{} of {} lessons completed\n",
        tracker.completed_count(),
        tracker.topics().len()
    );
    for (i, topic) in tracker.topics().iter().enumerate() {
        let mark = if tracker.is_completed(i) {
            "✅"
        } else if i == tracker.current_index() {
            "▶️"
        } else {
            "▫️"
        };
        let _ = writeln!(out, "{} Lesson {}: {}", mark, i + 1, topic);
    }
    out.trim_end().to_string()
}

pub fn lesson(index: usize, topic: &str, lesson: &LessonRecord) -> String {
    let mut out = format!("Lesson {}: {}\n\n", index + 1, topic);
    if lesson.body.is_empty() {
        out.push_str("The lesson came back empty. Try regenerating it.");
    } else {
        out.push_str(&lesson.body);
    }
    out
}

pub fn lesson_question(number: usize, question: &GeneratedQuestion) -> String {
    let mut out = format!("Question {}: {}\n\n", number, question.text);
    choices(&mut out, question);
    out.trim_end().to_string()
}

pub fn lesson_result(quiz: &BTreeMap<usize, GeneratedQuestion>, result: &LessonQuizResult) -> String {
    let mut out = String::from("Knowledge Check\n\n");
    for item in &result.questions {
        let Some(question) = quiz.get(&item.number) else {
            continue;
        };
        let _ = writeln!(out, "Question {}: {}", item.number, question.text);
        if item.correct {
            let _ = writeln!(out, "✅ Correct! Answer: {}\n", recorded_answer(question));
        } else {
            let selected = item.selected.map(|l| l.to_string()).unwrap_or_default();
            let _ = writeln!(
                out,
                "❌ Incorrect. You selected: {} | Correct answer: {}\n",
                selected,
                recorded_answer(question)
            );
        }
    }
    let _ = write!(out, "Final Score: {} out of {}", result.score, result.total);
    out
}

pub fn practice_questions(questions: &[GeneratedQuestion]) -> String {
    let mut out = String::from("Extra Practice Questions\n");
    for (i, question) in questions.iter().enumerate() {
        let _ = writeln!(out, "\nPractice Question {}: {}", i + 1, question.text);
        choices(&mut out, question);
        let _ = write!(out, "Correct Answer: {}", recorded_answer(question));
        if !question.explanation.is_empty() {
            let _ = write!(out, " - {}", question.explanation);
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn adaptive_question(session: &AdaptiveQuizSession) -> String {
    let Some(question) = session.current_question() else {
        return String::new();
    };
    let mut out = format!(
        "Q{} of {}: {}\nCurrent difficulty: {}\n\n",
        session.question_number(),
        session.total_questions(),
        question.text,
        capitalized(session.difficulty())
    );
    choices(&mut out, question);
    out.trim_end().to_string()
}

pub fn adaptive_feedback(session: &AdaptiveQuizSession, outcome: &AnswerOutcome) -> String {
    let mut out = String::from("Answer choices:\n");
    if let Some(question) = session.current_question() {
        for choice in &question.choices {
            if Some(choice.letter) == outcome.correct_letter {
                let _ = writeln!(out, "✅ {} ← Correct Answer", choice);
            } else if choice.letter == outcome.selected {
                let _ = writeln!(out, "❌ {} ← Your Answer", choice);
            } else {
                let _ = writeln!(out, "   {}", choice);
            }
        }
        out.push('\n');

        if outcome.correct {
            out.push_str("✅ Correct! Great job!\n");
        } else {
            let _ = writeln!(
                out,
                "❌ Incorrect. The correct answer was {}.",
                recorded_answer(question)
            );
        }

        if outcome.difficulty != outcome.previous_difficulty {
            let direction = if outcome.correct { "increased" } else { "decreased" };
            let _ = writeln!(out, "Difficulty {} to: {}", direction, capitalized(outcome.difficulty));
        } else {
            let _ = writeln!(out, "Difficulty stays at: {}", capitalized(outcome.difficulty));
        }

        if !question.explanation.is_empty() {
            let _ = writeln!(out, "💡 Explanation: {}", question.explanation);
        }
    }
    let _ = write!(
        out,
        "Current Score: {} / {}",
        session.score(),
        session.question_number()
    );
    out
}

pub fn adaptive_summary(session: &AdaptiveQuizSession) -> String {
    let percent = session.percent();
    let verdict = match session.verdict() {
        Verdict::Excellent => format!("Excellent! You scored {:.1}%", percent),
        Verdict::Good => format!("Good job! You scored {:.1}%", percent),
        Verdict::KeepPracticing => format!("You scored {:.1}%. Keep practicing!", percent),
    };
    format!(
        "🎉 Quiz Complete!\nFinal Score: {} / {}\n{}",
        session.score(),
        session.total_questions(),
        verdict
    )
}
