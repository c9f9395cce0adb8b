use crate::error::SessionError;
use crate::quiz::{Difficulty, GeneratedQuestion, Letter};

pub const MAX_QUESTIONS: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Phase {
    #[default]
    AwaitingGeneration,
    AwaitingAnswer,
    Answered,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingGeneration => "awaiting_generation",
            Phase::AwaitingAnswer => "awaiting_answer",
            Phase::Answered => "answered",
            Phase::Finished => "finished",
        }
    }
}

/// What happened when an answer was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub selected: Letter,
    pub correct: bool,
    pub correct_letter: Option<Letter>,
    pub previous_difficulty: Difficulty,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    KeepPracticing,
}

/// One learner working through an adaptive quiz.
///
/// Each operation is only legal in one phase and moves the session to the
/// next, so replaying an operation is rejected instead of applied twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdaptiveQuizSession {
    topic: String,
    difficulty: Difficulty,
    question_number: u32,
    total_questions: u32,
    score: u32,
    current_question: Option<GeneratedQuestion>,
    selected: Option<Letter>,
    phase: Phase,
}

impl AdaptiveQuizSession {
    pub fn new(topic: String, total_questions: u32, difficulty: Difficulty) -> Self {
        Self {
            topic,
            difficulty,
            question_number: 1,
            total_questions: total_questions.max(1),
            score: 0,
            current_question: None,
            selected: None,
            phase: Phase::AwaitingGeneration,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn question_number(&self) -> u32 {
        self.question_number
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_question(&self) -> Option<&GeneratedQuestion> {
        self.current_question.as_ref()
    }

    pub fn selected(&self) -> Option<Letter> {
        self.selected
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_last_question(&self) -> bool {
        self.question_number >= self.total_questions
    }

    fn expect_phase(&self, action: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::InvalidTransition {
                action,
                phase: self.phase.as_str(),
            });
        }
        Ok(())
    }

    /// Installs the freshly generated question for the current number.
    pub fn accept_question(&mut self, question: GeneratedQuestion) -> Result<(), SessionError> {
        self.expect_phase("accept_question", Phase::AwaitingGeneration)?;
        self.current_question = Some(question);
        self.selected = None;
        self.phase = Phase::AwaitingAnswer;
        Ok(())
    }

    /// Grades `selected` and walks the difficulty ladder one step. Runs at
    /// most once per question.
    pub fn submit(&mut self, selected: Letter) -> Result<AnswerOutcome, SessionError> {
        self.expect_phase("submit", Phase::AwaitingAnswer)?;
        let question = self.current_question.as_ref();
        let correct = question.is_some_and(|q| q.is_correct(selected));
        let correct_letter = question.and_then(|q| q.correct_letter());

        let previous_difficulty = self.difficulty;
        if correct {
            self.score += 1;
            self.difficulty = self.difficulty.harder();
        } else {
            self.difficulty = self.difficulty.easier();
        }
        self.selected = Some(selected);
        self.phase = Phase::Answered;

        Ok(AnswerOutcome {
            selected,
            correct,
            correct_letter,
            previous_difficulty,
            difficulty: self.difficulty,
        })
    }

    /// Moves past an answered question. On the last question the session
    /// finishes without bumping the question number.
    pub fn advance(&mut self) -> Result<Phase, SessionError> {
        self.expect_phase("advance", Phase::Answered)?;
        if self.is_last_question() {
            self.phase = Phase::Finished;
        } else {
            self.question_number += 1;
            self.current_question = None;
            self.selected = None;
            self.phase = Phase::AwaitingGeneration;
        }
        Ok(self.phase)
    }

    pub fn finish_early(&mut self) {
        self.phase = Phase::Finished;
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Score over the configured length; unanswered questions count as
    /// misses when the learner stops early.
    pub fn percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.score) * 100.0 / f64::from(self.total_questions)
    }

    pub fn verdict(&self) -> Verdict {
        let percent = self.percent();
        if percent >= 80.0 {
            Verdict::Excellent
        } else if percent >= 60.0 {
            Verdict::Good
        } else {
            Verdict::KeepPracticing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Choice;

    fn question(correct: Letter) -> GeneratedQuestion {
        GeneratedQuestion {
            text: "Which one?".into(),
            choices: Letter::ALL
                .iter()
                .map(|l| Choice::new(*l, format!("option {}", l)))
                .collect(),
            correct: correct.to_string(),
            explanation: "Because.".into(),
        }
    }

    fn wrong(letter: Letter) -> Letter {
        if letter == Letter::A {
            Letter::B
        } else {
            Letter::A
        }
    }

    fn answer(session: &mut AdaptiveQuizSession, correct: bool) -> AnswerOutcome {
        session.accept_question(question(Letter::C)).unwrap();
        let pick = if correct { Letter::C } else { wrong(Letter::C) };
        let outcome = session.submit(pick).unwrap();
        session.advance().unwrap();
        outcome
    }

    #[test]
    fn difficulty_trace_follows_answers() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 4, Difficulty::Medium);
        let trace: Vec<Difficulty> = [true, true, false, true]
            .into_iter()
            .map(|c| answer(&mut session, c).difficulty)
            .collect();
        assert_eq!(
            trace,
            vec![Difficulty::Hard, Difficulty::Hard, Difficulty::Medium, Difficulty::Hard]
        );
        assert_eq!(session.score(), 3);
        assert!(session.is_finished());
        assert_eq!(session.question_number(), 4);
    }

    #[test]
    fn ladder_clamps_at_both_ends() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 2, Difficulty::Hard);
        assert_eq!(answer(&mut session, true).difficulty, Difficulty::Hard);

        let mut session = AdaptiveQuizSession::new("Optics".into(), 2, Difficulty::Easy);
        assert_eq!(answer(&mut session, false).difficulty, Difficulty::Easy);
    }

    #[test]
    fn second_submit_is_rejected() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 3, Difficulty::Medium);
        session.accept_question(question(Letter::A)).unwrap();
        session.submit(Letter::A).unwrap();

        let err = session.submit(Letter::A).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                action: "submit",
                phase: "answered"
            }
        );
        assert_eq!(session.score(), 1);
        assert_eq!(session.difficulty(), Difficulty::Hard);
        assert_eq!(session.selected(), Some(Letter::A));
    }

    #[test]
    fn question_number_moves_only_on_advance() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 3, Difficulty::Medium);
        assert!(session.submit(Letter::A).is_err());
        assert!(session.advance().is_err());

        session.accept_question(question(Letter::A)).unwrap();
        assert!(session.accept_question(question(Letter::B)).is_err());
        session.submit(Letter::D).unwrap();
        assert_eq!(session.question_number(), 1);

        assert_eq!(session.advance().unwrap(), Phase::AwaitingGeneration);
        assert_eq!(session.question_number(), 2);
        assert!(session.current_question().is_none());
        assert!(session.selected().is_none());
    }

    #[test]
    fn unanswerable_question_grades_incorrect() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 1, Difficulty::Medium);
        session.accept_question(GeneratedQuestion::default()).unwrap();
        let outcome = session.submit(Letter::A).unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.correct_letter, None);
        assert_eq!(session.difficulty(), Difficulty::Easy);
    }

    #[test]
    fn finishing_early_and_verdicts() {
        let mut session = AdaptiveQuizSession::new("Optics".into(), 5, Difficulty::Medium);
        for _ in 0..4 {
            answer(&mut session, true);
        }
        assert!(!session.is_finished());
        assert_eq!(session.verdict(), Verdict::Excellent);

        session.finish_early();
        assert!(session.is_finished());
        assert!(session.advance().is_err());

        let mut session = AdaptiveQuizSession::new("Optics".into(), 5, Difficulty::Medium);
        for correct in [true, true, true, false, false] {
            answer(&mut session, correct);
        }
        assert_eq!(session.percent(), 60.0);
        assert_eq!(session.verdict(), Verdict::Good);

        let session = AdaptiveQuizSession::new("Optics".into(), 5, Difficulty::Medium);
        assert_eq!(session.verdict(), Verdict::KeepPracticing);
    }
}
