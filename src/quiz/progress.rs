use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::quiz::{parser, GeneratedQuestion, LearnerProfile, LessonRecord, Letter};

/// Ordered lesson topics plus the lessons generated for them so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CurriculumRecord {
    pub topics: Vec<String>,
    lessons: HashMap<String, LessonRecord>,
}

impl CurriculumRecord {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            topics,
            lessons: HashMap::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(parser::parse_curriculum(text))
    }

    pub fn lesson(&self, topic: &str) -> Option<&LessonRecord> {
        self.lessons.get(topic)
    }

    /// Stores a lesson for `topic`, replacing any earlier one.
    pub fn cache_lesson(&mut self, topic: &str, lesson: LessonRecord) {
        self.lessons.insert(topic.to_string(), lesson);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProgressTracker {
    curriculum: CurriculumRecord,
    completed: BTreeSet<usize>,
    current: usize,
}

impl ProgressTracker {
    pub fn new(curriculum: CurriculumRecord) -> Self {
        Self {
            curriculum,
            completed: BTreeSet::new(),
            current: 0,
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.curriculum.topics
    }

    pub fn curriculum(&self) -> &CurriculumRecord {
        &self.curriculum
    }

    pub fn curriculum_mut(&mut self) -> &mut CurriculumRecord {
        &mut self.curriculum
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.topics().get(self.current).map(String::as_str)
    }

    pub fn select_lesson(&mut self, index: usize) -> bool {
        if index >= self.topics().len() {
            return false;
        }
        self.current = index;
        true
    }

    pub fn has_next_lesson(&self) -> bool {
        self.current + 1 < self.topics().len()
    }

    pub fn next_lesson(&mut self) -> bool {
        self.select_lesson(self.current + 1)
    }

    /// Marks a lesson done. Repeating it, or naming a lesson that does not
    /// exist, changes nothing.
    pub fn complete_lesson(&mut self, index: usize) {
        if index < self.topics().len() {
            self.completed.insert(index);
        }
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn progress_percent(&self) -> f64 {
        if self.topics().is_empty() {
            return 0.0;
        }
        self.completed.len() as f64 * 100.0 / self.topics().len() as f64
    }

    pub fn is_finished(&self) -> bool {
        !self.topics().is_empty() && self.completed.len() == self.topics().len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionResult {
    pub number: usize,
    pub selected: Option<Letter>,
    pub correct: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonQuizResult {
    pub questions: Vec<QuestionResult>,
    pub score: usize,
    pub total: usize,
}

/// The learner's picks for one run through a lesson quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LessonQuizAttempt {
    answers: BTreeMap<usize, Letter>,
    cursor: Option<usize>,
}

impl LessonQuizAttempt {
    pub fn answer(&self, number: usize) -> Option<Letter> {
        self.answers.get(&number).copied()
    }

    pub fn record(&mut self, number: usize, letter: Letter) {
        self.answers.insert(number, letter);
    }

    /// The question waiting for an answer, if the quiz is under way.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn reset(&mut self) {
        self.answers.clear();
        self.cursor = None;
    }

    pub fn grade(&self, quiz: &BTreeMap<usize, GeneratedQuestion>) -> LessonQuizResult {
        let questions: Vec<QuestionResult> = quiz
            .iter()
            .map(|(number, question)| {
                let selected = self.answer(*number);
                QuestionResult {
                    number: *number,
                    selected,
                    correct: selected.is_some_and(|l| question.is_correct(l)),
                }
            })
            .collect();
        LessonQuizResult {
            score: questions.iter().filter(|q| q.correct).count(),
            total: questions.len(),
            questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    /// Ask this question next.
    Next(usize),
    /// All questions answered; the lesson is now complete.
    Finished(LessonQuizResult),
    /// No quiz is running, the answer was ignored.
    Idle,
}

/// A learner working through a generated curriculum.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StudySession {
    pub profile: LearnerProfile,
    pub tracker: ProgressTracker,
    pub attempt: LessonQuizAttempt,
}

impl StudySession {
    pub fn new(profile: LearnerProfile, curriculum: CurriculumRecord) -> Self {
        Self {
            profile,
            tracker: ProgressTracker::new(curriculum),
            attempt: LessonQuizAttempt::default(),
        }
    }

    pub fn current_lesson(&self) -> Option<&LessonRecord> {
        let topic = self.tracker.current_topic()?;
        self.tracker.curriculum().lesson(topic)
    }

    /// Caches `lesson` for the current topic and discards any quiz answers
    /// given against the previous version.
    pub fn install_lesson(&mut self, lesson: LessonRecord) {
        if let Some(topic) = self.tracker.current_topic().map(str::to_string) {
            self.tracker.curriculum_mut().cache_lesson(&topic, lesson);
        }
        self.attempt.reset();
    }

    pub fn select_lesson(&mut self, index: usize) -> bool {
        let moved = self.tracker.select_lesson(index);
        if moved {
            self.attempt.reset();
        }
        moved
    }

    pub fn next_lesson(&mut self) -> bool {
        self.select_lesson(self.tracker.current_index() + 1)
    }

    /// Clears earlier answers and returns the first question to ask.
    pub fn start_quiz(&mut self) -> Option<usize> {
        self.attempt.reset();
        let first = self.current_lesson()?.quiz.keys().next().copied();
        self.attempt.cursor = first;
        first
    }

    pub fn current_quiz_question(&self) -> Option<(usize, &GeneratedQuestion)> {
        let number = self.attempt.cursor?;
        let question = self.current_lesson()?.quiz.get(&number)?;
        Some((number, question))
    }

    /// Records an answer for the waiting question. After the last one the
    /// quiz is graded and the lesson marked complete.
    pub fn answer(&mut self, letter: Letter) -> QuizStep {
        let Some(number) = self.attempt.cursor else {
            return QuizStep::Idle;
        };
        let Some(lesson) = self.current_lesson() else {
            return QuizStep::Idle;
        };
        let next = lesson.quiz.range(number + 1..).next().map(|(n, _)| *n);
        let quiz = lesson.quiz.clone();

        self.attempt.record(number, letter);
        self.attempt.cursor = next;
        match next {
            Some(next) => QuizStep::Next(next),
            None => {
                self.tracker.complete_lesson(self.tracker.current_index());
                QuizStep::Finished(self.attempt.grade(&quiz))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Choice;

    fn topics(n: usize) -> CurriculumRecord {
        CurriculumRecord::new((1..=n).map(|i| format!("Topic {}", i)).collect())
    }

    fn lesson(answers: &[Letter]) -> LessonRecord {
        let quiz = answers
            .iter()
            .enumerate()
            .map(|(i, answer)| {
                let question = GeneratedQuestion {
                    text: format!("Question {}", i + 1),
                    choices: Letter::ALL
                        .iter()
                        .map(|l| Choice::new(*l, l.to_string()))
                        .collect(),
                    correct: answer.to_string(),
                    explanation: String::new(),
                };
                (i + 1, question)
            })
            .collect();
        LessonRecord {
            title: "Lesson".into(),
            quiz,
            ..LessonRecord::default()
        }
    }

    #[test]
    fn progress_is_zero_without_topics() {
        let mut tracker = ProgressTracker::new(CurriculumRecord::default());
        tracker.complete_lesson(0);
        assert_eq!(tracker.progress_percent(), 0.0);
        assert!(!tracker.is_finished());
        assert_eq!(tracker.current_topic(), None);
    }

    #[test]
    fn completing_is_idempotent() {
        let mut tracker = ProgressTracker::new(topics(4));
        tracker.complete_lesson(1);
        tracker.complete_lesson(1);
        tracker.complete_lesson(9);
        assert_eq!(tracker.completed_count(), 1);
        assert_eq!(tracker.progress_percent(), 25.0);

        for i in 0..4 {
            tracker.complete_lesson(i);
        }
        assert_eq!(tracker.progress_percent(), 100.0);
        assert!(tracker.is_finished());
    }

    #[test]
    fn lesson_navigation_stays_in_range() {
        let mut tracker = ProgressTracker::new(topics(2));
        assert_eq!(tracker.current_topic(), Some("Topic 1"));
        assert!(tracker.has_next_lesson());
        assert!(tracker.next_lesson());
        assert!(!tracker.has_next_lesson());
        assert!(!tracker.next_lesson());
        assert!(!tracker.select_lesson(2));
        assert_eq!(tracker.current_index(), 1);
    }

    #[test]
    fn regenerating_overwrites_cache() {
        let mut curriculum = topics(1);
        curriculum.cache_lesson("Topic 1", lesson(&[Letter::A]));
        curriculum.cache_lesson("Topic 1", lesson(&[Letter::B, Letter::C]));
        assert_eq!(curriculum.lesson("Topic 1").map(|l| l.quiz.len()), Some(2));
        assert!(curriculum.lesson("Topic 2").is_none());
    }

    #[test]
    fn quiz_run_grades_and_completes_lesson() {
        let mut session = StudySession::new(LearnerProfile::default(), topics(3));
        session.install_lesson(lesson(&[Letter::A, Letter::B, Letter::C]));

        assert_eq!(session.answer(Letter::A), QuizStep::Idle);
        assert_eq!(session.start_quiz(), Some(1));
        assert_eq!(session.current_quiz_question().map(|(n, _)| n), Some(1));
        assert_eq!(session.answer(Letter::A), QuizStep::Next(2));
        assert_eq!(session.answer(Letter::D), QuizStep::Next(3));

        let QuizStep::Finished(result) = session.answer(Letter::C) else {
            panic!("quiz should be finished");
        };
        assert_eq!(result.score, 2);
        assert_eq!(result.total, 3);
        assert!(!result.questions[1].correct);
        assert_eq!(result.questions[1].selected, Some(Letter::D));
        assert!(session.tracker.is_completed(0));
        assert!(session.current_quiz_question().is_none());
    }

    #[test]
    fn empty_quiz_cannot_start() {
        let mut session = StudySession::new(LearnerProfile::default(), topics(1));
        assert_eq!(session.start_quiz(), None);
        session.install_lesson(LessonRecord::default());
        assert_eq!(session.start_quiz(), None);
        assert!(!session.tracker.is_completed(0));
    }

    #[test]
    fn moving_lessons_drops_answers() {
        let mut session = StudySession::new(LearnerProfile::default(), topics(2));
        session.install_lesson(lesson(&[Letter::A, Letter::B]));
        session.start_quiz();
        session.answer(Letter::A);
        assert!(session.next_lesson());
        assert_eq!(session.attempt, LessonQuizAttempt::default());
        assert!(session.current_lesson().is_none());
    }

    #[test]
    fn unanswered_questions_grade_incorrect() {
        let attempt = LessonQuizAttempt::default();
        let result = attempt.grade(&lesson(&[Letter::A, Letter::B]).quiz);
        assert_eq!(result.score, 0);
        assert_eq!(result.total, 2);
    }
}
