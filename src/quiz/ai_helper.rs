use async_trait::async_trait;
use chatgpt::client::ChatGPT;
use chatgpt::config::ChatGPTEngine;
use chatgpt::types::CompletionResponse;
use log::debug;

use crate::config::{Config, Engine};
use crate::error::GenerationError;
use crate::quiz::parser::{self, ADAPTIVE_QUESTION, PRACTICE_QUESTION};
use crate::quiz::progress::CurriculumRecord;
use crate::quiz::prompts::{self, PromptFields, PromptKind};
use crate::quiz::{Difficulty, GeneratedQuestion, LearnerProfile, LessonRecord};

/// Anything that turns a prompt into completion text.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

pub struct ChatGptClient {
    chat_gpt: ChatGPT,
}

impl ChatGptClient {
    pub fn new(config: &Config) -> Result<Self, GenerationError> {
        let mut chat_gpt = ChatGPT::new(config.api_key.as_str())?;

        chat_gpt.config.engine = match config.engine {
            Engine::Gpt35Turbo => ChatGPTEngine::Gpt35Turbo,
            Engine::Gpt4 => ChatGPTEngine::Gpt4,
            Engine::Gpt4_32k => ChatGPTEngine::Gpt4_32k,
        };
        chat_gpt.config.timeout = config.timeout;
        chat_gpt.config.temperature = config.temperature;

        Ok(Self { chat_gpt })
    }
}

#[async_trait]
impl ModelClient for ChatGptClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let response: CompletionResponse = self.chat_gpt.send_message(prompt).await?;
        Ok(response.message().content.clone())
    }
}

/// Builds prompts, asks the model and parses what comes back.
pub struct TutorHelper {
    client: Box<dyn ModelClient>,
    practice_questions: u32,
}

impl TutorHelper {
    pub fn new(client: impl ModelClient + 'static, practice_questions: u32) -> Self {
        Self {
            client: Box::new(client),
            practice_questions,
        }
    }

    async fn generate(&self, kind: PromptKind, fields: &PromptFields) -> Result<String, GenerationError> {
        let prompt = prompts::build(kind, fields);
        debug!("Generating {:?} from a {} character prompt", kind, prompt.len());

        let content = self.client.complete(&prompt).await?;
        debug!("Completion: {:?}", content);

        if content.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(content)
    }

    /// The topic list may come back empty if the model ignored the format.
    pub async fn generate_curriculum(
        &self,
        profile: &LearnerProfile,
    ) -> Result<CurriculumRecord, GenerationError> {
        let content = self
            .generate(PromptKind::Curriculum, &PromptFields::curriculum(profile))
            .await?;
        Ok(CurriculumRecord::from_text(&content))
    }

    pub async fn generate_lesson(
        &self,
        profile: &LearnerProfile,
        lesson_index: usize,
        topic: &str,
    ) -> Result<LessonRecord, GenerationError> {
        let fields = PromptFields::lesson(profile, lesson_index, topic);
        let content = self.generate(PromptKind::Lesson, &fields).await?;
        Ok(parser::parse_lesson(&content))
    }

    /// A question with no choices cannot be answered, so it is reported as a
    /// failed generation rather than handed to the quiz.
    pub async fn generate_adaptive_question(
        &self,
        topic: &str,
        difficulty: Difficulty,
        question_number: u32,
    ) -> Result<GeneratedQuestion, GenerationError> {
        let fields = PromptFields::adaptive_question(topic, difficulty, question_number);
        let content = self.generate(PromptKind::AdaptiveQuestion, &fields).await?;

        let question = parser::parse_question(&content, &ADAPTIVE_QUESTION);
        if !question.is_answerable() {
            return Err(GenerationError::Unusable);
        }
        Ok(question)
    }

    pub async fn generate_practice_questions(
        &self,
        profile: &LearnerProfile,
        topic: &str,
    ) -> Result<Vec<GeneratedQuestion>, GenerationError> {
        let mut questions = Vec::with_capacity(self.practice_questions as usize);
        for number in 1..=self.practice_questions {
            let fields = PromptFields::practice_question(topic, profile.level, number);
            let content = self.generate(PromptKind::AdaptiveQuestion, &fields).await?;
            questions.push(parser::parse_question(&content, &PRACTICE_QUESTION));
        }
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::quiz::{LearnerLevel, Letter};

    /// Replays canned completions in order and remembers every prompt.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        replies: Arc<Mutex<VecDeque<String>>>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClient {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.iter().map(|r| r.to_string()).collect())),
                prompts: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            // An exhausted script behaves like a model that returned nothing.
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    fn profile() -> LearnerProfile {
        LearnerProfile {
            subject: "Physics".into(),
            level: LearnerLevel::UnderstandsALittle,
            lesson_count: 3,
            mistakes: "confusing mass and weight".into(),
            challenges: String::new(),
        }
    }

    #[tokio::test]
    async fn curriculum_topics_are_parsed() {
        let client = ScriptedClient::new(&["1. Motion\n2. Forces\n3. Energy"]);
        let helper = TutorHelper::new(client.clone(), 5);

        let curriculum = helper.generate_curriculum(&profile()).await.unwrap();
        assert_eq!(curriculum.topics, vec!["Motion", "Forces", "Energy"]);

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("3 lesson topics for the subject: Physics"));
    }

    #[tokio::test]
    async fn empty_completion_is_a_generation_failure() {
        let helper = TutorHelper::new(ScriptedClient::new(&["  \n"]), 5);
        let err = helper.generate_curriculum(&profile()).await.unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[tokio::test]
    async fn lesson_is_parsed_with_its_quiz() {
        let text = "**Title:** Forces\n\n**Explanation:**\nPushes and pulls.\n\n**Example 1: Basic**\nKicking a ball.\n\n**Quiz:**\n**Q1:** A force is?\nA. a push or pull\nB. a mass\nC. a speed\nD. a colour\n**Answer:** A\n";
        let client = ScriptedClient::new(&[text]);
        let helper = TutorHelper::new(client.clone(), 5);

        let lesson = helper.generate_lesson(&profile(), 1, "Forces").await.unwrap();
        assert_eq!(lesson.title, "Forces");
        assert_eq!(lesson.examples.len(), 1);
        assert_eq!(lesson.quiz.len(), 1);
        assert!(lesson.quiz[&1].is_correct(Letter::A));
        assert!(client.prompts.lock().unwrap()[0].contains("Lesson title: Forces"));
    }

    #[tokio::test]
    async fn adaptive_question_without_choices_is_rejected() {
        let helper = TutorHelper::new(ScriptedClient::new(&["Question: What?\n"]), 5);
        let err = helper
            .generate_adaptive_question("Optics", Difficulty::Easy, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unusable));
    }

    #[tokio::test]
    async fn adaptive_question_prompt_carries_difficulty() {
        let reply = "Question: Light is?\nA. a wave\nB. a rock\nC. a sound\nD. a smell\n**Correct Answer: A**\nExplanation: It is an electromagnetic wave.";
        let client = ScriptedClient::new(&[reply]);
        let helper = TutorHelper::new(client.clone(), 5);

        let question = helper
            .generate_adaptive_question("Optics", Difficulty::Hard, 4)
            .await
            .unwrap();
        assert_eq!(question.correct_letter(), Some(Letter::A));
        let prompt = &client.prompts.lock().unwrap()[0];
        assert!(prompt.contains("\"hard\" difficulty"));
        assert!(prompt.contains("question #4"));
    }

    #[tokio::test]
    async fn practice_batch_asks_once_per_question() {
        let reply = "Question: Q?\nA. a\nB. b\nC. c\nD. d\n**Correct Answer: C** (see explanation)\nExplanation: c.";
        let client = ScriptedClient::new(&[reply, reply, reply]);
        let helper = TutorHelper::new(client.clone(), 3);

        let questions = helper
            .generate_practice_questions(&profile(), "Forces")
            .await
            .unwrap();
        assert_eq!(questions.len(), 3);
        assert!(questions.iter().all(|q| q.correct_letter() == Some(Letter::C)));

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("question #3"));
        assert!(prompts[0].contains("\"Understands a Little\" difficulty"));
    }

    #[tokio::test]
    async fn practice_batch_stops_on_failure() {
        let reply = "Question: Q?\nA. a\nB. b\n**Correct Answer: A**";
        let helper = TutorHelper::new(ScriptedClient::new(&[reply]), 2);
        assert!(helper
            .generate_practice_questions(&profile(), "Forces")
            .await
            .is_err());
    }
}
