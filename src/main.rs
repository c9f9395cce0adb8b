mod adaptive_bot;
mod config;
mod curriculum_bot;
mod error;
mod quiz;
mod render;

use std::sync::Arc;

use dotenv::dotenv;
use log::info;
use teloxide::{
    dispatching::{
        dialogue::{ErasedStorage, InMemStorage, Storage},
        UpdateHandler,
    },
    prelude::*,
    types::{ChatAction, KeyboardButton, KeyboardMarkup},
};

use config::Config;
use quiz::adaptive::AdaptiveQuizSession;
use quiz::ai_helper::{ChatGptClient, TutorHelper};
use quiz::progress::StudySession;
use quiz::LearnerProfile;

type TutorDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerError = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), HandlerError>;
type SessionStorage = Arc<ErasedStorage<State>>;

/// Where a chat is in the conversation. Each chat has its own copy.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveModeChoice,
    ReceiveSubject,
    ReceiveLevel {
        profile: LearnerProfile,
    },
    ReceiveLessonCount {
        profile: LearnerProfile,
    },
    ReceiveMistakes {
        profile: LearnerProfile,
    },
    ReceiveChallenges {
        profile: LearnerProfile,
    },
    Studying {
        study: StudySession,
    },
    ReceiveQuizTopic,
    ReceiveQuizLength {
        topic: String,
    },
    ReceiveQuizDifficulty {
        topic: String,
        total: u32,
    },
    AdaptiveQuiz {
        session: AdaptiveQuizSession,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();
    info!("Starting tutor bot...");

    let config = Config::from_env()?;
    info!(
        "Using {:?} with a {}s timeout",
        config.engine,
        config.timeout.as_secs()
    );

    let helper = Arc::new(TutorHelper::new(
        ChatGptClient::new(&config)?,
        config.practice_questions,
    ));
    let storage: SessionStorage = InMemStorage::<State>::new().erase();

    let bot = Bot::from_env();

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![storage, helper])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

fn schema() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(dptree::filter(is_menu_request).endpoint(start))
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::ReceiveModeChoice].endpoint(receive_mode_choice))
        .branch(dptree::case![State::ReceiveSubject].endpoint(curriculum_bot::receive_subject))
        .branch(dptree::case![State::ReceiveLevel { profile }].endpoint(curriculum_bot::receive_level))
        .branch(
            dptree::case![State::ReceiveLessonCount { profile }]
                .endpoint(curriculum_bot::receive_lesson_count),
        )
        .branch(dptree::case![State::ReceiveMistakes { profile }].endpoint(curriculum_bot::receive_mistakes))
        .branch(
            dptree::case![State::ReceiveChallenges { profile }]
                .endpoint(curriculum_bot::receive_challenges),
        )
        .branch(dptree::case![State::Studying { study }].endpoint(curriculum_bot::studying))
        .branch(dptree::case![State::ReceiveQuizTopic].endpoint(adaptive_bot::receive_quiz_topic))
        .branch(dptree::case![State::ReceiveQuizLength { topic }].endpoint(adaptive_bot::receive_quiz_length))
        .branch(
            dptree::case![State::ReceiveQuizDifficulty { topic, total }]
                .endpoint(adaptive_bot::receive_quiz_difficulty),
        )
        .branch(dptree::case![State::AdaptiveQuiz { session }].endpoint(adaptive_bot::adaptive_quiz))
}

const MENU: &str = "Menu";
const CURRICULUM_MODE: &str = "Build a curriculum";
const ADAPTIVE_MODE: &str = "Adaptive quiz";
const GREETING_TEXT: &str = "Hi! I'm your tutor. I can plan a whole curriculum for a subject, \
or quiz you on a topic and adjust the difficulty as you go. What would you like to do?";

/// Telegram rejects messages over 4096 characters.
const MESSAGE_LIMIT: usize = 3500;

fn is_menu_request(msg: Message) -> bool {
    matches!(msg.text(), Some("/start") | Some(MENU))
}

fn keyboard(rows: &[&[&str]]) -> KeyboardMarkup {
    KeyboardMarkup::new(
        rows.iter()
            .map(|row| row.iter().map(|label| KeyboardButton::new(*label)).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
    )
}

fn mode_keyboard() -> KeyboardMarkup {
    keyboard(&[&[CURRICULUM_MODE, ADAPTIVE_MODE]])
}

/// Sends `text` split into chunks Telegram accepts, with the keyboard on the
/// last one.
async fn send_long(bot: &Bot, chat_id: ChatId, text: &str, markup: KeyboardMarkup) -> HandlerResult {
    let chunks = render::chunks(text, MESSAGE_LIMIT);
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i == last {
            bot.send_message(chat_id, chunk)
                .reply_markup(markup.clone())
                .await?;
        } else {
            bot.send_message(chat_id, chunk).await?;
        }
    }
    Ok(())
}

/// Model calls take a while; show the learner something is happening.
async fn typing(bot: &Bot, chat_id: ChatId) {
    // Only cosmetic, a failure here is not worth surfacing.
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
}

async fn start(bot: Bot, dialogue: TutorDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(mode_keyboard())
        .await?;

    dialogue.update(State::ReceiveModeChoice).await?;
    Ok(())
}

async fn receive_mode_choice(bot: Bot, dialogue: TutorDialogue, msg: Message) -> HandlerResult {
    match msg.text() {
        Some(CURRICULUM_MODE) => {
            bot.send_message(msg.chat.id, "Which subject would you like to learn?")
                .reply_markup(teloxide::types::KeyboardRemove::new())
                .await?;
            dialogue.update(State::ReceiveSubject).await?;
        }
        Some(ADAPTIVE_MODE) => {
            bot.send_message(msg.chat.id, "Which topic should I quiz you on?")
                .reply_markup(teloxide::types::KeyboardRemove::new())
                .await?;
            dialogue.update(State::ReceiveQuizTopic).await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(mode_keyboard())
                .await?;
        }
    }
    Ok(())
}

/// Returns to the mode choice once a quiz or curriculum is over.
async fn back_to_menu(bot: &Bot, dialogue: &TutorDialogue, chat_id: ChatId, text: &str) -> HandlerResult {
    send_long(bot, chat_id, &format!("{}\n\nWhat would you like to do next?", text), mode_keyboard()).await?;
    dialogue.update(State::ReceiveModeChoice).await?;
    Ok(())
}
