use std::sync::Arc;

use log::{info, warn};
use teloxide::{prelude::*, types::KeyboardMarkup};

use crate::quiz::adaptive::{AdaptiveQuizSession, Phase, MAX_QUESTIONS};
use crate::quiz::ai_helper::TutorHelper;
use crate::quiz::{Difficulty, Letter};
use crate::{back_to_menu, keyboard, render, send_long, typing, HandlerResult, State, TutorDialogue};

const NEXT_QUESTION: &str = "Next question";
const FINISH_QUIZ: &str = "Finish quiz";
const END_QUIZ: &str = "End quiz";
const RETRY: &str = "Retry";

fn answer_keyboard(session: &AdaptiveQuizSession) -> KeyboardMarkup {
    let labels: Vec<String> = session
        .current_question()
        .map(|q| q.letters())
        .filter(|letters| !letters.is_empty())
        .unwrap_or_else(|| Letter::ALL.to_vec())
        .iter()
        .map(Letter::to_string)
        .collect();
    let row: Vec<&str> = labels.iter().map(String::as_str).collect();
    keyboard(&[row.as_slice(), &[END_QUIZ]])
}

fn continue_keyboard(session: &AdaptiveQuizSession) -> KeyboardMarkup {
    if session.is_last_question() {
        keyboard(&[&[FINISH_QUIZ]])
    } else {
        keyboard(&[&[NEXT_QUESTION], &[END_QUIZ]])
    }
}

pub async fn receive_quiz_topic(bot: Bot, dialogue: TutorDialogue, msg: Message) -> HandlerResult {
    let Some(topic) = msg.text().map(str::trim).filter(|t| !t.is_empty()) else {
        bot.send_message(msg.chat.id, "Please send the topic as text")
            .await?;
        return Ok(());
    };

    bot.send_message(
        msg.chat.id,
        format!("How many questions? (1 to {})", MAX_QUESTIONS),
    )
    .reply_markup(keyboard(&[&["1", "3", "5"], &["7", "10"]]))
    .await?;
    dialogue
        .update(State::ReceiveQuizLength {
            topic: topic.to_string(),
        })
        .await?;
    Ok(())
}

pub async fn receive_quiz_length(
    bot: Bot,
    dialogue: TutorDialogue,
    topic: String,
    msg: Message,
) -> HandlerResult {
    let total = msg.text().and_then(|t| t.trim().parse::<u32>().ok());
    let Some(total) = total.filter(|t| (1..=MAX_QUESTIONS).contains(t)) else {
        bot.send_message(
            msg.chat.id,
            format!("Please send a number from 1 to {}", MAX_QUESTIONS),
        )
        .await?;
        return Ok(());
    };

    let levels: Vec<&str> = Difficulty::LADDER.iter().map(Difficulty::as_str).collect();
    bot.send_message(msg.chat.id, "Which difficulty should we start at?")
        .reply_markup(keyboard(&[levels.as_slice()]))
        .await?;
    dialogue
        .update(State::ReceiveQuizDifficulty { topic, total })
        .await?;
    Ok(())
}

pub async fn receive_quiz_difficulty(
    helper: Arc<TutorHelper>,
    bot: Bot,
    dialogue: TutorDialogue,
    (topic, total): (String, u32),
    msg: Message,
) -> HandlerResult {
    let Some(difficulty) = msg.text().and_then(Difficulty::parse) else {
        bot.send_message(msg.chat.id, "Please choose easy, medium or hard")
            .await?;
        return Ok(());
    };

    info!(
        "Starting a {} question quiz on {:?} at {} difficulty",
        total, topic, difficulty
    );
    let mut session = AdaptiveQuizSession::new(topic, total, difficulty);
    ask_question(&helper, &bot, msg.chat.id, &mut session).await?;
    dialogue.update(State::AdaptiveQuiz { session }).await?;
    Ok(())
}

/// Generates and shows the question for the current number. On failure the
/// session stays waiting for a question and the next message retries.
async fn ask_question(
    helper: &TutorHelper,
    bot: &Bot,
    chat_id: ChatId,
    session: &mut AdaptiveQuizSession,
) -> HandlerResult {
    typing(bot, chat_id).await;
    let generated = helper
        .generate_adaptive_question(
            session.topic(),
            session.difficulty(),
            session.question_number(),
        )
        .await;

    match generated {
        Ok(question) => {
            session.accept_question(question)?;
            send_long(bot, chat_id, &render::adaptive_question(session), answer_keyboard(session)).await
        }
        Err(err) => {
            warn!(
                "Question {} on {:?} failed: {}",
                session.question_number(),
                session.topic(),
                err
            );
            bot.send_message(chat_id, "I couldn't generate a question right now.")
                .reply_markup(keyboard(&[&[RETRY], &[END_QUIZ]]))
                .await?;
            Ok(())
        }
    }
}

pub async fn adaptive_quiz(
    helper: Arc<TutorHelper>,
    bot: Bot,
    dialogue: TutorDialogue,
    mut session: AdaptiveQuizSession,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let text = msg.text().map(str::trim).unwrap_or_default();

    if text == END_QUIZ {
        session.finish_early();
    }

    match session.phase() {
        Phase::AwaitingGeneration => {
            ask_question(&helper, &bot, chat_id, &mut session).await?;
        }
        Phase::AwaitingAnswer => {
            let letter = Letter::from_answer(text).filter(|l| {
                session
                    .current_question()
                    .is_some_and(|q| q.choice(*l).is_some())
            });
            let Some(letter) = letter else {
                bot.send_message(chat_id, "Please select one of the answers")
                    .reply_markup(answer_keyboard(&session))
                    .await?;
                return Ok(());
            };

            let outcome = session.submit(letter)?;
            send_long(
                &bot,
                chat_id,
                &render::adaptive_feedback(&session, &outcome),
                continue_keyboard(&session),
            )
            .await?;
        }
        Phase::Answered => {
            if text != NEXT_QUESTION && text != FINISH_QUIZ {
                bot.send_message(chat_id, "Ready when you are")
                    .reply_markup(continue_keyboard(&session))
                    .await?;
                return Ok(());
            }
            if session.advance()? == Phase::AwaitingGeneration {
                ask_question(&helper, &bot, chat_id, &mut session).await?;
            }
        }
        Phase::Finished => {}
    }

    if session.is_finished() {
        info!(
            "Quiz on {:?} finished with {}/{}",
            session.topic(),
            session.score(),
            session.total_questions()
        );
        return back_to_menu(&bot, &dialogue, chat_id, &render::adaptive_summary(&session)).await;
    }

    dialogue.update(State::AdaptiveQuiz { session }).await?;
    Ok(())
}
