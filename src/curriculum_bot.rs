use std::sync::Arc;

use log::{info, warn};
use teloxide::{prelude::*, types::KeyboardMarkup};

use crate::quiz::ai_helper::TutorHelper;
use crate::quiz::progress::{QuizStep, StudySession};
use crate::quiz::{GeneratedQuestion, LearnerLevel, LearnerProfile, Letter, MAX_LESSONS, MIN_LESSONS};
use crate::{keyboard, render, send_long, typing, HandlerResult, State, TutorDialogue, MENU};

const SKIP: &str = "Skip";
const START_QUIZ: &str = "Start quiz";
const RETAKE_QUIZ: &str = "Retake quiz";
const NEXT_LESSON: &str = "Next lesson";
const REGENERATE_LESSON: &str = "Regenerate lesson";
const EXTRA_PRACTICE: &str = "Extra practice";
const LESSONS: &str = "Lessons";

fn study_keyboard() -> KeyboardMarkup {
    keyboard(&[
        &[START_QUIZ, EXTRA_PRACTICE],
        &[NEXT_LESSON, REGENERATE_LESSON],
        &[LESSONS, MENU],
    ])
}

fn after_quiz_keyboard() -> KeyboardMarkup {
    keyboard(&[
        &[NEXT_LESSON, RETAKE_QUIZ],
        &[REGENERATE_LESSON, EXTRA_PRACTICE],
        &[LESSONS, MENU],
    ])
}

fn answer_keyboard(question: &GeneratedQuestion) -> KeyboardMarkup {
    let letters = if question.choices.is_empty() {
        Letter::ALL.to_vec()
    } else {
        question.letters()
    };
    let labels: Vec<String> = letters.iter().map(Letter::to_string).collect();
    let row: Vec<&str> = labels.iter().map(String::as_str).collect();
    keyboard(&[row.as_slice()])
}

fn optional_text(msg: &Message) -> Option<String> {
    match msg.text()? {
        SKIP => Some(String::new()),
        text => Some(text.trim().to_string()),
    }
}

pub async fn receive_subject(bot: Bot, dialogue: TutorDialogue, msg: Message) -> HandlerResult {
    let Some(subject) = msg.text().map(str::trim).filter(|s| !s.is_empty()) else {
        bot.send_message(msg.chat.id, "Please send the subject as text")
            .await?;
        return Ok(());
    };

    let profile = LearnerProfile {
        subject: subject.to_string(),
        ..LearnerProfile::default()
    };

    let levels: Vec<&str> = LearnerLevel::ALL.iter().map(LearnerLevel::label).collect();
    let rows: Vec<&[&str]> = levels.chunks(2).collect();
    bot.send_message(msg.chat.id, "How well do you understand it already?")
        .reply_markup(keyboard(&rows))
        .await?;
    dialogue.update(State::ReceiveLevel { profile }).await?;
    Ok(())
}

pub async fn receive_level(
    bot: Bot,
    dialogue: TutorDialogue,
    mut profile: LearnerProfile,
    msg: Message,
) -> HandlerResult {
    let Some(level) = msg.text().and_then(LearnerLevel::from_label) else {
        bot.send_message(msg.chat.id, "Please choose one of the levels")
            .await?;
        return Ok(());
    };
    profile.level = level;

    bot.send_message(
        msg.chat.id,
        format!("How many lessons? ({} to {})", MIN_LESSONS, MAX_LESSONS),
    )
    .reply_markup(keyboard(&[&["3", "5", "8"], &["10", "15", "20"]]))
    .await?;
    dialogue.update(State::ReceiveLessonCount { profile }).await?;
    Ok(())
}

pub async fn receive_lesson_count(
    bot: Bot,
    dialogue: TutorDialogue,
    mut profile: LearnerProfile,
    msg: Message,
) -> HandlerResult {
    let count = msg.text().and_then(|t| t.trim().parse::<u32>().ok());
    let Some(count) = count.filter(|c| (MIN_LESSONS..=MAX_LESSONS).contains(c)) else {
        bot.send_message(
            msg.chat.id,
            format!("Please send a number from {} to {}", MIN_LESSONS, MAX_LESSONS),
        )
        .await?;
        return Ok(());
    };
    profile.lesson_count = count;

    bot.send_message(
        msg.chat.id,
        "Any common mistakes or topics you find difficult? (or press Skip)",
    )
    .reply_markup(keyboard(&[&[SKIP]]))
    .await?;
    dialogue.update(State::ReceiveMistakes { profile }).await?;
    Ok(())
}

pub async fn receive_mistakes(
    bot: Bot,
    dialogue: TutorDialogue,
    mut profile: LearnerProfile,
    msg: Message,
) -> HandlerResult {
    let Some(mistakes) = optional_text(&msg) else {
        bot.send_message(msg.chat.id, "Please answer with text or press Skip")
            .await?;
        return Ok(());
    };
    profile.mistakes = mistakes;

    bot.send_message(
        msg.chat.id,
        "Any learning challenges I should know about? For example \"explain it at a 3rd grade level\" (or press Skip)",
    )
    .reply_markup(keyboard(&[&[SKIP]]))
    .await?;
    dialogue.update(State::ReceiveChallenges { profile }).await?;
    Ok(())
}

pub async fn receive_challenges(
    helper: Arc<TutorHelper>,
    bot: Bot,
    dialogue: TutorDialogue,
    mut profile: LearnerProfile,
    msg: Message,
) -> HandlerResult {
    let Some(challenges) = optional_text(&msg) else {
        bot.send_message(msg.chat.id, "Please answer with text or press Skip")
            .await?;
        return Ok(());
    };
    profile.challenges = challenges;

    bot.send_message(msg.chat.id, "Creating your personalized curriculum...")
        .await?;
    typing(&bot, msg.chat.id).await;

    let curriculum = match helper.generate_curriculum(&profile).await {
        Ok(curriculum) => curriculum,
        Err(err) => {
            warn!("Curriculum generation failed: {}", err);
            bot.send_message(
                msg.chat.id,
                "I couldn't create the curriculum right now. Send your learning challenges again to retry.",
            )
            .reply_markup(keyboard(&[&[SKIP]]))
            .await?;
            return Ok(());
        }
    };
    if curriculum.topics.is_empty() {
        bot.send_message(
            msg.chat.id,
            "The curriculum came back without any lessons. Send your learning challenges again to retry.",
        )
        .reply_markup(keyboard(&[&[SKIP]]))
        .await?;
        return Ok(());
    }
    info!(
        "Created a {} lesson curriculum for {:?}",
        curriculum.topics.len(),
        profile.subject
    );

    let mut study = StudySession::new(profile, curriculum);
    bot.send_message(msg.chat.id, render::curriculum(&study.tracker))
        .await?;

    // The curriculum is kept even if the first lesson fails; "Lessons" or a
    // lesson number retries it.
    open_lesson(&helper, &bot, msg.chat.id, &mut study).await?;
    dialogue.update(State::Studying { study }).await?;
    Ok(())
}

/// Shows the current lesson, generating it first if it is not cached.
/// Returns false when generation failed and the learner was told so.
async fn open_lesson(
    helper: &TutorHelper,
    bot: &Bot,
    chat_id: ChatId,
    study: &mut StudySession,
) -> Result<bool, crate::HandlerError> {
    if study.current_lesson().is_none() && !generate_lesson(helper, bot, chat_id, study).await? {
        return Ok(false);
    }
    show_lesson(bot, chat_id, study).await?;
    Ok(true)
}

async fn generate_lesson(
    helper: &TutorHelper,
    bot: &Bot,
    chat_id: ChatId,
    study: &mut StudySession,
) -> Result<bool, crate::HandlerError> {
    let index = study.tracker.current_index();
    let Some(topic) = study.tracker.current_topic().map(str::to_string) else {
        return Ok(false);
    };

    bot.send_message(chat_id, format!("Preparing lesson {}: {}...", index + 1, topic))
        .await?;
    typing(bot, chat_id).await;

    match helper.generate_lesson(&study.profile, index, &topic).await {
        Ok(lesson) => {
            study.install_lesson(lesson);
            Ok(true)
        }
        Err(err) => {
            warn!("Lesson generation for {:?} failed: {}", topic, err);
            bot.send_message(
                chat_id,
                "I couldn't generate this lesson right now. Please try again.",
            )
            .reply_markup(study_keyboard())
            .await?;
            Ok(false)
        }
    }
}

async fn show_lesson(bot: &Bot, chat_id: ChatId, study: &StudySession) -> HandlerResult {
    let (Some(topic), Some(lesson)) = (study.tracker.current_topic(), study.current_lesson()) else {
        return Ok(());
    };
    let text = render::lesson(study.tracker.current_index(), topic, lesson);
    send_long(bot, chat_id, &text, study_keyboard()).await
}

async fn ask_lesson_question(bot: &Bot, chat_id: ChatId, study: &StudySession) -> HandlerResult {
    if let Some((number, question)) = study.current_quiz_question() {
        bot.send_message(chat_id, render::lesson_question(number, question))
            .reply_markup(answer_keyboard(question))
            .await?;
    }
    Ok(())
}

pub async fn studying(
    helper: Arc<TutorHelper>,
    bot: Bot,
    dialogue: TutorDialogue,
    mut study: StudySession,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text().map(str::trim) else {
        bot.send_message(chat_id, "Please use the buttons below")
            .reply_markup(study_keyboard())
            .await?;
        return Ok(());
    };

    if study.attempt.cursor().is_some() {
        if let Some(letter) = Letter::from_answer(text) {
            match study.answer(letter) {
                QuizStep::Next(_) => ask_lesson_question(&bot, chat_id, &study).await?,
                QuizStep::Finished(result) => {
                    if let Some(lesson) = study.current_lesson() {
                        let mut summary = render::lesson_result(&lesson.quiz, &result);
                        if study.tracker.is_finished() {
                            summary.push_str("\n\nCongratulations! You have completed the entire curriculum.");
                        }
                        send_long(&bot, chat_id, &summary, after_quiz_keyboard()).await?;
                    }
                }
                QuizStep::Idle => {}
            }
            dialogue.update(State::Studying { study }).await?;
            return Ok(());
        }
    }

    match text {
        START_QUIZ | RETAKE_QUIZ => {
            if study.current_lesson().is_none() {
                bot.send_message(chat_id, "There is no lesson to quiz you on yet. Try regenerating it.")
                    .reply_markup(study_keyboard())
                    .await?;
                return Ok(());
            }
            if study.start_quiz().is_none() {
                bot.send_message(
                    chat_id,
                    "This lesson came without quiz questions. Try regenerating it.",
                )
                .reply_markup(study_keyboard())
                .await?;
                return Ok(());
            }
            ask_lesson_question(&bot, chat_id, &study).await?;
        }
        NEXT_LESSON => {
            if !study.next_lesson() {
                bot.send_message(chat_id, "That was the last lesson of the curriculum.")
                    .reply_markup(after_quiz_keyboard())
                    .await?;
                return Ok(());
            }
            if !open_lesson(&helper, &bot, chat_id, &mut study).await? {
                return Ok(());
            }
        }
        REGENERATE_LESSON => {
            if !generate_lesson(&helper, &bot, chat_id, &mut study).await? {
                return Ok(());
            }
            show_lesson(&bot, chat_id, &study).await?;
        }
        EXTRA_PRACTICE => {
            let Some(topic) = study.tracker.current_topic().map(str::to_string) else {
                return Ok(());
            };
            bot.send_message(chat_id, "Generating practice questions...")
                .await?;
            typing(&bot, chat_id).await;
            match helper.generate_practice_questions(&study.profile, &topic).await {
                Ok(questions) => {
                    send_long(&bot, chat_id, &render::practice_questions(&questions), study_keyboard())
                        .await?;
                }
                Err(err) => {
                    warn!("Practice generation for {:?} failed: {}", topic, err);
                    bot.send_message(chat_id, "I couldn't generate practice questions right now.")
                        .reply_markup(study_keyboard())
                        .await?;
                }
            }
            return Ok(());
        }
        LESSONS => {
            let text = format!(
                "{}\n\nSend a lesson number to jump to it.",
                render::curriculum(&study.tracker)
            );
            send_long(&bot, chat_id, &text, study_keyboard()).await?;
            return Ok(());
        }
        _ => {
            let index = text.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
            if !index.is_some_and(|i| study.select_lesson(i)) {
                bot.send_message(chat_id, "Please choose one of the options")
                    .reply_markup(study_keyboard())
                    .await?;
                return Ok(());
            }
            if !open_lesson(&helper, &bot, chat_id, &mut study).await? {
                return Ok(());
            }
        }
    }

    dialogue.update(State::Studying { study }).await?;
    Ok(())
}
