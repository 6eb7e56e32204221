//! What the bot answers to each update, kept apart from the transport so
//! handlers only lock the engine, collect [`Reply`]s and [`deliver`] them.

use async_trait::async_trait;
use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardMarkup, InputFile, ParseMode, UserId},
    utils::command::BotCommands,
};
use url::Url;

use crate::keyboards;
use crate::quiz::render;
use crate::quiz::session::{CheckOutcome, QuizEngine};
use crate::HandlerResult;

pub const NO_PACKS_TEXT: &str = "Технические неполадки 🤖 \n Выбери другой уровень.";
pub const NO_QUESTIONS_TEXT: &str =
    "Для выбранного уровня пока нет вопросов 🙃 Попробуй снова: /start";
pub const NO_SESSION_TEXT: &str = "🧩 Сначала выбери уровень: /start";
pub const CANCELLED_TEXT: &str = "Сессию остановили. Напиши /start, чтобы начать заново.";
pub const STARTOVER_TEXT: &str = "Ок, начнём заново ⚒️. Выбери уровень:";
pub const PICK_LEVEL_TEXT: &str = "Выбери уровень сложности:";
pub const CONTINUE_TEXT: &str = "Продолжим? 👇";

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Команды:")]
pub enum Command {
    #[command(description = "выбрать уровень и начать квиз")]
    Start,
    #[command(description = "остановить текущую сессию")]
    Cancel,
    #[command(description = "сбросить сессию и начать заново")]
    Startover,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Html(String),
    Menu {
        text: String,
        markup: InlineKeyboardMarkup,
    },
    Sticker(String),
}

/// Something that can put a [`Reply`] into a chat.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send(&self, chat_id: ChatId, reply: &Reply) -> HandlerResult;
}

#[async_trait]
impl Outbox for Bot {
    async fn send(&self, chat_id: ChatId, reply: &Reply) -> HandlerResult {
        match reply {
            Reply::Text(text) => {
                self.send_message(chat_id, text.clone()).await?;
            }
            Reply::Html(text) => {
                self.send_message(chat_id, text.clone())
                    .parse_mode(ParseMode::Html)
                    .await?;
            }
            Reply::Menu { text, markup } => {
                self.send_message(chat_id, text.clone())
                    .reply_markup(markup.clone())
                    .await?;
            }
            Reply::Sticker(file_id) => {
                self.send_sticker(chat_id, InputFile::file_id(file_id.clone()))
                    .await?;
            }
        }
        Ok(())
    }
}

/// Sends every reply in order. A failed send is logged and the rest still
/// go out; sticker failures are ignored, any other one is returned at the end.
pub async fn deliver<O: Outbox + ?Sized>(
    outbox: &O,
    chat_id: ChatId,
    replies: &[Reply],
) -> HandlerResult {
    let mut failure = None;
    for reply in replies {
        if let Err(err) = outbox.send(chat_id, reply).await {
            log::warn!("Sending to {} failed: {}", chat_id.0, err);
            if !matches!(reply, Reply::Sticker(_)) && failure.is_none() {
                failure = Some(err);
            }
        }
    }
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn greeting(questions: usize) -> String {
    format!(
        "Коллега, привет!👋\n\n🧑‍💻 Давай проверим твои знания для собеседования на QA?\n🎓 Тебе предстоит ответить на {} вопросов. \n📊 Выбери уровень сложности:",
        questions
    )
}

fn levels_menu(text: &str) -> Reply {
    Reply::Menu {
        text: text.to_string(),
        markup: keyboards::levels(),
    }
}

pub fn on_command(
    engine: &mut QuizEngine,
    questions_per_round: usize,
    user: Option<UserId>,
    cmd: Command,
) -> Vec<Reply> {
    match cmd {
        Command::Start => {
            if !engine.has_packs() {
                return vec![Reply::Text(NO_PACKS_TEXT.to_string())];
            }
            vec![levels_menu(&greeting(questions_per_round))]
        }
        Command::Cancel => {
            if let Some(user) = user {
                engine.cancel(user);
            }
            vec![Reply::Text(CANCELLED_TEXT.to_string())]
        }
        Command::Startover => {
            if let Some(user) = user {
                engine.cancel(user);
            }
            vec![levels_menu(STARTOVER_TEXT)]
        }
    }
}

pub fn on_callback(engine: &mut QuizEngine, user: UserId, data: &str) -> Vec<Reply> {
    if data == keyboards::MENU_QUIZ {
        return vec![levels_menu(PICK_LEVEL_TEXT)];
    }
    if !data.starts_with(keyboards::LEVEL_PREFIX) {
        log::debug!("Ignoring callback {:?}", data);
        return Vec::new();
    }

    let code = keyboards::parse_level(data).and_then(|level| engine.pick_pack(level));
    let question = match code {
        Some(code) => match engine.start_session(user, &code) {
            Ok(question) => Some(render::question(question)),
            Err(err) => {
                log::warn!("Could not start a round: {}", err);
                None
            }
        },
        None => None,
    };
    match question {
        Some(question) => vec![Reply::Html(question)],
        None => vec![Reply::Text(NO_QUESTIONS_TEXT.to_string())],
    }
}

pub fn on_text(engine: &mut QuizEngine, channel_url: &Url, user: UserId, text: &str) -> Vec<Reply> {
    if !engine.has_active(user) {
        return vec![Reply::Text(NO_SESSION_TEXT.to_string())];
    }
    let outcome = match engine.check(user, text) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::warn!("Answer from {} not checked: {}", user.0, err);
            return vec![Reply::Text(NO_SESSION_TEXT.to_string())];
        }
    };

    let mut replies = vec![Reply::Html(outcome.feedback().to_string())];
    match outcome {
        CheckOutcome::Next { question, .. } => {
            replies.push(Reply::Html(render::question(&question)));
        }
        CheckOutcome::Finished { summary, .. } => {
            log::info!(
                "User {} finished with {}/{} ({:.2} points)",
                user.0,
                summary.correct,
                summary.total,
                summary.points
            );
            replies.extend(summary.messages().into_iter().map(Reply::Html));
            if let Some(sticker) = summary.sticker {
                replies.push(Reply::Sticker(sticker));
            }
            replies.push(Reply::Menu {
                text: CONTINUE_TEXT.to_string(),
                markup: keyboards::post_results(channel_url.clone()),
            });
        }
    }
    replies
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::quiz::packs::Packs;
    use crate::quiz::session::EngineSettings;
    use crate::quiz::tags::TagsMap;
    use crate::quiz::{AnswerKey, Pack, PackMeta, Question, QuestionKind};
    use teloxide::types::InlineKeyboardButtonKind;

    const USER: UserId = UserId(5);

    fn engine(packs: Vec<Pack>) -> QuizEngine {
        QuizEngine::new(
            Packs::new(packs),
            TagsMap::default(),
            EngineSettings {
                questions_per_round: 10,
                shuffle_seed: Some(1),
            },
        )
    }

    fn junior_pack(questions: usize) -> Pack {
        Pack {
            pack: PackMeta {
                code: "basics".to_string(),
                title: "Basics".to_string(),
                level: "junior".to_string(),
            },
            questions: (0..questions)
                .map(|i| Question {
                    kind: QuestionKind::Single,
                    text: format!("Question {}", i),
                    options: vec![("a".to_string(), "yes".to_string())],
                    answer: AnswerKey::One("a".to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn url() -> Url {
        Url::parse("https://t.me/qa_mind").unwrap()
    }

    fn text(reply: &Reply) -> &str {
        match reply {
            Reply::Text(text) | Reply::Html(text) | Reply::Menu { text, .. } => text,
            Reply::Sticker(file_id) => file_id,
        }
    }

    #[test]
    fn start_without_packs_reports_problem() {
        let replies = on_command(&mut engine(Vec::new()), 10, Some(USER), Command::Start);
        assert_eq!(replies.len(), 1);
        assert!(matches!(&replies[0], Reply::Text(t) if t == NO_PACKS_TEXT));
    }

    #[test]
    fn start_offers_levels() {
        let replies = on_command(&mut engine(vec![junior_pack(1)]), 7, Some(USER), Command::Start);
        match &replies[..] {
            [Reply::Menu { text, markup }] => {
                assert!(text.contains("на 7 вопросов"));
                assert_eq!(markup.inline_keyboard.len(), 3);
            }
            other => panic!("unexpected replies {:?}", other),
        }
    }

    #[test]
    fn text_without_session_gets_hint() {
        let replies = on_text(&mut engine(vec![junior_pack(1)]), &url(), USER, "a");
        assert_eq!(replies.len(), 1);
        assert_eq!(text(&replies[0]), NO_SESSION_TEXT);
    }

    #[test]
    fn unknown_or_unserved_level_has_no_questions() {
        let mut engine = engine(vec![junior_pack(1)]);
        for data in ["level:expert", "level:advanced"] {
            let replies = on_callback(&mut engine, USER, data);
            assert_eq!(replies.len(), 1);
            assert_eq!(text(&replies[0]), NO_QUESTIONS_TEXT);
        }
        assert!(!engine.has_active(USER));
    }

    #[test]
    fn menu_and_foreign_callbacks() {
        let mut engine = engine(vec![junior_pack(1)]);
        let replies = on_callback(&mut engine, USER, keyboards::MENU_QUIZ);
        assert!(matches!(&replies[..], [Reply::Menu { text, .. }] if text == PICK_LEVEL_TEXT));
        assert!(on_callback(&mut engine, USER, "something:else").is_empty());
    }

    #[test]
    fn level_pick_starts_round_with_first_question() {
        let mut engine = engine(vec![junior_pack(2)]);
        let replies = on_callback(&mut engine, USER, "level:junior");
        assert!(matches!(&replies[..], [Reply::Html(q)] if q.starts_with("🔎")));
        assert!(engine.has_active(USER));
    }

    #[test]
    fn answers_flow_to_summary_sticker_and_keyboard() {
        let mut engine = engine(vec![junior_pack(2)]);
        on_callback(&mut engine, USER, "level:junior");

        let first = on_text(&mut engine, &url(), USER, "a");
        assert_eq!(first.len(), 2);
        assert!(text(&first[0]).starts_with("✅ Верно"));
        assert!(text(&first[1]).starts_with("🔎"));

        let last = on_text(&mut engine, &url(), USER, "b");
        assert!(text(&last[0]).starts_with("❌ Неверно"));
        assert!(text(&last[1]).starts_with("🏁"));
        assert!(text(&last[1]).contains("1/2 (50%)"));
        assert!(matches!(last[last.len() - 2], Reply::Sticker(_)));
        match last.last() {
            Some(Reply::Menu { text, markup }) => {
                assert_eq!(text, CONTINUE_TEXT);
                assert!(markup.inline_keyboard[0]
                    .iter()
                    .any(|b| matches!(&b.kind, InlineKeyboardButtonKind::Url(u) if *u == url())));
            }
            other => panic!("unexpected last reply {:?}", other),
        }

        let after = on_text(&mut engine, &url(), USER, "a");
        assert_eq!(text(&after[0]), NO_SESSION_TEXT);
    }

    #[test]
    fn cancel_and_startover_drop_session() {
        let mut engine = engine(vec![junior_pack(2)]);
        on_callback(&mut engine, USER, "level:junior");
        let replies = on_command(&mut engine, 10, Some(USER), Command::Cancel);
        assert_eq!(text(&replies[0]), CANCELLED_TEXT);
        assert!(!engine.has_active(USER));

        on_callback(&mut engine, USER, "level:junior");
        let replies = on_command(&mut engine, 10, Some(USER), Command::Startover);
        assert!(matches!(&replies[..], [Reply::Menu { text, .. }] if text == STARTOVER_TEXT));
        assert!(!engine.has_active(USER));
    }

    #[test]
    fn commands_parse() {
        assert_eq!(Command::parse("/startover", "quiz_bot").unwrap(), Command::Startover);
        assert!(Command::parse("/help", "quiz_bot").is_err());
    }

    /// Records what was sent and fails the replies `fails` picks.
    struct Recorder {
        sent: Mutex<Vec<String>>,
        fails: fn(&Reply) -> bool,
    }

    impl Recorder {
        fn new(fails: fn(&Reply) -> bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fails,
            }
        }
    }

    #[async_trait]
    impl Outbox for Recorder {
        async fn send(&self, _chat_id: ChatId, reply: &Reply) -> HandlerResult {
            if (self.fails)(reply) {
                return Err("send rejected".into());
            }
            self.sent.lock().unwrap().push(text(reply).to_string());
            Ok(())
        }
    }

    fn finished_replies() -> Vec<Reply> {
        let mut engine = engine(vec![junior_pack(1)]);
        on_callback(&mut engine, USER, "level:junior");
        on_text(&mut engine, &url(), USER, "a")
    }

    #[tokio::test]
    async fn sticker_failure_is_ignored() {
        let replies = finished_replies();
        let outbox = Recorder::new(|reply| matches!(reply, Reply::Sticker(_)));

        deliver(&outbox, ChatId(1), &replies).await.unwrap();

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.len(), replies.len() - 1);
        assert_eq!(sent.last().map(String::as_str), Some(CONTINUE_TEXT));
    }

    #[tokio::test]
    async fn failed_summary_still_reaches_keyboard() {
        let replies = finished_replies();
        let outbox = Recorder::new(|reply| matches!(reply, Reply::Html(t) if t.starts_with("🏁")));

        assert!(deliver(&outbox, ChatId(1), &replies).await.is_err());

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(sent.last().map(String::as_str), Some(CONTINUE_TEXT));
        assert!(sent.iter().all(|t| !t.starts_with("🏁")));
    }
}
