mod config;
mod dispatch;
mod keyboards;
mod quiz;

use std::sync::Arc;

use config::Config;
use dotenv::dotenv;
use dispatch::Command;
use quiz::{packs::Packs, session::QuizEngine, tags::TagsMap};
use teloxide::{prelude::*, utils::command::BotCommands};
use tokio::sync::Mutex;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SharedEngine = Arc<Mutex<QuizEngine>>;

#[tokio::main]
async fn main() {
    // .env is optional, the variables may come from the environment
    dotenv().ok();

    pretty_env_logger::init();
    log::info!("Starting quiz bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let mut packs = Packs::load(&config.packs_dir);
    log::info!("Loaded {} packs from {}", packs.len(), config.packs_dir.display());
    packs.add_mixed();

    let tags = TagsMap::load(&config.tags_map_path).unwrap_or_else(|err| {
        log::warn!("Ignoring tags map: {}", err);
        TagsMap::default()
    });

    let engine: SharedEngine = Arc::new(Mutex::new(QuizEngine::new(
        packs,
        tags,
        config.engine.clone(),
    )));

    let bot = Bot::new(config.telegram_token.clone());

    // Long polling does not work while a webhook is set
    if let Err(err) = bot.delete_webhook().drop_pending_updates(true).await {
        log::warn!("delete_webhook failed: {}", err);
    }
    if let Err(err) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("set_my_commands failed: {}", err);
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(command))
                .branch(dptree::endpoint(answer)),
        )
        .branch(Update::filter_callback_query().endpoint(callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine, Arc::new(config)])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn command(
    bot: Bot,
    engine: SharedEngine,
    config: Arc<Config>,
    msg: Message,
    cmd: Command,
) -> HandlerResult {
    let replies = {
        let mut engine = engine.lock().await;
        dispatch::on_command(
            &mut engine,
            config.engine.questions_per_round,
            msg.from().map(|user| user.id),
            cmd,
        )
    };
    dispatch::deliver(&bot, msg.chat.id, &replies).await
}

async fn callback(bot: Bot, engine: SharedEngine, q: CallbackQuery) -> HandlerResult {
    let chat_id = match q.message.as_ref() {
        Some(message) => message.chat.id,
        None => ChatId(q.from.id.0 as i64),
    };
    let data = q.data.as_deref().unwrap_or_default();
    log::debug!("Callback {:?} from {}", data, q.from.id.0);

    if data.starts_with(keyboards::LEVEL_PREFIX) {
        if let Some(message) = q.message.as_ref() {
            // Fails with "message is not modified" on a repeated tap
            let _ = bot
                .edit_message_reply_markup(message.chat.id, message.id)
                .await;
        }
    }

    let replies = {
        let mut engine = engine.lock().await;
        dispatch::on_callback(&mut engine, q.from.id, data)
    };
    let delivered = dispatch::deliver(&bot, chat_id, &replies).await;

    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        log::warn!("answer_callback_query failed: {}", err);
    }
    delivered
}

async fn answer(bot: Bot, engine: SharedEngine, config: Arc<Config>, msg: Message) -> HandlerResult {
    let user = match msg.from() {
        Some(user) => user.id,
        None => return Ok(()),
    };

    let replies = {
        let mut engine = engine.lock().await;
        dispatch::on_text(
            &mut engine,
            &config.channel_url,
            user,
            msg.text().unwrap_or(""),
        )
    };
    dispatch::deliver(&bot, msg.chat.id, &replies).await
}
