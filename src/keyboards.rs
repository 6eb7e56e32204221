use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use url::Url;

use crate::quiz::packs::Level;

pub const LEVEL_PREFIX: &str = "level:";
pub const MENU_QUIZ: &str = "menu:quiz";

pub fn levels() -> InlineKeyboardMarkup {
    let button = |text: &str, level: Level| {
        vec![InlineKeyboardButton::callback(
            text,
            format!("{}{}", LEVEL_PREFIX, level.as_str()),
        )]
    };
    InlineKeyboardMarkup::new(vec![
        button("🐣 Для начинающих", Level::Junior),
        button("🚀 Для продвинутых", Level::Advanced),
        button("🎲 Рандом", Level::Random),
    ])
}

pub fn post_results(channel_url: Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("🧪 Квиз", MENU_QUIZ),
        InlineKeyboardButton::url("🧠 QA Mind", channel_url),
    ]])
}

/// Level carried by a `level:<name>` callback.
pub fn parse_level(data: &str) -> Option<Level> {
    data.strip_prefix(LEVEL_PREFIX).and_then(Level::parse)
}
