use teloxide::utils::html;

use crate::quiz::scoring::Score;
use crate::quiz::session::Session;
use crate::quiz::tags::TagsMap;
use crate::quiz::{Question, QuestionKind};

/// How many weak topics the summary lists.
const TOP_TAGS: usize = 7;

/// Telegram rejects longer text messages.
pub const MESSAGE_LIMIT: usize = 4096;

struct Tier {
    min: usize,
    max: usize,
    text: &'static str,
    sticker: &'static str,
}

// Bounds are correct answers out of ten.
const TIERS: [Tier; 4] = [
    Tier {
        min: 0,
        max: 3,
        text: "Тебе надо основательно подойти к изучению теории тестирования. Давай начнём с базовых тем! 💪📚",
        sticker: "CAACAgIAAxkBAAERxAVoruSaNwdfSIynm8NFln8UDZsKJQACyTQAAxS5Sqpht736pBnMNgQ",
    },
    Tier {
        min: 4,
        max: 6,
        text: "Неплохо! База есть, но есть куда расти. Добьём пробелы и прокачаемся на задачах посложнее 🚀",
        sticker: "CAACAgIAAxkBAAERxAloruS951hk2J97bezr_ps4s-d_eQACoy8AAhKPuEoGYuyE0fo69TYE",
    },
    Tier {
        min: 7,
        max: 8,
        text: "Отличный результат! Видно, что ты хорошо владеешь базой. Чуть больше практики - и будешь отвечать на все вопросы 10/10! 🔥",
        sticker: "CAACAgIAAxkBAAERw-xoruN9Kf9UUQdv3ZHkFYCnchd8nwACazEAArDOuUpGWRrkBQc6UTYE",
    },
    Tier {
        min: 9,
        max: 10,
        text: "Вау! Такой результат впечатляет - будь уверен, в теории тебе нет равных 🏆",
        sticker: "CAACAgIAAxkBAAERw-horuNhMmhqUdkOs-AclZbmMyzMAgAC_zkAAmpPuUrklarETKG26DYE",
    },
];

pub struct Encouragement {
    pub text: &'static str,
    pub sticker: Option<&'static str>,
}

/// Picks the tier for `correct` out of `total`, scaled to ten points.
pub fn encouragement(correct: usize, total: usize) -> Encouragement {
    let points = if total == 0 {
        0
    } else {
        ((correct as f64 * 10.0 / total as f64).round() as usize).min(10)
    };
    TIERS
        .iter()
        .find(|tier| tier.min <= points && points <= tier.max)
        .map(|tier| Encouragement {
            text: tier.text,
            sticker: Some(tier.sticker).filter(|s| !s.is_empty()),
        })
        .unwrap_or(Encouragement {
            text: "",
            sticker: None,
        })
}

/// `100 * correct / total` rounded to the nearest integer, halves to even.
pub fn percent(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = 100 * correct;
    let (quotient, remainder) = (scaled / total, scaled % total);
    let rounded = match (2 * remainder).cmp(&total) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
    };
    rounded as u32
}

pub fn question(question: &Question) -> String {
    let header = format!("🔎 <b>Q:</b> {}", html::escape(&question.text));
    let hint = match question.kind {
        QuestionKind::Single => "Один вариант",
        QuestionKind::Multi => "Выбери один или несколько вариантов",
        QuestionKind::Free => return format!("{}\n\n<i>Свободный ответ</i>", header),
    };
    let options = question
        .options
        .iter()
        .map(|(letter, text)| format!("<b>{})</b> {}", html::escape(letter), html::escape(text)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n{}\n\n<i>{}</i>", header, options, hint)
}

pub fn feedback(question: &Question, score: Score) -> String {
    let verdict = if score.correct {
        "✅ Верно"
    } else {
        "❌ Неверно"
    };
    let mut text = format!("{} (+{:.2})", verdict, score.points);
    if !question.explanation.is_empty() {
        text.push_str(&format!("\nℹ️ {}", html::escape(&question.explanation)));
    }
    text
}

/// Splits `text` into messages of at most `limit` characters, breaking
/// between lines. A single line over the limit is cut by characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if line_len > limit {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars = line.chars().collect::<Vec<_>>();
            parts.extend(chars.chunks(limit).map(|chunk| chunk.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() && current_len + 1 + line_len > limit {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|part| part.trim_end().to_string())
        .filter(|part| !part.trim().is_empty())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub correct: usize,
    pub total: usize,
    /// Sum of points, partial credit included.
    pub points: f64,
    pub percent: u32,
    pub text: String,
    pub sticker: Option<String>,
}

impl Summary {
    /// The summary text cut into sendable messages.
    pub fn messages(&self) -> Vec<String> {
        split_message(&self.text, MESSAGE_LIMIT)
    }

    pub fn build(session: &Session, tags: &TagsMap) -> Self {
        let correct = session.correct_count;
        let total = session.total();
        let percent = percent(correct, total);
        let mood = encouragement(correct, total);

        let header = format!("🏁 <b>Итоги тестирования:</b> {}/{} ({}%)", correct, total, percent);
        let topics = format!(
            "<b>❗️Темы для прокачки</b>: {}",
            html::escape(&tags.render(&session.hardest_tags(TOP_TAGS)))
        );

        let mistakes = if session.missed.is_empty() {
            String::new()
        } else {
            let mut lines = vec!["\n<b>👇 Ошибки:</b>".to_string()];
            for (i, missed) in session.missed.iter().enumerate() {
                let right = if missed.correct.is_empty() {
                    "—".to_string()
                } else {
                    format!(" <code>{}</code>", html::escape(&missed.correct))
                };
                let explanation = if missed.explanation.is_empty() {
                    String::new()
                } else {
                    format!("\n   <i>{}</i>", html::escape(&missed.explanation))
                };
                lines.push(format!(
                    "<b>{}) {}</b>\n   <b>👉 Правильно:</b>{}{}\n",
                    i + 1,
                    html::escape(&missed.text),
                    right,
                    explanation
                ));
            }
            lines.join("\n")
        };

        let text = [header, topics, String::new(), mood.text.to_string(), mistakes]
            .join("\n")
            .trim()
            .to_string();

        Self {
            correct,
            total,
            points: session.score,
            percent,
            text,
            sticker: mood.sticker.map(str::to_string),
        }
    }
}
