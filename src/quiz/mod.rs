pub mod error;
pub mod packs;
pub mod render;
pub mod scoring;
pub mod session;
pub mod tags;

use serde::{Deserialize, Deserializer, Serializer};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Pack {
    pub pack: PackMeta,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PackMeta {
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    #[default]
    Single,
    Multi,
    Free,
}

/// `answer` in a pack file is either a single value or a list of them.
/// Numbers and booleans are read as their text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum AnswerKey {
    One(String),
    Many(Vec<String>),
}

impl Default for AnswerKey {
    fn default() -> Self {
        AnswerKey::Many(Vec::new())
    }
}

impl<'de> Deserialize<'de> for AnswerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_yaml::Value::deserialize(deserializer)? {
            serde_yaml::Value::Null => Ok(AnswerKey::default()),
            serde_yaml::Value::Sequence(items) => items
                .into_iter()
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| serde::de::Error::custom("answer items must be scalars"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(AnswerKey::Many),
            other => scalar_to_string(other)
                .map(AnswerKey::One)
                .ok_or_else(|| serde::de::Error::custom("answer must be a scalar or a list")),
        }
    }
}

impl AnswerKey {
    pub fn values(&self) -> Vec<&str> {
        match self {
            AnswerKey::One(value) => vec![value.as_str()],
            AnswerKey::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Question {
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    pub text: String,
    /// Letter and option text, in file order.
    #[serde(
        default,
        deserialize_with = "deserialize_options",
        serialize_with = "serialize_options"
    )]
    pub options: Vec<(String, String)>,
    #[serde(default)]
    pub answer: AnswerKey,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

impl Question {
    pub fn option(&self, letter: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(key, _)| key == letter)
            .map(|(_, text)| text.as_str())
    }

    /// Human readable correct answer: `a) text, c) text` for choice
    /// questions, the first accepted variant for free text.
    pub fn correct_answer_text(&self) -> String {
        match self.kind {
            QuestionKind::Single | QuestionKind::Multi => self
                .answer
                .values()
                .iter()
                .map(|letter| {
                    let option = self.option(letter).unwrap_or("");
                    format!("{}) {}", letter, option)
                })
                .collect::<Vec<_>>()
                .join(", "),
            QuestionKind::Free => self
                .answer
                .values()
                .first()
                .map(|v| v.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Text of a YAML scalar; `None` for nulls, lists and mappings.
pub(crate) fn scalar_to_string(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn deserialize_options<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, String)>, D::Error> {
    let mapping = Option::<serde_yaml::Mapping>::deserialize(deserializer)?.unwrap_or_default();
    mapping
        .into_iter()
        .map(|(key, value)| match (scalar_to_string(key), scalar_to_string(value)) {
            (Some(key), Some(value)) => Ok((key, value)),
            _ => Err(serde::de::Error::custom("options must map scalars to scalars")),
        })
        .collect()
}

fn serialize_options<S: Serializer>(
    options: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(options.iter().map(|(key, value)| (key, value)))
}
