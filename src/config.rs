use std::path::PathBuf;

use thiserror::Error;
use url::Url;

use crate::quiz::session::{EngineSettings, DEFAULT_QUESTIONS_PER_ROUND};

const DEFAULT_CHANNEL_URL: &str = "https://t.me/";
const DEFAULT_PACKS_DIR: &str = "data/packs";
const DEFAULT_TAGS_MAP_PATH: &str = "data/tags_map.yaml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is missing")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub channel_url: Url,
    pub packs_dir: PathBuf,
    pub tags_map_path: PathBuf,
    pub engine: EngineSettings,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let telegram_token = var("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;

        let raw_url = var("CHANNEL_URL").unwrap_or_else(|| DEFAULT_CHANNEL_URL.to_string());
        let channel_url = Url::parse(raw_url.trim()).map_err(|_| ConfigError::Invalid {
            name: "CHANNEL_URL",
            value: raw_url.clone(),
        })?;

        let questions_per_round = match var("QUESTIONS_PER_ROUND") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "QUESTIONS_PER_ROUND",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_QUESTIONS_PER_ROUND,
        };

        let shuffle_seed = match var("SHUFFLE_SEED") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                name: "SHUFFLE_SEED",
                value: raw.clone(),
            })?),
            None => None,
        };

        Ok(Self {
            telegram_token,
            channel_url,
            packs_dir: var("PACKS_DIR")
                .unwrap_or_else(|| DEFAULT_PACKS_DIR.to_string())
                .into(),
            tags_map_path: var("TAGS_MAP_PATH")
                .unwrap_or_else(|| DEFAULT_TAGS_MAP_PATH.to_string())
                .into(),
            engine: EngineSettings {
                questions_per_round,
                shuffle_seed,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::Missing("TELEGRAM_TOKEN"));
        assert_eq!(
            config(&[("TELEGRAM_TOKEN", "  ")]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_TOKEN")
        );
    }

    #[test]
    fn defaults() {
        let config = config(&[("TELEGRAM_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.telegram_token, "123:abc");
        assert_eq!(config.channel_url.as_str(), DEFAULT_CHANNEL_URL);
        assert_eq!(config.packs_dir, PathBuf::from("data/packs"));
        assert_eq!(config.tags_map_path, PathBuf::from("data/tags_map.yaml"));
        assert_eq!(config.engine.questions_per_round, 10);
        assert_eq!(config.engine.shuffle_seed, None);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("TELEGRAM_TOKEN", "t"),
            ("CHANNEL_URL", "https://t.me/qa_mind"),
            ("PACKS_DIR", "/srv/packs"),
            ("QUESTIONS_PER_ROUND", "5"),
            ("SHUFFLE_SEED", "99"),
        ])
        .unwrap();
        assert_eq!(config.channel_url.as_str(), "https://t.me/qa_mind");
        assert_eq!(config.packs_dir, PathBuf::from("/srv/packs"));
        assert_eq!(config.engine.questions_per_round, 5);
        assert_eq!(config.engine.shuffle_seed, Some(99));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config(&[("TELEGRAM_TOKEN", "t"), ("QUESTIONS_PER_ROUND", "0")]),
            Err(ConfigError::Invalid { name: "QUESTIONS_PER_ROUND", .. })
        ));
        assert!(matches!(
            config(&[("TELEGRAM_TOKEN", "t"), ("SHUFFLE_SEED", "seed")]),
            Err(ConfigError::Invalid { name: "SHUFFLE_SEED", .. })
        ));
        assert!(matches!(
            config(&[("TELEGRAM_TOKEN", "t"), ("CHANNEL_URL", "not a url")]),
            Err(ConfigError::Invalid { name: "CHANNEL_URL", .. })
        ));
    }
}
