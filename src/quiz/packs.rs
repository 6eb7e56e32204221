use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::quiz::error::PackError;
use crate::quiz::{Pack, PackMeta, Question};

pub const MIXED_PACK_CODE: &str = "mixed";

/// Difficulty the user picks on the level keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Junior,
    Advanced,
    Random,
}

impl Level {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "junior" => Some(Level::Junior),
            "advanced" => Some(Level::Advanced),
            "random" => Some(Level::Random),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Junior => "junior",
            Level::Advanced => "advanced",
            Level::Random => "random",
        }
    }
}

/// All loaded packs keyed by `pack.code`.
#[derive(Debug, Clone, Default)]
pub struct Packs {
    pub packs: BTreeMap<String, Pack>,
}

impl Packs {
    pub fn new(packs: impl IntoIterator<Item = Pack>) -> Self {
        Self {
            packs: packs
                .into_iter()
                .map(|pack| (pack.pack.code.clone(), pack))
                .collect(),
        }
    }

    /// Reads every `*.yaml`/`*.yml` file in `dir`. A missing directory gives
    /// an empty set; a broken file is skipped.
    pub fn load(dir: &Path) -> Self {
        let mut packs = Self::default();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                log::warn!("Pack directory {} is unavailable: {}", dir.display(), err);
                return packs;
            }
        };

        let mut paths = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| ext == "yaml" || ext == "yml")
            })
            .collect::<Vec<_>>();
        paths.sort();

        for path in paths {
            match load_pack_file(&path) {
                Ok(pack) => {
                    log::debug!(
                        "Loaded pack {} ({} questions) from {}",
                        pack.pack.code,
                        pack.questions.len(),
                        path.display()
                    );
                    packs.packs.insert(pack.pack.code.clone(), pack);
                }
                Err(err) => log::warn!("Skipping pack: {}", err),
            }
        }
        packs
    }

    pub fn is_empty(&self) -> bool {
        self.packs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.packs.len()
    }

    pub fn get(&self, code: &str) -> Option<&Pack> {
        self.packs.get(code)
    }

    /// Appends a pack holding every question of every loaded pack. Does
    /// nothing when there are no questions or the code is already taken.
    pub fn add_mixed(&mut self) {
        if self.packs.contains_key(MIXED_PACK_CODE) {
            return;
        }
        let questions = self
            .packs
            .values()
            .flat_map(|pack| pack.questions.iter().cloned())
            .collect::<Vec<_>>();
        if questions.is_empty() {
            return;
        }
        let mixed = Pack {
            pack: PackMeta {
                code: MIXED_PACK_CODE.to_string(),
                title: "Mixed".to_string(),
                level: MIXED_PACK_CODE.to_string(),
            },
            questions,
        };
        self.packs.insert(MIXED_PACK_CODE.to_string(), mixed);
    }

    /// Code of a random pack for the level. `Random` prefers the mixed pack
    /// and falls back to any pack.
    pub fn pick_for_level<R: Rng + ?Sized>(&self, level: Level, rng: &mut R) -> Option<String> {
        let candidates: Vec<&String> = match level {
            Level::Random => {
                if self.packs.contains_key(MIXED_PACK_CODE) {
                    return Some(MIXED_PACK_CODE.to_string());
                }
                self.packs.keys().collect()
            }
            Level::Junior | Level::Advanced => self
                .packs
                .iter()
                .filter(|(_, pack)| pack.pack.level == level.as_str())
                .map(|(code, _)| code)
                .collect(),
        };
        candidates.choose(rng).map(|code| code.to_string())
    }
}

pub fn load_pack_file(path: &Path) -> Result<Pack, PackError> {
    let file = File::open(path).map_err(|source| PackError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_reader(file).map_err(|source| PackError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Shuffled copy of at most `n` questions from the pack.
pub fn pick_questions<R: Rng + ?Sized>(pack: &Pack, n: usize, rng: &mut R) -> Vec<Question> {
    let mut questions = pack.questions.clone();
    questions.shuffle(rng);
    questions.truncate(n);
    questions
}
