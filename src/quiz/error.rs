use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading pack or tag files from disk.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed yaml in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown pack: {0}")]
    UnknownPack(String),

    #[error("pack {0} has no questions")]
    EmptyPack(String),

    #[error("no active session")]
    NoActiveSession,
}
