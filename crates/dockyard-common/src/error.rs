use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole docking run.
///
/// Per-ligand failures (launch errors, non-zero exits, timeouts, unreadable
/// logs) never show up here; they are recorded on the job result instead.
#[derive(Debug, Error)]
pub enum DockyardError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid discovery pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("Invalid score pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Preflight failed: {0}")]
    Preflight(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DockyardError {
    /// Wrap an `io::Error` together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DockyardError>;
