//! Best-pose affinity extraction from Vina logs.

use std::path::Path;

use dockyard_common::{DockyardError, Result};
use regex::Regex;
use tracing::{debug, warn};

/// Rank `1` followed by a signed float and `kcal/mol`.
pub const DEFAULT_SCORE_PATTERN: &str = r"(?:^|\s)1\s+([-+]?\d*\.?\d+)\s+kcal/mol";

/// Characters of log echoed at debug level after each run.
const LOG_PREVIEW_CHARS: usize = 200;

/// Pulls the first-ranked docking score out of a log.
#[derive(Debug, Clone)]
pub struct ScoreExtractor {
    pattern: Regex,
}

impl Default for ScoreExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_SCORE_PATTERN).expect("default score pattern is valid"),
        }
    }
}

impl ScoreExtractor {
    /// Build an extractor from a custom pattern. The score must be the first
    /// capture group.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)?;
        if pattern.captures_len() < 2 {
            return Err(DockyardError::Config(format!(
                "score pattern '{}' has no capture group",
                pattern.as_str()
            )));
        }
        Ok(Self { pattern })
    }

    /// Use `pattern` when given, the built-in one otherwise.
    pub fn from_override(pattern: Option<&str>) -> Result<Self> {
        match pattern {
            Some(p) => Self::new(p),
            None => Ok(Self::default()),
        }
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Score from the first matching line; later poses are ignored.
    pub fn extract(&self, log: &str) -> Option<f64> {
        log.lines().find_map(|line| {
            let caps = self.pattern.captures(line)?;
            caps.get(1)?.as_str().parse::<f64>().ok()
        })
    }

    /// Read `path` and extract. An unreadable log counts as unscored.
    pub async fn extract_from_file(&self, path: &Path) -> Option<f64> {
        let bytes = match tokio::fs::read(path).await {
            Ok(b) => b,
            Err(e) => {
                warn!("Error reading log file {}: {}", path.display(), e);
                return None;
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        debug!(
            "Log file {} content (first {} chars): {}",
            path.display(),
            LOG_PREVIEW_CHARS,
            preview(&content, LOG_PREVIEW_CHARS)
        );
        self.extract(&content)
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
