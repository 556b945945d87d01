//! Fasting content served by `getFastingContent`.
//!
//! Without a configured path the built-in devotional is used. A content file
//! is TOML with the same fields as [`FastingContent`]:
//!
//! ```toml
//! description = "..."
//! reflection_prompt = "..."
//! completion_encouragement = "..."
//! hourly_encouragement = ["...", "..."]
//!
//! [[scripture_references]]
//! book = "Matthew"
//! chapter = 6
//! verse_start = 16
//! verse_end = 18
//! ```

use crate::config::ContentConfig;
use fast_types::FastingContent;
use std::path::{Path, PathBuf};

/// Errors loading a content file.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// Failed to read the content file.
    #[error("failed to read content file {path}: {source}")]
    ReadError {
        /// Path to the content file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse the content file.
    #[error("failed to parse content file {path}: {source}")]
    ParseError {
        /// Path to the content file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// The file parsed but has no hourly messages.
    #[error("content file {path} has no hourly_encouragement entries")]
    NoEncouragement {
        /// Path to the content file.
        path: PathBuf,
    },
}

/// Load the content the store will serve.
pub fn load_content(config: &ContentConfig) -> Result<FastingContent, ContentError> {
    match &config.path {
        Some(path) => load_file(path),
        None => Ok(FastingContent::builtin()),
    }
}

fn load_file(path: &Path) -> Result<FastingContent, ContentError> {
    let text = std::fs::read_to_string(path).map_err(|e| ContentError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let content: FastingContent = toml::from_str(&text).map_err(|e| ContentError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.hourly_encouragement.is_empty() {
        return Err(ContentError::NoEncouragement {
            path: path.to_path_buf(),
        });
    }
    Ok(content)
}
