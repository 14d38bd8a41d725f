//! Error types for flrt
//!
//! Only [`ExtractError`] is recoverable: the scanner logs it and moves on to
//! the next archive. Everything else aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while parsing a saved FLRT inventory file
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Failed to read inventory file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-blank line without `=`
    #[error("Line {line_no}: expected key=value, got '{line}'")]
    MissingSeparator { line_no: usize, line: String },
}

/// Errors raised while unpacking one snap archive
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("'{0}' is not a supported compressed archive")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to run '{tool}': {reason}")]
    ToolFailed { tool: String, reason: String },

    #[error("Corrupted archive '{path}': {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Extraction task panicked: {0}")]
    Join(String),
}

/// Errors raised while scraping the extracted snap contents
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Required snap file '{0}' is missing")]
    MissingFile(String),

    #[error("Required snap file '{file}' is unreadable: {source}")]
    Unreadable {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not find {what} in {file}")]
    PatternNotFound { what: &'static str, file: String },
}

/// Errors raised by the snap directory scanner
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create a working directory: {0}")]
    WorkDir(#[source] std::io::Error),

    #[error("Snap '{archive}': {source}")]
    Snapshot {
        archive: PathBuf,
        #[source]
        source: ScrapeError,
    },
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
