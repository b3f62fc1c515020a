//! Error types for mailarc

use thiserror::Error;

/// Result type alias using mailarc's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailarc
#[derive(Error, Debug)]
pub enum Error {
    // External tool errors
    #[error("required tool not found: {tool} (is it installed and on PATH?)")]
    MissingTool { tool: String },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("the search engine only produces thread-grouped summaries; message granularity cannot be paired with them")]
    UnsupportedGranularity,

    // Result listing errors
    #[error("search returned {summaries} summary lines but {identifiers} identifiers; the index changed between queries")]
    CountMismatch {
        summaries: usize,
        identifiers: usize,
    },

    // Viewer errors
    #[error("no message found for {0}")]
    ThreadNotFound(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("sync tool configuration not found at {0}")]
    SyncConfigNotFound(std::path::PathBuf),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),
}
