//! CLI error types and conversions

use crate::error::ConsoleError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Console API or client error
    #[error("{0}")]
    Console(#[from] ConsoleError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings or cache error
    #[error("settings error: {0}")]
    Settings(String),

    /// Local file system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
