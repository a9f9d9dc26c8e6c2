//! CLI error types.

use thiserror::Error;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file problem.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to read or write a file the user named.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON table or scenario file did not parse.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File that failed to parse.
        path: String,
        /// Parser error.
        source: serde_json::Error,
    },
}
