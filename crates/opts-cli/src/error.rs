//! Error types for opts-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] opts_core::Error),

    #[error(transparent)]
    Fs(#[from] opts_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed JSON argument
    #[error("Invalid JSON argument: {0}")]
    Json(#[from] serde_json::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
