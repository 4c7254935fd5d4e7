use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur while planning, applying or reading records.
#[derive(Debug, Error)]
pub enum ProviderError {
    // --- Declared configuration ---
    #[error("Invalid attribute '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Unknown record type '{0}'")]
    UnknownType(String),

    #[error("Impossible generation constraints: {0}")]
    Constraint(String),

    // --- Remote vault ---
    #[error("Record '{uid}' not found during {operation}")]
    NotFound { uid: String, operation: &'static str },

    #[error("Vault rejected the credential during {operation}: {message}")]
    Auth {
        operation: &'static str,
        message: String,
    },

    #[error("Transient failure during {operation}: {message} (safe to retry)")]
    Transient {
        operation: &'static str,
        message: String,
    },

    #[error("Operation {0} was cancelled or exceeded its deadline")]
    Cancelled(&'static str),

    #[error("Unexpected vault response during {operation}: {message}")]
    UnexpectedResponse {
        operation: &'static str,
        message: String,
    },

    // --- Credential / crypto ---
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl ProviderError {
    /// Shorthand for a `Validation` error on a dotted attribute path.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for failures the orchestrating layer may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Returns `true` if the remote record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience type alias for provider results.
pub type Result<T> = std::result::Result<T, ProviderError>;
