//! Error types for gharchive-extract.
//!
//! Defines the main error enum used throughout the pipelines.

use thiserror::Error;

/// Main error type for extraction runs.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Configuration errors (missing project id, bad date, non-integer env var, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote engine errors (syntax, permissions, quota, unreachable API, etc.)
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Output errors (directory or file cannot be created or written)
    #[error("Output error: {0}")]
    Output(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a warehouse error with the given message.
    pub fn warehouse(msg: impl Into<String>) -> Self {
        Self::Warehouse(msg.into())
    }

    /// Creates an output error with the given message.
    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Warehouse(_) => "Warehouse Error",
            Self::Output(_) => "Output Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns true for configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias using ExtractError.
pub type Result<T> = std::result::Result<T, ExtractError>;
