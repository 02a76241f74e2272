//! # AppError
//!
//! Centralized error handling for the live-posting crates.
//! The compose core itself never returns these to an input event; they are
//! produced by adapters, wire encoding and configuration loading.

use thiserror::Error;

/// The primary error type for all rb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// The transport refused or failed to deliver a message
    #[error("transport error: {0}")]
    Transport(String),

    /// Persistence failure (e.g., SQLite unavailable)
    #[error("storage error: {0}")]
    Storage(String),

    /// Upload processing failure (e.g., undecodable image)
    #[error("upload error: {0}")]
    Upload(String),

    /// Malformed or missing configuration value
    #[error("config error: {key}: {message}")]
    Config { key: String, message: String },

    /// Validation failure (e.g., disallowed file type)
    #[error("validation error: {0}")]
    Validation(String),

    /// Wire encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A specialized Result type for live-posting logic.
pub type Result<T> = std::result::Result<T, AppError>;
