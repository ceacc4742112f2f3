//! Error types for Citegraph
//!
//! Provides the error taxonomy shared by the cache, the paper client
//! and the crawler:
//! - Distinct error types for different failure modes
//! - Machine-readable error codes
//! - Classification of per-paper failures that prune a branch instead of
//!   aborting a run

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    PaperNotFound,
    MalformedPaper,

    // Storage errors (7xxx)
    CacheError,
    IoError,

    // Upstream errors (8xxx)
    FetchError,
    RetriesExhausted,
    UpstreamStatus,
    HttpClient,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
    RenderError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::PaperNotFound => 4002,
            ErrorCode::MalformedPaper => 4003,

            ErrorCode::CacheError => 7001,
            ErrorCode::IoError => 7002,

            ErrorCode::FetchError => 8001,
            ErrorCode::RetriesExhausted => 8002,
            ErrorCode::UpstreamStatus => 8003,
            ErrorCode::HttpClient => 8004,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::RenderError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    #[error("Malformed paper record for {id}: {message}")]
    Malformed { id: String, message: String },

    // Upstream errors
    #[error("Failed to fetch paper {id}: {message}")]
    Fetch { id: String, message: String },

    #[error("Gave up on paper {id} after {attempts} attempts (last status {status})")]
    RetriesExhausted { id: String, attempts: u32, status: u16 },

    #[error("Upstream returned status {status} for paper {id}")]
    UpstreamStatus { id: String, status: u16 },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Storage errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Render error: {message}")]
    Render { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::Malformed { .. } => ErrorCode::MalformedPaper,
            AppError::Fetch { .. } => ErrorCode::FetchError,
            AppError::RetriesExhausted { .. } => ErrorCode::RetriesExhausted,
            AppError::UpstreamStatus { .. } => ErrorCode::UpstreamStatus,
            AppError::HttpClient(_) => ErrorCode::HttpClient,
            AppError::Cache { .. } => ErrorCode::CacheError,
            AppError::Io(_) => ErrorCode::IoError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Render { .. } => ErrorCode::RenderError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Per-paper failures: the traversal drops the paper and its subtree
    /// and carries on with the rest of the frontier.
    pub fn is_pruning(&self) -> bool {
        matches!(
            self,
            AppError::PaperNotFound { .. }
                | AppError::Malformed { .. }
                | AppError::Fetch { .. }
                | AppError::RetriesExhausted { .. }
                | AppError::UpstreamStatus { .. }
                | AppError::HttpClient(_)
        )
    }

    /// Whether a pruning failure deserves a warning. Dangling citation
    /// links are routine upstream, so not-found and malformed records are not.
    pub fn is_anomaly(&self) -> bool {
        !matches!(
            self,
            AppError::PaperNotFound { .. } | AppError::Malformed { .. }
        )
    }

    /// Shorthand for a validation error on a named field
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
