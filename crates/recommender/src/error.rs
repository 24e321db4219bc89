//! Error types for the recommendation engine
//!
//! `EngineError` covers everything a request can fail with. `LoadError` covers
//! building a snapshot from persisted inputs; it never reaches request callers
//! directly, a failed load simply leaves the previous snapshot (or none) in place.

use crate::types::{ItemId, UserId};
use std::path::PathBuf;
use thiserror::Error;

/// Request-level errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// No trained factors for the user (cold start)
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// Item absent from the model
    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    /// Malformed request parameter, rejected before any computation
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// No snapshot has been published yet
    #[error("no model snapshot is loaded")]
    ModelUnavailable,

    /// Prediction failed for the explanation target
    #[error("explanation unavailable: {0}")]
    ExplanationUnavailable(String),
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the presentation layer
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownUser(_) => "unknown_user",
            EngineError::UnknownItem(_) => "unknown_item",
            EngineError::Validation { .. } => "validation_error",
            EngineError::ModelUnavailable => "model_unavailable",
            EngineError::ExplanationUnavailable(_) => "explanation_unavailable",
        }
    }

    /// Message safe to show to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            EngineError::UnknownUser(_) => "We don't know enough about you yet to personalize.",
            EngineError::UnknownItem(_) => "This title isn't available for recommendations.",
            EngineError::Validation { .. } => "The request parameters were not valid.",
            EngineError::ModelUnavailable => "Recommendations are temporarily unavailable.",
            EngineError::ExplanationUnavailable(_) => "Explanation unavailable.",
        }
    }

    /// Errors local to a single candidate; the ranker skips these
    pub fn is_candidate_local(&self) -> bool {
        matches!(self, EngineError::UnknownItem(_))
    }
}

/// Snapshot build and load errors
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode factor snapshot: {0}")]
    Decode(#[from] bincode::Error),

    #[error("unsupported snapshot format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    #[error("ratings line {line}: {message}")]
    Dataset { line: usize, message: String },

    #[error("catalog line {line}: {message}")]
    Catalog { line: usize, message: String },

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
