//! Error types for prediction and storage

use crate::models::StudentId;
use thiserror::Error;

/// Reason a batch skips a record instead of predicting for it
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionSkip {
    #[error("feature `{feature}` is not a finite number")]
    NonFinite { feature: &'static str },

    #[error("no prediction features recorded")]
    NoFeatures,
}

/// Errors raised by a student store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("student {0} not found")]
    NotFound(StudentId),

    #[error("student store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read or write student data: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed student data: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors surfaced by the prediction service
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("student {0} not found")]
    NotFound(StudentId),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PredictionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => PredictionError::NotFound(id),
            other => PredictionError::Store(other),
        }
    }
}
