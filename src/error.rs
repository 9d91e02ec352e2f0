//! Error types for session insight analytics

use thiserror::Error;

/// Errors that can occur while analyzing a session or treatment.
///
/// An empty sample window is *not* an error; it is reported as
/// [`crate::types::NoDataCondition`] instead.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Recommendation generator failed: {0}")]
    Generator(String),

    #[error("Recommendation generator timed out after {timeout_ms}ms")]
    GeneratorTimeout { timeout_ms: u64 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl AnalyticsError {
    /// Stable machine-readable code for API and CLI consumers
    pub fn code(&self) -> &'static str {
        match self {
            AnalyticsError::Validation(_) => "VALIDATION_ERROR",
            AnalyticsError::JsonError(_) => "JSON_ERROR",
            AnalyticsError::NotFound(_) => "NOT_FOUND",
            AnalyticsError::Generator(_) | AnalyticsError::GeneratorTimeout { .. } => {
                "GENERATOR_ERROR"
            }
            AnalyticsError::Store(_) => "STORE_ERROR",
            AnalyticsError::Processing(_) => "PROCESSING_ERROR",
        }
    }
}
