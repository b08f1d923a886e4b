//! Error types for analysis entry points and snapshot loading.
//!
//! Data-quality findings (cycles, orphans, impossible dates) are never
//! errors; they are returned as [`crate::issues::ValidationIssue`] values.

use thiserror::Error;

/// Failure of an analysis entry point before any work is done.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Malformed or unknown identifiers, empty check sets, duplicate ids
    #[error("input error: {0}")]
    Input(String),
    /// Threshold, weight or bound outside its documented range
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnalysisError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failure while materializing a snapshot from a source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite source error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(#[from] AnalysisError),
}

/// Reject a float outside `[lo, hi]` (NaN included).
pub(crate) fn ensure_in_range(name: &str, value: f64, lo: f64, hi: f64) -> AnalysisResult<()> {
    if value.is_nan() || value < lo || value > hi {
        return Err(AnalysisError::configuration(format!(
            "{} must be within [{}, {}], got {}",
            name, lo, hi, value
        )));
    }
    Ok(())
}
