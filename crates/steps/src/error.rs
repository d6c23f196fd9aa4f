//! Step-level error type.

use thiserror::Error;

/// Errors returned by a step's `execute` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable`: the attempt is repeated while the workflow's retry budget lasts.
/// - `Fatal`: the run is immediately marked as failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Transient failure; the engine may try the step again.
    #[error("retryable step error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal step error: {0}")]
    Fatal(String),
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// The bare message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Retryable(msg) | Self::Fatal(msg) => msg,
        }
    }
}
