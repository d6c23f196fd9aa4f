//! Error type for the lineage client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineageError {
    /// Missing or malformed configuration.
    #[error("invalid lineage configuration: {0}")]
    Config(String),

    #[error("failed to serialise run event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Connection, timeout or protocol failure before a response arrived.
    #[error("lineage transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("lineage backend returned status {status}: {body}")]
    Status { status: u16, body: String },
}

impl LineageError {
    /// Whether trying again later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) | Self::Serialize(_) => false,
        }
    }
}
