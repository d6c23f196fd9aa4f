//! Errors raised while assembling the fixture.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("invalid fixture configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Lineage(#[from] lineage::LineageError),

    #[error(transparent)]
    Engine(#[from] engine::EngineError),
}
