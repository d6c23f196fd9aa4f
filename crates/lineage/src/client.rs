//! `LineageClient`: the entry point callers emit events through.

use std::sync::Arc;

use tracing::debug;

use crate::config::{LineageConfig, TransportConfig};
use crate::transport::{ConsoleTransport, HttpTransport, NoopTransport, Transport};
use crate::{LineageError, RunEvent};

/// Cheap to clone; clones share the transport.
#[derive(Debug, Clone)]
pub struct LineageClient {
    transport: Arc<dyn Transport>,
}

impl LineageClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build the transport described by `config`.
    pub fn from_config(config: &LineageConfig) -> Result<Self, LineageError> {
        let transport: Arc<dyn Transport> = match &config.transport {
            TransportConfig::Http(http) => Arc::new(HttpTransport::new(http)?),
            TransportConfig::Console => Arc::new(ConsoleTransport),
            TransportConfig::Noop => Arc::new(NoopTransport),
        };
        Ok(Self::new(transport))
    }

    /// Shorthand for `from_config(&LineageConfig::from_env()?)`.
    pub fn from_environment() -> Result<Self, LineageError> {
        Self::from_config(&LineageConfig::from_env()?)
    }

    /// Deliver `event` with a single attempt.
    pub async fn emit(&self, event: &RunEvent) -> Result<(), LineageError> {
        debug!(
            run_id = %event.run.run_id,
            event_type = %event.event_type,
            job = %event.job.name,
            transport = self.transport.kind(),
            "emitting lineage event"
        );
        self.transport.emit(event).await
    }

    pub fn transport_kind(&self) -> &'static str {
        self.transport.kind()
    }
}
