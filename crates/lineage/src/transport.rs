//! Transports deliver a serialised [`RunEvent`] somewhere.
//!
//! Each call to [`Transport::emit`] is exactly one delivery attempt; nothing
//! here retries.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::{LineageError, RunEvent};

#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn emit(&self, event: &RunEvent) -> Result<(), LineageError>;

    /// Short name used in logs.
    fn kind(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// POSTs events as JSON to an OpenLineage-compatible collector.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, LineageError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: config.lineage_url()?,
            api_key: config.api_key.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn emit(&self, event: &RunEvent) -> Result<(), LineageError> {
        let mut request = self.client.post(self.url.clone()).json(event);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineageError::Status { status: status.as_u16(), body });
        }

        debug!(url = %self.url, status = status.as_u16(), "lineage event accepted");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Writes each event to the log as a single JSON line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn emit(&self, event: &RunEvent) -> Result<(), LineageError> {
        let payload = serde_json::to_string(event)?;
        info!(target: "lineage", "{payload}");
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "console"
    }
}

// ---------------------------------------------------------------------------
// Noop
// ---------------------------------------------------------------------------

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn emit(&self, _event: &RunEvent) -> Result<(), LineageError> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "noop"
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Keeps emitted events in memory, in emission order.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    events: Mutex<Vec<RunEvent>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far.
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn emit(&self, event: &RunEvent) -> Result<(), LineageError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
