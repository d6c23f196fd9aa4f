//! `lineage` crate: OpenLineage run events and a small client to emit them.
//!
//! The client is built from an explicit [`LineageConfig`] (or the process
//! environment, read once) and delivers each event with a single attempt
//! through one of the [`transport`] implementations.

pub mod error;
pub mod event;
pub mod config;
pub mod transport;
pub mod client;

pub use error::LineageError;
pub use event::{generate_new_uuid, InputDataset, Job, OutputDataset, Producer, Run, RunEvent, RunState};
pub use config::{HttpConfig, LineageConfig, TransportConfig};
pub use transport::{ConsoleTransport, HttpTransport, InMemoryTransport, NoopTransport, Transport};
pub use client::LineageClient;
