//! `fixtures` crate: the `event_order` workflow.
//!
//! `just_wait` sleeps for a fixed number of seconds, then `emit_event` sends
//! a single `COMPLETE` lineage event for `emit_event.wait-for-me`. The pair
//! makes it observable that the event is emitted only after the preceding
//! step has finished.

pub mod error;
pub mod config;
pub mod event_order;
pub mod listener;

pub use error::FixtureError;
pub use config::FixtureConfig;
pub use event_order::{build_scheduler, event_order_workflow, step_registry, EmitEventStep};
pub use listener::LineageRunListener;
