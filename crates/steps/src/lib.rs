//! `steps` crate: the `ExecutableStep` trait and built-in step implementations.
//!
//! Every step, shell command or in-process callable, must
//! implement [`ExecutableStep`]. The engine crate dispatches execution through
//! this trait object.

pub mod error;
pub mod traits;
pub mod shell;
pub mod callable;
pub mod mock;

pub use error::StepError;
pub use traits::{ExecutableStep, StepContext};
pub use shell::ShellStep;
pub use callable::CallableStep;
