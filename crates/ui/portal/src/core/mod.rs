//! Background task model and its executor.
//!
//!   - `effects`  : what a page asks for ([`effects::TaskKind`]) and what comes back
//!   - `executor` : runs tasks against the REST client off the UI task

pub mod effects;
pub mod executor;

pub use effects::{Secret, TaskError, TaskKind, TaskOutcome, TaskResult};
pub use executor::TaskExecutor;
