//! Asynchronous operation state machine
//!
//! This crate wraps a function returning a future into an observable
//! 4-state machine: `pending → loading → resolved | rejected`. Invocation
//! never blocks the caller; completion commits through an epoch guard so a
//! slow stale response can never clobber the outcome of a fresher call.
//!
//! - [`TaskStatus`]: the status enum with projection helpers
//! - [`TaskState`]: observable state (status/result/error) + epoch guard
//! - [`Task`]: one per operation-site, re-invocable without limit
//! - [`Matcher`]: render-friendly "branch on current state" projection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod state;
pub mod status;
pub mod task;

pub use state::{Matcher, TaskState};
pub use status::TaskStatus;
pub use task::{Task, TaskHandle};
