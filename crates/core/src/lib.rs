//! Core types for the lodestore data layer
//!
//! This crate defines the foundational types shared by the task machine and
//! the record store:
//! - RecordKey / RecordId: canonical record identity, saved or placeholder
//! - Signal: explicit observable cell (subscribe/notify) for reactive fields
//! - Timestamp: microsecond-precision wall-clock timestamp
//! - ValidationError / Schema: validation collaborator seam
//! - Error: error type hierarchy
//! - JSON helpers: JsonValue alias and falsiness rules

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;
pub mod json;
pub mod signal;
pub mod timestamp;
pub mod validation;

pub use error::{Error, Result};
pub use id::{RecordId, RecordKey};
pub use json::{is_falsy, is_falsy_opt, JsonValue};
pub use signal::{Signal, SubscriberId};
pub use timestamp::Timestamp;
pub use validation::{Schema, SchemaViolation, ValidationError};
