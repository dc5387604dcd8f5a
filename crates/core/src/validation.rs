//! Validation collaborator seam
//!
//! Field validation delegates entirely to an external engine; the data
//! layer only defines the boundary. A [`Schema`] validates a flat JSON
//! snapshot synchronously and reports ordered violations; the record layer
//! maps each into a [`ValidationError`] on the record's observable error
//! list. Validation errors are collected, never thrown past this boundary.

use crate::json::JsonValue;
use serde::{Deserialize, Serialize};

/// One violation reported by the external validation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Human-readable failure description
    pub message: String,
    /// Path of the offending field; `None` for document-level violations
    pub path: Option<String>,
}

impl SchemaViolation {
    /// Build a violation scoped to a field path
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

/// Schema collaborator: synchronous validation over a flat JSON snapshot
///
/// Implementations wrap whatever validation library the application uses.
/// Both methods return an empty vector for a valid snapshot.
pub trait Schema: Send + Sync {
    /// Validate the whole snapshot, reporting every violation in order
    fn validate(&self, snapshot: &JsonValue) -> Vec<SchemaViolation>;

    /// Validate a single attribute of the snapshot
    fn validate_attribute(&self, attribute: &str, snapshot: &JsonValue) -> Vec<SchemaViolation>;
}

/// User-correctable validation failure, attribute-scoped or whole-record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Human-readable failure description
    pub message: String,
    /// Offending attribute; `None` means the whole record
    pub attribute: Option<String>,
}

impl ValidationError {
    /// Build an attribute-scoped error
    pub fn new(message: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attribute: Some(attribute.into()),
        }
    }

    /// Build a whole-record error
    pub fn for_record(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            attribute: None,
        }
    }

    /// True when the error is not scoped to a single attribute
    pub fn is_whole_record(&self) -> bool {
        self.attribute.is_none()
    }
}

impl From<SchemaViolation> for ValidationError {
    fn from(v: SchemaViolation) -> Self {
        Self {
            message: v.message,
            attribute: v.path,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.attribute {
            Some(attr) => write!(f, "{}: {}", attr, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
