//! Record identity types
//!
//! This module defines the two halves of record identity:
//! - [`RecordKey`]: the canonical comparable form of a backend-assigned id,
//!   used as the cache key. JSON ids arrive as numbers or strings; both
//!   canonicalize so that `5` and `"5"` address the same cache entry.
//! - [`RecordId`]: what a record carries — either a locally generated
//!   `unsaved-model-<n>` placeholder or a saved [`RecordKey`]. A record with
//!   an unsaved id is never placed in an identity cache.

use crate::json::JsonValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of locally generated placeholder ids
pub const UNSAVED_ID_PREFIX: &str = "unsaved-model-";

/// Process-wide monotonic counter for placeholder ids
static NEXT_UNSAVED: AtomicU64 = AtomicU64::new(1);

/// Canonical comparable form of a backend-assigned record id
///
/// Integral ids (JSON numbers, or strings that parse as integers) become
/// [`RecordKey::Int`]; everything else stays textual. This is the cache key
/// type: one live record per key per service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKey {
    /// Integral id
    Int(i64),
    /// Non-integral id (uuid-like or otherwise opaque)
    Text(String),
}

impl RecordKey {
    /// Extract a canonical key from a JSON id value
    ///
    /// Returns `None` for JSON values that cannot identify a record
    /// (null, booleans, arrays, objects, non-integral floats).
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n.as_i64().map(RecordKey::Int),
            JsonValue::String(s) => Some(Self::from(s.as_str())),
            _ => None,
        }
    }

    /// JSON form of this key, matching how the backend writes ids
    pub fn to_json(&self) -> JsonValue {
        match self {
            RecordKey::Int(n) => JsonValue::from(*n),
            RecordKey::Text(s) => JsonValue::from(s.clone()),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        RecordKey::Int(n)
    }
}

impl From<i32> for RecordKey {
    fn from(n: i32) -> Self {
        RecordKey::Int(i64::from(n))
    }
}

impl From<&str> for RecordKey {
    /// Canonicalize a textual id: integral strings collapse to `Int`
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => RecordKey::Int(n),
            Err(_) => RecordKey::Text(s.to_string()),
        }
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey::from(s.as_str())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Int(n) => write!(f, "{}", n),
            RecordKey::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Identity of a record: a placeholder until the backend assigns an id
///
/// Freshly built records (forms, optimistic drafts) get a process-unique
/// `unsaved-model-<n>` placeholder. Hydrating from a payload that carries an
/// id replaces the placeholder with a saved key; hydrating from a payload
/// without one leaves the placeholder untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordId {
    /// Locally generated placeholder, not yet known to the backend
    Unsaved(u64),
    /// Backend-assigned identity
    Saved(RecordKey),
}

impl RecordId {
    /// Allocate a fresh placeholder id
    pub fn unsaved() -> Self {
        RecordId::Unsaved(NEXT_UNSAVED.fetch_add(1, Ordering::Relaxed))
    }

    /// True while the backend has not assigned an id
    pub fn is_unsaved(&self) -> bool {
        matches!(self, RecordId::Unsaved(_))
    }

    /// The canonical cache key, if saved
    pub fn key(&self) -> Option<&RecordKey> {
        match self {
            RecordId::Unsaved(_) => None,
            RecordId::Saved(key) => Some(key),
        }
    }

    /// JSON form: saved ids serialize as the backend wrote them,
    /// placeholders as their `unsaved-model-<n>` string
    pub fn to_json(&self) -> JsonValue {
        match self {
            RecordId::Unsaved(n) => JsonValue::from(format!("{}{}", UNSAVED_ID_PREFIX, n)),
            RecordId::Saved(key) => key.to_json(),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Unsaved(n) => write!(f, "{}{}", UNSAVED_ID_PREFIX, n),
            RecordId::Saved(key) => write!(f, "{}", key),
        }
    }
}
