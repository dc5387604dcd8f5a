//! Transport seam and wire envelope
//!
//! All backend calls funnel through a single POST-style entry point
//! regardless of semantic verb; the store never constructs an HTTP client
//! itself. This trait enables swapping the real client for a scripted one
//! in tests without touching the layers above.
//!
//! URL convention (built by the service layer):
//! `/api/<base_url>/<operation>`, with relationship sub-resources addressed
//! as `/api/<parent_base>/<parent_id>/relationships/<base_url>/<operation>`.

use async_trait::async_trait;
use lode_core::{JsonValue, Result};
use serde::{Deserialize, Serialize};

/// Backend transport collaborator
///
/// Thread safety: implementations are shared behind an `Arc` and called
/// from spawned operation futures (requires `Send + Sync`).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one backend call
    ///
    /// # Errors
    ///
    /// Returns a transport error for network/backend failures; the caller
    /// converts it into rejected-operation data, never a panic.
    async fn post(&self, url: &str, body: Option<JsonValue>) -> Result<Envelope>;
}

/// Wire envelope: `{ "data": { "data": <payload> } }`
///
/// Every backend response nests its payload twice; the inner value is a
/// single JSON object or an array of them depending on the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Response document
    pub data: Document,
}

/// Inner response document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Operation payload
    pub data: JsonValue,
}

impl Envelope {
    /// Wrap a payload the way the backend does
    pub fn new(payload: JsonValue) -> Self {
        Self {
            data: Document { data: payload },
        }
    }

    /// Unwrap to the operation payload
    pub fn into_inner(self) -> JsonValue {
        self.data.data
    }
}
