//! Shared test utilities for the integration test suites.
//!
//! Provides the scripted mock transport and the fixture data model used
//! across suites. Import via `mod common;` from any test file.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use lodestore::{
    Envelope, Error, JsonValue, Registry, RelationDescriptor, Result, ServiceDescriptor, Store,
    Transport,
};

// ============================================================================
// MockTransport
// ============================================================================

/// Scripted transport: canned responses per URL, optional per-call delays,
/// and a full call log.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Envelope>>>>,
    delays: Mutex<HashMap<String, VecDeque<Duration>>>,
    calls: Mutex<Vec<(String, Option<JsonValue>)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a successful response for `url`
    pub fn respond(&self, url: &str, payload: JsonValue) {
        self.responses
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(Envelope::new(payload)));
    }

    /// Queue a failure for `url`
    pub fn respond_error(&self, url: &str, error: Error) {
        self.responses
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Queue a delay applied before the next response for `url`
    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(delay);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<(String, Option<JsonValue>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, url: &str, body: Option<JsonValue>) -> Result<Envelope> {
        self.calls.lock().push((url.to_string(), body));

        let delay = self.delays.lock().get_mut(url).and_then(|q| q.pop_front());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .lock()
            .get_mut(url)
            .and_then(|q| q.pop_front());
        response
            .unwrap_or_else(|| Err(Error::transport(format!("no scripted response for {}", url))))
    }
}

// ============================================================================
// Fixture data model
// ============================================================================

/// Blog-shaped fixture: posts reference their author (identity-preserving),
/// own their comments and attachment (always fresh children).
pub fn fixture_registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());

    registry.register_model("Post");
    registry.register_attribute("Post", "title", None);
    registry.register_attribute("Post", "body", None);
    registry.register_attribute(
        "Post",
        "author",
        Some(RelationDescriptor::belongs_to("User", "authorId")),
    );
    registry.register_attribute(
        "Post",
        "comments",
        Some(RelationDescriptor::has_many("Comment")),
    );
    registry.register_attribute(
        "Post",
        "attachment",
        Some(RelationDescriptor::has_one("Attachment")),
    );

    registry.register_model("User");
    registry.register_attribute("User", "name", None);

    registry.register_model("Comment");
    registry.register_attribute("Comment", "text", None);
    registry.register_attribute(
        "Comment",
        "author",
        Some(RelationDescriptor::belongs_to("User", "authorId")),
    );

    registry.register_model("Attachment");
    registry.register_attribute("Attachment", "url", None);

    registry.register_service(ServiceDescriptor::new("posts", "Post", "posts"));
    registry.register_service(ServiceDescriptor::new("users", "User", "users"));
    registry.register_service(ServiceDescriptor::new("comments", "Comment", "comments"));
    registry.register_service(ServiceDescriptor::new(
        "attachments",
        "Attachment",
        "attachments",
    ));

    registry
}

/// Store over the fixture registry and a fresh mock transport
pub fn setup() -> (Arc<Store>, Arc<MockTransport>) {
    init_tracing();
    let transport = MockTransport::new();
    let store = Store::new(fixture_registry(), transport.clone());
    (store, transport)
}

/// Install a test subscriber once so `RUST_LOG=lode=debug` shows the
/// cache/task traces while debugging a suite
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
