//! Lodestore - observable client-side data layer
//!
//! Lodestore wraps asynchronous backend calls in observable state machines,
//! caches fetched records by identity, and resolves object-graph
//! relationships (has-one, has-many, belongs-to) between cached records
//! during JSON serialization.
//!
//! # Quick Start
//!
//! ```ignore
//! use lodestore::{Options, Registry, RelationDescriptor, ServiceDescriptor, Store};
//! use std::sync::Arc;
//!
//! // Declare the data model once, at startup
//! let registry = Arc::new(Registry::new());
//! registry.register_model("Post");
//! registry.register_attribute("Post", "title", None);
//! registry.register_attribute(
//!     "Post",
//!     "author",
//!     Some(RelationDescriptor::belongs_to("User", "authorId")),
//! );
//! registry.register_service(ServiceDescriptor::new("posts", "Post", "posts"));
//!
//! // Build the store over the injected registry and transport
//! let store = Store::new(registry, transport);
//! let posts = store.service("posts").unwrap();
//!
//! // Operations return observable handles immediately
//! let handle = posts.find_one(7);
//! let state = handle.done().await;
//! assert!(state.is_resolved());
//! ```
//!
//! # Architecture
//!
//! Three layers: `lode-core` (identity, signals, errors), `lode-task`
//! (the pending → loading → resolved | rejected machine with the epoch
//! guard against stale concurrent completions), and `lode-store`
//! (metadata registry, identity-mapped caches, relation-resolving
//! serialization). A caller invokes a service operation; the operation is
//! wrapped by a task; on success the raw JSON response is handed to the
//! serializer, which asks the owning service's cache to create-or-reuse
//! each related record; the resolved record graph becomes the task's
//! result.

pub use lode_core::{
    is_falsy, Error, JsonValue, RecordId, RecordKey, Result, Schema, SchemaViolation, Signal,
    SubscriberId, Timestamp, ValidationError,
};
pub use lode_store::{
    AttrValue, AttributeDescriptor, CacheEntry, Document, Envelope, ModelDescriptor, Operations,
    Options, Record, Registry, RelationDescriptor, RelationKind, Service, ServiceDescriptor,
    Store, Transport, WatcherId,
};
pub use lode_task::{Matcher, Task, TaskHandle, TaskState, TaskStatus};
