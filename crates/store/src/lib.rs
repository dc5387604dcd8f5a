//! Record store: metadata registry, identity-mapped caches, relation
//! resolution
//!
//! This crate is the data-access layer proper:
//! - [`Registry`]: model attribute/relation declarations and
//!   service-to-model associations, explicitly constructed and injected
//! - [`Record`]: a reference-identity record with observable errors and a
//!   revert snapshot
//! - [`Service`]: per-model identity-mapped cache plus the CRUD-style
//!   operations, each an observable task
//! - [`Store`]: owns the registry, the transport and the service instances
//! - [`Transport`]: the single POST-style backend seam
//!
//! Control flow: a service operation wraps its backend call in a task; on
//! success the raw JSON response is handed to the record serializer, which
//! asks the owning service's cache to create-or-reuse each related record;
//! the resolved record graph becomes the task's result.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod record;
pub mod registry;
pub mod serialize;
pub mod service;
pub mod store;
pub mod transport;

pub use record::{AttrValue, Record, WatcherId};
pub use registry::{
    AttributeDescriptor, ModelDescriptor, Registry, RelationDescriptor, RelationKind,
    ServiceDescriptor,
};
pub use service::{CacheEntry, Operations, Options, Service};
pub use store::Store;
pub use transport::{Document, Envelope, Transport};
