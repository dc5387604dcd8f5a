//! Store: the top-level data-access object
//!
//! Owns the (injected) metadata registry and the transport, and
//! instantiates one [`Service`] per registered service descriptor at
//! construction time. Services and records hold weak back-references to
//! the store for relation resolution, so dropping the store drops every
//! cache with it.

use lode_core::{JsonValue, Result};
use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::Registry;
use crate::service::Service;
use crate::transport::{Envelope, Transport};

/// Top-level store: registry + transport + service instances
pub struct Store {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    services: HashMap<String, Arc<Service>>,
}

impl Store {
    /// Build a store over a populated registry
    ///
    /// Instantiates every registered service. The registry should be fully
    /// populated before this point; services registered later are not
    /// picked up.
    pub fn new(registry: Arc<Registry>, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let services = registry
                .service_keys()
                .into_iter()
                .map(|key| {
                    let descriptor = registry
                        .service(&key)
                        .expect("service key listed but not registered");
                    let service = Arc::new_cyclic(|service_weak| {
                        Service::new(
                            service_weak.clone(),
                            weak.clone(),
                            registry.clone(),
                            descriptor,
                        )
                    });
                    (key, service)
                })
                .collect();
            tracing::debug!(
                target: "lode::store",
                services = registry.service_keys().len(),
                "store initialized"
            );
            Self {
                registry,
                transport,
                services,
            }
        })
    }

    /// The injected metadata registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Service registered under `key`
    pub fn service(&self, key: &str) -> Option<Arc<Service>> {
        self.services.get(key).cloned()
    }

    /// Service owning `model`, resolved through the registry's association
    pub fn service_for_model(&self, model: &str) -> Option<Arc<Service>> {
        let key = self.registry.service_key_for_model(model)?;
        self.service(&key)
    }

    /// Every instantiated service
    pub fn services(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.services.values()
    }

    /// Issue one backend call through the transport
    pub async fn backend(&self, url: &str, body: Option<JsonValue>) -> Result<Envelope> {
        tracing::debug!(target: "lode::store", url, has_body = body.is_some(), "backend call");
        self.transport.post(url, body).await
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("services", &self.services.len())
            .finish()
    }
}
