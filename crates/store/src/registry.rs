//! Metadata registry
//!
//! Process-wide table of model attribute/relation declarations and
//! service-to-model associations. Every other component consults it instead
//! of hardcoding attribute lists: the serializer walks a model's declared
//! attributes in declaration order, and the relation resolver locates "the
//! service responsible for model X" solely through the model-to-service map
//! recorded here.
//!
//! The registry is explicitly constructed and dependency-injected into the
//! store — never a module-level global — so initialization order and test
//! isolation stay explicit. Registration is a single-threaded startup pass;
//! afterwards the registry is read-only.

use indexmap::IndexMap;
use lode_core::Schema;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Relation kinds between declared models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Owned sub-document, serialized as a nested object
    HasOne,
    /// Owned sub-documents, serialized as a nested array
    HasMany,
    /// Reference to an independently-identified entity, serialized as a
    /// foreign-key id
    BelongsTo,
}

/// Relation declaration attached to an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Kind of the relation
    pub kind: RelationKind,
    /// Name of the related model
    pub model: String,
    /// For `BelongsTo`: the wire property under which the related record's
    /// id is serialized (the inverse foreign key)
    pub foreign_key: Option<String>,
}

impl RelationDescriptor {
    /// Declare an owned single child
    pub fn has_one(model: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasOne,
            model: model.into(),
            foreign_key: None,
        }
    }

    /// Declare an owned collection
    pub fn has_many(model: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasMany,
            model: model.into(),
            foreign_key: None,
        }
    }

    /// Declare a reference to another entity, naming its wire foreign key
    pub fn belongs_to(model: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::BelongsTo,
            model: model.into(),
            foreign_key: Some(foreign_key.into()),
        }
    }
}

/// One declared attribute of a model, optionally carrying relation
/// semantics. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Attribute name (the in-memory field name)
    pub name: String,
    /// Relation semantics, absent for plain attributes
    pub relation: Option<RelationDescriptor>,
}

/// One declared model type: its name and ordered attribute set
///
/// Attribute declaration order is preserved and significant — it is the
/// iteration order for serialization.
#[derive(Debug, Clone, Default)]
pub struct ModelDescriptor {
    /// Model name
    pub name: String,
    attributes: IndexMap<String, AttributeDescriptor>,
}

impl ModelDescriptor {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
        }
    }

    fn add_attribute(&mut self, name: &str, relation: Option<RelationDescriptor>) {
        let descriptor = AttributeDescriptor {
            name: name.to_string(),
            relation,
        };
        // re-declaration overwrites in place, keeping the original position
        if self.attributes.insert(name.to_string(), descriptor).is_some() {
            tracing::warn!(
                target: "lode::store",
                model = %self.name,
                attribute = name,
                "attribute re-registered, overwriting declaration"
            );
        }
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    /// Look up one attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    /// Number of declared attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when no attributes are declared
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// One declared service: its lookup key, owning model and URL segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Key under which the store instantiates and exposes the service
    pub key: String,
    /// The model this service materializes, when it owns one
    pub model: Option<String>,
    /// URL segment for this service's resource (`/api/<base_url>/...`)
    pub base_url: String,
}

impl ServiceDescriptor {
    /// Declare a service owning a model
    pub fn new(
        key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            model: Some(model.into()),
            base_url: base_url.into(),
        }
    }

    /// Declare a service without an owning model
    pub fn modelless(key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: None,
            base_url: base_url.into(),
        }
    }
}

/// Model/service metadata tables
///
/// Lookups are fail-soft (`Option`); the panicking paths are reserved for
/// registration-time wiring defects (registering attributes on a model that
/// was never declared).
#[derive(Default)]
pub struct Registry {
    models: RwLock<HashMap<String, ModelDescriptor>>,
    services: RwLock<HashMap<String, ServiceDescriptor>>,
    model_to_service: RwLock<HashMap<String, String>>,
    schemas: RwLock<HashMap<String, Arc<dyn Schema>>>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration (startup pass)
    // =========================================================================

    /// Declare a model type
    ///
    /// Re-registration replaces the descriptor (permissive policy, logged).
    pub fn register_model(&self, name: impl Into<String>) {
        let name = name.into();
        let mut models = self.models.write();
        if models.insert(name.clone(), ModelDescriptor::new(&name)).is_some() {
            tracing::warn!(
                target: "lode::store",
                model = %name,
                "model re-registered, descriptor replaced"
            );
        }
    }

    /// Append an attribute to a declared model
    ///
    /// # Panics
    ///
    /// Panics if the model was never registered — a broken declaration
    /// pass, reported at startup rather than at first use.
    pub fn register_attribute(
        &self,
        model: &str,
        attribute: &str,
        relation: Option<RelationDescriptor>,
    ) {
        let mut models = self.models.write();
        let descriptor = models
            .get_mut(model)
            .unwrap_or_else(|| panic!("register_attribute on unregistered model `{}`", model));
        descriptor.add_attribute(attribute, relation);
    }

    /// Declare a service
    ///
    /// When the service owns a model, records the model-to-service
    /// association the relation resolver depends on.
    pub fn register_service(&self, descriptor: ServiceDescriptor) {
        if let Some(model) = &descriptor.model {
            self.model_to_service
                .write()
                .insert(model.clone(), descriptor.key.clone());
        }
        self.services
            .write()
            .insert(descriptor.key.clone(), descriptor);
    }

    /// Attach a validation schema to a declared model
    pub fn register_schema(&self, model: impl Into<String>, schema: Arc<dyn Schema>) {
        self.schemas.write().insert(model.into(), schema);
    }

    // =========================================================================
    // Lookups (fail-soft)
    // =========================================================================

    /// Descriptor of a declared model
    pub fn model(&self, name: &str) -> Option<ModelDescriptor> {
        self.models.read().get(name).cloned()
    }

    /// Descriptor of a declared service
    pub fn service(&self, key: &str) -> Option<ServiceDescriptor> {
        self.services.read().get(key).cloned()
    }

    /// Key of the service responsible for materializing a model
    pub fn service_key_for_model(&self, model: &str) -> Option<String> {
        self.model_to_service.read().get(model).cloned()
    }

    /// Validation schema attached to a model
    pub fn schema_for(&self, model: &str) -> Option<Arc<dyn Schema>> {
        self.schemas.read().get(model).cloned()
    }

    /// Keys of every declared service
    pub fn service_keys(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.models.read().len())
            .field("services", &self.services.read().len())
            .finish()
    }
}
