//! Record: one instance of a declared model
//!
//! Records are reference-identity bearing: the layer hands them out as
//! `Arc<Record>` and the identity-map invariant is `Arc::ptr_eq` — for a
//! given service and id there is at most one live instance, and every
//! re-hydration mutates that instance's fields in place.
//!
//! A record carries its attribute values (plain JSON or resolved related
//! records), an observable validation-error list, the last JSON it was
//! hydrated from (the revert target), and a field-change watcher table so
//! an upper layer can react to attribute mutations without property
//! interception.
//!
//! Serialization and relation resolution live in [`crate::serialize`].

use lode_core::{JsonValue, RecordId, Signal, ValidationError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::registry::Registry;
use crate::store::Store;

/// Handle identifying one field watcher, for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId(u64);

type Watcher = Box<dyn Fn(&str) + Send + Sync>;

/// Value of one record attribute
#[derive(Clone)]
pub enum AttrValue {
    /// Not set / cleared
    Absent,
    /// Plain JSON value
    Value(JsonValue),
    /// A resolved related record (`has_one` or `belongs_to`)
    One(Arc<Record>),
    /// Resolved related records (`has_many`)
    Many(Vec<Arc<Record>>),
}

impl AttrValue {
    /// True when unset
    pub fn is_absent(&self) -> bool {
        matches!(self, AttrValue::Absent)
    }

    /// Falsiness: absent and falsy JSON are falsy; related records are not
    pub fn is_falsy(&self) -> bool {
        match self {
            AttrValue::Absent => true,
            AttrValue::Value(v) => lode_core::is_falsy(v),
            AttrValue::One(_) | AttrValue::Many(_) => false,
        }
    }

    /// The plain JSON value, when this is one
    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            AttrValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The related record, when this is one
    pub fn as_record(&self) -> Option<&Arc<Record>> {
        match self {
            AttrValue::One(r) => Some(r),
            _ => None,
        }
    }

    /// The related records, when this is a collection
    pub fn as_records(&self) -> Option<&[Arc<Record>]> {
        match self {
            AttrValue::Many(rs) => Some(rs),
            _ => None,
        }
    }
}

impl PartialEq for AttrValue {
    /// Plain values compare structurally; related records by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttrValue::Absent, AttrValue::Absent) => true,
            (AttrValue::Value(a), AttrValue::Value(b)) => a == b,
            (AttrValue::One(a), AttrValue::One(b)) => Arc::ptr_eq(a, b),
            (AttrValue::Many(a), AttrValue::Many(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Absent => f.write_str("Absent"),
            AttrValue::Value(v) => write!(f, "Value({})", v),
            AttrValue::One(r) => write!(f, "One({}#{})", r.model_name(), r.id()),
            AttrValue::Many(rs) => write!(f, "Many(len={})", rs.len()),
        }
    }
}

/// One instance of a declared model
pub struct Record {
    model: String,
    id: RwLock<RecordId>,
    attributes: RwLock<HashMap<String, AttrValue>>,
    errors: Signal<Vec<ValidationError>>,
    latest_snapshot: RwLock<Option<JsonValue>>,
    pub(crate) registry: Arc<Registry>,
    pub(crate) store: Weak<Store>,
    watchers: RwLock<Vec<(WatcherId, Watcher)>>,
    next_watcher: AtomicU64,
}

impl Record {
    /// Fresh record with an `unsaved-model-<n>` placeholder id
    pub(crate) fn new(
        model: impl Into<String>,
        registry: Arc<Registry>,
        store: Weak<Store>,
    ) -> Arc<Self> {
        Arc::new(Self {
            model: model.into(),
            id: RwLock::new(RecordId::unsaved()),
            attributes: RwLock::new(HashMap::new()),
            errors: Signal::new(Vec::new()),
            latest_snapshot: RwLock::new(None),
            registry,
            store,
            watchers: RwLock::new(Vec::new()),
            next_watcher: AtomicU64::new(1),
        })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Name of the model this record instantiates
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Current id (placeholder or backend-assigned)
    pub fn id(&self) -> RecordId {
        self.id.read().clone()
    }

    /// True while the backend has not assigned an id
    pub fn is_unsaved(&self) -> bool {
        self.id.read().is_unsaved()
    }

    pub(crate) fn set_id(&self, id: RecordId) {
        *self.id.write() = id;
        self.notify_watchers("id");
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Current value of an attribute (`Absent` when never set)
    pub fn attribute(&self, name: &str) -> AttrValue {
        self.attributes
            .read()
            .get(name)
            .cloned()
            .unwrap_or(AttrValue::Absent)
    }

    /// Set one attribute and notify field watchers
    pub fn set_attribute(&self, name: &str, value: AttrValue) {
        self.attributes.write().insert(name.to_string(), value);
        self.notify_watchers(name);
    }

    /// Set several attributes, notifying per field
    pub fn set_attributes(&self, values: impl IntoIterator<Item = (String, AttrValue)>) {
        for (name, value) in values {
            self.set_attribute(&name, value);
        }
    }

    /// Register a field watcher; it receives the mutated field's name
    pub fn watch(&self, f: impl Fn(&str) + Send + Sync + 'static) -> WatcherId {
        let id = WatcherId(self.next_watcher.fetch_add(1, Ordering::Relaxed));
        self.watchers.write().push((id, Box::new(f)));
        id
    }

    /// Remove a field watcher; unknown ids are ignored
    pub fn unwatch(&self, id: WatcherId) {
        self.watchers.write().retain(|(wid, _)| *wid != id);
    }

    fn notify_watchers(&self, field: &str) {
        for (_, watcher) in self.watchers.read().iter() {
            watcher(field);
        }
    }

    // =========================================================================
    // Validation errors
    // =========================================================================

    /// Current validation errors, in report order
    pub fn errors(&self) -> Vec<ValidationError> {
        self.errors.get()
    }

    /// The error-list signal, for subscription
    pub fn errors_signal(&self) -> &Signal<Vec<ValidationError>> {
        &self.errors
    }

    /// Replace the error list wholesale
    pub fn set_errors(&self, errors: Vec<ValidationError>) {
        self.errors.set(errors);
    }

    /// True when no errors are recorded
    pub fn is_valid(&self) -> bool {
        self.errors.with(|e| e.is_empty())
    }

    /// First error, optionally scoped to one attribute
    pub fn first_error(&self, attribute: Option<&str>) -> Option<ValidationError> {
        self.errors.with(|errors| match attribute {
            Some(attr) => errors
                .iter()
                .find(|e| e.attribute.as_deref() == Some(attr))
                .cloned(),
            None => errors.first().cloned(),
        })
    }

    /// Message of the first error, optionally scoped to one attribute
    pub fn first_error_message(&self, attribute: Option<&str>) -> Option<String> {
        self.first_error(attribute).map(|e| e.message)
    }

    /// True when an error is recorded, optionally scoped to one attribute
    pub fn has_error(&self, attribute: Option<&str>) -> bool {
        self.first_error(attribute).is_some()
    }

    /// Drop errors, either one attribute's or all of them
    pub fn clear_errors(&self, attribute: Option<&str>) {
        match attribute {
            Some(attr) => self.errors.update(|errors| {
                errors.retain(|e| e.attribute.as_deref() != Some(attr));
            }),
            None => self.errors.set(Vec::new()),
        }
    }

    /// Validate the whole snapshot against the model's registered schema
    ///
    /// Replaces the error list with the schema's violations; a model
    /// without a schema validates clean.
    pub fn validate(&self) {
        let errors = match self.registry.schema_for(&self.model) {
            Some(schema) => schema
                .validate(&self.snapshot())
                .into_iter()
                .map(ValidationError::from)
                .collect(),
            None => Vec::new(),
        };
        self.errors.set(errors);
    }

    /// Re-validate a single attribute, replacing only its errors
    pub fn validate_attribute(&self, attribute: &str) {
        self.clear_errors(Some(attribute));
        if let Some(schema) = self.registry.schema_for(&self.model) {
            let fresh: Vec<ValidationError> = schema
                .validate_attribute(attribute, &self.snapshot())
                .into_iter()
                .map(ValidationError::from)
                .collect();
            if !fresh.is_empty() {
                self.errors.update(|errors| errors.extend(fresh));
            }
        }
    }

    // =========================================================================
    // Snapshot / revert
    // =========================================================================

    /// The JSON the record was last hydrated from
    pub fn latest_snapshot(&self) -> Option<JsonValue> {
        self.latest_snapshot.read().clone()
    }

    pub(crate) fn set_latest_snapshot(&self, json: JsonValue) {
        *self.latest_snapshot.write() = Some(json);
    }

    /// Re-hydrate from the last loaded JSON; no-op when never hydrated
    pub fn revert_to_snapshot(&self) {
        let snapshot = self.latest_snapshot();
        if let Some(json) = snapshot {
            self.from_json(&json, false);
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model)
            .field("id", &self.id().to_string())
            .field("attributes", &self.attributes.read().len())
            .finish()
    }
}

impl PartialEq for Record {
    /// Records compare by reference identity — the identity-map invariant
    /// (`Arc::ptr_eq`): for a given service and id there is at most one live
    /// instance, so two `Arc<Record>` are equal exactly when they share one.
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_core::{Schema, SchemaViolation};
    use serde_json::json;

    fn bare_record(model: &str, registry: Arc<Registry>) -> Arc<Record> {
        Record::new(model, registry, Weak::new())
    }

    fn post_registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry.register_model("Post");
        registry.register_attribute("Post", "title", None);
        registry.register_attribute("Post", "body", None);
        registry
    }

    /// Requires a non-empty title
    struct TitleSchema;

    impl Schema for TitleSchema {
        fn validate(&self, snapshot: &JsonValue) -> Vec<SchemaViolation> {
            self.validate_attribute("title", snapshot)
        }

        fn validate_attribute(&self, attribute: &str, snapshot: &JsonValue) -> Vec<SchemaViolation> {
            if attribute != "title" {
                return Vec::new();
            }
            match snapshot.get("title") {
                Some(JsonValue::String(s)) if !s.is_empty() => Vec::new(),
                _ => vec![SchemaViolation::at("title", "is required")],
            }
        }
    }

    #[test]
    fn test_fresh_record_is_unsaved() {
        let record = bare_record("Post", post_registry());
        assert!(record.is_unsaved());
        assert!(record.id().to_string().starts_with("unsaved-model-"));
        assert!(record.latest_snapshot().is_none());
    }

    #[test]
    fn test_attribute_get_set() {
        let record = bare_record("Post", post_registry());
        assert!(record.attribute("title").is_absent());

        record.set_attribute("title", AttrValue::Value(json!("Hello")));
        assert_eq!(record.attribute("title").as_json(), Some(&json!("Hello")));
    }

    #[test]
    fn test_watchers_receive_field_names() {
        use parking_lot::Mutex;

        let record = bare_record("Post", post_registry());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();
        let id = record.watch(move |field| seen_in.lock().push(field.to_string()));

        record.set_attribute("title", AttrValue::Value(json!("a")));
        record.set_attribute("body", AttrValue::Value(json!("b")));
        record.unwatch(id);
        record.set_attribute("title", AttrValue::Value(json!("c")));

        assert_eq!(*seen.lock(), vec!["title", "body"]);
    }

    #[test]
    fn test_validate_collects_schema_violations() {
        let registry = post_registry();
        registry.register_schema("Post", Arc::new(TitleSchema));
        let record = bare_record("Post", registry);

        record.validate();
        assert!(!record.is_valid());
        assert_eq!(
            record.first_error_message(Some("title")).as_deref(),
            Some("is required")
        );

        record.set_attribute("title", AttrValue::Value(json!("Hi")));
        record.validate();
        assert!(record.is_valid());
    }

    #[test]
    fn test_validate_attribute_replaces_only_its_errors() {
        let registry = post_registry();
        registry.register_schema("Post", Arc::new(TitleSchema));
        let record = bare_record("Post", registry);

        record.set_errors(vec![
            lode_core::ValidationError::new("stale", "title"),
            lode_core::ValidationError::for_record("unrelated"),
        ]);
        record.validate_attribute("title");

        let errors = record.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.is_whole_record()));
        assert_eq!(
            record.first_error_message(Some("title")).as_deref(),
            Some("is required")
        );
    }

    #[test]
    fn test_clear_errors_scoped_and_whole() {
        let record = bare_record("Post", post_registry());
        record.set_errors(vec![
            lode_core::ValidationError::new("bad", "title"),
            lode_core::ValidationError::new("bad", "body"),
        ]);

        record.clear_errors(Some("title"));
        assert!(!record.has_error(Some("title")));
        assert!(record.has_error(Some("body")));

        record.clear_errors(None);
        assert!(record.is_valid());
    }

    #[test]
    fn test_validate_without_schema_is_clean() {
        let record = bare_record("Post", post_registry());
        record.set_errors(vec![lode_core::ValidationError::for_record("old")]);
        record.validate();
        assert!(record.is_valid());
    }

    #[test]
    fn test_errors_signal_notifies() {
        use std::sync::atomic::AtomicUsize;

        let record = bare_record("Post", post_registry());
        let notifications = Arc::new(AtomicUsize::new(0));
        let seen = notifications.clone();
        record.errors_signal().subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        record.set_errors(vec![lode_core::ValidationError::for_record("x")]);
        record.clear_errors(None);
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_attr_value_equality() {
        let registry = post_registry();
        let a = bare_record("Post", registry.clone());
        let b = bare_record("Post", registry);

        assert_eq!(AttrValue::Value(json!(1)), AttrValue::Value(json!(1)));
        assert_eq!(AttrValue::One(a.clone()), AttrValue::One(a.clone()));
        assert_ne!(AttrValue::One(a.clone()), AttrValue::One(b));
        assert_eq!(AttrValue::Absent, AttrValue::Absent);
        assert_ne!(AttrValue::Absent, AttrValue::Value(json!(null)));
    }
}
