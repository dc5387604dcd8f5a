//! Record serialization and relation resolution
//!
//! Converts a record to/from its flat JSON representation by walking the
//! model's declared attributes in declaration order, recursively asking the
//! related model's owning service to materialize nested records.
//!
//! ## Relation asymmetry
//!
//! `has_one`/`has_many` payloads materialize through `create_record` —
//! always a fresh child, never shared (owned sub-documents). `belongs_to`
//! payloads materialize through `create_or_update_record` — identity
//! preserving (a reference to an independently-identified entity). This
//! asymmetry is an intentional ownership distinction; do not uniformize it.
//!
//! On the wire, `belongs_to` is the one place the representation diverges
//! from the in-memory attribute name: it serializes the related record's
//! *id* under the relation's configured foreign-key property.

use lode_core::{is_falsy, is_falsy_opt, JsonValue, RecordId, RecordKey};
use serde_json::Map;
use std::sync::Arc;

use crate::record::{AttrValue, Record};
use crate::registry::{AttributeDescriptor, ModelDescriptor, RelationKind};
use crate::service::Service;

impl Record {
    fn descriptor(&self) -> ModelDescriptor {
        let model = self.model_name();
        self.registry
            .model(model)
            .unwrap_or_else(|| panic!("model `{}` is not registered", model))
    }

    /// The service that materializes records of `model`
    ///
    /// # Panics
    ///
    /// Panics when no service is registered for the model or the store is
    /// gone — defects in static wiring, reported at first use.
    pub(crate) fn related_service(&self, model: &str) -> Arc<Service> {
        let key = self
            .registry
            .service_key_for_model(model)
            .unwrap_or_else(|| panic!("no service registered for model `{}`", model));
        let store = self
            .store
            .upgrade()
            .unwrap_or_else(|| panic!("store dropped while resolving a `{}` relation", model));
        store
            .service(&key)
            .unwrap_or_else(|| panic!("service `{}` was not instantiated", key))
    }

    /// The service owning this record's model
    pub(crate) fn owning_service(&self) -> Arc<Service> {
        self.related_service(self.model_name())
    }

    // =========================================================================
    // To JSON
    // =========================================================================

    /// Flat JSON representation of the record
    ///
    /// Always includes `id`. Attributes render in declaration order; with
    /// `omit_falsy`, falsy values are dropped. An absent `belongs_to`
    /// emits nothing; a present one emits only the related record's id
    /// under the foreign-key name.
    pub fn to_json(&self, omit_falsy: bool) -> JsonValue {
        let descriptor = self.descriptor();
        let mut json = Map::new();
        json.insert("id".to_string(), self.id().to_json());

        for attr in descriptor.attributes() {
            let value = self.attribute(&attr.name);

            if let Some(relation) = &attr.relation {
                if relation.kind == RelationKind::BelongsTo {
                    if let AttrValue::One(related) = &value {
                        let foreign_key = relation.foreign_key.clone().unwrap_or_else(|| {
                            panic!(
                                "belongs_to `{}` on model `{}` declares no foreign key",
                                attr.name,
                                self.model_name()
                            )
                        });
                        json.insert(foreign_key, related.id().to_json());
                    }
                    continue;
                }
            }

            let rendered = match value {
                AttrValue::Absent => continue,
                AttrValue::Value(v) => v,
                AttrValue::One(related) => related.to_json(omit_falsy),
                AttrValue::Many(records) => JsonValue::Array(
                    records.iter().map(|r| r.to_json(omit_falsy)).collect(),
                ),
            };
            if omit_falsy && is_falsy(&rendered) {
                continue;
            }
            json.insert(attr.name.clone(), rendered);
        }

        JsonValue::Object(json)
    }

    /// The flat JSON form of the current attribute values
    ///
    /// Used both as the validation input and, once retained after a
    /// hydration, as the revert target.
    pub fn snapshot(&self) -> JsonValue {
        self.to_json(false)
    }

    // =========================================================================
    // From JSON
    // =========================================================================

    /// Hydrate the record from a flat JSON payload
    ///
    /// Adopts `json.id` when the payload carries a usable one (otherwise
    /// the current — possibly placeholder — id stays). Walks the declared
    /// attributes; with `omit_falsy`, falsy payload values are skipped
    /// before any relation handling. Finally retains `json` as the
    /// record's latest snapshot.
    pub fn from_json(&self, json: &JsonValue, omit_falsy: bool) {
        let descriptor = self.descriptor();

        if let Some(id_value) = json.get("id") {
            if let Some(key) = RecordKey::from_json(id_value) {
                self.set_id(RecordId::Saved(key));
            }
        }

        for attr in descriptor.attributes() {
            let value = json.get(&attr.name);
            if omit_falsy && is_falsy_opt(value) {
                continue;
            }
            self.hydrate_attribute(attr, value);
        }

        self.set_latest_snapshot(json.clone());
    }

    /// Hydrate a single declared relation from a payload fragment
    ///
    /// Touches neither the id nor the other attributes — the
    /// `find_relation` path.
    ///
    /// # Panics
    ///
    /// Panics when `name` is not a declared relation of the model.
    pub fn apply_relation(&self, name: &str, payload: &JsonValue) {
        let descriptor = self.descriptor();
        let attr = descriptor.attribute(name).unwrap_or_else(|| {
            panic!(
                "`{}` is not a declared attribute of model `{}`",
                name,
                self.model_name()
            )
        });
        if attr.relation.is_none() {
            panic!(
                "`{}` on model `{}` is not a relation",
                name,
                self.model_name()
            );
        }
        self.hydrate_attribute(attr, Some(payload));
    }

    fn hydrate_attribute(&self, attr: &AttributeDescriptor, value: Option<&JsonValue>) {
        let Some(relation) = &attr.relation else {
            let next = match value {
                Some(v) => AttrValue::Value(v.clone()),
                None => AttrValue::Absent,
            };
            self.set_attribute(&attr.name, next);
            return;
        };

        match relation.kind {
            RelationKind::HasOne => {
                let next = match value {
                    Some(v) if v.is_object() => {
                        let child = self.related_service(&relation.model).create_record(v);
                        AttrValue::One(child)
                    }
                    _ => AttrValue::Absent,
                };
                self.set_attribute(&attr.name, next);
            }
            RelationKind::HasMany => {
                let service = self.related_service(&relation.model);
                let children = match value {
                    Some(JsonValue::Array(items)) => {
                        items.iter().map(|item| service.create_record(item)).collect()
                    }
                    _ => Vec::new(),
                };
                self.set_attribute(&attr.name, AttrValue::Many(children));
            }
            RelationKind::BelongsTo => {
                // resolution requires a nested object; a bare id cannot
                // materialize a reference
                let next = match value {
                    Some(v) if v.is_object() => {
                        let related = self
                            .related_service(&relation.model)
                            .create_or_update_record(v);
                        AttrValue::One(related)
                    }
                    _ => AttrValue::Absent,
                };
                self.set_attribute(&attr.name, next);
            }
        }
    }
}
