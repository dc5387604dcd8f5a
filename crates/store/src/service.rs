//! Service: identity-mapped record cache and backend operations
//!
//! One service per registered [`ServiceDescriptor`], owning at most one
//! model. The cache guarantees at most one live record per backend id:
//! re-materializing an id re-hydrates the *same* instance in place instead
//! of allocating a new one. Entries are never evicted or expired.
//!
//! Every backend operation is an eagerly-built [`Task`], one per operation
//! name, reused across invocations; calling an operation returns the
//! in-progress handle synchronously.

use lode_core::{Error, JsonValue, RecordKey, Result, Timestamp};
use lode_task::{Task, TaskHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::record::Record;
use crate::registry::{Registry, ServiceDescriptor};
use crate::store::Store;
use crate::transport::Envelope;

/// One cached record and when it was last hydrated
///
/// `updated_at` is recorded on insert and on every in-place update; nothing
/// reads it yet — no staleness or eviction policy is derived from it.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The one live record for this id
    pub record: Arc<Record>,
    /// When the record was last hydrated through the cache
    pub updated_at: Timestamp,
}

impl CacheEntry {
    fn new(record: Arc<Record>) -> Self {
        Self {
            record,
            updated_at: Timestamp::now(),
        }
    }
}

/// Per-operation invocation options
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Reroute the request under this record's own service/id as a
    /// `relationships` sub-resource
    pub context: Option<Arc<Record>>,
    /// `date` filter appended as a query parameter (`find_many` only)
    pub date: Option<String>,
}

impl Options {
    /// Empty options
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread a context record
    pub fn with_context(mut self, context: Arc<Record>) -> Self {
        self.context = Some(context);
        self
    }

    /// Add a `date` filter
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// The operation-sites of a service, keyed by operation name
///
/// Built once at service construction and reused for every invocation —
/// each task's state is overwritten in place, never reallocated.
pub struct Operations {
    /// `find_many` site
    pub find_many: Task<Vec<Arc<Record>>, Error>,
    /// `find_one` site
    pub find_one: Task<Arc<Record>, Error>,
    /// `create` site
    pub create: Task<Arc<Record>, Error>,
    /// `update` site
    pub update: Task<Arc<Record>, Error>,
    /// `destroy` site
    pub destroy: Task<JsonValue, Error>,
    /// `attach` site
    pub attach: Task<JsonValue, Error>,
    /// `detach` site
    pub detach: Task<JsonValue, Error>,
    /// `find_relation` site
    pub find_relation: Task<Arc<Record>, Error>,
}

impl Operations {
    fn new() -> Self {
        Self {
            find_many: Task::new(),
            find_one: Task::new(),
            create: Task::new(),
            update: Task::new(),
            destroy: Task::new(),
            attach: Task::new(),
            detach: Task::new(),
            find_relation: Task::new(),
        }
    }
}

/// Identity-mapped cache plus backend operations for one model
pub struct Service {
    key: String,
    model: Option<String>,
    base_url: String,
    registry: Arc<Registry>,
    store: Weak<Store>,
    this: Weak<Service>,
    cache: Mutex<HashMap<RecordKey, CacheEntry>>,
    operations: Operations,
}

impl Service {
    pub(crate) fn new(
        this: Weak<Service>,
        store: Weak<Store>,
        registry: Arc<Registry>,
        descriptor: ServiceDescriptor,
    ) -> Self {
        Self {
            key: descriptor.key,
            model: descriptor.model,
            base_url: descriptor.base_url,
            registry,
            store,
            this,
            cache: Mutex::new(HashMap::new()),
            operations: Operations::new(),
        }
    }

    /// Strong handle to this service, for capture into operation futures
    fn arc(&self) -> Arc<Service> {
        self.this
            .upgrade()
            .expect("service outlived its own allocation")
    }

    /// Key this service is registered under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Model this service materializes, when it owns one
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// URL segment for this service's resource
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The observable operation-sites
    pub fn operations(&self) -> &Operations {
        &self.operations
    }

    fn owned_model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| panic!("service `{}` declares no owning model", self.key))
    }

    // =========================================================================
    // Identity-mapped cache
    // =========================================================================

    /// Allocate a brand-new record and hydrate it, bypassing the cache
    ///
    /// The path for records without a stable identity yet (freshly built
    /// forms, owned sub-documents). Two calls with identical JSON return
    /// distinct instances.
    pub fn create_record(&self, json: &JsonValue) -> Arc<Record> {
        let record = Record::new(self.owned_model(), self.registry.clone(), self.store.clone());
        record.from_json(json, false);
        record
    }

    /// Create or re-hydrate the one record for the payload's id
    ///
    /// The identity-preserving path: a cached id re-hydrates the *same*
    /// instance in place (refreshing `updated_at`); a new id inserts a new
    /// entry. A payload without a usable id degrades to the uncached
    /// [`Self::create_record`] path — an unsaved record never enters the
    /// cache.
    pub fn create_or_update_record(&self, json: &JsonValue) -> Arc<Record> {
        let key = json.get("id").and_then(RecordKey::from_json);
        let Some(key) = key else {
            tracing::warn!(
                target: "lode::cache",
                service = %self.key,
                "identity path called without a usable id, creating uncached record"
            );
            return self.create_record(json);
        };

        let existing = self.cache.lock().get(&key).map(|entry| entry.record.clone());
        if let Some(record) = existing {
            tracing::debug!(
                target: "lode::cache",
                service = %self.key,
                id = %key,
                "re-hydrating cached record in place"
            );
            record.from_json(json, false);
            if let Some(entry) = self.cache.lock().get_mut(&key) {
                entry.updated_at = Timestamp::now();
            }
            return record;
        }

        let record = self.create_record(json);
        // hydration can re-enter this cache through a cyclic payload; the
        // outer record wins, matching create-then-insert order
        self.cache.lock().insert(key, CacheEntry::new(record.clone()));
        record
    }

    /// Funnel a response payload through the identity path
    ///
    /// An array maps element-wise; a single object yields one record.
    pub fn records_from_response(&self, payload: JsonValue) -> Vec<Arc<Record>> {
        match payload {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.create_or_update_record(item))
                .collect(),
            other => vec![self.create_or_update_record(&other)],
        }
    }

    /// The cached record for an id, if any
    pub fn cached(&self, key: &RecordKey) -> Option<Arc<Record>> {
        self.cache.lock().get(key).map(|entry| entry.record.clone())
    }

    /// When the cached record for an id was last hydrated
    pub fn cached_at(&self, key: &RecordKey) -> Option<Timestamp> {
        self.cache.lock().get(key).map(|entry| entry.updated_at)
    }

    /// Number of cached records
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    // =========================================================================
    // URL building
    // =========================================================================

    /// `/api/<inner>`, or the `relationships` form under a context record
    fn api_url(&self, inner: &str, options: &Options) -> String {
        match &options.context {
            Some(context) => {
                let parent = context.owning_service();
                format!(
                    "/api/{}/{}/relationships/{}",
                    parent.base_url(),
                    context.id(),
                    inner
                )
            }
            None => format!("/api/{}", inner),
        }
    }

    pub(crate) async fn backend(&self, url: &str, body: Option<JsonValue>) -> Result<Envelope> {
        let store = self
            .store
            .upgrade()
            .ok_or_else(|| Error::transport("store was dropped"))?;
        store.backend(url, body).await
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Fetch every matching record; always hits the backend
    ///
    /// "Many" results are filter/date dependent, so there is no cache
    /// short-circuit; each response element funnels through the identity
    /// path.
    pub fn find_many(&self, options: Options) -> TaskHandle<Vec<Arc<Record>>, Error> {
        let mut url = self.api_url(&format!("{}/findMany", self.base_url), &options);
        if let Some(date) = &options.date {
            url = format!("{}?date={}", url, date);
        }
        let service = self.arc();
        self.operations.find_many.invoke(async move {
            let envelope = service.backend(&url, None).await?;
            Ok(service.records_from_response(envelope.into_inner()))
        })
    }

    /// Fetch one record by id
    ///
    /// A cached id resolves synchronously with the cached record — no
    /// transport call is made, ever, for an id the cache holds.
    pub fn find_one(&self, id: impl Into<RecordKey>) -> TaskHandle<Arc<Record>, Error> {
        let key = id.into();
        if let Some(record) = self.cached(&key) {
            tracing::debug!(
                target: "lode::cache",
                service = %self.key,
                id = %key,
                "find_one served from identity cache"
            );
            return self.operations.find_one.resolve_now(record);
        }

        let url = format!("/api/{}/{}/findOne", self.base_url, key);
        let service = self.arc();
        self.operations.find_one.invoke(async move {
            let envelope = service.backend(&url, None).await?;
            service
                .records_from_response(envelope.into_inner())
                .into_iter()
                .next()
                .ok_or_else(|| Error::Serialization("empty findOne response".to_string()))
        })
    }

    /// Persist a new record; the response hydrates the same record,
    /// assigning its backend id
    pub fn create(&self, record: Arc<Record>, options: Options) -> TaskHandle<Arc<Record>, Error> {
        let url = self.api_url(&format!("{}/create", self.base_url), &options);
        let body = record.to_json(false);
        let service = self.arc();
        self.operations.create.invoke(async move {
            let envelope = service.backend(&url, Some(body)).await?;
            record.from_json(&envelope.into_inner(), false);
            Ok(record)
        })
    }

    /// Persist changes to a record; the response re-hydrates it
    pub fn update(&self, record: Arc<Record>, options: Options) -> TaskHandle<Arc<Record>, Error> {
        let url = self.api_url(&format!("{}/{}/update", self.base_url, record.id()), &options);
        let body = record.to_json(false);
        let service = self.arc();
        self.operations.update.invoke(async move {
            let envelope = service.backend(&url, Some(body)).await?;
            record.from_json(&envelope.into_inner(), false);
            Ok(record)
        })
    }

    /// Delete a record on the backend
    ///
    /// Resolves with the response payload. The cache is untouched — this
    /// design has no eviction.
    pub fn destroy(&self, record: Arc<Record>, options: Options) -> TaskHandle<JsonValue, Error> {
        let url = self.api_url(&format!("{}/{}/destroy", self.base_url, record.id()), &options);
        let body = record.to_json(false);
        let service = self.arc();
        self.operations.destroy.invoke(async move {
            let envelope = service.backend(&url, Some(body)).await?;
            Ok(envelope.into_inner())
        })
    }

    /// Attach a record to the context resource
    pub fn attach(&self, record: Arc<Record>, options: Options) -> TaskHandle<JsonValue, Error> {
        let url = self.api_url(&format!("{}/{}/attach", self.base_url, record.id()), &options);
        let service = self.arc();
        self.operations.attach.invoke(async move {
            let envelope = service.backend(&url, None).await?;
            Ok(envelope.into_inner())
        })
    }

    /// Detach a record from the context resource
    pub fn detach(&self, record: Arc<Record>, options: Options) -> TaskHandle<JsonValue, Error> {
        let url = self.api_url(&format!("{}/{}/detach", self.base_url, record.id()), &options);
        let service = self.arc();
        self.operations.detach.invoke(async move {
            let envelope = service.backend(&url, None).await?;
            Ok(envelope.into_inner())
        })
    }

    /// Fetch one declared relation of a record and hydrate it in place
    ///
    /// Resolves with the same record once the relation is applied.
    pub fn find_relation(
        &self,
        record: Arc<Record>,
        relation_name: impl Into<String>,
    ) -> TaskHandle<Arc<Record>, Error> {
        let relation_name = relation_name.into();
        let url = format!("/api/{}/{}/{}", self.base_url, record.id(), relation_name);
        let service = self.arc();
        self.operations.find_relation.invoke(async move {
            let envelope = service.backend(&url, None).await?;
            record.apply_relation(&relation_name, &envelope.into_inner());
            Ok(record)
        })
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("key", &self.key)
            .field("model", &self.model)
            .field("cached", &self.cache_len())
            .finish()
    }
}
