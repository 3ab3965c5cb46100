//! The dictionary session: an explicit, passed-by-reference registry
//! handle.
//!
//! A [`DictionarySession`] owns everything one dictionary instance needs:
//! the per-tenant raw-model store, the compiled-dictionary cache, label
//! bundles, registered constraint implementations, and change observers.
//! All operations go through the handle; there is no process-wide state.
//!
//! Writers (`put_model`/`remove_model`) serialize per tenant, compile
//! eagerly on the calling thread so a broken model is rejected before
//! anything is published, and publish the rebuilt dictionary wholesale.
//! Readers (`get_dictionary`) go through the asynchronously-refreshed
//! cache.

use std::sync::Arc;

use cm_compiler::{
    CompiledConstraint, CompiledDictionary, ConstraintDefinition, ModelCompiler,
    resolve_model_name,
};
use cm_core::{FxHashMap, MessageBundle, MessageRegistry, ModelSchema, QName, Tenant};
use cm_parser::validate_schema;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::info;

use crate::cache::{CacheStatsSnapshot, DEFAULT_REFRESH_WORKERS, DictionaryCache};
use crate::error::RegistryError;
use crate::store::{ModelStore, StoreSnapshot, StoredModel, upsert};

/// A pluggable constraint implementation registered on the session.
///
/// Model documents reference these through `registered` constraints; the
/// compiled dictionary records only the registration key.
pub trait ConstraintValidator: Send + Sync {
    /// Returns `true` if the value satisfies the constraint.
    fn evaluate(&self, value: &str) -> bool;
}

/// Observer notified after a successful model mutation.
///
/// Registered by collaborators that need to react to dictionary changes
/// (for example, to invalidate their own derived caches).
pub trait ModelChangeObserver: Send + Sync {
    /// A model was registered or replaced.
    fn model_put(&self, tenant: &Tenant, model: &QName);

    /// A model was removed.
    fn model_removed(&self, tenant: &Tenant, model: &QName);
}

/// Configuration for a dictionary session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Size of the background refresh worker pool, sized to the expected
    /// number of concurrently active tenants.
    pub refresh_workers: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_workers: DEFAULT_REFRESH_WORKERS,
        }
    }
}

struct SessionInner {
    store: Arc<ModelStore>,
    cache: DictionaryCache,
    messages: RwLock<MessageRegistry>,
    validators: RwLock<FxHashMap<String, Arc<dyn ConstraintValidator>>>,
    observers: RwLock<Vec<Arc<dyn ModelChangeObserver>>>,
    write_locks: DashMap<Tenant, Arc<Mutex<()>>>,
    default_analyser_bundle: RwLock<Option<String>>,
}

/// The dictionary session handle.
///
/// Cheaply cloneable; clones share the same store, cache, and registries.
#[derive(Clone)]
pub struct DictionarySession {
    inner: Arc<SessionInner>,
}

impl DictionarySession {
    /// Creates a session with the given configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        let store = Arc::new(ModelStore::new());
        let builder_store = Arc::clone(&store);
        let cache = DictionaryCache::new(
            Arc::new(move |tenant: &Tenant| {
                let snapshot = builder_store.snapshot(tenant);
                let dictionary = build_dictionary(&snapshot.models)?;
                Ok((snapshot.version, dictionary))
            }),
            config.refresh_workers,
        );

        Self {
            inner: Arc::new(SessionInner {
                store,
                cache,
                messages: RwLock::new(MessageRegistry::new()),
                validators: RwLock::new(FxHashMap::default()),
                observers: RwLock::new(Vec::new()),
                write_locks: DashMap::new(),
                default_analyser_bundle: RwLock::new(None),
            }),
        }
    }

    /// Registers (or replaces) a raw model for a tenant.
    ///
    /// The model is validated and the tenant's whole dictionary is
    /// recompiled on the calling thread; on success the new dictionary is
    /// published and the model's qualified name returned. On failure
    /// nothing changes; the previously published dictionary keeps being
    /// served.
    ///
    /// # Errors
    ///
    /// Propagates parse, namespace, and compile errors, including cyclic
    /// inheritance introduced by the model.
    pub fn put_model(
        &self,
        tenant: &Tenant,
        schema: ModelSchema,
    ) -> Result<QName, RegistryError> {
        validate_schema(&schema)?;
        let name = resolve_model_name(&schema)?;

        let lock = self.write_lock(tenant);
        let _guard = lock.lock();

        let snapshot = self.inner.store.snapshot(tenant);
        let mut staged = snapshot.models;
        upsert(
            &mut staged,
            StoredModel {
                name: name.clone(),
                schema,
            },
        );

        let dictionary = build_dictionary(&staged)?;
        let version = self.inner.store.replace(tenant, staged);
        let generation = self.inner.cache.publish(tenant, version, dictionary);
        info!(tenant = %tenant, model = %name, generation, "Registered model");

        for observer in self.inner.observers.read().iter() {
            observer.model_put(tenant, &name);
        }
        Ok(name)
    }

    /// Removes a model from a tenant.
    ///
    /// The remaining models are recompiled first; removal is rejected if
    /// it would break another model's imports or parents.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownModel`] when the model is not
    /// registered, and compile errors when the remaining set no longer
    /// compiles.
    pub fn remove_model(&self, tenant: &Tenant, name: &QName) -> Result<(), RegistryError> {
        let lock = self.write_lock(tenant);
        let _guard = lock.lock();

        let snapshot = self.inner.store.snapshot(tenant);
        if !snapshot.models.iter().any(|m| &m.name == name) {
            return Err(RegistryError::UnknownModel {
                model: name.to_string(),
            });
        }
        let staged: Vec<StoredModel> = snapshot
            .models
            .into_iter()
            .filter(|m| &m.name != name)
            .collect();

        let dictionary = build_dictionary(&staged)?;
        let version = self.inner.store.replace(tenant, staged);
        let generation = self.inner.cache.publish(tenant, version, dictionary);
        info!(tenant = %tenant, model = %name, generation, "Removed model");

        for observer in self.inner.observers.read().iter() {
            observer.model_removed(tenant, name);
        }
        Ok(())
    }

    /// Returns the tenant's compiled dictionary.
    ///
    /// Serves the published value when one exists (stale during refresh),
    /// or waits for the single in-flight build otherwise.
    ///
    /// # Errors
    ///
    /// Surfaces the build error when the awaited build fails; previously
    /// published generations are unaffected.
    pub async fn get_dictionary(
        &self,
        tenant: &Tenant,
    ) -> Result<Arc<CompiledDictionary>, Arc<RegistryError>> {
        self.inner.cache.get(tenant).await
    }

    /// Invalidates the tenant's cached dictionary.
    ///
    /// The next `get_dictionary` triggers an asynchronous rebuild from
    /// the raw-model store; the stale value keeps being served meanwhile.
    pub fn invalidate(&self, tenant: &Tenant) {
        self.inner.cache.invalidate(tenant);
    }

    /// Returns the tenant's published dictionary generation, if any.
    #[must_use]
    pub fn generation(&self, tenant: &Tenant) -> Option<u64> {
        self.inner.cache.generation(tenant)
    }

    /// Returns the number of models registered for the tenant.
    #[must_use]
    pub fn model_count(&self, tenant: &Tenant) -> usize {
        self.inner.store.model_count(tenant)
    }

    /// Returns `true` if the tenant has a model with the given name.
    #[must_use]
    pub fn contains_model(&self, tenant: &Tenant, name: &QName) -> bool {
        self.inner.store.contains(tenant, name)
    }

    /// Returns a snapshot of the cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.inner.cache.stats().snapshot()
    }

    /// Merges a label bundle into the session's message registry.
    pub fn add_label_bundle(&self, bundle: MessageBundle) {
        self.inner.messages.write().add_bundle(bundle);
    }

    /// Returns read access to the message registry.
    #[must_use]
    pub fn messages(&self) -> RwLockReadGuard<'_, MessageRegistry> {
        self.inner.messages.read()
    }

    /// Sets the process-wide default analyser bundle.
    pub fn set_default_analyser_bundle(&self, bundle: Option<String>) {
        *self.inner.default_analyser_bundle.write() = bundle;
    }

    /// Returns the process-wide default analyser bundle.
    #[must_use]
    pub fn default_analyser_bundle(&self) -> Option<String> {
        self.inner.default_analyser_bundle.read().clone()
    }

    /// Registers a pluggable constraint implementation.
    pub fn register_constraint(
        &self,
        name: impl Into<String>,
        validator: Arc<dyn ConstraintValidator>,
    ) {
        self.inner.validators.write().insert(name.into(), validator);
    }

    /// Evaluates a compiled constraint, delegating registered constraints
    /// to the session's validators.
    ///
    /// Returns `None` for a registered constraint with no validator.
    #[must_use]
    pub fn evaluate_constraint(
        &self,
        definition: &ConstraintDefinition,
        value: &str,
    ) -> Option<bool> {
        match &definition.constraint {
            CompiledConstraint::Registered(registered) => self
                .inner
                .validators
                .read()
                .get(&registered.registered_name)
                .map(|validator| validator.evaluate(value)),
            other => other.evaluate(value),
        }
    }

    /// Registers a change observer.
    pub fn register_observer(&self, observer: Arc<dyn ModelChangeObserver>) {
        self.inner.observers.write().push(observer);
    }

    /// Applies a staged bootstrap batch: replaces the tenant's model list,
    /// publishes the pre-built dictionary, and merges the label bundles.
    pub(crate) fn apply_bootstrap(
        &self,
        tenant: &Tenant,
        models: Vec<StoredModel>,
        dictionary: CompiledDictionary,
        bundles: Vec<MessageBundle>,
    ) {
        let lock = self.write_lock(tenant);
        let _guard = lock.lock();

        let names: Vec<QName> = models.iter().map(|m| m.name.clone()).collect();
        let version = self.inner.store.replace(tenant, models);
        self.inner.cache.publish(tenant, version, dictionary);

        let mut messages = self.inner.messages.write();
        for bundle in bundles {
            messages.add_bundle(bundle);
        }
        drop(messages);

        for observer in self.inner.observers.read().iter() {
            for name in &names {
                observer.model_put(tenant, name);
            }
        }
    }

    /// Returns the tenant's current store snapshot for staging.
    pub(crate) fn store_snapshot(&self, tenant: &Tenant) -> StoreSnapshot {
        self.inner.store.snapshot(tenant)
    }

    fn write_lock(&self, tenant: &Tenant) -> Arc<Mutex<()>> {
        if let Some(lock) = self.inner.write_locks.get(tenant) {
            return Arc::clone(&lock);
        }
        Arc::clone(
            &self
                .inner
                .write_locks
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

impl Default for DictionarySession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl std::fmt::Debug for DictionarySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionarySession")
            .field("default_tenant_models", &self.model_count(&Tenant::default()))
            .finish_non_exhaustive()
    }
}

/// Compiles a tenant's models, in registration order, into a fresh
/// dictionary.
pub(crate) fn build_dictionary(
    models: &[StoredModel],
) -> Result<CompiledDictionary, RegistryError> {
    let mut dictionary = CompiledDictionary::new();
    for stored in models {
        let compiled = ModelCompiler::new(&dictionary).compile(&stored.schema)?;
        dictionary.insert_model(compiled)?;
    }
    Ok(dictionary)
}
