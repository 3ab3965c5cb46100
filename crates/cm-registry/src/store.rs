//! Per-tenant raw-model store.
//!
//! The store keeps each tenant's raw model schemas in registration order:
//! the order in which they must recompile, since a model's imports can
//! only resolve against models compiled before it. Every mutation bumps a
//! per-tenant version stamp; the cache uses the stamp to discard rebuild
//! results computed from an older snapshot than the latest publication.
//!
//! To avoid `DashMap` deadlocks the store never exposes guard types:
//! reads clone, and short-lived scopes are used internally.

use cm_core::{ModelSchema, QName, Tenant};
use dashmap::DashMap;

/// One stored raw model with its resolved qualified name.
#[derive(Debug, Clone)]
pub(crate) struct StoredModel {
    /// The model's qualified name.
    pub name: QName,
    /// The raw schema as registered.
    pub schema: ModelSchema,
}

/// A point-in-time view of one tenant's models.
#[derive(Debug, Clone, Default)]
pub(crate) struct StoreSnapshot {
    /// The store version the snapshot was taken at.
    pub version: u64,
    /// The models, in registration order.
    pub models: Vec<StoredModel>,
}

#[derive(Debug, Default)]
struct TenantModels {
    version: u64,
    models: Vec<StoredModel>,
}

/// The per-tenant raw-model store.
#[derive(Debug, Default)]
pub(crate) struct ModelStore {
    tenants: DashMap<Tenant, TenantModels>,
}

impl ModelStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns a cloned snapshot of the tenant's models.
    pub(crate) fn snapshot(&self, tenant: &Tenant) -> StoreSnapshot {
        self.tenants
            .get(tenant)
            .map(|entry| StoreSnapshot {
                version: entry.version,
                models: entry.models.clone(),
            })
            .unwrap_or_default()
    }

    /// Replaces the tenant's model list wholesale, bumping the version.
    ///
    /// Returns the new version stamp.
    pub(crate) fn replace(&self, tenant: &Tenant, models: Vec<StoredModel>) -> u64 {
        let mut entry = self.tenants.entry(tenant.clone()).or_default();
        entry.version += 1;
        entry.models = models;
        entry.version
    }

    /// Returns the tenant's current store version.
    pub(crate) fn version(&self, tenant: &Tenant) -> u64 {
        self.tenants.get(tenant).map_or(0, |entry| entry.version)
    }

    /// Returns `true` if the tenant has a model with the given name.
    pub(crate) fn contains(&self, tenant: &Tenant, name: &QName) -> bool {
        self.tenants
            .get(tenant)
            .is_some_and(|entry| entry.models.iter().any(|m| &m.name == name))
    }

    /// Returns the number of models registered for the tenant.
    pub(crate) fn model_count(&self, tenant: &Tenant) -> usize {
        self.tenants.get(tenant).map_or(0, |entry| entry.models.len())
    }
}

/// Replaces a same-named model in place or appends a new one.
///
/// Registration order is preserved for replaced models so later models'
/// imports keep resolving.
pub(crate) fn upsert(models: &mut Vec<StoredModel>, stored: StoredModel) {
    match models.iter_mut().find(|m| m.name == stored.name) {
        Some(existing) => *existing = stored,
        None => models.push(stored),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(local: &str) -> StoredModel {
        let mut schema = ModelSchema::new(format!("ex:{local}"));
        schema.add_namespace(format!("http://ns.example.org/{local}/1.0"), "ex");
        StoredModel {
            name: QName::new(format!("http://ns.example.org/{local}/1.0"), local),
            schema,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let store = ModelStore::new();
        let snapshot = store.snapshot(&Tenant::default());
        assert_eq!(snapshot.version, 0);
        assert!(snapshot.models.is_empty());
    }

    #[test]
    fn test_replace_bumps_version() {
        let store = ModelStore::new();
        let tenant = Tenant::default();

        let v1 = store.replace(&tenant, vec![stored("one")]);
        assert_eq!(v1, 1);
        let v2 = store.replace(&tenant, vec![stored("one"), stored("two")]);
        assert_eq!(v2, 2);

        let snapshot = store.snapshot(&tenant);
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.models.len(), 2);
        assert_eq!(store.model_count(&tenant), 2);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let store = ModelStore::new();
        store.replace(&Tenant::new("acme"), vec![stored("one")]);

        assert_eq!(store.model_count(&Tenant::new("acme")), 1);
        assert_eq!(store.model_count(&Tenant::default()), 0);
        assert_eq!(store.version(&Tenant::default()), 0);
    }

    #[test]
    fn test_contains() {
        let store = ModelStore::new();
        let tenant = Tenant::default();
        let model = stored("one");
        let name = model.name.clone();
        store.replace(&tenant, vec![model]);

        assert!(store.contains(&tenant, &name));
        assert!(!store.contains(&tenant, &QName::new("u", "other")));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut models = vec![stored("one"), stored("two")];

        let mut replacement = stored("one");
        replacement.schema.description = Some("updated".to_owned());
        upsert(&mut models, replacement);

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].schema.description.as_deref(), Some("updated"));

        upsert(&mut models, stored("three"));
        assert_eq!(models.len(), 3);
        assert_eq!(models[2].name.local_name(), "three");
    }
}
