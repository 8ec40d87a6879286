use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::{
    CatalogError, CatalogResult, DatabaseCatalog, DatabaseId, DatabaseName, SchemaCatalog,
    SchemaName, TableCatalog, TableName,
};

/// Per-entity version counter. It only ever moves forward.
#[derive(Debug, Default)]
pub(crate) struct Version(AtomicU64);

impl Version {
    pub(crate) fn new(version: u64) -> Self {
        Self(AtomicU64::new(version))
    }

    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the version to `version` if that is newer. Returns whether it changed.
    pub(crate) fn advance(&self, version: u64) -> bool {
        self.0.fetch_max(version, Ordering::AcqRel) < version
    }
}

/// Something that can be indexed both by its id and its (unqualified) name.
pub(crate) trait Entity: Send + Sync {
    type Id: Copy + Eq + Ord + Hash + Debug + Send + Sync;

    fn entity_id(&self) -> Self::Id;

    fn entity_name(&self) -> &str;
}

/// A pair of concurrent maps, id -> entity and name -> entity, that are kept in
/// step with each other. Reads never take the write lock; the lock only
/// serializes writers so the two maps can't drift apart.
pub(crate) struct EntityIndex<E: Entity> {
    by_id: DashMap<E::Id, Arc<E>>,
    by_name: DashMap<Arc<str>, Arc<E>>,
    writes: Mutex<()>,
}

impl<E: Entity> Default for EntityIndex<E> {
    fn default() -> Self {
        Self {
            by_id: DashMap::new(),
            by_name: DashMap::new(),
            writes: Mutex::new(()),
        }
    }
}

impl<E: Entity> Debug for EntityIndex<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl<E: Entity> EntityIndex<E> {
    pub(crate) fn get_by_id(&self, id: &E::Id) -> Option<Arc<E>> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Option<Arc<E>> {
        self.by_name.get(name).map(|entry| entry.value().clone())
    }

    pub(crate) fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    // Must be called with the write lock held
    fn insert_locked(&self, entity: Arc<E>) -> Option<Arc<E>> {
        let replaced = self.by_id.insert(entity.entity_id(), entity.clone());
        if let Some(old) = &replaced {
            if old.entity_name() != entity.entity_name() {
                self.by_name.remove(old.entity_name());
            }
        }

        let name: Arc<str> = Arc::from(entity.entity_name());
        if let Some(old) = self.by_name.insert(name, entity.clone()) {
            if old.entity_id() != entity.entity_id() {
                self.by_id.remove(&old.entity_id());
            }
        }

        replaced
    }

    /// Insert the entity, replacing whatever was indexed under its id or name.
    pub(crate) fn insert(&self, entity: Arc<E>) -> Option<Arc<E>> {
        let _guard = self.writes.lock();
        self.insert_locked(entity)
    }

    /// Insert the entity unless one with the same id is already indexed. Returns the
    /// entity that ends up in the index.
    pub(crate) fn insert_if_absent(&self, entity: Arc<E>) -> Arc<E> {
        let _guard = self.writes.lock();
        if let Some(existing) = self.get_by_id(&entity.entity_id()) {
            return existing;
        }

        self.insert_locked(entity.clone());
        entity
    }

    /// Insert the entity unless its name is taken, in which case the current holder
    /// of the name is returned as the error.
    pub(crate) fn try_insert(&self, entity: Arc<E>) -> Result<(), Arc<E>> {
        let _guard = self.writes.lock();
        if let Some(existing) = self.get_by_name(entity.entity_name()) {
            return Err(existing);
        }

        self.insert_locked(entity);
        Ok(())
    }

    pub(crate) fn remove_by_name(&self, name: &str) -> Option<Arc<E>> {
        let _guard = self.writes.lock();
        let (_, removed) = self.by_name.remove(name)?;
        self.by_id.remove(&removed.entity_id());
        Some(removed)
    }

    /// All indexed names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.by_name.iter().map(|entry| entry.key().to_string()).collect();
        names.sort();
        names
    }

    /// All indexed entities, ordered by id.
    pub(crate) fn values(&self) -> Vec<Arc<E>> {
        let mut values: Vec<Arc<E>> =
            self.by_id.iter().map(|entry| entry.value().clone()).collect();
        values.sort_by_key(|entity| entity.entity_id());
        values
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }
}

/// Local replica of the cluster catalog.
///
/// Databases are indexed by id and by name; each database owns the index of its
/// schemas and each schema the index of its tables.
#[derive(Debug, Default)]
pub struct CatalogStore {
    databases: EntityIndex<DatabaseCatalog>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a database visible under both its id and its name. If a database with
    /// the same id is already registered, that one is kept and returned.
    pub fn register_database(&self, database: Arc<DatabaseCatalog>) -> Arc<DatabaseCatalog> {
        self.databases.insert_if_absent(database)
    }

    pub fn database(&self, name: &DatabaseName) -> Option<Arc<DatabaseCatalog>> {
        self.databases.get_by_name(name.as_str())
    }

    pub fn database_by_id(&self, id: DatabaseId) -> Option<Arc<DatabaseCatalog>> {
        self.databases.get_by_id(&id)
    }

    pub fn database_checked(&self, name: &DatabaseName) -> CatalogResult<Arc<DatabaseCatalog>> {
        self.database(name)
            .ok_or_else(|| CatalogError::DatabaseDoesNotExist {
                name: name.to_string(),
            })
    }

    pub fn schema(&self, name: &SchemaName) -> Option<Arc<SchemaCatalog>> {
        self.database(name.parent())?.schema(name.name())
    }

    pub fn schema_checked(&self, name: &SchemaName) -> CatalogResult<Arc<SchemaCatalog>> {
        self.database_checked(name.parent())?
            .schema(name.name())
            .ok_or_else(|| CatalogError::SchemaDoesNotExist {
                name: name.to_string(),
            })
    }

    pub fn table(&self, name: &TableName) -> Option<Arc<TableCatalog>> {
        self.schema(name.parent())?.table(name.name())
    }

    pub fn table_checked(&self, name: &TableName) -> CatalogResult<Arc<TableCatalog>> {
        self.schema_checked(name.parent())?
            .table(name.name())
            .ok_or_else(|| CatalogError::TableDoesNotExist {
                name: name.to_string(),
            })
    }

    /// All databases, ordered by id.
    pub fn databases(&self) -> Vec<Arc<DatabaseCatalog>> {
        self.databases.values()
    }

    pub fn database_names(&self) -> Vec<String> {
        self.databases.names()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.len() == 0
    }
}
