use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use clade::meta::{
    create_request::CatalogBody, drop_request::CatalogId, Catalog, CreateRequest,
    DropRequest, GetCatalogRequest, GetIdRequest, HeartbeatRequest,
};
use dashmap::DashSet;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::catalog::wire::{
    catalog_snapshot, database_id_of, database_to_wire, schema_id_of, schema_to_wire,
    table_id_of, table_info_from_wire, table_ref_id, table_to_wire,
};
use crate::catalog::{
    check_status, CatalogError, CatalogResult, CatalogStore, CreateTableInfo,
    DatabaseCatalog, DatabaseId, DatabaseName, HeartbeatHandle, MetaClient,
    PropagationDelay, SchemaCatalog, SchemaId, SchemaName, TableCatalog, TableName,
};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub heartbeat_interval: Duration,
    /// How long a mutation waits after being confirmed, before returning.
    pub propagation_delay: PropagationDelay,
    /// Reported to the metadata service with every heartbeat.
    pub node_id: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            propagation_delay: PropagationDelay::from_heartbeat(
                DEFAULT_HEARTBEAT_INTERVAL,
                PropagationDelay::DEFAULT_MULTIPLIER,
            ),
            node_id: format!("frontend-{}", std::process::id()),
        }
    }
}

/// A frontend's replica of the cluster catalog, kept in sync with the metadata
/// service that owns it.
///
/// Reads only ever hit the local replica. Mutations go to the metadata service
/// first and are applied locally once it confirmed them; changes made by other
/// frontends arrive with the periodic heartbeat (see [`RemoteCatalog::start_heartbeat`]).
#[derive(Debug)]
pub struct RemoteCatalog {
    client: Arc<dyn MetaClient>,
    store: CatalogStore,
    // Tables being created right now; a heartbeat must not drop those even if
    // its snapshot doesn't have them yet.
    creating_tables: DashSet<TableName>,
    // Serializes mutations made through this frontend.
    mutations: Mutex<()>,
    options: CatalogOptions,
}

// Clears the in-flight mark of a table however its creation ends.
struct CreatingTable<'a> {
    tables: &'a DashSet<TableName>,
    name: TableName,
}

impl<'a> CreatingTable<'a> {
    fn mark(tables: &'a DashSet<TableName>, name: TableName) -> Self {
        tables.insert(name.clone());
        Self { tables, name }
    }
}

impl Drop for CreatingTable<'_> {
    fn drop(&mut self) {
        self.tables.remove(&self.name);
    }
}

impl RemoteCatalog {
    /// Load the full catalog from the metadata service into a fresh replica.
    ///
    /// Doesn't start the heartbeat.
    pub async fn try_new(
        client: Arc<dyn MetaClient>,
        options: CatalogOptions,
    ) -> CatalogResult<Arc<Self>> {
        let catalog = Self {
            client,
            store: CatalogStore::new(),
            creating_tables: DashSet::new(),
            mutations: Mutex::new(()),
            options,
        };
        catalog.init_catalog().await?;
        Ok(Arc::new(catalog))
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// Current content of the replica in the metadata service's snapshot format.
    pub fn snapshot(&self) -> CatalogResult<Catalog> {
        catalog_snapshot(&self.store)
    }

    pub fn start_heartbeat(self: &Arc<Self>) -> HeartbeatHandle {
        HeartbeatHandle::spawn(self.clone(), self.options.heartbeat_interval)
    }

    async fn init_catalog(&self) -> CatalogResult<()> {
        let response = self.client.get_catalog(GetCatalogRequest {}).await?;
        check_status(response.status.as_ref(), "Init catalog")?;
        let catalog = response.catalog.unwrap_or_default();

        info!(
            "Loading catalog: {} database(s), {} schema(s), {} table(s)",
            catalog.databases.len(),
            catalog.schemas.len(),
            catalog.tables.len()
        );
        validate_snapshot(&self.store, &catalog)?;

        for database in &catalog.databases {
            let db = DatabaseCatalog::new(
                database_id_of(database)?,
                DatabaseName::new(database.database_name.as_str()),
            );
            db.advance_version(database.version);
            self.store.register_database(Arc::new(db));
        }

        for schema in &catalog.schemas {
            let id = schema_id_of(schema)?;
            self.database_by_id_checked(id.database_id)?
                .create_schema_with_id(&schema.schema_name, id.schema_id)?
                .advance_version(schema.version);
        }

        for table in &catalog.tables {
            let id = table_id_of(table)?;
            let info = table_info_from_wire(table)?;
            self.schema_by_id_checked(id.schema_id)?
                .create_table_with_id(&info, id.table_id)?
                .advance_version(table.version);
        }

        Ok(())
    }

    /// Reconcile the replica with the metadata service's current snapshot.
    ///
    /// New entities are registered, entities with a newer version replace the
    /// local ones, and tables of known schemas that are missing from the snapshot
    /// get dropped, unless they're being created by this frontend.
    pub async fn heartbeat(&self) -> CatalogResult<()> {
        // Only tables marked before the snapshot is requested are spared by the
        // deletion pass.
        let creating: HashSet<TableName> = self
            .creating_tables
            .iter()
            .map(|name| name.key().clone())
            .collect();

        let response = self
            .client
            .heartbeat(HeartbeatRequest {
                node_id: self.options.node_id.clone(),
            })
            .await?;
        check_status(response.status.as_ref(), "Heartbeat")?;
        let catalog = response.catalog.unwrap_or_default();
        validate_snapshot(&self.store, &catalog)?;

        // TODO: drop databases and schemas missing from the snapshot once the
        // metadata service can drop them
        for database in &catalog.databases {
            let name = DatabaseName::new(database.database_name.as_str());
            match self.store.database(&name) {
                Some(local) => {
                    if local.advance_version(database.version) {
                        debug!("Database {name} is now at version {}", database.version);
                    }
                }
                None => {
                    let db = DatabaseCatalog::new(database_id_of(database)?, name);
                    db.advance_version(database.version);
                    let db = self.store.register_database(Arc::new(db));
                    debug!("Database {} appeared with id {}", db.name(), db.id());
                }
            }
        }

        // Tables each already known schema had before this heartbeat. Whatever is
        // still in there after the table pass is gone from the metadata service.
        let mut stale_tables: HashMap<SchemaId, (Arc<SchemaCatalog>, HashSet<String>)> =
            HashMap::new();

        for schema in &catalog.schemas {
            let id = schema_id_of(schema)?;
            let database = self.database_by_id_checked(id.database_id)?;
            match database.schema_by_id(id) {
                Some(local) => {
                    let names = local.table_names().into_iter().collect();
                    if local.advance_version(schema.version) {
                        debug!("Schema {} is now at version {}", local.name(), schema.version);
                    }
                    stale_tables.insert(id, (local, names));
                }
                None => {
                    let created =
                        database.create_schema_with_id(&schema.schema_name, id.schema_id)?;
                    created.advance_version(schema.version);
                    debug!("Schema {} appeared with id {id}", created.name());
                }
            }
        }

        for table in &catalog.tables {
            let id = table_id_of(table)?;
            let schema = self.schema_by_id_checked(id.schema_id)?;
            if let Some((_, names)) = stale_tables.get_mut(&id.schema_id) {
                names.remove(table.table_name.as_str());
            }

            let is_newer = schema
                .table(&table.table_name)
                .map_or(true, |local| local.version() < table.version);
            if is_newer {
                let fresh = schema.new_table(&table_info_from_wire(table)?, id.table_id);
                fresh.advance_version(table.version);
                debug!("Table {} is now at version {}", fresh.name(), table.version);
                schema.replace_table(Arc::new(fresh));
            }
        }

        for (schema, names) in stale_tables.into_values() {
            for name in names {
                let table_name = TableName::new(schema.name().clone(), name.as_str());
                if creating.contains(&table_name) {
                    debug!("Keeping table {table_name}, it is being created");
                    continue;
                }
                if schema.drop_table(&name).is_some() {
                    debug!("Table {table_name} is gone, dropping it");
                }
            }
        }

        Ok(())
    }

    async fn get_id(&self) -> CatalogResult<i32> {
        let response = self.client.get_id(GetIdRequest {}).await?;
        check_status(response.status.as_ref(), "Get id")?;
        Ok(response.id)
    }

    /// Create a database together with its first schema.
    pub async fn create_database(
        &self,
        name: &DatabaseName,
        schema_name: &str,
    ) -> CatalogResult<Arc<DatabaseCatalog>> {
        let database = {
            let _guard = self.mutations.lock().await;
            info!("Creating database {name}");

            if self.store.database(name).is_some() {
                return Err(CatalogError::DatabaseAlreadyExists {
                    name: name.to_string(),
                });
            }

            let database = DatabaseCatalog::new(DatabaseId(self.get_id().await?), name.clone());
            let request = CreateRequest {
                catalog_body: Some(CatalogBody::Database(database_to_wire(&database))),
            };
            let response = self.client.create(request).await?;
            check_status(response.status.as_ref(), "Create database")?;
            database.advance_version(response.version);
            let database = self.store.register_database(Arc::new(database));

            self.submit_schema(&SchemaName::new(name.clone(), schema_name))
                .await?;
            database
        };

        self.options.propagation_delay.wait().await;
        Ok(database)
    }

    pub async fn create_schema(&self, name: &SchemaName) -> CatalogResult<Arc<SchemaCatalog>> {
        let schema = {
            let _guard = self.mutations.lock().await;
            self.submit_schema(name).await?
        };

        self.options.propagation_delay.wait().await;
        Ok(schema)
    }

    // Caller holds the mutation lock.
    async fn submit_schema(&self, name: &SchemaName) -> CatalogResult<Arc<SchemaCatalog>> {
        info!("Creating schema {name}");
        let database = self.store.database_checked(name.parent())?;
        if database.has_schema(name.name()) {
            return Err(CatalogError::SchemaAlreadyExists {
                name: name.to_string(),
            });
        }

        let schema = database.new_schema(name.name(), self.get_id().await?);
        let request = CreateRequest {
            catalog_body: Some(CatalogBody::Schema(schema_to_wire(&schema))),
        };
        let response = self.client.create(request).await?;
        check_status(response.status.as_ref(), "Create schema")?;
        schema.advance_version(response.version);

        Ok(database.register_schema(Arc::new(schema)))
    }

    pub async fn create_table(
        &self,
        schema_name: &SchemaName,
        info: &CreateTableInfo,
    ) -> CatalogResult<Arc<TableCatalog>> {
        let table = {
            let _guard = self.mutations.lock().await;
            let name = TableName::new(schema_name.clone(), info.name());
            info!("Creating table {name}");

            let schema = self.store.schema_checked(schema_name)?;
            if schema.has_table(info.name()) {
                return Err(CatalogError::TableAlreadyExists {
                    name: name.to_string(),
                });
            }

            let _creating = CreatingTable::mark(&self.creating_tables, name);
            self.submit_table(&schema, info).await?
        };

        self.options.propagation_delay.wait().await;
        Ok(table)
    }

    async fn submit_table(
        &self,
        schema: &SchemaCatalog,
        info: &CreateTableInfo,
    ) -> CatalogResult<Arc<TableCatalog>> {
        let table = schema.new_table(info, self.get_id().await?);
        let request = CreateRequest {
            catalog_body: Some(CatalogBody::Table(table_to_wire(&table)?)),
        };
        let response = self.client.create(request).await?;
        check_status(response.status.as_ref(), "Create table")?;
        table.advance_version(response.version);

        Ok(schema.register_table(Arc::new(table)))
    }

    pub async fn drop_table(&self, name: &TableName) -> CatalogResult<()> {
        {
            let _guard = self.mutations.lock().await;
            info!("Dropping table {name}");

            let schema = self.store.schema_checked(name.parent())?;
            let table = schema
                .table(name.name())
                .ok_or_else(|| CatalogError::TableDoesNotExist {
                    name: name.to_string(),
                })?;

            let request = DropRequest {
                catalog_id: Some(CatalogId::TableId(table_ref_id(table.id()))),
            };
            let response = self.client.drop_entity(request).await?;
            check_status(response.status.as_ref(), "Drop table")?;
            schema.drop_table(name.name());
        }

        self.options.propagation_delay.wait().await;
        Ok(())
    }

    pub fn get_database(&self, name: &DatabaseName) -> Option<Arc<DatabaseCatalog>> {
        self.store.database(name)
    }

    pub fn get_database_by_id(&self, id: DatabaseId) -> Option<Arc<DatabaseCatalog>> {
        self.store.database_by_id(id)
    }

    pub fn get_schema(&self, name: &SchemaName) -> Option<Arc<SchemaCatalog>> {
        self.store.schema(name)
    }

    pub fn get_table(&self, name: &TableName) -> Option<Arc<TableCatalog>> {
        self.store.table(name)
    }

    fn database_by_id_checked(&self, id: DatabaseId) -> CatalogResult<Arc<DatabaseCatalog>> {
        self.store
            .database_by_id(id)
            .ok_or_else(|| CatalogError::DatabaseDoesNotExist {
                name: id.to_string(),
            })
    }

    fn schema_by_id_checked(&self, id: SchemaId) -> CatalogResult<Arc<SchemaCatalog>> {
        self.database_by_id_checked(id.database_id)?
            .schema_by_id(id)
            .ok_or_else(|| CatalogError::SchemaDoesNotExist {
                name: id.to_string(),
            })
    }
}

/// Check that the parent of every schema and table in a snapshot is either in the
/// snapshot itself or already in the replica, and that every database and schema
/// name maps to the same id in both, so that a snapshot gets applied whole or not
/// at all.
fn validate_snapshot(store: &CatalogStore, catalog: &Catalog) -> CatalogResult<()> {
    let mut databases: HashMap<DatabaseId, &str> = HashMap::new();
    let mut database_names: HashMap<&str, DatabaseId> = HashMap::new();
    for database in &catalog.databases {
        let id = database_id_of(database)?;
        let name = database.database_name.as_str();

        let local_by_name = store.database(&DatabaseName::new(name));
        let other_id = database_names
            .insert(name, id)
            .or_else(|| local_by_name.map(|local| local.id()))
            .filter(|other| *other != id);
        if let Some(other_id) = other_id {
            return Err(conflict(format!(
                "database {name:?} has id {other_id}, not {id}"
            )));
        }

        let local_by_id = store.database_by_id(id);
        let other_name = databases
            .insert(id, name)
            .map(str::to_string)
            .or_else(|| local_by_id.map(|local| local.name().to_string()))
            .filter(|other| other != name);
        if let Some(other_name) = other_name {
            return Err(conflict(format!(
                "database {id} is named {other_name:?}, not {name:?}"
            )));
        }
    }

    let has_database =
        |id: DatabaseId| databases.contains_key(&id) || store.database_by_id(id).is_some();

    let mut schemas: HashMap<SchemaId, &str> = HashMap::new();
    let mut schema_names: HashMap<(DatabaseId, &str), SchemaId> = HashMap::new();
    for schema in &catalog.schemas {
        let id = schema_id_of(schema)?;
        if !has_database(id.database_id) {
            return Err(CatalogError::DatabaseDoesNotExist {
                name: id.database_id.to_string(),
            });
        }

        let name = schema.schema_name.as_str();
        let local_database = store.database_by_id(id.database_id);

        let other_id = schema_names
            .insert((id.database_id, name), id)
            .or_else(|| {
                local_database
                    .as_ref()
                    .and_then(|database| database.schema(name))
                    .map(|local| local.id())
            })
            .filter(|other| *other != id);
        if let Some(other_id) = other_id {
            return Err(conflict(format!(
                "schema {name:?} has id {other_id}, not {id}"
            )));
        }

        let other_name = schemas
            .insert(id, name)
            .map(str::to_string)
            .or_else(|| {
                local_database
                    .as_ref()
                    .and_then(|database| database.schema_by_id(id))
                    .map(|local| local.name().name().to_string())
            })
            .filter(|other| other != name);
        if let Some(other_name) = other_name {
            return Err(conflict(format!(
                "schema {id} is named {other_name:?}, not {name:?}"
            )));
        }
    }

    for table in &catalog.tables {
        let id = table_id_of(table)?;
        if !has_database(id.schema_id.database_id) {
            return Err(CatalogError::DatabaseDoesNotExist {
                name: id.schema_id.database_id.to_string(),
            });
        }

        let has_schema = schemas.contains_key(&id.schema_id)
            || store
                .database_by_id(id.schema_id.database_id)
                .and_then(|database| database.schema_by_id(id.schema_id))
                .is_some();
        if !has_schema {
            return Err(CatalogError::SchemaDoesNotExist {
                name: id.schema_id.to_string(),
            });
        }

        table_info_from_wire(table)?;
    }

    Ok(())
}

fn conflict(reason: String) -> CatalogError {
    CatalogError::Conflict { reason }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use arrow_schema::DataType;
    use clade::meta::data_type::TypeName;
    use clade::meta::status::Code;
    use clade::meta::{Catalog, Status};
    use tokio::time::Instant;

    use super::{CatalogOptions, RemoteCatalog};
    use crate::catalog::memory::{MemoryMetaClient, MetaOp};
    use crate::catalog::{
        CatalogError, ColumnDesc, CreateTableInfo, DatabaseName, PropagationDelay,
        TableName,
    };
    use crate::testutils::{
        sample_catalog, wire_column, wire_database, wire_schema, wire_table,
    };

    fn options() -> CatalogOptions {
        CatalogOptions {
            propagation_delay: PropagationDelay::none(),
            ..Default::default()
        }
    }

    async fn make_catalog(
        snapshot: Catalog,
    ) -> (Arc<MemoryMetaClient>, Arc<RemoteCatalog>) {
        let client = Arc::new(MemoryMetaClient::with_catalog(snapshot));
        let catalog = RemoteCatalog::try_new(client.clone(), options())
            .await
            .unwrap();
        (client, catalog)
    }

    fn table_info(name: &str) -> CreateTableInfo {
        CreateTableInfo::builder(name)
            .add_column("x", ColumnDesc::new(DataType::Int64).primary())
            .build()
    }

    fn t1() -> TableName {
        "db1.s1.t1".parse().unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_loads_everything() {
        let (_, catalog) = make_catalog(sample_catalog()).await;

        let db = catalog.get_database(&DatabaseName::new("db1")).unwrap();
        assert_eq!((db.id().0, db.version()), (1, 1));

        let schema = catalog.get_schema(&"db1.s1".parse().unwrap()).unwrap();
        assert_eq!((schema.id().to_string(), schema.version()), ("1.2".to_string(), 1));

        let table = catalog.get_table(&t1()).unwrap();
        assert_eq!(table.id().to_string(), "1.2.3");
        assert_eq!(table.version(), 1);
        assert_eq!(table.columns().len(), 1);
        assert_eq!(table.columns()[0].name, "a");
        assert_eq!(table.columns()[0].desc.data_type, DataType::Int32);
    }

    #[tokio::test]
    async fn test_bootstrap_fails_on_error_status() {
        let client = Arc::new(MemoryMetaClient::with_catalog(sample_catalog()));
        client.fail_next(MetaOp::GetCatalog, 1);

        let err = RemoteCatalog::try_new(client, options()).await.unwrap_err();
        assert!(
            matches!(err, CatalogError::Internal { ref reason } if reason.starts_with("Init catalog failed")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_heartbeat_replaces_newer_table() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.update_catalog(|snapshot| {
            snapshot.tables[0] = wire_table(
                1,
                2,
                3,
                "t1",
                2,
                vec![
                    wire_column("a", TypeName::Int32),
                    wire_column("b", TypeName::Varchar),
                ],
            )
        });
        catalog.heartbeat().await.unwrap();

        let table = catalog.get_table(&t1()).unwrap();
        assert_eq!(table.version(), 2);
        let columns: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["a", "b"]);
        assert_eq!(table.column("b").unwrap().desc.data_type, DataType::Utf8);
    }

    #[tokio::test]
    async fn test_heartbeat_ignores_older_versions() {
        let mut snapshot = sample_catalog();
        snapshot.databases[0].version = 5;
        snapshot.schemas[0].version = 5;
        snapshot.tables[0].version = 5;
        let (client, catalog) = make_catalog(snapshot).await;

        client.update_catalog(|snapshot| {
            snapshot.databases[0].version = 3;
            snapshot.schemas[0].version = 3;
            snapshot.tables[0] = wire_table(
                1,
                2,
                3,
                "t1",
                3,
                vec![wire_column("z", TypeName::Boolean)],
            );
        });
        catalog.heartbeat().await.unwrap();

        assert_eq!(catalog.get_database(&DatabaseName::new("db1")).unwrap().version(), 5);
        assert_eq!(catalog.get_schema(&"db1.s1".parse().unwrap()).unwrap().version(), 5);
        let table = catalog.get_table(&t1()).unwrap();
        assert_eq!(table.version(), 5);
        assert_eq!(table.columns()[0].name, "a");
    }

    #[tokio::test]
    async fn test_heartbeat_drops_missing_table() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.update_catalog(|snapshot| snapshot.tables.clear());
        catalog.heartbeat().await.unwrap();

        assert!(catalog.get_table(&t1()).is_none());
        // The schema itself stays around
        assert!(catalog.get_schema(&"db1.s1".parse().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_heartbeat_registers_new_entities() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.update_catalog(|snapshot| {
            snapshot.databases.push(wire_database(10, "db2", 1));
            snapshot.schemas.push(wire_schema(10, 11, "s2", 1));
            snapshot.tables.push(wire_table(
                10,
                11,
                12,
                "t2",
                1,
                vec![wire_column("c", TypeName::Double)],
            ));
        });
        catalog.heartbeat().await.unwrap();

        let table = catalog.get_table(&"db2.s2.t2".parse().unwrap()).unwrap();
        assert_eq!(table.id().to_string(), "10.11.12");
        assert!(catalog.get_table(&t1()).is_some());
    }

    #[tokio::test]
    async fn test_heartbeat_is_idempotent() {
        let (_, catalog) = make_catalog(sample_catalog()).await;

        catalog.heartbeat().await.unwrap();
        let first = catalog.snapshot().unwrap();
        catalog.heartbeat().await.unwrap();
        assert_eq!(catalog.snapshot().unwrap(), first);
        assert_eq!(first, sample_catalog());
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_orphans_without_applying_anything() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.update_catalog(|snapshot| {
            snapshot.databases.push(wire_database(10, "db2", 1));
            // Schema of a database nobody knows about
            snapshot.schemas.push(wire_schema(99, 100, "lost", 1));
            snapshot.tables.clear();
        });
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::DatabaseDoesNotExist { .. }));

        assert!(catalog.get_database(&DatabaseName::new("db2")).is_none());
        assert!(catalog.get_table(&t1()).is_some());

        client.update_catalog(|snapshot| {
            snapshot.schemas.pop();
            snapshot.tables = sample_catalog().tables;
            snapshot.tables.push(wire_table(1, 50, 51, "orphan", 1, vec![]));
        });
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::SchemaDoesNotExist { .. }));
        assert!(catalog.get_database(&DatabaseName::new("db2")).is_none());
    }

    #[tokio::test]
    async fn test_heartbeat_rejects_renumbered_entities() {
        let (client, catalog) = make_catalog(sample_catalog()).await;
        let db1 = DatabaseName::new("db1");

        // Another frontend won the race for "db1" and got it created under a new id
        client.update_catalog(|snapshot| {
            snapshot.databases = vec![wire_database(30, "db1", 7), wire_database(20, "db2", 1)];
            snapshot.schemas.push(wire_schema(30, 31, "s1", 1));
        });
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }), "{err}");
        assert!(catalog.get_database(&DatabaseName::new("db2")).is_none());
        assert_eq!(catalog.get_database(&db1).unwrap().version(), 1);

        // Same for a schema name that moved to a new id
        client.set_catalog(sample_catalog());
        client.update_catalog(|snapshot| {
            snapshot.databases.push(wire_database(20, "db2", 1));
            snapshot.schemas[0] = wire_schema(1, 5, "s1", 2);
            snapshot.tables.clear();
        });
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }), "{err}");
        assert!(catalog.get_database(&DatabaseName::new("db2")).is_none());
        assert!(catalog.get_table(&t1()).is_some());

        // The same name twice in one snapshot
        let mut snapshot = sample_catalog();
        snapshot.databases.push(wire_database(20, "db1", 1));
        client.set_catalog(snapshot);
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }), "{err}");

        client.set_catalog(sample_catalog());
        catalog.heartbeat().await.unwrap();
        assert_eq!(catalog.snapshot().unwrap(), sample_catalog());
    }

    #[tokio::test]
    async fn test_heartbeat_error_status() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.fail_next(MetaOp::Heartbeat, 1);
        client.update_catalog(|snapshot| snapshot.tables.clear());
        let err = catalog.heartbeat().await.unwrap_err();
        assert!(matches!(err, CatalogError::Internal { .. }));
        assert!(catalog.get_table(&t1()).is_some());
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_tables_being_created() {
        let (client, catalog) = make_catalog(sample_catalog()).await;
        let schema = catalog.get_schema(&"db1.s1".parse().unwrap()).unwrap();
        schema.create_table_with_id(&table_info("t2"), 7).unwrap();
        let t2: TableName = "db1.s1.t2".parse().unwrap();

        catalog.creating_tables.insert(t2.clone());
        catalog.heartbeat().await.unwrap();
        assert!(catalog.get_table(&t2).is_some());

        catalog.creating_tables.remove(&t2);
        catalog.heartbeat().await.unwrap();
        assert!(catalog.get_table(&t2).is_none());
        assert_eq!(client.calls(MetaOp::Heartbeat), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_table_races_heartbeat() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        // The heartbeat snapshot gets taken while the create is still waiting
        // for its id, and is applied long after the create went through.
        client.set_latency(MetaOp::GetId, Duration::from_millis(50));
        client.set_latency(MetaOp::Heartbeat, Duration::from_millis(500));

        let create = tokio::spawn({
            let catalog = catalog.clone();
            async move {
                catalog
                    .create_table(&"db1.s1".parse().unwrap(), &table_info("t2"))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        catalog.heartbeat().await.unwrap();
        create.await.unwrap().unwrap();

        let t2: TableName = "db1.s1.t2".parse().unwrap();
        assert!(catalog.get_table(&t2).is_some());
        assert!(catalog.creating_tables.is_empty());

        // The next snapshot has it anyway
        catalog.heartbeat().await.unwrap();
        assert!(catalog.get_table(&t2).is_some());
    }

    #[tokio::test]
    async fn test_create_database_with_initial_schema() {
        let (client, catalog) = make_catalog(Catalog::default()).await;

        let db = catalog
            .create_database(&DatabaseName::new("db1"), "public")
            .await
            .unwrap();
        assert_eq!(db.version(), 1);
        assert_eq!(db.schema_names(), vec!["public".to_string()]);
        assert_eq!(db.schema("public").unwrap().version(), 1);

        let authority = client.catalog();
        assert_eq!(authority.databases.len(), 1);
        assert_eq!(authority.schemas.len(), 1);

        let err = catalog
            .create_database(&DatabaseName::new("db1"), "public")
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DatabaseAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_create_schema_requires_database() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        let err = catalog
            .create_schema(&"nope.s1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::DatabaseDoesNotExist { .. }));
        assert_eq!(client.calls(MetaOp::GetId), 0);

        let err = catalog
            .create_schema(&"db1.s1".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SchemaAlreadyExists { .. }));

        let schema = catalog.create_schema(&"db1.s2".parse().unwrap()).await.unwrap();
        assert_eq!(schema.version(), 1);
        assert!(catalog.get_schema(&"db1.s2".parse().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_create_table() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        let table = catalog
            .create_table(&"db1.s1".parse().unwrap(), &table_info("t2"))
            .await
            .unwrap();
        assert_eq!(table.version(), 1);
        assert_eq!(table.primary_key_column_ids(), &[0]);
        assert!(client
            .catalog()
            .tables
            .iter()
            .any(|t| t.table_name == "t2" && t.pk_columns == vec![0]));

        let err = catalog
            .create_table(&"db1.s1".parse().unwrap(), &table_info("t2"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::TableAlreadyExists { .. }));

        let err = catalog
            .create_table(&"db1.nope".parse().unwrap(), &table_info("t3"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SchemaDoesNotExist { .. }));
    }

    #[tokio::test]
    async fn test_failed_create_leaves_no_trace() {
        let (client, catalog) = make_catalog(sample_catalog()).await;
        let t2: TableName = "db1.s1.t2".parse().unwrap();

        client.fail_next(MetaOp::Create, 1);
        let err = catalog
            .create_table(t2.parent(), &table_info("t2"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Create table failed: injected Create failure");
        assert!(catalog.get_table(&t2).is_none());
        assert!(catalog.creating_tables.is_empty());

        client.fail_next(MetaOp::GetId, 1);
        assert!(catalog
            .create_schema(&"db1.s2".parse().unwrap())
            .await
            .is_err());
        assert!(catalog.get_schema(&"db1.s2".parse().unwrap()).is_none());
        assert_eq!(client.catalog(), sample_catalog());
    }

    #[tokio::test]
    async fn test_drop_table() {
        let (client, catalog) = make_catalog(sample_catalog()).await;

        client.fail_next(MetaOp::Drop, 1);
        assert!(catalog.drop_table(&t1()).await.is_err());
        assert!(catalog.get_table(&t1()).is_some());

        catalog.drop_table(&t1()).await.unwrap();
        assert!(catalog.get_table(&t1()).is_none());
        assert!(client.catalog().tables.is_empty());

        let err = catalog.drop_table(&t1()).await.unwrap_err();
        assert!(matches!(err, CatalogError::TableDoesNotExist { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_wait_for_propagation() {
        let client = Arc::new(MemoryMetaClient::with_catalog(sample_catalog()));
        let catalog = RemoteCatalog::try_new(client.clone(), CatalogOptions::default())
            .await
            .unwrap();
        assert_eq!(
            catalog.options().propagation_delay.duration(),
            Duration::from_millis(3000)
        );

        let start = Instant::now();
        catalog.drop_table(&t1()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));

        let start = Instant::now();
        catalog
            .create_database(&DatabaseName::new("db2"), "public")
            .await
            .unwrap();
        // A single wait, after both the database and its schema are created
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3000));
        assert!(elapsed < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_schema_and_table_wait_for_propagation() {
        let client = Arc::new(MemoryMetaClient::with_catalog(sample_catalog()));
        let catalog = RemoteCatalog::try_new(client.clone(), CatalogOptions::default())
            .await
            .unwrap();

        let start = Instant::now();
        catalog
            .create_schema(&"db1.s2".parse().unwrap())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));

        let start = Instant::now();
        let create = tokio::spawn({
            let catalog = catalog.clone();
            async move {
                let schema = "db1.s1".parse().unwrap();
                catalog.create_table(&schema, &table_info("t2")).await
            }
        });

        // Confirmed and registered, now only waiting for the other frontends
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!create.is_finished());
        assert!(catalog.get_table(&"db1.s1.t2".parse().unwrap()).is_some());
        assert!(catalog.creating_tables.is_empty());

        create.await.unwrap().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_error_status_without_message() {
        let (client, catalog) = make_catalog(sample_catalog()).await;
        client.fail_next_with(MetaOp::GetId, Status::error(Code::InternalError, ""));

        let err = catalog
            .create_schema(&"db1.s2".parse().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Get id failed");
    }
}
