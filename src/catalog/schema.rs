use std::sync::Arc;

use crate::catalog::store::{Entity, EntityIndex, Version};
use crate::catalog::{
    CatalogError, CatalogResult, CreateTableInfo, SchemaId, SchemaName, TableCatalog,
    TableId, TableName,
};

#[derive(Debug)]
pub struct SchemaCatalog {
    id: SchemaId,
    name: SchemaName,
    version: Version,
    tables: EntityIndex<TableCatalog>,
}

impl SchemaCatalog {
    pub(crate) fn new(id: SchemaId, name: SchemaName) -> Self {
        Self {
            id,
            name,
            version: Version::default(),
            tables: EntityIndex::default(),
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn name(&self) -> &SchemaName {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn advance_version(&self, version: u64) -> bool {
        self.version.advance(version)
    }

    /// Build a table under this schema without registering it.
    pub fn new_table(&self, info: &CreateTableInfo, table_id: i32) -> TableCatalog {
        TableCatalog::new(
            TableId::new(self.id, table_id),
            TableName::new(self.name.clone(), info.name()),
            info,
        )
    }

    pub fn create_table_with_id(
        &self,
        info: &CreateTableInfo,
        table_id: i32,
    ) -> CatalogResult<Arc<TableCatalog>> {
        let table = Arc::new(self.new_table(info, table_id));
        self.tables
            .try_insert(table.clone())
            .map_err(|existing| CatalogError::TableAlreadyExists {
                name: existing.name().to_string(),
            })?;
        Ok(table)
    }

    /// Register a table built with [`SchemaCatalog::new_table`]. If a table with the
    /// same id got registered in the meantime, that one is kept.
    pub fn register_table(&self, table: Arc<TableCatalog>) -> Arc<TableCatalog> {
        let registered = self.tables.insert_if_absent(table.clone());
        registered.advance_version(table.version());
        registered
    }

    /// Swap in a newer descriptor of a table, dropping whatever was indexed under
    /// the same name or id.
    pub fn replace_table(&self, table: Arc<TableCatalog>) -> Option<Arc<TableCatalog>> {
        self.tables.insert(table)
    }

    pub fn drop_table(&self, name: &str) -> Option<Arc<TableCatalog>> {
        self.tables.remove_by_name(name)
    }

    pub fn table(&self, name: &str) -> Option<Arc<TableCatalog>> {
        self.tables.get_by_name(name)
    }

    pub fn table_by_id(&self, id: TableId) -> Option<Arc<TableCatalog>> {
        self.tables.get_by_id(&id)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_name(name)
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.names()
    }

    /// All tables, ordered by id.
    pub fn tables(&self) -> Vec<Arc<TableCatalog>> {
        self.tables.values()
    }
}

impl Entity for SchemaCatalog {
    type Id = SchemaId;

    fn entity_id(&self) -> Self::Id {
        self.id
    }

    fn entity_name(&self) -> &str {
        self.name.name()
    }
}
