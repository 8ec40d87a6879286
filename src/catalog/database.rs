use std::sync::Arc;

use crate::catalog::store::{Entity, EntityIndex, Version};
use crate::catalog::{
    CatalogError, CatalogResult, DatabaseId, DatabaseName, SchemaCatalog, SchemaId,
    SchemaName,
};

#[derive(Debug)]
pub struct DatabaseCatalog {
    id: DatabaseId,
    name: DatabaseName,
    version: Version,
    schemas: EntityIndex<SchemaCatalog>,
}

impl DatabaseCatalog {
    pub fn new(id: DatabaseId, name: DatabaseName) -> Self {
        Self {
            id,
            name,
            version: Version::default(),
            schemas: EntityIndex::default(),
        }
    }

    pub fn id(&self) -> DatabaseId {
        self.id
    }

    pub fn name(&self) -> &DatabaseName {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    /// Move the version forward; older versions are ignored.
    pub fn advance_version(&self, version: u64) -> bool {
        self.version.advance(version)
    }

    /// Build a schema under this database without registering it.
    pub fn new_schema(&self, name: &str, schema_id: i32) -> SchemaCatalog {
        SchemaCatalog::new(
            SchemaId::new(self.id, schema_id),
            SchemaName::new(self.name.clone(), name),
        )
    }

    pub fn create_schema_with_id(
        &self,
        name: &str,
        schema_id: i32,
    ) -> CatalogResult<Arc<SchemaCatalog>> {
        let schema = Arc::new(self.new_schema(name, schema_id));
        self.schemas
            .try_insert(schema.clone())
            .map_err(|existing| CatalogError::SchemaAlreadyExists {
                name: existing.name().to_string(),
            })?;
        Ok(schema)
    }

    /// Register a schema built with [`DatabaseCatalog::new_schema`]. If a schema
    /// with the same id got registered in the meantime, that one is kept.
    pub fn register_schema(&self, schema: Arc<SchemaCatalog>) -> Arc<SchemaCatalog> {
        let registered = self.schemas.insert_if_absent(schema.clone());
        registered.advance_version(schema.version());
        registered
    }

    pub fn schema(&self, name: &str) -> Option<Arc<SchemaCatalog>> {
        self.schemas.get_by_name(name)
    }

    pub fn schema_by_id(&self, id: SchemaId) -> Option<Arc<SchemaCatalog>> {
        self.schemas.get_by_id(&id)
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_name(name)
    }

    pub fn schema_names(&self) -> Vec<String> {
        self.schemas.names()
    }

    /// All schemas, ordered by id.
    pub fn schemas(&self) -> Vec<Arc<SchemaCatalog>> {
        self.schemas.values()
    }
}

impl Entity for DatabaseCatalog {
    type Id = DatabaseId;

    fn entity_id(&self) -> Self::Id {
        self.id
    }

    fn entity_name(&self) -> &str {
        self.name.as_str()
    }
}
