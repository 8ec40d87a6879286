//! Identities and names of catalog entities.
//!
//! Ids are issued by the metadata service and are only meaningful together with the
//! id of the parent entity, so `SchemaId` and `TableId` carry their parent's id.
//! Names are scoped the same way and render as `db`, `db.schema`, `db.schema.table`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::catalog::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId {
    pub database_id: DatabaseId,
    pub schema_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId {
    pub schema_id: SchemaId,
    pub table_id: i32,
}

impl SchemaId {
    pub fn new(database_id: DatabaseId, schema_id: i32) -> Self {
        Self {
            database_id,
            schema_id,
        }
    }
}

impl TableId {
    pub fn new(schema_id: SchemaId, table_id: i32) -> Self {
        Self {
            schema_id,
            table_id,
        }
    }
}

impl Display for DatabaseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SchemaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database_id, self.schema_id)
    }
}

impl Display for TableId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema_id, self.table_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseName(Arc<str>);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaName {
    database: DatabaseName,
    name: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    schema: SchemaName,
    name: Arc<str>,
}

impl DatabaseName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SchemaName {
    pub fn new(database: DatabaseName, name: impl Into<Arc<str>>) -> Self {
        Self {
            database,
            name: name.into(),
        }
    }

    pub fn parent(&self) -> &DatabaseName {
        &self.database
    }

    /// The unqualified schema name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TableName {
    pub fn new(schema: SchemaName, name: impl Into<Arc<str>>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }

    pub fn parent(&self) -> &SchemaName {
        &self.schema
    }

    /// The unqualified table name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for DatabaseName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for SchemaName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

// Split a qualified name into exactly `N` non-empty dot-separated parts
fn split_qualified<'a, const N: usize>(
    s: &'a str,
    kind: &str,
) -> CatalogResult<[&'a str; N]> {
    let parts: Vec<&str> = s.split('.').map(str::trim).collect();
    if parts.len() != N || parts.iter().any(|p| p.is_empty()) {
        return Err(CatalogError::InvalidName {
            name: s.to_string(),
            reason: format!("expected a {kind} name with {} dot-separated part(s)", N),
        });
    }

    let mut out: [&'a str; N] = [""; N];
    out.copy_from_slice(&parts);
    Ok(out)
}

impl FromStr for DatabaseName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [database] = split_qualified::<1>(s, "database")?;
        Ok(DatabaseName::new(database))
    }
}

impl FromStr for SchemaName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [database, schema] = split_qualified::<2>(s, "schema")?;
        Ok(SchemaName::new(DatabaseName::new(database), schema))
    }
}

impl FromStr for TableName {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [database, schema, table] = split_qualified::<3>(s, "table")?;
        Ok(TableName::new(
            SchemaName::new(DatabaseName::new(database), schema),
            table,
        ))
    }
}
