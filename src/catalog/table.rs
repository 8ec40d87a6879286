use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

use crate::catalog::store::{Entity, Version};
use crate::catalog::{CatalogError, CatalogResult, TableId, TableName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColumnEncoding {
    #[default]
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DistributionType {
    #[default]
    Single,
    Broadcast,
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    pub data_type: DataType,
    pub is_nullable: bool,
    pub is_primary: bool,
    pub encoding: ColumnEncoding,
}

impl ColumnDesc {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            is_nullable: true,
            is_primary: false,
            encoding: ColumnEncoding::Raw,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self.is_nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCatalog {
    /// Position of the column in the table; primary key ids refer to it.
    pub id: i32,
    pub name: String,
    pub desc: ColumnDesc,
}

/// Everything needed to create a table, independent of its id and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableInfo {
    name: String,
    columns: Vec<(String, ColumnDesc)>,
    is_materialized_view: bool,
    is_stream: bool,
    row_format: String,
    properties: HashMap<String, String>,
    primary_key_column_ids: Option<Vec<i32>>,
    distribution_type: DistributionType,
}

impl CreateTableInfo {
    pub fn builder(name: impl Into<String>) -> CreateTableInfoBuilder {
        CreateTableInfoBuilder {
            info: CreateTableInfo {
                name: name.into(),
                columns: vec![],
                is_materialized_view: false,
                is_stream: false,
                row_format: String::new(),
                properties: HashMap::new(),
                primary_key_column_ids: None,
                distribution_type: DistributionType::default(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[(String, ColumnDesc)] {
        &self.columns
    }
}

pub struct CreateTableInfoBuilder {
    info: CreateTableInfo,
}

impl CreateTableInfoBuilder {
    pub fn add_column(mut self, name: impl Into<String>, desc: ColumnDesc) -> Self {
        self.info.columns.push((name.into(), desc));
        self
    }

    pub fn materialized_view(mut self, is_materialized_view: bool) -> Self {
        self.info.is_materialized_view = is_materialized_view;
        self
    }

    pub fn stream(mut self, is_stream: bool) -> Self {
        self.info.is_stream = is_stream;
        self
    }

    pub fn row_format(mut self, row_format: impl Into<String>) -> Self {
        self.info.row_format = row_format.into();
        self
    }

    pub fn properties(mut self, properties: HashMap<String, String>) -> Self {
        self.info.properties = properties;
        self
    }

    /// Explicit primary key; without it the key is made of the columns flagged
    /// as primary.
    pub fn primary_key(mut self, column_ids: Vec<i32>) -> Self {
        self.info.primary_key_column_ids = Some(column_ids);
        self
    }

    pub fn distribution(mut self, distribution_type: DistributionType) -> Self {
        self.info.distribution_type = distribution_type;
        self
    }

    pub fn build(self) -> CreateTableInfo {
        self.info
    }
}

#[derive(Debug)]
pub struct TableCatalog {
    id: TableId,
    name: TableName,
    version: Version,
    columns: Vec<ColumnCatalog>,
    is_materialized_view: bool,
    is_stream: bool,
    row_format: String,
    properties: HashMap<String, String>,
    primary_key_column_ids: Vec<i32>,
    distribution_type: DistributionType,
}

impl TableCatalog {
    pub(crate) fn new(id: TableId, name: TableName, info: &CreateTableInfo) -> Self {
        let columns: Vec<ColumnCatalog> = info
            .columns
            .iter()
            .enumerate()
            .map(|(position, (name, desc))| ColumnCatalog {
                id: position as i32,
                name: name.clone(),
                desc: desc.clone(),
            })
            .collect();

        let primary_key_column_ids = match &info.primary_key_column_ids {
            Some(ids) => ids.clone(),
            None => columns
                .iter()
                .filter(|column| column.desc.is_primary)
                .map(|column| column.id)
                .collect(),
        };

        Self {
            id,
            name,
            version: Version::default(),
            columns,
            is_materialized_view: info.is_materialized_view,
            is_stream: info.is_stream,
            row_format: info.row_format.clone(),
            properties: info.properties.clone(),
            primary_key_column_ids,
            distribution_type: info.distribution_type,
        }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn advance_version(&self, version: u64) -> bool {
        self.version.advance(version)
    }

    pub fn columns(&self) -> &[ColumnCatalog] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnCatalog> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn is_materialized_view(&self) -> bool {
        self.is_materialized_view
    }

    pub fn is_stream(&self) -> bool {
        self.is_stream
    }

    pub fn row_format(&self) -> &str {
        &self.row_format
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn primary_key_column_ids(&self) -> &[i32] {
        &self.primary_key_column_ids
    }

    pub fn distribution_type(&self) -> DistributionType {
        self.distribution_type
    }

    /// Arrow schema of the table, as seen by the planner.
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|column| {
                Field::new(
                    &column.name,
                    column.desc.data_type.clone(),
                    column.desc.is_nullable,
                )
            })
            .collect();
        Arc::new(Schema::new(fields))
    }
}

impl Entity for TableCatalog {
    type Id = TableId;

    fn entity_id(&self) -> Self::Id {
        self.id
    }

    fn entity_name(&self) -> &str {
        self.name.name()
    }
}

/// Parse a SQL-ish column type name (`int`, `varchar`, `decimal(10,2)`, ...).
pub fn parse_column_type(type_name: &str) -> CatalogResult<DataType> {
    let normalized = type_name.trim().to_ascii_lowercase();

    if let Some(args) = normalized
        .strip_prefix("decimal(")
        .or_else(|| normalized.strip_prefix("numeric("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let (precision, scale) = args.split_once(',').unwrap_or((args, "0"));
        let precision = precision.trim().parse::<u8>();
        let scale = scale.trim().parse::<i8>();
        return match (precision, scale) {
            (Ok(precision), Ok(scale)) => Ok(DataType::Decimal128(precision, scale)),
            _ => Err(CatalogError::UnsupportedColumnType {
                reason: format!("invalid decimal arguments in {type_name:?}"),
            }),
        };
    }

    Ok(match normalized.as_str() {
        "smallint" | "int2" => DataType::Int16,
        "int" | "integer" | "int4" => DataType::Int32,
        "bigint" | "int8" => DataType::Int64,
        "real" | "float" | "float4" => DataType::Float32,
        "double" | "double precision" | "float8" => DataType::Float64,
        "bool" | "boolean" => DataType::Boolean,
        "char" | "varchar" | "text" | "string" => DataType::Utf8,
        "decimal" | "numeric" => DataType::Decimal128(38, 0),
        "date" => DataType::Date32,
        "time" => DataType::Time64(TimeUnit::Microsecond),
        "timestamp" => DataType::Timestamp(TimeUnit::Microsecond, None),
        _ => {
            return Err(CatalogError::UnsupportedColumnType {
                reason: format!("unknown type {type_name:?}"),
            })
        }
    })
}
