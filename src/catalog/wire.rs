//! Conversions between the local catalog entities and the metadata service messages.

use arrow_schema::{DataType, TimeUnit, DECIMAL128_MAX_PRECISION};
use clade::meta::{
    self, column_desc::ColumnEncodingType, data_type::TypeName,
    table::DistributionType as WireDistributionType, DatabaseRefId, SchemaRefId,
    TableRefId,
};

use crate::catalog::{
    CatalogError, CatalogResult, CatalogStore, ColumnDesc, ColumnEncoding, CreateTableInfo,
    DatabaseCatalog, DatabaseId, DistributionType, SchemaCatalog, SchemaId, TableCatalog,
    TableId,
};

pub(crate) fn database_ref_id(id: DatabaseId) -> DatabaseRefId {
    DatabaseRefId { database_id: id.0 }
}

pub(crate) fn schema_ref_id(id: SchemaId) -> SchemaRefId {
    SchemaRefId {
        database_ref_id: Some(database_ref_id(id.database_id)),
        schema_id: id.schema_id,
    }
}

pub(crate) fn table_ref_id(id: TableId) -> TableRefId {
    TableRefId {
        schema_ref_id: Some(schema_ref_id(id.schema_id)),
        table_id: id.table_id,
    }
}

fn missing(what: &str, name: &str) -> CatalogError {
    CatalogError::InvalidMessage {
        reason: format!("{what} {name:?} carries no ref id"),
    }
}

pub(crate) fn database_id_of(database: &meta::Database) -> CatalogResult<DatabaseId> {
    database
        .database_ref_id
        .as_ref()
        .map(|ref_id| DatabaseId(ref_id.database_id))
        .ok_or_else(|| missing("database", &database.database_name))
}

fn schema_id_from_ref(ref_id: &SchemaRefId) -> Option<SchemaId> {
    let database_id = ref_id.database_ref_id.as_ref()?.database_id;
    Some(SchemaId::new(DatabaseId(database_id), ref_id.schema_id))
}

pub(crate) fn schema_id_of(schema: &meta::Schema) -> CatalogResult<SchemaId> {
    schema
        .schema_ref_id
        .as_ref()
        .and_then(schema_id_from_ref)
        .ok_or_else(|| missing("schema", &schema.schema_name))
}

pub(crate) fn table_id_of(table: &meta::Table) -> CatalogResult<TableId> {
    table
        .table_ref_id
        .as_ref()
        .and_then(|ref_id| {
            let schema_id = schema_id_from_ref(ref_id.schema_ref_id.as_ref()?)?;
            Some(TableId::new(schema_id, ref_id.table_id))
        })
        .ok_or_else(|| missing("table", &table.table_name))
}

pub(crate) fn data_type_to_wire(
    data_type: &DataType,
    is_nullable: bool,
) -> CatalogResult<meta::DataType> {
    let (type_name, precision, scale) = match data_type {
        DataType::Int16 => (TypeName::Int16, 0, 0),
        DataType::Int32 => (TypeName::Int32, 0, 0),
        DataType::Int64 => (TypeName::Int64, 0, 0),
        DataType::Float32 => (TypeName::Float, 0, 0),
        DataType::Float64 => (TypeName::Double, 0, 0),
        DataType::Boolean => (TypeName::Boolean, 0, 0),
        DataType::Utf8 => (TypeName::Varchar, 0, 0),
        DataType::Decimal128(precision, scale) if *scale >= 0 => {
            (TypeName::Decimal, *precision as u32, *scale as u32)
        }
        DataType::Date32 => (TypeName::Date, 0, 0),
        DataType::Time64(TimeUnit::Microsecond) => (TypeName::Time, 0, 0),
        DataType::Timestamp(TimeUnit::Microsecond, None) => (TypeName::Timestamp, 0, 0),
        other => {
            return Err(CatalogError::UnsupportedColumnType {
                reason: format!("{other} can't be stored in the catalog"),
            })
        }
    };

    Ok(meta::DataType {
        type_name: type_name as i32,
        precision,
        scale,
        is_nullable,
    })
}

pub(crate) fn data_type_from_wire(data_type: &meta::DataType) -> CatalogResult<DataType> {
    let type_name = TypeName::try_from(data_type.type_name).map_err(|_| {
        CatalogError::UnsupportedColumnType {
            reason: format!("unknown type id {}", data_type.type_name),
        }
    })?;

    Ok(match type_name {
        TypeName::Int16 => DataType::Int16,
        TypeName::Int32 => DataType::Int32,
        TypeName::Int64 => DataType::Int64,
        TypeName::Float => DataType::Float32,
        TypeName::Double => DataType::Float64,
        TypeName::Boolean => DataType::Boolean,
        TypeName::Char | TypeName::Varchar => DataType::Utf8,
        TypeName::Decimal => decimal_from_wire(data_type.precision, data_type.scale)?,
        TypeName::Date => DataType::Date32,
        TypeName::Time => DataType::Time64(TimeUnit::Microsecond),
        TypeName::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
    })
}

fn decimal_from_wire(precision: u32, scale: u32) -> CatalogResult<DataType> {
    let checked_precision = u8::try_from(precision)
        .ok()
        .filter(|p| (1..=DECIMAL128_MAX_PRECISION).contains(p));
    let checked_scale = i8::try_from(scale).ok().filter(|s| scale <= precision && *s >= 0);

    match (checked_precision, checked_scale) {
        (Some(precision), Some(scale)) => Ok(DataType::Decimal128(precision, scale)),
        _ => Err(CatalogError::UnsupportedColumnType {
            reason: format!("decimal({precision}, {scale}) is out of range"),
        }),
    }
}

fn column_desc_to_wire(name: &str, desc: &ColumnDesc) -> CatalogResult<meta::ColumnDesc> {
    Ok(meta::ColumnDesc {
        column_type: Some(data_type_to_wire(&desc.data_type, desc.is_nullable)?),
        encoding: match desc.encoding {
            ColumnEncoding::Raw => ColumnEncodingType::Raw as i32,
        },
        is_primary: desc.is_primary,
        name: name.to_string(),
    })
}

fn column_desc_from_wire(column: &meta::ColumnDesc) -> CatalogResult<ColumnDesc> {
    let column_type = column
        .column_type
        .as_ref()
        .ok_or_else(|| CatalogError::InvalidMessage {
            reason: format!("column {:?} carries no type", column.name),
        })?;

    Ok(ColumnDesc {
        data_type: data_type_from_wire(column_type)?,
        is_nullable: column_type.is_nullable,
        is_primary: column.is_primary,
        encoding: ColumnEncoding::Raw,
    })
}

fn distribution_to_wire(distribution_type: DistributionType) -> WireDistributionType {
    match distribution_type {
        DistributionType::Single => WireDistributionType::Single,
        DistributionType::Broadcast => WireDistributionType::Broadcast,
        DistributionType::Hash => WireDistributionType::Hash,
    }
}

fn distribution_from_wire(distribution_type: WireDistributionType) -> DistributionType {
    match distribution_type {
        WireDistributionType::Single => DistributionType::Single,
        WireDistributionType::Broadcast => DistributionType::Broadcast,
        WireDistributionType::Hash => DistributionType::Hash,
    }
}

pub(crate) fn database_to_wire(database: &DatabaseCatalog) -> meta::Database {
    meta::Database {
        database_ref_id: Some(database_ref_id(database.id())),
        database_name: database.name().to_string(),
        version: database.version(),
    }
}

pub(crate) fn schema_to_wire(schema: &SchemaCatalog) -> meta::Schema {
    meta::Schema {
        schema_ref_id: Some(schema_ref_id(schema.id())),
        schema_name: schema.name().name().to_string(),
        version: schema.version(),
    }
}

pub(crate) fn table_to_wire(table: &TableCatalog) -> CatalogResult<meta::Table> {
    let column_descs = table
        .columns()
        .iter()
        .map(|column| column_desc_to_wire(&column.name, &column.desc))
        .collect::<CatalogResult<Vec<_>>>()?;

    Ok(meta::Table {
        table_ref_id: Some(table_ref_id(table.id())),
        table_name: table.name().name().to_string(),
        column_descs,
        is_materialized_view: table.is_materialized_view(),
        is_stream: table.is_stream(),
        dist_type: distribution_to_wire(table.distribution_type()) as i32,
        properties: table.properties().clone(),
        row_format: table.row_format().to_string(),
        pk_columns: table.primary_key_column_ids().to_vec(),
        version: table.version(),
    })
}

/// Rebuild the creation parameters of a table from its snapshot entry.
pub(crate) fn table_info_from_wire(table: &meta::Table) -> CatalogResult<CreateTableInfo> {
    let mut builder = CreateTableInfo::builder(table.table_name.clone())
        .materialized_view(table.is_materialized_view)
        .stream(table.is_stream)
        .row_format(table.row_format.clone())
        .properties(table.properties.clone())
        .distribution(distribution_from_wire(table.dist_type()))
        .primary_key(table.pk_columns.clone());

    for column in &table.column_descs {
        builder = builder.add_column(column.name.clone(), column_desc_from_wire(column)?);
    }

    Ok(builder.build())
}

/// Export the local replica in the metadata service's snapshot format, with every
/// entity list ordered by id.
pub fn catalog_snapshot(store: &CatalogStore) -> CatalogResult<meta::Catalog> {
    let mut catalog = meta::Catalog::default();

    for database in store.databases() {
        catalog.databases.push(database_to_wire(&database));
        for schema in database.schemas() {
            catalog.schemas.push(schema_to_wire(&schema));
            for table in schema.tables() {
                catalog.tables.push(table_to_wire(&table)?);
            }
        }
    }

    Ok(catalog)
}
