use clade::meta::{
    data_type::TypeName, Catalog, ColumnDesc, DataType, Database, DatabaseRefId, Schema,
    SchemaRefId, Table, TableRefId,
};

pub fn wire_database(database_id: i32, name: &str, version: u64) -> Database {
    Database {
        database_ref_id: Some(DatabaseRefId { database_id }),
        database_name: name.to_string(),
        version,
    }
}

fn schema_ref(database_id: i32, schema_id: i32) -> SchemaRefId {
    SchemaRefId {
        database_ref_id: Some(DatabaseRefId { database_id }),
        schema_id,
    }
}

pub fn wire_schema(database_id: i32, schema_id: i32, name: &str, version: u64) -> Schema {
    Schema {
        schema_ref_id: Some(schema_ref(database_id, schema_id)),
        schema_name: name.to_string(),
        version,
    }
}

/// A nullable, non-key column.
pub fn wire_column(name: &str, type_name: TypeName) -> ColumnDesc {
    ColumnDesc {
        column_type: Some(DataType {
            type_name: type_name as i32,
            precision: 0,
            scale: 0,
            is_nullable: true,
        }),
        encoding: 0,
        is_primary: false,
        name: name.to_string(),
    }
}

pub fn wire_table(
    database_id: i32,
    schema_id: i32,
    table_id: i32,
    name: &str,
    version: u64,
    column_descs: Vec<ColumnDesc>,
) -> Table {
    Table {
        table_ref_id: Some(TableRefId {
            schema_ref_id: Some(schema_ref(database_id, schema_id)),
            table_id,
        }),
        table_name: name.to_string(),
        column_descs,
        version,
        ..Default::default()
    }
}

/// `db1` (id 1) with schema `s1` (id 2) holding table `t1` (id 3) with a single
/// int column `a`, everything at version 1.
pub fn sample_catalog() -> Catalog {
    Catalog {
        databases: vec![wire_database(1, "db1", 1)],
        schemas: vec![wire_schema(1, 2, "s1", 1)],
        tables: vec![wire_table(
            1,
            2,
            3,
            "t1",
            1,
            vec![wire_column("a", TypeName::Int32)],
        )],
    }
}
