use std::str::FromStr;

use crate::catalog::{
    parse_column_type, CatalogError, ColumnDesc, CreateTableInfo, DatabaseName, SchemaName,
    TableName,
};

/// Commands available inside the CLI
#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Help,
    ListDatabases,
    ListSchemas(DatabaseName),
    ListTables(SchemaName),
    DescribeTable(TableName),
    CreateDatabase {
        name: DatabaseName,
        schema: Option<String>,
    },
    CreateSchema(SchemaName),
    CreateTable {
        schema: SchemaName,
        info: CreateTableInfo,
    },
    DropTable(TableName),
    Sync,
}

pub fn all_commands_info() -> Vec<(&'static str, &'static str)> {
    vec![
        ("\\?", "Show this help"),
        ("\\q", "Quit"),
        ("\\l", "List databases"),
        ("\\dn <db>", "List the schemas of a database"),
        ("\\dt <db.schema>", "List the tables of a schema"),
        ("\\d <db.schema.table>", "Describe a table"),
        ("\\create-db <db> [schema]", "Create a database and its first schema"),
        ("\\create-schema <db.schema>", "Create a schema"),
        (
            "\\create-table <db.schema.table> <col:type[:pk]>...",
            "Create a table",
        ),
        ("\\drop <db.schema.table>", "Drop a table"),
        ("\\sync", "Sync with the metadata service right away"),
    ]
}

fn parse_name<T: FromStr<Err = CatalogError>>(name: &str) -> Result<T, String> {
    name.parse().map_err(|e: CatalogError| e.to_string())
}

// `name:type` or `name:type:pk`
fn parse_column(column: &str) -> Result<(String, ColumnDesc), String> {
    let invalid = || format!("Invalid column {column:?}, expected name:type[:pk]");

    let (name, rest) = column.split_once(':').ok_or_else(invalid)?;
    let (type_name, primary) = match rest.rsplit_once(':') {
        Some((type_name, "pk")) => (type_name, true),
        _ => (rest, false),
    };
    if name.is_empty() {
        return Err(invalid());
    }

    let desc = ColumnDesc::new(parse_column_type(type_name).map_err(|e| e.to_string())?);
    Ok((name.to_string(), if primary { desc.primary() } else { desc }))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        Ok(match (command, args.as_slice()) {
            ("q" | "quit", []) => Self::Quit,
            ("?", []) => Self::Help,
            ("l", []) => Self::ListDatabases,
            ("dn", [database]) => Self::ListSchemas(parse_name(database)?),
            ("dt", [schema]) => Self::ListTables(parse_name(schema)?),
            ("d", [table]) => Self::DescribeTable(parse_name(table)?),
            ("create-db", [database]) => Self::CreateDatabase {
                name: parse_name(database)?,
                schema: None,
            },
            ("create-db", [database, schema]) => Self::CreateDatabase {
                name: parse_name(database)?,
                schema: Some(schema.to_string()),
            },
            ("create-schema", [schema]) => Self::CreateSchema(parse_name(schema)?),
            ("create-table", [table, columns @ ..]) if !columns.is_empty() => {
                let table: TableName = parse_name(table)?;
                let mut info = CreateTableInfo::builder(table.name());
                for column in columns {
                    let (name, desc) = parse_column(column)?;
                    info = info.add_column(name, desc);
                }
                Self::CreateTable {
                    schema: table.parent().clone(),
                    info: info.build(),
                }
            }
            ("drop", [table]) => Self::DropTable(parse_name(table)?),
            ("sync", []) => Self::Sync,
            _ => return Err(format!("'\\{}' is not a valid command", s.trim())),
        })
    }
}
