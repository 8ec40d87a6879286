mod commands;
mod helper;

use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;

use crate::catalog::{CatalogError, RemoteCatalog, TableCatalog};
use crate::cli::commands::all_commands_info;
use commands::Command;
use helper::CliHelper;
use rustyline::{error::ReadlineError, Editor};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    InvalidCommand(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub struct RemoteCatalogCli {
    catalog: Arc<RemoteCatalog>,
    default_schema: String,
}

impl RemoteCatalogCli {
    // Instantiate new CLI instance
    pub fn new(catalog: Arc<RemoteCatalog>, default_schema: String) -> Self {
        RemoteCatalogCli {
            catalog,
            default_schema,
        }
    }

    // Interactive loop for running commands from a CLI
    pub async fn repl_loop(&self) -> rustyline::Result<()> {
        let mut rl = Editor::new()?;
        rl.set_helper(Some(CliHelper {}));
        rl.load_history(".history").ok();

        loop {
            match rl.readline("remote-catalog> ") {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) if line.trim_start().starts_with('\\') => {
                    rl.add_history_entry(line.trim_end())?;
                    match line.trim_start()[1..].parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(cmd) => self.run_and_print(&cmd).await,
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Ok(line) => {
                    rl.add_history_entry(line.trim_end())?;
                    eprintln!("Commands start with a backslash, try \\?");
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(err) => {
                    eprintln!("Error while reading input: {err:?}",);
                    break;
                }
            }
        }

        rl.save_history(".history")
    }

    /// Parse and run a single command line, such as `\l` or `\d db.schema.table`.
    pub async fn run_line(&self, line: &str) -> Result<String, CliError> {
        let line = line.trim();
        let command = line
            .strip_prefix('\\')
            .unwrap_or(line)
            .parse::<Command>()
            .map_err(CliError::InvalidCommand)?;
        self.handle_command(&command).await
    }

    async fn run_and_print(&self, cmd: &Command) {
        let now = Instant::now();
        match self.handle_command(cmd).await {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}");
                }
                println!("Time: {:.3}s", now.elapsed().as_secs_f64());
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    // Handle a client command
    async fn handle_command(&self, cmd: &Command) -> Result<String, CliError> {
        let catalog = &self.catalog;

        Ok(match cmd {
            Command::Help => {
                let width = all_commands_info()
                    .iter()
                    .map(|(usage, _)| usage.len())
                    .max()
                    .unwrap_or_default();
                all_commands_info()
                    .into_iter()
                    .map(|(usage, description)| format!("{usage:width$}  {description}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Command::ListDatabases => catalog.store().database_names().join("\n"),
            Command::ListSchemas(database) => catalog
                .store()
                .database_checked(database)?
                .schema_names()
                .join("\n"),
            Command::ListTables(schema) => catalog
                .store()
                .schema_checked(schema)?
                .table_names()
                .join("\n"),
            Command::DescribeTable(table) => {
                let table = catalog.store().table_checked(table)?;
                describe_table(&table)
            }
            Command::CreateDatabase { name, schema } => {
                let schema = schema.as_deref().unwrap_or(self.default_schema.as_str());
                let database = catalog.create_database(name, schema).await?;
                format!(
                    "CREATE DATABASE {} (id {}, version {})",
                    database.name(),
                    database.id(),
                    database.version()
                )
            }
            Command::CreateSchema(name) => {
                let schema = catalog.create_schema(name).await?;
                format!(
                    "CREATE SCHEMA {} (id {}, version {})",
                    schema.name(),
                    schema.id(),
                    schema.version()
                )
            }
            Command::CreateTable { schema, info } => {
                let table = catalog.create_table(schema, info).await?;
                format!(
                    "CREATE TABLE {} (id {}, version {})",
                    table.name(),
                    table.id(),
                    table.version()
                )
            }
            Command::DropTable(name) => {
                catalog.drop_table(name).await?;
                format!("DROP TABLE {name}")
            }
            Command::Sync => {
                catalog.heartbeat().await?;
                format!("SYNC {} database(s)", catalog.store().databases().len())
            }
            Command::Quit => String::new(),
        })
    }
}

fn describe_table(table: &TableCatalog) -> String {
    let mut output = format!(
        "Table {} (id {}, version {}, distribution {})",
        table.name(),
        table.id(),
        table.version(),
        table.distribution_type()
    );

    for column in table.columns() {
        let _ = write!(output, "\n  {} {}", column.name, column.desc.data_type);
        if !column.desc.is_nullable {
            output.push_str(" not null");
        }
        if table.primary_key_column_ids().contains(&column.id) {
            output.push_str(" primary key");
        }
    }

    output
}
