use async_trait::async_trait;
use clade::meta::{
    CreateRequest, CreateResponse, DropRequest, DropResponse, GetCatalogRequest,
    GetCatalogResponse, GetIdRequest, GetIdResponse, HeartbeatRequest, HeartbeatResponse,
    Status,
};
use std::fmt::Debug;

mod database;
pub mod external;
mod heartbeat;
mod ids;
pub mod memory;
mod propagation;
mod remote;
mod schema;
mod store;
mod table;
mod wire;

pub use database::DatabaseCatalog;
pub use heartbeat::HeartbeatHandle;
pub use ids::{DatabaseId, DatabaseName, SchemaId, SchemaName, TableId, TableName};
pub use propagation::PropagationDelay;
pub use remote::{CatalogOptions, RemoteCatalog};
pub use schema::SchemaCatalog;
pub use store::CatalogStore;
pub use table::{
    parse_column_type, ColumnCatalog, ColumnDesc, ColumnEncoding, CreateTableInfo,
    CreateTableInfoBuilder, DistributionType, TableCatalog,
};
pub use wire::catalog_snapshot;

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The metadata service answered with a non-OK status.
    #[error("{reason}")]
    Internal { reason: String },

    #[error(transparent)]
    TonicStatus(#[from] tonic::Status),

    #[error(transparent)]
    TonicTransport(#[from] tonic::transport::Error),

    // Database errors
    #[error("Database {name:?} doesn't exist")]
    DatabaseDoesNotExist { name: String },

    #[error("Database {name:?} already exists")]
    DatabaseAlreadyExists { name: String },

    // Schema errors
    #[error("Schema {name:?} doesn't exist")]
    SchemaDoesNotExist { name: String },

    #[error("Schema {name:?} already exists")]
    SchemaAlreadyExists { name: String },

    // Table errors
    #[error("Table {name:?} doesn't exist")]
    TableDoesNotExist { name: String },

    #[error("Table {name:?} already exists")]
    TableAlreadyExists { name: String },

    #[error("Invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// A snapshot disagrees with the replica about which id a name belongs to.
    #[error("Catalog snapshot conflicts with the local replica: {reason}")]
    Conflict { reason: String },

    #[error("Invalid catalog message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Unsupported column type: {reason}")]
    UnsupportedColumnType { reason: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Turn the status carried by every metadata service response into a result.
pub(crate) fn check_status(status: Option<&Status>, action: &str) -> CatalogResult<()> {
    match status {
        Some(status) if status.is_ok() => Ok(()),
        Some(status) if status.message.is_empty() => Err(CatalogError::Internal {
            reason: format!("{action} failed"),
        }),
        Some(status) => Err(CatalogError::Internal {
            reason: format!("{action} failed: {}", status.message),
        }),
        None => Err(CatalogError::Internal {
            reason: format!("{action} failed: response carries no status"),
        }),
    }
}

/// Request/response facade over the metadata service that owns the durable catalog.
///
/// Transport failures surface as errors; a response with a non-OK status is
/// returned as-is and interpreted by the caller.
#[async_trait]
pub trait MetaClient: Sync + Send + Debug {
    async fn get_catalog(
        &self,
        request: GetCatalogRequest,
    ) -> CatalogResult<GetCatalogResponse>;

    async fn get_id(&self, request: GetIdRequest) -> CatalogResult<GetIdResponse>;

    async fn create(&self, request: CreateRequest) -> CatalogResult<CreateResponse>;

    async fn drop_entity(&self, request: DropRequest) -> CatalogResult<DropResponse>;

    async fn heartbeat(
        &self,
        request: HeartbeatRequest,
    ) -> CatalogResult<HeartbeatResponse>;
}
