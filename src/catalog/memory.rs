//! An in-process metadata service, used when the frontend runs standalone and by
//! the tests, which can make it fail or slow down on demand.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use clade::meta::{
    create_request::CatalogBody, drop_request::CatalogId, status::Code, Catalog,
    CreateRequest, CreateResponse, DropRequest, DropResponse, GetCatalogRequest,
    GetCatalogResponse, GetIdRequest, GetIdResponse, HeartbeatRequest, HeartbeatResponse,
    Status,
};
use parking_lot::Mutex;
use strum_macros::Display;

use crate::catalog::{CatalogResult, MetaClient};

/// The metadata service operations, as far as failure and latency injection goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MetaOp {
    GetCatalog,
    GetId,
    Create,
    Drop,
    Heartbeat,
}

#[derive(Debug)]
struct MemoryState {
    catalog: Catalog,
    next_id: i32,
    failures: HashMap<MetaOp, VecDeque<Status>>,
    latencies: HashMap<MetaOp, Duration>,
    calls: HashMap<MetaOp, u64>,
}

#[derive(Debug)]
pub struct MemoryMetaClient {
    state: Mutex<MemoryState>,
}

impl Default for MemoryMetaClient {
    fn default() -> Self {
        Self::with_catalog(Catalog::default())
    }
}

impl MemoryMetaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing catalog; new ids are issued past the highest id in it.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let next_id = max_id(&catalog) + 1;
        Self {
            state: Mutex::new(MemoryState {
                catalog,
                next_id,
                failures: HashMap::new(),
                latencies: HashMap::new(),
                calls: HashMap::new(),
            }),
        }
    }

    pub fn catalog(&self) -> Catalog {
        self.state.lock().catalog.clone()
    }

    pub fn set_catalog(&self, catalog: Catalog) {
        let mut state = self.state.lock();
        state.next_id = state.next_id.max(max_id(&catalog) + 1);
        state.catalog = catalog;
    }

    pub fn update_catalog<F: FnOnce(&mut Catalog)>(&self, f: F) {
        let mut catalog = self.catalog();
        f(&mut catalog);
        self.set_catalog(catalog);
    }

    /// Answer the next `times` calls of `op` with an error status.
    pub fn fail_next(&self, op: MetaOp, times: usize) {
        for _ in 0..times {
            self.fail_next_with(
                op,
                Status::error(Code::InternalError, format!("injected {op} failure")),
            );
        }
    }

    /// Answer the next call of `op` with `status`, without touching the catalog.
    pub fn fail_next_with(&self, op: MetaOp, status: Status) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(status);
    }

    /// Delay the responses to `op`. The response still reflects the catalog as it
    /// was when the request came in.
    pub fn set_latency(&self, op: MetaOp, latency: Duration) {
        self.state.lock().latencies.insert(op, latency);
    }

    pub fn calls(&self, op: MetaOp) -> u64 {
        self.state.lock().calls.get(&op).copied().unwrap_or_default()
    }

    // Handle a request against the current state, then sit on the response for
    // the configured latency.
    async fn respond<R>(
        &self,
        op: MetaOp,
        handle: impl FnOnce(&mut MemoryState) -> R,
        fail: impl FnOnce(Status) -> R,
    ) -> R {
        let (response, latency) = {
            let mut state = self.state.lock();
            *state.calls.entry(op).or_default() += 1;
            let latency = state.latencies.get(&op).copied().unwrap_or_default();
            let failure = state.failures.get_mut(&op).and_then(VecDeque::pop_front);
            let response = match failure {
                Some(status) => fail(status),
                None => handle(&mut *state),
            };
            (response, latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        response
    }
}

fn max_id(catalog: &Catalog) -> i32 {
    let databases = catalog
        .databases
        .iter()
        .filter_map(|d| d.database_ref_id.as_ref())
        .map(|r| r.database_id);
    let schemas = catalog
        .schemas
        .iter()
        .filter_map(|s| s.schema_ref_id.as_ref())
        .map(|r| r.schema_id);
    let tables = catalog
        .tables
        .iter()
        .filter_map(|t| t.table_ref_id.as_ref())
        .map(|r| r.table_id);

    databases.chain(schemas).chain(tables).max().unwrap_or(0)
}

fn apply_create(catalog: &mut Catalog, body: Option<CatalogBody>) -> (Status, i32, u64) {
    const VERSION: u64 = 1;

    match body {
        Some(CatalogBody::Database(mut database)) => {
            if catalog
                .databases
                .iter()
                .any(|d| d.database_name == database.database_name)
            {
                let message = format!("database {} already exists", database.database_name);
                return (Status::error(Code::AlreadyExists, message), 0, 0);
            }
            let id = database
                .database_ref_id
                .as_ref()
                .map_or(0, |r| r.database_id);
            database.version = VERSION;
            catalog.databases.push(database);
            (Status::ok(), id, VERSION)
        }
        Some(CatalogBody::Schema(mut schema)) => {
            let parent = schema
                .schema_ref_id
                .as_ref()
                .and_then(|r| r.database_ref_id.clone());
            if !catalog
                .databases
                .iter()
                .any(|d| d.database_ref_id.is_some() && d.database_ref_id == parent)
            {
                let message = format!("database of schema {} not found", schema.schema_name);
                return (Status::error(Code::NotFound, message), 0, 0);
            }
            if catalog.schemas.iter().any(|s| {
                s.schema_name == schema.schema_name
                    && s.schema_ref_id.as_ref().and_then(|r| r.database_ref_id.as_ref())
                        == parent.as_ref()
            }) {
                let message = format!("schema {} already exists", schema.schema_name);
                return (Status::error(Code::AlreadyExists, message), 0, 0);
            }
            let id = schema.schema_ref_id.as_ref().map_or(0, |r| r.schema_id);
            schema.version = VERSION;
            catalog.schemas.push(schema);
            (Status::ok(), id, VERSION)
        }
        Some(CatalogBody::Table(mut table)) => {
            let parent = table
                .table_ref_id
                .as_ref()
                .and_then(|r| r.schema_ref_id.clone());
            if !catalog
                .schemas
                .iter()
                .any(|s| s.schema_ref_id.is_some() && s.schema_ref_id == parent)
            {
                let message = format!("schema of table {} not found", table.table_name);
                return (Status::error(Code::NotFound, message), 0, 0);
            }
            if catalog.tables.iter().any(|t| {
                t.table_name == table.table_name
                    && t.table_ref_id.as_ref().and_then(|r| r.schema_ref_id.as_ref())
                        == parent.as_ref()
            }) {
                let message = format!("table {} already exists", table.table_name);
                return (Status::error(Code::AlreadyExists, message), 0, 0);
            }
            let id = table.table_ref_id.as_ref().map_or(0, |r| r.table_id);
            table.version = VERSION;
            catalog.tables.push(table);
            (Status::ok(), id, VERSION)
        }
        None => (
            Status::error(Code::InternalError, "create request carries no body"),
            0,
            0,
        ),
    }
}

fn apply_drop(catalog: &mut Catalog, id: Option<CatalogId>) -> Status {
    match id {
        Some(CatalogId::TableId(table_id)) => {
            let before = catalog.tables.len();
            catalog
                .tables
                .retain(|t| t.table_ref_id.as_ref() != Some(&table_id));
            if catalog.tables.len() == before {
                Status::error(Code::NotFound, "table not found")
            } else {
                Status::ok()
            }
        }
        Some(CatalogId::DatabaseId(_)) | Some(CatalogId::SchemaId(_)) => Status::error(
            Code::InternalError,
            "only tables can be dropped",
        ),
        None => Status::error(Code::InternalError, "drop request carries no id"),
    }
}

#[async_trait]
impl MetaClient for MemoryMetaClient {
    async fn get_catalog(
        &self,
        _request: GetCatalogRequest,
    ) -> CatalogResult<GetCatalogResponse> {
        Ok(self
            .respond(
                MetaOp::GetCatalog,
                |state| GetCatalogResponse {
                    status: Some(Status::ok()),
                    catalog: Some(state.catalog.clone()),
                },
                |status| GetCatalogResponse {
                    status: Some(status),
                    catalog: None,
                },
            )
            .await)
    }

    async fn get_id(&self, _request: GetIdRequest) -> CatalogResult<GetIdResponse> {
        Ok(self
            .respond(
                MetaOp::GetId,
                |state| {
                    let id = state.next_id;
                    state.next_id += 1;
                    GetIdResponse {
                        status: Some(Status::ok()),
                        id,
                    }
                },
                |status| GetIdResponse {
                    status: Some(status),
                    id: 0,
                },
            )
            .await)
    }

    async fn create(&self, request: CreateRequest) -> CatalogResult<CreateResponse> {
        Ok(self
            .respond(
                MetaOp::Create,
                |state| {
                    let (status, id, version) =
                        apply_create(&mut state.catalog, request.catalog_body);
                    CreateResponse {
                        status: Some(status),
                        id,
                        version,
                    }
                },
                |status| CreateResponse {
                    status: Some(status),
                    id: 0,
                    version: 0,
                },
            )
            .await)
    }

    async fn drop_entity(&self, request: DropRequest) -> CatalogResult<DropResponse> {
        Ok(self
            .respond(
                MetaOp::Drop,
                |state| DropResponse {
                    status: Some(apply_drop(&mut state.catalog, request.catalog_id)),
                    version: 0,
                },
                |status| DropResponse {
                    status: Some(status),
                    version: 0,
                },
            )
            .await)
    }

    async fn heartbeat(
        &self,
        _request: HeartbeatRequest,
    ) -> CatalogResult<HeartbeatResponse> {
        Ok(self
            .respond(
                MetaOp::Heartbeat,
                |state| HeartbeatResponse {
                    status: Some(Status::ok()),
                    catalog: Some(state.catalog.clone()),
                },
                |status| HeartbeatResponse {
                    status: Some(status),
                    catalog: None,
                },
            )
            .await)
    }
}
