use std::sync::Arc;

use tracing::info;

use crate::catalog::{
    external::GrpcMetaClient, memory::MemoryMetaClient, CatalogResult, MetaClient,
    RemoteCatalog,
};

use super::schema::{self, RemoteCatalogConfig};

async fn build_meta_client(config: &RemoteCatalogConfig) -> CatalogResult<Arc<dyn MetaClient>> {
    let client: Arc<dyn MetaClient> = match &config.meta {
        schema::Meta::Grpc(schema::Grpc { dsn }) => {
            Arc::new(GrpcMetaClient::new(dsn.clone()).await?)
        }
        schema::Meta::InMemory(_) => {
            info!("Using an in-process metadata service, nothing will be persisted");
            Arc::new(MemoryMetaClient::new())
        }
    };
    Ok(client)
}

/// Connect to the configured metadata service and load the catalog from it. The
/// heartbeat isn't started.
pub async fn build_catalog(config: &RemoteCatalogConfig) -> CatalogResult<Arc<RemoteCatalog>> {
    let client = build_meta_client(config).await?;
    RemoteCatalog::try_new(client, config.catalog_options()).await
}
