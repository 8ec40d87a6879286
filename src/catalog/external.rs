use crate::catalog::{CatalogResult, MetaClient};
use clade::meta::meta_service_client::MetaServiceClient;
use clade::meta::{
    CreateRequest, CreateResponse, DropRequest, DropResponse, GetCatalogRequest,
    GetCatalogResponse, GetIdRequest, GetIdResponse, HeartbeatRequest, HeartbeatResponse,
};
use tonic::transport::{channel::Channel, Error};
use tonic::Request;
use tracing::info;

// A metadata service reached over gRPC
#[derive(Debug, Clone)]
pub struct GrpcMetaClient {
    client: MetaServiceClient<Channel>,
}

impl GrpcMetaClient {
    pub async fn new(dsn: String) -> Result<Self, Error> {
        info!("Connecting to metadata service at {dsn}");
        let client = MetaServiceClient::connect(dsn).await?;
        Ok(Self { client })
    }

    // Tonic client implementations always end up needing mut references, and apparently the way
    // to go is cloning a client instance instead of introducing synchronization primitives:
    // https://github.com/hyperium/tonic/issues/33#issuecomment-538154015
    fn client(&self) -> MetaServiceClient<Channel> {
        self.client.clone()
    }
}

#[tonic::async_trait]
impl MetaClient for GrpcMetaClient {
    async fn get_catalog(
        &self,
        request: GetCatalogRequest,
    ) -> CatalogResult<GetCatalogResponse> {
        let response = self.client().get_catalog(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn get_id(&self, request: GetIdRequest) -> CatalogResult<GetIdResponse> {
        let response = self.client().get_id(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn create(&self, request: CreateRequest) -> CatalogResult<CreateResponse> {
        let response = self.client().create(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn drop_entity(&self, request: DropRequest) -> CatalogResult<DropResponse> {
        let response = self.client().drop_entity(Request::new(request)).await?;
        Ok(response.into_inner())
    }

    async fn heartbeat(
        &self,
        request: HeartbeatRequest,
    ) -> CatalogResult<HeartbeatResponse> {
        let response = self.client().heartbeat(Request::new(request)).await?;
        Ok(response.into_inner())
    }
}
