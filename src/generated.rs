// Protocol types and gRPC service glue for `plugin.provider.v1`.
// Kept in sync with proto/provider.proto (see build.rs).

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Diagnostic {
    #[prost(enumeration = "diagnostic::Severity", tag = "1")]
    pub severity: i32,
    #[prost(string, tag = "2")]
    pub summary: String,
    #[prost(string, tag = "3")]
    pub detail: String,
    #[prost(string, tag = "4")]
    pub attribute: String,
}

pub mod diagnostic {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Severity {
        Invalid = 0,
        Error = 1,
        Warning = 2,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Attribute {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub r#type: Vec<u8>,
    #[prost(bool, tag = "3")]
    pub required: bool,
    #[prost(bool, tag = "4")]
    pub optional: bool,
    #[prost(bool, tag = "5")]
    pub computed: bool,
    #[prost(bool, tag = "6")]
    pub sensitive: bool,
    #[prost(string, tag = "7")]
    pub description: String,
    #[prost(bool, tag = "8")]
    pub force_new: bool,
    #[prost(bytes = "vec", tag = "9")]
    pub default_value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(message, repeated, tag = "1")]
    pub attributes: Vec<Attribute>,
    #[prost(string, tag = "2")]
    pub description: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Schema {
    #[prost(int64, tag = "1")]
    pub version: i64,
    #[prost(message, optional, tag = "2")]
    pub block: Option<Block>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerCapabilities {
    #[prost(bool, tag = "1")]
    pub plan_destroy: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributeChange {
    #[prost(string, tag = "1")]
    pub path: String,
    #[prost(bytes = "vec", tag = "2")]
    pub before: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub after: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportedResource {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub state: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMetadataRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetMetadataResponse {
    #[prost(message, optional, tag = "1")]
    pub server_capabilities: Option<ServerCapabilities>,
    #[prost(string, repeated, tag = "2")]
    pub resources: Vec<String>,
    #[prost(string, repeated, tag = "3")]
    pub data_sources: Vec<String>,
    #[prost(message, repeated, tag = "4")]
    pub diagnostics: Vec<Diagnostic>,
    #[prost(string, tag = "5")]
    pub type_name: String,
    #[prost(string, tag = "6")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSchemaResponse {
    #[prost(message, optional, tag = "1")]
    pub provider: Option<Schema>,
    #[prost(map = "string, message", tag = "2")]
    pub resources: ::std::collections::HashMap<String, Schema>,
    #[prost(map = "string, message", tag = "3")]
    pub data_sources: ::std::collections::HashMap<String, Schema>,
    #[prost(message, repeated, tag = "4")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateProviderConfigRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateProviderConfigResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopResponse {
    #[prost(string, tag = "1")]
    pub error: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateResourceConfigRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateResourceConfigResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlanRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub prior_state: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub proposed_state: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlanResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub planned_state: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub changes: Vec<AttributeChange>,
    #[prost(bool, tag = "3")]
    pub requires_replace: bool,
    #[prost(message, repeated, tag = "4")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub planned_state: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub state: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub current_state: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub state: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub prior_state: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub planned_state: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub state: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub current_state: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportResourceStateRequest {
    #[prost(string, tag = "1")]
    pub resource_type: String,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImportResourceStateResponse {
    #[prost(message, repeated, tag = "1")]
    pub imported: Vec<ImportedResource>,
    #[prost(message, repeated, tag = "2")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateDataSourceConfigRequest {
    #[prost(string, tag = "1")]
    pub data_source_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValidateDataSourceConfigResponse {
    #[prost(message, repeated, tag = "1")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadDataSourceRequest {
    #[prost(string, tag = "1")]
    pub data_source_type: String,
    #[prost(bytes = "vec", tag = "2")]
    pub config: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadDataSourceResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub state: Vec<u8>,
    #[prost(message, repeated, tag = "2")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Server-side glue for the `Provider` gRPC service.
pub mod provider_server {
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use tonic::codegen::{http, Body, BoxFuture, Service, StdError};

    /// Service methods the host runtime calls on a provider process.
    #[tonic::async_trait]
    pub trait Provider: Send + Sync + 'static {
        async fn get_metadata(
            &self,
            request: tonic::Request<super::GetMetadataRequest>,
        ) -> Result<tonic::Response<super::GetMetadataResponse>, tonic::Status>;
        async fn get_schema(
            &self,
            request: tonic::Request<super::GetSchemaRequest>,
        ) -> Result<tonic::Response<super::GetSchemaResponse>, tonic::Status>;
        async fn validate_provider_config(
            &self,
            request: tonic::Request<super::ValidateProviderConfigRequest>,
        ) -> Result<tonic::Response<super::ValidateProviderConfigResponse>, tonic::Status>;
        async fn configure(
            &self,
            request: tonic::Request<super::ConfigureRequest>,
        ) -> Result<tonic::Response<super::ConfigureResponse>, tonic::Status>;
        async fn stop(
            &self,
            request: tonic::Request<super::StopRequest>,
        ) -> Result<tonic::Response<super::StopResponse>, tonic::Status>;
        async fn validate_resource_config(
            &self,
            request: tonic::Request<super::ValidateResourceConfigRequest>,
        ) -> Result<tonic::Response<super::ValidateResourceConfigResponse>, tonic::Status>;
        async fn plan(
            &self,
            request: tonic::Request<super::PlanRequest>,
        ) -> Result<tonic::Response<super::PlanResponse>, tonic::Status>;
        async fn create(
            &self,
            request: tonic::Request<super::CreateRequest>,
        ) -> Result<tonic::Response<super::CreateResponse>, tonic::Status>;
        async fn read(
            &self,
            request: tonic::Request<super::ReadRequest>,
        ) -> Result<tonic::Response<super::ReadResponse>, tonic::Status>;
        async fn update(
            &self,
            request: tonic::Request<super::UpdateRequest>,
        ) -> Result<tonic::Response<super::UpdateResponse>, tonic::Status>;
        async fn delete(
            &self,
            request: tonic::Request<super::DeleteRequest>,
        ) -> Result<tonic::Response<super::DeleteResponse>, tonic::Status>;
        async fn import_resource_state(
            &self,
            request: tonic::Request<super::ImportResourceStateRequest>,
        ) -> Result<tonic::Response<super::ImportResourceStateResponse>, tonic::Status>;
        async fn validate_data_source_config(
            &self,
            request: tonic::Request<super::ValidateDataSourceConfigRequest>,
        ) -> Result<tonic::Response<super::ValidateDataSourceConfigResponse>, tonic::Status>;
        async fn read_data_source(
            &self,
            request: tonic::Request<super::ReadDataSourceRequest>,
        ) -> Result<tonic::Response<super::ReadDataSourceResponse>, tonic::Status>;
    }

    /// Routes an HTTP/2 request to a unary method of the wrapped service.
    macro_rules! unary {
        ($inner:expr, $req:expr, $method:ident, $request:ty, $response:ty) => {{
            struct Svc<T: Provider>(Arc<T>);

            impl<T: Provider> tonic::server::UnaryService<$request> for Svc<T> {
                type Response = $response;
                type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;

                fn call(&mut self, request: tonic::Request<$request>) -> Self::Future {
                    let inner = Arc::clone(&self.0);
                    Box::pin(async move { <T as Provider>::$method(&inner, request).await })
                }
            }

            let inner = $inner;
            let req = $req;
            Box::pin(async move {
                let codec = tonic_prost::ProstCodec::default();
                let mut grpc = tonic::server::Grpc::new(codec);
                Ok(grpc.unary(Svc(inner), req).await)
            })
        }};
    }

    /// A tower service wrapping a [`Provider`] implementation.
    #[derive(Debug)]
    pub struct ProviderServer<T> {
        inner: Arc<T>,
    }

    impl<T> ProviderServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }

        pub fn from_arc(inner: Arc<T>) -> Self {
            Self { inner }
        }
    }

    impl<T> Clone for ProviderServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<T, B> Service<http::Request<B>> for ProviderServer<T>
    where
        T: Provider,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::Body>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = Arc::clone(&self.inner);
            match req.uri().path() {
                "/plugin.provider.v1.Provider/GetMetadata" => unary!(
                    inner,
                    req,
                    get_metadata,
                    super::GetMetadataRequest,
                    super::GetMetadataResponse
                ),
                "/plugin.provider.v1.Provider/GetSchema" => unary!(
                    inner,
                    req,
                    get_schema,
                    super::GetSchemaRequest,
                    super::GetSchemaResponse
                ),
                "/plugin.provider.v1.Provider/ValidateProviderConfig" => unary!(
                    inner,
                    req,
                    validate_provider_config,
                    super::ValidateProviderConfigRequest,
                    super::ValidateProviderConfigResponse
                ),
                "/plugin.provider.v1.Provider/Configure" => unary!(
                    inner,
                    req,
                    configure,
                    super::ConfigureRequest,
                    super::ConfigureResponse
                ),
                "/plugin.provider.v1.Provider/Stop" => {
                    unary!(inner, req, stop, super::StopRequest, super::StopResponse)
                }
                "/plugin.provider.v1.Provider/ValidateResourceConfig" => unary!(
                    inner,
                    req,
                    validate_resource_config,
                    super::ValidateResourceConfigRequest,
                    super::ValidateResourceConfigResponse
                ),
                "/plugin.provider.v1.Provider/Plan" => {
                    unary!(inner, req, plan, super::PlanRequest, super::PlanResponse)
                }
                "/plugin.provider.v1.Provider/Create" => unary!(
                    inner,
                    req,
                    create,
                    super::CreateRequest,
                    super::CreateResponse
                ),
                "/plugin.provider.v1.Provider/Read" => {
                    unary!(inner, req, read, super::ReadRequest, super::ReadResponse)
                }
                "/plugin.provider.v1.Provider/Update" => unary!(
                    inner,
                    req,
                    update,
                    super::UpdateRequest,
                    super::UpdateResponse
                ),
                "/plugin.provider.v1.Provider/Delete" => unary!(
                    inner,
                    req,
                    delete,
                    super::DeleteRequest,
                    super::DeleteResponse
                ),
                "/plugin.provider.v1.Provider/ImportResourceState" => unary!(
                    inner,
                    req,
                    import_resource_state,
                    super::ImportResourceStateRequest,
                    super::ImportResourceStateResponse
                ),
                "/plugin.provider.v1.Provider/ValidateDataSourceConfig" => unary!(
                    inner,
                    req,
                    validate_data_source_config,
                    super::ValidateDataSourceConfigRequest,
                    super::ValidateDataSourceConfigResponse
                ),
                "/plugin.provider.v1.Provider/ReadDataSource" => unary!(
                    inner,
                    req,
                    read_data_source,
                    super::ReadDataSourceRequest,
                    super::ReadDataSourceResponse
                ),
                _ => Box::pin(async move {
                    Ok(tonic::Status::unimplemented("unknown method").into_http())
                }),
            }
        }
    }

    pub const SERVICE_NAME: &str = "plugin.provider.v1.Provider";

    impl<T> tonic::server::NamedService for ProviderServer<T> {
        const NAME: &'static str = SERVICE_NAME;
    }
}
