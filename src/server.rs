//! gRPC server for the provider plugin protocol.
//!
//! [`ProviderService`] is the typed interface a provider implements; the
//! `serve*` functions expose it over gRPC and print the handshake line the
//! host waits for.
//!
//! # Signal Handling
//!
//! On SIGTERM or SIGINT the server:
//! 1. Stops accepting new connections
//! 2. Waits for in-flight requests to complete (bounded by [`ServeOptions::shutdown_timeout`])
//! 3. Calls the provider's `stop()` method

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated;
use crate::schema::{has_errors, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
use crate::validation;

/// Error returned by the `serve*` functions.
pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

/// Typed provider interface, one method per protocol RPC.
///
/// State and configuration are plain JSON values. Errors are reported to the
/// host as diagnostics, never as transport failures.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas for the provider config, every resource and every data source.
    fn schema(&self) -> ProviderSchema;

    /// Type names and capabilities; derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        let mut resources: Vec<_> = schema.resources.keys().cloned().collect();
        let mut data_sources: Vec<_> = schema.data_sources.keys().cloned().collect();
        resources.sort();
        data_sources.sort();
        ProviderMetadata {
            resources,
            data_sources,
            ..Default::default()
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validation::validate(&self.schema().provider, &config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validation::validate(resource, &config))
    }

    /// Plan a create (`prior_state` is `None`), an update, or a destroy
    /// (`proposed_state` is null).
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Unimplemented(format!(
            "import is not supported for {}",
            resource_type
        )))
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let data_source = schema
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))?;
        Ok(validation::validate(data_source, &config))
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        Err(ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

/// Adapts a [`ProviderService`] to the generated gRPC trait.
pub(crate) struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

impl<P: ProviderService> ProviderGrpcService<P> {
    pub(crate) fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<generated::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| generated::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => generated::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => generated::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_proto(err: &ProviderError) -> Vec<generated::Diagnostic> {
    diagnostics_to_proto(vec![err.to_diagnostic()])
}

fn schema_to_proto(schema: &Schema) -> generated::Schema {
    let attributes = schema
        .block
        .attributes
        .iter()
        .map(|(name, attr)| generated::Attribute {
            name: name.clone(),
            r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
            required: attr.flags.required,
            optional: attr.flags.optional,
            computed: attr.flags.computed,
            sensitive: attr.flags.sensitive,
            description: attr.description.clone().unwrap_or_default(),
            force_new: attr.force_new,
            default_value: attr
                .default
                .as_ref()
                .and_then(|v| serde_json::to_vec(v).ok())
                .unwrap_or_default(),
        })
        .collect();

    generated::Schema {
        version: schema.version as i64,
        block: Some(generated::Block {
            attributes,
            description: schema.block.description.clone().unwrap_or_default(),
        }),
    }
}

/// Decode a JSON payload from the host. Empty bytes mean null.
fn decode_json(bytes: &[u8], what: &str) -> Result<Value, tonic::Status> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        warn!(payload = what, error = %e, "Malformed JSON payload from host");
        ProviderError::InvalidRequest(format!("malformed {}: {}", what, e)).into()
    })
}

fn encode_json(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn log_validation(rpc: &str, subject: &str, diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        warn!(subject, diagnostics = diagnostics.len(), "{} completed with errors", rpc);
    } else {
        info!(subject, "{} completed successfully", rpc);
    }
}

#[tonic::async_trait]
impl<P: ProviderService> generated::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip(self, _request), name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<generated::GetMetadataRequest>,
    ) -> Result<tonic::Response<generated::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(generated::GetMetadataResponse {
            server_capabilities: Some(generated::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
            type_name: metadata.type_name,
            version: metadata.version,
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<generated::GetSchemaRequest>,
    ) -> Result<tonic::Response<generated::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        debug!(
            resources = schema.resources.len(),
            data_sources = schema.data_sources.len(),
            "GetSchema completed"
        );
        Ok(tonic::Response::new(generated::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip(self, request), name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<generated::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateProviderConfigResponse>, tonic::Status> {
        let config = decode_json(&request.into_inner().config, "config")?;

        let diagnostics = match self.provider.validate_provider_config(config).await {
            Ok(diagnostics) => {
                log_validation("ValidateProviderConfig", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_proto(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateProviderConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<generated::ConfigureRequest>,
    ) -> Result<tonic::Response<generated::ConfigureResponse>, tonic::Status> {
        let config = decode_json(&request.into_inner().config, "config")?;

        let diagnostics = match self.provider.configure(config).await {
            Ok(diagnostics) => {
                log_validation("Configure", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_proto(&e)
            }
        };
        Ok(tonic::Response::new(generated::ConfigureResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, _request), name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<generated::StopRequest>,
    ) -> Result<tonic::Response<generated::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            }
        };
        Ok(tonic::Response::new(generated::StopResponse { error }))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.validate_resource_config")]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<generated::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let config = decode_json(&req.config, "config")?;

        let diagnostics = match self
            .provider
            .validate_resource_config(&req.resource_type, config)
            .await
        {
            Ok(diagnostics) => {
                log_validation("ValidateResourceConfig", &req.resource_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateResourceConfig failed");
                error_to_proto(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateResourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.plan")]
    async fn plan(
        &self,
        request: tonic::Request<generated::PlanRequest>,
    ) -> Result<tonic::Response<generated::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        let prior_state = match decode_json(&req.prior_state, "prior state")? {
            Value::Null => None,
            prior => Some(prior),
        };
        let proposed_state = decode_json(&req.proposed_state, "proposed state")?;
        let config = decode_json(&req.config, "config")?;
        debug!(is_create = prior_state.is_none(), "Plan called");

        let response = match self
            .provider
            .plan(&req.resource_type, prior_state, proposed_state, config)
            .await
        {
            Ok(result) => {
                info!(
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                generated::PlanResponse {
                    planned_state: encode_json(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(error = %e, "Plan failed");
                generated::PlanResponse {
                    diagnostics: error_to_proto(&e),
                    ..Default::default()
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.create")]
    async fn create(
        &self,
        request: tonic::Request<generated::CreateRequest>,
    ) -> Result<tonic::Response<generated::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        let planned_state = decode_json(&req.planned_state, "planned state")?;

        let response = match self.provider.create(&req.resource_type, planned_state).await {
            Ok(state) => generated::CreateResponse {
                state: encode_json(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "Create failed");
                generated::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_proto(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.read")]
    async fn read(
        &self,
        request: tonic::Request<generated::ReadRequest>,
    ) -> Result<tonic::Response<generated::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        let current_state = decode_json(&req.current_state, "current state")?;

        let response = match self.provider.read(&req.resource_type, current_state).await {
            Ok(state) => generated::ReadResponse {
                state: encode_json(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "Read failed");
                generated::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_proto(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.update")]
    async fn update(
        &self,
        request: tonic::Request<generated::UpdateRequest>,
    ) -> Result<tonic::Response<generated::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        let prior_state = decode_json(&req.prior_state, "prior state")?;
        let planned_state = decode_json(&req.planned_state, "planned state")?;

        let response = match self
            .provider
            .update(&req.resource_type, prior_state, planned_state)
            .await
        {
            Ok(state) => generated::UpdateResponse {
                state: encode_json(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "Update failed");
                generated::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_proto(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.delete")]
    async fn delete(
        &self,
        request: tonic::Request<generated::DeleteRequest>,
    ) -> Result<tonic::Response<generated::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        let current_state = decode_json(&req.current_state, "current state")?;

        let diagnostics = match self.provider.delete(&req.resource_type, current_state).await {
            Ok(()) => vec![],
            Err(e) => {
                error!(error = %e, "Delete failed");
                error_to_proto(&e)
            }
        };
        Ok(tonic::Response::new(generated::DeleteResponse {
            diagnostics,
        }))
    }

    #[instrument(skip(self, request), fields(resource_type = %request.get_ref().resource_type), name = "grpc.import_resource_state")]
    async fn import_resource_state(
        &self,
        request: tonic::Request<generated::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<generated::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();

        let response = match self.provider.import_resource(&req.resource_type, &req.id).await {
            Ok(imported) => {
                info!(id = %req.id, imported = imported.len(), "ImportResourceState completed");
                generated::ImportResourceStateResponse {
                    imported: imported
                        .into_iter()
                        .map(|r| generated::ImportedResource {
                            resource_type: r.resource_type,
                            state: encode_json(&r.state),
                        })
                        .collect(),
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                error!(id = %req.id, error = %e, "ImportResourceState failed");
                generated::ImportResourceStateResponse {
                    imported: vec![],
                    diagnostics: error_to_proto(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }

    #[instrument(skip(self, request), fields(data_source_type = %request.get_ref().data_source_type), name = "grpc.validate_data_source_config")]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<generated::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<generated::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let config = decode_json(&req.config, "config")?;

        let diagnostics = match self
            .provider
            .validate_data_source_config(&req.data_source_type, config)
            .await
        {
            Ok(diagnostics) => {
                log_validation("ValidateDataSourceConfig", &req.data_source_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            }
            Err(e) => {
                error!(error = %e, "ValidateDataSourceConfig failed");
                error_to_proto(&e)
            }
        };
        Ok(tonic::Response::new(
            generated::ValidateDataSourceConfigResponse { diagnostics },
        ))
    }

    #[instrument(skip(self, request), fields(data_source_type = %request.get_ref().data_source_type), name = "grpc.read_data_source")]
    async fn read_data_source(
        &self,
        request: tonic::Request<generated::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<generated::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        let config = decode_json(&req.config, "config")?;

        let response = match self
            .provider
            .read_data_source(&req.data_source_type, config)
            .await
        {
            Ok(state) => generated::ReadDataSourceResponse {
                state: encode_json(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "ReadDataSource failed");
                generated::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_proto(&e),
                }
            }
        };
        Ok(tonic::Response::new(response))
    }
}

/// Options for configuring the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
        _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received CTRL+C, initiating graceful shutdown");
    Ok(())
}

async fn shutdown_signal() {
    shutdown_on(wait_for_shutdown_signal()).await
}

/// Resolve when `signal` reports a shutdown. If the handlers could not be
/// installed, never resolve; the host can still kill the process.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(error = %e, "Unable to install signal handlers, serving until killed");
        std::future::pending::<()>().await;
    }
}

/// Serve a provider on an ephemeral localhost port.
///
/// Prints `STARBUCKS_PROVIDER|<protocol version>|<address>` to stdout once
/// the listener is bound, then serves until SIGTERM or SIGINT.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), ServeError> {
    serve_with_options(provider, ServeOptions::default()).await
}

pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), ServeError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_with_shutdown(provider, listener, options, shutdown_signal()).await
}

/// Serve a provider on a fixed address.
pub async fn serve_on<P: ProviderService>(provider: P, addr: SocketAddr) -> Result<(), ServeError> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), ServeError> {
    let listener = TcpListener::bind(addr).await?;
    serve_with_shutdown(provider, listener, options, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<P, F>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
    shutdown: F,
) -> Result<(), ServeError>
where
    P: ProviderService,
    F: Future<Output = ()> + Send,
{
    let addr = listener.local_addr()?;
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let service = generated::provider_server::ProviderServer::new(ProviderGrpcService::new(
        Arc::clone(&provider),
    ));

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = Server::builder()
        .add_service(service)
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                let _ = drain_rx.await;
            },
        );
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            if let Err(e) = result {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
        }
        () = shutdown => {
            let _ = drain_tx.send(());
            match tokio::time::timeout(options.shutdown_timeout, &mut server).await {
                Ok(Ok(())) => info!("Server shutdown complete"),
                Ok(Err(e)) => {
                    error!(error = %e, "Server error during shutdown");
                    return Err(e.into());
                }
                Err(_) => warn!(
                    timeout = ?options.shutdown_timeout,
                    "Shutdown timeout exceeded, forcing shutdown"
                ),
            }
        }
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop() returned error");
    }
    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::provider::StarbucksProvider;
    use serde_json::json;

    fn grpc() -> ProviderGrpcService<StarbucksProvider> {
        ProviderGrpcService::new(Arc::new(
            StarbucksProvider::new("1.2.3").with_api_key_fallback(None),
        ))
    }

    fn to_bytes(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_get_metadata() {
        let response = grpc()
            .get_metadata(tonic::Request::new(generated::GetMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.type_name, "starbucks");
        assert_eq!(response.version, "1.2.3");
        assert_eq!(response.resources.len(), 5);
        assert!(response.server_capabilities.unwrap().plan_destroy);
    }

    #[tokio::test]
    async fn test_get_schema() {
        let response = grpc()
            .get_schema(tonic::Request::new(generated::GetSchemaRequest {}))
            .await
            .unwrap()
            .into_inner();

        let provider = response.provider.unwrap().block.unwrap();
        let api_key = provider
            .attributes
            .iter()
            .find(|a| a.name == "api_key")
            .unwrap();
        assert!(api_key.sensitive);

        let store = response.resources["starbucks_store"].block.clone().unwrap();
        let capacity = store
            .attributes
            .iter()
            .find(|a| a.name == "capacity")
            .unwrap();
        assert_eq!(capacity.default_value, b"50".to_vec());
        assert_eq!(capacity.r#type, br#""int64""#.to_vec());
    }

    #[tokio::test]
    async fn test_configure_missing_credential_is_diagnostic() {
        let response = grpc()
            .configure(tonic::Request::new(generated::ConfigureRequest {
                config: to_bytes(json!({})),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        let diag = &response.diagnostics[0];
        assert_eq!(diag.severity, generated::diagnostic::Severity::Error as i32);
        assert_eq!(diag.summary, "Missing API Key Configuration");
        assert!(diag.detail.contains("STARBUCKS_API_KEY"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_invalid_argument() {
        let status = grpc()
            .create(tonic::Request::new(generated::CreateRequest {
                resource_type: "starbucks_store".to_string(),
                planned_state: b"{not json".to_vec(),
            }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_plan_create() {
        let response = grpc()
            .plan(tonic::Request::new(generated::PlanRequest {
                resource_type: "starbucks_inventory".to_string(),
                prior_state: vec![],
                proposed_state: to_bytes(
                    json!({"store_id": "s-1", "item_sku": "SKU-1", "quantity": 5}),
                ),
                config: vec![],
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.changes.len(), 3);
        let planned: Value = serde_json::from_slice(&response.planned_state).unwrap();
        assert!(planned["id"].is_null());
    }

    #[tokio::test]
    async fn test_read_before_configure_is_diagnostic() {
        let response = grpc()
            .read(tonic::Request::new(generated::ReadRequest {
                resource_type: "starbucks_store".to_string(),
                current_state: to_bytes(json!({"id": "s-1"})),
            }))
            .await
            .unwrap()
            .into_inner();

        assert!(response.state.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("not been configured"));
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let response = grpc()
            .validate_resource_config(tonic::Request::new(
                generated::ValidateResourceConfigRequest {
                    resource_type: "starbucks_promotion".to_string(),
                    config: to_bytes(json!({"description": "no name"})),
                },
            ))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].attribute, "name");
    }

    /// Records whether `stop()` ran; every other operation is a no-op.
    struct StopRecorder {
        stopped: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ProviderService for StopRecorder {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
        }

        async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![])
        }

        async fn stop(&self) -> Result<(), ProviderError> {
            self.stopped
                .store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
            _config: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(&self, _: &str, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(&self, _: &str, current_state: Value) -> Result<Value, ProviderError> {
            Ok(current_state)
        }

        async fn update(&self, _: &str, _: Value, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn delete(&self, _: &str, _: Value) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_serve_with_shutdown_stops_provider() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let stopped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let provider = StopRecorder {
            stopped: Arc::clone(&stopped),
        };

        let handle = tokio::spawn(serve_with_shutdown(
            provider,
            listener,
            ServeOptions::new().with_shutdown_timeout(Duration::from_secs(5)),
            async move {
                let _ = rx.await;
            },
        ));

        tx.send(()).unwrap();
        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert!(stopped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_signal_install_keeps_serving() {
        let failed = async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::Other,
                "signal handlers unavailable",
            ))
        };

        let waited = tokio::time::timeout(Duration::from_millis(100), shutdown_on(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_signal_resolves_shutdown() {
        let received = async { Ok(()) };
        let waited = tokio::time::timeout(Duration::from_secs(1), shutdown_on(received)).await;
        assert!(waited.is_ok());
    }
}
