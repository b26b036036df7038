//! The Starbucks provider: ties configuration, resources and data sources
//! together behind [`ProviderService`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::config::{self, ProviderConfig, API_KEY_ENV};
use crate::data_sources::{self, DataSourceDescriptor, DataSourceHandler};
use crate::error::ProviderError;
use crate::resources::{self, ResourceDescriptor, ResourceHandler};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{
    ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities, PROVIDER_TYPE_NAME,
};

/// Handlers bound to the client built at Configure time.
#[derive(Debug)]
struct Registry {
    resources: HashMap<String, ResourceHandler>,
    data_sources: HashMap<String, DataSourceHandler>,
}

impl Registry {
    fn new(client: Arc<ApiClient>) -> Self {
        let resources = resources::ALL
            .iter()
            .map(|d| (d.type_name(), ResourceHandler::new(d, Arc::clone(&client))))
            .collect();
        let data_sources = data_sources::ALL
            .iter()
            .map(|d| (d.type_name(), DataSourceHandler::new(d, Arc::clone(&client))))
            .collect();
        Self {
            resources,
            data_sources,
        }
    }
}

/// Provider for the Starbucks Management API.
#[derive(Debug)]
pub struct StarbucksProvider {
    version: String,
    env_api_key: Option<String>,
    registry: OnceLock<Registry>,
    stopped: AtomicBool,
}

impl StarbucksProvider {
    /// Create a provider, reading the fallback credential from `STARBUCKS_API_KEY`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            env_api_key: std::env::var(API_KEY_ENV).ok(),
            registry: OnceLock::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Replace the credential used when the configuration has no `api_key`.
    pub fn with_api_key_fallback(mut self, api_key: Option<String>) -> Self {
        self.env_api_key = api_key;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.registry.get().is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn registry(&self) -> Result<&Registry, ProviderError> {
        self.registry.get().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider has not been configured".to_string())
        })
    }

    fn resource_descriptor(
        &self,
        resource_type: &str,
    ) -> Result<&'static ResourceDescriptor, ProviderError> {
        resources::ALL
            .iter()
            .copied()
            .find(|d| d.type_name() == resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source_descriptor(
        &self,
        data_source_type: &str,
    ) -> Result<&'static DataSourceDescriptor, ProviderError> {
        data_sources::ALL
            .iter()
            .copied()
            .find(|d| d.type_name() == data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }

    fn resource(&self, resource_type: &str) -> Result<&ResourceHandler, ProviderError> {
        self.resource_descriptor(resource_type)?;
        self.registry()?
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<&DataSourceHandler, ProviderError> {
        self.data_source_descriptor(data_source_type)?;
        self.registry()?
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_string()))
    }
}

fn already_configured() -> Diagnostic {
    Diagnostic::error("Provider already configured")
        .with_detail("Configure may only be called once per provider process")
}

#[async_trait::async_trait]
impl ProviderService for StarbucksProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(config::provider_schema());
        let schema = resources::ALL
            .iter()
            .fold(schema, |s, d| s.with_resource(d.type_name(), d.schema()));
        data_sources::ALL
            .iter()
            .fold(schema, |s, d| s.with_data_source(d.type_name(), d.schema()))
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
            resources: resources::ALL.iter().map(|d| d.type_name()).collect(),
            data_sources: data_sources::ALL.iter().map(|d| d.type_name()).collect(),
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(config::validate(&config))
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        if self.is_configured() {
            warn!("Configure called on an already configured provider");
            return Ok(vec![already_configured()]);
        }

        let diagnostics = config::validate(&config);
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let resolved = ProviderConfig::resolve(&config, self.env_api_key.clone())?;
        let client = ApiClient::new(resolved.client_config()).map_err(|e| {
            ProviderError::Configuration(format!("unable to build HTTP client: {}", e))
        })?;

        if self.registry.set(Registry::new(Arc::new(client))).is_err() {
            return Ok(vec![already_configured()]);
        }

        info!(
            endpoint = %resolved.endpoint,
            region = %resolved.region,
            timeout = ?resolved.timeout,
            "Provider configured"
        );
        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        self.stopped.store(true, Ordering::SeqCst);
        info!("Provider stopped");
        Ok(())
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.resource_descriptor(resource_type)?
            .plan(prior_state.as_ref(), &proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.create(&planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.resource(resource_type)?.read(&current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.resource(resource_type)?
            .update(&prior_state, &planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.resource(resource_type)?.delete(&current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Ok(vec![self.resource_descriptor(resource_type)?.import(id)?])
    }

    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.data_source(data_source_type)?.read(&config).await
    }
}
