//! Provider configuration: schema, defaults, environment fallback and validation.

use std::time::Duration;

use reqwest::Url;
use serde::{de, Deserialize, Deserializer};
use serde_json::{Number, Value};
use tracing::debug;

use crate::client::ClientConfig;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::validation;

/// Environment variable consulted when `api_key` is not configured.
pub const API_KEY_ENV: &str = "STARBUCKS_API_KEY";

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.starbucks.com/v1";

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Request timeout, in seconds, used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: i64 = 30;

/// Provider configuration as sent by the host. Every attribute is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RawProviderConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    #[serde(deserialize_with = "whole_seconds")]
    pub timeout: Option<i64>,
}

/// Accept `30` and `30.0` alike; schema validation treats both as int64.
fn whole_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        })
        .map(Some)
        .ok_or_else(|| {
            de::Error::custom(format!("expected a whole number of seconds, got {}", number))
        })
}

impl RawProviderConfig {
    /// Decode the host config value. `null` means "nothing configured".
    pub fn from_value(config: &Value) -> Result<Self, ProviderError> {
        if config.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(config.clone()).map_err(|e| {
            ProviderError::Configuration(format!("invalid provider configuration: {}", e))
        })
    }
}

/// Fully resolved provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub endpoint: String,
    pub region: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Resolve the host config against the environment and defaults.
    ///
    /// An explicitly configured value always wins; `env_api_key` is only
    /// used when `api_key` is absent or null. Fails before any network
    /// activity when no usable credential remains.
    pub fn resolve(config: &Value, env_api_key: Option<String>) -> Result<Self, ProviderError> {
        let raw = RawProviderConfig::from_value(config)?;

        let api_key = raw.api_key.or(env_api_key).unwrap_or_default();
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let endpoint = raw
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        check_endpoint(&endpoint).map_err(ProviderError::Configuration)?;

        let timeout = raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let timeout = check_timeout(timeout).map_err(ProviderError::Configuration)?;

        let region = raw.region.unwrap_or_else(|| DEFAULT_REGION.to_string());

        debug!(endpoint = %endpoint, region = %region, timeout = ?timeout, "Resolved provider configuration");

        Ok(Self {
            api_key,
            endpoint,
            region,
            timeout,
        })
    }

    /// The settings handed to the API client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            timeout: self.timeout,
        }
    }
}

/// Schema of the provider configuration block.
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description(
            "Provider for managing Starbucks infrastructure, stores, employees, and operations.",
        )
        .with_attribute(
            "api_key",
            Attribute::optional_string().sensitive().with_description(format!(
                "API key for Starbucks Management API. Can also be set via {} environment variable.",
                API_KEY_ENV
            )),
        )
        .with_attribute(
            "endpoint",
            Attribute::optional_string()
                .with_description(format!("API endpoint URL. Defaults to {}", DEFAULT_ENDPOINT)),
        )
        .with_attribute(
            "region",
            Attribute::optional_string()
                .with_description("Region for API calls (e.g., us-west-2, us-east-1)"),
        )
        .with_attribute(
            "timeout",
            Attribute::new(AttributeType::Int64, AttributeFlags::optional()).with_description(
                format!(
                    "API request timeout in seconds. Defaults to {}.",
                    DEFAULT_TIMEOUT_SECS
                ),
            ),
        )
}

/// Validate a provider config without resolving the credential.
///
/// The credential may still arrive through the environment at Configure time,
/// so a missing `api_key` is not reported here.
pub fn validate(config: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = validation::validate(&provider_schema(), config);
    if !diagnostics.is_empty() {
        return diagnostics;
    }

    let raw = match RawProviderConfig::from_value(config) {
        Ok(raw) => raw,
        Err(e) => return vec![e.to_diagnostic()],
    };

    if let Some(endpoint) = &raw.endpoint {
        if let Err(msg) = check_endpoint(endpoint) {
            diagnostics.push(
                Diagnostic::error("Invalid endpoint")
                    .with_detail(msg)
                    .with_attribute("endpoint"),
            );
        }
    }
    if let Some(timeout) = raw.timeout {
        if let Err(msg) = check_timeout(timeout) {
            diagnostics.push(
                Diagnostic::error("Invalid timeout")
                    .with_detail(msg)
                    .with_attribute("timeout"),
            );
        }
    }

    diagnostics
}

fn check_endpoint(endpoint: &str) -> Result<(), String> {
    match Url::parse(endpoint) {
        Ok(url) if !url.cannot_be_a_base() => Ok(()),
        Ok(_) => Err(format!("endpoint '{}' is not a base URL", endpoint)),
        Err(e) => Err(format!("endpoint '{}' is not a valid URL: {}", endpoint, e)),
    }
}

fn check_timeout(secs: i64) -> Result<Duration, String> {
    if secs <= 0 {
        return Err(format!(
            "timeout must be a positive number of seconds, got {}",
            secs
        ));
    }
    Ok(Duration::from_secs(secs as u64))
}
