//! HTTP client for the Starbucks Management API.
//!
//! Every resource and data source goes through [`ApiClient::do_request`], which
//! attaches the credential, content type and region headers, applies the
//! configured timeout, and turns status codes of 400 and above into
//! [`ClientError::Api`].

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Header carrying the region tag on every request.
pub const REGION_HEADER: &str = "X-Region";

/// Maximum number of characters of an error body written to the log.
const MAX_LOG_BODY_LENGTH: usize = 200;

/// The HTTP methods used by the Starbucks API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_reqwest().as_str())
    }
}

/// Connection settings shared by every request of a configured provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bearer token sent in the `Authorization` header.
    pub api_key: String,
    /// URL prefix; request paths are appended verbatim.
    pub endpoint: String,
    /// Region tag sent in the `X-Region` header.
    pub region: String,
    /// Upper bound for a single request, connect to last byte.
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Executes requests against the Starbucks API.
///
/// Immutable once built. Share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Build a client for the given settings.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("starbucks-provider/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self { http, config })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request and return the raw response body.
    ///
    /// `path` is appended to the endpoint without normalisation. A `payload`,
    /// when given, is sent as the JSON request body.
    pub async fn do_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Option<&B>,
    ) -> Result<Vec<u8>, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let body = payload
            .map(serde_json::to_vec)
            .transpose()
            .map_err(ClientError::Serialization)?;

        let url = format!("{}{}", self.config.endpoint, path);
        debug!(method = %method, path = %path, "Sending API request");

        let mut request = self
            .http
            .request(method.as_reqwest(), &url)
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(REGION_HEADER, &self.config.region);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::Read)?;

        if status.as_u16() >= 400 {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                body = %sanitize_for_log(&body),
                "API request failed"
            );
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(method = %method, path = %path, status = status.as_u16(), "API request completed");
        Ok(bytes.to_vec())
    }

    /// GET `path`.
    pub async fn get(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        self.do_request::<()>(HttpMethod::Get, path, None).await
    }

    /// POST `payload` to `path`.
    pub async fn post<B>(&self, path: &str, payload: &B) -> Result<Vec<u8>, ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.do_request(HttpMethod::Post, path, Some(payload)).await
    }

    /// PUT `payload` to `path`.
    pub async fn put<B>(&self, path: &str, payload: &B) -> Result<Vec<u8>, ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.do_request(HttpMethod::Put, path, Some(payload)).await
    }

    /// DELETE `path`.
    pub async fn delete(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        self.do_request::<()>(HttpMethod::Delete, path, None).await
    }

    /// Decode a successful response body.
    pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Truncate a response body and strip control characters before logging it.
fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let mut out: String = body
        .chars()
        .take(MAX_LOG_BODY_LENGTH)
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();
    if total > MAX_LOG_BODY_LENGTH {
        out.push_str(&format!("... [truncated, {} bytes total]", body.len()));
    }
    out
}
