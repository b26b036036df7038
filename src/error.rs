//! Error types for the API client and the provider.

use thiserror::Error;

use crate::config::API_KEY_ENV;
use crate::schema::Diagnostic;

/// Errors returned by the API request executor.
///
/// Every variant is terminal for the call that produced it; nothing is retried.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request payload could not be encoded as JSON.
    #[error("error marshaling request: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request could not be sent (DNS, connect, reset, timeout).
    #[error("error making request: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body could not be read in full.
    #[error("error reading response: {0}")]
    Read(#[source] reqwest::Error),

    /// The API answered with a status code of 400 or above.
    #[error("API error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body, verbatim.
        body: String,
    },

    /// A successful response body could not be decoded.
    #[error("{0}")]
    Parse(String),
}

impl ClientError {
    /// The HTTP status code, for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors surfaced to the host runtime by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A call to the Starbucks API failed.
    #[error("{action}: {source}")]
    Client {
        /// What the provider was trying to do, e.g. "Unable to create store".
        action: String,
        /// The underlying client failure.
        #[source]
        source: ClientError,
    },

    /// No API key in the configuration or the environment.
    #[error("Missing API Key Configuration")]
    MissingApiKey,

    /// A configuration value is present but unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state or config value from the host could not be used.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The operation needs a step that has not happened yet (e.g. Configure).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Wrap a client error with the action that failed.
    pub fn client(action: impl Into<String>, source: ClientError) -> Self {
        Self::Client {
            action: action.into(),
            source,
        }
    }

    /// Build a client error closure for `map_err`.
    pub fn during(action: impl Into<String>) -> impl FnOnce(ClientError) -> Self {
        let action = action.into();
        move |source| Self::client(action, source)
    }

    /// Render this error as a single error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Client {
                source: ClientError::Parse(msg),
                ..
            } => Diagnostic::error("Parse Error")
                .with_detail(format!("Unable to parse response: {}", msg)),
            Self::Client { .. } => Diagnostic::error("Client Error").with_detail(self.to_string()),
            Self::MissingApiKey => Diagnostic::error(self.to_string()).with_detail(format!(
                "API key must be provided via api_key attribute or {} environment variable",
                API_KEY_ENV
            )),
            _ => Diagnostic::error(self.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match &err {
            ProviderError::Client { source, .. } => match source {
                ClientError::Api { status, .. } => match status {
                    401 => tonic::Status::unauthenticated(message),
                    403 => tonic::Status::permission_denied(message),
                    404 => tonic::Status::not_found(message),
                    409 => tonic::Status::already_exists(message),
                    429 => tonic::Status::resource_exhausted(message),
                    s if *s >= 500 => tonic::Status::unavailable(message),
                    _ => tonic::Status::invalid_argument(message),
                },
                ClientError::Transport(_) | ClientError::Read(_) => {
                    tonic::Status::unavailable(message)
                }
                ClientError::Serialization(_) | ClientError::Parse(_) => {
                    tonic::Status::internal(message)
                }
            },
            ProviderError::MissingApiKey
            | ProviderError::Configuration(_)
            | ProviderError::FailedPrecondition(_) => tonic::Status::failed_precondition(message),
            ProviderError::InvalidRequest(_) => tonic::Status::invalid_argument(message),
            ProviderError::UnknownResource(_) => tonic::Status::not_found(message),
            ProviderError::Unimplemented(_) => tonic::Status::unimplemented(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    fn api_error(status: u16, body: &str) -> ClientError {
        ClientError::Api {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_api_error_display_keeps_body_verbatim() {
        let err = api_error(404, r#"{"error":"not found"}"#);
        assert_eq!(
            err.to_string(),
            r#"API error (status 404): {"error":"not found"}"#
        );
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ClientError = serde_err.into();
        assert!(matches!(err, ClientError::Parse(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_client_error_diagnostic() {
        let err = ProviderError::client("Unable to read store", api_error(500, "boom"));
        let diag = err.to_diagnostic();

        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.summary, "Client Error");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Unable to read store: API error (status 500): boom")
        );
    }

    #[test]
    fn test_parse_error_diagnostic() {
        let err = ProviderError::client(
            "Unable to create store",
            ClientError::Parse("expected value at line 1 column 1".to_string()),
        );
        let diag = err.to_diagnostic();

        assert_eq!(diag.summary, "Parse Error");
        assert_eq!(
            diag.detail.as_deref(),
            Some("Unable to parse response: expected value at line 1 column 1")
        );
    }

    #[test]
    fn test_missing_api_key_diagnostic() {
        let diag = ProviderError::MissingApiKey.to_diagnostic();
        assert_eq!(diag.summary, "Missing API Key Configuration");
        assert!(diag.detail.unwrap().contains(API_KEY_ENV));
    }

    #[test]
    fn test_during_builds_client_error() {
        let err = ProviderError::during("Unable to delete promotion")(api_error(409, "in use"));
        assert_eq!(
            err.to_string(),
            "Unable to delete promotion: API error (status 409): in use"
        );
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::client("x", api_error(404, "")).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::client("x", api_error(403, "")).into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);

        let status: tonic::Status = ProviderError::client("x", api_error(429, "")).into();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);

        let status: tonic::Status = ProviderError::client("x", api_error(503, "")).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status = ProviderError::MissingApiKey.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::UnknownResource("x".into()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::InvalidRequest("x".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_host_level_kinds_to_status() {
        let status: tonic::Status = ProviderError::Configuration("bad".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::FailedPrecondition("x".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::Unimplemented("x".into()).into();
        assert_eq!(status.code(), tonic::Code::Unimplemented);

        let status: tonic::Status =
            ProviderError::client("x", ClientError::Parse("eof".into())).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
