//! Crate-level error type.

use crate::cache::CacheError;
use crate::config::ConfigurationError;
use thiserror::Error;

/// Error emitted by the Alveo API client.
///
/// Every failure mode is a distinct variant; "no data found" is never an
/// error (it is `Ok(None)` on the relevant operations) and an error is never
/// reported as an empty result.
#[derive(Debug, Error)]
pub enum AlveoError {
    /// Credential or configuration resolution failed before any request.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// The server rejected the API key (HTTP 401).
    #[error("HTTP {status}\n{body}\nCheck your api key")]
    Authentication { status: u16, body: String },
    /// Any other non-2xx response; the body is reported verbatim.
    #[error("HTTP {status}\n{body}")]
    Api { status: u16, body: String },
    /// The local cache backend failed; entries for other keys are unaffected.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    /// Transport-level failure (timeout, connection refused). Not retried.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    /// No item list with the requested name exists on the server.
    #[error("item list {name:?} not found")]
    ItemListNotFound { name: String },
    /// The item's metadata lists no document at the requested index.
    #[error("item {url} has no document at index {index}")]
    DocumentNotFound { url: String, index: usize },
    /// A 2xx response whose body does not have the expected shape.
    #[error("unexpected response from server: {0}")]
    UnexpectedResponse(String),
}

impl AlveoError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AlveoError::Authentication { status, .. } | AlveoError::Api { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// True for rejected-credential failures specifically.
    pub fn is_authentication(&self) -> bool {
        matches!(self, AlveoError::Authentication { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_error_exposes_status_and_body() {
        let error = AlveoError::Authentication {
            status: 401,
            body: "Unauthorized".to_string(),
        };

        assert!(error.is_authentication());
        assert_eq!(error.status(), Some(401));

        let message = error.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Unauthorized"));
        assert!(message.contains("api key"));
    }

    #[test]
    fn test_api_error_carries_body_verbatim() {
        let error = AlveoError::Api {
            status: 404,
            body: "{\"error\": \"no such list\"}".to_string(),
        };

        assert!(!error.is_authentication());
        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("{\"error\": \"no such list\"}"));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let error = AlveoError::ItemListNotFound {
            name: "my list".to_string(),
        };
        assert_eq!(error.status(), None);
        assert!(error.to_string().contains("my list"));
    }
}
