//! Error taxonomy surfaced to callers of the API client.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Categorised client failure.
///
/// `Clone` so one refresh outcome can be handed to every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// No response arrived within the configured timeout.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The request never reached the server (DNS, refused connection, TLS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The access token was rejected and could not be refreshed.
    #[error("Session expired, please log in again")]
    SessionExpired,

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Credentials could not be read from or written to storage.
    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl ClientError {
    /// Builds an [`ClientError::Api`] from a status code and raw response body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = extract_detail(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });
        Self::Api {
            status: status.as_u16(),
            detail,
        }
    }

    pub(crate) fn storage(err: &anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }

    /// HTTP status for [`ClientError::Api`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

/// Maps a transport failure to `Timeout` or `Network`.
pub(crate) fn classify_reqwest_error(e: &reqwest::Error, timeout: Duration) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout(timeout)
    } else if e.is_decode() {
        ClientError::Decode(e.to_string())
    } else {
        ClientError::Network(e.to_string())
    }
}

/// Pulls a human-readable message out of an error body.
///
/// The API reports errors as `{"detail": "..."}`, or for validation
/// failures `{"detail": [{"loc": [...], "msg": "..."}, ...]}`.
fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn test_string_detail() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Email already registered"}"#,
        );
        assert_eq!(
            err,
            ClientError::Api {
                status: 400,
                detail: "Email already registered".to_string(),
            }
        );
        assert_eq!(err.to_string(), "HTTP 400: Email already registered");
    }

    #[test]
    fn test_validation_detail_is_flattened() {
        let body = r#"{"detail":[
            {"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},
            {"loc":["body","password"],"msg":"field required","type":"missing"}
        ]}"#;
        let err = ClientError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            err,
            ClientError::Api {
                status: 422,
                detail: "email: value is not a valid email address; password: field required"
                    .to_string(),
            }
        );
    }

    #[test]
    fn test_plain_text_body_is_kept() {
        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.to_string(), "HTTP 502: upstream down");
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ClientError::from_status(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "HTTP 404: Not Found");
    }

    #[test]
    fn test_timeout_display() {
        let err = ClientError::Timeout(Duration::from_secs(15));
        assert_eq!(err.to_string(), "Request timed out after 15s");
        assert_eq!(err.status(), None);
        assert!(!err.is_session_expired());
    }
}
