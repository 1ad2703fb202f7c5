//! Client error types

use serde_json::Value;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// 401 or 403 from the data or auth API
    #[error("Authentication error ({status}): {message}")]
    Authentication {
        status: u16,
        message: String,
        response: Option<Value>,
    },

    /// 404 from the data or auth API
    #[error("Not found ({status}): {message}")]
    NotFound {
        status: u16,
        message: String,
        response: Option<Value>,
    },

    /// 429 from the data or auth API
    #[error("Rate limited ({status}): {message}")]
    RateLimited {
        status: u16,
        message: String,
        response: Option<Value>,
    },

    /// Any other non-2xx status from the data or auth API
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        message: String,
        response: Option<Value>,
    },

    /// Non-2xx status from the storage API
    #[error("Storage error ({status}): {message}")]
    Storage {
        status: u16,
        message: String,
        response: Option<Value>,
    },

    /// Not enough storage left, raised locally by the quota check
    /// (`status` is `None`) or reported by the server with a 413
    #[error(
        "Storage limit exceeded: {message} (required: {}, available: {})",
        display_bytes(.required_bytes),
        display_bytes(.available_bytes)
    )]
    StorageLimitExceeded {
        message: String,
        required_bytes: i64,
        available_bytes: i64,
        status: Option<u16>,
        response: Option<Value>,
    },

    /// Connection, DNS, TLS or timeout failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request body could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Success response could not be deserialized
    #[error("Decoding error: {0}")]
    Decoding(#[source] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No access token stored or supplied
    #[error("Access token is required to fetch the user profile")]
    MissingAccessToken,
}

impl ClientError {
    /// Classify a failed data or auth API response
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let response = serde_json::from_slice::<Value>(body).ok();
        let message = extract_message(response.as_ref(), status);

        match status {
            401 | 403 => Self::Authentication { status, message, response },
            404 => Self::NotFound { status, message, response },
            429 => Self::RateLimited { status, message, response },
            _ => Self::Api { status, message, response },
        }
    }

    /// Classify a failed storage API response
    pub fn from_storage_response(status: u16, body: &[u8]) -> Self {
        let response = serde_json::from_slice::<Value>(body).ok();
        let message = extract_message(response.as_ref(), status);

        if status == 413 {
            let field = |name: &str| {
                response
                    .as_ref()
                    .and_then(|r| r.get(name))
                    .and_then(Value::as_i64)
                    .unwrap_or(0)
            };
            return Self::StorageLimitExceeded {
                required_bytes: field("required_bytes"),
                available_bytes: field("available_bytes"),
                message,
                status: Some(status),
                response,
            };
        }

        Self::Storage { status, message, response }
    }

    /// HTTP status of a server-reported error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::NotFound { status, .. }
            | Self::RateLimited { status, .. }
            | Self::Api { status, .. }
            | Self::Storage { status, .. } => Some(*status),
            Self::StorageLimitExceeded { status, .. } => *status,
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Storage { status, .. } if *status == 404)
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::MissingAccessToken)
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if the request never got a response
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Pick the best message from an error body: `error`, then `message`,
/// then `detail`, falling back to the status code.
fn extract_message(response: Option<&Value>, status: u16) -> String {
    response
        .and_then(|r| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|field| r.get(*field).and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed with status {}", status))
}

fn display_bytes(bytes: &i64) -> String {
    format_bytes(*bytes)
}

/// Format a byte count with binary units, e.g. `1536` as `"1.50 KB"`
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.2} {}B", bytes as f64 / div as f64, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ClientError::from_response(401, b"{}"),
            ClientError::Authentication { status: 401, .. }
        ));
        assert!(matches!(
            ClientError::from_response(403, b"{}"),
            ClientError::Authentication { status: 403, .. }
        ));
        assert!(ClientError::from_response(404, b"{}").is_not_found());
        assert!(ClientError::from_response(429, b"{}").is_rate_limited());
        assert!(matches!(
            ClientError::from_response(500, b"{}"),
            ClientError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_message_precedence() {
        let body = br#"{"detail":"d","message":"m","error":"e"}"#;
        match ClientError::from_response(400, body) {
            ClientError::Api { message, response, .. } => {
                assert_eq!(message, "e");
                assert!(response.is_some());
            }
            other => panic!("Expected Api error, got {:?}", other),
        }

        let body = br#"{"detail":"d","message":"m"}"#;
        match ClientError::from_response(400, body) {
            ClientError::Api { message, .. } => assert_eq!(message, "m"),
            other => panic!("Expected Api error, got {:?}", other),
        }

        let body = br#"{"detail":"d"}"#;
        match ClientError::from_response(400, body) {
            ClientError::Api { message, .. } => assert_eq!(message, "d"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_message_fallback() {
        match ClientError::from_response(502, b"<html>bad gateway</html>") {
            ClientError::Api { message, response, .. } => {
                assert_eq!(message, "Request failed with status 502");
                assert!(response.is_none());
            }
            other => panic!("Expected Api error, got {:?}", other),
        }

        // non-string fields are skipped
        match ClientError::from_response(400, br#"{"error":{"code":1},"detail":"x"}"#) {
            ClientError::Api { message, .. } => assert_eq!(message, "x"),
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_classification() {
        let body = br#"{"error":"quota","required_bytes":2048,"available_bytes":1024}"#;
        match ClientError::from_storage_response(413, body) {
            ClientError::StorageLimitExceeded {
                required_bytes,
                available_bytes,
                status,
                message,
                ..
            } => {
                assert_eq!(required_bytes, 2048);
                assert_eq!(available_bytes, 1024);
                assert_eq!(status, Some(413));
                assert_eq!(message, "quota");
            }
            other => panic!("Expected StorageLimitExceeded, got {:?}", other),
        }

        let err = ClientError::from_storage_response(404, b"{}");
        assert!(matches!(err, ClientError::Storage { status: 404, .. }));
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_572_864), "1.50 MB");
        assert_eq!(format_bytes(10 * 1024 * 1024 * 1024), "10.00 GB");
    }

    #[test]
    fn test_limit_display_formats_bytes() {
        let err = ClientError::StorageLimitExceeded {
            message: "no room".to_string(),
            required_bytes: 1_572_864,
            available_bytes: 1024,
            status: None,
            response: None,
        };
        assert_eq!(
            err.to_string(),
            "Storage limit exceeded: no room (required: 1.50 MB, available: 1.00 KB)"
        );
        assert_eq!(err.status(), None);
    }
}
