//! Unified error types for tollgate.
//!
//! [`GatewayError`] covers startup, config and CLI failures and is what
//! `main` reports. [`ForwardError`] is the per-request failure raised by a
//! [`Forward`](crate::pipeline::Forward) implementation; the pipeline turns
//! it into a gateway error response. [`InterceptError`] lets an
//! interceptor reject a request before it is forwarded.
//! [`ValidationError`] carries config validation failures with hints.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::StatusCode;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub route: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {} - {}", self.route, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid header value for {name}: {value:?}")]
    InvalidHeaderValue { name: &'static str, value: String },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(StatusCode),
}

/// Failure of the forwarding collaborator for a single request.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ForwardError {
    #[error("no route matched {method} {path}")]
    NoRoute { method: String, path: String },

    #[error("upstream timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("invalid upstream URI {uri:?}: {reason}")]
    InvalidUpstream { uri: String, reason: String },

    #[error("upstream request failed: {source}")]
    Upstream {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("body transfer failed: {source}")]
    Body {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ForwardError {
    /// Status returned to the client when forwarding fails.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoRoute { .. } => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidUpstream { .. } | Self::Upstream { .. } | Self::Body { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Short machine-readable marker written to the completion log entry.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::NoRoute { .. } => "no_route",
            Self::Timeout(_) => "timeout",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::InvalidUpstream { .. } => "invalid_upstream",
            Self::Upstream { .. } => "upstream_error",
            Self::Body { .. } => "body_error",
        }
    }
}

/// Raised by an interceptor's before-phase to stop a request from being
/// forwarded. The status and reason become the client response.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct InterceptError {
    pub status: StatusCode,
    pub reason: String,
}

impl InterceptError {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = ForwardError::Timeout(Duration::from_millis(250));
        assert_eq!(err.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.marker(), "timeout");
        assert_eq!(err.to_string(), "upstream timed out after 250ms");
    }

    #[test]
    fn missing_route_maps_to_not_found() {
        let err = ForwardError::NoRoute {
            method: "GET".into(),
            path: "/nowhere".into(),
        };
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn oversized_body_maps_to_payload_too_large() {
        let err = ForwardError::PayloadTooLarge { limit: 16 };
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.marker(), "payload_too_large");
        assert_eq!(err.to_string(), "request body exceeds 16 bytes");
    }

    #[test]
    fn upstream_failure_maps_to_bad_gateway() {
        let err = ForwardError::Upstream {
            source: "connection refused".into(),
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.marker(), "upstream_error");
    }

    #[test]
    fn validation_errors_are_listed_one_per_line() {
        let err = GatewayError::ConfigValidation {
            errors: vec![
                ValidationError {
                    route: "/a".into(),
                    field: "path".into(),
                    message: "duplicate route path".into(),
                    suggestion: None,
                },
                ValidationError {
                    route: "b".into(),
                    field: "path".into(),
                    message: "path must start with '/'".into(),
                    suggestion: Some("did you mean '/b'?".into()),
                },
            ],
        };
        let text = err.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("(did you mean '/b'?)"));
    }
}
