//! Error translation and the JSON error envelope.
//!
//! # Responsibilities
//! - Map every `GatewayError` to an HTTP status and client message
//! - Build the envelope `{timestamp, status, error, message, path}`
//! - Emit one log record per failure at a category-appropriate level
//! - Turn panics inside the pipeline into the same envelope
//!
//! # Design Decisions
//! - Unclassified failures return a fixed message; detail goes to the log only
//! - Authentication and other client failures log at `info`, server-side at `warn`/`error`

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::observability::metrics;

/// Message returned for every unclassified failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "an internal server error occurred";

/// Message returned when no snapshot of the registry exists yet.
pub const REGISTRY_UNAVAILABLE_MESSAGE: &str = "service registry is temporarily unavailable";

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// ISO-8601 / RFC 3339, UTC.
    pub timestamp: String,
    pub status: u16,
    /// Canonical reason phrase for `status`.
    pub error: String,
    pub message: String,
    pub path: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::at(Utc::now(), status, message, path)
    }

    fn at(
        now: DateTime<Utc>,
        status: StatusCode,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            status: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Translate a failure into its status and envelope, logging it once.
pub fn translate(err: &GatewayError, path: &str) -> (StatusCode, ErrorEnvelope) {
    let (status, message) = match err {
        GatewayError::MissingAuthorization => {
            tracing::info!(path = %path, "Rejected request without bearer token");
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        GatewayError::Auth(auth) => {
            tracing::info!(path = %path, kind = auth.kind(), "Rejected request with invalid token");
            (StatusCode::UNAUTHORIZED, auth.message())
        }
        GatewayError::Http { status, message } => {
            log_by_status(*status, path, message, None, "Request failed");
            (*status, message.clone())
        }
        GatewayError::Upstream {
            status,
            reason,
            cause,
        } => {
            log_by_status(*status, path, reason, cause.as_deref(), "Upstream failure");
            (*status, reason.clone())
        }
        GatewayError::NoRoute { .. } => {
            tracing::info!(path = %path, "No route matched");
            (StatusCode::NOT_FOUND, err.to_string())
        }
        GatewayError::RegistryUnavailable(detail) => {
            tracing::warn!(path = %path, error = %detail, "No registry snapshot available");
            (StatusCode::SERVICE_UNAVAILABLE, REGISTRY_UNAVAILABLE_MESSAGE.to_string())
        }
        GatewayError::Internal(detail) => {
            tracing::error!(path = %path, error = %detail, "Unhandled error while processing request");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE.to_string())
        }
    };

    (status, ErrorEnvelope::new(status, message, path))
}

fn log_by_status(status: StatusCode, path: &str, message: &str, cause: Option<&str>, what: &str) {
    if status.is_server_error() {
        tracing::warn!(path = %path, status = status.as_u16(), message = %message, cause, "{}", what);
    } else {
        tracing::info!(path = %path, status = status.as_u16(), message = %message, cause, "{}", what);
    }
}

/// Build the complete JSON error response for a failure.
pub fn error_response(err: &GatewayError, path: &str) -> Response {
    let (status, envelope) = translate(err, path);
    metrics::record_error(status.as_u16());
    (status, Json(envelope)).into_response()
}

/// Middleware that converts a panic further down the stack into a 500 envelope.
pub async fn catch_panic(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => error_response(&GatewayError::Internal(panic_message(&*payload)), &path),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use chrono::TimeZone;

    #[test]
    fn test_auth_failures_are_401_with_verifier_message() {
        let (status, env) = translate(&GatewayError::Auth(AuthError::Expired), "/api/orders/1");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(env.status, 401);
        assert_eq!(env.error, "Unauthorized");
        assert_eq!(env.message, AuthError::Expired.to_string());
        assert_eq!(env.path, "/api/orders/1");
    }

    #[test]
    fn test_missing_header_message() {
        let (status, env) = translate(&GatewayError::MissingAuthorization, "/api/x");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(env.message, "missing or malformed authorization header");
    }

    #[test]
    fn test_explicit_status_is_carried() {
        let err = GatewayError::http(StatusCode::CONFLICT, "already exists");
        let (status, env) = translate(&err, "/api/users");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(env.error, "Conflict");
        assert_eq!(env.message, "already exists");
    }

    #[test]
    fn test_upstream_reason_is_carried() {
        let err = GatewayError::upstream(StatusCode::SERVICE_UNAVAILABLE, "service unavailable");
        let (status, env) = translate(&err, "/api/orders");
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(env.message, "service unavailable");
    }

    #[test]
    fn test_internal_detail_never_leaks() {
        let err = GatewayError::Internal("db password=hunter2".to_string());
        let (status, env) = translate(&err, "/api/orders");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(env.message, INTERNAL_ERROR_MESSAGE);
        assert!(!serde_json::to_string(&env).unwrap().contains("hunter2"));
    }

    #[test]
    fn test_envelope_has_all_fields() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let env = ErrorEnvelope::at(now, StatusCode::NOT_FOUND, "gone", "/api/a");
        let value = serde_json::to_value(&env).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        assert_eq!(obj["timestamp"], "2025-01-02T03:04:05.000Z");
        assert_eq!(obj["status"], 404);
        assert_eq!(obj["error"], "Not Found");
        assert_eq!(obj["message"], "gone");
        assert_eq!(obj["path"], "/api/a");
    }

    #[test]
    fn test_error_response_is_json() {
        let response = error_response(&GatewayError::MissingAuthorization, "/api/a");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }
}
