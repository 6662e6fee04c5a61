//! Gateway failure taxonomy.
//!
//! Every failure that can reach a client is one of these variants. The
//! translator in `http::response` matches them exhaustively, so a new variant
//! cannot be added without deciding its status and message.

use axum::http::StatusCode;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Authorization header absent or not `Bearer <token>`.
    #[error("missing or malformed authorization header")]
    MissingAuthorization,

    /// Token present but refused by the verifier.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Application-raised failure with an explicit status.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// Routing or transport failure reported by the forwarding layer.
    /// `cause` goes to the log only.
    #[error("{reason}")]
    Upstream {
        status: StatusCode,
        reason: String,
        cause: Option<String>,
    },

    /// No live service owns the requested prefix.
    #[error("no route for path {path}")]
    NoRoute { path: String },

    /// The registry has never produced a snapshot.
    #[error("service registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Anything else. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        GatewayError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn upstream(status: StatusCode, reason: impl Into<String>) -> Self {
        GatewayError::Upstream {
            status,
            reason: reason.into(),
            cause: None,
        }
    }

    pub fn upstream_with_cause(
        status: StatusCode,
        reason: impl Into<String>,
        cause: impl std::fmt::Display,
    ) -> Self {
        GatewayError::Upstream {
            status,
            reason: reason.into(),
            cause: Some(cause.to_string()),
        }
    }
}
