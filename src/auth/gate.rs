//! Authentication gate applied in front of the proxy handler.
//!
//! # Per-request states
//! ```text
//! AwaitingHeader → HeaderPresent → TokenExtracted → Verified
//!        └──────────────┴────────────────┴──────→ Rejected
//! ```
//!
//! # Design Decisions
//! - Missing or non-`Bearer ` headers are rejected before the verifier is called
//! - Every request is verified independently; nothing is cached
//! - On success the request continues unchanged, with the claims attached as an extension

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::auth::verifier::{TokenVerifier, VerifiedClaims};
use crate::error::GatewayError;
use crate::http::response::error_response;
use crate::observability::metrics;

const BEARER_PREFIX: &str = "Bearer ";

/// Gate that admits only requests carrying a verifiable bearer token.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Run the gate against request headers.
    pub fn admit(&self, headers: &HeaderMap) -> Result<VerifiedClaims, GatewayError> {
        let token = bearer_token(headers).ok_or(GatewayError::MissingAuthorization)?;
        self.verifier.verify(token).map_err(GatewayError::Auth)
    }
}

/// Extract the text after `Bearer ` from the Authorization header.
///
/// The prefix match is case-sensitive. `Bearer ` with nothing after it yields
/// an empty token, which the verifier rejects as empty.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
}

/// Axum middleware wrapping [`AuthGate::admit`].
pub async fn authenticate(
    State(gate): State<AuthGate>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match gate.admit(request.headers()) {
        Ok(claims) => {
            tracing::trace!(subject = ?claims.sub, "Request authenticated");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            if let GatewayError::Auth(auth) = &err {
                metrics::record_auth_failure(auth.kind());
            } else {
                metrics::record_auth_failure("missing_header");
            }
            error_response(&err, request.uri().path())
        }
    }
}
