//! Token verification failures.

use thiserror::Error;

/// Why a bearer token was refused.
///
/// The `Display` text is the message returned to clients, so every variant
/// renders a distinct, stable string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid JWT input: token is empty")]
    EmptyToken,

    #[error("malformed JWT token")]
    Malformed,

    #[error("invalid JWT signature")]
    BadSignature,

    #[error("expired JWT token")]
    Expired,

    #[error("unsupported JWT token")]
    UnsupportedAlgorithm,

    /// Verifier-internal failure; the underlying message is kept for diagnostics.
    #[error("{0}")]
    Unknown(String),
}

impl AuthError {
    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::EmptyToken => "empty_token",
            AuthError::Malformed => "malformed",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "expired",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::Unknown(_) => "unknown",
        }
    }

    /// Client-facing message for this failure.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Failure to build a verifier from configuration.
#[derive(Debug, Error)]
pub enum VerifierInitError {
    #[error("JWT secret is empty")]
    EmptySecret,

    #[error("JWT secret is not valid base64: {0}")]
    SecretEncoding(#[from] base64::DecodeError),

    #[error("no signing algorithms configured")]
    NoAlgorithms,

    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),
}
