//! Bearer token verification.
//!
//! # Responsibilities
//! - Reject empty tokens before any parsing
//! - Check token structure and the declared algorithm
//! - Verify the HMAC signature, then the expiry
//!
//! # Design Decisions
//! - The key is derived once in the constructor; a `JwtVerifier` cannot exist without it
//! - The header is inspected before `jsonwebtoken` runs so that unsigned (`none`)
//!   tokens always fail as `UnsupportedAlgorithm`
//! - Signature is checked before claims, so expiry logic only sees authentic tokens
//! - Token text is never logged

use std::collections::HashSet;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::error::{AuthError, VerifierInitError};
use crate::config::JwtConfig;

/// Claims of a token that passed verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Every other claim, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Anything that can turn a bearer string into verified claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError>;
}

/// Map a configured algorithm name onto the HMAC algorithms we accept.
pub fn parse_algorithm(name: &str) -> Option<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

/// HMAC JWT verifier holding one immutable key.
pub struct JwtVerifier {
    key: DecodingKey,
    accepted: HashSet<Algorithm>,
    leeway_secs: u64,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("accepted", &self.accepted)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

impl JwtVerifier {
    /// Build a verifier from configuration, decoding the base64 secret.
    pub fn new(config: &JwtConfig) -> Result<Self, VerifierInitError> {
        let secret = config.secret.trim();
        if secret.is_empty() {
            return Err(VerifierInitError::EmptySecret);
        }
        let secret = STANDARD.decode(secret)?;

        if config.algorithms.is_empty() {
            return Err(VerifierInitError::NoAlgorithms);
        }
        let accepted = config
            .algorithms
            .iter()
            .map(|name| {
                parse_algorithm(name)
                    .ok_or_else(|| VerifierInitError::UnsupportedAlgorithm(name.clone()))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        tracing::info!(
            algorithms = ?accepted,
            leeway_secs = config.leeway_secs,
            "JWT verifier initialized"
        );

        Ok(Self {
            key: DecodingKey::from_secret(&secret),
            accepted,
            leeway_secs: config.leeway_secs,
        })
    }

    /// Structural pre-check: three segments and a decodable JSON header.
    /// Returns the declared algorithm if it is one we accept.
    fn declared_algorithm(&self, token: &str) -> Result<Algorithm, AuthError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 || segments[0].is_empty() || segments[1].is_empty() {
            return Err(AuthError::Malformed);
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(segments[0].trim_end_matches('='))
            .map_err(|_| AuthError::Malformed)?;
        let header: Value = serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Malformed)?;
        let header = header.as_object().ok_or(AuthError::Malformed)?;

        let alg = match header.get("alg") {
            None | Some(Value::Null) => return Err(AuthError::UnsupportedAlgorithm),
            Some(Value::String(alg)) => alg,
            Some(_) => return Err(AuthError::Malformed),
        };

        parse_algorithm(alg)
            .filter(|alg| self.accepted.contains(alg))
            .ok_or(AuthError::UnsupportedAlgorithm)
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::EmptyToken);
        }

        let alg = self.declared_algorithm(token).inspect_err(|e| {
            tracing::trace!(kind = e.kind(), "JWT rejected before signature check");
        })?;

        let mut validation = Validation::new(alg);
        validation.algorithms = self.accepted.iter().copied().collect();
        validation.leeway = self.leeway_secs;
        validation.validate_exp = true;

        jsonwebtoken::decode::<VerifiedClaims>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let mapped = map_jwt_error(&e);
                tracing::trace!(kind = mapped.kind(), error = %e, "JWT verification failed");
                mapped
            })
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => AuthError::Malformed,
        _ => AuthError::Unknown(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::http::response::translate;
    use crate::observability::logging::capture::RecordCounter;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    // "iamtestsecretkey1234567890abcdef"
    const SECRET: &str = "aWFtdGVzdHNlY3JldGtleTEyMzQ1Njc4OTBhYmNkZWY=";
    // "iamanothertestsecretkey1234567890abcdef"
    const OTHER_SECRET: &str = "aWFtYW5vdGhlcnRlc3RzZWNyZXRrZXkxMjM0NTY3ODkwYWJjZGVm";

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(&JwtConfig {
            secret: SECRET.to_string(),
            ..JwtConfig::default()
        })
        .unwrap()
    }

    fn sign(secret_b64: &str, alg: Algorithm, exp: u64) -> String {
        let secret = STANDARD.decode(secret_b64).unwrap();
        encode(
            &Header::new(alg),
            &json!({ "sub": "test-user", "iat": now(), "exp": exp }),
            &EncodingKey::from_secret(&secret),
        )
        .unwrap()
    }

    fn unsigned(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.", header, payload)
    }

    #[test]
    fn test_valid_token() {
        let claims = verifier().verify(&sign(SECRET, Algorithm::HS256, now() + 60)).unwrap();
        assert_eq!(claims.sub.as_deref(), Some("test-user"));
        assert!(claims.iat.is_some());
    }

    #[test]
    fn test_empty_and_blank_tokens() {
        assert_eq!(verifier().verify(""), Err(AuthError::EmptyToken));
        assert_eq!(verifier().verify("   "), Err(AuthError::EmptyToken));
    }

    #[test]
    fn test_malformed_token() {
        let v = verifier();
        assert_eq!(v.verify("I.Am.Not.A.JWT.Token.Type.Token."), Err(AuthError::Malformed));
        assert_eq!(v.verify("not-a-jwt"), Err(AuthError::Malformed));
        assert_eq!(v.verify("!!!.???.***"), Err(AuthError::Malformed));
    }

    #[test]
    fn test_wrong_key_is_bad_signature() {
        let token = sign(OTHER_SECRET, Algorithm::HS256, now() + 60);
        assert_eq!(verifier().verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_expired_token() {
        let token = sign(SECRET, Algorithm::HS256, now() - 3600);
        assert_eq!(verifier().verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_signature_checked_before_expiry() {
        let token = sign(OTHER_SECRET, Algorithm::HS256, now() - 3600);
        assert_eq!(verifier().verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_unsigned_token_is_unsupported() {
        let token = unsigned(json!({ "sub": "attacker", "exp": now() + 60 }));
        assert_eq!(verifier().verify(&token), Err(AuthError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_unaccepted_algorithm_is_unsupported() {
        let token = sign(SECRET, Algorithm::HS512, now() + 60);
        assert_eq!(verifier().verify(&token), Err(AuthError::UnsupportedAlgorithm));
    }

    #[test]
    fn test_missing_expiry_is_malformed() {
        let secret = STANDARD.decode(SECRET).unwrap();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &json!({ "sub": "test-user" }),
            &EncodingKey::from_secret(&secret),
        )
        .unwrap();
        assert_eq!(verifier().verify(&token), Err(AuthError::Malformed));
    }

    #[test]
    fn test_constructor_rejects_bad_config() {
        let bad_secret = JwtConfig {
            secret: "%%%".to_string(),
            ..JwtConfig::default()
        };
        assert!(matches!(
            JwtVerifier::new(&bad_secret),
            Err(VerifierInitError::SecretEncoding(_))
        ));

        let bad_alg = JwtConfig {
            secret: SECRET.to_string(),
            algorithms: vec!["none".to_string()],
            ..JwtConfig::default()
        };
        assert!(matches!(
            JwtVerifier::new(&bad_alg),
            Err(VerifierInitError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_rejection_logged_once_by_translator() {
        let verifier = verifier();
        let token = sign(OTHER_SECRET, Algorithm::HS256, now() + 3600);
        let counter = RecordCounter::default();
        let _guard = tracing::subscriber::set_default(counter.subscriber());

        let err = verifier.verify(&token).unwrap_err();
        assert_eq!(err, AuthError::BadSignature);
        translate(&GatewayError::Auth(err), "/api/orders/1");

        assert_eq!(counter.count(), 1);
    }
}
