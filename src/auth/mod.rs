//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → gate.rs (header check, token extraction)
//!     → verifier.rs (structure → algorithm → signature → expiry)
//!     → Verified: claims attached, request continues
//!     → Rejected: GatewayError → JSON envelope, pipeline stops
//! ```
//!
//! # Design Decisions
//! - Integrity and expiry only; no claim-based authorization
//! - Verification only; this crate never issues tokens

pub mod error;
pub mod gate;
pub mod verifier;

pub use error::{AuthError, VerifierInitError};
pub use gate::{authenticate, AuthGate};
pub use verifier::{JwtVerifier, TokenVerifier, VerifiedClaims};
