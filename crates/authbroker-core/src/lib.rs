//! # Authbroker Core
//!
//! Core types for delegating security-token requests to a trusted,
//! system-level broker process.
//!
//! ## Key Concepts
//!
//! - **Signer fingerprint**: base64 digest over a package's signing certificate,
//!   used as its trust identity
//! - **Trusted authority**: a broker package paired with its expected fingerprint
//! - **Envelope**: the flat key/value payload exchanged with the broker process
//! - **Normalized result**: success, "needs interactive flow", or a typed failure
//!
//! The decision and protocol logic lives in `authbroker-proxy`; this crate only
//! holds the data model shared across the process boundary.

pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod request;
pub mod response;
pub mod result;
pub mod types;

pub use envelope::{Envelope, EnvelopeValue};
pub use error::{DelegationError, Result};
pub use fingerprint::DigestAlgorithm;
pub use request::{DelegationRequest, DelegationRequestBuilder};
pub use response::ResponseEnvelope;
pub use result::{Failure, FailureKind, NormalizedResult, TokenResult};
pub use types::{
    AccountIdentity, AuthenticatorDescription, AuthorityRole, SignerFingerprint, TrustedAuthority,
    UserInfo,
};

/// Library version, sent to the broker as the protocol version by default
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
