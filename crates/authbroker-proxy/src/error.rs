//! Errors raised at the host boundary
//!
//! The host platform reports package and broker-call failures with these
//! types; the proxy folds them into [`DelegationError`] before they reach
//! callers.

use authbroker_core::DelegationError;
use thiserror::Error;

pub use authbroker_core::Result;

/// Failure reading package metadata from the host
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The package is not installed
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    /// The package exists but its signing metadata is unreadable
    #[error("Malformed package metadata: {0}")]
    MalformedPackage(String),

    /// Any other host failure
    #[error("Host error: {0}")]
    Other(String),
}

/// Failure of a call into the broker process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerCallError {
    /// The broker or the user cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// The authenticator raised an error
    #[error("Authenticator error: {0}")]
    Authenticator(String),

    /// The authenticator failed on network or file I/O
    #[error("Authenticator I/O error: {0}")]
    Io(String),
}

impl From<BrokerCallError> for DelegationError {
    fn from(err: BrokerCallError) -> Self {
        match err {
            BrokerCallError::Cancelled => DelegationError::UserCancelled,
            BrokerCallError::Authenticator(message) | BrokerCallError::Io(message) => {
                DelegationError::BrokerError(message)
            }
        }
    }
}

impl HostError {
    /// Map a failure to read a package's signer for trust evaluation.
    ///
    /// A missing package is reported as such; anything else means the
    /// signature could not be verified.
    pub fn into_verification_error(self) -> DelegationError {
        match self {
            HostError::PackageNotFound(package) => DelegationError::MissingBrokerPackage(package),
            other => DelegationError::SignatureVerificationFailed(other.to_string()),
        }
    }

    /// Map a failure to read a package's signer for fingerprint listing
    pub fn into_trust_error(self) -> DelegationError {
        DelegationError::TrustUnavailable(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_call_mapping() {
        assert!(matches!(
            DelegationError::from(BrokerCallError::Cancelled),
            DelegationError::UserCancelled
        ));
        assert!(matches!(
            DelegationError::from(BrokerCallError::Io("disk full".into())),
            DelegationError::BrokerError(message) if message == "disk full"
        ));
    }

    #[test]
    fn test_host_error_mapping() {
        assert!(matches!(
            HostError::PackageNotFound("com.example".into()).into_verification_error(),
            DelegationError::MissingBrokerPackage(package) if package == "com.example"
        ));
        assert!(matches!(
            HostError::MalformedPackage("com.example".into()).into_verification_error(),
            DelegationError::SignatureVerificationFailed(_)
        ));
        assert!(matches!(
            HostError::PackageNotFound("com.example".into()).into_trust_error(),
            DelegationError::TrustUnavailable(_)
        ));
    }
}
