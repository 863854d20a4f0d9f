//! Error types for broker delegation

use std::time::Duration;
use thiserror::Error;

use crate::result::FailureKind;

/// Result type alias using DelegationError
pub type Result<T> = std::result::Result<T, DelegationError>;

/// Errors that can occur while delegating to a broker
#[derive(Error, Debug)]
pub enum DelegationError {
    /// Signing metadata of a package could not be read
    #[error("Signing metadata unavailable: {0}")]
    TrustUnavailable(String),

    /// The configured digest algorithm is not available on this host
    #[error("Digest algorithm unavailable: {0}")]
    DigestAlgorithmUnavailable(String),

    /// No broker account matches the request
    #[error("No broker account matches the request")]
    NoAccount,

    /// The broker operation was cancelled
    #[error("Broker operation cancelled")]
    UserCancelled,

    /// The broker authenticator failed
    #[error("Broker authenticator failed: {0}")]
    BrokerError(String),

    /// The broker answered with an explicit error
    #[error("Broker reported error {code}: {message}")]
    BrokerReported { code: i32, message: String },

    /// The broker did not answer in time
    #[error("Broker did not respond within {0:?}")]
    Timeout(Duration),

    /// The broker completed without a response envelope
    #[error("Broker returned no response envelope")]
    MissingResponseEnvelope,

    /// The broker signature could not be verified
    #[error("Broker signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    /// The broker package is not installed
    #[error("Broker package is not installed: {0}")]
    MissingBrokerPackage(String),

    /// A blocking broker call was issued from the UI thread
    #[error("Calling the broker from the UI thread can lead to deadlock")]
    BlockingCallOnUiThread,

    /// The delegation request is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The proxy configuration is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DelegationError {
    /// The failure kind reported to callers, if this error has one.
    ///
    /// Request and configuration errors are local defects and map to `None`.
    pub fn kind(&self) -> Option<FailureKind> {
        let kind = match self {
            DelegationError::TrustUnavailable(_) => FailureKind::TrustUnavailable,
            DelegationError::DigestAlgorithmUnavailable(_) => {
                FailureKind::DigestAlgorithmUnavailable
            }
            DelegationError::NoAccount => FailureKind::NoAccount,
            DelegationError::UserCancelled => FailureKind::UserCancelled,
            DelegationError::BrokerError(_) => FailureKind::BrokerError,
            DelegationError::BrokerReported { .. } => FailureKind::BrokerReported,
            DelegationError::Timeout(_) => FailureKind::Timeout,
            DelegationError::MissingResponseEnvelope => FailureKind::MissingResponseEnvelope,
            DelegationError::SignatureVerificationFailed(_) => {
                FailureKind::SignatureVerificationFailed
            }
            DelegationError::MissingBrokerPackage(_) => FailureKind::MissingBrokerPackage,
            DelegationError::BlockingCallOnUiThread
            | DelegationError::InvalidRequest(_)
            | DelegationError::InvalidConfig(_) => return None,
        };
        Some(kind)
    }
}

impl From<serde_json::Error> for DelegationError {
    fn from(err: serde_json::Error) -> Self {
        DelegationError::InvalidConfig(err.to_string())
    }
}

impl From<url::ParseError> for DelegationError {
    fn from(err: url::ParseError) -> Self {
        DelegationError::InvalidRequest(format!("authority: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DelegationError::NoAccount.kind(), Some(FailureKind::NoAccount));
        assert_eq!(
            DelegationError::Timeout(Duration::from_secs(10)).kind(),
            Some(FailureKind::Timeout)
        );
        assert_eq!(
            DelegationError::BrokerReported {
                code: 7,
                message: "invalid_grant".into()
            }
            .kind(),
            Some(FailureKind::BrokerReported)
        );
        assert_eq!(DelegationError::InvalidRequest("x".into()).kind(), None);
    }
}
