//! Normalized outcome of a delegated token request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DelegationError;
use crate::types::UserInfo;

/// Failure kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TrustUnavailable,
    DigestAlgorithmUnavailable,
    NoAccount,
    UserCancelled,
    /// The authenticator itself failed
    BrokerError,
    /// The broker answered with an explicit error code/message
    BrokerReported,
    Timeout,
    /// Broker contract violation
    MissingResponseEnvelope,
    SignatureVerificationFailed,
    MissingBrokerPackage,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::TrustUnavailable => "trust_unavailable",
            FailureKind::DigestAlgorithmUnavailable => "digest_algorithm_unavailable",
            FailureKind::NoAccount => "no_account",
            FailureKind::UserCancelled => "user_cancelled",
            FailureKind::BrokerError => "broker_error",
            FailureKind::BrokerReported => "broker_reported",
            FailureKind::Timeout => "timeout",
            FailureKind::MissingResponseEnvelope => "missing_response_envelope",
            FailureKind::SignatureVerificationFailed => "signature_verification_failed",
            FailureKind::MissingBrokerPackage => "missing_broker_package",
        };
        f.write_str(name)
    }
}

/// A typed failure with optional broker-supplied detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,

    /// Error code reported by the broker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Failure {
    pub fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            code: None,
            message: None,
        }
    }

    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(code) = self.code {
            write!(f, " ({})", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl From<&DelegationError> for Failure {
    fn from(err: &DelegationError) -> Self {
        match err {
            DelegationError::BrokerReported { code, message } => {
                Failure::new(FailureKind::BrokerReported)
                    .with_code(*code)
                    .with_message(message.clone())
            }
            _ => Failure::new(err.kind().unwrap_or(FailureKind::BrokerError))
                .with_message(err.to_string()),
        }
    }
}

/// A token obtained silently from the broker
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

impl fmt::Debug for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResult")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("expires_on", &self.expires_on)
            .field("user_info", &self.user_info)
            .finish()
    }
}

/// Outcome of a delegated token request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NormalizedResult {
    Success(TokenResult),
    /// No silent result exists; the caller must drive an interactive flow
    NeedsInteractive,
    Failed(Failure),
}

impl NormalizedResult {
    /// Shorthand for a failure carrying a message
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        NormalizedResult::Failed(Failure::new(kind).with_message(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NormalizedResult::Success(_))
    }

    pub fn token(&self) -> Option<&TokenResult> {
        match self {
            NormalizedResult::Success(token) => Some(token),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            NormalizedResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(|failure| failure.kind)
    }
}

impl From<DelegationError> for NormalizedResult {
    fn from(err: DelegationError) -> Self {
        NormalizedResult::Failed(Failure::from(&err))
    }
}
