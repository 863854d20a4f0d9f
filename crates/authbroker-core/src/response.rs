//! Typed view over a broker response envelope

use chrono::{DateTime, Utc};

use crate::envelope::{keys, Envelope};
use crate::types::UserInfo;

/// Token type reported for every broker-issued token
pub const BEARER: &str = "Bearer";

/// Fields the broker may return for a token request
///
/// Produced from one response envelope, consumed once by the translator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
    pub is_initial_request: bool,
    pub raw_token: Option<String>,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub user_info: Option<UserInfo>,
}

impl ResponseEnvelope {
    /// Read a response envelope.
    ///
    /// Missing fields take their neutral value: no error, no token, an expiry
    /// at the Unix epoch and no user info.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let user_info = UserInfo::from_envelope(envelope);
        Self {
            error_code: envelope
                .get_int(keys::ERROR_CODE)
                .and_then(|code| i32::try_from(code).ok()),
            error_message: envelope.get_str(keys::ERROR_MESSAGE).map(str::to_string),
            is_initial_request: envelope.contains_key(keys::INITIAL_REQUEST),
            raw_token: envelope.get_str(keys::AUTH_TOKEN).map(str::to_string),
            token_type: BEARER.to_string(),
            expiry: expiry_from_epoch_seconds(envelope.get_int(keys::EXPIRY).unwrap_or(0)),
            user_info: (!user_info.is_empty()).then_some(user_info),
        }
    }

    /// Error message, if the broker sent a non-empty one
    pub fn reported_error(&self) -> Option<&str> {
        self.error_message
            .as_deref()
            .filter(|message| !message.is_empty())
    }
}

/// Convert a whole-second offset from the Unix epoch into an instant.
///
/// Values beyond the representable range clamp to the nearest bound.
pub fn expiry_from_epoch_seconds(seconds: i64) -> DateTime<Utc> {
    let millis = seconds.saturating_mul(1000);
    DateTime::from_timestamp_millis(millis).unwrap_or(if millis < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
