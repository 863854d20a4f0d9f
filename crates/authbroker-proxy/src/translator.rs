//! Response Translator
//!
//! Maps a raw broker response envelope onto a [`NormalizedResult`].

use authbroker_core::{
    DelegationError, Envelope, NormalizedResult, ResponseEnvelope, Result, TokenResult,
};
use tracing::{debug, warn};

/// Interpret the broker's response.
///
/// - no envelope: `Err(MissingResponseEnvelope)`, a broker contract violation
/// - non-empty error message: `Failed(BrokerReported)` with code and message
/// - initial-request marker: `NeedsInteractive`
/// - otherwise: `Success` with a bearer token
pub fn translate(envelope: Option<&Envelope>) -> Result<NormalizedResult> {
    let envelope = envelope.ok_or(DelegationError::MissingResponseEnvelope)?;
    Ok(translate_response(ResponseEnvelope::from_envelope(envelope)))
}

/// Interpret an already-parsed response
pub fn translate_response(response: ResponseEnvelope) -> NormalizedResult {
    if let Some(message) = response.reported_error() {
        let err = DelegationError::BrokerReported {
            code: response.error_code.unwrap_or(0),
            message: message.to_string(),
        };
        warn!(error = %err, "Broker reported an error");
        return NormalizedResult::from(err);
    }

    if response.is_initial_request {
        debug!("Broker requires an interactive flow");
        return NormalizedResult::NeedsInteractive;
    }

    let access_token = response.raw_token.unwrap_or_else(|| {
        warn!("Broker response carries neither an error nor a token");
        String::new()
    });

    NormalizedResult::Success(TokenResult {
        access_token,
        token_type: response.token_type,
        expires_on: response.expiry,
        user_info: response.user_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use authbroker_core::envelope::keys;
    use authbroker_core::FailureKind;
    use chrono::{DateTime, Utc};

    #[test]
    fn test_missing_envelope_is_fatal() {
        assert!(matches!(
            translate(None),
            Err(DelegationError::MissingResponseEnvelope)
        ));
    }

    #[test]
    fn test_reported_error() {
        let mut envelope = Envelope::new();
        envelope.put_int(keys::ERROR_CODE, 8);
        envelope.put_str(keys::ERROR_MESSAGE, "invalid_grant");
        envelope.put_str(keys::AUTH_TOKEN, "ignored");

        let result = translate(Some(&envelope)).unwrap();
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::BrokerReported);
        assert_eq!(failure.code, Some(8));
        assert_eq!(failure.message.as_deref(), Some("invalid_grant"));
    }

    #[test]
    fn test_error_wins_over_initial_request() {
        let mut envelope = Envelope::new();
        envelope.put_str(keys::ERROR_MESSAGE, "interaction_required");
        envelope.put_bool(keys::INITIAL_REQUEST, true);

        let result = translate(Some(&envelope)).unwrap();
        assert_eq!(result.failure_kind(), Some(FailureKind::BrokerReported));
    }

    #[test]
    fn test_initial_request_needs_interactive() {
        let mut envelope = Envelope::new();
        envelope.put_bool(keys::INITIAL_REQUEST, false);
        envelope.put_str(keys::AUTH_TOKEN, "ignored");

        // Presence of the marker is what counts, not its value
        assert_eq!(
            translate(Some(&envelope)).unwrap(),
            NormalizedResult::NeedsInteractive
        );
    }

    #[test]
    fn test_success() {
        let mut envelope = Envelope::new();
        envelope.put_str(keys::AUTH_TOKEN, "access-token");
        envelope.put_int(keys::EXPIRY, 1_700_000_000);
        envelope.put_str(keys::USERINFO_USERID, "uid-1");
        envelope.put_str(keys::USERINFO_FAMILY_NAME, "Liddell");

        let result = translate(Some(&envelope)).unwrap();
        let token = result.token().unwrap();
        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_on.timestamp(), 1_700_000_000);

        let user = token.user_info.as_ref().unwrap();
        assert_eq!(user.unique_id.as_deref(), Some("uid-1"));
        assert_eq!(user.family_name.as_deref(), Some("Liddell"));
        assert!(user.given_name.is_none());
    }

    #[test]
    fn test_missing_token_is_empty_success() {
        let mut envelope = Envelope::new();
        envelope.put_int(keys::EXPIRY, 1_700_000_000);

        let result = translate(Some(&envelope)).unwrap();
        let token = result.token().unwrap();
        assert_eq!(token.access_token, "");
        assert_eq!(token.expires_on.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_zero_expiry_is_epoch() {
        let mut envelope = Envelope::new();
        envelope.put_str(keys::AUTH_TOKEN, "t");
        envelope.put_int(keys::EXPIRY, 0);

        let result = translate(Some(&envelope)).unwrap();
        assert_eq!(result.token().unwrap().expires_on, DateTime::<Utc>::UNIX_EPOCH);
    }
}
