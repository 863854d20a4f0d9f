//! Broker Request Channel
//!
//! Serializes a [`DelegationRequest`] into an envelope, sends it to the
//! broker and waits a bounded time for the answer. Each call owns its own
//! envelope and pending broker future; nothing is shared between calls.

use authbroker_core::envelope::keys;
use authbroker_core::{
    DelegationError, DelegationRequest, Envelope, FailureKind, NormalizedResult, Result,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::accounts::AccountResolver;
use crate::config::ProxyConfig;
use crate::error::BrokerCallError;
use crate::host::{BrokerIntent, HostEnvironment};
use crate::translator;
use crate::trust::SignatureVerifier;

/// Upper bound on a single broker call
pub const BROKER_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// First target platform version on which a UI-thread call is fatal
pub const UI_THREAD_ENFORCED_SINCE: u32 = 8;

/// Sends delegation requests to the broker
#[derive(Clone)]
pub struct BrokerChannel {
    config: Arc<ProxyConfig>,
    verifier: SignatureVerifier,
    resolver: AccountResolver,
    host: HostEnvironment,
}

impl BrokerChannel {
    pub fn new(
        config: Arc<ProxyConfig>,
        verifier: SignatureVerifier,
        resolver: AccountResolver,
        host: HostEnvironment,
    ) -> Self {
        Self {
            config,
            verifier,
            resolver,
            host,
        }
    }

    /// Refuse to block the UI thread.
    ///
    /// Fatal for applications targeting [`UI_THREAD_ENFORCED_SINCE`] or
    /// later; older targets only get a logged warning.
    pub fn ensure_not_on_ui_thread(&self) -> Result<()> {
        if !self.host.thread.is_ui_thread() {
            return Ok(());
        }

        let err = DelegationError::BlockingCallOnUiThread;
        error!(error = %err, "Broker call issued from the UI thread");
        if self.host.thread.target_platform_version() >= UI_THREAD_ENFORCED_SINCE {
            return Err(err);
        }
        Ok(())
    }

    /// Redirect URI the broker answers to:
    /// `<scheme>://<package>/<signature>`, both segments URL-encoded.
    ///
    /// Empty when the caller's signature cannot be read.
    pub fn redirect_uri(&self) -> String {
        let package = self.host.packages.package_name();
        match self.verifier.current_signature(&package) {
            Some(signature) => format!(
                "{}://{}/{}",
                self.config.redirect_scheme,
                urlencoding::encode(&package),
                urlencoding::encode(signature.as_str())
            ),
            None => {
                info!(package = %package, "Calling app's signature is unavailable");
                String::new()
            }
        }
    }

    /// Serialize `request` into the broker envelope
    pub fn build_envelope(&self, request: &DelegationRequest) -> Envelope {
        let mut envelope = Envelope::new();
        envelope.put_int(keys::REQUEST_ID, i64::from(request.request_id));
        envelope.put_str(keys::AUTHORITY, request.authority.as_str());
        envelope.put_int(keys::JSON, 1);
        envelope.put_str(keys::RESOURCE, request.resource());
        let mut redirect = self.redirect_uri();
        if redirect.is_empty() {
            redirect = request.redirect_uri.clone().unwrap_or_default();
        }
        envelope.put_str(keys::REDIRECT, redirect);
        envelope.put_str(keys::CLIENT_ID, request.client_id.as_str());
        envelope.put_str(keys::PROTOCOL_VERSION, request.protocol_version.as_str());
        envelope.put_opt_str(keys::EXTRA_QUERY_PARAM, request.extra_query_params.as_deref());
        if let Some(correlation_id) = request.correlation_id {
            envelope.put_str(keys::CORRELATION_ID, correlation_id.to_string());
        }

        let username = request.broker_username();
        envelope.put_opt_str(keys::LOGIN_HINT, username);
        envelope.put_opt_str(keys::ACCOUNT_NAME, username);
        envelope
    }

    /// Obtain a token silently from the broker.
    ///
    /// Expected outcomes (no account, cancellation, broker failures, timeout)
    /// come back as [`NormalizedResult::Failed`]. `Err` is reserved for
    /// contract violations: a UI-thread call on an enforcing platform, or a
    /// broker that completes without a response envelope.
    pub async fn acquire_token_in_background(
        &self,
        request: &DelegationRequest,
    ) -> Result<NormalizedResult> {
        self.ensure_not_on_ui_thread()?;

        let target = match self.resolver.resolve_target(request).await {
            Ok(Some(target)) => target,
            Ok(None) => {
                debug!(request_id = request.request_id, "Target account is not found");
                return Ok(NormalizedResult::from(DelegationError::NoAccount));
            }
            Err(e) => {
                warn!(request_id = request.request_id, error = %e, "Target account lookup failed");
                return Ok(NormalizedResult::from(e));
            }
        };

        let envelope = self.build_envelope(request);
        debug!(
            request_id = request.request_id,
            account = ?target.display_name,
            "Requesting token from broker"
        );

        let call = self
            .host
            .accounts
            .get_auth_token(&target, &self.config.token_type, &envelope);

        let outcome = match timeout(BROKER_CALL_TIMEOUT, call).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = DelegationError::Timeout(BROKER_CALL_TIMEOUT);
                warn!(request_id = request.request_id, error = %err, "Broker call timed out");
                return Ok(NormalizedResult::from(err));
            }
        };

        match outcome {
            Ok(response) => {
                debug!(request_id = request.request_id, "Received result from broker");
                translator::translate(response.as_ref())
            }
            Err(BrokerCallError::Cancelled) => {
                warn!(request_id = request.request_id, "Broker operation cancelled");
                Ok(NormalizedResult::from(DelegationError::UserCancelled))
            }
            Err(e) => {
                warn!(request_id = request.request_id, error = %e, "Broker authenticator failed");
                Ok(NormalizedResult::failed(FailureKind::BrokerError, e.to_string()))
            }
        }
    }

    /// Ask the broker for the handle that starts its interactive flow.
    ///
    /// The returned intent is tagged as a broker request. Every failure is
    /// logged and reads as "no intent available".
    pub async fn intent_for_interactive_flow(
        &self,
        request: &DelegationRequest,
    ) -> Option<BrokerIntent> {
        let envelope = self.build_envelope(request);
        let call = self.host.accounts.add_account(
            &self.config.account_type,
            &self.config.token_type,
            &envelope,
        );

        let intent = match timeout(BROKER_CALL_TIMEOUT, call).await {
            Ok(Ok(intent)) => intent,
            Ok(Err(BrokerCallError::Cancelled)) => {
                warn!(request_id = request.request_id, "Broker add-account cancelled");
                None
            }
            Ok(Err(e)) => {
                warn!(request_id = request.request_id, error = %e, "Authenticator cancels the request");
                None
            }
            Err(_) => {
                warn!(request_id = request.request_id, "Broker add-account timed out");
                None
            }
        };

        intent.map(|mut intent| {
            intent.tag_broker_request();
            intent
        })
    }
}
