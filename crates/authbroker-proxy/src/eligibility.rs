//! Delegation Eligibility Evaluator
//!
//! Decides, before any broker call, whether a token request should be sent
//! to the broker at all. Every failure here reads as "not eligible": the
//! caller always has a local fallback, so nothing is propagated.

use tracing::{debug, info, warn};

use crate::accounts::AccountResolver;
use crate::config::ProxyConfig;
use crate::host::HostEnvironment;
use crate::trust::SignatureVerifier;
use authbroker_core::Result;
use std::sync::Arc;

/// Evaluates `can_delegate` and `can_use_local_cache`
#[derive(Clone)]
pub struct EligibilityEvaluator {
    config: Arc<ProxyConfig>,
    verifier: SignatureVerifier,
    resolver: AccountResolver,
    host: HostEnvironment,
}

impl EligibilityEvaluator {
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

    /// Whether token requests should be delegated to the broker.
    ///
    /// True only when all of these hold:
    /// 1. the caller holds every required account permission
    /// 2. the caller is not itself one of the trusted brokers
    /// 3. the broker authenticator is signed by its registered fingerprint
    /// 4. the broker has a usable account
    pub async fn can_delegate(&self) -> bool {
        if !self.has_required_permissions() {
            return false;
        }

        let package = self.host.packages.package_name();
        if self.verifier.registry().is_broker_package(&package) {
            debug!(package = %package, "Caller is a broker; not delegating to itself");
            return false;
        }

        match self.verify_authenticator() {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(error = %e, "Broker authenticator verification failed");
                return false;
            }
        }

        self.resolver.check_account("", "").await
    }

    /// Whether the caller may read and write its local token cache.
    ///
    /// True when delegation is off, or when the caller itself is signed with
    /// a trusted broker fingerprint.
    pub async fn can_use_local_cache(&self) -> bool {
        if !self.can_delegate().await {
            debug!("Not using the broker; local cache is available");
            return true;
        }

        let package = self.host.packages.package_name();
        match self.verifier.is_signed_by_trusted_authority(&package) {
            Ok(true) => {
                info!(package = %package, "Broker-signed caller can use local cache");
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!(package = %package, error = %e, "Could not verify caller signature");
                false
            }
        }
    }

    fn has_required_permissions(&self) -> bool {
        let mut granted = true;
        for permission in &self.config.required_permissions {
            if !self.host.packages.has_permission(permission) {
                info!(permission = %permission, "Missing permission required for broker");
                granted = false;
            }
        }
        granted
    }

    /// Whether an authenticator of the broker account type is a trusted,
    /// correctly signed broker.
    ///
    /// Only one authenticator per account type is active at a time, so the
    /// first verified one settles the question.
    fn verify_authenticator(&self) -> Result<bool> {
        for authenticator in self.host.accounts.authenticators() {
            if authenticator.account_type == self.config.account_type
                && self.verifier.is_trusted(&authenticator.package_name)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
