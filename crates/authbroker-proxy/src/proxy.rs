//! Broker Proxy - the entry point used by the token-acquisition layer

use authbroker_core::{DelegationRequest, NormalizedResult, Result, UserInfo};
use std::sync::Arc;
use tracing::info;

use crate::accounts::AccountResolver;
use crate::channel::BrokerChannel;
use crate::config::ProxyConfig;
use crate::eligibility::EligibilityEvaluator;
use crate::host::{BrokerIntent, HostEnvironment};
use crate::trust::{SignatureVerifier, TrustRegistry};

/// Delegates token requests to a trusted broker
///
/// Built once per client from a [`ProxyConfig`] and the host capabilities.
/// The trust registry is frozen at construction; every other piece of state
/// is read fresh from the host on each call.
#[derive(Clone)]
pub struct BrokerProxy {
    config: Arc<ProxyConfig>,
    registry: Arc<TrustRegistry>,
    resolver: AccountResolver,
    eligibility: EligibilityEvaluator,
    channel: BrokerChannel,
}

impl BrokerProxy {
    /// Create a proxy.
    ///
    /// Fails on an invalid configuration or duplicate trusted packages.
    pub fn new(config: ProxyConfig, host: HostEnvironment) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let registry = Arc::new(TrustRegistry::from_config(&config)?);

        let verifier = SignatureVerifier::new(
            registry.clone(),
            host.packages.clone(),
            config.digest.clone(),
        );
        let resolver = AccountResolver::new(config.clone(), registry.clone(), host.clone());
        let eligibility = EligibilityEvaluator::new(
            config.clone(),
            verifier.clone(),
            resolver.clone(),
            host.clone(),
        );
        let channel = BrokerChannel::new(config.clone(), verifier, resolver.clone(), host);

        info!(
            account_type = %config.account_type,
            authorities = registry.authorities().len(),
            "Broker proxy initialized"
        );

        Ok(Self {
            config,
            registry,
            resolver,
            eligibility,
            channel,
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn registry(&self) -> &TrustRegistry {
        &self.registry
    }

    /// Whether token requests should go to the broker
    pub async fn can_delegate(&self) -> bool {
        self.eligibility.can_delegate().await
    }

    /// Whether the caller may use its own token cache
    pub async fn can_use_local_cache(&self) -> bool {
        self.eligibility.can_use_local_cache().await
    }

    /// Whether the broker can serve a user identified by `username` or
    /// `unique_id`; empty strings mean "no hint"
    pub async fn verify_user(&self, username: &str, unique_id: &str) -> bool {
        self.resolver.check_account(username, unique_id).await
    }

    /// Extended user info for every broker account
    pub async fn broker_users(&self) -> Result<Vec<UserInfo>> {
        self.resolver.broker_users().await
    }

    /// Display name of the first broker account
    pub fn current_user(&self) -> Option<String> {
        self.resolver.current_user()
    }

    /// Obtain a token silently; see [`BrokerChannel::acquire_token_in_background`]
    pub async fn acquire_token_in_background(
        &self,
        request: &DelegationRequest,
    ) -> Result<NormalizedResult> {
        self.channel.acquire_token_in_background(request).await
    }

    /// Handle that launches the broker's interactive flow, if any
    pub async fn intent_for_interactive_flow(
        &self,
        request: &DelegationRequest,
    ) -> Option<BrokerIntent> {
        self.channel.intent_for_interactive_flow(request).await
    }

    /// Redirect URI the broker will answer to
    pub fn redirect_uri(&self) -> String {
        self.channel.redirect_uri()
    }
}

impl std::fmt::Debug for BrokerProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerProxy")
            .field("account_type", &self.config.account_type)
            .field("authorities", &self.registry.authorities().len())
            .finish_non_exhaustive()
    }
}
