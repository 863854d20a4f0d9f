//! Proxy configuration
//!
//! Defaults describe the two published work-account brokers. Hosts may
//! override them from JSON or from `AUTHBROKER_*` environment variables.

use authbroker_core::{AuthorityRole, DelegationError, Result, TrustedAuthority};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Package of the single-account (company portal) broker
pub const COMPANY_PORTAL_PACKAGE: &str = "com.microsoft.windowsintune.companyportal";
/// Published signer fingerprint of the company portal broker
pub const COMPANY_PORTAL_SIGNATURE: &str = "1L4Z9FJCgn5c0VLhyAxC5O9LdlE=";
/// Package of the multi-account (authenticator) broker
pub const AUTHENTICATOR_PACKAGE: &str = "com.azure.authenticator";
/// Published signer fingerprint of the authenticator broker
pub const AUTHENTICATOR_SIGNATURE: &str = "ho040S3ffZkmxqtQrSwpTVOn9r0=";

/// Configuration for a [`BrokerProxy`](crate::BrokerProxy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Account type registered by broker authenticators
    #[serde(default = "default_account_type")]
    pub account_type: String,

    /// Token type requested from the broker
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Scheme of the computed broker redirect URI
    #[serde(default = "default_redirect_scheme")]
    pub redirect_scheme: String,

    /// Name of the digest used for signer fingerprints
    #[serde(default = "default_digest")]
    pub digest: String,

    /// Permissions the caller must hold to use the broker
    #[serde(default = "default_permissions")]
    pub required_permissions: Vec<String>,

    /// Brokers this client trusts
    #[serde(default = "default_authorities")]
    pub trusted_authorities: Vec<TrustedAuthority>,
}

fn default_account_type() -> String {
    "com.microsoft.workaccount".to_string()
}

fn default_token_type() -> String {
    "adal.authtoken.type".to_string()
}

fn default_redirect_scheme() -> String {
    "msauth".to_string()
}

fn default_digest() -> String {
    "SHA".to_string()
}

fn default_permissions() -> Vec<String> {
    vec![
        "android.permission.GET_ACCOUNTS".to_string(),
        "android.permission.MANAGE_ACCOUNTS".to_string(),
        "android.permission.USE_CREDENTIALS".to_string(),
    ]
}

fn default_authorities() -> Vec<TrustedAuthority> {
    vec![
        TrustedAuthority::new(
            COMPANY_PORTAL_PACKAGE,
            COMPANY_PORTAL_SIGNATURE,
            AuthorityRole::SingleAccount,
        ),
        TrustedAuthority::new(
            AUTHENTICATOR_PACKAGE,
            AUTHENTICATOR_SIGNATURE,
            AuthorityRole::MultiAccount,
        )
        .with_account_chooser(format!("{}.ui.AccountChooserActivity", AUTHENTICATOR_PACKAGE)),
    ]
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            account_type: default_account_type(),
            token_type: default_token_type(),
            redirect_scheme: default_redirect_scheme(),
            digest: default_digest(),
            required_permissions: default_permissions(),
            trusted_authorities: default_authorities(),
        }
    }
}

impl ProxyConfig {
    /// Parse a JSON configuration; absent fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment.
    ///
    /// - `AUTHBROKER_ACCOUNT_TYPE`
    /// - `AUTHBROKER_TOKEN_TYPE`
    /// - `AUTHBROKER_REDIRECT_SCHEME`
    /// - `AUTHBROKER_DIGEST`
    /// - `AUTHBROKER_TRUSTED_AUTHORITIES` (JSON array of authorities)
    ///
    /// Unset variables keep their defaults. A malformed authority list is an
    /// error rather than a silent fallback to the built-in brokers.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(account_type) = env::var("AUTHBROKER_ACCOUNT_TYPE") {
            config.account_type = account_type;
        }
        if let Ok(token_type) = env::var("AUTHBROKER_TOKEN_TYPE") {
            config.token_type = token_type;
        }
        if let Ok(scheme) = env::var("AUTHBROKER_REDIRECT_SCHEME") {
            config.redirect_scheme = scheme;
        }
        if let Ok(digest) = env::var("AUTHBROKER_DIGEST") {
            config.digest = digest;
        }
        if let Ok(authorities) = env::var("AUTHBROKER_TRUSTED_AUTHORITIES") {
            config.trusted_authorities = serde_json::from_str(&authorities).map_err(|e| {
                warn!(error = %e, "Malformed AUTHBROKER_TRUSTED_AUTHORITIES");
                DelegationError::InvalidConfig(format!("AUTHBROKER_TRUSTED_AUTHORITIES: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the trusted authorities
    pub fn with_authorities(mut self, authorities: Vec<TrustedAuthority>) -> Self {
        self.trusted_authorities = authorities;
        self
    }

    /// Replace the digest name
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = digest.into();
        self
    }

    /// Check the values that can never be valid.
    ///
    /// The digest name is resolved at evaluation time, where an unavailable
    /// digest makes the broker untrusted.
    pub fn validate(&self) -> Result<()> {
        if self.account_type.trim().is_empty() {
            return Err(DelegationError::InvalidConfig("account_type is empty".into()));
        }
        if self.token_type.trim().is_empty() {
            return Err(DelegationError::InvalidConfig("token_type is empty".into()));
        }
        if self.redirect_scheme.trim().is_empty() {
            return Err(DelegationError::InvalidConfig("redirect_scheme is empty".into()));
        }
        for authority in &self.trusted_authorities {
            if authority.package_identifier.trim().is_empty() {
                return Err(DelegationError::InvalidConfig(
                    "trusted authority without package identifier".into(),
                ));
            }
            if authority.fingerprint.as_str().is_empty() {
                return Err(DelegationError::InvalidConfig(format!(
                    "trusted authority {} has an empty fingerprint",
                    authority.package_identifier
                )));
            }
        }
        Ok(())
    }
}
