//! Host platform capabilities
//!
//! The proxy never talks to a concrete platform. The host injects:
//!
//! - a [`PackageInspector`] for package identity, permissions and signers
//! - an [`AccountStore`] fronting the system account manager and the broker
//! - a [`ThreadContext`] answering whether the caller is on the UI thread

use async_trait::async_trait;
use authbroker_core::envelope::keys;
use authbroker_core::{AccountIdentity, AuthenticatorDescription, Envelope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{BrokerCallError, HostError};

/// Package metadata of the host platform
pub trait PackageInspector: Send + Sync {
    /// Package identifier of the calling application
    fn package_name(&self) -> String;

    /// Whether the calling application holds `permission`
    fn has_permission(&self, permission: &str) -> bool;

    /// Raw signing certificates of `package`, in the platform's order
    fn signing_certificates(&self, package: &str) -> Result<Vec<Vec<u8>>, HostError>;

    /// Whether `component` of `package` can be launched
    fn resolves_component(&self, package: &str, component: &str) -> bool;
}

/// Execution context of the current caller
pub trait ThreadContext: Send + Sync {
    /// True on the platform's single UI/event-dispatch thread
    fn is_ui_thread(&self) -> bool;

    /// Platform version the calling application targets
    fn target_platform_version(&self) -> u32;
}

/// The system account store and the broker behind it
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Registered authenticators
    fn authenticators(&self) -> Vec<AuthenticatorDescription>;

    /// Accounts of `account_type`, in the store's enumeration order
    fn accounts_by_type(&self, account_type: &str) -> Vec<AccountIdentity>;

    /// Ask the broker for a token for `account`.
    ///
    /// No completion callback is involved; the future resolves with the
    /// broker's response envelope, which may be absent.
    async fn get_auth_token(
        &self,
        account: &AccountIdentity,
        token_type: &str,
        options: &Envelope,
    ) -> Result<Option<Envelope>, BrokerCallError>;

    /// Ask the broker for the extended credentials of `account`
    async fn update_credentials(
        &self,
        account: &AccountIdentity,
        token_type: &str,
        options: &Envelope,
    ) -> Result<Option<Envelope>, BrokerCallError>;

    /// Ask the broker to add an account, returning the interactive handle it
    /// wants launched
    async fn add_account(
        &self,
        account_type: &str,
        token_type: &str,
        options: &Envelope,
    ) -> Result<Option<BrokerIntent>, BrokerCallError>;
}

/// A launchable handle for the broker's interactive flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerIntent {
    /// Package hosting the activity
    pub package: String,

    /// Component to launch
    pub component: String,

    #[serde(default)]
    pub extras: Envelope,
}

impl BrokerIntent {
    pub fn new(package: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            component: component.into(),
            extras: Envelope::new(),
        }
    }

    /// Mark the intent as originating from a broker request
    pub fn tag_broker_request(&mut self) {
        self.extras
            .put_str(keys::BROKER_REQUEST, keys::BROKER_REQUEST);
    }

    pub fn is_broker_request(&self) -> bool {
        self.extras.get_str(keys::BROKER_REQUEST) == Some(keys::BROKER_REQUEST)
    }
}

/// The capabilities injected by the host, shared by all proxy components
#[derive(Clone)]
pub struct HostEnvironment {
    pub packages: Arc<dyn PackageInspector>,
    pub accounts: Arc<dyn AccountStore>,
    pub thread: Arc<dyn ThreadContext>,
}

impl HostEnvironment {
    pub fn new(
        packages: Arc<dyn PackageInspector>,
        accounts: Arc<dyn AccountStore>,
        thread: Arc<dyn ThreadContext>,
    ) -> Self {
        Self {
            packages,
            accounts,
            thread,
        }
    }

    /// Build from one object implementing every capability
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: PackageInspector + AccountStore + ThreadContext + 'static,
    {
        Self {
            packages: host.clone(),
            accounts: host.clone(),
            thread: host,
        }
    }
}

impl std::fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("package", &self.packages.package_name())
            .finish_non_exhaustive()
    }
}
