//! Mock host for testing
//!
//! [`MockHost`] implements every host capability in memory. Packages,
//! signers, authenticators, accounts and broker replies are configured with
//! `with_*` builders; calls into the broker are recorded for assertions.

use async_trait::async_trait;
use authbroker_core::{AccountIdentity, AuthenticatorDescription, Envelope, UserInfo};
use authbroker_core::envelope::keys;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{BrokerCallError, HostError};
use crate::host::{AccountStore, BrokerIntent, PackageInspector, ThreadContext};

/// Scripted broker reply
#[derive(Debug, Clone)]
pub enum MockReply<T> {
    /// Resolve with a value
    Value(T),
    /// Resolve with an error
    Error(BrokerCallError),
    /// Never resolve
    Hang,
}

impl<T: Clone> MockReply<T> {
    async fn resolve(&self) -> Result<T, BrokerCallError> {
        match self {
            MockReply::Value(value) => Ok(value.clone()),
            MockReply::Error(err) => Err(err.clone()),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// In-memory host platform
pub struct MockHost {
    package_name: String,
    permissions: HashSet<String>,
    certificates: HashMap<String, Vec<Vec<u8>>>,
    malformed: HashSet<String>,
    components: HashSet<(String, String)>,
    authenticators: Vec<AuthenticatorDescription>,
    accounts: Vec<AccountIdentity>,
    user_infos: HashMap<String, UserInfo>,
    user_info_reply: MockReply<()>,
    token_reply: MockReply<Option<Envelope>>,
    add_account_reply: MockReply<Option<BrokerIntent>>,
    ui_thread: bool,
    target_platform_version: u32,
    token_calls: AtomicUsize,
    credential_calls: AtomicUsize,
    last_token_request: Mutex<Option<(AccountIdentity, Envelope)>>,
    last_credentials_options: Mutex<Option<Envelope>>,
    last_add_account_options: Mutex<Option<Envelope>>,
}

impl MockHost {
    /// Create a host whose calling application is `package_name`.
    ///
    /// The host starts with no permissions, packages or accounts, off the UI
    /// thread, and with a broker that answers every token call with an
    /// empty envelope.
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            permissions: HashSet::new(),
            certificates: HashMap::new(),
            malformed: HashSet::new(),
            components: HashSet::new(),
            authenticators: Vec::new(),
            accounts: Vec::new(),
            user_infos: HashMap::new(),
            user_info_reply: MockReply::Value(()),
            token_reply: MockReply::Value(Some(Envelope::new())),
            add_account_reply: MockReply::Value(None),
            ui_thread: false,
            target_platform_version: 21,
            token_calls: AtomicUsize::new(0),
            credential_calls: AtomicUsize::new(0),
            last_token_request: Mutex::new(None),
            last_credentials_options: Mutex::new(None),
            last_add_account_options: Mutex::new(None),
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Install `package` signed with `certificates`
    pub fn with_certificates(mut self, package: impl Into<String>, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates.insert(package.into(), certificates);
        self
    }

    /// Install `package` with unreadable signing metadata
    pub fn with_malformed_package(mut self, package: impl Into<String>) -> Self {
        self.malformed.insert(package.into());
        self
    }

    /// Make `component` of `package` launchable
    pub fn with_component(mut self, package: impl Into<String>, component: impl Into<String>) -> Self {
        self.components.insert((package.into(), component.into()));
        self
    }

    pub fn with_authenticator(
        mut self,
        account_type: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        self.authenticators
            .push(AuthenticatorDescription::new(account_type, package));
        self
    }

    pub fn with_account(mut self, account: AccountIdentity) -> Self {
        self.accounts.push(account);
        self
    }

    /// Extended user info the broker returns for the account `display_name`
    pub fn with_user_info(mut self, display_name: impl Into<String>, info: UserInfo) -> Self {
        self.user_infos.insert(display_name.into(), info);
        self
    }

    /// Fail every extended user info request with `err`
    pub fn with_user_info_error(mut self, err: BrokerCallError) -> Self {
        self.user_info_reply = MockReply::Error(err);
        self
    }

    /// Script how extended user info requests complete; a `Value` answers
    /// with the registered user info
    pub fn with_user_info_reply(mut self, reply: MockReply<()>) -> Self {
        self.user_info_reply = reply;
        self
    }

    pub fn with_token_reply(mut self, reply: MockReply<Option<Envelope>>) -> Self {
        self.token_reply = reply;
        self
    }

    pub fn with_add_account_reply(mut self, reply: MockReply<Option<BrokerIntent>>) -> Self {
        self.add_account_reply = reply;
        self
    }

    pub fn on_ui_thread(mut self, ui_thread: bool) -> Self {
        self.ui_thread = ui_thread;
        self
    }

    pub fn with_target_platform_version(mut self, version: u32) -> Self {
        self.target_platform_version = version;
        self
    }

    /// Number of token calls that reached the broker
    pub fn token_calls(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }

    /// Number of extended user info calls that reached the broker
    pub fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    /// Account and envelope of the last token call
    pub fn last_token_request(&self) -> Option<(AccountIdentity, Envelope)> {
        lock(&self.last_token_request).clone()
    }

    /// Envelope of the last extended user info call
    pub fn last_credentials_options(&self) -> Option<Envelope> {
        lock(&self.last_credentials_options).clone()
    }

    /// Envelope of the last add-account call
    pub fn last_add_account_options(&self) -> Option<Envelope> {
        lock(&self.last_add_account_options).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PackageInspector for MockHost {
    fn package_name(&self) -> String {
        self.package_name.clone()
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    fn signing_certificates(&self, package: &str) -> Result<Vec<Vec<u8>>, HostError> {
        if self.malformed.contains(package) {
            return Err(HostError::MalformedPackage(package.to_string()));
        }
        self.certificates
            .get(package)
            .cloned()
            .ok_or_else(|| HostError::PackageNotFound(package.to_string()))
    }

    fn resolves_component(&self, package: &str, component: &str) -> bool {
        self.components
            .contains(&(package.to_string(), component.to_string()))
    }
}

impl ThreadContext for MockHost {
    fn is_ui_thread(&self) -> bool {
        self.ui_thread
    }

    fn target_platform_version(&self) -> u32 {
        self.target_platform_version
    }
}

#[async_trait]
impl AccountStore for MockHost {
    fn authenticators(&self) -> Vec<AuthenticatorDescription> {
        self.authenticators.clone()
    }

    fn accounts_by_type(&self, account_type: &str) -> Vec<AccountIdentity> {
        self.accounts
            .iter()
            .filter(|account| account.account_type == account_type)
            .cloned()
            .collect()
    }

    async fn get_auth_token(
        &self,
        account: &AccountIdentity,
        _token_type: &str,
        options: &Envelope,
    ) -> Result<Option<Envelope>, BrokerCallError> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_token_request) = Some((account.clone(), options.clone()));
        self.token_reply.resolve().await
    }

    async fn update_credentials(
        &self,
        account: &AccountIdentity,
        _token_type: &str,
        options: &Envelope,
    ) -> Result<Option<Envelope>, BrokerCallError> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_credentials_options) = Some(options.clone());
        self.user_info_reply.resolve().await?;

        let mut envelope = Envelope::new();
        let info = account
            .display_name
            .as_deref()
            .and_then(|name| self.user_infos.get(name));
        if let Some(info) = info {
            envelope.put_opt_str(keys::USERINFO_USERID, info.unique_id.as_deref());
            envelope.put_opt_str(keys::USERINFO_GIVEN_NAME, info.given_name.as_deref());
            envelope.put_opt_str(keys::USERINFO_FAMILY_NAME, info.family_name.as_deref());
            envelope.put_opt_str(
                keys::USERINFO_IDENTITY_PROVIDER,
                info.identity_provider.as_deref(),
            );
            envelope.put_opt_str(
                keys::USERINFO_USERID_DISPLAYABLE,
                info.displayable_id.as_deref(),
            );
        }
        Ok(Some(envelope))
    }

    async fn add_account(
        &self,
        _account_type: &str,
        _token_type: &str,
        options: &Envelope,
    ) -> Result<Option<BrokerIntent>, BrokerCallError> {
        *lock(&self.last_add_account_options) = Some(options.clone());
        self.add_account_reply.resolve().await
    }
}
