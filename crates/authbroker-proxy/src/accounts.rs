//! Account Resolver
//!
//! Enumerates the accounts held by the broker and selects at most one of
//! them for a request. Lists are fetched fresh on every call.

use authbroker_core::envelope::keys;
use authbroker_core::{
    AccountIdentity, AuthorityRole, DelegationError, DelegationRequest, Envelope, Result,
    TrustedAuthority, UserInfo,
};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::channel::BROKER_CALL_TIMEOUT;
use crate::config::ProxyConfig;
use crate::host::HostEnvironment;
use crate::trust::TrustRegistry;

/// First account whose display name equals `name`, ignoring case.
///
/// Ties resolve to enumeration order.
pub fn find_account<'a>(name: &str, accounts: &'a [AccountIdentity]) -> Option<&'a AccountIdentity> {
    accounts
        .iter()
        .find(|account| account.has_display_name(name))
}

/// First user whose unique id equals `unique_id`, ignoring case
pub fn find_user_info<'a>(unique_id: &str, users: &'a [UserInfo]) -> Option<&'a UserInfo> {
    users.iter().find(|user| user.has_unique_id(unique_id))
}

/// Resolves broker accounts for hints and requests
#[derive(Clone)]
pub struct AccountResolver {
    config: Arc<ProxyConfig>,
    registry: Arc<TrustRegistry>,
    host: HostEnvironment,
}

impl AccountResolver {
    pub fn new(config: Arc<ProxyConfig>, registry: Arc<TrustRegistry>, host: HostEnvironment) -> Self {
        Self {
            config,
            registry,
            host,
        }
    }

    /// Accounts of the broker account type, in enumeration order
    pub fn broker_accounts(&self) -> Vec<AccountIdentity> {
        self.host.accounts.accounts_by_type(&self.config.account_type)
    }

    /// Display name of the first broker account
    pub fn current_user(&self) -> Option<String> {
        self.broker_accounts()
            .into_iter()
            .next()
            .and_then(|account| account.display_name)
    }

    /// Fetch extended user info for every broker account.
    ///
    /// Each account costs one round-trip to the broker, bounded by
    /// [`BROKER_CALL_TIMEOUT`], so this refuses to run on the UI thread.
    pub async fn broker_users(&self) -> Result<Vec<UserInfo>> {
        if self.host.thread.is_ui_thread() {
            return Err(DelegationError::BlockingCallOnUiThread);
        }

        let mut options = Envelope::new();
        options.put_bool(keys::USER_INFO_REQUESTED, true);

        let accounts = self.broker_accounts();
        let mut users = Vec::with_capacity(accounts.len());
        for account in &accounts {
            debug!(account = ?account.display_name, "Waiting for user info from broker");
            let call = self
                .host
                .accounts
                .update_credentials(account, &self.config.token_type, &options);
            let response = timeout(BROKER_CALL_TIMEOUT, call)
                .await
                .map_err(|_| {
                    warn!(account = ?account.display_name, "Broker user info request timed out");
                    DelegationError::Timeout(BROKER_CALL_TIMEOUT)
                })??
                .ok_or(DelegationError::MissingResponseEnvelope)?;
            users.push(UserInfo::from_envelope(&response));
        }
        Ok(users)
    }

    /// Select the broker account for `request`.
    ///
    /// An account-name hint is matched against display names; otherwise the
    /// unique-id hint is looked up in the broker's user info and mapped back to
    /// an account through its displayable id.
    ///
    /// A broker that does not answer the user info lookup in time fails with
    /// `Timeout`; any other lookup failure resolves no account.
    pub async fn resolve_target(
        &self,
        request: &DelegationRequest,
    ) -> Result<Option<AccountIdentity>> {
        let accounts = self.broker_accounts();

        if let Some(name) = request.account_name_hint() {
            return Ok(find_account(name, &accounts).cloned());
        }

        let Some(unique_id) = request.unique_id_hint() else {
            return Ok(None);
        };
        let users = match self.broker_users().await {
            Ok(users) => users,
            Err(e @ DelegationError::Timeout(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Failed to read user info from broker");
                return Ok(None);
            }
        };

        Ok(find_user_info(unique_id, &users)
            .and_then(|user| user.displayable_id.as_deref())
            .and_then(|displayable_id| find_account(displayable_id, &accounts))
            .cloned())
    }

    /// Whether the broker can serve the given hints.
    ///
    /// Empty strings mean "no hint". Only authenticators of the broker account
    /// type owned by a trusted package are considered.
    pub async fn check_account(&self, username: &str, unique_id: &str) -> bool {
        for authenticator in self.host.accounts.authenticators() {
            if authenticator.account_type != self.config.account_type {
                continue;
            }

            let Some(authority) = self.registry.authority(&authenticator.package_name) else {
                debug!(
                    package = %authenticator.package_name,
                    "Ignoring authenticator from untrusted package"
                );
                continue;
            };

            let accounts = self.broker_accounts();
            match authority.role {
                AuthorityRole::SingleAccount => {
                    if accounts.is_empty() {
                        return false;
                    }
                    return self.verify_account(&accounts, username, unique_id).await;
                }
                AuthorityRole::MultiAccount => {
                    if self.supports_add_account(authority) {
                        info!(
                            package = %authority.package_identifier,
                            "Broker supports adding users through the app"
                        );
                        return true;
                    }
                    if !accounts.is_empty() {
                        return self.verify_account(&accounts, username, unique_id).await;
                    }
                }
            }
        }

        false
    }

    /// Whether the hints match the broker's accounts.
    ///
    /// `accounts` must be non-empty. A username hint must match the sole
    /// (first) account; a unique-id hint must match some broker user; no hint
    /// accepts the existing account.
    pub async fn verify_account(
        &self,
        accounts: &[AccountIdentity],
        username: &str,
        unique_id: &str,
    ) -> bool {
        if !username.is_empty() {
            return accounts
                .first()
                .is_some_and(|account| account.has_display_name(username));
        }

        if !unique_id.is_empty() {
            return match self.broker_users().await {
                Ok(users) => find_user_info(unique_id, &users).is_some(),
                Err(e) => {
                    warn!(error = %e, "Could not check the unique id with the broker");
                    false
                }
            };
        }

        true
    }

    /// Whether `authority` can onboard a new account on demand
    pub fn supports_add_account(&self, authority: &TrustedAuthority) -> bool {
        authority.account_chooser.as_deref().is_some_and(|component| {
            self.host
                .packages
                .resolves_component(&authority.package_identifier, component)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerCallError;
    use crate::mock::{MockHost, MockReply};
    use authbroker_core::DigestAlgorithm;

    const WORK: &str = "com.example.work";
    const PORTAL: &str = "com.example.portal";
    const AUTH: &str = "com.example.auth";
    const CHOOSER: &str = "com.example.auth.ui.AccountChooserActivity";

    fn resolver(host: MockHost) -> AccountResolver {
        let config = ProxyConfig {
            account_type: WORK.into(),
            ..ProxyConfig::default()
        };
        let registry = TrustRegistry::new(vec![
            TrustedAuthority::new(
                PORTAL,
                DigestAlgorithm::Sha1.fingerprint(b"portal"),
                AuthorityRole::SingleAccount,
            ),
            TrustedAuthority::new(
                AUTH,
                DigestAlgorithm::Sha1.fingerprint(b"auth"),
                AuthorityRole::MultiAccount,
            )
            .with_account_chooser(CHOOSER),
        ])
        .unwrap();
        AccountResolver::new(
            Arc::new(config),
            Arc::new(registry),
            HostEnvironment::from_host(Arc::new(host)),
        )
    }

    fn user(unique_id: &str, displayable_id: &str) -> UserInfo {
        UserInfo {
            unique_id: Some(unique_id.into()),
            displayable_id: Some(displayable_id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_account_first_case_insensitive_match() {
        let accounts = vec![
            AccountIdentity::new("bob@contoso.com", WORK),
            AccountIdentity::new("Alice@Contoso.com", WORK).with_stable_id("first"),
            AccountIdentity::new("alice@contoso.com", WORK).with_stable_id("second"),
        ];

        let found = find_account("ALICE@contoso.com", &accounts).unwrap();
        assert_eq!(found.stable_id.as_deref(), Some("first"));
        assert!(find_account("carol@contoso.com", &accounts).is_none());
        assert!(find_account("", &accounts).is_none());
    }

    #[test]
    fn test_find_user_info() {
        let users = vec![user("uid-1", "alice@contoso.com"), user("UID-2", "bob@contoso.com")];

        assert_eq!(
            find_user_info("uid-2", &users).and_then(|u| u.displayable_id.as_deref()),
            Some("bob@contoso.com")
        );
        assert!(find_user_info("uid-3", &users).is_none());
        assert!(find_user_info("", &users).is_none());
    }

    #[test]
    fn test_accounts_filtered_by_type() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_account(AccountIdentity::new("personal@example.com", "com.other"))
                .with_account(AccountIdentity::new("alice@contoso.com", WORK)),
        );

        assert_eq!(resolver.broker_accounts().len(), 1);
        assert_eq!(resolver.current_user().as_deref(), Some("alice@contoso.com"));
    }

    #[tokio::test]
    async fn test_broker_users_requests_extended_info() {
        let host = Arc::new(
            MockHost::new("com.example.app")
                .with_account(AccountIdentity::new("alice@contoso.com", WORK))
                .with_user_info("alice@contoso.com", user("uid-1", "alice@contoso.com")),
        );
        let resolver = AccountResolver::new(
            Arc::new(ProxyConfig {
                account_type: WORK.into(),
                ..ProxyConfig::default()
            }),
            Arc::new(TrustRegistry::new(Vec::new()).unwrap()),
            HostEnvironment::from_host(host.clone()),
        );

        let users = resolver.broker_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].unique_id.as_deref(), Some("uid-1"));

        let options = host.last_credentials_options().unwrap();
        assert_eq!(options.get_bool(keys::USER_INFO_REQUESTED), Some(true));
    }

    #[tokio::test]
    async fn test_broker_users_refused_on_ui_thread() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .on_ui_thread(true)
                .with_account(AccountIdentity::new("alice@contoso.com", WORK)),
        );
        assert!(matches!(
            resolver.broker_users().await,
            Err(DelegationError::BlockingCallOnUiThread)
        ));
    }

    #[tokio::test]
    async fn test_check_account_no_authenticator() {
        let resolver = resolver(
            MockHost::new("com.example.app").with_account(AccountIdentity::new("a@b.c", WORK)),
        );
        assert!(!resolver.check_account("", "").await);
    }

    #[tokio::test]
    async fn test_check_account_ignores_untrusted_authenticator() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, "com.evil.broker")
                .with_account(AccountIdentity::new("a@b.c", WORK)),
        );
        assert!(!resolver.check_account("", "").await);
    }

    #[tokio::test]
    async fn test_check_account_single_account_broker() {
        let empty = resolver(MockHost::new("com.example.app").with_authenticator(WORK, PORTAL));
        assert!(!empty.check_account("", "").await);

        let host = MockHost::new("com.example.app")
            .with_authenticator(WORK, PORTAL)
            .with_account(AccountIdentity::new("alice@contoso.com", WORK));
        let resolver = resolver(host);

        assert!(resolver.check_account("", "").await);
        assert!(resolver.check_account("ALICE@contoso.com", "").await);
        assert!(!resolver.check_account("bob@contoso.com", "").await);
    }

    #[tokio::test]
    async fn test_check_account_single_account_ignores_add_account_support() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, PORTAL)
                .with_component(AUTH, CHOOSER),
        );
        assert!(!resolver.check_account("", "").await);
    }

    #[tokio::test]
    async fn test_check_account_multi_account_with_add_support() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, AUTH)
                .with_component(AUTH, CHOOSER),
        );
        // No accounts, but the broker can onboard one
        assert!(resolver.check_account("", "").await);
        assert!(resolver.check_account("anyone@contoso.com", "").await);
    }

    #[tokio::test]
    async fn test_check_account_multi_account_without_add_support() {
        let empty = resolver(MockHost::new("com.example.app").with_authenticator(WORK, AUTH));
        assert!(!empty.check_account("", "").await);

        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, AUTH)
                .with_account(AccountIdentity::new("alice@contoso.com", WORK)),
        );
        assert!(resolver.check_account("", "").await);
        assert!(!resolver.check_account("bob@contoso.com", "").await);
    }

    #[tokio::test]
    async fn test_check_account_unique_id_hint() {
        let host = MockHost::new("com.example.app")
            .with_authenticator(WORK, PORTAL)
            .with_account(AccountIdentity::new("alice@contoso.com", WORK))
            .with_user_info("alice@contoso.com", user("UID-1", "alice@contoso.com"));
        let resolver = resolver(host);

        assert!(resolver.check_account("", "uid-1").await);
        assert!(!resolver.check_account("", "uid-2").await);
    }

    #[tokio::test]
    async fn test_unique_id_fetch_failure_degrades() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, PORTAL)
                .with_account(AccountIdentity::new("alice@contoso.com", WORK))
                .with_user_info_error(BrokerCallError::Io("broken pipe".into())),
        );
        assert!(!resolver.check_account("", "uid-1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_user_info_times_out() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_authenticator(WORK, PORTAL)
                .with_account(AccountIdentity::new("alice@contoso.com", WORK))
                .with_user_info_reply(MockReply::Hang),
        );

        assert!(matches!(
            resolver.broker_users().await,
            Err(DelegationError::Timeout(_))
        ));
        assert!(!resolver.check_account("", "uid-1").await);

        let by_id = DelegationRequest::builder()
            .authority("https://login.example.com/common")
            .client_id("client")
            .scope("resource")
            .user_id("uid-1")
            .build()
            .unwrap();
        assert!(matches!(
            resolver.resolve_target(&by_id).await,
            Err(DelegationError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_target_by_name_then_unique_id() {
        let resolver = resolver(
            MockHost::new("com.example.app")
                .with_account(AccountIdentity::new("alice@contoso.com", WORK))
                .with_account(AccountIdentity::new("bob@contoso.com", WORK))
                .with_user_info("bob@contoso.com", user("uid-bob", "BOB@contoso.com")),
        );
        let request = |builder: authbroker_core::DelegationRequestBuilder| {
            builder
                .authority("https://login.example.com/common")
                .client_id("client")
                .scope("resource")
                .build()
                .unwrap()
        };

        let by_name = request(DelegationRequest::builder().broker_account_name("Alice@contoso.com"));
        assert_eq!(
            resolver.resolve_target(&by_name).await.unwrap().and_then(|a| a.display_name),
            Some("alice@contoso.com".to_string())
        );

        let by_id = request(DelegationRequest::builder().user_id("UID-BOB"));
        assert_eq!(
            resolver.resolve_target(&by_id).await.unwrap().and_then(|a| a.display_name),
            Some("bob@contoso.com".to_string())
        );

        let unknown = request(DelegationRequest::builder().user_id("uid-carol"));
        assert!(resolver.resolve_target(&unknown).await.unwrap().is_none());

        let no_hint = request(DelegationRequest::builder());
        assert!(resolver.resolve_target(&no_hint).await.unwrap().is_none());
    }
}
