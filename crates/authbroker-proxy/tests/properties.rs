//! Property-Based Tests for trust and account matching
//!
//! - A broker is trusted only when its registered fingerprint is among its signers
//! - Account lookup returns the first case-insensitive match in enumeration order
//! - Hint-free account checks follow the broker's account count

use authbroker_core::{AccountIdentity, AuthorityRole, DigestAlgorithm, TrustedAuthority};
use authbroker_proxy::mock::MockHost;
use authbroker_proxy::{
    find_account, BrokerProxy, HostEnvironment, ProxyConfig, SignatureVerifier, TrustRegistry,
};
use proptest::prelude::*;
use std::sync::Arc;

const BROKER: &str = "com.example.broker";

fn verifier(registered: &[u8], signers: Vec<Vec<u8>>) -> SignatureVerifier {
    let registry = TrustRegistry::new(vec![TrustedAuthority::new(
        BROKER,
        DigestAlgorithm::Sha1.fingerprint(registered),
        AuthorityRole::SingleAccount,
    )])
    .unwrap();
    let host = Arc::new(MockHost::new("com.example.app").with_certificates(BROKER, signers));
    SignatureVerifier::new(Arc::new(registry), host, "SHA-1")
}

fn certificates() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..32), 1..6)
}

// =============================================================================
// Trust
// =============================================================================

proptest! {
    #[test]
    fn prop_disjoint_fingerprints_never_trusted(
        registered in prop::collection::vec(any::<u8>(), 1..32),
        signers in certificates(),
    ) {
        prop_assume!(!signers.contains(&registered));

        let verifier = verifier(&registered, signers);
        prop_assert!(!verifier.is_trusted(BROKER).unwrap());
        prop_assert!(!verifier.is_signed_by_trusted_authority(BROKER).unwrap());
    }

    #[test]
    fn prop_registered_signer_anywhere_is_trusted(
        registered in prop::collection::vec(any::<u8>(), 1..32),
        mut signers in certificates(),
        position in any::<prop::sample::Index>(),
    ) {
        let index = position.index(signers.len() + 1);
        signers.insert(index, registered.clone());

        let verifier = verifier(&registered, signers);
        prop_assert!(verifier.is_trusted(BROKER).unwrap());
    }

    #[test]
    fn prop_trust_is_bound_to_the_named_package(
        registered in prop::collection::vec(any::<u8>(), 1..32),
        other in "[a-z]{3,8}\\.[a-z]{3,8}",
    ) {
        prop_assume!(other != BROKER);

        let registry = TrustRegistry::new(vec![TrustedAuthority::new(
            BROKER,
            DigestAlgorithm::Sha1.fingerprint(&registered),
            AuthorityRole::SingleAccount,
        )])
        .unwrap();
        let host = Arc::new(
            MockHost::new("com.example.app").with_certificates(other.clone(), vec![registered]),
        );
        let verifier = SignatureVerifier::new(Arc::new(registry), host, "SHA");

        // Same signer, but not a registered broker package
        prop_assert!(!verifier.is_trusted(&other).unwrap());
        prop_assert!(verifier.is_signed_by_trusted_authority(&other).unwrap());
    }
}

// =============================================================================
// Account Matching
// =============================================================================

proptest! {
    #[test]
    fn prop_find_account_first_match(
        names in prop::collection::vec("[a-c]{1,3}", 1..10),
        query in "[a-cA-C]{1,3}",
    ) {
        let accounts: Vec<AccountIdentity> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                AccountIdentity::new(name.clone(), "work").with_stable_id(index.to_string())
            })
            .collect();

        let expected = names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(&query));
        let found = find_account(&query, &accounts)
            .and_then(|account| account.stable_id.clone());

        prop_assert_eq!(found, expected.map(|index| index.to_string()));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_hint_free_check_follows_account_count(
        names in prop::collection::hash_set("[a-z]{1,8}@contoso\\.com", 0..4),
        multi_account in any::<bool>(),
    ) {
        let defaults = ProxyConfig::default();
        let role = if multi_account { AuthorityRole::MultiAccount } else { AuthorityRole::SingleAccount };
        let config = ProxyConfig::default().with_authorities(vec![TrustedAuthority::new(
            BROKER,
            DigestAlgorithm::Sha1.fingerprint(b"broker"),
            role,
        )]);

        let mut host = MockHost::new("com.example.app")
            .with_authenticator(defaults.account_type.clone(), BROKER);
        for name in &names {
            host = host.with_account(AccountIdentity::new(name.clone(), defaults.account_type.clone()));
        }
        let proxy = BrokerProxy::new(config, HostEnvironment::from_host(Arc::new(host))).unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let verified = runtime.block_on(proxy.verify_user("", ""));
        prop_assert_eq!(verified, !names.is_empty());
    }
}
