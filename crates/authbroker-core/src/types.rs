//! Common types shared by the trust, account and channel layers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::envelope::{keys, Envelope};

/// Digest over a signing certificate, base64 encoded
///
/// Comparison is exact. There is no partial or wildcard matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerFingerprint(String);

impl SignerFingerprint {
    /// Wrap an already-encoded fingerprint
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignerFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignerFingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// How a trusted broker manages accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityRole {
    /// Holds exactly one account; hints must match that account
    SingleAccount,
    /// Holds several accounts and may be able to onboard new ones
    MultiAccount,
}

impl fmt::Display for AuthorityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityRole::SingleAccount => write!(f, "single_account"),
            AuthorityRole::MultiAccount => write!(f, "multi_account"),
        }
    }
}

/// A broker package this client is willing to delegate to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedAuthority {
    /// Package/application identifier of the broker
    pub package_identifier: String,

    /// Expected signer fingerprint of the broker package
    pub fingerprint: SignerFingerprint,

    /// Account management capability of the broker
    pub role: AuthorityRole,

    /// Component whose presence means the broker can add accounts on demand
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_chooser: Option<String>,
}

impl TrustedAuthority {
    /// Create a new trusted authority
    pub fn new(
        package_identifier: impl Into<String>,
        fingerprint: impl Into<SignerFingerprint>,
        role: AuthorityRole,
    ) -> Self {
        Self {
            package_identifier: package_identifier.into(),
            fingerprint: fingerprint.into(),
            role,
            account_chooser: None,
        }
    }

    /// Set the account-chooser component used to probe add-account support
    pub fn with_account_chooser(mut self, component: impl Into<String>) -> Self {
        self.account_chooser = Some(component.into());
        self
    }

    /// Case-insensitive package comparison
    pub fn is_package(&self, package: &str) -> bool {
        self.package_identifier.eq_ignore_ascii_case(package)
    }
}

/// An authenticator registered with the host's account store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatorDescription {
    /// Account type served by the authenticator
    pub account_type: String,

    /// Package that owns the authenticator
    pub package_name: String,
}

impl AuthenticatorDescription {
    /// Create a new authenticator description
    pub fn new(account_type: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            account_type: account_type.into(),
            package_name: package_name.into(),
        }
    }
}

/// One account known to the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    /// Display name, usually the sign-in name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Stable unique id, when the broker exposes it with the account
    #[serde(default)]
    pub stable_id: Option<String>,

    /// Account type the broker registered this account under
    pub account_type: String,
}

impl AccountIdentity {
    /// Create an account with a display name
    pub fn new(display_name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            stable_id: None,
            account_type: account_type.into(),
        }
    }

    /// Set the stable id
    pub fn with_stable_id(mut self, stable_id: impl Into<String>) -> Self {
        self.stable_id = Some(stable_id.into());
        self
    }

    /// Case-insensitive display name comparison
    pub fn has_display_name(&self, name: &str) -> bool {
        self.display_name
            .as_deref()
            .is_some_and(|display| display.eq_ignore_ascii_case(name))
    }
}

/// User information asserted by the broker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayable_id: Option<String>,
}

impl UserInfo {
    /// Read the user info fields from a broker envelope.
    ///
    /// Every field is optional; a missing field is not an error.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        let field = |key: &str| envelope.get_str(key).map(str::to_string);
        Self {
            unique_id: field(keys::USERINFO_USERID),
            given_name: field(keys::USERINFO_GIVEN_NAME),
            family_name: field(keys::USERINFO_FAMILY_NAME),
            identity_provider: field(keys::USERINFO_IDENTITY_PROVIDER),
            displayable_id: field(keys::USERINFO_USERID_DISPLAYABLE),
        }
    }

    /// True when the broker asserted none of the fields
    pub fn is_empty(&self) -> bool {
        self.unique_id.is_none()
            && self.given_name.is_none()
            && self.family_name.is_none()
            && self.identity_provider.is_none()
            && self.displayable_id.is_none()
    }

    /// Case-insensitive unique id comparison; empty ids never match
    pub fn has_unique_id(&self, unique_id: &str) -> bool {
        self.unique_id
            .as_deref()
            .is_some_and(|id| !id.is_empty() && id.eq_ignore_ascii_case(unique_id))
    }
}
