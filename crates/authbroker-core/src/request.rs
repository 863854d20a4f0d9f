//! Delegation requests
//!
//! A [`DelegationRequest`] is built once per token call and is immutable
//! afterwards. The channel serializes it into an [`Envelope`](crate::Envelope)
//! before it crosses the process boundary.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{DelegationError, Result};

/// A token request that may be satisfied by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationRequest {
    /// Caller-assigned id, echoed in the envelope
    pub request_id: i32,

    /// Authority URI of the identity provider
    pub authority: Url,

    /// Requested resource/scopes, ordered and free of duplicates
    pub scopes: Vec<String>,

    /// OAuth client id of the calling application
    pub client_id: String,

    /// Redirect URI registered by the calling application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Login hint supplied by the user or the application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,

    /// Display name of the broker account to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_account_name: Option<String>,

    /// Stable unique id of the user to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,

    /// Pre-encoded extra query parameters for the authorize endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_query_params: Option<String>,

    /// Protocol version announced to the broker
    pub protocol_version: String,
}

impl DelegationRequest {
    /// Start building a request
    pub fn builder() -> DelegationRequestBuilder {
        DelegationRequestBuilder::new()
    }

    /// Scopes joined with single spaces, as the broker expects the resource
    pub fn resource(&self) -> String {
        self.scopes.join(" ")
    }

    /// Account name hint, if non-empty
    pub fn account_name_hint(&self) -> Option<&str> {
        non_empty(self.broker_account_name.as_deref())
    }

    /// Unique id hint, if non-empty
    pub fn unique_id_hint(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    /// Name sent as both login hint and account name: the broker account
    /// name, falling back to the login hint
    pub fn broker_username(&self) -> Option<&str> {
        self.account_name_hint()
            .or_else(|| non_empty(self.login_hint.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

/// Builder for [`DelegationRequest`]
///
/// # Example
///
/// ```ignore
/// let request = DelegationRequest::builder()
///     .authority("https://login.example.com/common")
///     .scope("https://graph.example.com")
///     .client_id("4a1aa1d5-c567-49d0-ad0b-cd957a47f842")
///     .login_hint("alice@contoso.com")
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct DelegationRequestBuilder {
    request_id: i32,
    authority: Option<String>,
    scopes: Vec<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    login_hint: Option<String>,
    broker_account_name: Option<String>,
    user_id: Option<String>,
    correlation_id: Option<Uuid>,
    extra_query_params: Option<String>,
    protocol_version: Option<String>,
}

impl DelegationRequestBuilder {
    /// Create a new request builder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_id(mut self, request_id: i32) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Append a scope; duplicates are dropped at build time
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }

    /// Replace all scopes
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn login_hint(mut self, login_hint: impl Into<String>) -> Self {
        self.login_hint = Some(login_hint.into());
        self
    }

    pub fn broker_account_name(mut self, name: impl Into<String>) -> Self {
        self.broker_account_name = Some(name.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn extra_query_params(mut self, params: impl Into<String>) -> Self {
        self.extra_query_params = Some(params.into());
        self
    }

    /// Override the protocol version (defaults to this library's version)
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    /// Build the request
    ///
    /// Requires an absolute authority URI, a client id and at least one
    /// non-blank scope.
    pub fn build(self) -> Result<DelegationRequest> {
        let authority = self
            .authority
            .ok_or_else(|| DelegationError::InvalidRequest("authority is required".into()))?;
        let authority = Url::parse(&authority)?;

        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DelegationError::InvalidRequest("client_id is required".into()))?;

        let mut scopes: Vec<String> = Vec::with_capacity(self.scopes.len());
        for scope in self.scopes {
            let scope = scope.trim();
            if !scope.is_empty() && !scopes.iter().any(|existing| existing == scope) {
                scopes.push(scope.to_string());
            }
        }
        if scopes.is_empty() {
            return Err(DelegationError::InvalidRequest(
                "at least one scope is required".into(),
            ));
        }

        Ok(DelegationRequest {
            request_id: self.request_id,
            authority,
            scopes,
            client_id,
            redirect_uri: self.redirect_uri,
            login_hint: self.login_hint,
            broker_account_name: self.broker_account_name,
            user_id: self.user_id,
            correlation_id: self.correlation_id,
            extra_query_params: self.extra_query_params,
            protocol_version: self
                .protocol_version
                .unwrap_or_else(|| crate::VERSION.to_string()),
        })
    }
}
