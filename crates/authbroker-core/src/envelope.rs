//! Flat key/value envelope exchanged with the broker process
//!
//! Requests and responses cross the process boundary as a single level of
//! string keys mapped to string, integer or boolean values. The key names in
//! [`keys`] are part of the broker contract and must not change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

/// Envelope key names understood by the broker
pub mod keys {
    /// Caller-assigned request id
    pub const REQUEST_ID: &str = "com.microsoft.aad.adal:RequestId";
    /// Always `1`: the caller understands JSON-shaped results
    pub const JSON: &str = "json";
    pub const AUTHORITY: &str = "account.authority";
    pub const RESOURCE: &str = "account.resource";
    pub const REDIRECT: &str = "account.redirect";
    pub const CLIENT_ID: &str = "account.clientid.key";
    pub const PROTOCOL_VERSION: &str = "adal.version.key";
    pub const EXTRA_QUERY_PARAM: &str = "account.extra.query.param";
    pub const CORRELATION_ID: &str = "account.correlationid";
    pub const LOGIN_HINT: &str = "account.login.hint";
    pub const ACCOUNT_NAME: &str = "account.name";

    /// Set on the account-enumeration path to ask for extended user info
    pub const USER_INFO_REQUESTED: &str = "com.microsoft.workaccount.user.info";

    pub const ERROR_CODE: &str = "errorCode";
    pub const ERROR_MESSAGE: &str = "errorMessage";
    pub const AUTH_TOKEN: &str = "authtoken";
    pub const INITIAL_REQUEST: &str = "account.initial.request";
    pub const EXPIRY: &str = "account.expiredate";

    pub const USERINFO_USERID: &str = "account.userinfo.userid";
    pub const USERINFO_GIVEN_NAME: &str = "account.userinfo.given.name";
    pub const USERINFO_FAMILY_NAME: &str = "account.userinfo.family.name";
    pub const USERINFO_IDENTITY_PROVIDER: &str = "account.userinfo.identity.provider";
    pub const USERINFO_USERID_DISPLAYABLE: &str = "account.userinfo.userid.displayable";

    /// Extra placed on interactive intents to mark them as broker-originated
    pub const BROKER_REQUEST: &str = "com.microsoft.aadbroker.adal.broker.request";
}

/// A single envelope value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Flat key/value payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope {
    entries: BTreeMap<String, EnvelopeValue>,
}

impl Envelope {
    /// Create an empty envelope
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into(), EnvelopeValue::Str(value.into()));
    }

    /// Store a string if present; `None` leaves the key absent
    pub fn put_opt_str(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value {
            self.put_str(key, value);
        }
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), EnvelopeValue::Int(value));
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.entries.insert(key.into(), EnvelopeValue::Bool(value));
    }

    /// String value under `key`; other value types read as absent
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(EnvelopeValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Integer value under `key`; numeric strings are accepted
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(EnvelopeValue::Int(value)) => Some(*value),
            Some(EnvelopeValue::Str(value)) => value.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(EnvelopeValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&EnvelopeValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<EnvelopeValue> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvelopeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Serialize to the JSON wire form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the JSON wire form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
