//! Broker Proxy
//!
//! Client-side proxy that delegates security-token requests to a trusted,
//! system-level broker process instead of running the OAuth exchange
//! in-process.
//!
//! ## Flow
//!
//! 1. [`BrokerProxy::can_delegate`] checks permissions, broker signature and
//!    broker accounts
//! 2. [`BrokerProxy::acquire_token_in_background`] resolves the target
//!    account, sends the request envelope and waits at most
//!    [`BROKER_CALL_TIMEOUT`]
//! 3. the response is normalized into success, "needs interactive flow" or a
//!    typed failure
//! 4. on "needs interactive flow" the caller launches the handle returned by
//!    [`BrokerProxy::intent_for_interactive_flow`]
//!
//! ## Host capabilities
//!
//! The host platform is injected through three traits in [`host`]:
//! package inspection, the account store and the calling thread's context.
//! [`mock::MockHost`] implements all of them in memory.
//!
//! ```ignore
//! use authbroker_proxy::{BrokerProxy, HostEnvironment, ProxyConfig};
//!
//! let proxy = BrokerProxy::new(ProxyConfig::from_env()?, HostEnvironment::from_host(host))?;
//! if proxy.can_delegate().await {
//!     let result = proxy.acquire_token_in_background(&request).await?;
//! }
//! ```

pub mod accounts;
pub mod channel;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod host;
pub mod mock;
pub mod proxy;
pub mod translator;
pub mod trust;

pub use accounts::{find_account, find_user_info, AccountResolver};
pub use channel::{BrokerChannel, BROKER_CALL_TIMEOUT, UI_THREAD_ENFORCED_SINCE};
pub use config::ProxyConfig;
pub use eligibility::EligibilityEvaluator;
pub use error::{BrokerCallError, HostError, Result};
pub use host::{AccountStore, BrokerIntent, HostEnvironment, PackageInspector, ThreadContext};
pub use proxy::BrokerProxy;
pub use trust::{SignatureVerifier, TrustRegistry};
