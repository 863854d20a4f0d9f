//! Trust Registry and Signature Verifier
//!
//! The registry is frozen configuration: the set of broker packages this
//! client delegates to, each pinned to one signer fingerprint. The verifier
//! reads a package's signing certificates from the host, fingerprints them
//! and checks them against the registry.
//!
//! Two predicates are exposed and they are not interchangeable:
//!
//! - [`SignatureVerifier::is_trusted`]: a named broker package carries the
//!   fingerprint registered for that package
//! - [`SignatureVerifier::is_signed_by_trusted_authority`]: any package
//!   (typically the caller itself) carries some registered broker fingerprint

use authbroker_core::{
    AuthorityRole, DelegationError, DigestAlgorithm, Result, SignerFingerprint, TrustedAuthority,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;
use crate::host::PackageInspector;

/// Known-good broker identities
#[derive(Debug, Clone)]
pub struct TrustRegistry {
    authorities: Vec<TrustedAuthority>,
}

impl TrustRegistry {
    /// Create a registry.
    ///
    /// Package identifiers must be unique (case-insensitively).
    pub fn new(authorities: Vec<TrustedAuthority>) -> Result<Self> {
        for (index, authority) in authorities.iter().enumerate() {
            let duplicate = authorities[..index]
                .iter()
                .any(|earlier| earlier.is_package(&authority.package_identifier));
            if duplicate {
                return Err(DelegationError::InvalidConfig(format!(
                    "duplicate trusted authority: {}",
                    authority.package_identifier
                )));
            }
        }

        for authority in &authorities {
            info!(
                package = %authority.package_identifier,
                role = %authority.role,
                "Registered trusted broker"
            );
        }

        Ok(Self { authorities })
    }

    /// Create a registry from the configured authorities
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        Self::new(config.trusted_authorities.clone())
    }

    pub fn authorities(&self) -> &[TrustedAuthority] {
        &self.authorities
    }

    /// The authority registered for `package`, if any
    pub fn authority(&self, package: &str) -> Option<&TrustedAuthority> {
        self.authorities
            .iter()
            .find(|authority| authority.is_package(package))
    }

    /// Whether `package` is one of the trusted brokers
    pub fn is_broker_package(&self, package: &str) -> bool {
        self.authority(package).is_some()
    }

    /// The first authority with `role`
    pub fn authority_with_role(&self, role: AuthorityRole) -> Option<&TrustedAuthority> {
        self.authorities
            .iter()
            .find(|authority| authority.role == role)
    }

    /// Whether the authority registered for `package` has its fingerprint in
    /// `fingerprints`. Unregistered packages are never trusted.
    pub fn is_trusted_by(&self, package: &str, fingerprints: &[SignerFingerprint]) -> bool {
        self.authority(package)
            .is_some_and(|authority| fingerprints.contains(&authority.fingerprint))
    }

    /// Whether any registered fingerprint appears in `fingerprints`
    pub fn contains_any(&self, fingerprints: &[SignerFingerprint]) -> bool {
        self.authorities
            .iter()
            .any(|authority| fingerprints.contains(&authority.fingerprint))
    }
}

/// Computes signer fingerprints and checks them against the registry
#[derive(Clone)]
pub struct SignatureVerifier {
    registry: Arc<TrustRegistry>,
    packages: Arc<dyn PackageInspector>,
    digest: String,
}

impl SignatureVerifier {
    pub fn new(
        registry: Arc<TrustRegistry>,
        packages: Arc<dyn PackageInspector>,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            packages,
            digest: digest.into(),
        }
    }

    pub fn registry(&self) -> &TrustRegistry {
        &self.registry
    }

    /// All signer fingerprints of `package`, in the host's order.
    ///
    /// Fails with `TrustUnavailable` when the signing metadata cannot be read
    /// and with `DigestAlgorithmUnavailable` when the digest is unknown.
    pub fn fingerprints_of(&self, package: &str) -> Result<Vec<SignerFingerprint>> {
        let algorithm = DigestAlgorithm::resolve(&self.digest)?;
        let certificates = self
            .packages
            .signing_certificates(package)
            .map_err(|e| e.into_trust_error())?;
        Ok(algorithm.fingerprint_all(&certificates))
    }

    /// Whether the named broker `package` is signed by its registered
    /// fingerprint.
    ///
    /// Unregistered packages are untrusted without consulting the host. For a
    /// registered package, fails with `MissingBrokerPackage` when it is not
    /// installed, `DigestAlgorithmUnavailable` when the digest is unknown and
    /// `SignatureVerificationFailed` for any other metadata failure.
    pub fn is_trusted(&self, package: &str) -> Result<bool> {
        if self.registry.authority(package).is_none() {
            debug!(package = %package, "Package is not a registered broker");
            return Ok(false);
        }

        let fingerprints = self.signer_fingerprints(package)?;
        if fingerprints.is_empty() {
            warn!(package = %package, "Failed to get broker app signature");
            return Ok(false);
        }

        let trusted = self.registry.is_trusted_by(package, &fingerprints);
        if !trusted {
            warn!(package = %package, "Incorrect broker app signature");
        }
        Ok(trusted)
    }

    /// Whether `package` carries the fingerprint of any trusted broker.
    ///
    /// Grants the caller direct access to the shared token cache; never use
    /// it to decide whether to delegate.
    pub fn is_signed_by_trusted_authority(&self, package: &str) -> Result<bool> {
        let fingerprints = self.signer_fingerprints(package)?;
        Ok(self.registry.contains_any(&fingerprints))
    }

    /// Fingerprint of the first signing certificate of `package`.
    ///
    /// Applications may be signed with several certificates; the broker side
    /// registers all of them, so the first is enough. Failures are logged and
    /// read as absent.
    pub fn current_signature(&self, package: &str) -> Option<SignerFingerprint> {
        match self.fingerprints_of(package) {
            Ok(fingerprints) => fingerprints.into_iter().next(),
            Err(e) => {
                debug!(package = %package, error = %e, "No signature for package");
                None
            }
        }
    }

    fn signer_fingerprints(&self, package: &str) -> Result<Vec<SignerFingerprint>> {
        let algorithm = DigestAlgorithm::resolve(&self.digest)?;
        let certificates = self
            .packages
            .signing_certificates(package)
            .map_err(|e| e.into_verification_error())?;
        Ok(algorithm.fingerprint_all(&certificates))
    }
}
