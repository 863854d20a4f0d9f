//! Signer fingerprint computation
//!
//! A fingerprint is the standard-alphabet base64 encoding of a digest over the
//! raw bytes of a signing certificate. Brokers are published with SHA-1
//! fingerprints; SHA-256 is accepted for registries that pin stronger digests.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use crate::error::{DelegationError, Result};
use crate::types::SignerFingerprint;

/// Digest used to fingerprint signing certificates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl DigestAlgorithm {
    /// Resolve an algorithm by name.
    ///
    /// Fails with `DigestAlgorithmUnavailable` for names this host cannot
    /// compute.
    pub fn resolve(name: &str) -> Result<Self> {
        name.parse()
    }

    /// Fingerprint one certificate
    pub fn fingerprint(&self, certificate: &[u8]) -> SignerFingerprint {
        let digest = match self {
            DigestAlgorithm::Sha1 => Sha1::digest(certificate).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(certificate).to_vec(),
        };
        SignerFingerprint::new(STANDARD.encode(digest))
    }

    /// Fingerprint every certificate, preserving order
    pub fn fingerprint_all<C: AsRef<[u8]>>(&self, certificates: &[C]) -> Vec<SignerFingerprint> {
        certificates
            .iter()
            .map(|certificate| self.fingerprint(certificate.as_ref()))
            .collect()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha1 => write!(f, "SHA-1"),
            DigestAlgorithm::Sha256 => write!(f, "SHA-256"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DelegationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SHA" | "SHA1" | "SHA-1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" | "SHA-256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(DelegationError::DigestAlgorithmUnavailable(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_fingerprint_known_vector() {
        // SHA-1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
        let fingerprint = DigestAlgorithm::Sha1.fingerprint(b"abc");
        assert_eq!(fingerprint.as_str(), "qZk+NkcGgWq6PiVxeFDCbJzQ2J0=");
    }

    #[test]
    fn test_sha256_fingerprint_known_vector() {
        let fingerprint = DigestAlgorithm::Sha256.fingerprint(b"abc");
        assert_eq!(
            fingerprint.as_str(),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn test_resolve_names() {
        assert_eq!(DigestAlgorithm::resolve("SHA").unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(DigestAlgorithm::resolve("sha-1").unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(
            DigestAlgorithm::resolve("SHA-256").unwrap(),
            DigestAlgorithm::Sha256
        );
    }

    #[test]
    fn test_unknown_algorithm_unavailable() {
        let result = DigestAlgorithm::resolve("MD2");
        assert!(matches!(
            result,
            Err(DelegationError::DigestAlgorithmUnavailable(name)) if name == "MD2"
        ));
    }

    #[test]
    fn test_fingerprint_all_preserves_order() {
        let certificates = vec![b"first".to_vec(), b"second".to_vec()];
        let fingerprints = DigestAlgorithm::Sha1.fingerprint_all(&certificates);

        assert_eq!(fingerprints.len(), 2);
        assert_eq!(fingerprints[0], DigestAlgorithm::Sha1.fingerprint(b"first"));
        assert_ne!(fingerprints[0], fingerprints[1]);
    }
}
