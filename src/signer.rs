//! Digest signing: an injected collaborator turns the datapackage hash into
//! a signature block, in one of the shapes the WACZ auth spec allows.
//!
//! The fields every signing mode produces (`hash`, `created`, `software`,
//! `signature`) live on the outer struct; only the fields specific to a mode
//! live on [`SigningMode`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WaczError;

/// A collaborator that turns a content hash into a signature. The real
/// implementation talks to an external signing service or local key; tests
/// inject a stub.
pub trait Signer: Send + Sync {
    fn sign(&self, hash: &str, created: DateTime<Utc>) -> Result<SignedData, WaczError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedData {
    pub hash: String,
    pub created: String,
    pub software: String,
    pub signature: String,
    #[serde(flatten)]
    pub mode: SigningMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "schema")]
pub enum SigningMode {
    /// Signed with a throwaway key, with no claim about who signed it.
    #[serde(rename = "anon-signature")]
    Anonymous { public_key: String },
    /// Signed with a key a domain's `/.well-known` endpoint vouches for, plus
    /// an optional cross-signature from a second, independent timestamping
    /// authority.
    #[serde(rename = "domain-signature")]
    DomainIdentified {
        domain: String,
        domain_cert: String,
        time_signature: String,
        timestamp_cert: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cross_signed_cert: Option<String>,
    },
}

impl SignedData {
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// Asserts that `signed` actually covers `expected_hash` and carries a
/// non-empty signature. The real cryptographic verification is out of scope
/// here; this only guards against a signer returning stale or empty data.
pub fn validate_signed_data(signed: &SignedData, expected_hash: &str) -> Result<(), WaczError> {
    if signed.hash() != expected_hash {
        return Err(WaczError::SignatureInvalid(format!(
            "signed hash {:?} does not match datapackage hash {expected_hash:?}",
            signed.hash()
        )));
    }
    if signed.signature().is_empty() {
        return Err(WaczError::SignatureInvalid("signature is empty".to_owned()));
    }
    Ok(())
}

/// A signer that always produces an anonymous signature, for tests and local
/// runs with no external signing service configured.
#[cfg(test)]
pub(crate) struct StubSigner {
    pub signature: String,
}

#[cfg(test)]
impl Signer for StubSigner {
    fn sign(&self, hash: &str, created: DateTime<Utc>) -> Result<SignedData, WaczError> {
        Ok(SignedData {
            hash: hash.to_owned(),
            created: created.to_rfc3339(),
            software: format!("waczcore {}", env!("CARGO_PKG_VERSION")),
            signature: self.signature.clone(),
            mode: SigningMode::Anonymous {
                public_key: "stub-key".to_owned(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_signature_over_the_expected_hash() {
        let signer = StubSigner { signature: "sig".to_owned() };
        let signed = signer.sign("sha256:abc", Utc::now()).unwrap();
        assert!(validate_signed_data(&signed, "sha256:abc").is_ok());
    }

    #[test]
    fn rejects_a_signature_over_a_different_hash() {
        let signer = StubSigner { signature: "sig".to_owned() };
        let signed = signer.sign("sha256:abc", Utc::now()).unwrap();
        assert!(validate_signed_data(&signed, "sha256:def").is_err());
    }

    #[test]
    fn rejects_an_empty_signature() {
        let signer = StubSigner { signature: String::new() };
        let signed = signer.sign("sha256:abc", Utc::now()).unwrap();
        assert!(validate_signed_data(&signed, "sha256:abc").is_err());
    }

    #[test]
    fn domain_identified_serializes_without_cross_signed_cert_when_absent() {
        let signed = SignedData {
            hash: "sha256:abc".to_owned(),
            created: "2021-01-01T00:00:00Z".to_owned(),
            software: "waczcore 0.1.0".to_owned(),
            signature: "sig".to_owned(),
            mode: SigningMode::DomainIdentified {
                domain: "example.com".to_owned(),
                domain_cert: "cert".to_owned(),
                time_signature: "ts-sig".to_owned(),
                timestamp_cert: "ts-cert".to_owned(),
                cross_signed_cert: None,
            },
        };
        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["schema"], "domain-signature");
        assert!(value.get("cross_signed_cert").is_none());
    }
}
