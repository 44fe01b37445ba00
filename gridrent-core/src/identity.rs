//! 403 identity handshake: proof generation and verification.
//!
//! The default provider derives everything from a shared identity key with
//! SHA-256. The attestation it produces is a stand-in for a zero-knowledge
//! proof; swap in a real prover behind [`IdentityVerifier`] without touching
//! session or broker code.

use async_trait::async_trait;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;
use crate::types::IdentityProof;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Contract for identity proof providers.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Produce a fresh proof bound to the current instant and a new nonce.
    ///
    /// Fails with [`Error::IdentityVerificationFailed`] when signing
    /// material is unavailable.
    async fn generate_proof(&self) -> Result<IdentityProof, Error>;

    /// Check a proof against this verifier's identity key.
    /// Returns false on any mismatch; never errors.
    fn verify(&self, proof: &IdentityProof) -> bool;
}

/// Keyed-hash identity provider over a shared identity key.
pub struct Sha256IdentityVerifier {
    identity_key: String,
}

impl Sha256IdentityVerifier {
    pub fn new(identity_key: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
        }
    }

    /// Keyed hash: sha256(message || identity_key), hex-rendered.
    fn sign(&self, message: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        hasher.update(self.identity_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Pure function of the identity key; stable across calls.
    fn derive_public_key(&self) -> String {
        hex::encode(Sha256::digest(self.identity_key.as_bytes()))
    }

    /// Placeholder attestation: a hash over the signature, not a ZK proof.
    fn attest(signature: &str) -> String {
        hex::encode(Sha256::digest(format!("zkproof:{signature}").as_bytes()))
    }
}

#[async_trait]
impl IdentityVerifier for Sha256IdentityVerifier {
    async fn generate_proof(&self) -> Result<IdentityProof, Error> {
        if self.identity_key.is_empty() {
            return Err(Error::IdentityVerificationFailed {
                reason: "identity key is empty".to_string(),
            });
        }

        let timestamp = now_ms();
        let mut nonce_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = hex::encode(nonce_bytes);

        let message = format!("{}:{}:{}", self.identity_key, timestamp, nonce);
        let signature = self.sign(&message);
        let proof = Self::attest(&signature);

        Ok(IdentityProof {
            public_key: self.derive_public_key(),
            signature,
            timestamp,
            nonce,
            proof,
        })
    }

    fn verify(&self, proof: &IdentityProof) -> bool {
        // The check message carries the proof's own timestamp and nonce, so
        // a replayed proof still validates: there is no freshness window.
        let message = format!("{}:{}:{}", self.identity_key, proof.timestamp, proof.nonce);
        self.sign(&message) == proof.signature
    }
}
