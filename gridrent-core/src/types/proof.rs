use serde::{Deserialize, Serialize};

/// A signed, timestamped, nonce-bound attestation of caller identity.
///
/// Created fresh per acquisition attempt and never mutated. The `proof`
/// field is a placeholder attestation derived from the signature, not a
/// cryptographic zero-knowledge proof; a production verifier would replace
/// it with a real proof system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProof {
    /// Stable identifier derived from the identity key alone (64 hex chars)
    pub public_key: String,
    /// Keyed hash over identity key, timestamp and nonce (64 hex chars)
    pub signature: String,
    /// Creation instant, unix milliseconds
    pub timestamp: u64,
    /// Fresh randomness mixed into the signature (64 hex chars)
    pub nonce: String,
    /// Placeholder attestation derived from the signature (64 hex chars)
    pub proof: String,
}
