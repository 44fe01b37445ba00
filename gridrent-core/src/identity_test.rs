#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::identity::{IdentityVerifier, Sha256IdentityVerifier};

    #[tokio::test]
    async fn test_public_key_stable_across_calls() {
        let verifier = Sha256IdentityVerifier::new("test-identity-key");
        let proof1 = verifier.generate_proof().await.unwrap();
        let proof2 = verifier.generate_proof().await.unwrap();

        assert_eq!(proof1.public_key, proof2.public_key);
        assert_eq!(proof1.public_key.len(), 64);
    }

    #[tokio::test]
    async fn test_signature_and_proof_unique_per_call() {
        let verifier = Sha256IdentityVerifier::new("test-identity-key");
        let proof1 = verifier.generate_proof().await.unwrap();
        let proof2 = verifier.generate_proof().await.unwrap();

        assert_ne!(proof1.signature, proof2.signature);
        assert_ne!(proof1.proof, proof2.proof);
        assert_ne!(proof1.nonce, proof2.nonce);
    }

    #[tokio::test]
    async fn test_verify_accepts_fresh_proof() {
        let verifier = Sha256IdentityVerifier::new("test-identity-key");
        let proof = verifier.generate_proof().await.unwrap();
        assert!(verifier.verify(&proof));
    }

    #[tokio::test]
    async fn test_verify_rejects_tampered_signature() {
        let verifier = Sha256IdentityVerifier::new("test-identity-key");
        let mut proof = verifier.generate_proof().await.unwrap();

        let mut bytes = proof.signature.into_bytes();
        bytes[0] = if bytes[0] == b'0' { b'1' } else { b'0' };
        proof.signature = String::from_utf8(bytes).unwrap();

        assert!(!verifier.verify(&proof));
    }

    #[tokio::test]
    async fn test_verify_rejects_proof_from_other_key() {
        let ours = Sha256IdentityVerifier::new("key-a");
        let theirs = Sha256IdentityVerifier::new("key-b");
        let proof = theirs.generate_proof().await.unwrap();
        assert!(!ours.verify(&proof));
    }

    // Verification imposes no freshness window: an intact old proof, replayed
    // wholesale, still validates. Known weakness of the placeholder scheme.
    #[tokio::test]
    async fn test_verify_accepts_replayed_proof() {
        let verifier = Sha256IdentityVerifier::new("test-identity-key");
        let proof = verifier.generate_proof().await.unwrap();
        let replayed = proof.clone();
        assert!(verifier.verify(&replayed));
    }

    #[tokio::test]
    async fn test_generate_proof_fails_without_signing_material() {
        let verifier = Sha256IdentityVerifier::new("");
        let err = verifier.generate_proof().await.unwrap_err();
        assert!(matches!(err, Error::IdentityVerificationFailed { .. }));
    }
}
