//! # Envelope Signatures
//!
//! RSASSA-PKCS1-v1_5 over SHA-256. The signed message is the exact UTF-8
//! bytes of the base64 `encryptedContent` string as it travels on the wire,
//! so a signature can be checked without decrypting anything.
//!
//! ```text
//! sender:    signature = base64(Sign(sender_priv, SHA-256(encryptedContent)))
//! recipient: Verify(sender_pub, encryptedContent, signature) -> bool
//! ```
//!
//! The session key is not covered. A relay could swap in a different
//! `encryptedSessionKey`, but the content would then fail to decrypt.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::Sha256;

use super::keys::{IdentityKeyPair, PublicKey};
use crate::error::{Error, Result};

/// Sign an envelope's `encryptedContent`
///
/// Returns the base64-encoded signature. PKCS#1 v1.5 is deterministic, so
/// the same key and content always give the same signature.
pub fn sign(encrypted_content: &str, signer: &IdentityKeyPair) -> Result<String> {
    let signing_key = SigningKey::<Sha256>::new(signer.private_key().clone());
    let signature = signing_key
        .try_sign(encrypted_content.as_bytes())
        .map_err(|e| Error::SigningFailed(e.to_string()))?;

    Ok(BASE64.encode(signature.to_bytes()))
}

/// Check a signature against the claimed sender's public key
///
/// Never fails: malformed base64, a signature of the wrong length, or a
/// mismatch all return `false`.
pub fn verify(encrypted_content: &str, signature_b64: &str, sender: &PublicKey) -> bool {
    let Ok(raw) = BASE64.decode(signature_b64.trim()) else {
        tracing::warn!("Signature is not valid base64");
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        tracing::warn!("Signature has invalid encoding");
        return false;
    };

    let verifying_key = VerifyingKey::<Sha256>::new(sender.as_rsa().clone());
    match verifying_key.verify(encrypted_content.as_bytes(), &signature) {
        Ok(()) => true,
        Err(_) => {
            tracing::warn!("Signature verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{ALICE, BOB};

    const CONTENT: &str = "q83vASNFZ4mrze8BI0VniavN7wEjRWeJq83vASNFZ4k=";

    #[test]
    fn test_sign_verify() {
        let signature = sign(CONTENT, &ALICE).unwrap();
        assert!(verify(CONTENT, &signature, ALICE.public_key()));
        assert_eq!(BASE64.decode(&signature).unwrap().len(), 256);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign(CONTENT, &ALICE).unwrap();
        let b = sign(CONTENT, &ALICE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signature = sign(CONTENT, &ALICE).unwrap();
        assert!(!verify(CONTENT, &signature, BOB.public_key()));
    }

    #[test]
    fn test_mutated_content_rejected() {
        let signature = sign(CONTENT, &ALICE).unwrap();

        let mut mutated = CONTENT.to_string();
        mutated.replace_range(0..1, "r");
        assert!(!verify(&mutated, &signature, ALICE.public_key()));

        // Same decoded bytes, different text: still rejected.
        assert!(!verify(&format!("{}\n", CONTENT), &signature, ALICE.public_key()));
    }

    #[test]
    fn test_mutated_signature_rejected() {
        let signature = sign(CONTENT, &ALICE).unwrap();
        let mut raw = BASE64.decode(&signature).unwrap();
        raw[100] ^= 0x04;

        assert!(!verify(CONTENT, &BASE64.encode(raw), ALICE.public_key()));
    }

    #[test]
    fn test_garbage_signature_is_false_not_error() {
        assert!(!verify(CONTENT, "", ALICE.public_key()));
        assert!(!verify(CONTENT, "@@not-base64@@", ALICE.public_key()));
        assert!(!verify(CONTENT, &BASE64.encode([1u8; 10]), ALICE.public_key()));
    }
}
