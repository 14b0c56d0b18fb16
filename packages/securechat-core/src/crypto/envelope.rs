//! # Hybrid Message Envelope
//!
//! Seals a [`PlaintextPayload`] for one recipient: the payload is encrypted
//! under a fresh AES-256 session key, and only that key, as 64 lowercase hex
//! characters, is encrypted with the recipient's RSA public key.
//!
//! ## Seal
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  payload ──► canonical JSON bytes                                      │
//! │                    │                                                    │
//! │  session_key = 32 random bytes (one message only)                      │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  encryptedContent    = base64(AES-256-GCM(session_key, json))          │
//! │                        packed as iv ‖ ct ‖ tag                         │
//! │                                                                         │
//! │  encryptedSessionKey = base64(RSA-OAEP-SHA1(recipient_pub,             │
//! │                                             hex(session_key)))         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Open
//!
//! 1. OAEP-decrypt the session key → `SessionKeyUnwrapFailed`. The plaintext
//!    is 64 hex characters, or 32 raw key bytes from older envelopes.
//! 2. unpack the content → `CorruptEnvelope`
//! 3. AES-GCM open → `ContentDecryptionFailed`
//! 4. parse the payload → `MalformedPayload`
//!
//! Any single-bit change to either field makes one of those steps fail; a
//! tampered envelope never yields a different plaintext.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use zeroize::Zeroizing;

use super::cipher::{self, EncryptionKey, Sealed, KEY_SIZE, MIN_PACKED_SIZE};
use super::keys::{IdentityKeyPair, PublicKey};
use crate::error::{Error, Result};
use crate::payload::PlaintextPayload;

/// The encrypted halves of an envelope, ready to be signed and sent
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedMessage {
    /// base64(`iv ‖ ciphertext ‖ tag`) of the canonical payload
    pub encrypted_content: String,
    /// base64 RSA-OAEP wrapped session key (hex text)
    pub encrypted_session_key: String,
}

/// Encrypt a payload for a recipient
pub fn seal(payload: &PlaintextPayload, recipient: &PublicKey) -> Result<SealedMessage> {
    let serialized = Zeroizing::new(payload.to_canonical_bytes()?);
    let session_key = EncryptionKey::generate();

    let sealed = cipher::encrypt(&session_key, &serialized, b"")?;

    let wrapped_key = wrap_session_key(&session_key, recipient)?;

    Ok(SealedMessage {
        encrypted_content: BASE64.encode(sealed.pack()),
        encrypted_session_key: BASE64.encode(wrapped_key),
    })
}

/// Decrypt an envelope addressed to `own`
pub fn open(
    encrypted_content: &str,
    encrypted_session_key: &str,
    own: &IdentityKeyPair,
) -> Result<PlaintextPayload> {
    let session_key = unwrap_session_key(encrypted_session_key, own)?;

    let packed = BASE64
        .decode(encrypted_content.trim())
        .map_err(|e| Error::CorruptEnvelope(format!("Invalid base64 content: {}", e)))?;
    let sealed = Sealed::unpack(&packed).ok_or_else(|| {
        Error::CorruptEnvelope(format!(
            "Content is {} bytes, expected at least {}",
            packed.len(),
            MIN_PACKED_SIZE
        ))
    })?;

    let serialized = Zeroizing::new(
        cipher::decrypt(&session_key, &sealed, b"").map_err(|_| Error::ContentDecryptionFailed)?,
    );

    PlaintextPayload::from_canonical_bytes(&serialized)
}

fn wrap_session_key(session_key: &EncryptionKey, recipient: &PublicKey) -> Result<Vec<u8>> {
    let key_hex = Zeroizing::new(hex::encode(session_key.as_bytes()));

    recipient
        .as_rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), key_hex.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Session key wrap failed: {}", e)))
}

fn unwrap_session_key(encrypted_session_key: &str, own: &IdentityKeyPair) -> Result<EncryptionKey> {
    let wrapped = BASE64
        .decode(encrypted_session_key.trim())
        .map_err(|_| Error::SessionKeyUnwrapFailed)?;

    let unwrapped = Zeroizing::new(
        own.private_key()
            .decrypt(Oaep::new::<Sha1>(), &wrapped)
            .map_err(|_| Error::SessionKeyUnwrapFailed)?,
    );

    match unwrapped.len() {
        len if len == KEY_SIZE * 2 => {
            let key_bytes = Zeroizing::new(
                hex::decode(unwrapped.as_slice()).map_err(|_| Error::SessionKeyUnwrapFailed)?,
            );
            EncryptionKey::from_slice(&key_bytes).map_err(|_| Error::SessionKeyUnwrapFailed)
        }
        KEY_SIZE => {
            EncryptionKey::from_slice(&unwrapped).map_err(|_| Error::SessionKeyUnwrapFailed)
        }
        _ => Err(Error::SessionKeyUnwrapFailed),
    }
}

// ============================================================================
// TESTS
// ============================================================================
