//! # Symmetric Cipher
//!
//! AES-256-GCM authenticated encryption shared by the private-key vault and
//! the message envelope.
//!
//! ## Packed Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PACKED CIPHERTEXT                                │
//! ├──────────────────┬───────────────────────────────┬──────────────────────┤
//! │   Nonce / IV     │          Ciphertext           │       Auth Tag       │
//! │   12 bytes       │      len(plaintext) bytes     │       16 bytes       │
//! └──────────────────┴───────────────────────────────┴──────────────────────┘
//! ```
//!
//! The nonce is drawn from the OS CSPRNG on every call to [`encrypt`].
//! There is no API that accepts a caller-chosen nonce for encryption.

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Smallest valid packed ciphertext: nonce plus tag around an empty body
pub const MIN_PACKED_SIZE: usize = NONCE_SIZE + TAG_SIZE;

/// A nonce (number used once) for AES-GCM encryption
///
/// **Never reuse a nonce with the same key.** Random 96-bit nonces are safe
/// up to roughly 2^32 messages per key; every key in this crate encrypts far
/// fewer than that (session keys encrypt exactly once).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a cryptographically random nonce
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// An AES-256-GCM key
///
/// Used both for password-derived vault keys and for per-message session
/// keys. Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Generate a fresh random key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, which must be exactly [`KEY_SIZE`] bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_SIZE] = slice.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "Encryption key must be {} bytes, got {}",
                KEY_SIZE,
                slice.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Get the raw key bytes
    ///
    /// Only for wrapping the key under another key. Never log these.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Output of one AEAD encryption: `(IV, ciphertext, tag)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    /// The nonce used for this encryption
    pub nonce: Nonce,
    /// Ciphertext, same length as the plaintext
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag
    pub tag: [u8; TAG_SIZE],
}

impl Sealed {
    /// Pack as `nonce ‖ ciphertext ‖ tag`
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len() + TAG_SIZE);
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Split packed bytes by fixed offsets.
    ///
    /// Returns `None` if the input is shorter than [`MIN_PACKED_SIZE`].
    /// Callers map that to their own "corrupt" error.
    pub fn unpack(packed: &[u8]) -> Option<Self> {
        if packed.len() < MIN_PACKED_SIZE {
            return None;
        }
        let (nonce, rest) = packed.split_at(NONCE_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_SIZE);

        Some(Self {
            nonce: Nonce::from_bytes(nonce.try_into().ok()?),
            ciphertext: ciphertext.to_vec(),
            tag: tag.try_into().ok()?,
        })
    }
}

/// Encrypt with AES-256-GCM under a freshly generated nonce
///
/// ## Parameters
///
/// - `key`: 256-bit encryption key
/// - `plaintext`: Data to encrypt
/// - `aad`: Additional authenticated data (empty slice for none)
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(AesNonce::from_slice(&nonce.0), aad, &mut buffer)
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        nonce,
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Decrypt and authenticate an AES-256-GCM ciphertext
///
/// ## Errors
///
/// Returns `ContentDecryptionFailed` if the tag does not verify: the
/// ciphertext, tag, nonce or AAD was altered, or the key is wrong. The
/// causes are indistinguishable.
pub fn decrypt(key: &EncryptionKey, sealed: &Sealed, aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| Error::InvalidKey(format!("Invalid key: {}", e)))?;

    let mut buffer = sealed.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            AesNonce::from_slice(&sealed.nonce.0),
            aad,
            &mut buffer,
            GenericArray::from_slice(&sealed.tag),
        )
        .map_err(|_| Error::ContentDecryptionFailed)?;

    Ok(buffer)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_encrypt_decrypt_basic() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let plaintext = b"Hello, World!";

        let sealed = encrypt(&key, plaintext, b"").unwrap();
        let decrypted = decrypt(&key, &sealed, b"").unwrap();

        assert_eq!(decrypted, plaintext);
        assert_eq!(sealed.ciphertext.len(), plaintext.len());
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = EncryptionKey::generate();

        let sealed = encrypt(&key, b"", b"").unwrap();
        assert_eq!(sealed.pack().len(), MIN_PACKED_SIZE);

        let decrypted = decrypt(&key, &sealed, b"").unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_pack_layout() {
        let key = EncryptionKey::generate();
        let sealed = encrypt(&key, b"abc", b"").unwrap();
        let packed = sealed.pack();

        assert_eq!(&packed[..NONCE_SIZE], sealed.nonce.as_bytes());
        assert_eq!(&packed[NONCE_SIZE..NONCE_SIZE + 3], sealed.ciphertext.as_slice());
        assert_eq!(&packed[NONCE_SIZE + 3..], &sealed.tag);
        assert_eq!(Sealed::unpack(&packed), Some(sealed));
    }

    #[test]
    fn test_unpack_too_short() {
        assert!(Sealed::unpack(&[0u8; MIN_PACKED_SIZE - 1]).is_none());
        assert!(Sealed::unpack(&[]).is_none());
        assert!(Sealed::unpack(&[0u8; MIN_PACKED_SIZE]).is_some());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = EncryptionKey::from_bytes([42u8; 32]);
        let mut sealed = encrypt(&key, b"Hello, World!", b"").unwrap();

        sealed.ciphertext[0] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &sealed, b""),
            Err(Error::ContentDecryptionFailed)
        ));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = EncryptionKey::generate();
        let mut sealed = encrypt(&key, b"payload", b"").unwrap();

        sealed.tag[TAG_SIZE - 1] ^= 0x80;

        assert!(decrypt(&key, &sealed, b"").is_err());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = EncryptionKey::generate();
        let sealed = encrypt(&key, b"Hello", b"context").unwrap();

        assert!(decrypt(&key, &sealed, b"wrong context").is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt(&EncryptionKey::from_bytes([1u8; 32]), b"secret", b"").unwrap();
        let result = decrypt(&EncryptionKey::from_bytes([2u8; 32]), &sealed, b"");
        assert!(matches!(result, Err(Error::ContentDecryptionFailed)));
    }

    #[test]
    fn test_key_from_slice_length() {
        assert!(EncryptionKey::from_slice(&[0u8; 32]).is_ok());
        assert!(matches!(
            EncryptionKey::from_slice(&[0u8; 31]),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_nonce_never_repeats_under_same_key() {
        let key = EncryptionKey::generate();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let sealed = encrypt(&key, b"same plaintext", b"").unwrap();
            assert!(seen.insert(sealed.nonce), "nonce reused");
        }
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = EncryptionKey::from_bytes([0xAB; 32]);
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("171"));
        assert!(!rendered.to_lowercase().contains("ab"));
    }
}
