//! # Key Management
//!
//! Generation and encoding of the long-term RSA identity key pair.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           IDENTITY KEY PAIR                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Private key (RSA >= 2048 bits)                                        │
//! │  • PKCS#1 PEM ("RSA PRIVATE KEY") inside the password vault            │
//! │  • Unwraps session keys (OAEP) and signs envelopes (PKCS#1 v1.5)       │
//! │  • Lives in memory only for an authenticated session                   │
//! │                                                                         │
//! │  Public key                                                            │
//! │  • SPKI PEM ("PUBLIC KEY") published to the server                     │
//! │  • Wraps session keys for this user, verifies this user's signatures   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::config::MIN_RSA_KEY_BITS;
use crate::error::{Error, Result};

/// The user's long-term asymmetric identity
///
/// ## Security
///
/// - Not `Clone`: copies of the private key are made explicitly via
///   [`IdentityKeyPair::from_private_pem`]
/// - The private key is zeroized when this struct is dropped
/// - `Debug` output never includes private material
pub struct IdentityKeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl IdentityKeyPair {
    /// Generate a new random key pair on the current thread
    ///
    /// CPU-heavy (hundreds of milliseconds for 2048 bits). Async callers
    /// should use [`IdentityKeyPair::generate_async`].
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_KEY_BITS {
            return Err(Error::KeyGenerationFailed(format!(
                "RSA key size {} below minimum {}",
                bits, MIN_RSA_KEY_BITS
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::KeyGenerationFailed(e.to_string()))?;
        let public = PublicKey(private.to_public_key());

        tracing::debug!("Generated {}-bit identity key pair", bits);
        Ok(Self { private, public })
    }

    /// Generate a key pair on tokio's blocking pool
    ///
    /// Dropping the returned future discards the result; generation has no
    /// side effects, so that is a safe way to cancel.
    pub async fn generate_async(bits: usize) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::generate(bits))
            .await
            .map_err(|e| Error::KeyGenerationFailed(format!("Key generation task failed: {}", e)))?
    }

    /// Load a key pair from a PEM private key (PKCS#1 or PKCS#8)
    pub fn from_private_pem(pem: &str) -> Result<Self> {
        let private = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|e| Error::InvalidKey(format!("Invalid private key PEM: {}", e)))?;

        let public = PublicKey::from_rsa(private.to_public_key())?;
        Ok(Self { private, public })
    }

    /// Encode the private key as PKCS#1 PEM
    ///
    /// This is the byte form protected by the vault. Never log or transmit it
    /// unwrapped.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.private
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| Error::InvalidKey(format!("Failed to encode private key: {}", e)))
    }

    /// Get the public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Get the RSA private key (for unwrapping and signing)
    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("bits", &self.public.bits())
            .finish_non_exhaustive()
    }
}

/// An RSA public key of at least [`MIN_RSA_KEY_BITS`] bits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Parse an SPKI PEM public key (`-----BEGIN PUBLIC KEY-----`)
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| Error::InvalidKey(format!("Invalid public key PEM: {}", e)))?;
        Self::from_rsa(key)
    }

    fn from_rsa(key: RsaPublicKey) -> Result<Self> {
        let bits = key.size() * 8;
        if bits < MIN_RSA_KEY_BITS {
            return Err(Error::InvalidKey(format!(
                "RSA key size {} below minimum {}",
                bits, MIN_RSA_KEY_BITS
            )));
        }
        Ok(Self(key))
    }

    /// Encode as SPKI PEM
    pub fn to_pem(&self) -> Result<String> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| Error::InvalidKey(format!("Failed to encode public key: {}", e)))
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.0.size() * 8
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

// ============================================================================
// TESTS
// ============================================================================
