//! # Password Key Derivation
//!
//! Turns a user password into the AES-256 key that protects the private key
//! at rest.
//!
//! ```text
//! PBKDF2-HMAC-SHA256(
//!   password   = UTF-8 password bytes,
//!   salt       = 16 random bytes (stored hex-encoded beside the vault),
//!   iterations = CoreConfig::kdf_iterations (>= 100 000),
//!   length     = 32 bytes
//! )
//! ```

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::cipher::{EncryptionKey, KEY_SIZE};
use crate::config::MIN_KDF_ITERATIONS;
use crate::error::{Error, Result};

/// Size of the per-user vault salt in bytes
pub const SALT_SIZE: usize = 16;

/// Random per-user salt for the password KDF
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generate a fresh random salt
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    /// Encode as lowercase hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex.
    ///
    /// A salt that is not valid hex or not exactly 16 bytes makes the vault
    /// unusable, so this fails with `CorruptVault`.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::CorruptVault(format!("Invalid salt hex: {}", e)))?;
        let bytes: [u8; SALT_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::CorruptVault(format!("Salt must be {} bytes, got {}", SALT_SIZE, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

/// Derive the vault key from a password
///
/// Deliberately slow. Run it off any latency-sensitive thread.
pub fn derive_password_key(password: &str, salt: &Salt, iterations: u32) -> Result<EncryptionKey> {
    if iterations < MIN_KDF_ITERATIONS {
        return Err(Error::KeyDerivationFailed(format!(
            "Iteration count {} below minimum {}",
            iterations, MIN_KDF_ITERATIONS
        )));
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt.as_bytes(), iterations, key.as_mut())
        .map_err(|e| Error::KeyDerivationFailed(format!("PBKDF2 failed: {}", e)))?;

    Ok(EncryptionKey::from_bytes(*key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = Salt::random();
        let k1 = derive_password_key("Tr0ub4dor&3!", &salt, MIN_KDF_ITERATIONS).unwrap();
        let k2 = derive_password_key("Tr0ub4dor&3!", &salt, MIN_KDF_ITERATIONS).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_salt_and_password_change_key() {
        let salt = Salt::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let base = derive_password_key("password-one", &salt, MIN_KDF_ITERATIONS).unwrap();
        let other_pw = derive_password_key("password-two", &salt, MIN_KDF_ITERATIONS).unwrap();
        let other_salt =
            derive_password_key("password-one", &Salt::random(), MIN_KDF_ITERATIONS).unwrap();

        assert_ne!(base.as_bytes(), other_pw.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
    }

    #[test]
    fn test_known_vector() {
        // PBKDF2-HMAC-SHA256("Tr0ub4dor&3!", 00..0f, 100000, 32)
        let salt = Salt::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = derive_password_key("Tr0ub4dor&3!", &salt, 100_000).unwrap();
        assert_eq!(
            hex::encode(key.as_bytes()),
            "5f44cc3c3f224ba1f019da3efd6ef7e5b474783d6c4f62951bb7fbfcb54c6194"
        );
    }

    #[test]
    fn test_low_iteration_count_rejected() {
        let result = derive_password_key("pw", &Salt::random(), 1_000);
        assert!(matches!(result, Err(Error::KeyDerivationFailed(_))));
    }

    #[test]
    fn test_salt_hex_round_trip_and_validation() {
        let salt = Salt::random();
        let hex_str = salt.to_hex();
        assert_eq!(hex_str.len(), 32);
        assert_eq!(Salt::from_hex(&hex_str).unwrap(), salt);

        assert!(matches!(Salt::from_hex("zz"), Err(Error::CorruptVault(_))));
        assert!(matches!(Salt::from_hex("0011"), Err(Error::CorruptVault(_))));
    }
}
