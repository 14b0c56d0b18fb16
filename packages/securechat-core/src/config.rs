//! Runtime configuration for the encryption core.
//!
//! The defaults match the deployed wire format. Lowering any of the
//! security parameters below their floor is rejected by [`CoreConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum PBKDF2 iteration count accepted for the private-key vault
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Minimum RSA modulus size in bits
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// Default attachment cap (30 MiB of decoded file data)
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 30 * 1024 * 1024;

/// Configuration for SecureChat Core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoreConfig {
    /// PBKDF2-HMAC-SHA256 iterations used to wrap and unwrap the vault.
    ///
    /// Not stored in the vault itself, so wrap and unwrap must agree.
    pub kdf_iterations: u32,
    /// RSA modulus size for newly generated identity keys
    pub rsa_key_bits: usize,
    /// Largest attachment (decoded bytes) accepted by the send flow
    pub max_attachment_bytes: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: MIN_KDF_ITERATIONS,
            rsa_key_bits: MIN_RSA_KEY_BITS,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }
}

impl CoreConfig {
    /// Parse a JSON configuration document and validate it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("Unreadable config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the security floors
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(Error::InvalidConfig(format!(
                "kdfIterations must be at least {}, got {}",
                MIN_KDF_ITERATIONS, self.kdf_iterations
            )));
        }
        if self.rsa_key_bits < MIN_RSA_KEY_BITS || self.rsa_key_bits % 8 != 0 {
            return Err(Error::InvalidConfig(format!(
                "rsaKeyBits must be a multiple of 8 and at least {}, got {}",
                MIN_RSA_KEY_BITS, self.rsa_key_bits
            )));
        }
        if self.max_attachment_bytes == 0 {
            return Err(Error::InvalidConfig(
                "maxAttachmentBytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kdf_iterations, 100_000);
        assert_eq!(config.rsa_key_bits, 2048);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CoreConfig::from_json(r#"{"kdfIterations": 250000}"#).unwrap();
        assert_eq!(config.kdf_iterations, 250_000);
        assert_eq!(config.rsa_key_bits, MIN_RSA_KEY_BITS);
        assert_eq!(config.max_attachment_bytes, DEFAULT_MAX_ATTACHMENT_BYTES);
    }

    #[test]
    fn test_weak_parameters_rejected() {
        let weak_kdf = CoreConfig::from_json(r#"{"kdfIterations": 1000}"#);
        assert!(matches!(weak_kdf, Err(Error::InvalidConfig(_))));

        let weak_rsa = CoreConfig {
            rsa_key_bits: 1024,
            ..CoreConfig::default()
        };
        assert!(matches!(weak_rsa.validate(), Err(Error::InvalidConfig(_))));

        let no_attachments = CoreConfig {
            max_attachment_bytes: 0,
            ..CoreConfig::default()
        };
        assert!(no_attachments.validate().is_err());
    }

    #[test]
    fn test_garbage_json_rejected() {
        assert!(matches!(
            CoreConfig::from_json("not json"),
            Err(Error::InvalidConfig(_))
        ));
    }
}
