//! # Error Handling
//!
//! Error types for SecureChat Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors (100-199)                                              │
//! │  │   ├── KeyGenerationFailed       - RNG / primitive failure           │
//! │  │   ├── InvalidKey                - Unparseable or too-small key      │
//! │  │   ├── EncryptionFailed          - AEAD / RSA encryption failure     │
//! │  │   ├── SigningFailed             - Signature could not be produced   │
//! │  │   └── KeyDerivationFailed       - Password KDF failure              │
//! │  │                                                                      │
//! │  ├── Vault Errors (200-299)                                            │
//! │  │   ├── CorruptVault              - Malformed packed bytes            │
//! │  │   └── WrongPasswordOrCorruptVault - AEAD auth failure (merged)      │
//! │  │                                                                      │
//! │  ├── Envelope Errors (300-399)                                         │
//! │  │   ├── SessionKeyUnwrapFailed    - OAEP padding / format error       │
//! │  │   ├── CorruptEnvelope           - Malformed packed content          │
//! │  │   ├── ContentDecryptionFailed   - Tag mismatch (tamper / wrong key) │
//! │  │   ├── MalformedPayload          - Plaintext structure invalid       │
//! │  │   └── AttachmentTooLarge        - Attachment over the size cap      │
//! │  │                                                                      │
//! │  ├── Session Errors (400-499)                                          │
//! │  │   ├── NotAuthenticated          - No live private key               │
//! │  │   ├── TwoFactorRequired         - Login needs a one-time code       │
//! │  │   └── MessageNotFound           - Unknown message id                │
//! │  │                                                                      │
//! │  ├── Network Errors (500-599)                                          │
//! │  │   ├── UserNotFound              - Unknown username                  │
//! │  │   └── Transport                 - Collaborator failure              │
//! │  │                                                                      │
//! │  └── Internal Errors (900-999)                                         │
//! │      ├── InvalidConfig                                                 │
//! │      ├── SerializationError                                            │
//! │      └── Internal                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `WrongPasswordOrCorruptVault` is a single variant on purpose. An AES-GCM
//! tag mismatch cannot tell a wrong password from a damaged vault, and
//! splitting it would give an attacker a password oracle.

use thiserror::Error;

/// Result type alias for SecureChat Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SecureChat Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================
    /// Identity key pair generation failed; no partial key pair exists
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Invalid key format or size
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Password-based key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    // ========================================================================
    // Vault Errors (200-299)
    // ========================================================================
    /// The vaulted private key is structurally malformed
    #[error("Vaulted private key is corrupt: {0}")]
    CorruptVault(String),

    /// The vault failed authentication: wrong password or tampered vault
    #[error("Wrong password or corrupt vault")]
    WrongPasswordOrCorruptVault,

    // ========================================================================
    // Envelope Errors (300-399)
    // ========================================================================
    /// The encrypted session key could not be unwrapped
    #[error("Failed to unwrap session key")]
    SessionKeyUnwrapFailed,

    /// The packed encrypted content is structurally malformed
    #[error("Envelope is corrupt: {0}")]
    CorruptEnvelope(String),

    /// The encrypted content failed authentication
    #[error("Failed to decrypt message content")]
    ContentDecryptionFailed,

    /// The decrypted payload does not have the expected structure
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Attachment exceeds the configured size cap
    #[error("Attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge {
        /// Decoded attachment size in bytes
        size: usize,
        /// Configured maximum in bytes
        max: usize,
    },

    // ========================================================================
    // Session Errors (400-499)
    // ========================================================================
    /// Operation requires an authenticated session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The account has two-factor authentication enabled
    #[error("Two-factor authentication code required")]
    TwoFactorRequired,

    /// Message not found
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    // ========================================================================
    // Network Errors (500-599)
    // ========================================================================
    /// The requested user does not exist
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The network/storage collaborator failed
    #[error("Transport error: {0}")]
    Transport(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse grouping used to pick what the user is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Anything that could reveal whether a password was right
    Credentials,
    /// Tampering, corruption or decryption failures
    Integrity,
    /// Collaborator / network failures with no cryptographic meaning
    Network,
    /// Bad input supplied by the caller
    Input,
    /// Bugs and misconfiguration
    Internal,
}

impl Error {
    /// Get the numeric error code
    ///
    /// - 100-199: Keys
    /// - 200-299: Vault
    /// - 300-399: Envelope
    /// - 400-499: Session
    /// - 500-599: Network
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            Error::KeyGenerationFailed(_) => 100,
            Error::InvalidKey(_) => 101,
            Error::EncryptionFailed(_) => 102,
            Error::SigningFailed(_) => 103,
            Error::KeyDerivationFailed(_) => 104,

            Error::CorruptVault(_) => 200,
            Error::WrongPasswordOrCorruptVault => 201,

            Error::SessionKeyUnwrapFailed => 300,
            Error::CorruptEnvelope(_) => 301,
            Error::ContentDecryptionFailed => 302,
            Error::MalformedPayload(_) => 303,
            Error::AttachmentTooLarge { .. } => 304,

            Error::NotAuthenticated => 400,
            Error::TwoFactorRequired => 401,
            Error::MessageNotFound(_) => 402,

            Error::UserNotFound(_) => 500,
            Error::Transport(_) => 501,

            Error::InvalidConfig(_) => 900,
            Error::SerializationError(_) => 901,
            Error::Internal(_) => 902,
        }
    }

    /// Classify the error for presentation
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CorruptVault(_)
            | Error::WrongPasswordOrCorruptVault
            | Error::KeyDerivationFailed(_) => ErrorCategory::Credentials,

            Error::SessionKeyUnwrapFailed
            | Error::CorruptEnvelope(_)
            | Error::ContentDecryptionFailed
            | Error::MalformedPayload(_) => ErrorCategory::Integrity,

            Error::UserNotFound(_) | Error::Transport(_) | Error::MessageNotFound(_) => {
                ErrorCategory::Network
            }

            Error::AttachmentTooLarge { .. }
            | Error::InvalidKey(_)
            | Error::NotAuthenticated
            | Error::TwoFactorRequired => ErrorCategory::Input,

            Error::KeyGenerationFailed(_)
            | Error::EncryptionFailed(_)
            | Error::SigningFailed(_)
            | Error::InvalidConfig(_)
            | Error::SerializationError(_)
            | Error::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// The message a user interface should display for this error.
    ///
    /// Every credential failure maps to the same text and every integrity
    /// failure maps to the same text, whatever the root cause.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Credentials => "Invalid username or password.".to_string(),
            ErrorCategory::Integrity => {
                "Decryption error. The message may be corrupted or tampered with.".to_string()
            }
            ErrorCategory::Network => match self {
                Error::UserNotFound(_) => "User not found.".to_string(),
                Error::MessageNotFound(_) => "Message not found.".to_string(),
                _ => "Could not reach the server. Please try again.".to_string(),
            },
            ErrorCategory::Input => self.to_string(),
            ErrorCategory::Internal => "An unexpected error occurred.".to_string(),
        }
    }

    /// Check if this error is recoverable by retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::KeyGenerationFailed("rng".into()).code(), 100);
        assert_eq!(Error::CorruptVault("short".into()).code(), 200);
        assert_eq!(Error::WrongPasswordOrCorruptVault.code(), 201);
        assert_eq!(Error::SessionKeyUnwrapFailed.code(), 300);
        assert_eq!(Error::NotAuthenticated.code(), 400);
        assert_eq!(Error::UserNotFound("bob".into()).code(), 500);
        assert_eq!(Error::Internal("test".into()).code(), 902);
    }

    #[test]
    fn test_credential_failures_share_one_message() {
        let wrong = Error::WrongPasswordOrCorruptVault.user_message();
        let corrupt = Error::CorruptVault("too short".into()).user_message();
        assert_eq!(wrong, corrupt);
        assert!(!wrong.contains("corrupt"));
    }

    #[test]
    fn test_integrity_failures_share_one_message() {
        let messages = [
            Error::SessionKeyUnwrapFailed.user_message(),
            Error::CorruptEnvelope("x".into()).user_message(),
            Error::ContentDecryptionFailed.user_message(),
            Error::MalformedPayload("x".into()).user_message(),
        ];
        assert!(messages.iter().all(|m| m == &messages[0]));
        assert!(messages[0].contains("tampered"));
    }

    #[test]
    fn test_network_failures_are_distinct() {
        let not_found = Error::UserNotFound("bob".into());
        assert_eq!(not_found.category(), ErrorCategory::Network);
        assert_ne!(
            not_found.user_message(),
            Error::ContentDecryptionFailed.user_message()
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Transport("timeout".into()).is_recoverable());
        assert!(!Error::WrongPasswordOrCorruptVault.is_recoverable());
        assert!(!Error::ContentDecryptionFailed.is_recoverable());
    }
}
