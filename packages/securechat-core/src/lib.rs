//! # SecureChat Core
//!
//! Client-side end-to-end encryption for a server-relayed messenger. The
//! server stores public keys, password-protected private keys and opaque
//! envelopes; it never sees plaintext or an unwrapped private key.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SECURECHAT CORE                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                       session                                   │   │
//! │  │   register · authenticate · send · read (decrypt-on-read)       │   │
//! │  └───────────────┬──────────────────────────────┬──────────────────┘   │
//! │                  │                              │                       │
//! │                  ▼                              ▼                       │
//! │  ┌───────────────────────────────┐   ┌──────────────────────────────┐  │
//! │  │            crypto             │   │             api              │  │
//! │  │                               │   │                              │  │
//! │  │  keys      RSA identity       │   │  ServerApi (async trait)     │  │
//! │  │  vault     password → key     │   │  wire DTOs (camelCase JSON)  │  │
//! │  │  cipher    AES-256-GCM        │   │  MemoryServer                │  │
//! │  │  envelope  hybrid seal/open   │   │                              │  │
//! │  │  signing   PKCS#1 v1.5        │   └──────────────────────────────┘  │
//! │  └───────────────┬───────────────┘                                     │
//! │                  ▼                                                      │
//! │  ┌───────────────────────────────┐                                     │
//! │  │  payload  {text, attachment}  │                                     │
//! │  └───────────────────────────────┘                                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Security parameters
//! - [`crypto`] - Cryptographic primitives (keys, vault, envelope, signing)
//! - [`payload`] - Plaintext message content
//! - [`api`] - Server collaborator trait and wire types
//! - [`session`] - Register, login, send and read workflows
//!
//! The free functions at the crate root are the UI-facing surface; each is a
//! thin wrapper over one component.
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  On the server       │  In client memory only                           │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │  public key (PEM)    │  unwrapped private key (for one Session)         │
//! │  vault + salt        │  per-message session keys (for one operation)    │
//! │  envelopes           │  decrypted messages (session cache)              │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod payload;
pub mod session;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use api::{MemoryServer, MessageEnvelope, ServerApi};
pub use config::CoreConfig;
pub use crypto::{IdentityKeyPair, PublicKey, SealedMessage, VaultedPrivateKey};
pub use error::{Error, Result};
pub use payload::{Attachment, PlaintextPayload};
pub use session::{authenticate, authenticate_with_code, register, DecryptedMessage, Session, Trust};

use zeroize::Zeroizing;

// ============================================================================
// UI FACADE
// ============================================================================

/// Generate a new identity key pair off the async executor
pub async fn generate_identity(config: &CoreConfig) -> Result<IdentityKeyPair> {
    IdentityKeyPair::generate_async(config.rsa_key_bits).await
}

/// Vault an identity's private key under a password
pub fn protect_private_key(
    identity: &IdentityKeyPair,
    password: &str,
    config: &CoreConfig,
) -> Result<VaultedPrivateKey> {
    let pem = identity.private_key_pem()?;
    crypto::vault::wrap(pem.as_bytes(), password, config.kdf_iterations)
}

/// Recover private key bytes (PKCS#1 PEM) from a vault
///
/// Use [`session::unlock_identity`] to get a usable key pair instead.
pub fn recover_private_key(
    vault: &VaultedPrivateKey,
    password: &str,
    config: &CoreConfig,
) -> Result<Zeroizing<Vec<u8>>> {
    crypto::vault::unwrap(vault, password, config.kdf_iterations)
}

/// Encrypt a payload for a recipient
pub fn seal_message(payload: &PlaintextPayload, recipient: &PublicKey) -> Result<SealedMessage> {
    crypto::envelope::seal(payload, recipient)
}

/// Sign an envelope's `encryptedContent`, returning a base64 signature
pub fn sign_envelope(encrypted_content: &str, identity: &IdentityKeyPair) -> Result<String> {
    crypto::signing::sign(encrypted_content, identity)
}

/// Decrypt a received envelope
pub fn open_message(envelope: &MessageEnvelope, own: &IdentityKeyPair) -> Result<PlaintextPayload> {
    crypto::envelope::open(
        &envelope.encrypted_content,
        &envelope.encrypted_session_key,
        own,
    )
}

/// Check an envelope's signature against the claimed sender's key
pub fn verify_envelope(envelope: &MessageEnvelope, sender: &PublicKey) -> bool {
    crypto::signing::verify(&envelope.encrypted_content, &envelope.signature, sender)
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of SecureChat Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

/// RSA keys are slow to generate, so unit tests share three.
#[cfg(test)]
pub(crate) mod test_fixtures {
    use crate::crypto::IdentityKeyPair;
    use once_cell::sync::Lazy;

    pub static ALICE: Lazy<IdentityKeyPair> =
        Lazy::new(|| IdentityKeyPair::generate(2048).unwrap());
    pub static BOB: Lazy<IdentityKeyPair> = Lazy::new(|| IdentityKeyPair::generate(2048).unwrap());
    pub static CAROL: Lazy<IdentityKeyPair> =
        Lazy::new(|| IdentityKeyPair::generate(2048).unwrap());
}
