//! # Cryptography Module
//!
//! All cryptographic primitives used by SecureChat Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Password ──PBKDF2-HMAC-SHA256 (salt, >= 100k rounds)──┐       │   │
//! │  │                                                         ▼       │   │
//! │  │                                          Vault key (AES-256)    │   │
//! │  │                                                         │       │   │
//! │  │                                                    wraps│       │   │
//! │  │                                                         ▼       │   │
//! │  │  ┌─────────────────────────────────────────────────────────┐   │   │
//! │  │  │         Identity key pair (RSA >= 2048 bits)            │   │   │
//! │  │  │                                                         │   │   │
//! │  │  │ • Unwraps per-message session keys (OAEP-SHA1)          │   │   │
//! │  │  │ • Signs envelopes (PKCS#1 v1.5, SHA-256)                │   │   │
//! │  │  └─────────────────────────────────────────────────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 MESSAGE ENVELOPE                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  1. Fresh 256-bit session key per message                      │   │
//! │  │  2. AES-256-GCM(session key, canonical payload JSON)           │   │
//! │  │  3. RSA-OAEP(recipient public key, hex(session key))           │   │
//! │  │  4. Sign the base64 ciphertext with the sender's key           │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | RSA-2048+ | Identity | PKCS#1 private PEM, SPKI public PEM |
//! | RSA-OAEP-SHA1 | Session key wrap | 64 hex chars of the key, as the web client sends it; never raw RSA |
//! | RSASSA-PKCS1-v1_5 / SHA-256 | Signatures | Deterministic |
//! | AES-256-GCM | Vault and content | 96-bit random nonce, 128-bit tag |
//! | PBKDF2-HMAC-SHA256 | Password KDF | 16-byte salt |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: symmetric keys and unwrapped private-key bytes are
//!    zeroized when dropped
//! 2. **Secure Random**: `rand::rngs::OsRng` for every key, salt and nonce
//! 3. **No Nonce Reuse**: every encryption draws its own nonce
//! 4. **Merged Vault Errors**: a wrong password and a tampered vault produce
//!    the same error

pub mod cipher;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod signing;
pub mod vault;

pub use cipher::{decrypt, encrypt, EncryptionKey, Nonce, Sealed, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use envelope::{open, seal, SealedMessage};
pub use kdf::{derive_password_key, Salt, SALT_SIZE};
pub use keys::{IdentityKeyPair, PublicKey};
pub use signing::{sign, verify};
pub use vault::VaultedPrivateKey;
