//! # Server API
//!
//! The network/storage collaborator the session flows talk to, expressed as
//! an async trait, plus the JSON wire types it exchanges.
//!
//! ## Endpoints
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SERVER API SURFACE                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Accounts                                                              │
//! │  ├── submit_registration   POST /auth/register                         │
//! │  ├── fetch_vaulted_key     POST /auth/login                            │
//! │  ├── verify_two_factor     POST /auth/verify-2fa                       │
//! │  └── fetch_public_key      GET  /users/{name}/public-key               │
//! │                                                                         │
//! │  Messages (bearer token)                                               │
//! │  ├── submit_envelope       POST   /message/send                        │
//! │  ├── fetch_inbox           GET    /message/inbox                       │
//! │  ├── fetch_envelope        GET    /message/{id}                        │
//! │  ├── mark_as_read          PUT    /message/{id}/read                   │
//! │  └── delete_message        DELETE /message/{id}                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The server only ever sees public keys, vaults and envelopes. It cannot
//! decrypt any of them.
//!
//! [`MemoryServer`] implements the trait in process for tests and demos.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

use crate::crypto::{SealedMessage, VaultedPrivateKey};
use crate::error::{Error, Result};

/// Value sent in the legacy `iv` field. The real IV is packed inside
/// `encryptedContent`.
pub const IV_MARKER: &str = "included_in_content";

// ============================================================================
// WIRE TYPES
// ============================================================================

/// Account creation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Unique username
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Account password, for server-side authentication only
    pub password: String,
    /// SPKI PEM public key
    pub public_key: String,
    /// Password-protected private key
    #[serde(flatten)]
    pub vault: VaultedPrivateKey,
}

/// Login credentials
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Username or email
    pub login: String,
    /// Account password
    pub password: String,
}

/// One-time code submission for two-factor login
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorRequest {
    /// Username or email
    pub username: String,
    /// One-time code
    pub code: String,
}

/// Login response
///
/// When two-factor authentication is enabled the first response carries no
/// token and no key material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultedKeyResponse {
    /// Bearer token for message endpoints
    pub token: Option<String>,
    /// Whether the account uses two-factor authentication
    #[serde(rename = "isTwoFactorEnabled")]
    pub is_two_factor_enabled: bool,
    /// base64 vault ciphertext
    pub encrypted_private_key: Option<String>,
    /// Hex vault salt
    pub key_salt: Option<String>,
}

impl VaultedKeyResponse {
    /// The vault, if the response carries one
    pub fn vault(&self) -> Option<VaultedPrivateKey> {
        match (&self.encrypted_private_key, &self.key_salt) {
            (Some(ciphertext), Some(salt_hex)) => Some(VaultedPrivateKey {
                ciphertext: ciphertext.clone(),
                salt_hex: salt_hex.clone(),
            }),
            _ => None,
        }
    }
}

/// Outgoing envelope
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEnvelopeRequest {
    /// Recipient username
    pub receiver_name: String,
    /// base64(`iv ‖ ciphertext ‖ tag`)
    pub encrypted_content: String,
    /// base64 OAEP-wrapped session key
    pub encrypted_session_key: String,
    /// base64 signature over `encrypted_content`
    pub signature: String,
    /// Always [`IV_MARKER`]
    pub iv: String,
}

impl SendEnvelopeRequest {
    /// Assemble a request from a sealed message and its signature
    pub fn new(receiver: impl Into<String>, sealed: SealedMessage, signature: String) -> Self {
        Self {
            receiver_name: receiver.into(),
            encrypted_content: sealed.encrypted_content,
            encrypted_session_key: sealed.encrypted_session_key,
            signature,
            iv: IV_MARKER.to_string(),
        }
    }
}

/// A stored envelope as returned to its recipient
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Server-assigned message id
    pub id: String,
    /// Claimed sender
    pub sender_username: String,
    /// base64(`iv ‖ ciphertext ‖ tag`)
    pub encrypted_content: String,
    /// base64 OAEP-wrapped session key
    pub encrypted_session_key: String,
    /// base64 signature over `encrypted_content`
    pub signature: String,
    /// Legacy field, ignored on receive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Whether the recipient has opened it
    pub is_read: bool,
    /// When the server accepted it
    pub sent_at: DateTime<Utc>,
}

/// Inbox listing entry (no ciphertext)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxItem {
    /// Server-assigned message id
    pub id: String,
    /// Claimed sender
    pub sender_username: String,
    /// Whether the recipient has opened it
    pub is_read: bool,
    /// When the server accepted it
    pub sent_at: DateTime<Utc>,
}

// ============================================================================
// TRAIT
// ============================================================================

/// Network and storage operations consumed by the session flows
///
/// Implementations decide transport, retries and timeouts. Message endpoints
/// take the bearer token returned at login.
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Fetch a user's SPKI PEM public key (`UserNotFound` if unknown)
    async fn fetch_public_key(&self, username: &str) -> Result<String>;

    /// Create an account
    async fn submit_registration(&self, request: RegistrationRequest) -> Result<()>;

    /// Check credentials and return the vault (or a two-factor challenge)
    async fn fetch_vaulted_key(&self, credentials: &LoginRequest) -> Result<VaultedKeyResponse>;

    /// Complete a two-factor login
    async fn verify_two_factor(&self, request: &TwoFactorRequest) -> Result<VaultedKeyResponse>;

    /// Store an envelope for its recipient
    async fn submit_envelope(&self, token: &str, request: SendEnvelopeRequest) -> Result<()>;

    /// Fetch one envelope addressed to the token's user
    async fn fetch_envelope(&self, token: &str, id: &str) -> Result<MessageEnvelope>;

    /// List the token user's inbox, newest first
    async fn fetch_inbox(&self, token: &str) -> Result<Vec<InboxItem>>;

    /// Flag an envelope as read
    async fn mark_as_read(&self, token: &str, id: &str) -> Result<()>;

    /// Delete an envelope addressed to the token's user
    async fn delete_message(&self, token: &str, id: &str) -> Result<()>;
}

// ============================================================================
// IN-MEMORY SERVER
// ============================================================================

struct UserRecord {
    username: String,
    email: String,
    password_hash: [u8; 32],
    public_key: String,
    vault: VaultedPrivateKey,
    two_factor_code: Option<String>,
}

struct StoredMessage {
    receiver: String,
    envelope: MessageEnvelope,
}

#[derive(Default)]
struct ServerState {
    users: HashMap<String, UserRecord>,
    tokens: HashMap<String, String>,
    messages: Vec<StoredMessage>,
    key_lookups_down: bool,
}

impl ServerState {
    fn find_user(&self, login: &str) -> Option<&UserRecord> {
        self.users
            .get(login)
            .or_else(|| self.users.values().find(|u| u.email == login))
    }

    fn user_for_token(&self, token: &str) -> Result<String> {
        self.tokens.get(token).cloned().ok_or(Error::NotAuthenticated)
    }

    fn issue_token(&mut self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), username.to_string());
        token
    }

    fn message_for(&mut self, username: &str, id: &str) -> Result<&mut StoredMessage> {
        // Someone else's message is reported exactly like a missing one.
        self.messages
            .iter_mut()
            .find(|m| m.envelope.id == id && m.receiver == username)
            .ok_or_else(|| Error::MessageNotFound(id.to_string()))
    }
}

/// In-process [`ServerApi`] that stores everything in memory
///
/// Behaves like the real backend where it matters to the client: envelopes
/// are stored opaquely, credential failures are indistinguishable from
/// unknown users, and only the recipient can read or delete a message.
#[derive(Default)]
pub struct MemoryServer {
    state: RwLock<ServerState>,
}

impl MemoryServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `code` as a second factor for `username`
    pub fn enable_two_factor(&self, username: &str, code: &str) -> Result<()> {
        let mut state = self.state.write();
        let user = state
            .users
            .get_mut(username)
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;
        user.two_factor_code = Some(code.to_string());
        Ok(())
    }

    /// Overwrite a stored envelope's content (simulates a hostile relay)
    pub fn tamper_content(&self, id: &str, encrypted_content: String) -> Result<()> {
        let mut state = self.state.write();
        let stored = state
            .messages
            .iter_mut()
            .find(|m| m.envelope.id == id)
            .ok_or_else(|| Error::MessageNotFound(id.to_string()))?;
        stored.envelope.encrypted_content = encrypted_content;
        Ok(())
    }

    /// Make public-key lookups fail with `Transport` until switched back
    pub fn set_key_lookups_down(&self, down: bool) {
        self.state.write().key_lookups_down = down;
    }

    /// Number of stored envelopes across all users
    pub fn message_count(&self) -> usize {
        self.state.read().messages.len()
    }

    fn hash_password(password: &str) -> [u8; 32] {
        Sha256::digest(password.as_bytes()).into()
    }

    fn login_response(token: String, user: &UserRecord) -> VaultedKeyResponse {
        VaultedKeyResponse {
            token: Some(token),
            is_two_factor_enabled: user.two_factor_code.is_some(),
            encrypted_private_key: Some(user.vault.ciphertext.clone()),
            key_salt: Some(user.vault.salt_hex.clone()),
        }
    }
}

#[async_trait]
impl ServerApi for MemoryServer {
    async fn fetch_public_key(&self, username: &str) -> Result<String> {
        let state = self.state.read();
        if state.key_lookups_down {
            return Err(Error::Transport("Key directory unreachable".into()));
        }
        state
            .users
            .get(username)
            .map(|u| u.public_key.clone())
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    async fn submit_registration(&self, request: RegistrationRequest) -> Result<()> {
        let mut state = self.state.write();
        if state.users.contains_key(&request.username) {
            return Err(Error::Transport("Username already exists".into()));
        }
        if state.users.values().any(|u| u.email == request.email) {
            return Err(Error::Transport("Email already exists".into()));
        }

        state.users.insert(
            request.username.clone(),
            UserRecord {
                username: request.username,
                email: request.email,
                password_hash: Self::hash_password(&request.password),
                public_key: request.public_key,
                vault: request.vault,
                two_factor_code: None,
            },
        );
        Ok(())
    }

    async fn fetch_vaulted_key(&self, credentials: &LoginRequest) -> Result<VaultedKeyResponse> {
        let mut state = self.state.write();
        let user = state
            .find_user(&credentials.login)
            .filter(|u| u.password_hash == Self::hash_password(&credentials.password))
            .ok_or(Error::WrongPasswordOrCorruptVault)?;

        if user.two_factor_code.is_some() {
            return Ok(VaultedKeyResponse {
                token: None,
                is_two_factor_enabled: true,
                encrypted_private_key: None,
                key_salt: None,
            });
        }

        let username = user.username.clone();
        let token = state.issue_token(&username);
        let user = state.find_user(&username).ok_or(Error::WrongPasswordOrCorruptVault)?;
        Ok(Self::login_response(token, user))
    }

    async fn verify_two_factor(&self, request: &TwoFactorRequest) -> Result<VaultedKeyResponse> {
        let mut state = self.state.write();
        let user = state
            .find_user(&request.username)
            .filter(|u| u.two_factor_code.as_deref() == Some(request.code.as_str()))
            .ok_or(Error::WrongPasswordOrCorruptVault)?;

        let username = user.username.clone();
        let token = state.issue_token(&username);
        let user = state.find_user(&username).ok_or(Error::WrongPasswordOrCorruptVault)?;
        Ok(Self::login_response(token, user))
    }

    async fn submit_envelope(&self, token: &str, request: SendEnvelopeRequest) -> Result<()> {
        let mut state = self.state.write();
        let sender = state.user_for_token(token)?;
        if !state.users.contains_key(&request.receiver_name) {
            return Err(Error::UserNotFound(request.receiver_name));
        }

        state.messages.push(StoredMessage {
            receiver: request.receiver_name,
            envelope: MessageEnvelope {
                id: Uuid::new_v4().to_string(),
                sender_username: sender,
                encrypted_content: request.encrypted_content,
                encrypted_session_key: request.encrypted_session_key,
                signature: request.signature,
                iv: Some(request.iv),
                is_read: false,
                sent_at: Utc::now(),
            },
        });
        Ok(())
    }

    async fn fetch_envelope(&self, token: &str, id: &str) -> Result<MessageEnvelope> {
        let mut state = self.state.write();
        let username = state.user_for_token(token)?;
        Ok(state.message_for(&username, id)?.envelope.clone())
    }

    async fn fetch_inbox(&self, token: &str) -> Result<Vec<InboxItem>> {
        let state = self.state.read();
        let username = state.user_for_token(token)?;

        let mut items: Vec<InboxItem> = state
            .messages
            .iter()
            .filter(|m| m.receiver == username)
            .map(|m| InboxItem {
                id: m.envelope.id.clone(),
                sender_username: m.envelope.sender_username.clone(),
                is_read: m.envelope.is_read,
                sent_at: m.envelope.sent_at,
            })
            .collect();
        // Stable sort keeps later submissions first when timestamps tie.
        items.reverse();
        items.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(items)
    }

    async fn mark_as_read(&self, token: &str, id: &str) -> Result<()> {
        let mut state = self.state.write();
        let username = state.user_for_token(token)?;
        state.message_for(&username, id)?.envelope.is_read = true;
        Ok(())
    }

    async fn delete_message(&self, token: &str, id: &str) -> Result<()> {
        let mut state = self.state.write();
        let username = state.user_for_token(token)?;
        state.message_for(&username, id)?;
        state
            .messages
            .retain(|m| !(m.envelope.id == id && m.receiver == username));
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
