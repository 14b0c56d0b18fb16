//! # Session Module
//!
//! The register / login / send / read workflows, sequenced over the crypto
//! components and a [`ServerApi`].
//!
//! ## Flows
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SESSION FLOWS                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Register                                                              │
//! │  generate key pair ──► vault(password) ──► submit {pub, vault, salt}   │
//! │  Nothing is submitted unless every step succeeded.                     │
//! │                                                                         │
//! │  Authenticate                                                          │
//! │  fetch vault ──► [2FA code] ──► unwrap(password) ──► Session           │
//! │  Unknown user, wrong password and corrupt vault all surface as         │
//! │  WrongPasswordOrCorruptVault.                                          │
//! │                                                                         │
//! │  Send                                                                  │
//! │  fetch recipient key ──► seal ──► sign(encryptedContent) ──► submit    │
//! │                                                                         │
//! │  Read (decrypt-on-read)                                                │
//! │  cache hit? ──► fetch envelope ──► open ──► fetch sender key ──►       │
//! │  verify ──► cache {payload, Verified | Unverified} ──► mark read       │
//! │  (an Unverified result from a transport error is not cached)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session Lifetime
//!
//! A [`Session`] is the only place the unwrapped private key lives. It is
//! created by [`authenticate`] or [`authenticate_with_code`] and destroyed by
//! [`Session::logout`] (or by dropping it). The decrypted-message cache dies
//! with it and is never persisted.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::api::{
    InboxItem, LoginRequest, RegistrationRequest, SendEnvelopeRequest, ServerApi,
    TwoFactorRequest, VaultedKeyResponse,
};
use crate::config::CoreConfig;
use crate::crypto::{envelope, signing, vault, IdentityKeyPair, PublicKey, VaultedPrivateKey};
use crate::error::{Error, Result};
use crate::payload::PlaintextPayload;

// ============================================================================
// DECRYPTED MESSAGES
// ============================================================================

/// Whether a message's signature checked out against its claimed sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trust {
    /// Signature verified against the sender's published key
    Verified,
    /// Signature missing, invalid, or the sender's key could not be fetched
    Unverified,
}

/// A message opened during this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    /// Server message id
    pub id: String,
    /// Claimed sender username
    pub sender: String,
    /// Decrypted content
    pub payload: PlaintextPayload,
    /// Signature outcome
    pub trust: Trust,
    /// When the server accepted the message
    pub sent_at: DateTime<Utc>,
}

impl DecryptedMessage {
    /// Shorthand for `trust == Trust::Verified`
    pub fn is_verified(&self) -> bool {
        self.trust == Trust::Verified
    }
}

// ============================================================================
// REGISTRATION
// ============================================================================

/// Build the registration request for an existing key pair
///
/// Vaults the private key under `password` and packages it with the public
/// key. Pure: nothing leaves the process.
pub fn prepare_registration(
    identity: &IdentityKeyPair,
    username: &str,
    email: &str,
    password: &str,
    config: &CoreConfig,
) -> Result<RegistrationRequest> {
    let private_pem = identity.private_key_pem()?;
    let vault = vault::wrap(private_pem.as_bytes(), password, config.kdf_iterations)?;

    Ok(RegistrationRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        public_key: identity.public_key().to_pem()?,
        vault,
    })
}

/// Create an account: generate keys, vault the private key, submit
///
/// Returns the new public key. If any step fails nothing is submitted.
pub async fn register(
    api: Arc<dyn ServerApi>,
    config: &CoreConfig,
    username: &str,
    email: &str,
    password: &str,
) -> Result<PublicKey> {
    config.validate()?;

    let identity = IdentityKeyPair::generate_async(config.rsa_key_bits).await?;

    let owned = (
        username.to_string(),
        email.to_string(),
        password.to_string(),
        config.clone(),
    );
    let (request, identity) = tokio::task::spawn_blocking(move || {
        let (username, email, password, config) = owned;
        let request = prepare_registration(&identity, &username, &email, &password, &config)?;
        Ok::<_, Error>((request, identity))
    })
    .await
    .map_err(|e| Error::Internal(format!("Registration task failed: {}", e)))??;

    api.submit_registration(request).await?;

    tracing::info!("Registered {}", username);
    Ok(identity.public_key().clone())
}

// ============================================================================
// AUTHENTICATION
// ============================================================================

/// Log in with a password
///
/// Fails with `TwoFactorRequired` if the account needs a one-time code; use
/// [`authenticate_with_code`] in that case.
pub async fn authenticate(
    api: Arc<dyn ServerApi>,
    config: CoreConfig,
    login: &str,
    password: &str,
) -> Result<Session> {
    let credentials = LoginRequest {
        login: login.to_string(),
        password: password.to_string(),
    };
    let response = api.fetch_vaulted_key(&credentials).await?;

    if response.is_two_factor_enabled && response.vault().is_none() {
        tracing::debug!("Login for {} needs a second factor", login);
        return Err(Error::TwoFactorRequired);
    }

    Session::unlock(api, config, login, password, response).await
}

/// Log in with a password and a two-factor code
pub async fn authenticate_with_code(
    api: Arc<dyn ServerApi>,
    config: CoreConfig,
    login: &str,
    password: &str,
    code: &str,
) -> Result<Session> {
    let request = TwoFactorRequest {
        username: login.to_string(),
        code: code.to_string(),
    };
    let response = api.verify_two_factor(&request).await?;

    Session::unlock(api, config, login, password, response).await
}

/// Recover the identity key pair from a vault
pub fn unlock_identity(
    vault: &VaultedPrivateKey,
    password: &str,
    iterations: u32,
) -> Result<IdentityKeyPair> {
    let private_key = vault::unwrap(vault, password, iterations)?;
    let pem = std::str::from_utf8(&private_key)
        .map_err(|_| Error::CorruptVault("Vault does not contain a PEM key".into()))?;
    IdentityKeyPair::from_private_pem(pem)
        .map_err(|_| Error::CorruptVault("Vault does not contain a valid private key".into()))
}

// ============================================================================
// SESSION
// ============================================================================

/// An authenticated user session
///
/// Holds the live private key and the decrypted-message cache. Not `Clone`.
pub struct Session {
    /// Server collaborator
    api: Arc<dyn ServerApi>,
    /// Bearer token for message endpoints
    token: String,
    /// Login name used to authenticate
    username: String,
    /// Unwrapped identity key pair
    identity: IdentityKeyPair,
    /// Runtime configuration
    config: CoreConfig,
    /// Messages opened in this session, by id
    cache: RwLock<HashMap<String, DecryptedMessage>>,
}

impl Session {
    async fn unlock(
        api: Arc<dyn ServerApi>,
        config: CoreConfig,
        login: &str,
        password: &str,
        response: VaultedKeyResponse,
    ) -> Result<Self> {
        let vault = response.vault().ok_or(Error::WrongPasswordOrCorruptVault)?;
        let token = response.token.ok_or(Error::NotAuthenticated)?;

        let password = password.to_string();
        let iterations = config.kdf_iterations;
        let identity =
            tokio::task::spawn_blocking(move || unlock_identity(&vault, &password, iterations))
                .await
                .map_err(|e| Error::Internal(format!("Unlock task failed: {}", e)))??;

        tracing::info!("Authenticated {}", login);
        Ok(Self {
            api,
            token,
            username: login.to_string(),
            identity,
            config,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// The name this session logged in with
    pub fn username(&self) -> &str {
        &self.username
    }

    /// This user's public key
    pub fn public_key(&self) -> &PublicKey {
        self.identity.public_key()
    }

    /// This session's configuration
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Encrypt, sign and submit a message
    pub async fn send(&self, recipient: &str, payload: &PlaintextPayload) -> Result<()> {
        payload.validate(self.config.max_attachment_bytes)?;

        let recipient_pem = self.api.fetch_public_key(recipient).await?;
        let recipient_key = PublicKey::from_pem(&recipient_pem)?;

        let sealed = envelope::seal(payload, &recipient_key)?;
        let signature = signing::sign(&sealed.encrypted_content, &self.identity)?;

        self.api
            .submit_envelope(&self.token, SendEnvelopeRequest::new(recipient, sealed, signature))
            .await?;

        tracing::debug!("Sent message from {} to {}", self.username, recipient);
        Ok(())
    }

    /// List the inbox, newest first
    pub async fn inbox(&self) -> Result<Vec<InboxItem>> {
        self.api.fetch_inbox(&self.token).await
    }

    /// Open a message, using the cache when possible
    ///
    /// A message that decrypts but fails signature verification is still
    /// returned, marked [`Trust::Unverified`]. A message that fails to
    /// decrypt is an error and nothing is cached. If the sender's key could
    /// not be fetched because of a transport error, the unverified result is
    /// not cached and the next read verifies again.
    pub async fn read(&self, id: &str) -> Result<DecryptedMessage> {
        if let Some(message) = self.cached(id) {
            return Ok(message);
        }

        let envelope = self.api.fetch_envelope(&self.token, id).await?;
        let payload = envelope::open(
            &envelope.encrypted_content,
            &envelope.encrypted_session_key,
            &self.identity,
        )?;

        let (trust, settled) = match self.sender_key(&envelope.sender_username).await {
            Ok(key) if signing::verify(&envelope.encrypted_content, &envelope.signature, &key) => {
                (Trust::Verified, true)
            }
            Ok(_) => {
                tracing::warn!(
                    "Message {} from {} failed signature verification",
                    id,
                    envelope.sender_username
                );
                (Trust::Unverified, true)
            }
            Err(e) => {
                tracing::warn!(
                    "Message {} from {} could not be verified: {}",
                    id,
                    envelope.sender_username,
                    e
                );
                (Trust::Unverified, !e.is_recoverable())
            }
        };

        let message = DecryptedMessage {
            id: envelope.id.clone(),
            sender: envelope.sender_username.clone(),
            payload,
            trust,
            sent_at: envelope.sent_at,
        };
        let message = if settled {
            self.cache
                .write()
                .entry(id.to_string())
                .or_insert(message)
                .clone()
        } else {
            message
        };

        if !envelope.is_read {
            if let Err(e) = self.api.mark_as_read(&self.token, id).await {
                tracing::warn!("Failed to mark message {} as read: {}", id, e);
            }
        }

        tracing::debug!("Opened message {}", id);
        Ok(message)
    }

    /// A previously opened message, if cached
    pub fn cached(&self, id: &str) -> Option<DecryptedMessage> {
        self.cache.read().get(id).cloned()
    }

    /// Delete a message on the server and drop it from the cache
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.api.delete_message(&self.token, id).await?;
        self.cache.write().remove(id);
        tracing::debug!("Deleted message {}", id);
        Ok(())
    }

    /// End the session
    ///
    /// Clears the cache and drops the private key, which zeroizes it.
    pub fn logout(self) {
        self.cache.write().clear();
        tracing::info!("Logged out {}", self.username);
    }

    async fn sender_key(&self, sender: &str) -> Result<PublicKey> {
        let pem = self.api.fetch_public_key(sender).await?;
        PublicKey::from_pem(&pem)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("cached", &self.cache.read().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================
