//! Alice registers, logs in and sends "hello" to Bob; Bob reads it.

use std::sync::Arc;

use securechat_core::api::{LoginRequest, ServerApi};
use securechat_core::session::prepare_registration;
use securechat_core::{
    authenticate, generate_identity, open_message, recover_private_key, verify_envelope,
    CoreConfig, Error, IdentityKeyPair, MemoryServer, PlaintextPayload, PublicKey, Trust,
};

const ALICE_PASSWORD: &str = "Tr0ub4dor&3!";
const BOB_PASSWORD: &str = "correct horse battery staple";

async fn enroll(
    server: &MemoryServer,
    identity: &IdentityKeyPair,
    username: &str,
    password: &str,
    config: &CoreConfig,
) {
    let request = prepare_registration(
        identity,
        username,
        &format!("{}@example.com", username),
        password,
        config,
    )
    .unwrap();
    server.submit_registration(request).await.unwrap();
}

#[tokio::test]
async fn alice_sends_hello_to_bob() {
    let config = CoreConfig::default();
    let server = Arc::new(MemoryServer::new());

    let alice_keys = generate_identity(&config).await.unwrap();
    let bob_keys = generate_identity(&config).await.unwrap();
    let carol_keys = generate_identity(&config).await.unwrap();
    assert_eq!(bob_keys.public_key().bits(), 2048);

    enroll(&server, &alice_keys, "alice", ALICE_PASSWORD, &config).await;
    enroll(&server, &bob_keys, "bob", BOB_PASSWORD, &config).await;

    // Login returns the vault; it unwraps to the exact registered key bytes.
    let login = server
        .fetch_vaulted_key(&LoginRequest {
            login: "alice".into(),
            password: ALICE_PASSWORD.into(),
        })
        .await
        .unwrap();
    let vault = login.vault().unwrap();
    let recovered = recover_private_key(&vault, ALICE_PASSWORD, &config).unwrap();
    assert_eq!(
        recovered.as_slice(),
        alice_keys.private_key_pem().unwrap().as_bytes()
    );
    assert!(matches!(
        recover_private_key(&vault, "Tr0ub4dor&3?", &config),
        Err(Error::WrongPasswordOrCorruptVault)
    ));

    let alice = authenticate(server.clone(), config.clone(), "alice", ALICE_PASSWORD)
        .await
        .unwrap();
    assert_eq!(alice.public_key(), alice_keys.public_key());
    alice.send("bob", &PlaintextPayload::text("hello")).await.unwrap();

    // Bob's client.
    let bob_token = server
        .fetch_vaulted_key(&LoginRequest {
            login: "bob".into(),
            password: BOB_PASSWORD.into(),
        })
        .await
        .unwrap()
        .token
        .unwrap();
    let inbox = server.fetch_inbox(&bob_token).await.unwrap();
    assert_eq!(inbox.len(), 1);
    let envelope = server.fetch_envelope(&bob_token, &inbox[0].id).await.unwrap();
    assert_eq!(envelope.sender_username, "alice");

    let payload = open_message(&envelope, &bob_keys).unwrap();
    assert_eq!(payload.text, "hello");
    assert!(payload.attachment.is_none());

    let alice_pub = PublicKey::from_pem(&server.fetch_public_key("alice").await.unwrap()).unwrap();
    assert!(verify_envelope(&envelope, &alice_pub));
    assert!(!verify_envelope(&envelope, carol_keys.public_key()));

    // Only Bob's key opens it.
    assert!(open_message(&envelope, &alice_keys).is_err());
    assert!(open_message(&envelope, &carol_keys).is_err());

    // The same message through Bob's session is verified and cached.
    let bob = authenticate(server.clone(), config.clone(), "bob", BOB_PASSWORD)
        .await
        .unwrap();
    let message = bob.read(&envelope.id).await.unwrap();
    assert_eq!(message.payload.text, "hello");
    assert_eq!(message.trust, Trust::Verified);
    assert!(bob.cached(&envelope.id).is_some());

    bob.logout();
    alice.logout();
}
