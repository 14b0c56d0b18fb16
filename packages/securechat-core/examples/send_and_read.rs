//! Two users exchange a message with an attachment, then a relay tampers
//! with a second one.
//!
//! ```sh
//! cargo run --example send_and_read
//! ```

use std::sync::Arc;

use securechat_core::{
    authenticate, register, Attachment, CoreConfig, Error, MemoryServer, PlaintextPayload,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,securechat_core=debug".into()),
        )
        .init();

    let config = CoreConfig::default();
    let server = Arc::new(MemoryServer::new());

    register(server.clone(), &config, "alice", "alice@example.com", "alice-pw").await?;
    register(server.clone(), &config, "bob", "bob@example.com", "bob-pw").await?;

    let alice = authenticate(server.clone(), config.clone(), "alice", "alice-pw").await?;
    let bob = authenticate(server.clone(), config.clone(), "bob", "bob-pw").await?;

    let notes = Attachment::from_bytes("notes.txt", "text/plain", b"meet at noon");
    alice
        .send("bob", &PlaintextPayload::with_attachment("see attached", notes))
        .await?;
    alice.send("bob", &PlaintextPayload::text("second message")).await?;

    let inbox = bob.inbox().await?;
    println!("Bob has {} message(s)", inbox.len());

    // Newest first: corrupt the second message in transit.
    server.tamper_content(&inbox[0].id, "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into())?;

    for item in &inbox {
        match bob.read(&item.id).await {
            Ok(message) => {
                println!(
                    "[{}] {} ({:?}): {}",
                    message.sent_at, message.sender, message.trust, message.payload.text
                );
                if let Some(attachment) = &message.payload.attachment {
                    let data = attachment.decode_data()?;
                    println!(
                        "  attachment {} ({}): {}",
                        attachment.name,
                        attachment.mime_type,
                        String::from_utf8_lossy(&data)
                    );
                }
            }
            Err(e) => println!("[{}] {}", item.id, e.user_message()),
        }
    }

    alice.logout();
    bob.logout();
    Ok(())
}
