//! Register an account against the in-memory server, then log back in.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example register_and_login
//! ```

use std::sync::Arc;

use securechat_core::{authenticate, register, CoreConfig, Error, MemoryServer};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,securechat_core=debug".into()),
        )
        .init();

    tracing::info!("SecureChat Core v{}", securechat_core::version());

    let config = CoreConfig::default();
    let server = Arc::new(MemoryServer::new());

    let public_key = register(
        server.clone(),
        &config,
        "alice",
        "alice@example.com",
        "Tr0ub4dor&3!",
    )
    .await?;
    println!("Registered alice with a {}-bit key", public_key.bits());
    println!("{}", public_key.to_pem()?);

    match authenticate(server.clone(), config.clone(), "alice", "wrong password").await {
        Err(e) => println!("Wrong password: {}", e.user_message()),
        Ok(_) => println!("Wrong password was accepted?"),
    }

    let session = authenticate(server, config, "alice", "Tr0ub4dor&3!").await?;
    println!("Logged in as {}", session.username());
    session.logout();

    Ok(())
}
