//! Smoke test for the full send pipeline against live services.
//!
//! Signs in with credentials from the environment, creates a chat, sends
//! one message, and prints the resulting conversation. Keeps the session
//! in memory only; nothing is written to disk.
//!
//! Usage:
//!   CONFAB_AUTH_URL=https://auth.example.com \
//!   CONFAB_STORE_URL=https://store.example.com/api \
//!   CONFAB_REPLY_URL=https://hooks.example.com/sendMessage \
//!   CONFAB_EMAIL=ada@example.com \
//!   CONFAB_PASSWORD=... \
//!   cargo run -p confab-cli --example send_smoke

use std::sync::Arc;

use confab_auth::client::AuthClient;
use confab_auth::manager::SessionManager;
use confab_auth::persistence::MemoryCredentialStore;
use confab_core::models::chat::Sender;
use confab_reply::webhook::ReplyClient;
use confab_store::client::StoreClient;
use confab_sync::authed::AuthedStore;
use confab_sync::controller::Controller;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_env_filter("info").init();

    let auth_url = std::env::var("CONFAB_AUTH_URL")
        .map_err(|_| eyre::eyre!("set CONFAB_AUTH_URL env var"))?;
    let store_url = std::env::var("CONFAB_STORE_URL")
        .map_err(|_| eyre::eyre!("set CONFAB_STORE_URL env var"))?;
    let reply_url = std::env::var("CONFAB_REPLY_URL")
        .map_err(|_| eyre::eyre!("set CONFAB_REPLY_URL env var"))?;
    let email =
        std::env::var("CONFAB_EMAIL").map_err(|_| eyre::eyre!("set CONFAB_EMAIL env var"))?;
    let password =
        std::env::var("CONFAB_PASSWORD").map_err(|_| eyre::eyre!("set CONFAB_PASSWORD env var"))?;

    println!("confab send smoke test");
    println!("  auth:  {auth_url}");
    println!("  store: {store_url}");
    println!("  reply: {reply_url}");
    println!("  user:  {email}");
    println!();

    let auth = Arc::new(AuthClient::new(&auth_url)?);
    let persistence = Arc::new(MemoryCredentialStore::new());
    let sessions = Arc::new(SessionManager::new(auth, persistence).await);

    println!("Signing in...");
    let session = sessions.sign_in(&email, &password).await?;
    println!("  signed in as {} ({})", session.user.email, session.user.id);

    let store = Arc::new(StoreClient::new(&store_url)?);
    let authed = Arc::new(AuthedStore::new(store, Arc::clone(&sessions)));
    let replies = Arc::new(ReplyClient::new(&reply_url)?);
    let controller = Controller::new(authed, replies);

    println!("Creating a chat...");
    let chat = controller.create_chat("Smoke test").await?;
    println!("  created chat {}", chat.id);

    println!("Sending a message and waiting for the reply...");
    controller
        .send(&chat.id, &session.user.id, "Hello from the smoke test")
        .await?;

    let snapshot = controller.snapshot().await;
    println!();
    for message in &snapshot.messages {
        let who = match message.sender_type {
            Sender::User => "you",
            Sender::Bot => "bot",
        };
        println!("  [{who}] {}", message.content);
    }
    println!();

    controller.teardown().await;
    sessions.sign_out().await;
    println!("Done.");
    Ok(())
}
