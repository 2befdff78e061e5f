use std::sync::Arc;

use eyre::Result;

use confab_auth::client::AuthClient;
use confab_auth::manager::SessionManager;
use confab_auth::persistence::FileCredentialStore;
use confab_cli::config;
use confab_cli::repl::Repl;
use confab_reply::webhook::ReplyClient;
use confab_store::client::StoreClient;
use confab_sync::authed::AuthedStore;
use confab_sync::controller::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = config::resolve_config()?;
    let session_path = config::session_file_path(&config)?;

    let auth = Arc::new(AuthClient::new(&config.auth_base_url)?);
    let persistence = Arc::new(FileCredentialStore::new(session_path));
    let sessions = Arc::new(SessionManager::new(auth, persistence).await);

    let store = Arc::new(StoreClient::new(&config.store_base_url)?);
    let authed = Arc::new(AuthedStore::new(store, Arc::clone(&sessions)));
    let replies = Arc::new(ReplyClient::new(&config.reply_webhook_url)?);
    let controller = Controller::new(authed, replies);

    Repl::new(sessions, controller).run().await
}
