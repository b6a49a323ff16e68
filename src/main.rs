use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use bot_ops_console::api::{ApiClient, Backend};
use bot_ops_console::config::Config;
use bot_ops_console::session::TokenStore;
use bot_ops_console::shell::Shell;
use bot_ops_console::state::AuthStore;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level.clone()));
    fmt()
        .with_env_filter(filter)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("Starting ops console against {}", cfg.api_base_url);

    let tokens = Arc::new(TokenStore::load(&cfg.token_file));
    let client = ApiClient::new(&cfg, tokens.clone());
    let unauthorized_rx = client.watch_unauthorized();
    let backend: Arc<dyn Backend> = Arc::new(client);

    let auth = Arc::new(AuthStore::new(backend.clone(), tokens));
    let cfg = cfg.shared();

    Shell::new(cfg, backend, auth, unauthorized_rx).run().await
}
