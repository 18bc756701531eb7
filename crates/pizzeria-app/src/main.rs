use std::sync::Arc;

use pizzeria_hex::config::Config;
use pizzeria_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use pizzeria_hex::security::{PasswordHasher, TokenService};
use pizzeria_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for SECRET_KEY / DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    let tokens = Arc::new(TokenService::from_config(&config)?);
    let hasher = Arc::new(PasswordHasher::new(config.hash_cost())?);

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(AppState::new(repo, tokens, hasher), server_cfg).await?;
    http.run().await
}
