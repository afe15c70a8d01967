mod app;
mod auth;
mod config;
mod contacts;
mod error;
mod images;
mod mail;
mod state;
mod storage;

use anyhow::Context;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "contactbook=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Misconfiguration (e.g. a disallowed signing algorithm) stops the process here.
    let config = AppConfig::from_env().context("load configuration")?;
    tracing::info!(algorithm = ?config.jwt.algorithm, "configuration loaded");

    let app_state = AppState::init(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&app_state.db)
        .await
        .context("run migrations")?;

    app::serve(app::build_app(app_state), config.listen_addr).await
}
