use std::sync::Arc;

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use tracing::info;

use service::{
    discord::{DiscordApi, HttpDiscordApi},
    storage::RecordStore,
};

use crate::{keepalive, routes, state::AppState};

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load()?;
    info!(discord = ?cfg.discord, db = %cfg.storage.db_path.display(), "configuration loaded");

    // A corrupted record file stops startup instead of silently resetting.
    let store = RecordStore::open(&cfg.storage.db_path).await?;

    let api: Arc<dyn DiscordApi> = Arc::new(HttpDiscordApi::new(&cfg.discord, cfg.http.timeout())?);
    let state = AppState::new(&cfg, api, store)?;
    let app: Router = routes::build_router(state);

    // Bind and serve
    let addr = cfg.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(%local, "oauth2 server listening");

    keepalive::spawn(local.port(), cfg.keepalive.interval());

    axum::serve(listener, app).await?;
    Ok(())
}
