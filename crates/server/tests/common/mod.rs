#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use configs::AppConfig;
use ed25519_dalek::SigningKey;
use service::{discord::mock::MockDiscordApi, storage::RecordStore};

use server::{routes, state::AppState};

pub const EXTERNAL_URL: &str = "https://example.com/merci";

pub struct TestApp {
    pub router: Router,
    pub api: Arc<MockDiscordApi>,
    pub store: Arc<RecordStore>,
    pub signing_key: SigningKey,
}

pub fn test_config(signing_key: &SigningKey) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.discord.client_id = "1234".into();
    cfg.discord.client_secret = "secret".into();
    cfg.discord.redirect_uri = "http://localhost:3000/callback".into();
    cfg.discord.bot_token = "bot".into();
    cfg.discord.public_key = Some(hex::encode(signing_key.verifying_key().to_bytes()));
    cfg.external_url = EXTERNAL_URL.into();
    cfg
}

pub async fn build_app(api: MockDiscordApi) -> anyhow::Result<TestApp> {
    let db_path = std::env::temp_dir()
        .join(format!("server_test_{}", uuid::Uuid::new_v4()))
        .join("db.json");
    let store = RecordStore::open(&db_path).await?;
    let api = Arc::new(api);
    let signing_key = SigningKey::from_bytes(&[42u8; 32]);
    let state = AppState::new(&test_config(&signing_key), api.clone(), store.clone())?;
    Ok(TestApp { router: routes::build_router(state), api, store, signing_key })
}

pub async fn body_string(resp: axum::response::Response) -> anyhow::Result<String> {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Serve the router on a loopback port so requests go through a real socket.
pub async fn serve(app: &TestApp) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = app.router.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Poll `done` until it holds, failing the test after five seconds.
pub async fn wait_for(done: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
