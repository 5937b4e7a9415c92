//! Periodic self ping so hosting platforms that idle silent processes keep us up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Spawn the ping loop against our own `/health`. The first ping fires
/// immediately. A zero interval disables the task.
pub fn spawn(port: u16, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("keep-alive ping disabled");
        return None;
    }
    let url = format!("http://127.0.0.1:{port}/health");
    let client = reqwest::Client::new();
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            ping(&client, &url).await;
        }
    }))
}

/// One ping; returns whether the endpoint answered with a success status.
pub async fn ping(client: &reqwest::Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(res) if res.status().is_success() => {
            info!(%url, at = %local_time(), "keep-alive ping ok");
            true
        }
        Ok(res) => {
            warn!(%url, status = %res.status(), "keep-alive ping failed");
            false
        }
        Err(e) => {
            error!(%url, error = %e, "keep-alive ping error");
            false
        }
    }
}

/// Wall clock in the host's timezone, `HH:MM:SS`.
fn local_time() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
