use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static RECORDS_APPENDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "joinbot_records_appended_total",
        "Authorized users appended to the record store"
    )
    .expect("register records_appended_total")
});

pub static OAUTH_EXCHANGE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "joinbot_oauth_exchange_failures_total",
        "OAuth2 callbacks that failed after a code was received"
    )
    .expect("register oauth_exchange_failures_total")
});

pub static MEMBER_ADD_ATTEMPTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "joinbot_member_add_attempts_total",
        "Add-guild-member calls issued"
    )
    .expect("register member_add_attempts_total")
});

pub static MEMBER_ADD_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "joinbot_member_add_failures_total",
        "Add-guild-member calls that failed"
    )
    .expect("register member_add_failures_total")
});

pub static INTERACTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "joinbot_interactions_total",
        "Slash command invocations dispatched"
    )
    .expect("register interactions_total")
});

/// Render the default registry in the Prometheus text format.
pub fn encode_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("metrics encode error: {e}"))?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
