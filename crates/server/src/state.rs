use std::sync::Arc;

use configs::AppConfig;
use ed25519_dalek::VerifyingKey;
use service::{
    commands::Dispatcher,
    discord::{self, DiscordApi},
    membership::MembershipService,
    oauth::ExchangeService,
    storage::RecordStore,
};
use tracing::warn;

use crate::errors::StartupError;

/// Shared handler state; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub exchange: Arc<ExchangeService>,
    pub dispatcher: Arc<Dispatcher>,
    pub external_url: Arc<str>,
    /// `None` rejects every interaction request.
    pub public_key: Option<VerifyingKey>,
}

impl AppState {
    pub fn new(
        cfg: &AppConfig,
        api: Arc<dyn DiscordApi>,
        store: Arc<RecordStore>,
    ) -> Result<Self, StartupError> {
        let public_key = match cfg.discord.public_key.as_deref() {
            Some(hex_key) => Some(parse_public_key(hex_key)?),
            None => {
                warn!("DISCORD_PUBLIC_KEY not set; /interactions will reject every request");
                None
            }
        };

        let authorize_url = discord::authorize_url(&cfg.discord.client_id, &cfg.discord.redirect_uri);
        let membership = MembershipService::new(Arc::clone(&api), Arc::clone(&store));
        Ok(Self {
            exchange: Arc::new(ExchangeService::new(api, store)),
            dispatcher: Arc::new(Dispatcher::new(membership, authorize_url)),
            external_url: Arc::from(cfg.external_url.as_str()),
            public_key,
        })
    }
}

pub fn parse_public_key(hex_key: &str) -> Result<VerifyingKey, StartupError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| StartupError::InvalidConfig(format!("DISCORD_PUBLIC_KEY is not hex: {e}")))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| StartupError::InvalidConfig("DISCORD_PUBLIC_KEY must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| StartupError::InvalidConfig(format!("DISCORD_PUBLIC_KEY rejected: {e}")))
}
