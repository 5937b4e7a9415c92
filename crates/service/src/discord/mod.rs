//! Discord REST surface used by the bot.
//!
//! [`DiscordApi`] is the seam between the business services and the network:
//! [`http::HttpDiscordApi`] talks to Discord, [`mock::MockDiscordApi`] records
//! calls for tests.

pub mod http;
pub mod mock;

use async_trait::async_trait;

use crate::errors::DiscordError;

pub use http::HttpDiscordApi;

pub const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// Scopes requested from the user: read identity, and let the bot add them to guilds.
pub const OAUTH_SCOPES: &[&str] = &["identify", "guilds.join"];

/// Result of the authorization-code exchange.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// The `users/@me` identity behind an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordUser {
    pub id: String,
    pub username: Option<String>,
}

#[async_trait]
pub trait DiscordApi: Send + Sync {
    /// Trade an authorization code for a bearer token.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, DiscordError>;

    /// Resolve the user that owns `access_token`.
    async fn current_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError>;

    /// Add `user_id` to `guild_id` using the bot credential and the user's grant.
    async fn add_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), DiscordError>;
}

/// Link the user follows to grant `identify` and `guilds.join`.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    let scopes = OAUTH_SCOPES.join(" ");
    format!(
        "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&response_type=code&scope={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(&scopes),
    )
}
