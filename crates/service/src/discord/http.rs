use std::time::Duration;

use async_trait::async_trait;
use configs::DiscordConfig;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{DiscordApi, DiscordUser, TokenGrant};
use crate::errors::DiscordError;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Option<String>,
    username: Option<String>,
}

/// [`DiscordApi`] over HTTPS with a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpDiscordApi {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    bot_token: String,
}

impl HttpDiscordApi {
    pub fn new(cfg: &DiscordConfig, timeout: Duration) -> Result<Self, DiscordError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("joinbot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            bot_token: cfg.bot_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }
}

/// Fail on non-2xx, otherwise hand back the raw body.
async fn success_body(resp: reqwest::Response) -> Result<Vec<u8>, DiscordError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(DiscordError::Status { status: status.as_u16(), body });
    }
    Ok(resp.bytes().await?.to_vec())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, DiscordError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(DiscordError::MissingField(field))
}

#[async_trait]
impl DiscordApi for HttpDiscordApi {
    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, DiscordError> {
        let resp = self
            .http
            .post(self.url("oauth2/token"))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let body = success_body(resp).await?;
        let token: TokenResponse =
            serde_json::from_slice(&body).map_err(|e| DiscordError::MalformedBody(e.to_string()))?;
        debug!(scope = ?token.scope, "authorization code exchanged");
        Ok(TokenGrant {
            access_token: required(token.access_token, "access_token")?,
            token_type: token.token_type,
            scope: token.scope,
            expires_in: token.expires_in,
        })
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError> {
        let resp = self
            .http
            .get(self.url("users/@me"))
            .bearer_auth(access_token)
            .send()
            .await?;
        let body = success_body(resp).await?;
        let user: UserResponse =
            serde_json::from_slice(&body).map_err(|e| DiscordError::MalformedBody(e.to_string()))?;
        Ok(DiscordUser { id: required(user.id, "id")?, username: user.username })
    }

    #[instrument(skip(self, access_token))]
    async fn add_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
        access_token: &str,
    ) -> Result<(), DiscordError> {
        let resp = self
            .http
            .put(self.url(&format!("guilds/{guild_id}/members/{user_id}")))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await?;
        // 201 = added, 204 = already a member
        success_body(resp).await?;
        Ok(())
    }
}
