//! In-memory [`DiscordApi`] that records every call, for tests and local runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::{DiscordApi, DiscordUser, TokenGrant};
use crate::errors::DiscordError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ExchangeCode(String),
    CurrentUser(String),
    AddGuildMember { guild_id: String, user_id: String },
}

#[derive(Default)]
pub struct MockDiscordApi {
    grants: Mutex<HashMap<String, String>>,   // code -> access token
    users: Mutex<HashMap<String, String>>,    // access token -> user id
    failing_members: Mutex<HashSet<String>>,  // user ids whose add fails
    calls: Mutex<Vec<MockCall>>,
    latency: Option<Duration>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDiscordApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `code`, issuing `access_token` which resolves to `user_id`.
    pub fn with_grant(self, code: &str, access_token: &str, user_id: &str) -> Self {
        lock(&self.grants).insert(code.to_string(), access_token.to_string());
        lock(&self.users).insert(access_token.to_string(), user_id.to_string());
        self
    }

    /// Accept `code` but leave its token unknown to `users/@me`.
    pub fn with_orphan_grant(self, code: &str, access_token: &str) -> Self {
        lock(&self.grants).insert(code.to_string(), access_token.to_string());
        self
    }

    /// Make every add-member call for `user_id` fail with a network error.
    pub fn failing_member(self, user_id: &str) -> Self {
        lock(&self.failing_members).insert(user_id.to_string());
        self
    }

    /// Sleep this long inside every call before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// User ids passed to `add_guild_member`, in call order.
    pub fn added_members(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::AddGuildMember { user_id, .. } => Some(user_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Log a call once it has finished waiting out the configured latency.
    async fn record(&self, call: MockCall) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl DiscordApi for MockDiscordApi {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, DiscordError> {
        self.record(MockCall::ExchangeCode(code.to_string())).await;
        let token = lock(&self.grants).get(code).cloned().ok_or_else(|| DiscordError::Status {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        })?;
        Ok(TokenGrant {
            access_token: token,
            token_type: Some("Bearer".to_string()),
            scope: Some("identify guilds.join".to_string()),
            expires_in: Some(604800),
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError> {
        self.record(MockCall::CurrentUser(access_token.to_string())).await;
        let id = lock(&self.users).get(access_token).cloned().ok_or(DiscordError::Status {
            status: 401,
            body: "401: Unauthorized".to_string(),
        })?;
        Ok(DiscordUser { id, username: None })
    }

    async fn add_guild_member(
        &self,
        guild_id: &str,
        user_id: &str,
        _access_token: &str,
    ) -> Result<(), DiscordError> {
        self.record(MockCall::AddGuildMember {
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
        })
        .await;
        if lock(&self.failing_members).contains(user_id) {
            return Err(DiscordError::Network("connection reset by peer".to_string()));
        }
        Ok(())
    }
}
