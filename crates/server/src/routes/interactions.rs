//! `POST /interactions`: Discord's HTTP delivery of slash commands.
//!
//! Every request carries an Ed25519 signature over `timestamp || body`, checked
//! against the application's public key before the body is even parsed. The
//! signed timestamp must also be recent, which bounds replays.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use service::commands::{CommandOption, InvocationContext, Reply};

use crate::errors::InteractionError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;
const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
const EPHEMERAL_FLAG: u64 = 1 << 6;

/// Largest accepted distance, in seconds, between the signed timestamp and now.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 5 * 60;

#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<InteractionData>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub member: Option<InteractionMember>,
    #[serde(default)]
    pub user: Option<InteractionUser>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionMember {
    pub user: Option<InteractionUser>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionUser {
    pub id: String,
}

impl Interaction {
    fn context(&self) -> InvocationContext {
        // guild invocations carry `member.user`, DMs carry `user`
        let user_id = self
            .member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .map(|u| u.id.clone());
        InvocationContext { guild_id: self.guild_id.clone(), user_id }
    }
}

/// Check the request signature and the freshness of its timestamp. `now` is
/// unix seconds.
pub fn verify_signature(
    key: &VerifyingKey,
    headers: &HeaderMap,
    body: &[u8],
    now: i64,
) -> Result<(), InteractionError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (Some(sig_hex), Some(timestamp)) = (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER)) else {
        return Err(InteractionError::MissingSignature);
    };
    let sig_bytes = hex::decode(sig_hex).map_err(|_| InteractionError::InvalidSignature)?;
    let signature = Signature::from_slice(&sig_bytes).map_err(|_| InteractionError::InvalidSignature)?;

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);
    key.verify(&message, &signature)
        .map_err(|_| InteractionError::InvalidSignature)?;

    let signed_at: i64 = timestamp.parse().map_err(|_| InteractionError::StaleTimestamp)?;
    if (now - signed_at).abs() > MAX_TIMESTAMP_SKEW_SECS {
        return Err(InteractionError::StaleTimestamp);
    }
    Ok(())
}

/// Interaction response carrying a channel message.
pub fn render_reply(reply: &Reply) -> Value {
    let mut data = serde_json::Map::new();
    if let Some(content) = &reply.content {
        data.insert("content".into(), json!(content));
    }
    if let Some(embed) = &reply.embed {
        data.insert(
            "embeds".into(),
            json!([{ "title": embed.title, "description": embed.description, "color": embed.color }]),
        );
    }
    if let Some(button) = &reply.button {
        // action row (1) holding one link-style (5) button (2)
        data.insert(
            "components".into(),
            json!([{ "type": 1, "components": [{ "type": 2, "style": 5, "label": button.label, "url": button.url }] }]),
        );
    }
    if reply.ephemeral {
        data.insert("flags".into(), json!(EPHEMERAL_FLAG));
    }
    json!({ "type": CHANNEL_MESSAGE_WITH_SOURCE, "data": data })
}

// TODO: answer `join` with a deferred response (type 5) and edit the original
// message afterwards; large batches can outlast Discord's 3 second reply window.
pub async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, InteractionError> {
    let key = state.public_key.as_ref().ok_or(InteractionError::NotConfigured)?;
    verify_signature(key, &headers, &body, Utc::now().timestamp())?;

    let interaction: Interaction =
        serde_json::from_slice(&body).map_err(|e| InteractionError::BadPayload(e.to_string()))?;

    match interaction.kind {
        PING => {
            debug!("interaction ping");
            Ok(Json(json!({ "type": PONG })))
        }
        APPLICATION_COMMAND => {
            let ctx = interaction.context();
            let data = interaction
                .data
                .ok_or_else(|| InteractionError::BadPayload("command without data".into()))?;
            // A started join batch must finish even when Discord drops the request.
            let dispatcher = state.dispatcher.clone();
            let reply = tokio::spawn(async move {
                dispatcher.handle(&data.name, &data.options, &ctx).await
            })
            .await?;
            Ok(Json(render_reply(&reply)))
        }
        other => Err(InteractionError::UnsupportedType(other)),
    }
}
