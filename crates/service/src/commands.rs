//! Slash command parsing and dispatch.
//!
//! Command names and options arrive as strings and loose JSON; they are
//! resolved once into [`Command`] and everything past that point is typed.

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::CommandError;
use crate::membership::MembershipService;
use crate::observability::INTERACTIONS_TOTAL;

pub const AUTH_COMMAND: &str = "auth";
pub const JOIN_COMMAND: &str = "join";
pub const JOIN_COUNT_OPTION: &str = "nombre";

/// Embed colour for the authorization prompt ("Blue").
pub const AUTH_EMBED_COLOR: u32 = 0x3498DB;

/// One option of an invoked command, as sent by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth,
    Join { count: usize },
}

impl Command {
    pub fn parse(name: &str, options: &[CommandOption]) -> Result<Self, CommandError> {
        match name {
            AUTH_COMMAND => Ok(Command::Auth),
            JOIN_COMMAND => {
                let raw = options
                    .iter()
                    .find(|o| o.name == JOIN_COUNT_OPTION)
                    .and_then(|o| o.value.as_ref())
                    .ok_or(CommandError::MissingArgument(JOIN_COUNT_OPTION))?;
                let n = raw.as_i64().ok_or_else(|| CommandError::InvalidArgument {
                    name: JOIN_COUNT_OPTION,
                    reason: "un entier est attendu".to_string(),
                })?;
                // n <= 0 selects nobody; the empty-store answer still applies
                let count = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
                Ok(Command::Join { count })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Where a command was invoked from.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    pub guild_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// Message sent back to the invoker, exactly once per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub button: Option<LinkButton>,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl Reply {
    pub fn ephemeral_text(text: impl Into<String>) -> Self {
        Self { content: Some(text.into()), ephemeral: true, ..Default::default() }
    }
}

impl From<&CommandError> for Reply {
    fn from(err: &CommandError) -> Self {
        Reply::ephemeral_text(err.user_message())
    }
}

pub struct Dispatcher {
    membership: MembershipService,
    authorize_url: String,
}

impl Dispatcher {
    pub fn new(membership: MembershipService, authorize_url: String) -> Self {
        Self { membership, authorize_url }
    }

    pub async fn dispatch(&self, command: Command, ctx: &InvocationContext) -> Result<Reply, CommandError> {
        INTERACTIONS_TOTAL.inc();
        match command {
            Command::Auth => Ok(self.auth_prompt()),
            Command::Join { count } => {
                let guild_id = ctx.guild_id.as_deref().ok_or(CommandError::NotInGuild)?;
                info!(guild_id, count, invoker = ?ctx.user_id, "join requested");
                let outcome = self.membership.join_users(guild_id, count).await;
                Ok(Reply::ephemeral_text(outcome.message()))
            }
        }
    }

    /// Parse and dispatch; command errors become ephemeral replies.
    pub async fn handle(&self, name: &str, options: &[CommandOption], ctx: &InvocationContext) -> Reply {
        let result = match Command::parse(name, options) {
            Ok(command) => self.dispatch(command, ctx).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(command = name, error = %e, "command rejected");
            Reply::from(&e)
        })
    }

    fn auth_prompt(&self) -> Reply {
        Reply {
            content: None,
            embed: Some(Embed {
                title: "Connexion nécessaire".to_string(),
                description: "Clique pour t’authentifier.".to_string(),
                color: AUTH_EMBED_COLOR,
            }),
            button: Some(LinkButton {
                label: "S’authentifier".to_string(),
                url: self.authorize_url.clone(),
            }),
            ephemeral: false,
        }
    }
}
