use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or write the user record file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot serialize records: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors from a single call against the Discord REST API.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),
}

impl From<reqwest::Error> for DiscordError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DiscordError::MalformedBody(err.to_string())
        } else {
            DiscordError::Network(err.to_string())
        }
    }
}

/// Any failure after a code was received. All variants render the same
/// user message; the variant only matters for logs.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token exchange failed: {0}")]
    Token(#[source] DiscordError),
    #[error("identity lookup failed: {0}")]
    Identity(#[source] DiscordError),
    #[error("cannot persist user record: {0}")]
    Persistence(#[source] PersistenceError),
}

#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("authorization code missing")]
    MissingCode,
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// One failed "add guild member" call. Logged and counted, never fatal.
#[derive(Debug, Error)]
#[error("cannot add user {user_id}: {source}")]
pub struct MembershipAddError {
    pub user_id: String,
    #[source]
    pub source: DiscordError,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing required option `{0}`")]
    MissingArgument(&'static str),
    #[error("invalid option `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
    #[error("command requires a guild")]
    NotInGuild,
}

impl CommandError {
    /// Text shown to the invoking user.
    pub fn user_message(&self) -> String {
        match self {
            CommandError::Unknown(name) => format!("Commande inconnue : {name}."),
            CommandError::MissingArgument(name) => format!("Option `{name}` manquante."),
            CommandError::InvalidArgument { name, reason } => {
                format!("Option `{name}` invalide : {reason}.")
            }
            CommandError::NotInGuild => "Commande disponible uniquement sur un serveur.".to_string(),
        }
    }
}
