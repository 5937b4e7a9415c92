use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use service::errors::CallbackError;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

pub const MISSING_CODE_MESSAGE: &str = "Code manquant.";
pub const EXCHANGE_FAILED_MESSAGE: &str = "Erreur OAuth2";

/// HTTP face of a failed OAuth2 callback. Every exchange failure renders the
/// same 500 body; the detail only goes to the log.
#[derive(Debug)]
pub enum CallbackFailure {
    Callback(CallbackError),
    /// The exchange task panicked or was cancelled.
    Aborted(JoinError),
}

impl IntoResponse for CallbackFailure {
    fn into_response(self) -> Response {
        match self {
            CallbackFailure::Callback(CallbackError::MissingCode) => {
                (StatusCode::BAD_REQUEST, MISSING_CODE_MESSAGE).into_response()
            }
            CallbackFailure::Callback(CallbackError::Exchange(e)) => {
                error!(error = %e, "oauth2 exchange failed");
                (StatusCode::INTERNAL_SERVER_ERROR, EXCHANGE_FAILED_MESSAGE).into_response()
            }
            CallbackFailure::Aborted(e) => {
                error!(error = %e, "oauth2 exchange task aborted");
                (StatusCode::INTERNAL_SERVER_ERROR, EXCHANGE_FAILED_MESSAGE).into_response()
            }
        }
    }
}

/// Failures of `/interactions` requests. Command errors are not among them;
/// those become ephemeral replies.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("interaction verification key not configured")]
    NotConfigured,
    #[error("missing signature headers")]
    MissingSignature,
    #[error("invalid request signature")]
    InvalidSignature,
    #[error("request timestamp outside the accepted window")]
    StaleTimestamp,
    #[error("invalid interaction payload: {0}")]
    BadPayload(String),
    #[error("unsupported interaction type {0}")]
    UnsupportedType(u8),
    #[error("command task aborted: {0}")]
    Aborted(#[from] JoinError),
}

impl IntoResponse for InteractionError {
    fn into_response(self) -> Response {
        let status = match self {
            InteractionError::NotConfigured
            | InteractionError::MissingSignature
            | InteractionError::InvalidSignature
            | InteractionError::StaleTimestamp => StatusCode::UNAUTHORIZED,
            InteractionError::BadPayload(_) | InteractionError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
            InteractionError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = self.to_string();
        warn!(error = %msg, "interaction rejected");
        (status, Json(serde_json::json!({"error": msg}))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
