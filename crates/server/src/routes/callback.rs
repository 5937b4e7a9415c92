use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::warn;

use crate::errors::CallbackFailure;
use crate::state::AppState;

/// Query of the OAuth2 redirect. Discord sends `error` instead of `code`
/// when the user cancels.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// `GET /callback`: finish the authorization and send the browser on.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, CallbackFailure> {
    if let Some(err) = params.error.as_deref() {
        warn!(error = %err, description = ?params.error_description, "authorization refused by provider");
    }
    // Spawned so a client disconnect cannot stop the exchange between the
    // token grant and the record append.
    let exchange = state.exchange.clone();
    let code = params.code;
    tokio::spawn(async move { exchange.handle_callback(code.as_deref()).await })
        .await
        .map_err(CallbackFailure::Aborted)?
        .map_err(CallbackFailure::Callback)?;
    Ok(Redirect::to(&state.external_url))
}
