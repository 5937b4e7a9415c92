//! OAuth2 authorization-code callback: code -> token -> identity -> stored record.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::discord::DiscordApi;
use crate::errors::{CallbackError, ExchangeError};
use crate::observability::{OAUTH_EXCHANGE_FAILURES_TOTAL, RECORDS_APPENDED_TOTAL};
use crate::storage::{RecordStore, UserRecord};

pub struct ExchangeService {
    api: Arc<dyn DiscordApi>,
    store: Arc<RecordStore>,
}

impl ExchangeService {
    pub fn new(api: Arc<dyn DiscordApi>, store: Arc<RecordStore>) -> Self {
        Self { api, store }
    }

    /// Complete the authorization for `code` and persist the resulting user.
    ///
    /// An absent or empty code fails with [`CallbackError::MissingCode`]
    /// before any outbound call. Every later failure is an
    /// [`ExchangeError`]; nothing is retried.
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, code: Option<&str>) -> Result<UserRecord, CallbackError> {
        let code = code.filter(|c| !c.is_empty()).ok_or(CallbackError::MissingCode)?;
        match self.exchange(code).await {
            Ok(record) => Ok(record),
            Err(e) => {
                OAUTH_EXCHANGE_FAILURES_TOTAL.inc();
                Err(e.into())
            }
        }
    }

    async fn exchange(&self, code: &str) -> Result<UserRecord, ExchangeError> {
        let grant = self.api.exchange_code(code).await.map_err(ExchangeError::Token)?;
        let user = self
            .api
            .current_user(&grant.access_token)
            .await
            .map_err(ExchangeError::Identity)?;

        let record = UserRecord { id: user.id, access_token: grant.access_token };
        self.store
            .append(record.clone())
            .await
            .map_err(ExchangeError::Persistence)?;
        RECORDS_APPENDED_TOTAL.inc();
        info!(user_id = %record.id, username = ?user.username, "user authorized");
        Ok(record)
    }
}
