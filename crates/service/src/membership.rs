//! Bulk "join": add the earliest authorized users to a guild.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::discord::DiscordApi;
use crate::errors::MembershipAddError;
use crate::observability::{MEMBER_ADD_ATTEMPTS_TOTAL, MEMBER_ADD_FAILURES_TOTAL};
use crate::storage::RecordStore;

pub const NO_USERS_MESSAGE: &str = "Aucun utilisateur authentifié.";

#[derive(Debug)]
pub struct JoinReport {
    pub guild_id: String,
    pub attempted: usize,
    pub added: usize,
    pub failures: Vec<MembershipAddError>,
}

#[derive(Debug)]
pub enum JoinOutcome {
    /// The store holds no users; nothing was attempted.
    NoUsers,
    Attempted(JoinReport),
}

impl JoinOutcome {
    /// Reply text. Reports the attempted count, not the number actually added.
    pub fn message(&self) -> String {
        match self {
            JoinOutcome::NoUsers => NO_USERS_MESSAGE.to_string(),
            JoinOutcome::Attempted(report) => {
                format!("{} utilisateurs ont été ajoutés.", report.attempted)
            }
        }
    }
}

#[derive(Clone)]
pub struct MembershipService {
    api: Arc<dyn DiscordApi>,
    store: Arc<RecordStore>,
}

impl MembershipService {
    pub fn new(api: Arc<dyn DiscordApi>, store: Arc<RecordStore>) -> Self {
        Self { api, store }
    }

    /// Add up to `count` stored users, oldest first, to `guild_id`.
    ///
    /// Calls run one after another. A failed call is logged and counted and
    /// the remaining users are still attempted.
    #[instrument(skip(self))]
    pub async fn join_users(&self, guild_id: &str, count: usize) -> JoinOutcome {
        if self.store.is_empty().await {
            debug!("no authorized users stored");
            return JoinOutcome::NoUsers;
        }

        let selected = self.store.read_prefix(count).await;
        let mut failures = Vec::new();
        for record in &selected {
            MEMBER_ADD_ATTEMPTS_TOTAL.inc();
            if let Err(source) = self
                .api
                .add_guild_member(guild_id, &record.id, &record.access_token)
                .await
            {
                MEMBER_ADD_FAILURES_TOTAL.inc();
                error!(user_id = %record.id, error = %source, "failed to add guild member");
                failures.push(MembershipAddError { user_id: record.id.clone(), source });
            }
        }

        let attempted = selected.len();
        let added = attempted - failures.len();
        info!(attempted, added, failed = failures.len(), "join batch finished");
        JoinOutcome::Attempted(JoinReport {
            guild_id: guild_id.to_string(),
            attempted,
            added,
            failures,
        })
    }
}
