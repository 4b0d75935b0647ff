// Persisted bearer-token holder shared by the dispatcher and the poller.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::db::{Database, TOKEN_KEY};

/// Best-effort durable store for the single bearer token.
///
/// Every operation swallows storage failures: a broken store reads as "no
/// credential" and a failed write never blocks the login flow. Cloning is
/// cheap and every clone observes the same underlying database.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist `token`. A blank token clears the store instead, so a stored
    /// credential is never empty.
    pub fn set(&self, token: &str) {
        let token = token.trim();
        if token.is_empty() {
            debug!("ignoring blank token, clearing credential instead");
            self.clear();
            return;
        }

        if let Err(e) = self.db.save_state(TOKEN_KEY, &Value::String(token.to_string())) {
            warn!("failed to persist credential: {e:#}");
        }
    }

    /// The stored token, or `None` when absent, blank, or unreadable.
    pub fn get(&self) -> Option<String> {
        match self.db.load_state(TOKEN_KEY) {
            Ok(Some(Value::String(token))) if !token.trim().is_empty() => Some(token),
            Ok(Some(other)) => {
                debug!("stored credential is not a usable string: {other}");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read credential: {e:#}");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.db.delete_state(TOKEN_KEY) {
            warn!("failed to clear credential: {e:#}");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}
