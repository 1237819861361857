//! In-process token store for development and tests.

use super::{token_key, user_prefix, RefreshTokenStore};
use crate::clock::{Clock, SystemClock};
use crate::error::TokenError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Upper bound on live records before expired entries are swept.
const SWEEP_THRESHOLD: usize = 10_000;

struct Entry {
    expires_at: DateTime<Utc>,
}

/// Token store backed by a map guarded by a single lock.
///
/// Expiry is evaluated against the injected clock, so tests can move time
/// forward and observe TTL removal.
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Whether a live record exists for `(uid, token_id)`.
    pub async fn contains(&self, uid: Uuid, token_id: Uuid) -> bool {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        entries
            .get(&token_key(uid, token_id))
            .is_some_and(|entry| entry.expires_at > now)
    }

    /// Number of live records for `uid`.
    pub async fn count_for_user(&self, uid: Uuid) -> usize {
        let now = self.clock.now();
        let prefix = user_prefix(uid);
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|(key, entry)| key.starts_with(&prefix) && entry.expires_at > now)
            .count()
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, TokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::store(format!("Invalid TTL: {}", e)))?;
        Ok(self.clock.now() + ttl)
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryTokenStore {
    async fn set(&self, uid: Uuid, token_id: Uuid, ttl: Duration) -> Result<(), TokenError> {
        let expires_at = self.expiry(ttl)?;
        let now = self.clock.now();

        let mut entries = self.entries.write().await;
        entries.insert(token_key(uid, token_id), Entry { expires_at });

        if entries.len() > SWEEP_THRESHOLD {
            entries.retain(|_, entry| entry.expires_at > now);
        }

        Ok(())
    }

    async fn delete_if_present(&self, uid: Uuid, token_id: Uuid) -> Result<(), TokenError> {
        let now = self.clock.now();

        // Removal and the presence check happen under one write guard.
        let removed = self.entries.write().await.remove(&token_key(uid, token_id));

        match removed {
            Some(entry) if entry.expires_at > now => Ok(()),
            _ => Err(TokenError::invalid_token("refresh token not found")),
        }
    }

    async fn delete_all_for_user(&self, uid: Uuid) -> Result<(), TokenError> {
        let prefix = user_prefix(uid);
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }
}
