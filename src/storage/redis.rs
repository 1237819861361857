use super::{token_key, user_prefix, RefreshTokenStore};
use crate::error::TokenError;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{error, instrument, warn};
use uuid::Uuid;

/// Keys requested per SCAN round trip during bulk sign-out.
const SCAN_BATCH: usize = 100;

/// Redis-backed token store.
///
/// Records are plain `SET key 0 EX ttl` entries. `delete_if_present` relies
/// on `DEL` returning the number of removed keys, which makes the presence
/// check and the delete a single atomic command.
#[derive(Clone)]
pub struct RedisTokenStore {
    conn: ConnectionManager,
}

impl RedisTokenStore {
    pub async fn new(redis_url: &str) -> Result<Self, TokenError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| TokenError::store(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| TokenError::store(e.to_string()))?;

        Ok(RedisTokenStore { conn })
    }

    #[must_use]
    pub fn from_connection(conn: ConnectionManager) -> Self {
        RedisTokenStore { conn }
    }
}

#[async_trait]
impl RefreshTokenStore for RedisTokenStore {
    #[instrument(skip(self))]
    async fn set(&self, uid: Uuid, token_id: Uuid, ttl: Duration) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let key = token_key(uid, token_id);
        // EX takes whole seconds and rejects 0.
        let seconds = (ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)).max(1);

        conn.set_ex::<_, _, ()>(&key, 0, seconds).await.map_err(|e| {
            error!(error = %e, "Could not SET refresh token");
            TokenError::from(e)
        })
    }

    #[instrument(skip(self))]
    async fn delete_if_present(&self, uid: Uuid, token_id: Uuid) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let key = token_key(uid, token_id);

        let removed: u64 = conn.del(&key).await.map_err(|e| {
            error!(error = %e, "Could not DEL refresh token");
            TokenError::from(e)
        })?;

        if removed == 0 {
            return Err(TokenError::invalid_token("refresh token not found"));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_all_for_user(&self, uid: Uuid) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let del_conn = self.conn.clone();
        let pattern = format!("{}*", user_prefix(uid));
        let mut cursor: u64 = 0;
        let mut tally = DeleteTally::default();

        loop {
            let page: Result<(u64, Vec<String>), redis::RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;

            let (next, batch) = match page {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, deleted = tally.deleted(), "Could not SCAN refresh tokens");
                    tally.scan_failed = true;
                    break;
                }
            };

            // Delete each batch as it arrives so a later SCAN failure
            // cannot strand keys already found.
            delete_each(batch, &mut tally, |key| {
                let mut conn = del_conn.clone();
                async move { conn.del::<_, u64>(&key).await.map(|_| ()) }
            })
            .await;

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tally.into_result()
    }
}

/// Running totals of a best-effort bulk delete.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DeleteTally {
    matched: usize,
    failed: usize,
    scan_failed: bool,
}

impl DeleteTally {
    fn deleted(&self) -> usize {
        self.matched - self.failed
    }

    fn into_result(self) -> Result<(), TokenError> {
        if self.failed == 0 && !self.scan_failed {
            return Ok(());
        }

        let scan_note = if self.scan_failed {
            ", key scan incomplete"
        } else {
            ""
        };
        Err(TokenError::store(format!(
            "failed to delete {} of {} refresh tokens{}",
            self.failed, self.matched, scan_note
        )))
    }
}

/// Delete every key in `keys`, continuing past individual failures.
async fn delete_each<F, Fut, E>(keys: Vec<String>, tally: &mut DeleteTally, mut delete: F)
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    for key in keys {
        tally.matched += 1;
        if let Err(e) = delete(key.clone()).await {
            warn!(key = %key, error = %e, "Failed to delete refresh token");
            tally.failed += 1;
        }
    }
}
