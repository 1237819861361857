//! Revocable refresh-token store.
//!
//! A record keyed by `(uid, token id)` exists exactly while the matching
//! refresh token may still be rotated. Rotation, expiry and sign-out all
//! remove the record, and all three look identical afterwards: not found.

pub mod memory;
pub mod redis;

pub use memory::MemoryTokenStore;
pub use self::redis::RedisTokenStore;

use crate::error::TokenError;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Record `(uid, token_id)` for `ttl`. Overwrites and refreshes the TTL
    /// of an existing record.
    async fn set(&self, uid: Uuid, token_id: Uuid, ttl: Duration) -> Result<(), TokenError>;

    /// Atomically remove `(uid, token_id)`.
    ///
    /// Returns [`TokenError::InvalidToken`] if no record was present before
    /// the call, which is how reuse of a rotated or revoked refresh token
    /// is detected. Concurrent callers racing on the same key see exactly
    /// one success.
    async fn delete_if_present(&self, uid: Uuid, token_id: Uuid) -> Result<(), TokenError>;

    /// Remove every record for `uid`. Succeeds when nothing matched. Keeps
    /// deleting past individual failures and reports them together.
    async fn delete_all_for_user(&self, uid: Uuid) -> Result<(), TokenError>;
}

/// Store key for a single refresh token.
#[must_use]
pub fn token_key(uid: Uuid, token_id: Uuid) -> String {
    format!("{}:{}", uid, token_id)
}

/// Key prefix shared by every refresh token of `uid`.
#[must_use]
pub fn user_prefix(uid: Uuid) -> String {
    format!("{}:", uid)
}
