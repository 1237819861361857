//! Token issuance, rotation, validation and sign-out.
//!
//! The service holds no mutable state; every piece of session state lives
//! in the injected [`RefreshTokenStore`]. Share it behind an `Arc` across
//! request tasks.
//!
//! Rotation deletes the predecessor record *before* minting the successor.
//! Issuing first would let a replayed refresh token obtain a fresh pair
//! before its predecessor is invalidated.

use crate::clock::{Clock, SystemClock};
use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::jwt::{make_id_token, verify_id_token};
use crate::metrics;
use crate::model::{IdToken, RefreshToken, TokenPair, User};
use crate::refresh::{make_refresh_token, verify_refresh_token};
use crate::storage::RefreshTokenStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const ID_TOKEN_REJECTED: &str = "Unable to verify user from idToken";
const REFRESH_TOKEN_REJECTED: &str = "Unable to verify user from refresh token";

pub struct TokenService {
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    config: TokenConfig,
    id_token_ttl: chrono::Duration,
    refresh_token_ttl: chrono::Duration,
}

impl TokenService {
    /// # Errors
    ///
    /// Returns a configuration error if a TTL does not fit a signed
    /// timestamp offset.
    pub fn new(config: TokenConfig, store: Arc<dyn RefreshTokenStore>) -> Result<Self, TokenError> {
        let id_token_ttl = to_signed(config.id_token_ttl, "ID_TOKEN_EXP")?;
        let refresh_token_ttl = to_signed(config.refresh_token_ttl, "REFRESH_TOKEN_EXP")?;

        Ok(TokenService {
            store,
            clock: Arc::new(SystemClock),
            config,
            id_token_ttl,
            refresh_token_ttl,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue an ID/refresh token pair for `user`.
    ///
    /// With `previous_token_id` set this is a rotation: the predecessor's
    /// store record is removed first, and a missing record aborts with
    /// [`TokenError::InvalidToken`] before anything is minted.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InvalidToken`] if the predecessor was already
    ///   consumed, expired or revoked.
    /// - [`TokenError::Internal`] on signing or store failure.
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    pub async fn issue_pair(
        &self,
        user: &User,
        previous_token_id: Option<Uuid>,
    ) -> Result<TokenPair, TokenError> {
        if let Some(previous) = previous_token_id {
            self.consume(user.uid, previous).await?;
        }

        let now = self.clock.now();

        let id_token = make_id_token(user, &self.config.id_keys, self.id_token_ttl, now)
            .map_err(|e| {
                error!(error = %e, "Error generating idToken");
                TokenError::Internal
            })?;

        let refresh = make_refresh_token(
            user.uid,
            &self.config.refresh_secret,
            self.refresh_token_ttl,
            now,
        )
        .map_err(|e| {
            error!(error = %e, "Error generating refreshToken");
            TokenError::Internal
        })?;

        let store_ttl = refresh.expires_in.to_std().map_err(|e| {
            error!(error = %e, "Refresh token lifetime is negative");
            TokenError::Internal
        })?;

        self.with_deadline("set", self.store.set(user.uid, refresh.id, store_ttl))
            .await
            .map_err(|e| {
                error!(token_id = %refresh.id, error = %e, "Error storing refresh token id");
                TokenError::Internal
            })?;

        metrics::record_token_issued("id");
        metrics::record_token_issued("refresh");
        if previous_token_id.is_some() {
            metrics::record_rotation("success");
        }

        info!(token_id = %refresh.id, rotated = previous_token_id.is_some(), "Issued token pair");

        Ok(TokenPair {
            id_token: IdToken { signed: id_token },
            refresh_token: RefreshToken {
                signed: refresh.signed,
                id: refresh.id,
                uid: user.uid,
            },
        })
    }

    /// Verify an ID token and return the user snapshot it carries.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Authorization`] for any bad, expired or
    /// malformed token, without saying which.
    pub fn validate_id_token(&self, token: &str) -> Result<User, TokenError> {
        match verify_id_token(token, &self.config.id_keys, self.clock.now()) {
            Ok(user) => {
                metrics::record_validation("id", "success");
                Ok(user)
            }
            Err(e) => {
                info!(error = %e, "Unable to validate or parse idToken");
                metrics::record_validation("id", "rejected");
                Err(TokenError::authorization(ID_TOKEN_REJECTED))
            }
        }
    }

    /// Verify a refresh token's signature and expiry.
    ///
    /// The store is not consulted: a verified token may already be
    /// consumed or revoked. Pass the returned id to
    /// [`issue_pair`](Self::issue_pair), which enforces presence.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Authorization`] for any bad, expired or
    /// malformed token, without saying which.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshToken, TokenError> {
        match verify_refresh_token(token, &self.config.refresh_secret, self.clock.now()) {
            Ok(verified) => {
                metrics::record_validation("refresh", "success");
                Ok(RefreshToken {
                    signed: token.to_string(),
                    id: verified.id,
                    uid: verified.uid,
                })
            }
            Err(e) => {
                info!(error = %e, "Unable to validate or parse refreshToken");
                metrics::record_validation("refresh", "rejected");
                Err(TokenError::authorization(REFRESH_TOKEN_REJECTED))
            }
        }
    }

    /// Revoke every refresh token of `uid`. Already-issued ID tokens stay
    /// valid until they expire.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Internal`] if any record could not be removed.
    #[instrument(skip(self))]
    pub async fn signout(&self, uid: Uuid) -> Result<(), TokenError> {
        match self
            .with_deadline("delete_all", self.store.delete_all_for_user(uid))
            .await
        {
            Ok(()) => {
                metrics::record_signout("success");
                info!("Signed out user");
                Ok(())
            }
            Err(e) => {
                metrics::record_signout("error");
                error!(error = %e, "Could not delete refresh tokens");
                Err(TokenError::Internal)
            }
        }
    }

    async fn consume(&self, uid: Uuid, token_id: Uuid) -> Result<(), TokenError> {
        match self
            .with_deadline("delete", self.store.delete_if_present(uid, token_id))
            .await
        {
            Ok(()) => Ok(()),
            Err(TokenError::InvalidToken(msg)) => {
                warn!(
                    uid = %uid,
                    token_id = %token_id,
                    "Refresh token not found - reused, expired or revoked"
                );
                metrics::record_rotation("rejected");
                metrics::record_security_event(metrics::REFRESH_TOKEN_REUSE);
                Err(TokenError::InvalidToken(msg))
            }
            Err(e) => {
                error!(
                    uid = %uid,
                    token_id = %token_id,
                    error = %e,
                    "Could not delete previous refresh token"
                );
                metrics::record_rotation("error");
                Err(TokenError::Internal)
            }
        }
    }

    async fn with_deadline<T, F>(&self, operation: &'static str, fut: F) -> Result<T, TokenError>
    where
        F: Future<Output = Result<T, TokenError>>,
    {
        let timeout = self.config.store_timeout;
        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TokenError::store(format!(
                "{} timed out after {:?}",
                operation, timeout
            ))),
        };

        let status = match &result {
            Ok(_) => "success",
            Err(TokenError::InvalidToken(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::record_store_operation(operation, status);

        result
    }
}

fn to_signed(ttl: Duration, name: &str) -> Result<chrono::Duration, TokenError> {
    chrono::Duration::from_std(ttl)
        .map_err(|e| TokenError::config(format!("{} out of range: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::jwt::IdTokenKeys;
    use crate::refresh::RefreshSecret;
    use crate::storage::MemoryTokenStore;

    fn service() -> (TokenService, Arc<MemoryTokenStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryTokenStore::with_clock(clock.clone()));
        let config = TokenConfig::new(
            IdTokenKeys::generate_es256().unwrap(),
            RefreshSecret::new(vec![42u8; 32]).unwrap(),
        )
        .with_id_token_ttl(Duration::from_secs(60))
        .with_refresh_token_ttl(Duration::from_secs(3600));

        let service = TokenService::new(config, store.clone())
            .unwrap()
            .with_clock(clock.clone());
        (service, store, clock)
    }

    fn user() -> User {
        User::new(Uuid::new_v4(), "lin@example.com").with_name("Lin")
    }

    #[tokio::test]
    async fn test_issue_records_refresh_token() {
        let (service, store, _) = service();
        let user = user();

        let pair = service.issue_pair(&user, None).await.unwrap();

        assert_eq!(pair.refresh_token.uid, user.uid);
        assert!(store.contains(user.uid, pair.refresh_token.id).await);
    }

    #[tokio::test]
    async fn test_rotation_consumes_predecessor() {
        let (service, store, _) = service();
        let user = user();

        let first = service.issue_pair(&user, None).await.unwrap();
        let second = service
            .issue_pair(&user, Some(first.refresh_token.id))
            .await
            .unwrap();

        assert_ne!(first.refresh_token.id, second.refresh_token.id);
        assert!(!store.contains(user.uid, first.refresh_token.id).await);
        assert!(store.contains(user.uid, second.refresh_token.id).await);
    }

    #[tokio::test]
    async fn test_replayed_rotation_mints_nothing() {
        let (service, store, _) = service();
        let user = user();

        let first = service.issue_pair(&user, None).await.unwrap();
        service
            .issue_pair(&user, Some(first.refresh_token.id))
            .await
            .unwrap();

        let replay = service.issue_pair(&user, Some(first.refresh_token.id)).await;

        assert!(matches!(replay, Err(TokenError::InvalidToken(_))));
        assert_eq!(store.count_for_user(user.uid).await, 1);
    }

    #[tokio::test]
    async fn test_validate_id_token_hides_reason() {
        let (service, _, clock) = service();
        let pair = service.issue_pair(&user(), None).await.unwrap();

        clock.advance(chrono::Duration::seconds(61));
        let expired = service.validate_id_token(&pair.id_token.signed).unwrap_err();
        let garbage = service.validate_id_token("a.b.c").unwrap_err();

        assert_eq!(expired.to_string(), garbage.to_string());
        assert!(matches!(expired, TokenError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_refresh_validation_ignores_store() {
        let (service, store, _) = service();
        let user = user();
        let pair = service.issue_pair(&user, None).await.unwrap();

        store.delete_all_for_user(user.uid).await.unwrap();

        let validated = service
            .validate_refresh_token(&pair.refresh_token.signed)
            .unwrap();
        assert_eq!(validated.id, pair.refresh_token.id);
        assert_eq!(validated.uid, user.uid);
    }

    #[tokio::test]
    async fn test_expired_record_cannot_rotate() {
        let (service, _, clock) = service();
        let user = user();
        let pair = service.issue_pair(&user, None).await.unwrap();

        clock.advance(chrono::Duration::seconds(3600));

        let result = service.issue_pair(&user, Some(pair.refresh_token.id)).await;
        assert!(matches!(result, Err(TokenError::InvalidToken(_))));
    }
}
