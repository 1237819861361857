//! Session flows built on the token service and a user repository.

use crate::error::TokenError;
use crate::model::{TokenPair, User};
use crate::service::TokenService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// User record storage. Implementations live outside this crate; the
/// in-memory one below serves development and tests.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns [`TokenError::NotFound`] when no user has `uid`.
    async fn find_by_id(&self, uid: Uuid) -> Result<User, TokenError>;

    /// Returns [`TokenError::NotFound`] when no user has `email`.
    async fn find_by_email(&self, email: &str) -> Result<User, TokenError>;

    /// Returns [`TokenError::Conflict`] when the email is taken.
    async fn create(&self, user: User) -> Result<User, TokenError>;

    async fn update(&self, user: User) -> Result<User, TokenError>;
}

pub struct SessionService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
}

impl SessionService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    /// Token pair for a user that just signed up or signed in.
    pub async fn start_session(&self, user: &User) -> Result<TokenPair, TokenError> {
        self.tokens.issue_pair(user, None).await
    }

    /// Rotate a refresh token. The new ID token carries the user's current
    /// profile, not the one captured at sign-in.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let presented = self.tokens.validate_refresh_token(refresh_token)?;
        let user = self.load_user(presented.uid).await?;

        self.tokens.issue_pair(&user, Some(presented.id)).await
    }

    /// The stored record of the user an ID token was issued to.
    pub async fn current_user(&self, id_token: &str) -> Result<User, TokenError> {
        let claimed = self.tokens.validate_id_token(id_token)?;
        self.load_user(claimed.uid).await
    }

    /// Revoke every refresh token of the ID token's user.
    #[instrument(skip_all)]
    pub async fn end_session(&self, id_token: &str) -> Result<(), TokenError> {
        let user = self.tokens.validate_id_token(id_token)?;
        self.tokens.signout(user.uid).await?;

        info!(uid = %user.uid, "Session ended");
        Ok(())
    }

    async fn load_user(&self, uid: Uuid) -> Result<User, TokenError> {
        match self.users.find_by_id(uid).await {
            Ok(user) => Ok(user),
            Err(TokenError::NotFound(msg)) => Err(TokenError::NotFound(msg)),
            Err(e) => {
                error!(uid = %uid, error = %e, "Could not load user");
                Err(TokenError::Internal)
            }
        }
    }
}

/// User repository backed by a map, keyed by uid.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, uid: Uuid) -> Result<User, TokenError> {
        self.users
            .read()
            .await
            .get(&uid)
            .cloned()
            .ok_or_else(|| TokenError::NotFound(format!("user {}", uid)))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, TokenError> {
        self.users
            .read()
            .await
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned()
            .ok_or_else(|| TokenError::NotFound(format!("user with email {}", email)))
    }

    async fn create(&self, user: User) -> Result<User, TokenError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(TokenError::Conflict(format!("email {}", user.email)));
        }
        if users.contains_key(&user.uid) {
            return Err(TokenError::Conflict(format!("user {}", user.uid)));
        }

        users.insert(user.uid, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, TokenError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.uid) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(TokenError::NotFound(format!("user {}", user.uid))),
        }
    }
}
