use crate::jwt::serializer::Expiring;
use crate::model::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ID token payload: a full user snapshot plus issue/expiry times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    pub user: User,
    pub iat: i64,
    pub exp: i64,
}

impl IdTokenClaims {
    pub fn new(user: User, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        IdTokenClaims {
            user,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

impl Expiring for IdTokenClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}
