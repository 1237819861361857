//! Refresh token signing and verification.
//!
//! Verification proves only that this service issued the token and that it
//! has not expired. It never consults the token store: revocation is
//! enforced when the token is presented for rotation.

use crate::error::TokenError;
use crate::jwt::serializer::{Expiring, JwtSerializer};
use crate::refresh::secret::RefreshSecret;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenClaims {
    pub uid: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Expiring for RefreshTokenClaims {
    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// A freshly signed refresh token with the fields the issuer needs to
/// record it.
#[derive(Debug, Clone)]
pub struct RefreshTokenData {
    pub signed: String,
    pub id: Uuid,
    pub expires_in: Duration,
}

/// Identity carried by a verified refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedRefreshToken {
    pub uid: Uuid,
    pub id: Uuid,
}

/// Random token identifier, independent of every other claim.
#[must_use]
pub fn new_token_id() -> Uuid {
    Uuid::new_v4()
}

/// Sign a refresh token for `uid`.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if HS256 signing fails.
pub fn make_refresh_token(
    uid: Uuid,
    secret: &RefreshSecret,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<RefreshTokenData, TokenError> {
    let id = new_token_id();
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::signing("refresh token expiry out of range"))?;

    let claims = RefreshTokenClaims {
        uid,
        iat: now.timestamp(),
        exp: expires.timestamp(),
        jti: id.to_string(),
    };

    let signed = JwtSerializer::new(ALGORITHM).serialize(&claims, &secret.encoding_key(), None)?;

    Ok(RefreshTokenData {
        signed,
        id,
        expires_in: expires - now,
    })
}

/// Verify a refresh token's signature and expiry.
///
/// # Errors
///
/// Returns [`TokenError::InvalidCredential`] on a bad signature, malformed
/// token, expiry, or a `jti` that is not a UUID.
pub fn verify_refresh_token(
    token: &str,
    secret: &RefreshSecret,
    now: DateTime<Utc>,
) -> Result<VerifiedRefreshToken, TokenError> {
    let claims: RefreshTokenClaims = JwtSerializer::new(ALGORITHM)
        .deserialize(token, &secret.decoding_key(), now.timestamp())
        .map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            e
        })?;

    let id = Uuid::parse_str(&claims.jti).map_err(|e| {
        debug!(uid = %claims.uid, error = %e, "Refresh token id is not a UUID");
        TokenError::invalid_credential("refresh token id is not a UUID")
    })?;

    Ok(VerifiedRefreshToken { uid: claims.uid, id })
}
