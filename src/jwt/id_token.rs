//! ID token signing and verification.
//!
//! ID tokens are stateless: validity depends on signature and expiry only,
//! so an issued token cannot be revoked before it expires. Keep the TTL
//! short and end sessions through refresh-token revocation.

use crate::error::TokenError;
use crate::jwt::claims::IdTokenClaims;
use crate::jwt::keys::IdTokenKeys;
use crate::jwt::serializer::JwtSerializer;
use crate::model::User;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Sign an ID token for `user`, valid for `ttl` from `now`.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the key cannot sign for the configured
/// algorithm.
pub fn make_id_token(
    user: &User,
    keys: &IdTokenKeys,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, TokenError> {
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::signing("ID token expiry out of range"))?;
    let claims = IdTokenClaims::new(user.clone(), now, expires);

    JwtSerializer::new(keys.algorithm()).serialize(
        &claims,
        keys.encoding_key(),
        Some(keys.key_id()),
    )
}

/// Verify an ID token and return the embedded user.
///
/// # Errors
///
/// Returns [`TokenError::InvalidCredential`] if the signature, structure or
/// expiry check fails.
pub fn verify_id_token(
    token: &str,
    keys: &IdTokenKeys,
    now: DateTime<Utc>,
) -> Result<User, TokenError> {
    let claims: IdTokenClaims = JwtSerializer::new(keys.algorithm())
        .deserialize(token, keys.decoding_key(), now.timestamp())
        .map_err(|e| {
            debug!(error = %e, "ID token rejected");
            e
        })?;

    Ok(claims.user)
}
