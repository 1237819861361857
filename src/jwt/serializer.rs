use crate::error::TokenError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Claims carrying an `exp` timestamp in unix seconds.
pub trait Expiring {
    fn expires_at(&self) -> i64;

    /// Valid through the expiry second itself.
    fn is_valid_at(&self, timestamp: i64) -> bool {
        timestamp <= self.expires_at()
    }
}

/// Encodes and decodes signed JWTs for a single algorithm.
///
/// Expiry is checked against the caller-supplied `now` rather than the
/// system clock, with no leeway: a token is valid while `now <= exp`.
pub struct JwtSerializer {
    algorithm: Algorithm,
}

impl JwtSerializer {
    #[must_use]
    pub const fn new(algorithm: Algorithm) -> Self {
        JwtSerializer { algorithm }
    }

    pub fn serialize<C: Serialize>(
        &self,
        claims: &C,
        key: &EncodingKey,
        key_id: Option<&str>,
    ) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm);
        if let Some(kid) = key_id {
            header.kid = Some(kid.to_string());
        }

        encode(&header, claims, key).map_err(|e| TokenError::signing(e.to_string()))
    }

    /// Verify the signature, then the expiry. Claims are only returned once
    /// both checks pass.
    pub fn deserialize<C: DeserializeOwned + Expiring>(
        &self,
        token: &str,
        key: &DecodingKey,
        now: i64,
    ) -> Result<C, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let token_data = decode::<C>(token, key, &validation)
            .map_err(|e| TokenError::invalid_credential(e.to_string()))?;

        if !token_data.claims.is_valid_at(now) {
            return Err(TokenError::invalid_credential("token expired"));
        }

        Ok(token_data.claims)
    }
}
