//! Error taxonomy for token issuance, verification and revocation.
//!
//! Variants fall into three groups: server-side faults (`Signing`, `Store`,
//! `Internal`, `Config`), credential faults (`InvalidCredential`,
//! `Authorization`) and rotation faults (`InvalidToken`). Only the
//! credential and rotation groups are meant to reach callers with anything
//! beyond an opaque message.

use thiserror::Error;

/// Message returned to callers for every server-side fault.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Error, Debug)]
pub enum TokenError {
    /// Asymmetric or symmetric signing failed (bad key material, wrong
    /// key family for the configured algorithm).
    #[error("Token signing failed: {0}")]
    Signing(String),

    /// A presented token failed signature, structure or expiry checks.
    /// The reason is kept for server-side logs only.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Caller is not authorized. Carries a generic, caller-safe message.
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// Rotation target not present in the store: consumed, expired or
    /// revoked refresh token.
    #[error("Invalid refresh token: {0}")]
    InvalidToken(String),

    #[error("Token store error: {0}")]
    Store(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Opaque server-side failure. Details were logged where they occurred.
    #[error("{}", INTERNAL_MESSAGE)]
    Internal,
}

impl TokenError {
    #[must_use]
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    #[must_use]
    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::InvalidCredential(msg.into())
    }

    #[must_use]
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    #[must_use]
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stable error code for transport responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredential(_) | Self::Authorization(_) => UNAUTHORIZED,
            Self::InvalidToken(_) => TOKEN_REFRESH_INVALID,
            Self::NotFound(_) => NOT_FOUND,
            Self::Conflict(_) => CONFLICT,
            Self::Signing(_) | Self::Store(_) | Self::Config(_) | Self::Internal => INTERNAL,
        }
    }

    /// HTTP status the transport layer should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidCredential(_) | Self::Authorization(_) | Self::InvalidToken(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Signing(_) | Self::Store(_) | Self::Config(_) | Self::Internal => 500,
        }
    }

    /// Message that is safe to hand to an untrusted caller.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Authorization(msg) | Self::InvalidToken(msg) => msg.clone(),
            Self::InvalidCredential(_) => "Not authorized".to_string(),
            Self::NotFound(_) | Self::Conflict(_) => self.to_string(),
            Self::Signing(_) | Self::Store(_) | Self::Config(_) | Self::Internal => {
                INTERNAL_MESSAGE.to_string()
            }
        }
    }
}

impl From<redis::RedisError> for TokenError {
    fn from(err: redis::RedisError) -> Self {
        TokenError::Store(err.to_string())
    }
}

// Error codes for transport responses
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const TOKEN_REFRESH_INVALID: &str = "TOKEN_REFRESH_INVALID";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const CONFLICT: &str = "CONFLICT";
pub const INTERNAL: &str = "INTERNAL";
