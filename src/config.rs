//! Service configuration.
//!
//! All values are loaded from environment variables (optionally seeded from
//! a `.env` file) and validated at startup. Nothing changes after
//! construction.

use crate::error::TokenError;
use crate::jwt::IdTokenKeys;
use crate::logging::TracingConfig;
use crate::refresh::RefreshSecret;
use std::env;
use std::time::Duration;
use tracing::warn;

/// ID token signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// RSA with SHA-256
    RS256,
    /// RSA-PSS with SHA-256
    PS256,
    /// ECDSA with P-256 and SHA-256
    ES256,
}

impl JwtAlgorithm {
    /// Parse algorithm from string.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        match s.to_uppercase().as_str() {
            "RS256" => Ok(Self::RS256),
            "PS256" => Ok(Self::PS256),
            "ES256" => Ok(Self::ES256),
            _ => Err(TokenError::config(format!("Invalid JWT algorithm: {}", s))),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::PS256 => "PS256",
            Self::ES256 => "ES256",
        }
    }
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::RS256 => Self::RS256,
            JwtAlgorithm::PS256 => Self::PS256,
            JwtAlgorithm::ES256 => Self::ES256,
        }
    }
}

/// Everything the token service needs to sign, verify and record tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// ID token key pair
    pub id_keys: IdTokenKeys,
    /// Refresh token HS256 secret
    pub refresh_secret: RefreshSecret,
    /// ID token lifetime
    pub id_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Deadline applied to every token store call
    pub store_timeout: Duration,
}

impl TokenConfig {
    #[must_use]
    pub fn new(id_keys: IdTokenKeys, refresh_secret: RefreshSecret) -> Self {
        Self {
            id_keys,
            refresh_secret,
            id_token_ttl: Duration::from_secs(DEFAULT_ID_TOKEN_TTL),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }

    #[must_use]
    pub const fn with_id_token_ttl(mut self, ttl: Duration) -> Self {
        self.id_token_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub tokens: TokenConfig,
    /// Token store backend
    pub redis_url: String,
    pub tracing: TracingConfig,
}

pub const DEFAULT_ID_TOKEN_TTL: u64 = 900;
pub const DEFAULT_REFRESH_TOKEN_TTL: u64 = 259_200;
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2_000;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured_algorithm = lookup("ID_TOKEN_ALGORITHM");
        let algorithm = JwtAlgorithm::parse(configured_algorithm.as_deref().unwrap_or("RS256"))?;
        let id_keys = load_id_keys(&lookup, algorithm, configured_algorithm.is_some())?;
        let refresh_secret = match lookup("REFRESH_SECRET") {
            Some(secret) => RefreshSecret::new(secret.into_bytes())?,
            None => {
                warn!("REFRESH_SECRET not set, generating a random secret for development");
                RefreshSecret::generate()
            }
        };

        let id_token_ttl = positive_secs(&lookup, "ID_TOKEN_EXP", DEFAULT_ID_TOKEN_TTL)?;
        let refresh_token_ttl =
            positive_secs(&lookup, "REFRESH_TOKEN_EXP", DEFAULT_REFRESH_TOKEN_TTL)?;
        let store_timeout = Duration::from_millis(parse_var(
            &lookup,
            "STORE_TIMEOUT_MS",
            DEFAULT_STORE_TIMEOUT_MS,
        )?);

        if refresh_token_ttl <= id_token_ttl {
            warn!(
                id_token_ttl = id_token_ttl.as_secs(),
                refresh_token_ttl = refresh_token_ttl.as_secs(),
                "Refresh tokens expire no later than ID tokens"
            );
        }

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());

        let mut tracing = TracingConfig::default()
            .with_log_level(lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()));
        if parse_var(&lookup, "LOG_JSON", false)? {
            tracing = tracing.with_json_output();
        }

        Ok(Self {
            tokens: TokenConfig {
                id_keys,
                refresh_secret,
                id_token_ttl,
                refresh_token_ttl,
                store_timeout,
            },
            redis_url,
            tracing,
        })
    }
}

/// Without key files an ephemeral ES256 pair is generated, unless another
/// algorithm was asked for explicitly.
fn load_id_keys<F>(
    lookup: &F,
    algorithm: JwtAlgorithm,
    explicit: bool,
) -> Result<IdTokenKeys, TokenError>
where
    F: Fn(&str) -> Option<String>,
{
    match (lookup("PRIV_KEY_FILE"), lookup("PUB_KEY_FILE")) {
        (Some(private_path), Some(public_path)) => {
            let private_pem = std::fs::read(&private_path).map_err(|e| {
                TokenError::config(format!("Could not read private key {}: {}", private_path, e))
            })?;
            let public_pem = std::fs::read(&public_path).map_err(|e| {
                TokenError::config(format!("Could not read public key {}: {}", public_path, e))
            })?;
            IdTokenKeys::from_pem(algorithm, &private_pem, &public_pem)
        }
        (None, None) if explicit && algorithm != JwtAlgorithm::ES256 => {
            Err(TokenError::config(format!(
                "ID_TOKEN_ALGORITHM={} requires PRIV_KEY_FILE and PUB_KEY_FILE",
                algorithm.as_str()
            )))
        }
        (None, None) => {
            warn!("PRIV_KEY_FILE/PUB_KEY_FILE not set, generating an ephemeral ES256 key pair");
            IdTokenKeys::generate_es256()
        }
        _ => Err(TokenError::config(
            "PRIV_KEY_FILE and PUB_KEY_FILE must be set together",
        )),
    }
}

/// Parse variable with default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

fn positive_secs<F>(lookup: &F, name: &str, default: u64) -> Result<Duration, TokenError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_var(lookup, name, default)?;
    if secs == 0 {
        return Err(TokenError::config(format!("{} must be positive", name)));
    }
    Ok(Duration::from_secs(secs))
}
