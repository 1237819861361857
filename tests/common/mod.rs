//! Shared fixtures for integration tests.

#![allow(dead_code)]

use account_token::jwt::IdTokenKeys;
use account_token::refresh::RefreshSecret;
use account_token::{
    ManualClock, MemoryTokenStore, RefreshTokenStore, TokenConfig, TokenError, TokenService, User,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

static ES256_KEYS: Lazy<IdTokenKeys> =
    Lazy::new(|| IdTokenKeys::generate_es256().expect("ES256 key generation"));

pub const ID_TOKEN_TTL_SECS: u64 = 60;
pub const REFRESH_TOKEN_TTL_SECS: u64 = 3600;

pub fn es256_keys() -> IdTokenKeys {
    ES256_KEYS.clone()
}

pub fn refresh_secret() -> RefreshSecret {
    RefreshSecret::new(b"integration-test-refresh-secret-0123456789".to_vec()).unwrap()
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("reading {}: {}", path, e))
}

pub fn token_config() -> TokenConfig {
    TokenConfig::new(es256_keys(), refresh_secret())
        .with_id_token_ttl(Duration::from_secs(ID_TOKEN_TTL_SECS))
        .with_refresh_token_ttl(Duration::from_secs(REFRESH_TOKEN_TTL_SECS))
}

pub struct Harness {
    pub service: Arc<TokenService>,
    pub store: Arc<MemoryTokenStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(MemoryTokenStore::with_clock(clock.clone()));
    let service = TokenService::new(token_config(), store.clone())
        .unwrap()
        .with_clock(clock.clone());

    Harness {
        service: Arc::new(service),
        store,
        clock,
    }
}

pub fn service_with_store(store: Arc<dyn RefreshTokenStore>) -> TokenService {
    TokenService::new(
        token_config().with_store_timeout(Duration::from_millis(50)),
        store,
    )
    .unwrap()
}

/// Generate arbitrary users.
pub fn arb_user() -> impl Strategy<Value = User> {
    (
        any::<u128>(),
        "[a-z0-9._]{1,16}@[a-z]{1,10}\\.(com|org|io)",
        "\\PC{0,24}",
        prop::option::of("https://img\\.example\\.com/[a-z0-9]{1,12}\\.png"),
        prop::option::of("https://[a-z]{1,12}\\.dev"),
    )
        .prop_map(|(uid, email, name, image_url, website)| {
            let mut user = User::new(Uuid::from_u128(uid), email).with_name(name);
            if let Some(url) = image_url {
                user = user.with_image_url(url);
            }
            if let Some(site) = website {
                user = user.with_website(site);
            }
            user
        })
}

/// Flip one bit in one of the three base64url segments of a JWT.
pub fn flip_bit(token: &str, segment: usize, position: usize) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut bytes = URL_SAFE_NO_PAD.decode(&parts[segment]).unwrap();
    let bit = position % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
    parts[segment] = URL_SAFE_NO_PAD.encode(bytes);
    parts.join(".")
}

/// Which store operations fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct Failures {
    pub set: bool,
    pub delete: bool,
    pub delete_all: bool,
}

/// Store double with switchable backend failures and call counting.
#[derive(Default)]
pub struct FailingStore {
    pub failures: Failures,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(failures: Failures) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn call(&self, fail: bool, operation: &str) -> Result<(), TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if fail {
            Err(TokenError::store(format!("{} unavailable", operation)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RefreshTokenStore for FailingStore {
    async fn set(&self, _uid: Uuid, _token_id: Uuid, _ttl: Duration) -> Result<(), TokenError> {
        self.call(self.failures.set, "set")
    }

    async fn delete_if_present(&self, _uid: Uuid, _token_id: Uuid) -> Result<(), TokenError> {
        self.call(self.failures.delete, "delete")
    }

    async fn delete_all_for_user(&self, _uid: Uuid) -> Result<(), TokenError> {
        self.call(self.failures.delete_all, "delete_all")
    }
}

/// Store double that never answers within any reasonable deadline.
pub struct SlowStore {
    pub delay: Duration,
}

#[async_trait]
impl RefreshTokenStore for SlowStore {
    async fn set(&self, _uid: Uuid, _token_id: Uuid, _ttl: Duration) -> Result<(), TokenError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn delete_if_present(&self, _uid: Uuid, _token_id: Uuid) -> Result<(), TokenError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn delete_all_for_user(&self, _uid: Uuid) -> Result<(), TokenError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}
