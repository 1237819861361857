//! Account token library.
//!
//! Issues asymmetrically signed ID tokens and HS256 refresh tokens, records
//! refresh tokens in a revocable store, and rotates them with reuse
//! detection.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod jwt;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod refresh;
pub mod service;
pub mod session;
pub mod storage;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, JwtAlgorithm, TokenConfig};
pub use error::TokenError;
pub use model::{IdToken, RefreshToken, TokenPair, User};
pub use service::TokenService;
pub use session::{MemoryUserRepository, SessionService, UserRepository};
pub use storage::{MemoryTokenStore, RedisTokenStore, RefreshTokenStore};
