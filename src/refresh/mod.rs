pub mod secret;
pub mod token;

pub use secret::RefreshSecret;
pub use token::{
    make_refresh_token, new_token_id, verify_refresh_token, RefreshTokenClaims, RefreshTokenData,
    VerifiedRefreshToken,
};
