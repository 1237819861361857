pub mod claims;
pub mod id_token;
pub mod keys;
pub mod serializer;

pub use claims::IdTokenClaims;
pub use id_token::{make_id_token, verify_id_token};
pub use keys::IdTokenKeys;
pub use serializer::{Expiring, JwtSerializer};
