//! Asymmetric key material for ID tokens.

use crate::config::JwtAlgorithm;
use crate::error::TokenError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use sha2::{Digest, Sha256};
use std::fmt;

/// Signing/verification key pair for ID tokens.
///
/// The `kid` published in token headers is derived from the verification
/// key, so third parties holding several public keys can pick the right one.
#[derive(Clone)]
pub struct IdTokenKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    key_id: String,
}

impl IdTokenKeys {
    /// Load a PEM encoded private/public key pair.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either key cannot be parsed for the
    /// requested algorithm.
    pub fn from_pem(
        algorithm: JwtAlgorithm,
        private_pem: &[u8],
        public_pem: &[u8],
    ) -> Result<Self, TokenError> {
        let (encoding, decoding) = match algorithm {
            JwtAlgorithm::RS256 | JwtAlgorithm::PS256 => (
                EncodingKey::from_rsa_pem(private_pem)
                    .map_err(|e| TokenError::config(format!("Invalid private key: {}", e)))?,
                DecodingKey::from_rsa_pem(public_pem)
                    .map_err(|e| TokenError::config(format!("Invalid public key: {}", e)))?,
            ),
            JwtAlgorithm::ES256 => (
                EncodingKey::from_ec_pem(private_pem)
                    .map_err(|e| TokenError::config(format!("Invalid private key: {}", e)))?,
                DecodingKey::from_ec_pem(public_pem)
                    .map_err(|e| TokenError::config(format!("Invalid public key: {}", e)))?,
            ),
        };

        Ok(Self {
            algorithm: algorithm.into(),
            encoding,
            decoding,
            key_id: derive_key_id(public_pem),
        })
    }

    /// Build ES256 keys from a PKCS#8 private key and the uncompressed
    /// public point.
    #[must_use]
    pub fn from_ec_der(private_pkcs8: &[u8], public_point: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::ES256,
            encoding: EncodingKey::from_ec_der(private_pkcs8),
            decoding: DecodingKey::from_ec_der(public_point),
            key_id: derive_key_id(public_point),
        }
    }

    /// Generate a fresh ES256 key pair.
    ///
    /// Tokens signed with an ephemeral pair cannot be verified after the
    /// process restarts.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the system RNG fails.
    pub fn generate_es256() -> Result<Self, TokenError> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
            .map_err(|_| TokenError::config("Failed to generate ES256 key pair"))?;
        let pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
            .map_err(|e| TokenError::config(format!("Generated key rejected: {}", e)))?;

        Ok(Self::from_ec_der(pkcs8.as_ref(), pair.public_key().as_ref()))
    }

    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for IdTokenKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenKeys")
            .field("algorithm", &self.algorithm)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

fn derive_key_id(public_material: &[u8]) -> String {
    let digest = Sha256::digest(public_material);
    let mut kid = URL_SAFE_NO_PAD.encode(digest);
    kid.truncate(16);
    kid
}
