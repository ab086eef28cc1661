use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const TOKEN_BYTES: usize = 24;

/// Stored form of a password: argon2 PHC string plus the salt it was derived with.
#[derive(Debug, Clone)]
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hashes a password under a freshly generated salt.
    pub fn hash_password(&self, password: &str) -> Result<HashedPassword> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hash(format!("failed to hash password: {e}")))?;

        Ok(HashedPassword {
            hash: hash.to_string(),
            salt: salt.as_str().to_string(),
        })
    }

    /// Recomputes the hash with the stored salt and compares digests in constant time.
    pub fn verify_password(&self, password: &str, stored_hash: &str, stored_salt: &str) -> Result<bool> {
        let stored = PasswordHash::new(stored_hash)
            .map_err(|e| Error::Hash(format!("invalid hash format: {e}")))?;
        let salt = SaltString::from_b64(stored_salt)
            .map_err(|e| Error::Hash(format!("invalid salt: {e}")))?;

        let candidate = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Hash(format!("failed to hash password: {e}")))?;

        Ok(match (candidate.hash, stored.hash) {
            (Some(candidate), Some(stored)) => candidate == stored,
            _ => false,
        })
    }
}

/// Generates a raw bearer token: 24 random bytes, hex encoded.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of the raw token; this is the only form that reaches the store.
#[must_use]
pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
