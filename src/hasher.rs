use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::HasherConfig;

pub trait Hasher: Send + Sync {
    fn generate_hash(&self, password: &str) -> Result<String, HasherError>;

    fn check_hash(&self, hash: &str, password: &str) -> Result<bool, HasherError>;
}

/// Argon2id with a random salt, stored as a PHC string.
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(config: &HasherConfig) -> Result<Self, HasherError> {
        let params = Params::new(config.m_cost, config.t_cost, config.p_cost, None)
            .map_err(HasherError::Initialization)?;

        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Hasher for Argon2Hasher {
    fn generate_hash(&self, password: &str) -> Result<String, HasherError> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(HasherError::Hash)
    }

    fn check_hash(&self, hash: &str, password: &str) -> Result<bool, HasherError> {
        let hash = PasswordHash::new(hash).map_err(HasherError::Hash)?;

        match self.hasher().verify_password(password.as_bytes(), &hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HasherError::Hash(e)),
        }
    }
}

#[derive(Debug, Error)]
pub enum HasherError {
    #[error("failed to initialize password hasher: {0}")]
    Initialization(argon2::Error),

    #[error("failed to hash password: {0}")]
    Hash(password_hash::Error),
}
