//! Argon2id credential hashing for signup and login

use std::fmt::Debug;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::domain::DomainError;

/// Hashed against when a login names no account
const UNKNOWN_ACCOUNT_PASSWORD: &str = "no-such-account";

/// Hashes new passwords and checks login attempts
pub trait CredentialHasher: Send + Sync + Debug {
    /// PHC string for a new account's password
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// `stored` is `None` when the email matched no account. The check still
    /// runs against a placeholder so both failures take the same time.
    fn verify(&self, password: &str, stored: Option<&str>) -> bool;
}

/// Argon2id hasher with explicit cost parameters
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
    placeholder: Option<String>,
}

impl Argon2Hasher {
    /// Hasher with the library's recommended costs
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    pub fn with_params(params: Params) -> Self {
        let mut hasher = Self {
            params,
            placeholder: None,
        };
        hasher.placeholder = hasher.hash(UNKNOWN_ACCOUNT_PASSWORD).ok();
        hasher
    }

    /// Minimum costs, for tests that sign up many users
    #[cfg(test)]
    pub(crate) fn fast() -> Self {
        Self::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap())
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn matches(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => self.matches(password, stored),
            None => {
                if let Some(placeholder) = &self.placeholder {
                    let _ = self.matches(password, placeholder);
                }
                false
            }
        }
    }
}
