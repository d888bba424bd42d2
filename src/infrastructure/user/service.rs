//! User service for signup and credential checks

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::user::{
    normalize_email, validate_email, validate_name, validate_password, User, UserId,
    UserRepository,
};
use crate::domain::DomainError;

use super::password::CredentialHasher;

const MISSING_FIELDS: &str = "Missing required fields";
const EMAIL_IN_USE: &str = "Email already in use";

/// Request for registering a new account
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// User service for registration and authentication
#[derive(Debug)]
pub struct UserService<R: UserRepository, H: CredentialHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
}

impl<R: UserRepository, H: CredentialHasher> UserService<R, H> {
    /// Create a new user service
    pub fn new(repository: Arc<R>, hasher: Arc<H>) -> Self {
        Self { repository, hasher }
    }

    /// Register a new, teamless user
    pub async fn signup(&self, request: SignupRequest) -> Result<User, DomainError> {
        if request.name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
        {
            return Err(DomainError::validation(MISSING_FIELDS));
        }

        validate_name(&request.name).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_email(request.email.trim())
            .map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let email = normalize_email(&request.email);

        if self.repository.email_exists(&email).await? {
            return Err(DomainError::conflict(EMAIL_IN_USE));
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = User::new(UserId::generate(), &request.name, &email, password_hash);

        let user = self.repository.create(user).await.map_err(|e| {
            if e.is_unique_violation_on("email") {
                DomainError::conflict(EMAIL_IN_USE)
            } else {
                e
            }
        })?;

        info!(user_id = %user.id(), "User signed up");
        Ok(user)
    }

    /// Authenticate a user with email and password.
    ///
    /// Returns `None` for an unknown email or a wrong password alike.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        let user = match self.repository.get_by_email(&normalize_email(email)).await? {
            Some(u) => u,
            None => {
                self.hasher.verify(password, None);
                debug!("Login attempt for unknown email");
                return Ok(None);
            }
        };

        if !self.hasher.verify(password, Some(user.password_hash())) {
            debug!(user_id = %user.id(), "Login attempt with wrong password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Get a user by ID. Malformed ids are treated as unknown.
    pub async fn get(&self, id: &str) -> Result<Option<User>, DomainError> {
        match UserId::new(id) {
            Ok(user_id) => self.repository.get(&user_id).await,
            Err(_) => Ok(None),
        }
    }
}
