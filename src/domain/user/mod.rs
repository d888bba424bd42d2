//! User domain
//!
//! This module provides domain types and traits for user accounts,
//! including user entities, validation, and repository traits.

mod entity;
mod repository;
mod validation;

pub use entity::{User, UserId};
pub use repository::UserRepository;
pub use validation::{
    normalize_email, validate_email, validate_name, validate_password, validate_user_id,
    UserValidationError,
};
