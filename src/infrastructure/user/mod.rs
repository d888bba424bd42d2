//! User infrastructure module
//!
//! Password hashing with Argon2 and the signup/login service.

mod password;
mod service;

pub use password::{Argon2Hasher, CredentialHasher};
pub use service::{SignupRequest, UserService};
