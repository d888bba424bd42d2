//! Join code generation contract

use std::fmt::Debug;

use super::entity::TeamCode;

/// Produces candidate join codes.
///
/// Implementations make no uniqueness promise; the membership coordinator checks
/// the registry and retries on collision.
pub trait TeamCodeGenerator: Send + Sync + Debug {
    fn generate(&self) -> TeamCode;
}
