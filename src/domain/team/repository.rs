//! Team registry trait

use async_trait::async_trait;

use super::entity::{Team, TeamCode, TeamId};
use crate::domain::DomainError;

/// Registry of teams. Holds no business rules; uniqueness of `team_code` is
/// enforced as a storage constraint and reported as `UniqueViolation`.
#[async_trait]
pub trait TeamRepository: Send + Sync + std::fmt::Debug {
    /// Get a team by ID
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError>;

    /// Get a team by its join code
    async fn get_by_code(&self, code: &TeamCode) -> Result<Option<Team>, DomainError>;

    /// Insert a new team
    async fn create(&self, team: Team) -> Result<Team, DomainError>;

    /// Replace an existing team
    async fn update(&self, team: Team) -> Result<Team, DomainError>;

    /// Check whether a join code is taken
    async fn exists_code(&self, code: &TeamCode) -> Result<bool, DomainError> {
        Ok(self.get_by_code(code).await?.is_some())
    }
}
