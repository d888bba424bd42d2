//! Atomic membership writes

use async_trait::async_trait;

use crate::domain::team::{Team, TeamId, TeamRepository};
use crate::domain::user::{UserId, UserRepository};
use crate::domain::DomainError;

/// Conflict message when a user is already listed in the target team
pub const ALREADY_MEMBER: &str = "Already a member";

/// Conflict message when a user already belongs to some team
pub const ALREADY_IN_TEAM: &str = "User already belongs to a team";

/// Store that can change a team and its members' user records in one atomic step.
///
/// Both operations re-check their preconditions inside the same critical section
/// as the write, so concurrent callers cannot both succeed.
#[async_trait]
pub trait MembershipStore: TeamRepository + UserRepository {
    /// Insert `team` and point its leader at it.
    ///
    /// Fails with `NotFound` for an unknown leader, `Conflict` when the leader
    /// already has a team, and `UniqueViolation` on `team_code` when the code
    /// is taken.
    async fn create_team_with_leader(&self, team: Team) -> Result<Team, DomainError>;

    /// Append `user_id` to the team as a `Member` and point the user at it.
    ///
    /// Fails with `NotFound` for an unknown team or user, and `Conflict` when
    /// the user is already listed or belongs to another team.
    async fn add_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<Team, DomainError>;

    /// Cheap connectivity probe used by readiness checks
    async fn health_check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
