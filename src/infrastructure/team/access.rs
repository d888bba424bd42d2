//! Team-scoped access checks

use crate::domain::team::{Team, TeamId, TeamRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;

const TEAM_NOT_FOUND: &str = "Team not found";
const NOT_A_MEMBER: &str = "Not a member of this team";

/// Load `team_id` and check `user_id` belongs to it.
///
/// Unknown or malformed ids are `NotFound`; outsiders are `Forbidden`.
pub async fn require_member(
    teams: &dyn TeamRepository,
    team_id: &str,
    user_id: &UserId,
) -> Result<Team, DomainError> {
    let team_id = TeamId::new(team_id).map_err(|_| DomainError::not_found(TEAM_NOT_FOUND))?;

    let team = teams
        .get(&team_id)
        .await?
        .ok_or_else(|| DomainError::not_found(TEAM_NOT_FOUND))?;

    if !team.is_member(user_id) {
        return Err(DomainError::forbidden(NOT_A_MEMBER));
    }

    Ok(team)
}
