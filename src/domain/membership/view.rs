//! Read projections of a team

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::team::{MemberRole, Team};
use crate::domain::user::User;

/// A member resolved to its user's public fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// A team with its members resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub team_code: String,
    pub leader_id: String,
    pub members: Vec<MemberView>,
    pub created_at: DateTime<Utc>,
}

impl TeamView {
    /// Project `team`, taking names and emails from `users`. Members without a
    /// matching user keep empty name and email.
    pub fn project(team: &Team, users: &[User]) -> Self {
        let members = team
            .members()
            .iter()
            .map(|member| {
                let user = users.iter().find(|u| u.id() == &member.user_id);

                MemberView {
                    user_id: member.user_id.to_string(),
                    name: user.map(|u| u.name().to_string()).unwrap_or_default(),
                    email: user.map(|u| u.email().to_string()).unwrap_or_default(),
                    role: member.role,
                    joined_at: member.joined_at,
                }
            })
            .collect();

        Self {
            id: team.id().to_string(),
            name: team.name().to_string(),
            description: team.description().map(String::from),
            team_code: team.team_code().to_string(),
            leader_id: team.leader_id().to_string(),
            members,
            created_at: team.created_at(),
        }
    }

    pub fn roles(&self) -> Vec<MemberRole> {
        self.members.iter().map(|m| m.role).collect()
    }
}
