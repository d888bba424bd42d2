//! Team entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{
    validate_team_code, validate_team_id, validate_team_name, TeamValidationError,
};
use crate::domain::user::UserId;

/// Team identifier - alphanumeric + hyphens, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamId(String);

impl TeamId {
    /// Create a new TeamId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, TeamValidationError> {
        let id = id.into();
        validate_team_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TeamId {
    type Error = TeamValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TeamId> for String {
    fn from(id: TeamId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-shareable join code, eight characters from `[A-Z0-9]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamCode(String);

impl TeamCode {
    pub fn new(code: impl Into<String>) -> Result<Self, TeamValidationError> {
        let code = code.into();
        validate_team_code(&code)?;
        Ok(Self(code))
    }

    /// Normalize user input (surrounding whitespace, lowercase) before validating
    pub fn parse(input: &str) -> Result<Self, TeamValidationError> {
        Self::new(input.trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TeamCode {
    type Error = TeamValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TeamCode> for String {
    fn from(code: TeamCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for TeamCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of a user within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MemberRole {
    /// Creator of the team
    Leader,
    #[default]
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "Leader",
            Self::Member => "Member",
        }
    }

}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Leader" => Ok(Self::Leader),
            "Member" => Ok(Self::Member),
            other => Err(format!("Unknown member role: {}", other)),
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A membership entry embedded in a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(user_id: UserId, role: MemberRole) -> Self {
        Self {
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Team entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique identifier
    id: TeamId,
    /// Display name
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Join code, immutable once assigned
    team_code: TeamCode,
    leader_id: UserId,
    /// Ordered by join time; the leader is always first
    members: Vec<Member>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team whose sole member is its leader
    pub fn new(
        id: TeamId,
        name: impl Into<String>,
        team_code: TeamCode,
        leader_id: UserId,
    ) -> Result<Self, TeamValidationError> {
        let name = name.into().trim().to_string();
        validate_team_name(&name)?;
        let now = Utc::now();

        let leader = Member {
            user_id: leader_id.clone(),
            role: MemberRole::Leader,
            joined_at: now,
        };

        Ok(Self {
            id,
            name,
            description: None,
            team_code,
            leader_id,
            members: vec![leader],
            created_at: now,
            updated_at: now,
        })
    }

    /// Set description (builder pattern)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    // Getters

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn team_code(&self) -> &TeamCode {
        &self.team_code
    }

    pub fn leader_id(&self) -> &UserId {
        &self.leader_id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.iter().any(|m| &m.user_id == user_id)
    }

    // Mutators

    /// Append a member. A user can appear at most once.
    pub fn add_member(&mut self, member: Member) -> Result<&Member, TeamValidationError> {
        if self.is_member(&member.user_id) {
            return Err(TeamValidationError::DuplicateMember(
                member.user_id.to_string(),
            ));
        }

        self.members.push(member);
        self.touch();

        let last = self.members.len() - 1;
        Ok(&self.members[last])
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
