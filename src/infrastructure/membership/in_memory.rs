//! In-memory membership store
//!
//! One `tokio::sync::RwLock` guards teams, users and both secondary indexes, so
//! every atomic operation is a single write-guarded check-then-act.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::membership::{MembershipStore, ALREADY_IN_TEAM, ALREADY_MEMBER};
use crate::domain::team::{Member, MemberRole, Team, TeamCode, TeamId, TeamRepository};
use crate::domain::user::{normalize_email, User, UserId, UserRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct DirectoryState {
    teams: HashMap<String, Team>,
    /// team_code -> team id
    codes: HashMap<String, TeamId>,
    users: HashMap<String, User>,
    /// lowercased email -> user id
    emails: HashMap<String, UserId>,
}

/// Teams and users held in process memory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TeamRepository for InMemoryDirectory {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let state = self.state.read().await;
        Ok(state.teams.get(id.as_str()).cloned())
    }

    async fn get_by_code(&self, code: &TeamCode) -> Result<Option<Team>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .codes
            .get(code.as_str())
            .and_then(|id| state.teams.get(id.as_str()))
            .cloned())
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        let mut state = self.state.write().await;

        if state.teams.contains_key(team.id().as_str()) {
            return Err(DomainError::unique_violation(
                "id",
                format!("Team '{}' already exists", team.id()),
            ));
        }

        if state.codes.contains_key(team.team_code().as_str()) {
            return Err(DomainError::unique_violation(
                "team_code",
                format!("Team code '{}' is taken", team.team_code()),
            ));
        }

        state
            .codes
            .insert(team.team_code().to_string(), team.id().clone());
        state.teams.insert(team.id().to_string(), team.clone());
        Ok(team)
    }

    async fn update(&self, team: Team) -> Result<Team, DomainError> {
        let mut state = self.state.write().await;

        let existing = state
            .teams
            .get(team.id().as_str())
            .ok_or_else(|| DomainError::not_found(format!("Team '{}' not found", team.id())))?;

        if existing.team_code() != team.team_code() {
            return Err(DomainError::validation("Team code cannot be changed"));
        }

        state.teams.insert(team.id().to_string(), team.clone());
        Ok(team)
    }
}

#[async_trait]
impl UserRepository for InMemoryDirectory {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        Ok(state.users.get(id.as_str()).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .emails
            .get(&normalize_email(email))
            .and_then(|id| state.users.get(id.as_str()))
            .cloned())
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError> {
        let state = self.state.read().await;

        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id.as_str()).cloned())
            .collect())
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        if state.users.contains_key(user.id().as_str()) {
            return Err(DomainError::unique_violation(
                "id",
                format!("User '{}' already exists", user.id()),
            ));
        }

        let email = normalize_email(user.email());
        if state.emails.contains_key(&email) {
            return Err(DomainError::unique_violation(
                "email",
                "Email already in use",
            ));
        }

        state.emails.insert(email, user.id().clone());
        state.users.insert(user.id().to_string(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        let previous_email = state
            .users
            .get(user.id().as_str())
            .map(|u| normalize_email(u.email()))
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", user.id())))?;

        let email = normalize_email(user.email());
        if email != previous_email {
            if state.emails.contains_key(&email) {
                return Err(DomainError::unique_violation(
                    "email",
                    "Email already in use",
                ));
            }
            state.emails.remove(&previous_email);
            state.emails.insert(email, user.id().clone());
        }

        state.users.insert(user.id().to_string(), user.clone());
        Ok(user.clone())
    }
}

#[async_trait]
impl MembershipStore for InMemoryDirectory {
    async fn create_team_with_leader(&self, team: Team) -> Result<Team, DomainError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let leader = state
            .users
            .get_mut(team.leader_id().as_str())
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if leader.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        if state.teams.contains_key(team.id().as_str()) {
            return Err(DomainError::unique_violation(
                "id",
                format!("Team '{}' already exists", team.id()),
            ));
        }

        if state.codes.contains_key(team.team_code().as_str()) {
            return Err(DomainError::unique_violation(
                "team_code",
                format!("Team code '{}' is taken", team.team_code()),
            ));
        }

        leader.assign_team(team.id().clone(), MemberRole::Leader);
        state
            .codes
            .insert(team.team_code().to_string(), team.id().clone());
        state.teams.insert(team.id().to_string(), team.clone());

        Ok(team)
    }

    async fn add_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<Team, DomainError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let team = state
            .teams
            .get_mut(team_id.as_str())
            .ok_or_else(|| DomainError::not_found("Team not found"))?;

        let user = state
            .users
            .get_mut(user_id.as_str())
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if team.is_member(user_id) {
            return Err(DomainError::conflict(ALREADY_MEMBER));
        }

        if user.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        team.add_member(Member::new(user_id.clone(), MemberRole::Member))
            .map_err(|e| DomainError::conflict(e.to_string()))?;
        user.assign_team(team_id.clone(), MemberRole::Member);

        Ok(team.clone())
    }
}
