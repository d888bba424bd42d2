//! PostgreSQL membership store
//!
//! Teams are JSONB documents keyed by id with a unique expression index on
//! `data->>'team_code'`. Users are plain rows with a unique index on
//! `lower(email)`. Atomic operations run in one transaction and lock the rows
//! they touch with `SELECT ... FOR UPDATE`, team row before user row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::info;

use crate::domain::membership::{MembershipStore, ALREADY_IN_TEAM, ALREADY_MEMBER};
use crate::domain::team::{Member, MemberRole, Team, TeamCode, TeamId, TeamRepository};
use crate::domain::user::{normalize_email, User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::storage::map_sqlx_error;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id VARCHAR(64) PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        team_id VARCHAR(64),
        role_in_team VARCHAR(16) NOT NULL DEFAULT 'Member',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (lower(email))",
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        key VARCHAR(64) PRIMARY KEY,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS teams_team_code_key ON teams ((data->>'team_code'))",
];

const USER_COLUMNS: &str =
    "id, name, email, password_hash, team_id, role_in_team, created_at, updated_at";

/// Membership store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and unique indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(e, "Failed to create membership schema"))?;
        }

        info!("Membership schema ready");
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, DomainError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to start transaction"))
    }
}

fn encode_team(team: &Team) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(team)
        .map_err(|e| DomainError::storage(format!("Failed to serialize team: {}", e)))
}

fn row_to_team(row: &PgRow) -> Result<Team, DomainError> {
    let data: serde_json::Value = row.get("data");
    serde_json::from_value(data)
        .map_err(|e| DomainError::storage(format!("Failed to deserialize team: {}", e)))
}

fn parse_role(value: &str) -> Result<MemberRole, DomainError> {
    value
        .parse::<MemberRole>()
        .map_err(|e| DomainError::storage(format!("Invalid row in database: {}", e)))
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let id: String = row.get("id");
    let team_id: Option<String> = row.get("team_id");
    let role: String = row.get("role_in_team");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let id = UserId::new(id).map_err(|e| DomainError::storage(e.to_string()))?;
    let team_id = team_id
        .map(TeamId::new)
        .transpose()
        .map_err(|e| DomainError::storage(e.to_string()))?;

    Ok(User::restore(
        id,
        row.get("name"),
        row.get("email"),
        row.get("password_hash"),
        team_id,
        parse_role(&role)?,
        created_at,
        updated_at,
    ))
}

async fn lock_user(
    tx: &mut Transaction<'static, Postgres>,
    user_id: &UserId,
) -> Result<Option<User>, DomainError> {
    let query = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);

    let row = sqlx::query(&query)
        .bind(user_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to lock user"))?;

    row.as_ref().map(row_to_user).transpose()
}

async fn write_user_team(
    tx: &mut Transaction<'static, Postgres>,
    user: &User,
) -> Result<(), DomainError> {
    sqlx::query(
        "UPDATE users SET team_id = $2, role_in_team = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(user.id().as_str())
    .bind(user.team_id().map(|t| t.as_str()))
    .bind(user.role_in_team().as_str())
    .bind(user.updated_at())
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error(e, "Failed to update user team"))?;

    Ok(())
}

#[async_trait]
impl TeamRepository for PostgresDirectory {
    async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query("SELECT data FROM teams WHERE key = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get team"))?;

        row.as_ref().map(row_to_team).transpose()
    }

    async fn get_by_code(&self, code: &TeamCode) -> Result<Option<Team>, DomainError> {
        let row = sqlx::query("SELECT data FROM teams WHERE data->>'team_code' = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get team by code"))?;

        row.as_ref().map(row_to_team).transpose()
    }

    async fn create(&self, team: Team) -> Result<Team, DomainError> {
        sqlx::query("INSERT INTO teams (key, data, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(team.id().as_str())
            .bind(encode_team(&team)?)
            .bind(team.created_at())
            .bind(team.updated_at())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create team"))?;

        Ok(team)
    }

    async fn update(&self, team: Team) -> Result<Team, DomainError> {
        let result = sqlx::query(
            "UPDATE teams SET data = $2, updated_at = $3 WHERE key = $1 AND data->>'team_code' = $4",
        )
        .bind(team.id().as_str())
        .bind(encode_team(&team)?)
        .bind(team.updated_at())
        .bind(team.team_code().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update team"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Team '{}' not found with code '{}'",
                team.id(),
                team.team_code()
            )));
        }

        Ok(team)
    }

    async fn exists_code(&self, code: &TeamCode) -> Result<bool, DomainError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE data->>'team_code' = $1) as exists",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to check team code"))?;

        Ok(row.get("exists"))
    }
}

#[async_trait]
impl UserRepository for PostgresDirectory {
    async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get user"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let query = format!("SELECT {} FROM users WHERE lower(email) = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get user by email"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let query = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);

        let rows = sqlx::query(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get users"))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn create(&self, user: User) -> Result<User, DomainError> {
        let query = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            USER_COLUMNS
        );

        sqlx::query(&query)
            .bind(user.id().as_str())
            .bind(user.name())
            .bind(user.email())
            .bind(user.password_hash())
            .bind(user.team_id().map(|t| t.as_str()))
            .bind(user.role_in_team().as_str())
            .bind(user.created_at())
            .bind(user.updated_at())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create user"))?;

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, team_id = $5,
                role_in_team = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id().as_str())
        .bind(user.name())
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.team_id().map(|t| t.as_str()))
        .bind(user.role_in_team().as_str())
        .bind(user.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "User '{}' not found",
                user.id()
            )));
        }

        Ok(user.clone())
    }
}

#[async_trait]
impl MembershipStore for PostgresDirectory {
    async fn create_team_with_leader(&self, team: Team) -> Result<Team, DomainError> {
        let mut tx = self.begin().await?;

        let mut leader = lock_user(&mut tx, team.leader_id())
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if leader.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        sqlx::query("INSERT INTO teams (key, data, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(team.id().as_str())
            .bind(encode_team(&team)?)
            .bind(team.created_at())
            .bind(team.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create team"))?;

        leader.assign_team(team.id().clone(), MemberRole::Leader);
        write_user_team(&mut tx, &leader).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to commit team creation"))?;

        Ok(team)
    }

    async fn add_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<Team, DomainError> {
        let mut tx = self.begin().await?;

        let row = sqlx::query("SELECT data FROM teams WHERE key = $1 FOR UPDATE")
            .bind(team_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to lock team"))?;

        let mut team = match row {
            Some(row) => row_to_team(&row)?,
            None => return Err(DomainError::not_found("Team not found")),
        };

        let mut user = lock_user(&mut tx, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        if team.is_member(user_id) {
            return Err(DomainError::conflict(ALREADY_MEMBER));
        }

        if user.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        team.add_member(Member::new(user_id.clone(), MemberRole::Member))
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        sqlx::query("UPDATE teams SET data = $2, updated_at = $3 WHERE key = $1")
            .bind(team_id.as_str())
            .bind(encode_team(&team)?)
            .bind(team.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to append member"))?;

        user.assign_team(team_id.clone(), MemberRole::Member);
        write_user_team(&mut tx, &user).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to commit join"))?;

        Ok(team)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Database health check failed"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("Leader").unwrap(), MemberRole::Leader);
        assert_eq!(parse_role("Member").unwrap(), MemberRole::Member);
        assert!(matches!(
            parse_role("Owner"),
            Err(DomainError::Storage { .. })
        ));
    }

    #[test]
    fn test_schema_declares_unique_indexes() {
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("teams_team_code_key") && s.contains("UNIQUE")));
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("users_email_key") && s.contains("lower(email)")));
    }

    #[test]
    fn test_team_document_exposes_code_for_index() {
        let team = Team::new(
            TeamId::new("team-1").unwrap(),
            "Rocket",
            TeamCode::new("AB12CD34").unwrap(),
            UserId::new("alice").unwrap(),
        )
        .unwrap();

        let data = encode_team(&team).unwrap();
        assert_eq!(data["team_code"], "AB12CD34");
    }
}
