//! PostgreSQL storage implementation with connection pooling

use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/team_hub".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_idle_timeout(mut self, secs: u64) -> Self {
        self.idle_timeout_secs = secs;
        self
    }
}

/// Open a connection pool for `config`
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| map_sqlx_error(e, "Failed to connect to PostgreSQL"))
}

/// Translate a sqlx error into the domain taxonomy.
///
/// Unique index hits become `UniqueViolation` carrying the constraint name,
/// pool exhaustion and I/O failures become `Unavailable`.
pub fn map_sqlx_error(error: sqlx::Error, context: &str) -> DomainError {
    match &error {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            let field = constraint_field(db.constraint().unwrap_or("unknown"), db.table());
            DomainError::unique_violation(field, format!("{}: {}", context, db.message()))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DomainError::unavailable(format!("{}: {}", context, error))
        }
        _ => DomainError::storage(format!("{}: {}", context, error)),
    }
}

/// Column name behind a constraint following the `<table>_<column>_key` convention
fn constraint_field(constraint: &str, table: Option<&str>) -> String {
    let name = table
        .and_then(|t| constraint.strip_prefix(t))
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(constraint);

    match name {
        "pkey" => "id".to_string(),
        other => other.strip_suffix("_key").unwrap_or(other).to_string(),
    }
}

/// PostgreSQL storage implementation with connection pooling
///
/// Stores entities as JSONB next to an indexed `scope` column, so scoped
/// listings and patches never touch other scopes' rows.
pub struct PostgresStorage<E>
where
    E: StorageEntity,
{
    pool: PgPool,
    table_name: String,
    _phantom: PhantomData<E>,
}

impl<E> Debug for PostgresStorage<E>
where
    E: StorageEntity,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStorage")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl<E> PostgresStorage<E>
where
    E: StorageEntity,
{
    /// Creates a new PostgreSQL storage with the given pool and table name
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
            _phantom: PhantomData,
        }
    }

    /// Ensures the storage table and its scope index exist
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                key VARCHAR(255) PRIMARY KEY,
                scope VARCHAR(255) NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table_name
        );

        sqlx::query(&table)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create table"))?;

        let index = format!(
            "CREATE INDEX IF NOT EXISTS {table}_scope_created_idx ON {table} (scope, created_at DESC)",
            table = self.table_name
        );

        sqlx::query(&index)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create scope index"))?;

        Ok(())
    }

    fn decode(data: serde_json::Value) -> Result<E, DomainError> {
        serde_json::from_value(data)
            .map_err(|e| DomainError::storage(format!("Failed to deserialize entity: {}", e)))
    }

    fn encode(entity: &E) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(entity)
            .map_err(|e| DomainError::storage(format!("Failed to serialize entity: {}", e)))
    }
}

#[async_trait]
impl<E> Storage<E> for PostgresStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let query = format!("SELECT data FROM {} WHERE key = $1", self.table_name);

        let result = sqlx::query(&query)
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to get entity"))?;

        result.map(|row| Self::decode(row.get("data"))).transpose()
    }

    async fn list_scope(&self, scope: &str, limit: usize) -> Result<Vec<E>, DomainError> {
        let query = format!(
            "SELECT data FROM {} WHERE scope = $1 ORDER BY created_at DESC LIMIT $2",
            self.table_name
        );

        let rows = sqlx::query(&query)
            .bind(scope)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to list entities"))?;

        rows.into_iter()
            .map(|row| Self::decode(row.get("data")))
            .collect()
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let data = Self::encode(&entity)?;

        let query = format!(
            "INSERT INTO {} (key, scope, data, created_at) VALUES ($1, $2, $3, $4)",
            self.table_name
        );

        sqlx::query(&query)
            .bind(&key)
            .bind(entity.scope())
            .bind(&data)
            .bind(entity.created_at())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to create entity"))?;

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let data = Self::encode(&entity)?;

        let query = format!(
            "UPDATE {} SET data = $2, updated_at = NOW() WHERE key = $1",
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(&key)
            .bind(&data)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to update entity"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            )));
        }

        Ok(entity)
    }

    async fn patch_scope(
        &self,
        scope: &str,
        patch: &serde_json::Value,
    ) -> Result<usize, DomainError> {
        if !patch.is_object() {
            return Err(DomainError::validation("Patch must be a JSON object"));
        }

        let query = format!(
            "UPDATE {} SET data = data || $2, updated_at = NOW() \
             WHERE scope = $1 AND NOT (data @> $2)",
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(scope)
            .bind(patch)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(e, "Failed to patch entities"))?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_default() {
        let config = PostgresConfig::default();

        assert_eq!(config.url, "postgres://localhost/team_hub");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_postgres_config_builder() {
        let config = PostgresConfig::new("postgres://localhost/test")
            .with_max_connections(20)
            .with_min_connections(5)
            .with_connect_timeout(60)
            .with_idle_timeout(300);

        assert_eq!(config.url, "postgres://localhost/test");
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 5);
        assert_eq!(config.connect_timeout_secs, 60);
        assert_eq!(config.idle_timeout_secs, 300);
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let error = map_sqlx_error(sqlx::Error::PoolTimedOut, "Failed to get team");
        assert!(matches!(error, DomainError::Unavailable { .. }));
    }

    #[test]
    fn test_constraint_field() {
        assert_eq!(constraint_field("teams_team_code_key", Some("teams")), "team_code");
        assert_eq!(constraint_field("users_email_key", Some("users")), "email");
        assert_eq!(constraint_field("users_pkey", Some("users")), "id");
        assert_eq!(constraint_field("custom", None), "custom");
    }

    #[test]
    fn test_other_errors_map_to_storage() {
        let error = map_sqlx_error(sqlx::Error::RowNotFound, "Failed to get team");
        assert!(matches!(error, DomainError::Storage { .. }));
    }
}
