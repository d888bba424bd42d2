//! Storage factory for runtime storage selection

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::storage::{Storage, StorageEntity};
use crate::domain::DomainError;

use super::in_memory::InMemoryStorage;
use super::postgres::PostgresStorage;

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(format!("Unknown storage backend: {}", other)),
        }
    }
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates an in-memory storage
    pub fn create_in_memory<E>() -> Arc<dyn Storage<E>>
    where
        E: StorageEntity + 'static,
    {
        Arc::new(InMemoryStorage::<E>::new())
    }

    /// Creates a PostgreSQL storage sharing an existing pool, creating its table if needed
    pub async fn create_postgres_with_pool<E>(
        pool: PgPool,
        table_name: &str,
    ) -> Result<Arc<dyn Storage<E>>, DomainError>
    where
        E: StorageEntity + 'static,
    {
        let storage = PostgresStorage::<E>::new(pool, table_name);
        storage.ensure_table().await?;
        Ok(Arc::new(storage))
    }
}
