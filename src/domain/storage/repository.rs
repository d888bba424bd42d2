//! Storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::StorageEntity;

/// Generic keyed document storage partitioned by scope
#[async_trait]
pub trait Storage<E>: Send + Sync + Debug
where
    E: StorageEntity + 'static,
{
    /// Retrieves an entity by its key
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError>;

    /// Entities of `scope`, newest first, at most `limit`
    async fn list_scope(&self, scope: &str, limit: usize) -> Result<Vec<E>, DomainError>;

    /// Creates a new entity, returns error if already exists
    async fn create(&self, entity: E) -> Result<E, DomainError>;

    /// Updates an existing entity, returns error if not found
    async fn update(&self, entity: E) -> Result<E, DomainError>;

    /// Merges the JSON object `patch` into every entity of `scope` that does
    /// not already contain it, as one atomic write. Returns how many changed.
    async fn patch_scope(
        &self,
        scope: &str,
        patch: &serde_json::Value,
    ) -> Result<usize, DomainError>;
}
