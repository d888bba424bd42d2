//! In-memory storage implementation

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::domain::storage::{Storage, StorageEntity, StorageKey};
use crate::domain::DomainError;

/// Thread-safe in-memory storage implementation
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug)]
pub struct InMemoryStorage<E>
where
    E: StorageEntity,
{
    entities: RwLock<HashMap<String, E>>,
}

impl<E> Default for InMemoryStorage<E>
where
    E: StorageEntity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> InMemoryStorage<E>
where
    E: StorageEntity,
{
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }
}

/// Applies `patch` to `document`, returning false when every field already matched
fn merge_patch(document: &mut Value, patch: &Map<String, Value>) -> bool {
    let Some(fields) = document.as_object_mut() else {
        return false;
    };

    let mut changed = false;
    for (name, value) in patch {
        if fields.get(name) != Some(value) {
            fields.insert(name.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

#[async_trait]
impl<E> Storage<E> for InMemoryStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let entities = self.entities.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(entities.get(key.as_str()).cloned())
    }

    async fn list_scope(&self, scope: &str, limit: usize) -> Result<Vec<E>, DomainError> {
        let entities = self.entities.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut listed: Vec<E> = entities
            .values()
            .filter(|e| e.scope() == scope)
            .cloned()
            .collect();

        listed.sort_by_key(|e| std::cmp::Reverse(e.created_at()));
        listed.truncate(limit);

        Ok(listed)
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if entities.contains_key(&key) {
            return Err(DomainError::unique_violation(
                "key",
                format!("Entity with key '{}' already exists", key),
            ));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        if !entities.contains_key(&key) {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            )));
        }

        entities.insert(key, entity.clone());
        Ok(entity)
    }

    async fn patch_scope(&self, scope: &str, patch: &Value) -> Result<usize, DomainError> {
        let patch = patch
            .as_object()
            .ok_or_else(|| DomainError::validation("Patch must be a JSON object"))?;

        let mut entities = self.entities.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        // Build every replacement before touching the map so a decode failure
        // leaves the scope unchanged.
        let mut patched = Vec::new();
        for (key, entity) in entities.iter().filter(|(_, e)| e.scope() == scope) {
            let mut document = serde_json::to_value(entity).map_err(|e| {
                DomainError::storage(format!("Failed to serialize entity: {}", e))
            })?;

            if merge_patch(&mut document, patch) {
                let entity: E = serde_json::from_value(document).map_err(|e| {
                    DomainError::storage(format!("Failed to apply patch: {}", e))
                })?;
                patched.push((key.clone(), entity));
            }
        }

        let updated = patched.len();
        entities.extend(patched);

        Ok(updated)
    }
}
