//! Storage entity traits and types

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for types that can be used as storage keys
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + std::hash::Hash {
    /// Returns the key as a string for storage backends that require string keys
    fn as_str(&self) -> &str;
}

/// Trait for types that can be stored.
///
/// Every entity belongs to a scope (the owning team) and is listed newest
/// first within it.
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    /// The key type for this entity
    type Key: StorageKey;

    /// Returns the entity's key
    fn key(&self) -> &Self::Key;

    /// Scope the entity is listed under
    fn scope(&self) -> &str;

    /// Ordering timestamp within the scope
    fn created_at(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{Notification, NotificationCategory};
    use crate::domain::task::Task;
    use crate::domain::team::TeamId;

    #[test]
    fn test_notification_is_scoped_by_team() {
        let notification = Notification::new(
            TeamId::new("team-1").unwrap(),
            "Team Created",
            "a@x.io created the team",
            NotificationCategory::Info,
        );

        assert_eq!(notification.key().as_str(), notification.id().as_str());
        assert_eq!(notification.scope(), "team-1");
    }

    #[test]
    fn test_task_is_scoped_by_team() {
        let task = Task::new(TeamId::new("team-2").unwrap(), "Write README").unwrap();

        assert_eq!(task.key().as_str(), task.id().as_str());
        assert_eq!(task.scope(), "team-2");
        assert_eq!(StorageEntity::created_at(&task), task.created_at());
    }
}
