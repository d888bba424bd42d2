//! Notification entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::team::TeamId;

/// Notification identifier (UUID string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for NotificationId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Kind of team activity a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Info,
    Join,
    Task,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Join => "join",
            Self::Task => "task",
        }
    }
}

/// A persisted team notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    id: NotificationId,
    team_id: TeamId,
    title: String,
    subtitle: String,
    category: NotificationCategory,
    read: bool,
    created_at: DateTime<Utc>,
}

impl Notification {
    /// Create an unread notification
    pub fn new(
        team_id: TeamId,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            team_id,
            title: title.into(),
            subtitle: subtitle.into(),
            category,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &NotificationId {
        &self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl StorageEntity for Notification {
    type Key = NotificationId;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn scope(&self) -> &str {
        self.team_id.as_str()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
