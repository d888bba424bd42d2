//! Domain layer - Core business logic and entities

pub mod error;
pub mod membership;
pub mod notification;
pub mod storage;
pub mod task;
pub mod team;
pub mod user;

pub use error::DomainError;
pub use membership::{MembershipStore, MemberView, TeamView};
pub use notification::{
    Notification, NotificationCategory, NotificationId, NotificationRepository, NotificationSink,
    TeamEvent,
};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use task::{Task, TaskId, TaskRepository, TaskStatus};
pub use team::{Member, MemberRole, Team, TeamCode, TeamCodeGenerator, TeamId, TeamRepository};
pub use user::{User, UserId, UserRepository};
