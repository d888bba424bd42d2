//! Task domain
//!
//! Team-scoped work items tracked by members. Adding a task or completing one
//! produces a team notification.

mod entity;
mod repository;

pub use entity::{Task, TaskChanges, TaskId, TaskStatus, TaskValidationError};
pub use repository::TaskRepository;

#[cfg(test)]
pub use repository::MockTaskRepository;
