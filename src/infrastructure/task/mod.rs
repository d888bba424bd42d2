//! Task infrastructure: storage-backed repository and the member-facing service

mod repository;
mod service;

pub use repository::StorageTaskRepository;
pub use service::{NewTask, TaskService, TaskUpdate};
