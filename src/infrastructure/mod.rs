//! Infrastructure layer - Storage, authentication and service implementations

pub mod auth;
pub mod logging;
pub mod membership;
pub mod notification;
pub mod observability;
pub mod storage;
pub mod task;
pub mod team;
pub mod user;
