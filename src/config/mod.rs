//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthSettings, LogFormat, LoggingConfig, MembershipSettings, NotificationSettings,
    ServerConfig, StorageSettings, TaskSettings,
};
