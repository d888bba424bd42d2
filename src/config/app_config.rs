use config::ConfigError;
use serde::Deserialize;

use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::storage::StorageType;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub membership: MembershipSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub tasks: TaskSettings,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend selection (`memory` or `postgres`)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: String,
    /// Connection URL; falls back to `DATABASE_URL`
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 secret; falls back to `JWT_SECRET`, then a random secret
    pub jwt_secret: Option<String>,
    pub jwt_expiration_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MembershipSettings {
    /// Generated codes tried before giving up on a create
    pub max_code_attempts: u32,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub channel_capacity: usize,
    pub list_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    pub list_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            url: None,
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_hours: 24 * 7,
        }
    }
}

impl Default for MembershipSettings {
    fn default() -> Self {
        Self {
            max_code_attempts: 5,
            store_timeout_ms: 5_000,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            list_limit: 200,
        }
    }
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self { list_limit: 500 }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("membership.max_code_attempts", self.membership.max_code_attempts as u64),
            ("membership.store_timeout_ms", self.membership.store_timeout_ms),
            ("notifications.channel_capacity", self.notifications.channel_capacity as u64),
            ("notifications.list_limit", self.notifications.list_limit as u64),
            ("tasks.list_limit", self.tasks.list_limit as u64),
        ];

        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Message(format!("{} must be greater than 0", key)));
            }
        }

        self.storage
            .backend
            .parse::<StorageType>()
            .map_err(ConfigError::Message)?;

        Ok(())
    }
}
