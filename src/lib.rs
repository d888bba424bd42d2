//! Team Hub API
//!
//! Hackathon team management:
//! - Accounts with email/password signup and JWT sessions
//! - Team creation with unique 8-character invite codes
//! - Joining a team by code, one team per user
//! - Per-team task tracking
//! - Per-team activity notifications

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use api::state::AppState;
use domain::membership::MembershipStore;
use domain::notification::{Notification, NotificationRepository};
use domain::storage::Storage;
use domain::task::{Task, TaskRepository};
use domain::team::TeamRepository;
use infrastructure::{
    auth::{JwtConfig, JwtGenerator, JwtService},
    membership::{InMemoryDirectory, MembershipConfig, MembershipService, PostgresDirectory},
    notification::{
        ChannelNotificationSink, NotificationDispatcher, NotificationService,
        StorageNotificationRepository,
    },
    storage::{connect_pool, PostgresConfig, StorageFactory, StorageType},
    task::{StorageTaskRepository, TaskService},
    team::RandomCodeGenerator,
    user::{Argon2Hasher, UserService},
};
use rand::Rng;
use tracing::info;

/// Create the application state with default configuration (in-memory storage)
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let storage_backend: StorageType = config
        .storage
        .backend
        .parse()
        .map_err(anyhow::Error::msg)?;

    info!("Storage backend: {:?}", storage_backend);

    let jwt_service = create_jwt_service(config);

    match storage_backend {
        StorageType::Postgres => {
            let database_url = config
                .storage
                .url
                .clone()
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| {
                    anyhow::anyhow!("storage.url or DATABASE_URL is required for postgres")
                })?;

            let pg_config = PostgresConfig::new(database_url)
                .with_max_connections(config.storage.max_connections)
                .with_min_connections(config.storage.min_connections);

            info!("Connecting to PostgreSQL...");
            let pool = connect_pool(&pg_config).await?;
            info!("PostgreSQL connection established");

            let directory = PostgresDirectory::new(pool.clone());
            directory.ensure_schema().await?;

            let notifications = StorageFactory::create_postgres_with_pool::<Notification>(
                pool.clone(),
                "notifications",
            )
            .await?;
            let tasks = StorageFactory::create_postgres_with_pool::<Task>(pool, "tasks").await?;

            Ok(assemble_app_state(
                Arc::new(directory),
                notifications,
                tasks,
                config,
                jwt_service,
            ))
        }
        StorageType::InMemory => {
            info!("Using in-memory storage; data is lost on restart");

            Ok(assemble_app_state(
                Arc::new(InMemoryDirectory::new()),
                StorageFactory::create_in_memory::<Notification>(),
                StorageFactory::create_in_memory::<Task>(),
                config,
                jwt_service,
            ))
        }
    }
}

/// Wire services over `store` and start the notification dispatcher.
///
/// Must be called inside a tokio runtime. The dispatcher stops once the
/// returned state (and with it the channel sender) is dropped.
pub fn assemble_app_state<S>(
    store: Arc<S>,
    notifications: Arc<dyn Storage<Notification>>,
    tasks: Arc<dyn Storage<Task>>,
    config: &AppConfig,
    jwt_service: Arc<dyn JwtGenerator>,
) -> AppState
where
    S: MembershipStore + 'static,
{
    let notification_repository: Arc<dyn NotificationRepository> =
        Arc::new(StorageNotificationRepository::new(notifications));

    let (sink, receiver) = ChannelNotificationSink::new(config.notifications.channel_capacity);
    NotificationDispatcher::new(receiver, notification_repository.clone()).spawn();

    let membership_config = MembershipConfig {
        max_code_attempts: config.membership.max_code_attempts,
        store_timeout: Duration::from_millis(config.membership.store_timeout_ms),
    };

    let sink = Arc::new(sink);

    let membership_service = Arc::new(MembershipService::new(
        store.clone(),
        Arc::new(RandomCodeGenerator::new()),
        sink.clone(),
        membership_config,
    ));

    let user_service = Arc::new(UserService::new(store.clone(), Arc::new(Argon2Hasher::new())));

    let teams: Arc<dyn TeamRepository> = store;
    let notification_service = Arc::new(NotificationService::new(
        notification_repository,
        teams.clone(),
        config.notifications.list_limit,
    ));

    let task_repository: Arc<dyn TaskRepository> = Arc::new(StorageTaskRepository::new(tasks));
    let task_service = Arc::new(TaskService::new(
        task_repository,
        teams,
        sink,
        config.tasks.list_limit,
    ));

    AppState::new(
        membership_service,
        user_service,
        notification_service,
        task_service,
        jwt_service,
    )
}

fn create_jwt_service(config: &AppConfig) -> Arc<dyn JwtGenerator> {
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .or_else(|| std::env::var("JWT_SECRET").ok())
        .unwrap_or_else(|| {
            tracing::warn!(
                "No JWT_SECRET configured. Generating random secret. \
                Sessions will NOT persist across restarts."
            );
            generate_random_secret()
        });

    Arc::new(JwtService::new(JwtConfig::new(
        jwt_secret,
        u64::from(config.auth.jwt_expiration_hours),
    )))
}

/// Generate a random secret for JWT signing
fn generate_random_secret() -> String {
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
