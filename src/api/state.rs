//! Application state for shared services

use std::sync::Arc;

use crate::domain::membership::{MembershipStore, TeamView};
use crate::domain::notification::Notification;
use crate::domain::task::Task;
use crate::domain::team::TeamCodeGenerator;
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::auth::JwtGenerator;
use crate::infrastructure::membership::MembershipService;
use crate::infrastructure::notification::NotificationService;
use crate::infrastructure::task::{NewTask, TaskService, TaskUpdate};
use crate::infrastructure::user::{CredentialHasher, SignupRequest, UserService};

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub membership_service: Arc<dyn MembershipServiceTrait>,
    pub user_service: Arc<dyn UserServiceTrait>,
    pub notification_service: Arc<dyn NotificationServiceTrait>,
    pub task_service: Arc<dyn TaskServiceTrait>,
    pub jwt_service: Arc<dyn JwtGenerator>,
}

impl AppState {
    pub fn new(
        membership_service: Arc<dyn MembershipServiceTrait>,
        user_service: Arc<dyn UserServiceTrait>,
        notification_service: Arc<dyn NotificationServiceTrait>,
        task_service: Arc<dyn TaskServiceTrait>,
        jwt_service: Arc<dyn JwtGenerator>,
    ) -> Self {
        Self {
            membership_service,
            user_service,
            notification_service,
            task_service,
            jwt_service,
        }
    }
}

/// Trait for membership operations exposed over HTTP
#[async_trait::async_trait]
pub trait MembershipServiceTrait: Send + Sync {
    async fn create_team(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<TeamView, DomainError>;
    async fn join_team(&self, user_id: &UserId, team_code: &str) -> Result<TeamView, DomainError>;
    async fn get_team_for_user(&self, user_id: &UserId) -> Result<TeamView, DomainError>;
    async fn get_team_by_id(&self, team_id: &str) -> Result<TeamView, DomainError>;
    /// Backing store reachability for readiness probes
    async fn health_check(&self) -> Result<(), DomainError>;
}

/// Trait for account operations
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn signup(&self, request: SignupRequest) -> Result<User, DomainError>;
    async fn authenticate(&self, email: &str, password: &str)
        -> Result<Option<User>, DomainError>;
    async fn get(&self, id: &str) -> Result<Option<User>, DomainError>;
}

/// Trait for member-scoped notification reads
#[async_trait::async_trait]
pub trait NotificationServiceTrait: Send + Sync {
    async fn list_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, DomainError>;
    async fn mark_all_read_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<usize, DomainError>;
}

/// Trait for member-scoped task tracking
#[async_trait::async_trait]
pub trait TaskServiceTrait: Send + Sync {
    async fn add_task(
        &self,
        user_id: &UserId,
        team_id: &str,
        new_task: NewTask,
    ) -> Result<Task, DomainError>;
    async fn update_task(
        &self,
        user_id: &UserId,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Task, DomainError>;
    async fn list_for_member(&self, team_id: &str, user_id: &UserId)
        -> Result<Vec<Task>, DomainError>;
}

// Implement traits for the actual services

#[async_trait::async_trait]
impl<S, G> MembershipServiceTrait for MembershipService<S, G>
where
    S: MembershipStore + 'static,
    G: TeamCodeGenerator + 'static,
{
    async fn create_team(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<TeamView, DomainError> {
        MembershipService::create_team_view(self, user_id, name, description).await
    }

    async fn join_team(&self, user_id: &UserId, team_code: &str) -> Result<TeamView, DomainError> {
        MembershipService::join_team_view(self, user_id, team_code).await
    }

    async fn get_team_for_user(&self, user_id: &UserId) -> Result<TeamView, DomainError> {
        MembershipService::get_team_for_user(self, user_id).await
    }

    async fn get_team_by_id(&self, team_id: &str) -> Result<TeamView, DomainError> {
        MembershipService::get_team_by_id(self, team_id).await
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        MembershipService::health_check(self).await
    }
}

#[async_trait::async_trait]
impl<R, H> UserServiceTrait for UserService<R, H>
where
    R: UserRepository + 'static,
    H: CredentialHasher + 'static,
{
    async fn signup(&self, request: SignupRequest) -> Result<User, DomainError> {
        UserService::signup(self, request).await
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, DomainError> {
        UserService::authenticate(self, email, password).await
    }

    async fn get(&self, id: &str) -> Result<Option<User>, DomainError> {
        UserService::get(self, id).await
    }
}

#[async_trait::async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn list_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, DomainError> {
        NotificationService::list_for_member(self, team_id, user_id).await
    }

    async fn mark_all_read_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<usize, DomainError> {
        NotificationService::mark_all_read_for_member(self, team_id, user_id).await
    }
}

#[async_trait::async_trait]
impl TaskServiceTrait for TaskService {
    async fn add_task(
        &self,
        user_id: &UserId,
        team_id: &str,
        new_task: NewTask,
    ) -> Result<Task, DomainError> {
        TaskService::add_task(self, user_id, team_id, new_task).await
    }

    async fn update_task(
        &self,
        user_id: &UserId,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Task, DomainError> {
        TaskService::update_task(self, user_id, task_id, update).await
    }

    async fn list_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<Vec<Task>, DomainError> {
        TaskService::list_for_member(self, team_id, user_id).await
    }
}
