//! Membership coordinator
//!
//! Runs the create and join protocols on top of a [`MembershipStore`], bounds
//! every store call with a timeout, and publishes events once a write commits.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::domain::membership::{MembershipStore, TeamView, ALREADY_IN_TEAM, ALREADY_MEMBER};
use crate::domain::notification::{NotificationSink, TeamEvent};
use crate::domain::team::{
    validate_team_description, validate_team_name, Team, TeamCode, TeamCodeGenerator, TeamId,
    TeamRepository, TeamValidationError,
};
use crate::domain::user::{User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_code_collision, record_membership_operation};

const NOT_IN_TEAM: &str = "User is not in any team";
const INVALID_CODE: &str = "Invalid team code";
const TEAM_NOT_FOUND: &str = "Team not found";
const USER_NOT_FOUND: &str = "User not found";

/// Tuning for the coordinator
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Codes tried before giving up on create
    pub max_code_attempts: u32,
    /// Upper bound on each store call
    pub store_timeout: Duration,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            max_code_attempts: 5,
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Coordinates team creation, joining and team reads
pub struct MembershipService<S: MembershipStore, G: TeamCodeGenerator> {
    store: Arc<S>,
    generator: Arc<G>,
    sink: Arc<dyn NotificationSink>,
    config: MembershipConfig,
}

impl<S: MembershipStore, G: TeamCodeGenerator> std::fmt::Debug for MembershipService<S, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipService")
            .field("store", &self.store)
            .field("generator", &self.generator)
            .field("config", &self.config)
            .finish()
    }
}

impl<S: MembershipStore, G: TeamCodeGenerator> MembershipService<S, G> {
    pub fn new(
        store: Arc<S>,
        generator: Arc<G>,
        sink: Arc<dyn NotificationSink>,
        config: MembershipConfig,
    ) -> Self {
        Self {
            store,
            generator,
            sink,
            config,
        }
    }

    /// Create a team led by `user_id`
    pub async fn create_team(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Team, DomainError> {
        self.create_team_recorded(user_id, name, description)
            .await
            .map(|(team, _)| team)
    }

    /// Create a team and project it.
    ///
    /// Once the store has committed, member resolution can no longer turn the
    /// call into an error.
    pub async fn create_team_view(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<TeamView, DomainError> {
        let (team, leader) = self.create_team_recorded(user_id, name, description).await?;
        Ok(self.committed_view(&team, &leader).await)
    }

    async fn create_team_recorded(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(Team, User), DomainError> {
        let started = Instant::now();
        let result = self.create_team_inner(user_id, name, description).await;
        record_membership_operation("create_team", &result, started.elapsed());
        result
    }

    async fn create_team_inner(
        &self,
        user_id: &UserId,
        name: &str,
        description: Option<&str>,
    ) -> Result<(Team, User), DomainError> {
        let name = name.trim();
        validate_team_name(name).map_err(|e| DomainError::validation(e.to_string()))?;

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if let Some(description) = description {
            validate_team_description(description)
                .map_err(|e| DomainError::validation(e.to_string()))?;
        }

        let user = self.require_user(user_id).await?;
        if user.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        let attempts = self.config.max_code_attempts.max(1);

        for attempt in 1..=attempts {
            let code = self.generator.generate();

            if self
                .bounded("exists_code", self.store.exists_code(&code))
                .await?
            {
                debug!(attempt, code = %code, "Team code already registered");
                record_code_collision();
                continue;
            }

            let mut team = Team::new(TeamId::generate(), name, code, user_id.clone())
                .map_err(|e| DomainError::validation(e.to_string()))?;
            if let Some(description) = description {
                team = team.with_description(description);
            }
            let team_id = team.id().clone();

            let created = match self
                .bounded(
                    "create_team_with_leader",
                    self.store.create_team_with_leader(team),
                )
                .await
            {
                Err(e) if e.is_unavailable() => self.recover_commit(user_id, &team_id, e).await,
                other => other,
            };

            match created {
                Ok(team) => {
                    info!(
                        team_id = %team.id(),
                        user_id = %user_id,
                        attempt,
                        "Team created"
                    );
                    self.sink.publish(TeamEvent::TeamCreated {
                        team_id: team.id().clone(),
                        team_name: team.name().to_string(),
                        actor_email: user.email().to_string(),
                    });
                    return Ok((team, user));
                }
                Err(e) if e.is_unique_violation_on("team_code") => {
                    debug!(attempt, "Team code taken at insert time");
                    record_code_collision();
                }
                Err(e) => return Err(e),
            }
        }

        warn!(user_id = %user_id, attempts, "Exhausted team code attempts");
        Err(DomainError::code_exhausted(format!(
            "No unique team code after {} attempts",
            attempts
        )))
    }

    /// Join the team identified by `raw_code`
    pub async fn join_team(&self, user_id: &UserId, raw_code: &str) -> Result<Team, DomainError> {
        self.join_team_recorded(user_id, raw_code)
            .await
            .map(|(team, _)| team)
    }

    /// Join a team and project it; see [`Self::create_team_view`]
    pub async fn join_team_view(
        &self,
        user_id: &UserId,
        raw_code: &str,
    ) -> Result<TeamView, DomainError> {
        let (team, member) = self.join_team_recorded(user_id, raw_code).await?;
        Ok(self.committed_view(&team, &member).await)
    }

    async fn join_team_recorded(
        &self,
        user_id: &UserId,
        raw_code: &str,
    ) -> Result<(Team, User), DomainError> {
        let started = Instant::now();
        let result = self.join_team_inner(user_id, raw_code).await;
        record_membership_operation("join_team", &result, started.elapsed());
        result
    }

    async fn join_team_inner(
        &self,
        user_id: &UserId,
        raw_code: &str,
    ) -> Result<(Team, User), DomainError> {
        let code = match TeamCode::parse(raw_code) {
            Ok(code) => code,
            Err(TeamValidationError::EmptyCode) => {
                return Err(DomainError::validation(TeamValidationError::EmptyCode.to_string()));
            }
            // No registered code can have another shape.
            Err(_) => return Err(DomainError::not_found(INVALID_CODE)),
        };

        let team = self
            .bounded("get_by_code", self.store.get_by_code(&code))
            .await?
            .ok_or_else(|| DomainError::not_found(INVALID_CODE))?;

        let user = self.require_user(user_id).await?;

        if team.is_member(user_id) {
            return Err(DomainError::conflict(ALREADY_MEMBER));
        }

        if user.has_team() {
            return Err(DomainError::conflict(ALREADY_IN_TEAM));
        }

        let team = match self
            .bounded("add_member", self.store.add_member(team.id(), user_id))
            .await
        {
            Err(e) if e.is_unavailable() => self.recover_commit(user_id, team.id(), e).await?,
            other => other?,
        };

        info!(team_id = %team.id(), user_id = %user_id, "Member joined team");
        self.sink.publish(TeamEvent::MemberJoined {
            team_id: team.id().clone(),
            user_id: user_id.clone(),
            actor_email: user.email().to_string(),
        });

        Ok((team, user))
    }

    /// Settle a write whose answer was lost.
    ///
    /// The store may have committed before the timeout fired. The user's team
    /// pointer is written in the same atomic step as the team, so it tells
    /// which way the write went.
    async fn recover_commit(
        &self,
        user_id: &UserId,
        team_id: &TeamId,
        error: DomainError,
    ) -> Result<Team, DomainError> {
        let user = match self
            .bounded("get_user", UserRepository::get(&*self.store, user_id))
            .await
        {
            Ok(Some(user)) => user,
            _ => return Err(error),
        };

        if user.team_id() != Some(team_id) {
            return Err(error);
        }

        match self
            .bounded("get_team", TeamRepository::get(&*self.store, team_id))
            .await
        {
            Ok(Some(team)) => {
                warn!(
                    team_id = %team_id,
                    user_id = %user_id,
                    "Store answered late; write had committed"
                );
                Ok(team)
            }
            _ => Err(error),
        }
    }

    /// The team `user_id` currently belongs to
    pub async fn get_team_for_user(&self, user_id: &UserId) -> Result<TeamView, DomainError> {
        let user = UserRepository::get(&*self.store, user_id);
        let team_id = self
            .bounded("get_user", user)
            .await?
            .and_then(|u| u.team_id().cloned())
            .ok_or_else(|| DomainError::not_found(NOT_IN_TEAM))?;

        let team = self
            .bounded("get_team", TeamRepository::get(&*self.store, &team_id))
            .await?
            .ok_or_else(|| DomainError::not_found(NOT_IN_TEAM))?;

        self.view(&team).await
    }

    /// Look a team up by id
    pub async fn get_team_by_id(&self, team_id: &str) -> Result<TeamView, DomainError> {
        let team = self.require_team(team_id).await?;
        self.view(&team).await
    }

    /// Load a team by id, failing with `NotFound` for unknown or malformed ids
    pub async fn require_team(&self, team_id: &str) -> Result<Team, DomainError> {
        let team_id = TeamId::new(team_id).map_err(|_| DomainError::not_found(TEAM_NOT_FOUND))?;

        self.bounded("get_team", TeamRepository::get(&*self.store, &team_id))
            .await?
            .ok_or_else(|| DomainError::not_found(TEAM_NOT_FOUND))
    }

    /// Resolve members to their user records
    async fn view(&self, team: &Team) -> Result<TeamView, DomainError> {
        let ids: Vec<UserId> = team.members().iter().map(|m| m.user_id.clone()).collect();
        let users = self
            .bounded("get_many_users", self.store.get_many(&ids))
            .await?;

        Ok(TeamView::project(team, &users))
    }

    /// Project a team right after a committed write.
    ///
    /// `actor` is already loaded. If the other members cannot be resolved they
    /// keep empty name and email.
    async fn committed_view(&self, team: &Team, actor: &User) -> TeamView {
        match self.view(team).await {
            Ok(view) => view,
            Err(e) => {
                warn!(
                    team_id = %team.id(),
                    error = %e,
                    "Member lookup failed after commit; returning partial team"
                );
                TeamView::project(team, std::slice::from_ref(actor))
            }
        }
    }

    /// Readiness probe for the underlying store
    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.bounded("health_check", self.store.health_check()).await
    }

    async fn require_user(&self, user_id: &UserId) -> Result<User, DomainError> {
        self.bounded("get_user", UserRepository::get(&*self.store, user_id))
            .await?
            .ok_or_else(|| DomainError::not_found(USER_NOT_FOUND))
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(DomainError::unavailable(format!(
                    "Store did not answer {} in time",
                    operation
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use regex::Regex;

    use crate::api::state::MembershipServiceTrait;
    use crate::domain::team::{MemberRole, ScriptedCodeGenerator};
    use crate::infrastructure::membership::InMemoryDirectory;
    use crate::infrastructure::notification::ChannelNotificationSink;
    use crate::infrastructure::team::RandomCodeGenerator;

    #[derive(Debug, Default)]
    struct RecordingSink {
        events: Mutex<Vec<TeamEvent>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<TeamEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl NotificationSink for RecordingSink {
        fn publish(&self, event: TeamEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    /// Wraps the in-memory store to inject latency and failures
    #[derive(Debug, Default)]
    struct DelegatingStore {
        inner: InMemoryDirectory,
        latency: Option<Duration>,
        hide_codes: bool,
        /// `get_many` fails as if a replica were down
        fail_get_many: bool,
        /// Atomic writes commit, then report `Unavailable`
        lose_commit_answer: bool,
        /// Atomic writes fail with `Unavailable` without committing
        reject_writes: bool,
    }

    impl DelegatingStore {
        fn write_outcome(&self, committed: Result<Team, DomainError>) -> Result<Team, DomainError> {
            if self.lose_commit_answer && committed.is_ok() {
                return Err(DomainError::unavailable("connection reset after commit"));
            }
            committed
        }
    }

    impl DelegatingStore {
        async fn pause(&self) {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl TeamRepository for DelegatingStore {
        async fn get(&self, id: &TeamId) -> Result<Option<Team>, DomainError> {
            self.pause().await;
            TeamRepository::get(&self.inner, id).await
        }

        async fn get_by_code(&self, code: &TeamCode) -> Result<Option<Team>, DomainError> {
            self.pause().await;
            self.inner.get_by_code(code).await
        }

        async fn create(&self, team: Team) -> Result<Team, DomainError> {
            TeamRepository::create(&self.inner, team).await
        }

        async fn update(&self, team: Team) -> Result<Team, DomainError> {
            TeamRepository::update(&self.inner, team).await
        }

        async fn exists_code(&self, code: &TeamCode) -> Result<bool, DomainError> {
            self.pause().await;
            if self.hide_codes {
                return Ok(false);
            }
            self.inner.exists_code(code).await
        }
    }

    #[async_trait]
    impl UserRepository for DelegatingStore {
        async fn get(&self, id: &UserId) -> Result<Option<User>, DomainError> {
            self.pause().await;
            UserRepository::get(&self.inner, id).await
        }

        async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
            self.inner.get_by_email(email).await
        }

        async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, DomainError> {
            if self.fail_get_many {
                return Err(DomainError::unavailable("replica timeout"));
            }
            self.inner.get_many(ids).await
        }

        async fn create(&self, user: User) -> Result<User, DomainError> {
            UserRepository::create(&self.inner, user).await
        }

        async fn update(&self, user: &User) -> Result<User, DomainError> {
            UserRepository::update(&self.inner, user).await
        }
    }

    #[async_trait]
    impl MembershipStore for DelegatingStore {
        async fn create_team_with_leader(&self, team: Team) -> Result<Team, DomainError> {
            self.pause().await;
            if self.reject_writes {
                return Err(DomainError::unavailable("primary down"));
            }
            self.write_outcome(self.inner.create_team_with_leader(team).await)
        }

        async fn add_member(
            &self,
            team_id: &TeamId,
            user_id: &UserId,
        ) -> Result<Team, DomainError> {
            self.pause().await;
            if self.reject_writes {
                return Err(DomainError::unavailable("primary down"));
            }
            self.write_outcome(self.inner.add_member(team_id, user_id).await)
        }
    }

    async fn add_user<S: MembershipStore>(store: &S, id: &str) -> UserId {
        let user_id = UserId::new(id).unwrap();
        let user = User::new(user_id.clone(), id, &format!("{}@x.io", id), "hash");
        UserRepository::create(store, user).await.unwrap();
        user_id
    }

    fn service_with<S: MembershipStore, G: TeamCodeGenerator>(
        store: Arc<S>,
        generator: G,
        config: MembershipConfig,
    ) -> (MembershipService<S, G>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let service = MembershipService::new(store, Arc::new(generator), sink.clone(), config);
        (service, sink)
    }

    fn default_service() -> (
        MembershipService<InMemoryDirectory, RandomCodeGenerator>,
        Arc<InMemoryDirectory>,
        Arc<RecordingSink>,
    ) {
        let store = Arc::new(InMemoryDirectory::new());
        let (service, sink) = service_with(
            store.clone(),
            RandomCodeGenerator::new(),
            MembershipConfig::default(),
        );
        (service, store, sink)
    }

    async fn stored_team<S: MembershipStore>(store: &S, team_id: &TeamId) -> Team {
        TeamRepository::get(store, team_id).await.unwrap().unwrap()
    }

    async fn stored_user<S: MembershipStore>(store: &S, user_id: &UserId) -> User {
        UserRepository::get(store, user_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_rocket_create_then_join() {
        let (service, store, sink) = default_service();
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let team = service.create_team(&alice, "Rocket", None).await.unwrap();

        let code_shape = Regex::new(r"^[A-Z0-9]{8}$").unwrap();
        assert!(code_shape.is_match(team.team_code().as_str()));
        assert_eq!(team.members().len(), 1);
        assert_eq!(team.members()[0].role, MemberRole::Leader);
        assert_eq!(team.leader_id(), &alice);

        let typed = format!("  {} ", team.team_code().as_str().to_lowercase());
        let joined = service.join_team(&bob, &typed).await.unwrap();
        assert_eq!(joined.id(), team.id());
        assert_eq!(joined.members().len(), 2);

        let view = service.get_team_for_user(&bob).await.unwrap();
        assert_eq!(view.name, "Rocket");
        assert_eq!(view.roles(), vec![MemberRole::Leader, MemberRole::Member]);
        assert_eq!(view.members[1].email, "bob@x.io");

        let bob_user = stored_user(&*store, &bob).await;
        assert_eq!(bob_user.team_id(), Some(team.id()));
        assert_eq!(bob_user.role_in_team(), MemberRole::Member);

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].subtitle(), "alice@x.io created the team");
        assert_eq!(events[1].subtitle(), "bob@x.io joined");
    }

    #[tokio::test]
    async fn test_created_codes_are_unique() {
        let (service, store, _) = default_service();
        let mut codes = HashSet::new();

        for i in 0..25 {
            let user = add_user(&*store, &format!("user-{}", i)).await;
            let team = service.create_team(&user, "Team", None).await.unwrap();
            codes.insert(team.team_code().to_string());
        }

        assert_eq!(codes.len(), 25);
    }

    #[tokio::test]
    async fn test_create_team_with_description() {
        let (service, store, _) = default_service();
        let alice = add_user(&*store, "alice").await;

        let team = service
            .create_team(&alice, "  Rocket  ", Some(" Launch things "))
            .await
            .unwrap();

        assert_eq!(team.name(), "Rocket");
        assert_eq!(team.description(), Some("Launch things"));
    }

    #[tokio::test]
    async fn test_create_team_blank_name() {
        let (service, store, sink) = default_service();
        let alice = add_user(&*store, "alice").await;

        let result = service.create_team(&alice, "   ", None).await;
        match result {
            Err(DomainError::Validation { message }) => assert_eq!(message, "Team name required"),
            other => panic!("expected validation error, got {:?}", other),
        }

        assert!(!stored_user(&*store, &alice).await.has_team());
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_create_team_unknown_user() {
        let (service, _, _) = default_service();

        let result = service
            .create_team(&UserId::new("ghost").unwrap(), "Rocket", None)
            .await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_create_retries_registered_code() {
        let store = Arc::new(InMemoryDirectory::new());
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let (seed, _) = service_with(
            store.clone(),
            ScriptedCodeGenerator::new(&["AAAAAAAA"]),
            MembershipConfig::default(),
        );
        seed.create_team(&alice, "First", None).await.unwrap();

        let generator = ScriptedCodeGenerator::new(&["AAAAAAAA", "AAAAAAAA", "BBBBBBBB"]);
        let (service, _) = service_with(store.clone(), generator, MembershipConfig::default());

        let team = service.create_team(&bob, "Second", None).await.unwrap();
        assert_eq!(team.team_code().as_str(), "BBBBBBBB");
        assert_eq!(service.generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_create_retries_unique_violation_at_insert() {
        let store = Arc::new(DelegatingStore {
            hide_codes: true,
            ..Default::default()
        });
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let generator = ScriptedCodeGenerator::new(&["AAAAAAAA", "AAAAAAAA", "CCCCCCCC"]);
        let (service, _) = service_with(store.clone(), generator, MembershipConfig::default());

        service.create_team(&alice, "First", None).await.unwrap();
        let team = service.create_team(&bob, "Second", None).await.unwrap();

        assert_eq!(team.team_code().as_str(), "CCCCCCCC");
        assert_eq!(service.generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_create_exhausts_code_attempts() {
        let store = Arc::new(InMemoryDirectory::new());
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let (service, sink) = service_with(
            store.clone(),
            ScriptedCodeGenerator::new(&["AAAAAAAA"]),
            MembershipConfig::default(),
        );
        service.create_team(&alice, "First", None).await.unwrap();

        let result = service.create_team(&bob, "Second", None).await;
        assert!(matches!(result, Err(DomainError::CodeExhausted { .. })));
        // one call for the first team, five failed attempts for the second
        assert_eq!(service.generator.calls(), 6);
        assert!(!stored_user(&*store, &bob).await.has_team());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_join_twice_is_conflict() {
        let (service, store, _) = default_service();
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let team = service.create_team(&alice, "Rocket", None).await.unwrap();
        let code = team.team_code().to_string();

        service.join_team(&bob, &code).await.unwrap();
        let second = service.join_team(&bob, &code).await;

        match second {
            Err(DomainError::Conflict { message }) => assert_eq!(message, ALREADY_MEMBER),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(stored_team(&*store, team.id()).await.members().len(), 2);

        let leader = service.join_team(&alice, &code).await;
        assert!(matches!(leader, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_add_one_member() {
        let (service, store, sink) = default_service();
        let service = Arc::new(service);
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let team = service.create_team(&alice, "Rocket", None).await.unwrap();
        let code = team.team_code().to_string();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                let bob = bob.clone();
                let code = code.clone();
                tokio::spawn(async move { service.join_team(&bob, &code).await })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::Conflict { .. })))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);

        let stored = stored_team(&*store, team.id()).await;
        let bob_entries = stored.members().iter().filter(|m| m.user_id == bob).count();
        assert_eq!(bob_entries, 1);
        assert_eq!(stored.members().len(), 2);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let (service, store, sink) = default_service();
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;
        let team = service.create_team(&alice, "Rocket", None).await.unwrap();

        for code in ["ZZZZZZZZ", "NONEXISTENT-CODE"] {
            match service.join_team(&bob, code).await {
                Err(DomainError::NotFound { message }) => assert_eq!(message, INVALID_CODE),
                other => panic!("expected not found, got {:?}", other),
            }
        }

        assert_eq!(stored_team(&*store, team.id()).await.members().len(), 1);
        assert!(!stored_user(&*store, &bob).await.has_team());
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn test_join_empty_code() {
        let (service, store, _) = default_service();
        let bob = add_user(&*store, "bob").await;

        match service.join_team(&bob, "   ").await {
            Err(DomainError::Validation { message }) => assert_eq!(message, "Code required"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_member_of_one_team_cannot_join_or_create_another() {
        let (service, store, _) = default_service();
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;
        let carol = add_user(&*store, "carol").await;

        let team_a = service.create_team(&alice, "A", None).await.unwrap();
        let team_b = service.create_team(&carol, "B", None).await.unwrap();
        service
            .join_team(&bob, team_a.team_code().as_str())
            .await
            .unwrap();

        match service.join_team(&bob, team_b.team_code().as_str()).await {
            Err(DomainError::Conflict { message }) => assert_eq!(message, ALREADY_IN_TEAM),
            other => panic!("expected conflict, got {:?}", other),
        }

        let created = service.create_team(&bob, "C", None).await;
        assert!(matches!(created, Err(DomainError::Conflict { .. })));

        let a = stored_team(&*store, team_a.id()).await;
        let b = stored_team(&*store, team_b.id()).await;
        assert_eq!(a.members().iter().filter(|m| m.user_id == bob).count(), 1);
        assert_eq!(b.members().len(), 1);
        assert!(!b.is_member(&bob));
        assert_eq!(stored_user(&*store, &bob).await.team_id(), Some(team_a.id()));
    }

    #[tokio::test]
    async fn test_get_team_for_teamless_user() {
        let (service, store, _) = default_service();
        let bob = add_user(&*store, "bob").await;

        for user in [bob, UserId::new("ghost").unwrap()] {
            match service.get_team_for_user(&user).await {
                Err(DomainError::NotFound { message }) => assert_eq!(message, NOT_IN_TEAM),
                other => panic!("expected not found, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_get_team_by_id() {
        let (service, store, _) = default_service();
        let alice = add_user(&*store, "alice").await;
        let team = service.create_team(&alice, "Rocket", None).await.unwrap();

        let view = service.get_team_by_id(team.id().as_str()).await.unwrap();
        assert_eq!(view.id, team.id().as_str());
        assert_eq!(view.members[0].name, "alice");

        let unknown = service.get_team_by_id("missing-team").await;
        assert!(matches!(unknown, Err(DomainError::NotFound { .. })));

        let malformed = service.get_team_by_id("../etc/passwd").await;
        assert!(matches!(malformed, Err(DomainError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_slow_store_is_unavailable() {
        let store = Arc::new(DelegatingStore {
            latency: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let alice = add_user(&*store, "alice").await;

        let config = MembershipConfig {
            store_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let (service, sink) = service_with(store.clone(), RandomCodeGenerator::new(), config);

        let created = service.create_team(&alice, "Rocket", None).await;
        assert!(matches!(created, Err(DomainError::Unavailable { .. })));

        let joined = service.join_team(&alice, "AB12CD34").await;
        assert!(matches!(joined, Err(DomainError::Unavailable { .. })));

        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_closed_notification_channel_does_not_fail_membership() {
        let store = Arc::new(InMemoryDirectory::new());
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;

        let (sink, receiver) = ChannelNotificationSink::new(1);
        drop(receiver);

        let service = MembershipService::new(
            store.clone(),
            Arc::new(RandomCodeGenerator::new()),
            Arc::new(sink),
            MembershipConfig::default(),
        );

        let team = service.create_team(&alice, "Rocket", None).await.unwrap();
        let joined = service
            .join_team(&bob, team.team_code().as_str())
            .await
            .unwrap();
        assert_eq!(joined.members().len(), 2);
    }

    #[tokio::test]
    async fn test_member_lookup_failure_after_commit_keeps_success() {
        let store = Arc::new(DelegatingStore {
            fail_get_many: true,
            ..Default::default()
        });
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;
        let (service, sink) =
            service_with(store.clone(), RandomCodeGenerator::new(), MembershipConfig::default());

        let created = MembershipServiceTrait::create_team(&service, &alice, "Rocket", None)
            .await
            .unwrap();
        assert_eq!(created.members.len(), 1);
        assert_eq!(created.members[0].name, "alice");
        assert_eq!(created.members[0].email, "alice@x.io");

        let joined = MembershipServiceTrait::join_team(&service, &bob, &created.team_code)
            .await
            .unwrap();
        assert_eq!(joined.members.len(), 2);
        assert_eq!(joined.members[1].email, "bob@x.io");
        assert!(joined.members[0].email.is_empty());

        assert_eq!(sink.events().len(), 2);
        let bob_record = stored_user(&*store, &bob).await;
        assert_eq!(bob_record.team_id().map(|t| t.to_string()), Some(joined.id));

        // A retry now reports the membership that already exists.
        let retry = MembershipServiceTrait::create_team(&service, &alice, "Rocket", None).await;
        assert!(matches!(retry, Err(DomainError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_lost_commit_answer_is_recovered() {
        let store = Arc::new(DelegatingStore {
            lose_commit_answer: true,
            ..Default::default()
        });
        let alice = add_user(&*store, "alice").await;
        let bob = add_user(&*store, "bob").await;
        let (service, sink) =
            service_with(store.clone(), RandomCodeGenerator::new(), MembershipConfig::default());

        let team = service.create_team(&alice, "Rocket", None).await.unwrap();
        assert_eq!(stored_user(&*store, &alice).await.team_id(), Some(team.id()));

        let joined = service
            .join_team(&bob, team.team_code().as_str())
            .await
            .unwrap();
        assert_eq!(joined.members().len(), 2);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_uncommitted_write_reports_unavailable() {
        let store = Arc::new(DelegatingStore {
            reject_writes: true,
            ..Default::default()
        });
        let alice = add_user(&*store, "alice").await;
        let (service, sink) =
            service_with(store.clone(), RandomCodeGenerator::new(), MembershipConfig::default());

        let created = service.create_team(&alice, "Rocket", None).await;
        assert!(matches!(created, Err(DomainError::Unavailable { .. })));
        assert!(!stored_user(&*store, &alice).await.has_team());
        assert!(sink.events().is_empty());
    }

    /// Random codes, remembering every code handed out
    #[derive(Debug)]
    struct TrackingGenerator {
        inner: RandomCodeGenerator,
        issued: Mutex<Vec<TeamCode>>,
    }

    impl TeamCodeGenerator for TrackingGenerator {
        fn generate(&self) -> TeamCode {
            let code = self.inner.generate();
            self.issued.lock().unwrap().push(code.clone());
            code
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_make_one_team() {
        let store = Arc::new(InMemoryDirectory::new());
        let alice = add_user(&*store, "alice").await;
        let generator = Arc::new(TrackingGenerator {
            inner: RandomCodeGenerator::new(),
            issued: Mutex::new(Vec::new()),
        });
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(MembershipService::new(
            store.clone(),
            generator.clone(),
            sink.clone(),
            MembershipConfig::default(),
        ));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                let alice = alice.clone();
                tokio::spawn(async move {
                    service
                        .create_team(&alice, &format!("Rocket {}", i), None)
                        .await
                })
            })
            .collect();

        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let created: Vec<&Team> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::Conflict { .. })))
            .count();
        assert_eq!(created.len(), 1);
        assert_eq!(conflicts, 15);

        let team = created[0];
        assert_eq!(stored_user(&*store, &alice).await.team_id(), Some(team.id()));
        assert_eq!(stored_team(&*store, team.id()).await.members().len(), 1);
        assert_eq!(sink.events().len(), 1);

        let issued = generator.issued.lock().unwrap().clone();
        let mut registered = 0;
        for code in &issued {
            if store.get_by_code(code).await.unwrap().is_some() {
                registered += 1;
            }
        }
        assert_eq!(registered, 1);
    }
}
