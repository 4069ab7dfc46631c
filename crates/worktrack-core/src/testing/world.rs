//! A fully wired service graph over in-memory collaborators.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use super::memory::{FixedClock, MemoryDirectory, MemoryObjectStore, MemoryStore};
use crate::app::Worktrack;
use crate::auth::Actor;
use crate::clock::Clock;
use crate::config::WorktrackConfig;
use crate::context::ServiceContext;
use crate::directory::AccountDirectory;
use crate::schema::*;

/// Parse a `YYYY-MM-DD` date. Panics on bad input.
pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Parse an RFC 3339 timestamp. Panics on bad input.
pub fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// Services plus direct handles to their collaborators.
///
/// The clock starts at 2025-01-15 09:00 UTC. Projects made with
/// [`TestWorld::project`] run through 2025 and tasks made with
/// [`TestWorld::task`] are due on 2025-03-01.
///
/// # Example
///
/// ```ignore
/// let world = TestWorld::new();
/// let admin = world.admin().await;
/// let bob = world.user("bob").await;
/// let project = world.project(&admin, "Alpha", &[]).await;
/// let task = world.task(&admin, &project, &bob).await;
/// ```
pub struct TestWorld {
    pub app: Worktrack,
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
    pub objects: Arc<MemoryObjectStore>,
    pub clock: Arc<FixedClock>,
    counter: AtomicUsize,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_config(WorktrackConfig::default_with_database_url("memory://"))
    }

    pub fn with_config(config: WorktrackConfig) -> Self {
        let directory = Arc::new(MemoryDirectory::new());
        let store = Arc::new(MemoryStore::with_directory(directory.clone()));
        let objects = Arc::new(MemoryObjectStore::new());
        let clock = Arc::new(FixedClock::new(at("2025-01-15T09:00:00Z")));

        let ctx = ServiceContext::new(
            store.clone(),
            directory.clone(),
            objects.clone(),
            clock.clone(),
            &config,
        );

        Self {
            app: Worktrack::new(ctx),
            store,
            directory,
            objects,
            clock,
            counter: AtomicUsize::new(0),
        }
    }

    /// A fresh account holding the `Admin` role.
    pub async fn admin(&self) -> Actor {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.account(&format!("admin{}", n), [GlobalRole::Admin, GlobalRole::User])
            .await
    }

    /// A fresh account `<name>@example.com` with employee code `<NAME>`.
    pub async fn user(&self, name: &str) -> Actor {
        self.account(name, [GlobalRole::User]).await
    }

    async fn account<const N: usize>(&self, name: &str, roles: [GlobalRole; N]) -> Actor {
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name),
            employee_code: Some(name.to_uppercase()),
            profile: UserProfile::default(),
            avatar_path: None,
            created_at: self.clock.now(),
            updated_at: None,
        };
        let roles: BTreeSet<GlobalRole> = roles.into_iter().collect();
        self.directory
            .create_user(&user, "password", &roles)
            .await
            .unwrap();
        Actor::new(user.id, roles)
    }

    /// A project spanning 2025 with the given managers.
    pub async fn project(&self, admin: &Actor, name: &str, managers: &[&Actor]) -> Project {
        self.app
            .projects
            .create_project(
                admin,
                NewProject {
                    name: name.to_string(),
                    description: None,
                    start_date: date("2025-01-01"),
                    end_date: date("2025-12-31"),
                    manager_ids: managers.iter().map(|m| m.user_id()).collect(),
                },
            )
            .await
            .unwrap()
    }

    /// Add `user` to `project` as a plain member.
    pub async fn add_member(&self, actor: &Actor, project: &Project, user: &Actor) {
        self.app
            .projects
            .add_members(actor, project.id, &[user.user_id()], ProjectRole::Member)
            .await
            .unwrap();
    }

    /// A task for `assignee`, who joins the project first if needed.
    pub async fn task(&self, actor: &Actor, project: &Project, assignee: &Actor) -> TaskAssignment {
        self.add_member(actor, project, assignee).await;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.app
            .tasks
            .create_task(
                actor,
                NewTask {
                    project_id: project.id,
                    assigned_to: assignee.user_id(),
                    name: format!("Task {}", n),
                    description: None,
                    deadline: date("2025-03-01"),
                    priority: TaskPriority::Medium,
                },
            )
            .await
            .unwrap()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestWorld {
    type Target = Worktrack;

    fn deref(&self) -> &Worktrack {
        &self.app
    }
}
