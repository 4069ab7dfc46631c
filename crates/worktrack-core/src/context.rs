//! Collaborators shared by every rule service.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{ProjectsConfig, StorageConfig, UploadRules, WorktrackConfig};
use crate::directory::AccountDirectory;
use crate::error::{Result, WorktrackError};
use crate::objects::ObjectStore;
use crate::schema::*;
use crate::store::EntityStore;

/// Handles to the Entity Store, Account Directory, Object Store and clock,
/// plus the settings the services consult.
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn EntityStore>,
    pub directory: Arc<dyn AccountDirectory>,
    pub objects: Arc<dyn ObjectStore>,
    pub clock: Arc<dyn Clock>,
    pub storage: Arc<StorageConfig>,
    pub projects: ProjectsConfig,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn EntityStore>,
        directory: Arc<dyn AccountDirectory>,
        objects: Arc<dyn ObjectStore>,
        clock: Arc<dyn Clock>,
        config: &WorktrackConfig,
    ) -> Self {
        Self {
            store,
            directory,
            objects,
            clock,
            storage: Arc::new(config.storage.clone()),
            projects: config.projects.clone(),
        }
    }

    pub(crate) async fn project(&self, id: Uuid) -> Result<Project> {
        self.store
            .find_project(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("project", id))
    }

    pub(crate) async fn task(&self, id: Uuid) -> Result<TaskAssignment> {
        self.store
            .find_task(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("task", id))
    }

    pub(crate) async fn user(&self, id: Uuid) -> Result<User> {
        self.directory
            .find_user(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("user", id))
    }

    /// The role `user_id` holds in `project_id`, if any.
    pub(crate) async fn role_in(&self, project_id: Uuid, user_id: Uuid) -> Result<Option<ProjectRole>> {
        Ok(self
            .store
            .find_member(project_id, user_id)
            .await?
            .map(|m| m.role))
    }

    /// Users who share at least one project in which `manager_id` is a Manager.
    pub(crate) async fn managed_peers(&self, manager_id: Uuid) -> Result<HashSet<Uuid>> {
        let mut peers = HashSet::new();
        for membership in self.store.memberships_of(manager_id).await? {
            if !membership.is_manager() {
                continue;
            }
            for member in self.store.members_of(membership.project_id).await? {
                peers.insert(member.user_id);
            }
        }
        Ok(peers)
    }

    /// Validate an upload and write it to the Object Store.
    pub(crate) async fn save_upload(
        &self,
        rules: &UploadRules,
        field: &str,
        category: &str,
        upload: &Upload,
    ) -> Result<String> {
        rules.check(field, upload)?;
        self.objects
            .put(category, &upload.file_name, &upload.bytes)
            .await
    }

    /// Delete objects nothing references any more. Failures are logged, not returned.
    pub(crate) async fn discard_objects<I>(&self, paths: I)
    where
        I: IntoIterator<Item = String>,
    {
        for path in paths {
            if let Err(e) = self.objects.delete(&path).await {
                tracing::warn!(path = %path, error = %e, "Failed to delete orphaned object");
            }
        }
    }
}
