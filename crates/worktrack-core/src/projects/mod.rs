//! Project Registry: projects, their codes and memberships.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, optional_text, required_text};

/// Owns the Project and ProjectMember lifecycle.
#[derive(Clone)]
pub struct ProjectRegistry {
    ctx: ServiceContext,
}

impl ProjectRegistry {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a project and make `manager_ids` its managers.
    pub async fn create_project(&self, actor: &Actor, input: NewProject) -> Result<Project> {
        AccessPolicy::require(actor, Action::CreateProject, &ResourceFacts::none())?;

        let fields = ProjectFields::validate(
            &input.name,
            input.description.as_deref(),
            input.start_date,
            input.end_date,
        )?;
        self.ensure_name_free(&fields.name, None).await?;

        let manager_ids: BTreeSet<Uuid> = input.manager_ids.into_iter().collect();
        for id in &manager_ids {
            self.ctx.user(*id).await?;
        }

        let mut attempts = 0;
        loop {
            let now = self.ctx.clock.now();
            let project = Project {
                id: Uuid::new_v4(),
                code: self.ctx.store.allocate_project_code().await?,
                name: fields.name.clone(),
                description: fields.description.clone(),
                start_date: fields.start_date,
                end_date: fields.end_date,
                created_at: now,
                updated_at: None,
            };
            let managers: Vec<ProjectMember> = manager_ids
                .iter()
                .map(|user_id| ProjectMember::new(project.id, *user_id, ProjectRole::Manager, now))
                .collect();

            match self.ctx.store.insert_project(&project, &managers).await {
                Ok(()) => {
                    tracing::info!(
                        project_id = %project.id,
                        code = %project.code,
                        managers = managers.len(),
                        "Project created"
                    );
                    return Ok(project);
                }
                Err(e) if e.is_conflict() => {
                    // Either another request took the name or the code collided.
                    self.ensure_name_free(&fields.name, None).await?;
                    attempts += 1;
                    if attempts > self.ctx.projects.code_allocation_retries {
                        return Err(e);
                    }
                    tracing::warn!(code = %project.code, attempts, "Project code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Change name, description and dates. The code never changes.
    pub async fn edit_project(&self, actor: &Actor, id: Uuid, input: ProjectUpdate) -> Result<Project> {
        AccessPolicy::require(actor, Action::EditProject, &ResourceFacts::none())?;

        let mut project = self.ctx.project(id).await?;
        let fields = ProjectFields::validate(
            &input.name,
            input.description.as_deref(),
            input.start_date,
            input.end_date,
        )?;
        self.ensure_name_free(&fields.name, Some(id)).await?;

        project.name = fields.name;
        project.description = fields.description;
        project.start_date = fields.start_date;
        project.end_date = fields.end_date;
        project.updated_at = Some(self.ctx.clock.now());

        self.ctx.store.update_project(&project).await?;
        tracing::info!(project_id = %id, "Project updated");
        Ok(project)
    }

    /// Delete a project with everything hanging off it.
    pub async fn delete_project(&self, actor: &Actor, id: Uuid) -> Result<()> {
        AccessPolicy::require(actor, Action::DeleteProject, &ResourceFacts::none())?;

        let project = self.ctx.project(id).await?;
        let orphans = self.ctx.store.delete_project(id).await?;
        tracing::info!(project_id = %id, code = %project.code, "Project deleted");

        self.ctx.discard_objects(orphans).await;
        Ok(())
    }

    /// Add users to a project. Users already in it are skipped. Returns the
    /// memberships that were created.
    pub async fn add_members(
        &self,
        actor: &Actor,
        project_id: Uuid,
        user_ids: &[Uuid],
        role: ProjectRole,
    ) -> Result<Vec<ProjectMember>> {
        self.ctx.project(project_id).await?;
        let facts = ResourceFacts::in_project(self.ctx.role_in(project_id, actor.user_id()).await?);
        AccessPolicy::require(actor, Action::AddMember, &facts)?;
        if role == ProjectRole::Manager {
            AccessPolicy::require(actor, Action::AddManager, &facts)?;
        }

        if user_ids.is_empty() {
            return Err(WorktrackError::invalid("user_ids", "at least one user is required"));
        }

        let existing: BTreeSet<Uuid> = self
            .ctx
            .store
            .members_of(project_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let now = self.ctx.clock.now();
        let mut added = Vec::new();
        let mut seen = BTreeSet::new();
        for user_id in user_ids {
            if existing.contains(user_id) || !seen.insert(*user_id) {
                continue;
            }
            self.ctx.user(*user_id).await?;
            added.push(ProjectMember::new(project_id, *user_id, role, now));
        }

        if !added.is_empty() {
            self.ctx.store.insert_members(&added).await?;
        }

        tracing::info!(
            project_id = %project_id,
            added = added.len(),
            skipped = user_ids.len() - added.len(),
            role = %role,
            "Project members added"
        );
        Ok(added)
    }

    /// Remove one member. Nobody can remove themself this way.
    pub async fn remove_member(&self, actor: &Actor, project_id: Uuid, user_id: Uuid) -> Result<()> {
        self.ctx.project(project_id).await?;
        let facts = ResourceFacts::in_project(self.ctx.role_in(project_id, actor.user_id()).await?);
        AccessPolicy::require(actor, Action::RemoveMember, &facts)?;

        let target = self
            .ctx
            .store
            .find_member(project_id, user_id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("project member", user_id))?;

        let facts = facts.removing(target.role, actor.is(user_id));
        AccessPolicy::require(actor, Action::RemoveMember, &facts)?;

        if !self.ctx.store.delete_member(project_id, user_id).await? {
            return Err(WorktrackError::not_found("project member", user_id));
        }

        tracing::info!(project_id = %project_id, user_id = %user_id, role = %target.role, "Project member removed");
        Ok(())
    }

    /// Projects visible to the actor: all of them for an admin, otherwise
    /// the ones they belong to.
    pub async fn list_projects(&self, actor: &Actor) -> Result<Vec<ProjectSummary>> {
        let projects = if actor.is_admin() {
            self.ctx.store.list_projects().await?
        } else {
            let mut projects = Vec::new();
            for membership in self.ctx.store.memberships_of(actor.user_id()).await? {
                if let Some(project) = self.ctx.store.find_project(membership.project_id).await? {
                    projects.push(project);
                }
            }
            projects.sort_by_key(|p| p.code);
            projects
        };

        let mut summaries = Vec::with_capacity(projects.len());
        for project in projects {
            let members = self.ctx.store.members_of(project.id).await?;
            let manager_count = members.iter().filter(|m| m.is_manager()).count();
            let role = members
                .iter()
                .find(|m| m.user_id == actor.user_id())
                .map(|m| m.role);
            summaries.push(ProjectSummary {
                project,
                manager_count,
                member_count: members.len() - manager_count,
                role,
            });
        }
        Ok(summaries)
    }

    /// A project with its members, for an admin or any member.
    pub async fn project_detail(&self, actor: &Actor, id: Uuid) -> Result<ProjectDetail> {
        let project = self.ctx.project(id).await?;
        let facts = ResourceFacts::in_project(self.ctx.role_in(id, actor.user_id()).await?);
        AccessPolicy::require(actor, Action::ViewProject, &facts)?;

        let members = self.ctx.store.members_of(id).await?;
        Ok(ProjectDetail {
            project,
            members,
            can_manage: AccessPolicy::can_act(actor, Action::AddMember, &facts),
            can_comment: AccessPolicy::can_act(actor, Action::PostComment, &facts),
        })
    }

    async fn ensure_name_free(&self, name: &str, exclude: Option<Uuid>) -> Result<()> {
        if self.ctx.store.project_name_taken(name, exclude).await? {
            return Err(WorktrackError::invalid(
                "name",
                format!("a project named '{}' already exists", name),
            ));
        }
        Ok(())
    }
}

struct ProjectFields {
    name: String,
    description: Option<String>,
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
}

impl ProjectFields {
    fn validate(
        name: &str,
        description: Option<&str>,
        start_date: chrono::NaiveDate,
        end_date: chrono::NaiveDate,
    ) -> Result<Self> {
        let name = required_text("name", name, limits::PROJECT_NAME)?;
        let description = optional_text("description", description, limits::PROJECT_DESCRIPTION)?;
        if end_date < start_date {
            return Err(WorktrackError::invalid(
                "end_date",
                format!("{} is before start_date {}", end_date, start_date),
            ));
        }
        Ok(Self {
            name,
            description,
            start_date,
            end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{date, validation_error_for_field, TestWorld};
    use crate::{assert_err_variant, assert_ok};

    fn alpha() -> NewProject {
        NewProject {
            name: "Alpha".into(),
            description: None,
            start_date: date("2025-01-01"),
            end_date: date("2025-06-01"),
            manager_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_codes_are_sequential() {
        let world = TestWorld::new();
        let admin = world.admin().await;

        let a = world.projects.create_project(&admin, alpha()).await.unwrap();
        let mut beta = alpha();
        beta.name = "Beta".into();
        let b = world.projects.create_project(&admin, beta).await.unwrap();

        assert_eq!(a.code.to_string(), "PROJ-001");
        assert_eq!(b.code.to_string(), "PROJ-002");
    }

    #[tokio::test]
    async fn test_codes_are_not_reused_after_delete() {
        let world = TestWorld::new();
        let admin = world.admin().await;

        let a = world.projects.create_project(&admin, alpha()).await.unwrap();
        world.projects.delete_project(&admin, a.id).await.unwrap();
        let again = world.projects.create_project(&admin, alpha()).await.unwrap();

        assert_eq!(again.code.to_string(), "PROJ-002");
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let world = TestWorld::new();
        let user = world.user("alice").await;
        let result = world.projects.create_project(&user, alpha()).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_end_before_start_is_rejected() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mut input = alpha();
        input.end_date = date("2024-12-31");

        let err = world.projects.create_project(&admin, input).await.unwrap_err();
        assert!(validation_error_for_field(&err, "end_date"));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected_but_edit_keeps_own_name() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let project = world.projects.create_project(&admin, alpha()).await.unwrap();

        let err = world.projects.create_project(&admin, alpha()).await.unwrap_err();
        assert!(validation_error_for_field(&err, "name"));

        let edited = world
            .projects
            .edit_project(
                &admin,
                project.id,
                ProjectUpdate {
                    name: "Alpha".into(),
                    description: Some("second phase".into()),
                    start_date: date("2025-01-01"),
                    end_date: date("2025-09-01"),
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.code, project.code);
        assert_eq!(edited.end_date, date("2025-09-01"));
    }

    #[tokio::test]
    async fn test_initial_managers_join_as_managers() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let manager = world.user("mia").await;
        let mut input = alpha();
        input.manager_ids = vec![manager.user_id(), manager.user_id()];

        let project = world.projects.create_project(&admin, input).await.unwrap();
        let detail = world.projects.project_detail(&manager, project.id).await.unwrap();

        assert_eq!(detail.members.len(), 1);
        assert!(detail.members[0].is_manager());
        assert!(detail.can_manage);
    }

    #[tokio::test]
    async fn test_unknown_manager_leaves_nothing_behind() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mut input = alpha();
        input.manager_ids = vec![Uuid::new_v4()];

        let result = world.projects.create_project(&admin, input).await;
        assert_err_variant!(result, WorktrackError::NotFound(_));
        assert!(world.projects.list_projects(&admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_members_skips_existing() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let manager = world.user("mia").await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[&manager]).await;

        let added = world
            .projects
            .add_members(&manager, project.id, &[bob.user_id()], ProjectRole::Member)
            .await
            .unwrap();
        assert_eq!(added.len(), 1);

        let again = world
            .projects
            .add_members(&manager, project.id, &[bob.user_id(), manager.user_id()], ProjectRole::Member)
            .await
            .unwrap();
        assert!(again.is_empty());

        let detail = world.projects.project_detail(&admin, project.id).await.unwrap();
        assert_eq!(detail.members.len(), 2);
    }

    #[tokio::test]
    async fn test_add_members_rejects_empty_list() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let project = world.project(&admin, "Alpha", &[]).await;

        let err = world
            .projects
            .add_members(&admin, project.id, &[], ProjectRole::Member)
            .await
            .unwrap_err();
        assert!(validation_error_for_field(&err, "user_ids"));
    }

    #[tokio::test]
    async fn test_member_cannot_add_members() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        world.add_member(&admin, &project, &bob).await;

        let result = world
            .projects
            .add_members(&bob, project.id, &[carol.user_id()], ProjectRole::Member)
            .await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_only_admin_grants_manager_role() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;

        let result = world
            .projects
            .add_members(&mia, project.id, &[bob.user_id()], ProjectRole::Manager)
            .await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        let detail = world.projects.project_detail(&admin, project.id).await.unwrap();
        assert_eq!(detail.members.len(), 1);

        let added = world
            .projects
            .add_members(&admin, project.id, &[bob.user_id()], ProjectRole::Manager)
            .await
            .unwrap();
        assert_eq!(added[0].role, ProjectRole::Manager);
    }

    #[tokio::test]
    async fn test_manager_cannot_remove_manager_but_admin_can() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let max = world.user("max").await;
        let project = world.project(&admin, "Alpha", &[&mia, &max]).await;

        let result = world.projects.remove_member(&mia, project.id, max.user_id()).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        assert_ok!(world.projects.remove_member(&admin, project.id, max.user_id()).await);
    }

    #[tokio::test]
    async fn test_manager_removes_member() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &bob).await;

        assert_ok!(world.projects.remove_member(&mia, project.id, bob.user_id()).await);
        let result = world.projects.remove_member(&mia, project.id, bob.user_id()).await;
        assert_err_variant!(result, WorktrackError::NotFound(_));
    }

    #[tokio::test]
    async fn test_self_removal_is_denied() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &admin).await;

        let result = world.projects.remove_member(&mia, project.id, mia.user_id()).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        let result = world.projects.remove_member(&admin, project.id, admin.user_id()).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_membership() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let alpha = world.project(&admin, "Alpha", &[]).await;
        world.project(&admin, "Beta", &[]).await;
        world.add_member(&admin, &alpha, &bob).await;

        let mine = world.projects.list_projects(&bob).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].role, Some(ProjectRole::Member));
        assert_eq!(mine[0].member_count, 1);

        assert_eq!(world.projects.list_projects(&admin).await.unwrap().len(), 2);

        let result = world.projects.project_detail(&bob, world.project(&admin, "Gamma", &[]).await.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }
}
