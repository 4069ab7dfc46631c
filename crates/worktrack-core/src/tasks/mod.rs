//! Task Engine: task lifecycle, status/progress rules and attachments.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::discussion::comment_views;
use crate::error::{Result, WorktrackError};
use crate::objects::category;
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, optional_text, required_text};

/// Owns the TaskAssignment lifecycle.
#[derive(Clone)]
pub struct TaskEngine {
    ctx: ServiceContext,
}

impl TaskEngine {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn create_task(&self, actor: &Actor, input: NewTask) -> Result<TaskAssignment> {
        let project = self.ctx.project(input.project_id).await?;
        let facts = self.facts(actor, project.id, None).await?;
        AccessPolicy::require(actor, Action::CreateTask, &facts)?;

        let name = required_text("name", &input.name, limits::TASK_NAME)?;
        let description =
            optional_text("description", input.description.as_deref(), limits::TASK_DESCRIPTION)?;
        self.check_deadline(&project, input.deadline, true)?;
        self.check_assignee(project.id, input.assigned_to).await?;

        let task = TaskAssignment {
            id: Uuid::new_v4(),
            project_id: project.id,
            assigned_to: input.assigned_to,
            name,
            description,
            deadline: input.deadline,
            priority: input.priority,
            status: TaskStatus::NotStarted,
            progress: Progress::NONE,
            attachment_path: None,
            notes: None,
            created_at: self.ctx.clock.now(),
            updated_at: None,
        };
        self.ctx.store.insert_task(&task).await?;

        tracing::info!(
            task_id = %task.id,
            project_id = %project.id,
            assigned_to = %task.assigned_to,
            "Task created"
        );
        Ok(task)
    }

    /// Manager/admin edit. Re-validates the deadline range and the assignee;
    /// the past-date check only applies when the deadline moves.
    pub async fn edit_task(&self, actor: &Actor, id: Uuid, input: TaskEdit) -> Result<TaskAssignment> {
        let mut task = self.ctx.task(id).await?;
        let project = self.ctx.project(task.project_id).await?;
        let facts = self.facts(actor, project.id, Some(&task)).await?;
        AccessPolicy::require(actor, Action::EditTask, &facts)?;

        let name = required_text("name", &input.name, limits::TASK_NAME)?;
        let description =
            optional_text("description", input.description.as_deref(), limits::TASK_DESCRIPTION)?;
        self.check_deadline(&project, input.deadline, input.deadline != task.deadline)?;
        self.check_assignee(project.id, input.assigned_to).await?;

        task.assigned_to = input.assigned_to;
        task.name = name;
        task.description = description;
        task.deadline = input.deadline;
        task.priority = input.priority;
        task.updated_at = Some(self.ctx.clock.now());

        self.ctx.store.update_task(&task).await?;
        tracing::info!(task_id = %id, "Task updated");
        Ok(task)
    }

    /// Status, progress, notes and attachment update.
    ///
    /// A new attachment is written before the row points at it; the previous
    /// object is removed only after the row is saved.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        input: StatusUpdate,
    ) -> Result<TaskAssignment> {
        let mut task = self.ctx.task(id).await?;
        let facts = self.facts(actor, task.project_id, Some(&task)).await?;
        AccessPolicy::require(actor, Action::UpdateTaskStatus, &facts)?;

        let progress = Progress::new(input.progress)?;
        if input.status == TaskStatus::Completed && progress != Progress::DONE {
            return Err(WorktrackError::invalid(
                "progress",
                format!("must be 100 when status is completed, got {}", progress.value()),
            ));
        }
        let notes = optional_text("notes", input.notes.as_deref(), limits::TASK_NOTES)?;

        let new_attachment = match &input.attachment {
            Some(upload) => Some(
                self.ctx
                    .save_upload(
                        &self.ctx.storage.attachments,
                        "attachment",
                        category::TASK_ATTACHMENTS,
                        upload,
                    )
                    .await?,
            ),
            None => None,
        };

        let previous = task.attachment_path.clone();
        task.status = input.status;
        task.progress = progress;
        task.notes = notes;
        if let Some(path) = &new_attachment {
            task.attachment_path = Some(path.clone());
        }
        task.updated_at = Some(self.ctx.clock.now());

        if let Err(e) = self.ctx.store.update_task(&task).await {
            self.ctx.discard_objects(new_attachment).await;
            return Err(e);
        }
        if new_attachment.is_some() {
            self.ctx.discard_objects(previous).await;
        }

        tracing::info!(
            task_id = %id,
            status = %task.status,
            progress = task.progress.value(),
            "Task status updated"
        );
        Ok(task)
    }

    /// Delete a task, its discussion and its attachments.
    pub async fn delete_task(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let task = self.ctx.task(id).await?;
        let facts = self.facts(actor, task.project_id, Some(&task)).await?;
        AccessPolicy::require(actor, Action::DeleteTask, &facts)?;

        let orphans = self.ctx.store.delete_task(id).await?;
        tracing::info!(task_id = %id, project_id = %task.project_id, "Task deleted");

        self.ctx.discard_objects(orphans).await;
        Ok(())
    }

    /// Every task of a project ordered by deadline, for its managers and admins.
    pub async fn project_tasks(&self, actor: &Actor, project_id: Uuid) -> Result<Vec<TaskListItem>> {
        self.ctx.project(project_id).await?;
        let facts = self.facts(actor, project_id, None).await?;
        AccessPolicy::require(actor, Action::ListProjectTasks, &facts)?;

        let mut tasks = self.ctx.store.tasks_in_project(project_id).await?;
        tasks.sort_by_key(|t| (t.deadline, t.created_at));
        Ok(self.list_items(tasks))
    }

    /// The actor's own tasks: unfinished first, then by deadline.
    pub async fn my_tasks(&self, actor: &Actor) -> Result<Vec<TaskListItem>> {
        let mut tasks = self.ctx.store.tasks_assigned_to(actor.user_id()).await?;
        tasks.sort_by_key(|t| (t.status == TaskStatus::Completed, t.deadline, t.created_at));
        Ok(self.list_items(tasks))
    }

    /// A task with its comments and the actor's capabilities.
    pub async fn task_detail(&self, actor: &Actor, id: Uuid) -> Result<TaskDetail> {
        let task = self.ctx.task(id).await?;
        let facts = self.facts(actor, task.project_id, Some(&task)).await?;
        AccessPolicy::require(actor, Action::ViewTask, &facts)?;

        let comments = self.ctx.store.comments_for(CommentParent::Task(id)).await?;
        Ok(TaskDetail {
            overdue: task.is_overdue(self.ctx.clock.today()),
            can_edit: AccessPolicy::can_act(actor, Action::EditTask, &facts),
            can_update_status: AccessPolicy::can_act(actor, Action::UpdateTaskStatus, &facts),
            comments: comment_views(actor, &facts, comments),
            task,
        })
    }

    async fn facts(
        &self,
        actor: &Actor,
        project_id: Uuid,
        task: Option<&TaskAssignment>,
    ) -> Result<ResourceFacts> {
        let role = self.ctx.role_in(project_id, actor.user_id()).await?;
        let assignee = task.map(|t| actor.is(t.assigned_to)).unwrap_or(false);
        Ok(ResourceFacts::in_project(role).assignee(assignee))
    }

    fn check_deadline(&self, project: &Project, deadline: NaiveDate, check_past: bool) -> Result<()> {
        if !project.spans(deadline) {
            return Err(WorktrackError::invalid(
                "deadline",
                format!(
                    "{} is outside the project dates {} to {}",
                    deadline, project.start_date, project.end_date
                ),
            ));
        }
        if check_past && deadline < self.ctx.clock.today() {
            return Err(WorktrackError::invalid(
                "deadline",
                format!("{} is in the past", deadline),
            ));
        }
        Ok(())
    }

    async fn check_assignee(&self, project_id: Uuid, user_id: Uuid) -> Result<()> {
        if self.ctx.role_in(project_id, user_id).await?.is_none() {
            return Err(WorktrackError::invalid(
                "assigned_to",
                format!("user {} is not a member of the project", user_id),
            ));
        }
        Ok(())
    }

    fn list_items(&self, tasks: Vec<TaskAssignment>) -> Vec<TaskListItem> {
        let today = self.ctx.clock.today();
        tasks
            .into_iter()
            .map(|task| TaskListItem {
                overdue: task.is_overdue(today),
                task,
            })
            .collect()
    }
}
