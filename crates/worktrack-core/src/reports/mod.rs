//! Task reports sent by assignees to their project's managers.

use uuid::Uuid;

use crate::auth::Actor;
use crate::context::ServiceContext;
use crate::error::{Result, WorktrackError};
use crate::objects::category;
use crate::policy::{AccessPolicy, Action, ResourceFacts};
use crate::schema::*;
use crate::validate::{limits, required_text};

#[derive(Clone)]
pub struct Reports {
    ctx: ServiceContext,
}

impl Reports {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Only the task's assignee reports on it. The task's current progress
    /// is recorded with the report.
    pub async fn submit_report(&self, actor: &Actor, input: NewReport) -> Result<TaskReport> {
        let task = self.ctx.task(input.task_id).await?;
        let facts = self.facts(actor, &task).await?;
        AccessPolicy::require(actor, Action::SubmitReport, &facts)?;

        let title = required_text("title", &input.title, limits::REPORT_TITLE)?;
        let content = required_text("content", &input.content, limits::REPORT_CONTENT)?;

        let attachment_path = match &input.attachment {
            Some(upload) => Some(
                self.ctx
                    .save_upload(
                        &self.ctx.storage.attachments,
                        "attachment",
                        category::REPORT_ATTACHMENTS,
                        upload,
                    )
                    .await?,
            ),
            None => None,
        };

        let report = TaskReport {
            id: Uuid::new_v4(),
            task_id: task.id,
            author_id: actor.user_id(),
            title,
            content,
            attachment_path,
            progress: task.progress,
            is_read: false,
            created_at: self.ctx.clock.now(),
        };

        if let Err(e) = self.ctx.store.insert_report(&report).await {
            self.ctx.discard_objects(report.attachment_path.clone()).await;
            return Err(e);
        }

        tracing::info!(report_id = %report.id, task_id = %task.id, "Task report submitted");
        Ok(report)
    }

    /// Reports on a task, newest first.
    pub async fn list_reports(&self, actor: &Actor, task_id: Uuid) -> Result<Vec<TaskReport>> {
        let task = self.ctx.task(task_id).await?;
        let facts = self.facts(actor, &task).await?;
        AccessPolicy::require(actor, Action::ViewReports, &facts)?;

        self.ctx.store.reports_for_task(task_id).await
    }

    pub async fn mark_report_read(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let report = self
            .ctx
            .store
            .find_report(id)
            .await?
            .ok_or_else(|| WorktrackError::not_found("report", id))?;
        let task = self.ctx.task(report.task_id).await?;
        let facts = self.facts(actor, &task).await?;
        AccessPolicy::require(actor, Action::MarkReportRead, &facts)?;

        self.ctx.store.mark_report_read(id).await?;
        tracing::debug!(report_id = %id, "Task report marked read");
        Ok(())
    }

    async fn facts(&self, actor: &Actor, task: &TaskAssignment) -> Result<ResourceFacts> {
        let role = self.ctx.role_in(task.project_id, actor.user_id()).await?;
        Ok(ResourceFacts::in_project(role).assignee(actor.is(task.assigned_to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{validation_error_for_field, TestWorld};
    use crate::{assert_err_variant, assert_ok};

    fn report(task_id: Uuid) -> NewReport {
        NewReport {
            task_id,
            title: "Week 3".into(),
            content: "Integration finished".into(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_assignee_submits_with_progress_snapshot() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        let task = world.task(&admin, &project, &bob).await;
        world
            .tasks
            .update_status(
                &bob,
                task.id,
                StatusUpdate {
                    status: TaskStatus::InProgress,
                    progress: 40,
                    notes: None,
                    attachment: None,
                },
            )
            .await
            .unwrap();

        let mut input = report(task.id);
        input.attachment = Some(Upload::new("notes.pdf", vec![1; 8]));
        let submitted = world.reports.submit_report(&bob, input).await.unwrap();

        assert_eq!(submitted.progress.value(), 40);
        assert!(world.objects.contains(submitted.attachment_path.as_deref().unwrap()));
    }

    #[tokio::test]
    async fn test_only_assignee_submits() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        let task = world.task(&admin, &project, &bob).await;

        let result = world.reports.submit_report(&mia, report(task.id)).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
    }

    #[tokio::test]
    async fn test_content_limit() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let bob = world.user("bob").await;
        let project = world.project(&admin, "Alpha", &[]).await;
        let task = world.task(&admin, &project, &bob).await;

        let mut input = report(task.id);
        input.content = "x".repeat(5001);
        let err = world.reports.submit_report(&bob, input).await.unwrap_err();
        assert!(validation_error_for_field(&err, "content"));
    }

    #[tokio::test]
    async fn test_manager_reads_and_marks() {
        let world = TestWorld::new();
        let admin = world.admin().await;
        let mia = world.user("mia").await;
        let bob = world.user("bob").await;
        let carol = world.user("carol").await;
        let project = world.project(&admin, "Alpha", &[&mia]).await;
        world.add_member(&admin, &project, &carol).await;
        let task = world.task(&admin, &project, &bob).await;
        let submitted = world.reports.submit_report(&bob, report(task.id)).await.unwrap();

        let result = world.reports.list_reports(&carol, task.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));
        let result = world.reports.mark_report_read(&bob, submitted.id).await;
        assert_err_variant!(result, WorktrackError::Forbidden(_));

        assert_ok!(world.reports.mark_report_read(&mia, submitted.id).await);
        let reports = world.reports.list_reports(&mia, task.id).await.unwrap();
        assert!(reports[0].is_read);
    }
}
