use uuid::Uuid;
use worktrack_core::schema::TaskAssignment;
use worktrack_core::store::{StoreFuture, TaskStore};

use super::rows::{convert_all, TaskRow};
use super::{expect_row, PgStore};
use crate::db::DbResultExt;

impl TaskStore for PgStore {
    fn find_task(&self, id: Uuid) -> StoreFuture<'_, Option<TaskAssignment>> {
        Box::pin(async move {
            let row: Option<TaskRow> =
                sqlx::query_as(concat!("SELECT ", task_columns!(), " FROM tasks WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .db()?;
            row.map(TaskAssignment::try_from).transpose()
        })
    }

    fn insert_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO tasks (
                    id, project_id, assigned_to, name, description, deadline, priority,
                    status, progress, attachment_path, notes, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(task.id)
            .bind(task.project_id)
            .bind(task.assigned_to)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.deadline)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(i32::from(task.progress))
            .bind(&task.attachment_path)
            .bind(&task.notes)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(self.pool())
            .await
            .db()?;
            Ok(())
        })
    }

    fn update_task<'a>(&'a self, task: &'a TaskAssignment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE tasks
                SET assigned_to = $2, name = $3, description = $4, deadline = $5,
                    priority = $6, status = $7, progress = $8, attachment_path = $9,
                    notes = $10, updated_at = $11
                WHERE id = $1
                "#,
            )
            .bind(task.id)
            .bind(task.assigned_to)
            .bind(&task.name)
            .bind(&task.description)
            .bind(task.deadline)
            .bind(task.priority.as_str())
            .bind(task.status.as_str())
            .bind(i32::from(task.progress))
            .bind(&task.attachment_path)
            .bind(&task.notes)
            .bind(task.updated_at)
            .execute(self.pool())
            .await
            .db()?;
            expect_row(result.rows_affected(), "task", task.id)
        })
    }

    fn delete_task(&self, id: Uuid) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;

            let orphans: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT attachment_path FROM tasks
                WHERE id = $1 AND attachment_path IS NOT NULL
                UNION ALL
                SELECT attachment_path FROM reports
                WHERE task_id = $1 AND attachment_path IS NOT NULL
                "#,
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .db()?;

            let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .db()?;
            expect_row(result.rows_affected(), "task", id)?;

            tx.commit().await.db()?;
            Ok(orphans)
        })
    }

    fn tasks_in_project(&self, project_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>> {
        Box::pin(async move {
            let rows: Vec<TaskRow> = sqlx::query_as(concat!(
                "SELECT ",
                task_columns!(),
                " FROM tasks WHERE project_id = $1 ORDER BY deadline, created_at"
            ))
            .bind(project_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, Vec<TaskAssignment>> {
        Box::pin(async move {
            let rows: Vec<TaskRow> = sqlx::query_as(concat!(
                "SELECT ",
                task_columns!(),
                " FROM tasks WHERE assigned_to = $1 ORDER BY deadline, created_at"
            ))
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn count_tasks_assigned_to(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE assigned_to = $1")
                .bind(user_id)
                .fetch_one(self.pool())
                .await
                .db()?;
            Ok(count.max(0) as u64)
        })
    }
}
