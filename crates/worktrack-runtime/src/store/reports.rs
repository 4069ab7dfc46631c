use uuid::Uuid;
use worktrack_core::schema::TaskReport;
use worktrack_core::store::{ReportStore, StoreFuture};

use super::rows::{convert_all, ReportRow};
use super::PgStore;
use crate::db::DbResultExt;

impl ReportStore for PgStore {
    fn insert_report<'a>(&'a self, report: &'a TaskReport) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            sqlx::query(
                r#"
                INSERT INTO reports (
                    id, task_id, author_id, title, content, attachment_path, progress, is_read, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(report.id)
            .bind(report.task_id)
            .bind(report.author_id)
            .bind(&report.title)
            .bind(&report.content)
            .bind(&report.attachment_path)
            .bind(i32::from(report.progress))
            .bind(report.is_read)
            .bind(report.created_at)
            .execute(self.pool())
            .await
            .db()?;
            Ok(())
        })
    }

    fn find_report(&self, id: Uuid) -> StoreFuture<'_, Option<TaskReport>> {
        Box::pin(async move {
            let row: Option<ReportRow> =
                sqlx::query_as(concat!("SELECT ", report_columns!(), " FROM reports WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .db()?;
            row.map(TaskReport::try_from).transpose()
        })
    }

    fn reports_for_task(&self, task_id: Uuid) -> StoreFuture<'_, Vec<TaskReport>> {
        Box::pin(async move {
            let rows: Vec<ReportRow> = sqlx::query_as(concat!(
                "SELECT ",
                report_columns!(),
                " FROM reports WHERE task_id = $1 ORDER BY created_at DESC, id"
            ))
            .bind(task_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn mark_report_read(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE reports SET is_read = TRUE WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .db()?;
            Ok(result.rows_affected() > 0)
        })
    }
}
