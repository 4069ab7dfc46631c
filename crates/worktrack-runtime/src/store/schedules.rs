use uuid::Uuid;
use worktrack_core::schema::{DateWindow, Notification, WorkSchedule};
use worktrack_core::store::{ScheduleStore, StoreFuture};

use super::rows::{convert_all, ScheduleRow};
use super::{expect_row, notifications, PgStore};
use crate::db::DbResultExt;

impl ScheduleStore for PgStore {
    fn insert_schedule<'a>(
        &'a self,
        schedule: &'a WorkSchedule,
        notification: Option<&'a Notification>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;

            sqlx::query(
                r#"
                INSERT INTO schedules (
                    id, user_id, project_id, title, description, start_at, end_at, is_all_day,
                    color, schedule_type, location, created_by, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(schedule.id)
            .bind(schedule.user_id)
            .bind(schedule.project_id)
            .bind(&schedule.title)
            .bind(&schedule.description)
            .bind(schedule.start)
            .bind(schedule.end)
            .bind(schedule.is_all_day)
            .bind(&schedule.color)
            .bind(schedule.schedule_type.as_str())
            .bind(&schedule.location)
            .bind(schedule.created_by)
            .bind(schedule.created_at)
            .bind(schedule.updated_at)
            .execute(&mut *tx)
            .await
            .db()?;

            if let Some(notification) = notification {
                notifications::insert(&mut *tx, notification).await?;
            }

            tx.commit().await.db()
        })
    }

    fn find_schedule(&self, id: Uuid) -> StoreFuture<'_, Option<WorkSchedule>> {
        Box::pin(async move {
            let row: Option<ScheduleRow> = sqlx::query_as(concat!(
                "SELECT ",
                schedule_columns!(),
                " FROM schedules WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .db()?;
            row.map(WorkSchedule::try_from).transpose()
        })
    }

    fn update_schedule<'a>(&'a self, schedule: &'a WorkSchedule) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE schedules
                SET user_id = $2, project_id = $3, title = $4, description = $5, start_at = $6,
                    end_at = $7, is_all_day = $8, color = $9, schedule_type = $10,
                    location = $11, updated_at = $12
                WHERE id = $1
                "#,
            )
            .bind(schedule.id)
            .bind(schedule.user_id)
            .bind(schedule.project_id)
            .bind(&schedule.title)
            .bind(&schedule.description)
            .bind(schedule.start)
            .bind(schedule.end)
            .bind(schedule.is_all_day)
            .bind(&schedule.color)
            .bind(schedule.schedule_type.as_str())
            .bind(&schedule.location)
            .bind(schedule.updated_at)
            .execute(self.pool())
            .await
            .db()?;
            expect_row(result.rows_affected(), "schedule", schedule.id)
        })
    }

    fn delete_schedule(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .db()?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn schedules_in_window(
        &self,
        user_id: Option<Uuid>,
        window: DateWindow,
    ) -> StoreFuture<'_, Vec<WorkSchedule>> {
        Box::pin(async move {
            let rows: Vec<ScheduleRow> = sqlx::query_as(concat!(
                "SELECT ",
                schedule_columns!(),
                " FROM schedules",
                " WHERE start_at >= $1 AND end_at <= $2 AND ($3::uuid IS NULL OR user_id = $3)",
                " ORDER BY start_at, id"
            ))
            .bind(window.start)
            .bind(window.end)
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }
}
