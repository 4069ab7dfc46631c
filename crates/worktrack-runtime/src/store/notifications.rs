use sqlx::PgExecutor;
use uuid::Uuid;
use worktrack_core::error::Result;
use worktrack_core::schema::Notification;
use worktrack_core::store::{NotificationStore, StoreFuture};

use super::rows::{convert_all, NotificationRow};
use super::PgStore;
use crate::db::DbResultExt;

/// Insert one notification on any executor, so schedule creation can reuse
/// it inside its transaction.
pub(super) async fn insert<'e>(executor: impl PgExecutor<'e>, n: &Notification) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, title, content, kind, related_url, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(n.id)
    .bind(n.user_id)
    .bind(&n.title)
    .bind(&n.content)
    .bind(n.kind.as_str())
    .bind(&n.related_url)
    .bind(n.is_read)
    .bind(n.created_at)
    .execute(executor)
    .await
    .db()?;
    Ok(())
}

impl NotificationStore for PgStore {
    fn insert_notification<'a>(&'a self, notification: &'a Notification) -> StoreFuture<'a, ()> {
        Box::pin(insert(self.pool(), notification))
    }

    fn find_notification(&self, id: Uuid) -> StoreFuture<'_, Option<Notification>> {
        Box::pin(async move {
            let row: Option<NotificationRow> = sqlx::query_as(concat!(
                "SELECT ",
                notification_columns!(),
                " FROM notifications WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .db()?;
            row.map(Notification::try_from).transpose()
        })
    }

    fn mark_notification_read(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .db()?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
            )
            .bind(user_id)
            .execute(self.pool())
            .await
            .db()?;
            Ok(result.rows_affected())
        })
    }

    fn delete_notification(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .db()?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn notifications_for(&self, user_id: Uuid) -> StoreFuture<'_, Vec<Notification>> {
        Box::pin(async move {
            let rows: Vec<NotificationRow> = sqlx::query_as(concat!(
                "SELECT ",
                notification_columns!(),
                " FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id"
            ))
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn unread_count(&self, user_id: Uuid) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
            )
            .bind(user_id)
            .fetch_one(self.pool())
            .await
            .db()?;
            Ok(count.max(0) as u64)
        })
    }
}
