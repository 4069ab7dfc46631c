use tracing::info;
use uuid::Uuid;
use worktrack_core::error::WorktrackError;
use worktrack_core::store::{StoreFuture, UserDataStore};

use super::PgStore;
use crate::db::DbResultExt;

/// Rows that reference a user, removed in this order before the account row.
const DETACH_STATEMENTS: &[(&str, &str)] = &[
    ("comments", "DELETE FROM comments WHERE author_id = $1"),
    ("reports", "DELETE FROM reports WHERE author_id = $1"),
    ("memberships", "DELETE FROM project_members WHERE user_id = $1"),
    ("notifications", "DELETE FROM notifications WHERE user_id = $1"),
    (
        "schedules",
        "DELETE FROM schedules WHERE user_id = $1 OR created_by = $1",
    ),
];

impl UserDataStore for PgStore {
    fn delete_account(&self, user_id: Uuid) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;

            // Task inserts take a key-share lock on the assignee row, so this
            // blocks new assignments until the transaction ends.
            let locked: Option<Uuid> =
                sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .db()?;
            if locked.is_none() {
                return Err(WorktrackError::not_found("user", user_id));
            }

            let assigned: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE assigned_to = $1")
                    .bind(user_id)
                    .fetch_one(&mut *tx)
                    .await
                    .db()?;
            if assigned > 0 {
                return Err(WorktrackError::Conflict(format!(
                    "user {} still has {} assigned task(s)",
                    user_id, assigned
                )));
            }

            let orphans: Vec<String> = sqlx::query_scalar(
                "SELECT attachment_path FROM reports WHERE author_id = $1 AND attachment_path IS NOT NULL",
            )
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .db()?;

            for (what, sql) in DETACH_STATEMENTS {
                let result = sqlx::query(sql).bind(user_id).execute(&mut *tx).await.db()?;
                if result.rows_affected() > 0 {
                    info!(user_id = %user_id, rows = result.rows_affected(), "Removing user {}", what);
                }
            }

            // Roles go with the account through ON DELETE CASCADE.
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .db()?;

            tx.commit().await.db()?;
            Ok(orphans)
        })
    }
}
