use uuid::Uuid;
use worktrack_core::schema::{Comment, CommentParent};
use worktrack_core::store::{CommentStore, StoreFuture};

use super::rows::{convert_all, parent_columns, CommentRow};
use super::{expect_row, PgStore};
use crate::db::DbResultExt;

impl CommentStore for PgStore {
    fn find_comment(&self, id: Uuid) -> StoreFuture<'_, Option<Comment>> {
        Box::pin(async move {
            let row: Option<CommentRow> = sqlx::query_as(concat!(
                "SELECT ",
                comment_columns!(),
                " FROM comments WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .db()?;
            row.map(Comment::try_from).transpose()
        })
    }

    fn insert_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let (project_id, task_id) = parent_columns(comment.parent);
            sqlx::query(
                r#"
                INSERT INTO comments (id, project_id, task_id, author_id, content, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(comment.id)
            .bind(project_id)
            .bind(task_id)
            .bind(comment.author_id)
            .bind(&comment.content)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .execute(self.pool())
            .await
            .db()?;
            Ok(())
        })
    }

    fn update_comment<'a>(&'a self, comment: &'a Comment) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1")
                    .bind(comment.id)
                    .bind(&comment.content)
                    .bind(comment.updated_at)
                    .execute(self.pool())
                    .await
                    .db()?;
            expect_row(result.rows_affected(), "comment", comment.id)
        })
    }

    fn delete_comment(&self, id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM comments WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .db()?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn comments_for(&self, parent: CommentParent) -> StoreFuture<'_, Vec<Comment>> {
        Box::pin(async move {
            let sql = match parent {
                CommentParent::Project(_) => concat!(
                    "SELECT ",
                    comment_columns!(),
                    " FROM comments WHERE project_id = $1 ORDER BY created_at, id"
                ),
                CommentParent::Task(_) => concat!(
                    "SELECT ",
                    comment_columns!(),
                    " FROM comments WHERE task_id = $1 ORDER BY created_at, id"
                ),
            };
            let parent_id = match parent {
                CommentParent::Project(id) | CommentParent::Task(id) => id,
            };

            let rows: Vec<CommentRow> = sqlx::query_as(sql)
                .bind(parent_id)
                .fetch_all(self.pool())
                .await
                .db()?;
            convert_all(rows)
        })
    }
}
