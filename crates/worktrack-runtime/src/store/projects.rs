use tracing::debug;
use uuid::Uuid;
use worktrack_core::schema::{Project, ProjectCode, ProjectMember};
use worktrack_core::store::{MemberStore, ProjectStore, StoreFuture};

use super::rows::{convert_all, MemberRow, ProjectRow};
use super::{expect_row, PgStore};
use crate::db::{corrupt, DbResultExt};

/// Bumps the counter past any code already in use and returns the new value.
/// The row lock on the single counter row serializes concurrent callers.
const ALLOCATE_CODE_SQL: &str = r#"
    UPDATE project_code_counter
    SET last_value = GREATEST(
        last_value,
        COALESCE((SELECT MAX(CAST(SUBSTRING(code FROM 6) AS INTEGER)) FROM projects), 0)
    ) + 1
    WHERE id
    RETURNING last_value
"#;

const INSERT_MEMBER_SQL: &str = r#"
    INSERT INTO project_members (id, project_id, user_id, role, joined_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

impl ProjectStore for PgStore {
    fn find_project(&self, id: Uuid) -> StoreFuture<'_, Option<Project>> {
        Box::pin(async move {
            let row: Option<ProjectRow> =
                sqlx::query_as(concat!("SELECT ", project_columns!(), " FROM projects WHERE id = $1"))
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .db()?;
            row.map(Project::try_from).transpose()
        })
    }

    fn project_name_taken<'a>(
        &'a self,
        name: &'a str,
        exclude: Option<Uuid>,
    ) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM projects
                    WHERE LOWER(name) = LOWER($1)
                      AND ($2::uuid IS NULL OR id <> $2)
                )
                "#,
            )
            .bind(name)
            .bind(exclude)
            .fetch_one(self.pool())
            .await
            .db()
        })
    }

    fn allocate_project_code(&self) -> StoreFuture<'_, ProjectCode> {
        Box::pin(async move {
            let value: i32 = sqlx::query_scalar(ALLOCATE_CODE_SQL)
                .fetch_one(self.pool())
                .await
                .db()?;
            let number = u32::try_from(value).map_err(|e| corrupt("project_code_counter", e))?;
            let code = ProjectCode::new(number).map_err(|e| corrupt("project_code_counter", e))?;
            debug!(code = %code, "Project code allocated");
            Ok(code)
        })
    }

    fn insert_project<'a>(
        &'a self,
        project: &'a Project,
        members: &'a [ProjectMember],
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;

            sqlx::query(
                r#"
                INSERT INTO projects (id, code, name, description, start_date, end_date, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(project.id)
            .bind(project.code.to_string())
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.created_at)
            .bind(project.updated_at)
            .execute(&mut *tx)
            .await
            .db()?;

            for member in members {
                sqlx::query(INSERT_MEMBER_SQL)
                    .bind(member.id)
                    .bind(member.project_id)
                    .bind(member.user_id)
                    .bind(member.role.as_str())
                    .bind(member.joined_at)
                    .execute(&mut *tx)
                    .await
                    .db()?;
            }

            tx.commit().await.db()
        })
    }

    fn update_project<'a>(&'a self, project: &'a Project) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r#"
                UPDATE projects
                SET name = $2, description = $3, start_date = $4, end_date = $5, updated_at = $6
                WHERE id = $1
                "#,
            )
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.start_date)
            .bind(project.end_date)
            .bind(project.updated_at)
            .execute(self.pool())
            .await
            .db()?;
            expect_row(result.rows_affected(), "project", project.id)
        })
    }

    fn delete_project(&self, id: Uuid) -> StoreFuture<'_, Vec<String>> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;

            let orphans: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT attachment_path FROM tasks
                WHERE project_id = $1 AND attachment_path IS NOT NULL
                UNION ALL
                SELECT r.attachment_path FROM reports r
                JOIN tasks t ON t.id = r.task_id
                WHERE t.project_id = $1 AND r.attachment_path IS NOT NULL
                "#,
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .db()?;

            // Memberships, comments, tasks and reports cascade; schedules
            // keep their rows with the project reference cleared.
            let result = sqlx::query("DELETE FROM projects WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .db()?;
            expect_row(result.rows_affected(), "project", id)?;

            tx.commit().await.db()?;
            Ok(orphans)
        })
    }

    fn list_projects(&self) -> StoreFuture<'_, Vec<Project>> {
        Box::pin(async move {
            let rows: Vec<ProjectRow> = sqlx::query_as(concat!(
                "SELECT ",
                project_columns!(),
                " FROM projects ORDER BY LENGTH(code), code"
            ))
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }
}

impl MemberStore for PgStore {
    fn find_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> StoreFuture<'_, Option<ProjectMember>> {
        Box::pin(async move {
            let row: Option<MemberRow> = sqlx::query_as(concat!(
                "SELECT ",
                member_columns!(),
                " FROM project_members WHERE project_id = $1 AND user_id = $2"
            ))
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .db()?;
            row.map(ProjectMember::try_from).transpose()
        })
    }

    fn members_of(&self, project_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>> {
        Box::pin(async move {
            let rows: Vec<MemberRow> = sqlx::query_as(concat!(
                "SELECT ",
                member_columns!(),
                " FROM project_members WHERE project_id = $1 ORDER BY joined_at, id"
            ))
            .bind(project_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn memberships_of(&self, user_id: Uuid) -> StoreFuture<'_, Vec<ProjectMember>> {
        Box::pin(async move {
            let rows: Vec<MemberRow> = sqlx::query_as(concat!(
                "SELECT ",
                member_columns!(),
                " FROM project_members WHERE user_id = $1 ORDER BY joined_at, id"
            ))
            .bind(user_id)
            .fetch_all(self.pool())
            .await
            .db()?;
            convert_all(rows)
        })
    }

    fn insert_members<'a>(&'a self, members: &'a [ProjectMember]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool().begin().await.db()?;
            for member in members {
                sqlx::query(INSERT_MEMBER_SQL)
                    .bind(member.id)
                    .bind(member.project_id)
                    .bind(member.user_id)
                    .bind(member.role.as_str())
                    .bind(member.joined_at)
                    .execute(&mut *tx)
                    .await
                    .db()?;
            }
            tx.commit().await.db()
        })
    }

    fn delete_member(&self, project_id: Uuid, user_id: Uuid) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result =
                sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
                    .bind(project_id)
                    .bind(user_id)
                    .execute(self.pool())
                    .await
                    .db()?;
            Ok(result.rows_affected() > 0)
        })
    }
}
