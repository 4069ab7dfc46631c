//! PostgreSQL Account Directory.
//!
//! Accounts live in `users`, global roles in `user_roles`. Password hashes
//! are written and read here only and never leave this module.

mod credentials;

use std::collections::BTreeSet;

use sqlx::{PgExecutor, PgPool};
use tracing::debug;
use uuid::Uuid;
use worktrack_core::directory::AccountDirectory;
use worktrack_core::error::{Result, WorktrackError};
use worktrack_core::schema::{GlobalRole, User};
use worktrack_core::store::StoreFuture;

use crate::db::{corrupt, Database, DbResultExt};
use crate::store::rows::UserRow;

const USER_COLUMNS: &str = "id, email, employee_code, full_name, phone_number, address, \
    date_of_birth, gender, department, position, avatar_path, created_at, updated_at";

/// Account Directory backed by PostgreSQL.
#[derive(Clone)]
pub struct PgAccountDirectory {
    pool: PgPool,
}

impl PgAccountDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.primary().clone())
    }

    /// Make sure every global role exists. Idempotent.
    pub async fn ensure_global_roles(&self) -> Result<usize> {
        let mut created = 0;
        for role in GlobalRole::ALL {
            let result =
                sqlx::query("INSERT INTO global_roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                    .bind(role.as_str())
                    .execute(&self.pool)
                    .await
                    .db()?;
            created += result.rows_affected() as usize;
        }
        debug!(created, "Global roles ensured");
        Ok(created)
    }

    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .db()?;
        Ok(row.map(User::from))
    }
}

impl AccountDirectory for PgAccountDirectory {
    fn find_user(&self, id: Uuid) -> StoreFuture<'_, Option<User>> {
        Box::pin(async move {
            let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
            let row: Option<UserRow> = sqlx::query_as(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .db()?;
            Ok(row.map(User::from))
        })
    }

    fn find_user_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move { self.fetch_user("LOWER(email)", &email.to_lowercase()).await })
    }

    fn find_user_by_employee_code<'a>(
        &'a self,
        code: &'a str,
    ) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move { self.fetch_user("employee_code", code).await })
    }

    fn list_users(&self) -> StoreFuture<'_, Vec<User>> {
        Box::pin(async move {
            let sql = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
            let rows: Vec<UserRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await.db()?;
            Ok(rows.into_iter().map(User::from).collect())
        })
    }

    fn create_user<'a>(
        &'a self,
        user: &'a User,
        password: &'a str,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let password_hash = credentials::hash_password(password)?;
            let mut tx = self.pool.begin().await.db()?;

            sqlx::query(
                r#"
                INSERT INTO users (
                    id, email, employee_code, password_hash, full_name, phone_number, address,
                    date_of_birth, gender, department, position, avatar_path, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                "#,
            )
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.employee_code)
            .bind(&password_hash)
            .bind(&user.profile.full_name)
            .bind(&user.profile.phone_number)
            .bind(&user.profile.address)
            .bind(user.profile.date_of_birth)
            .bind(&user.profile.gender)
            .bind(&user.profile.department)
            .bind(&user.profile.position)
            .bind(&user.avatar_path)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&mut *tx)
            .await
            .db()?;

            for role in roles {
                sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                    .bind(user.id)
                    .bind(role.as_str())
                    .execute(&mut *tx)
                    .await
                    .db()?;
            }

            tx.commit().await.db()
        })
    }

    fn update_user<'a>(&'a self, user: &'a User) -> StoreFuture<'a, ()> {
        Box::pin(async move { write_user(&self.pool, user).await })
    }

    fn update_user_with_roles<'a>(
        &'a self,
        user: &'a User,
        roles: &'a BTreeSet<GlobalRole>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.db()?;
            write_user(&mut *tx, user).await?;

            let names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role <> ALL($2::text[])")
                .bind(user.id)
                .bind(&names)
                .execute(&mut *tx)
                .await
                .db()?;
            for name in &names {
                sqlx::query(
                    "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                )
                .bind(user.id)
                .bind(name)
                .execute(&mut *tx)
                .await
                .db()?;
            }

            tx.commit().await.db()
        })
    }

    fn set_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let password_hash = credentials::hash_password(password)?;
            let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                .bind(id)
                .bind(&password_hash)
                .execute(&self.pool)
                .await
                .db()?;
            crate::store::expect_row(result.rows_affected(), "user", id)
        })
    }

    fn verify_password<'a>(&'a self, id: Uuid, password: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let stored: Option<String> =
                sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .db()?;
            match stored {
                Some(hash) => credentials::verify_password(password, &hash),
                None => Ok(false),
            }
        })
    }

    fn delete_user(&self, id: Uuid) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .db()?;
            if result.rows_affected() == 0 {
                return Err(WorktrackError::not_found("user", id));
            }
            Ok(())
        })
    }

    fn roles_of(&self, id: Uuid) -> StoreFuture<'_, BTreeSet<GlobalRole>> {
        Box::pin(async move {
            let names: Vec<String> =
                sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
                    .db()?;
            names
                .iter()
                .map(|name| name.parse::<GlobalRole>().map_err(|e| corrupt("user_roles.role", e)))
                .collect()
        })
    }

    fn add_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO user_roles (user_id, role) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .db()?;
            Ok(())
        })
    }

    fn remove_role(&self, id: Uuid, role: GlobalRole) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = $2")
                .bind(id)
                .bind(role.as_str())
                .execute(&self.pool)
                .await
                .db()?;
            Ok(())
        })
    }
}

/// Write email, profile and avatar. The employee code is only filled in when
/// the stored one is empty.
async fn write_user<'e>(executor: impl PgExecutor<'e>, user: &User) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email = $2,
            employee_code = CASE
                WHEN employee_code IS NULL OR BTRIM(employee_code) = '' THEN $3
                ELSE employee_code
            END,
            full_name = $4, phone_number = $5, address = $6, date_of_birth = $7,
            gender = $8, department = $9, position = $10, avatar_path = $11,
            updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.employee_code)
    .bind(&user.profile.full_name)
    .bind(&user.profile.phone_number)
    .bind(&user.profile.address)
    .bind(user.profile.date_of_birth)
    .bind(&user.profile.gender)
    .bind(&user.profile.department)
    .bind(&user.profile.position)
    .bind(&user.avatar_path)
    .bind(user.updated_at)
    .execute(executor)
    .await
    .db()?;
    crate::store::expect_row(result.rows_affected(), "user", user.id)
}
