//! Migration runner with advisory locking.
//!
//! Only one process applies migrations at a time; the lock and every
//! statement share one pooled connection.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tracing::{debug, info, warn};
use worktrack_core::error::{Result, WorktrackError};

/// Lock ID for the migration advisory lock ("WKTRK" in hex).
const MIGRATION_LOCK_ID: i64 = 0x574B54524B;

/// A single migration.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique name, e.g. "0001_worktrack_schema".
    pub name: String,
    /// SQL to execute.
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// A migration recorded in the tracking table.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Applied and pending migrations, each in execution order.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<String>,
}

/// Runs the embedded schema migrations followed by any extra migrations.
pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations under the advisory lock.
    pub async fn run(&self, extra_migrations: Vec<Migration>) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            WorktrackError::Storage(format!("Failed to acquire migration connection: {}", e))
        })?;

        acquire_lock(&mut conn).await?;

        let result = run_migrations_inner(&mut conn, extra_migrations).await;

        if let Err(e) = release_lock(&mut conn).await {
            warn!("Failed to release migration lock: {}", e);
        }

        result
    }

    /// Compare the tracking table with the embedded and `available` migrations.
    pub async fn status(&self, available: &[Migration]) -> Result<MigrationStatus> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            WorktrackError::Storage(format!("Failed to acquire migration connection: {}", e))
        })?;
        ensure_migrations_table(&mut conn).await?;

        let rows: Vec<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT name, applied_at FROM worktrack_migrations ORDER BY id")
                .fetch_all(&mut *conn)
                .await
                .map_err(|e| {
                    WorktrackError::Storage(format!("Failed to read applied migrations: {}", e))
                })?;

        let applied: HashMap<String, DateTime<Utc>> = rows.iter().cloned().collect();
        let pending = all_migrations(available.to_vec())
            .into_iter()
            .filter(|m| !applied.contains_key(&m.name))
            .map(|m| m.name)
            .collect();

        Ok(MigrationStatus {
            applied: rows
                .into_iter()
                .map(|(name, applied_at)| AppliedMigration { name, applied_at })
                .collect(),
            pending,
        })
    }
}

/// Embedded migrations first, then the extra ones.
fn all_migrations(extra: Vec<Migration>) -> Vec<Migration> {
    let mut migrations = super::builtin::get_builtin_migrations();
    migrations.extend(extra);
    migrations
}

async fn run_migrations_inner(
    conn: &mut PoolConnection<Postgres>,
    extra_migrations: Vec<Migration>,
) -> Result<Vec<String>> {
    ensure_migrations_table(conn).await?;

    let applied = get_applied_migrations(conn).await?;
    debug!("Already applied migrations: {:?}", applied);

    let mut newly_applied = Vec::new();
    for migration in all_migrations(extra_migrations) {
        if !applied.contains(&migration.name) {
            apply_migration(conn, &migration).await?;
            newly_applied.push(migration.name);
        }
    }

    Ok(newly_applied)
}

async fn acquire_lock(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    debug!("Acquiring migration lock...");
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut **conn)
        .await
        .map_err(|e| WorktrackError::Storage(format!("Failed to acquire migration lock: {}", e)))?;
    debug!("Migration lock acquired");
    Ok(())
}

async fn release_lock(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut **conn)
        .await
        .map_err(|e| WorktrackError::Storage(format!("Failed to release migration lock: {}", e)))?;
    debug!("Migration lock released");
    Ok(())
}

async fn ensure_migrations_table(conn: &mut PoolConnection<Postgres>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS worktrack_migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) UNIQUE NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut **conn)
    .await
    .map_err(|e| WorktrackError::Storage(format!("Failed to create migrations table: {}", e)))?;
    Ok(())
}

async fn get_applied_migrations(conn: &mut PoolConnection<Postgres>) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM worktrack_migrations")
        .fetch_all(&mut **conn)
        .await
        .map_err(|e| WorktrackError::Storage(format!("Failed to get applied migrations: {}", e)))?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

async fn apply_migration(conn: &mut PoolConnection<Postgres>, migration: &Migration) -> Result<()> {
    info!("Applying migration: {}", migration.name);

    for statement in split_sql_statements(&migration.sql) {
        if is_comment_only(&statement) {
            continue;
        }

        sqlx::query(&statement)
            .execute(&mut **conn)
            .await
            .map_err(|e| {
                WorktrackError::Storage(format!(
                    "Failed to apply migration '{}': {}",
                    migration.name, e
                ))
            })?;
    }

    sqlx::query("INSERT INTO worktrack_migrations (name) VALUES ($1)")
        .bind(&migration.name)
        .execute(&mut **conn)
        .await
        .map_err(|e| {
            WorktrackError::Storage(format!(
                "Failed to record migration '{}': {}",
                migration.name, e
            ))
        })?;

    info!("Migration applied: {}", migration.name);
    Ok(())
}

fn is_comment_only(statement: &str) -> bool {
    statement.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with("--")
    })
}

/// Split SQL into individual statements, respecting dollar-quoted strings.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_quote = false;
    let mut dollar_tag = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' {
            let mut potential_tag = String::from("$");

            while let Some(&next_c) = chars.peek() {
                if next_c == '$' {
                    chars.next();
                    potential_tag.push('$');
                    current.push('$');
                    break;
                } else if next_c.is_alphanumeric() || next_c == '_' {
                    chars.next();
                    potential_tag.push(next_c);
                    current.push(next_c);
                } else {
                    break;
                }
            }

            if potential_tag.len() >= 2 && potential_tag.ends_with('$') {
                if in_dollar_quote && potential_tag == dollar_tag {
                    in_dollar_quote = false;
                    dollar_tag.clear();
                } else if !in_dollar_quote {
                    in_dollar_quote = true;
                    dollar_tag = potential_tag;
                }
            }
        }

        if c == ';' && !in_dollar_quote {
            let stmt = current.trim().trim_end_matches(';').trim().to_string();
            if !stmt.is_empty() {
                statements.push(stmt);
            }
            current.clear();
        }
    }

    let stmt = current.trim().trim_end_matches(';').trim().to_string();
    if !stmt.is_empty() {
        statements.push(stmt);
    }

    statements
}

/// Load extra migrations from a directory.
///
/// Files are named like `0002_add_indexes.sql` and run in name order after
/// the embedded schema.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().map(|e| e == "sql").unwrap_or(false) {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| WorktrackError::Config("Invalid migration filename".into()))?
                .to_string();

            let sql = std::fs::read_to_string(&path)?;
            migrations.push(Migration::new(name, sql));
        }
    }

    migrations.sort_by(|a, b| a.name.cmp(&b.name));

    debug!("Loaded {} extra migrations", migrations.len());
    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_migrations_from_nonexistent_dir() {
        let migrations = load_migrations_from_dir(Path::new("/nonexistent/path")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_load_migrations_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("0003_third.sql"), "SELECT 3;").unwrap();
        fs::write(dir.path().join("0002_second.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("notes.txt"), "Not a migration").unwrap();
        fs::write(dir.path().join("0004_backup.sql.bak"), "Backup").unwrap();

        let migrations = load_migrations_from_dir(dir.path()).unwrap();
        let names: Vec<_> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["0002_second", "0003_third"]);
    }

    #[test]
    fn test_builtin_schema_runs_first() {
        let all = all_migrations(vec![Migration::new("0002_extra", "SELECT 1")]);
        assert_eq!(all[0].name, "0001_worktrack_schema");
        assert_eq!(all.last().unwrap().name, "0002_extra");
    }

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_sql_statements("SELECT 1; SELECT 2; SELECT 3;");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_with_dollar_quoted_function() {
        let sql = r#"
CREATE FUNCTION touch_updated_at() RETURNS trigger AS $$
BEGIN
    NEW.updated_at := NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

SELECT 3;
"#;
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("NEW.updated_at := NOW()"));
        assert!(stmts[0].ends_with("$$ LANGUAGE plpgsql"));
        assert_eq!(stmts[1], "SELECT 3");
    }

    #[test]
    fn test_split_named_dollar_tag() {
        let sql = "DO $body$ BEGIN PERFORM 1; END $body$; SELECT 2;";
        let stmts = split_sql_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("DO $body$"));
    }

    #[test]
    fn test_positional_parameters_do_not_open_quotes() {
        let stmts = split_sql_statements("SELECT $1; SELECT $2;");
        assert_eq!(stmts, vec!["SELECT $1", "SELECT $2"]);
    }

    #[test]
    fn test_comment_only_statements_are_skipped() {
        assert!(is_comment_only("-- Accounts\n\n-- more"));
        assert!(!is_comment_only("-- Accounts\nCREATE TABLE t (id INT)"));
    }

    #[test]
    fn test_schema_splits_into_executable_statements() {
        let migrations = super::super::builtin::get_builtin_migrations();
        let stmts = split_sql_statements(&migrations[0].sql);
        let executable: Vec<_> = stmts.iter().filter(|s| !is_comment_only(s)).collect();
        assert!(executable.len() > 10);
        assert!(executable
            .iter()
            .any(|s| s.contains("INSERT INTO project_code_counter")));
    }
}
