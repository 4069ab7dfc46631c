//! PostgreSQL Entity Store.
//!
//! One `PgStore` implements every store trait the rule services use. Writes
//! that span several rows run in a single transaction.

use sqlx::PgPool;
use uuid::Uuid;
use worktrack_core::error::{Result, WorktrackError};

use crate::db::Database;

// Column lists shared by the queries of each table. Defined before the
// submodules so they are in textual scope there.

macro_rules! project_columns {
    () => {
        "id, code, name, description, start_date, end_date, created_at, updated_at"
    };
}

macro_rules! member_columns {
    () => {
        "id, project_id, user_id, role, joined_at"
    };
}

macro_rules! task_columns {
    () => {
        "id, project_id, assigned_to, name, description, deadline, priority, status, \
         progress, attachment_path, notes, created_at, updated_at"
    };
}

macro_rules! comment_columns {
    () => {
        "id, project_id, task_id, author_id, content, created_at, updated_at"
    };
}

macro_rules! notification_columns {
    () => {
        "id, user_id, title, content, kind, related_url, is_read, created_at"
    };
}

macro_rules! schedule_columns {
    () => {
        "id, user_id, project_id, title, description, start_at, end_at, is_all_day, color, \
         schedule_type, location, created_by, created_at, updated_at"
    };
}

macro_rules! report_columns {
    () => {
        "id, task_id, author_id, title, content, attachment_path, progress, is_read, created_at"
    };
}

mod discussion;
mod notifications;
mod projects;
mod reports;
pub(crate) mod rows;
mod schedules;
mod tasks;
mod users;

/// Entity Store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.primary().clone())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// An UPDATE or DELETE that must touch exactly one existing row.
pub(crate) fn expect_row(rows_affected: u64, kind: &str, id: Uuid) -> Result<()> {
    if rows_affected == 0 {
        return Err(WorktrackError::not_found(kind, id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_row() {
        let id = Uuid::new_v4();
        assert!(expect_row(1, "task", id).is_ok());
        assert!(matches!(
            expect_row(0, "task", id),
            Err(WorktrackError::NotFound(ref m)) if m.contains(&id.to_string())
        ));
    }

    #[test]
    fn test_column_lists_match_row_fields() {
        assert!(task_columns!().contains("attachment_path, notes"));
        assert!(schedule_columns!().contains("start_at, end_at"));
        assert_eq!(member_columns!().split(", ").count(), 5);
    }
}
