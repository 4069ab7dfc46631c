//! Embedded schema migrations.
//!
//! Applied once each, in order, before any migrations loaded from disk.
//! Tracked in `worktrack_migrations`.

use super::runner::Migration;

const WORKTRACK_SCHEMA_SQL: &str = include_str!("../../migrations/0001_worktrack_schema.sql");

/// Get all embedded migrations.
pub fn get_builtin_migrations() -> Vec<Migration> {
    vec![Migration::new("0001_worktrack_schema", WORKTRACK_SCHEMA_SQL)]
}
