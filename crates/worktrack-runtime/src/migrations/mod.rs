mod builtin;
mod runner;

pub use builtin::get_builtin_migrations;
pub use runner::{
    load_migrations_from_dir, AppliedMigration, Migration, MigrationRunner, MigrationStatus,
};
