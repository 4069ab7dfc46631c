//! PostgreSQL and filesystem collaborators for the Worktrack services, plus
//! schema migrations, default-data seeding and logging setup.

pub mod db;
pub mod directory;
pub mod migrations;
pub mod objects;
pub mod observability;
pub mod seed;
pub mod store;

use std::sync::Arc;

use worktrack_core::clock::SystemClock;
use worktrack_core::config::WorktrackConfig;
use worktrack_core::{ServiceContext, Worktrack};

pub use db::Database;
pub use directory::PgAccountDirectory;
pub use migrations::{MigrationRunner, MigrationStatus};
pub use objects::LocalObjectStore;
pub use observability::init_logging;
pub use store::PgStore;

/// Wire the services to PostgreSQL, the local object store and the system
/// clock.
pub fn build_services(db: &Database, config: &WorktrackConfig) -> Worktrack {
    let ctx = ServiceContext::new(
        Arc::new(PgStore::from_database(db)),
        Arc::new(PgAccountDirectory::from_database(db)),
        Arc::new(LocalObjectStore::from_config(&config.storage)),
        Arc::new(SystemClock),
        config,
    );
    Worktrack::new(ctx)
}
