use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::Path;

use worktrack_core::directory::AccountDirectory;
use worktrack_core::objects::ObjectStore;
use worktrack_runtime::migrations::{load_migrations_from_dir, MigrationRunner};
use worktrack_runtime::{build_services, Database, LocalObjectStore, PgAccountDirectory};

use super::{load_config, print_header};

/// Verify that a deployment is ready to serve.
#[derive(Parser)]
pub struct CheckCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "worktrack.toml")]
    pub config: String,

    /// Directory with extra migrations.
    #[arg(short, long, default_value = "migrations")]
    pub migrations_dir: String,
}

impl CheckCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;
        print_header("Check");
        ok(&format!("Configuration loaded from {}", self.config));

        let db = Database::from_config(&config.database)
            .await
            .context("Failed to connect to the database")?;
        db.health_check().await?;
        ok("Database reachable");

        let available = load_migrations_from_dir(Path::new(&self.migrations_dir))?;
        let status = MigrationRunner::new(db.primary().clone())
            .status(&available)
            .await?;
        if status.pending.is_empty() {
            ok(&format!("{} migration(s) applied", status.applied.len()));
        } else {
            warn(&format!(
                "{} pending migration(s); run `worktrack migrate up`",
                status.pending.len()
            ));
        }

        let objects = LocalObjectStore::from_config(&config.storage);
        let written = objects.put("check", "write-test.txt", b"ok").await?;
        objects.delete(&written).await?;
        ok(&format!("Storage writable at {}", objects.root().display()));

        let directory = PgAccountDirectory::from_database(&db);
        match directory.find_user_by_email(&config.seed.admin_email).await? {
            Some(admin) => {
                let services = build_services(&db, &config);
                let actor = services.accounts.resolve_actor(admin.id).await?;
                if actor.is_admin() {
                    ok(&format!("Admin account {} ready", config.seed.admin_email));
                } else {
                    warn(&format!(
                        "{} exists but lacks the Admin role; run `worktrack seed`",
                        config.seed.admin_email
                    ));
                }
            }
            None => warn("No admin account; run `worktrack seed`"),
        }

        if config.seed.uses_default_password() {
            warn("Default accounts use the built-in password");
        }

        db.close().await;
        println!();
        Ok(())
    }
}

fn ok(message: &str) {
    println!("  {} {}", style("✓").green(), message);
}

fn warn(message: &str) {
    println!("  {} {}", style("!").yellow().bold(), message);
}
