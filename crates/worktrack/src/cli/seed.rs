use anyhow::Result;
use clap::Parser;
use console::style;

use worktrack_core::clock::SystemClock;
use worktrack_runtime::seed::seed;
use worktrack_runtime::{Database, PgAccountDirectory};

use super::{load_config, print_header};

/// Create the global roles and default accounts, and backfill employee codes.
#[derive(Parser)]
pub struct SeedCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "worktrack.toml")]
    pub config: String,
}

impl SeedCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;
        print_header("Seed");

        let db = Database::from_config(&config.database).await?;
        let directory = PgAccountDirectory::from_database(&db);

        let report = seed(&directory, &config.seed, &SystemClock).await?;
        db.close().await;

        if config.seed.uses_default_password() {
            println!(
                "  {} Default accounts use the built-in password",
                style("!").yellow().bold()
            );
            println!();
        }

        println!("  {} Roles created: {}", style("✓").green(), report.roles_created);
        for email in &report.accounts_created {
            println!("  {} Account created: {}", style("✓").green(), style(email).cyan());
        }
        if report.roles_granted > 0 {
            println!("  {} Roles granted: {}", style("✓").green(), report.roles_granted);
        }
        if report.codes_backfilled > 0 {
            println!(
                "  {} Employee codes backfilled: {}",
                style("✓").green(),
                report.codes_backfilled
            );
        }
        if report.accounts_created.is_empty() && report.roles_granted == 0 {
            println!("  {} Default accounts already present", style("ℹ").blue());
        }
        println!();

        Ok(())
    }
}
