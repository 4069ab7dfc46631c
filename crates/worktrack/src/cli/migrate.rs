use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::Path;

use worktrack_runtime::migrations::{load_migrations_from_dir, MigrationRunner};
use worktrack_runtime::Database;

use super::{load_config, print_header};

/// Manage database migrations.
#[derive(Parser)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,

    /// Configuration file path.
    #[arg(short, long, default_value = "worktrack.toml", global = true)]
    pub config: String,

    /// Directory with extra migrations, applied after the built-in schema.
    #[arg(short, long, default_value = "migrations", global = true)]
    pub migrations_dir: String,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Apply all pending migrations.
    Up,

    /// Show migration status.
    Status,
}

impl MigrateCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;

        let db = Database::from_config(&config.database).await?;
        let runner = MigrationRunner::new(db.primary().clone());
        let available = load_migrations_from_dir(Path::new(&self.migrations_dir))?;

        match self.action {
            MigrateAction::Up => {
                print_header("Migrations");

                println!("  {} Running pending migrations...", style("→").dim());
                let applied = runner.run(available).await?;

                if applied.is_empty() {
                    println!("  {} Schema is up to date", style("ℹ").blue());
                } else {
                    for name in &applied {
                        println!("  {} Applied: {}", style("✓").green(), name);
                    }
                    println!();
                    println!(
                        "  {} Applied {} migration(s)",
                        style("✓").green(),
                        applied.len()
                    );
                }
                println!();
            }

            MigrateAction::Status => {
                print_header("Migration Status");

                let status = runner.status(&available).await?;

                if !status.applied.is_empty() {
                    println!("  {} Applied:", style("✓").green());
                    for m in &status.applied {
                        println!(
                            "    {} {} ({})",
                            style(&m.name).cyan(),
                            style("at").dim(),
                            m.applied_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }

                if !status.pending.is_empty() {
                    if !status.applied.is_empty() {
                        println!();
                    }
                    println!("  {} Pending:", style("○").yellow());
                    for name in &status.pending {
                        println!("    {} {}", style("→").dim(), style(name).yellow());
                    }
                }

                println!();
                println!(
                    "  {} {} applied, {} pending",
                    style("ℹ").blue(),
                    status.applied.len(),
                    status.pending.len()
                );
                println!();
            }
        }

        db.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};

    #[test]
    fn test_parse_status_with_dir() {
        let cli = Cli::try_parse_from([
            "worktrack",
            "migrate",
            "status",
            "--migrations-dir",
            "db/extra",
        ])
        .unwrap();
        match cli.command {
            Commands::Migrate(cmd) => {
                assert!(matches!(cmd.action, MigrateAction::Status));
                assert_eq!(cmd.migrations_dir, "db/extra");
                assert_eq!(cmd.config, "worktrack.toml");
            }
            _ => panic!("expected migrate command"),
        }
    }
}
