mod check;
mod migrate;
mod seed;

pub use check::CheckCommand;
pub use migrate::MigrateCommand;
pub use seed::SeedCommand;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use worktrack_core::config::WorktrackConfig;

/// Worktrack - project and task tracking administration
#[derive(Parser)]
#[command(name = "worktrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage database migrations.
    Migrate(MigrateCommand),

    /// Create default roles and accounts.
    Seed(SeedCommand),

    /// Verify configuration, database, schema and storage.
    Check(CheckCommand),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Migrate(cmd) => cmd.execute().await,
            Commands::Seed(cmd) => cmd.execute().await,
            Commands::Check(cmd) => cmd.execute().await,
        }
    }
}

/// Load `.env`, read the configuration file and start logging.
pub(crate) fn load_config(path: &str) -> Result<WorktrackConfig> {
    dotenvy::dotenv().ok();

    if !Path::new(path).exists() {
        anyhow::bail!(
            "Configuration file not found: {}\nCreate one or pass --config <path>.",
            path
        );
    }

    let config = WorktrackConfig::from_file(path)?;

    // A subscriber may already be installed when commands run in-process.
    if let Err(e) = worktrack_runtime::init_logging(&config.observability.logging) {
        tracing::debug!("Logging already initialised: {}", e);
    }

    Ok(config)
}

pub(crate) fn print_header(title: &str) {
    println!();
    println!(
        "  {}  {} {}",
        style("▣").bold(),
        style("Worktrack").bold().cyan(),
        title
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_migrate() {
        let cli = Cli::try_parse_from(["worktrack", "migrate", "up"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_seed_with_config() {
        let cli = Cli::try_parse_from(["worktrack", "seed", "--config", "prod.toml"]).unwrap();
        match cli.command {
            Commands::Seed(cmd) => assert_eq!(cmd.config, "prod.toml"),
            _ => panic!("expected seed command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_command() {
        assert!(Cli::try_parse_from(["worktrack", "serve"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config("/nonexistent/worktrack.toml").unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("worktrack.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            url = "postgres://localhost/worktrack"

            [projects]
            code_allocation_retries = 5
            "#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(config.projects.code_allocation_retries, 5);
        assert_eq!(config.database.pool_size, 10);
    }
}
