//! Logging initialisation.

use tracing_subscriber::EnvFilter;
use worktrack_core::config::LoggingConfig;
use worktrack_core::error::{Result, WorktrackError};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the configured level. Fails if a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config, std::env::var("RUST_LOG").ok())?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| WorktrackError::Config(format!("Failed to initialise logging: {}", e)))
}

fn filter_directive(config: &LoggingConfig, rust_log: Option<String>) -> String {
    rust_log
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

fn env_filter(config: &LoggingConfig, rust_log: Option<String>) -> Result<EnvFilter> {
    let directive = filter_directive(config, rust_log);
    EnvFilter::try_new(&directive)
        .map_err(|e| WorktrackError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_default() {
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(&config, None), "info");
    }

    #[test]
    fn test_rust_log_overrides_level() {
        let config = LoggingConfig {
            level: "warn".into(),
            json_format: false,
        };
        assert_eq!(
            filter_directive(&config, Some("worktrack_core=debug".into())),
            "worktrack_core=debug"
        );
        assert_eq!(filter_directive(&config, Some("  ".into())), "warn");
    }

    #[test]
    fn test_env_filter_accepts_directives() {
        let config = LoggingConfig::default();
        assert!(env_filter(&config, Some("worktrack_runtime=trace,sqlx=warn,info".into())).is_ok());
    }
}
