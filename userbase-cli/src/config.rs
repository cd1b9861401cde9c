use clap::Parser;

use crate::telemetry::TracingConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite:userbase.db";

#[derive(Parser, Debug)]
#[command(name = "userbase")]
#[command(about = "Seed a users table and run a walkthrough of example queries", long_about = None)]
pub struct Cli {
    /// Database URL (falls back to DATABASE_URL, then sqlite:userbase.db)
    #[arg(short, long)]
    pub database: Option<String>,
    /// Log every SQL statement at debug level
    #[arg(long)]
    pub log_queries: bool,
    /// Do not create missing tables before running
    #[arg(long)]
    pub no_sync: bool,
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    /// Run `CREATE TABLE IF NOT EXISTS` for both models first.
    pub sync: bool,
    pub tracing: TracingConfig,
}

impl Config {
    /// Flags win over the environment; the environment wins over defaults.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should count as environment.
    pub fn from_cli(cli: Cli) -> Self {
        Self {
            database_url: resolve_db_url(cli.database, std::env::var("DATABASE_URL").ok()),
            sync: !cli.no_sync,
            tracing: TracingConfig {
                log_queries: cli.log_queries,
            },
        }
    }
}

fn resolve_db_url(flag: Option<String>, env: Option<String>) -> String {
    flag.or(env)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_beats_environment() {
        let url = resolve_db_url(
            Some("sqlite:flag.db".to_string()),
            Some("sqlite:env.db".to_string()),
        );
        assert_eq!(url, "sqlite:flag.db");
    }

    #[test]
    fn environment_beats_default() {
        let url = resolve_db_url(None, Some("sqlite:env.db".to_string()));
        assert_eq!(url, "sqlite:env.db");
    }

    #[test]
    fn blank_values_fall_back_to_default() {
        assert_eq!(resolve_db_url(None, Some("  ".to_string())), DEFAULT_DATABASE_URL);
        assert_eq!(resolve_db_url(None, None), DEFAULT_DATABASE_URL);
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from(["userbase", "--database", "sqlite::memory:", "--log-queries", "--no-sync"]);
        let config = Config::from_cli(cli);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(!config.sync);
        assert!(config.tracing.log_queries);
    }
}
