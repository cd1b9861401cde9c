use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingConfig {
    /// Show every statement the query layer runs (`userbase_core=debug`).
    pub log_queries: bool,
}

impl TracingConfig {
    fn default_directives(&self) -> &'static str {
        if self.log_queries {
            "info,userbase_core=debug,userbase_cli=debug"
        } else {
            "info"
        }
    }
}

/// Installs a compact stderr subscriber. `RUST_LOG` overrides the defaults.
pub fn init_tracing(config: &TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log_queries)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
}
