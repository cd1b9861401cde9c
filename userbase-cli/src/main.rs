use std::process::ExitCode;

use clap::Parser;
use userbase_cli::config::{Cli, Config};
use userbase_cli::{driver, telemetry};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = Config::from_cli(Cli::parse());

    if let Err(err) = telemetry::init_tracing(&config.tracing) {
        eprintln!("[WARN] tracing disabled: {}", err);
    }

    match driver::run(&config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "script aborted");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
