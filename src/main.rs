//! ORM Fixtures - command-line entry point.
//!
//! Prints, creates or drops the fixture schema on the selected backend and
//! reports pool statistics.

use clap::Parser;
use orm_fixtures::commands;
use orm_fixtures::config::Config;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!(
        command = ?config.command,
        "Starting orm-fixtures v{}",
        env!("CARGO_PKG_VERSION")
    );

    match commands::run(&config).await {
        Ok(output) => print!("{}", output),
        Err(e) => {
            error!(error = %e, "Command failed");
            return Err(e.into());
        }
    }

    info!("Done");
    Ok(())
}
