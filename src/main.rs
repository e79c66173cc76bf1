//! Bleeding: Bluetooth/BLE DeAuth and Analysis Tool
//!
//! Discovers nearby devices, enumerates their services and floods a chosen
//! target with connections from a pool of concurrent workers.

mod attack;
mod bluetooth;
mod cli;
mod commands;
mod display;
mod interactive;
mod mac;

use bleeding_core::Logger;
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Diagnostics go to stderr; operator output owns stdout
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.headless),
        )
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let logger = Logger::stdout(cli.headless);
    if !cli.headless {
        display::print_banner(&logger);
    }

    match commands::run(cli.command, &logger).await {
        Ok(code) => code,
        Err(e) => {
            logger.err(format!("Error: {e:#}"));
            ExitCode::FAILURE
        }
    }
}
