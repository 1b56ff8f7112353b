use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mcprecon::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The worker's stdout is the message channel back to the host; keep
    // logging off it entirely.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let quiet_logs = matches!(cli.command, Commands::EnumWorker);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if quiet_logs { "off" } else { default_level })),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(error) => {
            // Configuration mistakes get the full diagnostic treatment;
            // anything else prints the plain error chain.
            match error.downcast::<mcprecon::errors::ConfigError>() {
                Ok(diagnostic) => eprintln!("{:?}", miette::Report::new(diagnostic)),
                Err(error) => eprintln!("Error: {:#}", error),
            }
            ExitCode::from(1)
        }
    }
}
