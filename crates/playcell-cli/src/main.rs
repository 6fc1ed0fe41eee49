//! playcell CLI - inspect and simulate audio attachment rows
//!
//! Binds the row state machine against a real cache directory, or replays
//! scripted taps and download callbacks against in-memory engines.

mod cli;
mod commands;
mod error;

use clap::Parser;
use playcell_core::config::{default_settings_path, resolve_settings};

use crate::cli::{Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::inspect::{run_inspect, InspectArgs};
use crate::commands::simulate::run_simulate;
use crate::error::CliError;

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("playcell=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(default_settings_path);

    match cli.command {
        Commands::Inspect {
            file_name,
            cache_dir,
            attach_path,
            streamable,
            stream_media,
            voice,
            json,
        } => {
            let resolved = resolve_settings(&settings_path)?;
            tracing::debug!("Using player settings from {:?}", resolved.source);
            let args = InspectArgs {
                file_name,
                cache_dir,
                attach_path,
                streamable,
                stream_media,
                voice,
            };
            run_inspect(args, &resolved.settings, json)?;
        }
        Commands::Simulate { script, json } => run_simulate(&script, json)?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
    }

    Ok(())
}
