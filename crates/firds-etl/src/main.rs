//! firds-etl - Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use firds_common::logging::init_logging;
use firds_etl::config::EtlConfig;
use firds_etl::storage::Storage;
use firds_etl::{pipeline, Cli, Commands};
use serde::Serialize;
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = match cli.log_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid logging environment: {}", e);
            cli.default_log_config()
        },
    };

    let _log = match init_logging(&log_config) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        },
    };
    let _run = _log.as_ref().map(|handle| handle.enter());

    match execute(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = ?e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        },
    }
}

/// Returns whether the command fully succeeded
async fn execute(cli: Cli) -> Result<bool> {
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
        },
        None => {
            dotenvy::dotenv().ok();
        },
    }
    let mut config = EtlConfig::from_env().context("Failed to read configuration")?;

    match cli.command {
        Commands::Run {
            source,
            storage,
            output,
        } => {
            source.apply(&mut config);
            storage.apply(&mut config);
            if let Some(output) = output {
                config.output_file_name = output;
            }

            let outcome = pipeline::run(&config).await?;
            print_json(&outcome)?;
            Ok(outcome.is_success())
        },
        Commands::Resolve { source } => {
            source.apply(&mut config);

            match pipeline::resolve(&config).await? {
                Some(url) => {
                    println!("{}", url);
                    Ok(true)
                },
                None => {
                    eprintln!(
                        "No DLTINS package at position {}",
                        config.download_link_index
                    );
                    Ok(false)
                },
            }
        },
        Commands::Status { storage } => {
            storage.apply(&mut config);

            let storage = Storage::new(config.storage).await;
            print_json(storage.status())?;
            Ok(storage.has_valid_backend())
        },
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
