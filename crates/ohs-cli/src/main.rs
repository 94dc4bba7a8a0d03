//! OHS CLI - Command-line front end for the offline-capable OHS client
//!
//! Sends API requests, queues writes while offline, and replays them on `ohs sync`.

mod cli;
mod commands;
mod error;
mod session_store;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::AppContext;
use crate::commands::completions::run_completions;
use crate::commands::pending::run_pending;
use crate::commands::records::run_records;
use crate::commands::request::run_request;
use crate::commands::sync::run_sync;
use crate::commands::upload::run_upload;
use crate::error::CliError;

const DEFAULT_LOG_DIRECTIVE: &str = "ohs=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let context = AppContext::new(cli.api_url, cli.db_path, cli.offline)?;

    match cli.command {
        Commands::Request {
            method,
            endpoint,
            data,
        } => run_request(&context, method, &endpoint, data.as_deref()).await?,
        Commands::Upload {
            endpoint,
            file,
            fields,
            content_type,
        } => run_upload(&context, &endpoint, &file, &fields, content_type).await?,
        Commands::Sync => run_sync(&context).await?,
        Commands::Pending { list, json } => run_pending(&context, list, json).await?,
        Commands::Records {
            collection,
            id,
            json,
        } => run_records(&context, collection, id.as_deref(), json).await?,
        Commands::Auth { command } => run_auth(command, &context)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn init_tracing() -> Result<(), CliError> {
    let directive = DEFAULT_LOG_DIRECTIVE
        .parse()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
