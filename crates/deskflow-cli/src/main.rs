//! CLI entry point for Deskflow.
//!
//! This binary provides the `deskflow` command with subcommands for serving
//! the HTTP API, running an interactive loop, dispatching a single command
//! and listing the action catalog.

mod cli;
mod config;
mod helpers;
mod repl;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use deskflow_web::WebServer;

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::helpers::{build_dispatcher, init_tracing, render_catalog, render_envelope};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // `.env` is optional; variables already set in the process win.
    dotenvy::dotenv().ok();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level);

    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Serve { bind, port } => cmd_serve(config, bind, port).await,
        Commands::Run => {
            let dispatcher = build_dispatcher(&config)?;
            repl::cmd_run(dispatcher).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Dispatch { command } => cmd_dispatch(&config, &command.join(" ")).await,
        Commands::Actions => {
            let dispatcher = build_dispatcher(&config)?;
            print!("{}", render_catalog(dispatcher.registry()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(
    mut config: AppConfig,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<ExitCode> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let dispatcher = build_dispatcher(&config)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting deskflow");

    WebServer::new(config.server, dispatcher)
        .start()
        .await
        .context("web server failed")?;
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// Subcommand: dispatch
// ---------------------------------------------------------------------------

async fn cmd_dispatch(config: &AppConfig, command: &str) -> Result<ExitCode> {
    let dispatcher = build_dispatcher(config)?;
    let envelope = dispatcher.dispatch(command).await;
    println!("{}", render_envelope(&envelope));

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
