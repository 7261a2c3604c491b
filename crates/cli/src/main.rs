//! `swagger-mcp`: operator entry point for Swagger-backed MCP tools.
//!
//! Logs go to stderr; stdout carries only command output (JSON for `tools` and `call`).

mod cli;
mod commands;
mod config;

use anyhow::Context as _;
use clap::Parser as _;
use cli::{Cli, LogFormat};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;
    commands::run(cli).await
}

fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
