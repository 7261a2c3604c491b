use crate::cli::{Cli, Command};
use crate::config;
use anyhow::Context as _;
use serde_json::Value;
use std::process::ExitCode;
use swagger_mcp_tools::{AmbientContext, SwaggerToolSource};
use tokio_util::sync::CancellationToken;

pub async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = config::resolve(&cli)?;
    let source = SwaggerToolSource::new(config).context("build tool source")?;
    source
        .start()
        .await
        .context("load tools from Swagger spec")?;

    match cli.command {
        Command::Tools => print_tools(&source),
        Command::Check => check(&source),
        Command::Call {
            tool,
            args,
            org_id,
            token,
            base_url,
        } => {
            let mut ctx = AmbientContext::new();
            if let Some(org_id) = org_id {
                ctx = ctx.with_org_id(org_id);
            }
            if let Some(token) = token {
                ctx = ctx.with_credential(token);
            }
            if let Some(base_url) = base_url {
                ctx = ctx.with_base_url(base_url);
            }
            call(&source, &tool, &args, ctx).await
        }
    }
}

fn print_tools(source: &SwaggerToolSource) -> anyhow::Result<ExitCode> {
    let tools = source.list_tools();
    let out = serde_json::to_string_pretty(&tools).context("serialize tool list")?;
    println!("{out}");
    Ok(ExitCode::SUCCESS)
}

fn check(source: &SwaggerToolSource) -> anyhow::Result<ExitCode> {
    let snapshot = source.snapshot();
    for def in snapshot.definitions() {
        println!("{}\t{} fields", def.name, def.input_schema.fields().len());
    }
    println!(
        "OK: {} tools from '{}' (base URL: {})",
        snapshot.len(),
        snapshot.title().unwrap_or("untitled"),
        snapshot.base_url().unwrap_or("none")
    );
    Ok(ExitCode::SUCCESS)
}

async fn call(
    source: &SwaggerToolSource,
    tool: &str,
    args: &str,
    ctx: AmbientContext,
) -> anyhow::Result<ExitCode> {
    let arguments: Value = serde_json::from_str(args).context("--args must be a JSON object")?;

    let cancel = CancellationToken::new();
    let ctx = ctx.with_cancellation(cancel.clone());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; cancelling request");
            cancel.cancel();
        }
    });

    let result = source.call_tool(tool, arguments, &ctx).await;
    interrupt.abort();
    let result = result.with_context(|| format!("call '{tool}'"))?;

    let out = serde_json::to_string_pretty(&result).context("serialize tool result")?;
    println!("{out}");
    if result.is_error == Some(true) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
