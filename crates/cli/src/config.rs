use crate::cli::Cli;
use anyhow::Context as _;
use swagger_mcp_tools::ToolsConfig;

const DEFAULT_SPEC_PATH: &str = "/swagger/doc.json";

/// Build the effective config: file first, then flag/env overrides.
pub fn resolve(cli: &Cli) -> anyhow::Result<ToolsConfig> {
    let mut config = match &cli.config {
        Some(path) => ToolsConfig::from_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => {
            let spec = match (&cli.spec, &cli.api_url) {
                (Some(spec), _) => spec.clone(),
                (None, Some(api_url)) => {
                    format!("{}{DEFAULT_SPEC_PATH}", api_url.trim_end_matches('/'))
                }
                (None, None) => anyhow::bail!("one of --spec, --api-url or --config is required"),
            };
            ToolsConfig::new(spec)
        }
    };

    if let Some(spec) = &cli.spec {
        config.spec.clone_from(spec);
    }
    if let Some(api_url) = &cli.api_url {
        config.base_url = Some(api_url.clone());
    }
    if cli.all_tags {
        config.allowed_tags.clear();
    } else if !cli.allowed_tags.is_empty() {
        config.allowed_tags.clone_from(&cli.allowed_tags);
    }
    if let Some(header) = &cli.credential_header {
        config.credential_header.clone_from(header);
    }
    if let Some(secs) = cli.timeout_secs {
        config.request_timeout_secs = secs;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}
