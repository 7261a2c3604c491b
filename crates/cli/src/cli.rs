use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "swagger-mcp",
    version,
    about = "Expose a Swagger 2.0 API as MCP tools"
)]
pub struct Cli {
    /// Config file (YAML or JSON). Flags below override its values.
    #[arg(long, env = "SWAGGER_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Swagger document URL or path. Defaults to `<api-url>/swagger/doc.json`.
    #[arg(long, env = "SWAGGER_MCP_SPEC")]
    pub spec: Option<String>,

    /// Backend base URL.
    #[arg(long, env = "SWAGGER_MCP_API_URL")]
    pub api_url: Option<String>,

    /// Only expose operations carrying one of these tags (repeatable or comma-separated).
    #[arg(long = "allowed-tag", env = "SWAGGER_MCP_ALLOWED_TAGS", value_delimiter = ',')]
    pub allowed_tags: Vec<String>,

    /// Expose every operation regardless of tags.
    #[arg(long, conflicts_with = "allowed_tags")]
    pub all_tags: bool,

    #[arg(long, env = "SWAGGER_MCP_CREDENTIAL_HEADER")]
    pub credential_header: Option<String>,

    /// Per-request timeout in seconds (0 disables).
    #[arg(long, env = "SWAGGER_MCP_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    #[arg(long, env = "SWAGGER_MCP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, env = "SWAGGER_MCP_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the synthesized tool list as JSON.
    Tools,

    /// Invoke one tool and print the tool result as JSON.
    Call {
        tool: String,

        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,

        #[arg(long, env = "SWAGGER_MCP_ORG_ID")]
        org_id: Option<String>,

        #[arg(long, env = "SWAGGER_MCP_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Base URL for this call only.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Load the spec and synthesize tools, then report counts.
    Check,
}
