//! Error types for `swagger-mcp-tools`.

use thiserror::Error;

/// Main error type for Swagger tooling.
///
/// The first group of variants can only occur while loading a spec and building the tool set;
/// they abort startup (or a reload) as a whole. The second group is scoped to a single
/// invocation and is reported back to the caller as a failed tool result.
#[derive(Error, Debug)]
pub enum SwaggerToolsError {
    /// Configuration errors (invalid config values, unusable header names).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The spec could not be fetched (network failure or non-2xx response).
    #[error("Fetch error: failed to fetch spec from '{location}': {message}")]
    Fetch { location: String, message: String },

    #[error("Fetch error: failed to read spec file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a well-formed Swagger 2.0 description.
    #[error("Parse error: invalid spec from '{location}': {message}")]
    Parse { location: String, message: String },

    /// A `$ref` could not be resolved, or resolution went too deep.
    #[error("Expansion error: {0}")]
    Expansion(String),

    /// No usable tool or field name could be derived.
    #[error("Naming error: {0}")]
    Naming(String),

    /// Ambient identity/credential missing or unusable.
    #[error("Context error: {0}")]
    Context(String),

    /// Caller-supplied arguments cannot be turned into a request.
    #[error("Request error: {0}")]
    Request(String),

    /// The request was never answered (DNS, refused connection, timeout, cancellation).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a status >= 400.
    #[error("API error {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Tool not found: {0}")]
    UnknownTool(String),
}

impl SwaggerToolsError {
    /// Short, stable category name (used as a structured log field).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Fetch { .. } | Self::ReadFile { .. } => "fetch",
            Self::Parse { .. } => "parse",
            Self::Expansion(_) => "expansion",
            Self::Naming(_) => "naming",
            Self::Context(_) => "context",
            Self::Request(_) => "request",
            Self::Transport(_) => "transport",
            Self::Backend { .. } => "backend",
            Self::UnknownTool(_) => "unknown_tool",
        }
    }

    /// Whether this error belongs to spec loading / tool synthesis rather than to one call.
    #[must_use]
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Fetch { .. }
                | Self::ReadFile { .. }
                | Self::Parse { .. }
                | Self::Expansion(_)
                | Self::Naming(_)
        )
    }
}

/// Result type alias for Swagger tooling operations.
pub type Result<T> = std::result::Result<T, SwaggerToolsError>;
