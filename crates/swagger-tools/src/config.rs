use crate::error::{Result, SwaggerToolsError};
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tag that marks an operation as exposable without ever naming a tool.
pub const DEFAULT_FILTER_TAG: &str = "AI";
/// Path placeholder filled from the caller's organization identity.
pub const DEFAULT_ORG_ID_PARAM: &str = "org_id";
pub const DEFAULT_CREDENTIAL_HEADER: &str = "X-ED-API-Token";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_REF_DEPTH: usize = 16;

/// Configuration for a Swagger-backed tool source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    /// Swagger document location (URL or file path).
    pub spec: String,

    /// Optional spec hash (`sha256:<hex>`) for version detection.
    #[serde(default)]
    pub spec_hash: Option<String>,

    /// Hash policy: warn, fail, or ignore.
    #[serde(default)]
    pub spec_hash_policy: HashPolicy,

    /// Override the base URL inferred from `host`/`basePath`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Operations must carry at least one of these tags. Empty keeps everything.
    #[serde(default = "default_allowed_tags")]
    pub allowed_tags: Vec<String>,

    /// Marker tag skipped when deriving names from tags.
    #[serde(default = "default_filter_tag")]
    pub filter_tag: String,

    #[serde(default = "default_org_id_param")]
    pub org_id_param: String,

    #[serde(default = "default_credential_header")]
    pub credential_header: String,

    /// Glob filters over `"METHOD /path"`.
    #[serde(default)]
    pub auto_discover: AutoDiscoverConfig,

    /// Per-request timeout in seconds. `0` disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub max_response_bytes: Option<usize>,

    #[serde(default)]
    pub max_spec_bytes: Option<usize>,

    #[serde(default = "default_max_ref_depth")]
    pub max_ref_depth: usize,
}

fn default_allowed_tags() -> Vec<String> {
    vec![DEFAULT_FILTER_TAG.to_string()]
}

fn default_filter_tag() -> String {
    DEFAULT_FILTER_TAG.to_string()
}

fn default_org_id_param() -> String {
    DEFAULT_ORG_ID_PARAM.to_string()
}

fn default_credential_header() -> String {
    DEFAULT_CREDENTIAL_HEADER.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_ref_depth() -> usize {
    DEFAULT_MAX_REF_DEPTH
}

impl ToolsConfig {
    /// Config with every optional setting at its default.
    #[must_use]
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            spec_hash: None,
            spec_hash_policy: HashPolicy::default(),
            base_url: None,
            allowed_tags: default_allowed_tags(),
            filter_tag: default_filter_tag(),
            org_id_param: default_org_id_param(),
            credential_header: default_credential_header(),
            auto_discover: AutoDiscoverConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_response_bytes: None,
            max_spec_bytes: None,
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
        }
    }

    /// Load a config file (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not deserialize.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SwaggerToolsError::Config(format!("failed to read config '{}': {e}", path.display()))
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            SwaggerToolsError::Config(format!("failed to parse config '{}': {e}", path.display()))
        })
    }

    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if self.spec.trim().is_empty() {
            return Err(SwaggerToolsError::Config("spec location is empty".into()));
        }
        if self.filter_tag.trim().is_empty() {
            return Err(SwaggerToolsError::Config("filterTag must not be empty".into()));
        }
        if self.org_id_param.trim().is_empty() {
            return Err(SwaggerToolsError::Config("orgIdParam must not be empty".into()));
        }
        HeaderName::from_bytes(self.credential_header.as_bytes()).map_err(|_| {
            SwaggerToolsError::Config(format!(
                "credentialHeader '{}' is not a valid HTTP header name",
                self.credential_header
            ))
        })?;
        if self.max_ref_depth == 0 {
            return Err(SwaggerToolsError::Config("maxRefDepth must be at least 1".into()));
        }
        if let Some(hash) = &self.spec_hash
            && !hash.starts_with("sha256:")
        {
            return Err(SwaggerToolsError::Config(format!(
                "specHash '{hash}' must have the form sha256:<hex>"
            )));
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| {
                SwaggerToolsError::Config(format!("baseUrl '{base}' is not a valid URL: {e}"))
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

/// Hash verification policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashPolicy {
    /// Log warning if hash doesn't match.
    #[default]
    Warn,
    /// Fail startup if hash doesn't match.
    Fail,
    /// Ignore hash verification.
    Ignore,
}

/// Include/exclude globs applied after tag filtering.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AutoDiscoverConfig {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}
