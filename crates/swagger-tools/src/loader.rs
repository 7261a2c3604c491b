//! Spec acquisition: fetch or read the Swagger document, verify it, expand it.

use crate::config::{HashPolicy, ToolsConfig, DEFAULT_MAX_REF_DEPTH};
use crate::error::{Result, SwaggerToolsError};
use crate::resolver::expand_document;
use crate::spec::Specification;
use crate::transport::{read_body_limited, redact_url, sanitize_reqwest_error};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use url::Url;

/// Where a Swagger document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(Url),
    File(PathBuf),
    /// Pre-fetched document bytes, labelled for error messages.
    Bytes { label: String, bytes: Vec<u8> },
}

impl SpecSource {
    /// Interpret a configured location as a URL (`http(s)://`, `file://`) or a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the location looks like a URL but does not parse as one.
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|e| {
                SwaggerToolsError::Config(format!("Invalid spec URL '{location}': {e}"))
            })?;
            Ok(SpecSource::Url(url))
        } else if location.starts_with("file://") {
            let url = Url::parse(location).map_err(|e| {
                SwaggerToolsError::Config(format!("Invalid spec file URL '{location}': {e}"))
            })?;
            let path = url.to_file_path().map_err(|()| {
                SwaggerToolsError::Config(format!(
                    "Invalid file URL (cannot convert to path): {location}"
                ))
            })?;
            Ok(SpecSource::File(path))
        } else {
            Ok(SpecSource::File(PathBuf::from(location)))
        }
    }

    #[must_use]
    pub fn bytes(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        SpecSource::Bytes {
            label: label.into(),
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn display(&self) -> String {
        match self {
            SpecSource::Url(u) => redact_url(u),
            SpecSource::File(p) => p.display().to_string(),
            SpecSource::Bytes { label, .. } => label.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecLoader {
    client: Client,
    max_spec_bytes: Option<usize>,
    expected_hash: Option<String>,
    hash_policy: HashPolicy,
    max_ref_depth: usize,
}

impl SpecLoader {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_spec_bytes: None,
            expected_hash: None,
            hash_policy: HashPolicy::default(),
            max_ref_depth: DEFAULT_MAX_REF_DEPTH,
        }
    }

    #[must_use]
    pub fn from_config(config: &ToolsConfig, client: Client) -> Self {
        Self {
            client,
            max_spec_bytes: config.max_spec_bytes,
            expected_hash: config.spec_hash.clone(),
            hash_policy: config.spec_hash_policy,
            max_ref_depth: config.max_ref_depth,
        }
    }

    #[must_use]
    pub fn with_expected_hash(mut self, hash: impl Into<String>, policy: HashPolicy) -> Self {
        self.expected_hash = Some(hash.into());
        self.hash_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_ref_depth(mut self, depth: usize) -> Self {
        self.max_ref_depth = depth;
        self
    }

    /// Load, verify and expand a document.
    ///
    /// # Errors
    ///
    /// Fails with a fetch, parse or expansion error; never returns a partial specification.
    pub async fn load(&self, source: &SpecSource) -> Result<Specification> {
        let location = source.display();
        let bytes = self.read_source(source).await?;
        self.verify_hash(&location, &bytes)?;

        let text = std::str::from_utf8(&bytes).map_err(|e| SwaggerToolsError::Parse {
            location: location.clone(),
            message: format!("document is not valid UTF-8: {e}"),
        })?;
        let spec = expand_document(text, &location, self.max_ref_depth)?;

        tracing::info!(
            source = %location,
            title = spec.info.title.as_deref().unwrap_or(""),
            paths = spec.paths.len(),
            operations = spec.operation_count(),
            definitions = spec.definitions.len(),
            "Loaded Swagger spec"
        );
        Ok(spec)
    }

    async fn read_source(&self, source: &SpecSource) -> Result<Vec<u8>> {
        match source {
            SpecSource::Url(url) => {
                tracing::info!("Fetching Swagger spec from {}", redact_url(url));
                let fetch_error = |message: String| SwaggerToolsError::Fetch {
                    location: redact_url(url),
                    message,
                };
                let resp = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(|e| fetch_error(sanitize_reqwest_error(&e)))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(fetch_error(format!("unexpected status {status}")));
                }
                read_body_limited(resp, self.max_spec_bytes)
                    .await
                    .map_err(fetch_error)
            }
            SpecSource::File(path) => {
                tracing::info!("Loading Swagger spec from {}", path.display());
                let bytes =
                    tokio::fs::read(path)
                        .await
                        .map_err(|e| SwaggerToolsError::ReadFile {
                            path: path.display().to_string(),
                            source: e,
                        })?;
                if let Some(max) = self.max_spec_bytes
                    && bytes.len() > max
                {
                    return Err(SwaggerToolsError::Fetch {
                        location: path.display().to_string(),
                        message: format!("document too large: {} bytes (limit {max})", bytes.len()),
                    });
                }
                Ok(bytes)
            }
            SpecSource::Bytes { bytes, .. } => Ok(bytes.clone()),
        }
    }

    fn verify_hash(&self, location: &str, bytes: &[u8]) -> Result<()> {
        let Some(expected_hash) = &self.expected_hash else {
            return Ok(());
        };
        if self.hash_policy == HashPolicy::Ignore {
            return Ok(());
        }
        let actual_hash = spec_hash(bytes);
        if actual_hash == *expected_hash {
            return Ok(());
        }
        match self.hash_policy {
            HashPolicy::Fail => Err(SwaggerToolsError::Parse {
                location: location.to_string(),
                message: format!(
                    "Spec hash mismatch. Expected: {expected_hash}, Got: {actual_hash}"
                ),
            }),
            HashPolicy::Warn => {
                tracing::warn!(
                    "Spec hash mismatch for '{}'. Expected: {}, Got: {}",
                    location,
                    expected_hash,
                    actual_hash
                );
                Ok(())
            }
            HashPolicy::Ignore => Ok(()),
        }
    }
}

/// `sha256:<hex>` digest in the form accepted by `specHash`.
#[must_use]
pub fn spec_hash(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}
