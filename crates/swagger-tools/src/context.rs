//! Per-invocation ambient context supplied by the surrounding layer.

use crate::error::{Result, SwaggerToolsError};
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Backend credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Identity, credential, optional base URL override and cancellation for one call.
#[derive(Debug, Clone)]
pub struct AmbientContext {
    org_id: Option<String>,
    credential: Option<Credential>,
    base_url: Option<String>,
    cancellation: CancellationToken,
}

impl Default for AmbientContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AmbientContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            org_id: None,
            credential: None,
            base_url: None,
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(Credential::new(credential));
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn org_id(&self) -> Option<&str> {
        self.org_id.as_deref().filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref().filter(|c| !c.expose().trim().is_empty())
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref().filter(|s| !s.trim().is_empty())
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Context`] if no (non-blank) org id was supplied.
    pub fn require_org_id(&self) -> Result<&str> {
        self.org_id().ok_or_else(|| {
            SwaggerToolsError::Context("organization id is required for this operation".into())
        })
    }

    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Context`] if no (non-blank) credential was supplied.
    pub fn require_credential(&self) -> Result<&Credential> {
        self.credential()
            .ok_or_else(|| SwaggerToolsError::Context("API credential is required".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_never_contains_the_credential() {
        let ctx = AmbientContext::new()
            .with_org_id("org-1")
            .with_credential("super-secret-token");
        let rendered = format!("{ctx:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("Credential(***)"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let ctx = AmbientContext::new().with_org_id("  ").with_credential("");
        assert!(matches!(ctx.require_org_id(), Err(SwaggerToolsError::Context(_))));
        assert!(matches!(ctx.require_credential(), Err(SwaggerToolsError::Context(_))));
    }
}
