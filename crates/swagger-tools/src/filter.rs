//! Operation selection: tag allow-list plus optional `"METHOD /path"` globs.

use crate::config::ToolsConfig;
use crate::spec::{HttpMethod, Operation, Specification};
use std::collections::BTreeSet;

/// One retained operation, borrowed from its [`Specification`].
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub operation: &'a Operation,
}

#[derive(Debug, Clone)]
pub struct OperationFilter {
    allowed_tags: BTreeSet<String>,
    marker_tag: String,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl OperationFilter {
    pub fn new<I, S>(allowed_tags: I, marker_tag: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_tags: allowed_tags.into_iter().map(Into::into).collect(),
            marker_tag: marker_tag.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.allowed_tags.iter().cloned(), config.filter_tag.clone())
            .with_patterns(
                config.auto_discover.include.clone(),
                config.auto_discover.exclude.clone(),
            )
    }

    #[must_use]
    pub fn with_patterns(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        self.include = include;
        self.exclude = exclude;
        self
    }

    /// The reserved tag that only marks operations for exposure.
    #[must_use]
    pub fn marker_tag(&self) -> &str {
        &self.marker_tag
    }

    #[must_use]
    pub fn retains(&self, method: HttpMethod, path: &str, operation: &Operation) -> bool {
        let tagged = self.allowed_tags.is_empty()
            || operation
                .tags
                .iter()
                .any(|t| self.allowed_tags.contains(t.as_str()));
        tagged && self.matches_patterns(method, path)
    }

    /// Retained operations in deterministic (path, method) order.
    #[must_use]
    pub fn apply<'a>(&self, spec: &'a Specification) -> Vec<OperationRef<'a>> {
        spec.paths
            .iter()
            .flat_map(|(path, ops)| {
                ops.iter().map(move |(method, operation)| OperationRef {
                    method: *method,
                    path: path.as_str(),
                    operation,
                })
            })
            .filter(|op| self.retains(op.method, op.path, op.operation))
            .collect()
    }

    fn matches_patterns(&self, method: HttpMethod, path: &str) -> bool {
        let operation_str = format!("{method} {path}");

        // Exclude patterns win.
        if self.exclude.iter().any(|p| glob_match(p, &operation_str)) {
            return false;
        }
        if !self.include.is_empty() {
            return self.include.iter().any(|p| glob_match(p, &operation_str));
        }
        true
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    //   * => any sequence
    //   ? => any single byte
    let pattern_bytes = pattern.as_bytes();
    let text_bytes = text.as_bytes();

    let mut pattern_index = 0usize;
    let mut text_index = 0usize;
    let mut star_index: Option<usize> = None;
    let mut star_text_index = 0usize;

    while text_index < text_bytes.len() {
        match pattern_bytes.get(pattern_index) {
            Some(b'*') => {
                star_index = Some(pattern_index);
                pattern_index += 1;
                star_text_index = text_index;
            }
            Some(b'?') => {
                pattern_index += 1;
                text_index += 1;
            }
            Some(&b) if b == text_bytes[text_index] => {
                pattern_index += 1;
                text_index += 1;
            }
            _ => {
                let Some(si) = star_index else {
                    return false;
                };
                pattern_index = si + 1;
                star_text_index += 1;
                text_index = star_text_index;
            }
        }
    }

    while matches!(pattern_bytes.get(pattern_index), Some(b'*')) {
        pattern_index += 1;
    }
    pattern_index == pattern_bytes.len()
}
