//! Reference-free model of a Swagger 2.0 document.
//!
//! Values of these types are produced by [`crate::loader::SpecLoader`] after every `$ref` has
//! been resolved; nothing downstream of loading ever sees a raw reference string.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
}

impl HttpMethod {
    /// Methods in the order Swagger lists them on a path item.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
    ];

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }

    #[must_use]
    pub fn as_lower(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
        }
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared primitive type. Unknown or unset types are treated as strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    #[must_use]
    pub fn from_declared(ty: Option<&str>) -> Self {
        match ty.map(str::trim) {
            Some("integer") => ValueType::Integer,
            Some("number") => ValueType::Number,
            Some("boolean") => ValueType::Boolean,
            Some("array") => ValueType::Array,
            Some("object") => ValueType::Object,
            _ => ValueType::String,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an `array` query parameter is serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionFormat {
    #[default]
    Csv,
    Ssv,
    Tsv,
    Pipes,
    /// One `key=value` pair per element.
    Multi,
}

impl CollectionFormat {
    #[must_use]
    pub fn from_declared(format: Option<&str>) -> Self {
        match format.map(str::trim) {
            Some("ssv") => CollectionFormat::Ssv,
            Some("tsv") => CollectionFormat::Tsv,
            Some("pipes") => CollectionFormat::Pipes,
            Some("multi") => CollectionFormat::Multi,
            _ => CollectionFormat::Csv,
        }
    }

    /// Joining separator, or `None` for [`CollectionFormat::Multi`].
    #[must_use]
    pub fn separator(self) -> Option<&'static str> {
        match self {
            CollectionFormat::Csv => Some(","),
            CollectionFormat::Ssv => Some(" "),
            CollectionFormat::Tsv => Some("\t"),
            CollectionFormat::Pipes => Some("|"),
            CollectionFormat::Multi => None,
        }
    }
}

/// Type information shared by path and query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarParam {
    pub ty: ValueType,
    pub enum_values: Vec<String>,
    pub collection_format: CollectionFormat,
}

/// Schema of a `body` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySchema {
    /// Named entry in [`Specification::definitions`].
    Definition(String),
    /// Inline object schema, flattened like a named definition.
    Inline(Definition),
    /// Anything that cannot be flattened; the caller supplies raw JSON text.
    Opaque,
}

/// Parameter location, tagged with what that location needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLocation {
    Path(ScalarParam),
    Query(ScalarParam),
    Body(BodySchema),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
    pub location: ParamLocation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
}

impl Operation {
    #[must_use]
    pub fn body_parameter(&self) -> Option<(&Parameter, &BodySchema)> {
        self.parameters.iter().find_map(|p| match &p.location {
            ParamLocation::Body(schema) => Some((p, schema)),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Property {
    pub ty: ValueType,
    pub description: Option<String>,
    pub enum_values: Vec<String>,
}

/// Named object schema: properties plus the names that must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definition {
    pub properties: BTreeMap<String, Property>,
    pub required: Vec<String>,
}

impl Definition {
    /// Merge another object into this one (used for `allOf`). Later properties win.
    pub fn merge(&mut self, other: Definition) {
        self.properties.extend(other.properties);
        for name in other.required {
            if !self.required.contains(&name) {
                self.required.push(name);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specification {
    pub info: ApiInfo,
    pub host: Option<String>,
    pub base_path: Option<String>,
    pub schemes: Vec<String>,
    pub paths: BTreeMap<String, BTreeMap<HttpMethod, Operation>>,
    pub definitions: BTreeMap<String, Definition>,
}

impl Specification {
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.paths.values().map(BTreeMap::len).sum()
    }

    /// Base URL implied by `schemes`/`host`/`basePath`, if the document names a host.
    #[must_use]
    pub fn default_base_url(&self) -> Option<String> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let scheme = if self.schemes.is_empty() || self.schemes.iter().any(|s| s == "https") {
            "https"
        } else {
            self.schemes[0].as_str()
        };
        let base_path = self
            .base_path
            .as_deref()
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or_default();
        let base_path = if base_path.is_empty() || base_path.starts_with('/') {
            base_path.to_string()
        } else {
            format!("/{base_path}")
        };
        Some(format!("{scheme}://{host}{base_path}"))
    }
}
