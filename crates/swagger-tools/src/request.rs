//! Request construction: arguments + ambient context -> one concrete HTTP request.
//!
//! Building is pure; nothing here performs I/O. The credential is attached separately by a
//! [`RequestSigner`] so the builder never handles secrets.

use crate::context::AmbientContext;
use crate::error::{Result, SwaggerToolsError};
use crate::spec::{CollectionFormat, HttpMethod, ValueType};
use crate::synthesis::{BodyBinding, OperationBinding, QueryBinding};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::Url;

/// A fully assembled request, ready for an [`crate::transport::HttpTransport`].
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Build the request for `binding` from caller arguments and ambient context.
///
/// The base URL is the context override when present, else `default_base_url`.
///
/// # Errors
///
/// - [`SwaggerToolsError::Context`] when no base URL is known, or the path needs an org id
///   the context does not carry
/// - [`SwaggerToolsError::Request`] when the URL is invalid or a raw body is not JSON text
pub fn build_request(
    binding: &OperationBinding,
    arguments: &Map<String, Value>,
    ctx: &AmbientContext,
    default_base_url: Option<&str>,
) -> Result<PreparedRequest> {
    let base_url = ctx
        .base_url()
        .or(default_base_url)
        .ok_or_else(|| {
            SwaggerToolsError::Context(
                "no base URL configured and none supplied with the call".into(),
            )
        })?;

    let org_id = if binding.needs_org_id() {
        Some(ctx.require_org_id()?)
    } else {
        None
    };

    let path = substitute_path(&binding.path, arguments, &binding.org_id_param, org_id);
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    };
    let mut url = Url::parse(&format!("{}{path}", base_url.trim_end_matches('/')))
        .map_err(|e| SwaggerToolsError::Request(format!("Invalid request URL: {e}")))?;

    let pairs = query_pairs(&binding.query, arguments);
    if !pairs.is_empty() {
        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    let body = match &binding.body {
        Some(plan) => build_body(plan, arguments)?,
        None => None,
    };

    let mut headers = HeaderMap::new();
    if body.is_some() {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(PreparedRequest {
        method: binding.method,
        url,
        headers,
        body,
    })
}

/// Attaches credentials to a prepared request.
pub trait RequestSigner: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Context`] when the context lacks a usable credential.
    fn sign(&self, request: &mut PreparedRequest, ctx: &AmbientContext) -> Result<()>;
}

/// Sends the ambient credential verbatim in a fixed header.
#[derive(Debug, Clone)]
pub struct HeaderSigner {
    header: HeaderName,
}

impl HeaderSigner {
    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Config`] if `header` is not a valid header name.
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes()).map_err(|_| {
            SwaggerToolsError::Config(format!("'{header}' is not a valid HTTP header name"))
        })?;
        Ok(Self { header })
    }
}

impl RequestSigner for HeaderSigner {
    fn sign(&self, request: &mut PreparedRequest, ctx: &AmbientContext) -> Result<()> {
        let credential = ctx.require_credential()?;
        let mut value = HeaderValue::from_str(credential.expose()).map_err(|_| {
            SwaggerToolsError::Context(
                "credential contains characters not allowed in an HTTP header".into(),
            )
        })?;
        value.set_sensitive(true);
        request.headers.insert(self.header.clone(), value);
        Ok(())
    }
}

fn substitute_path(
    template: &str,
    arguments: &Map<String, Value>,
    org_id_param: &str,
    org_id: Option<&str>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        // The org placeholder never comes from arguments.
        let value = if name.eq_ignore_ascii_case(org_id_param) {
            org_id.map(str::to_string)
        } else {
            arguments
                .get(name)
                .filter(|v| !v.is_null())
                .map(value_to_string)
        };

        match value {
            Some(v) => out.push_str(&encode_component(&v)),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn query_pairs(bindings: &[QueryBinding], arguments: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for binding in bindings {
        let Some(value) = arguments.get(&binding.name) else {
            continue;
        };

        if binding.ty == ValueType::Array {
            let items: Vec<String> = match value {
                Value::Null => continue,
                Value::Array(items) => items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(value_to_string)
                    .collect(),
                scalar => vec![value_to_string(scalar)],
            };
            if items.is_empty() {
                continue;
            }
            match binding.collection_format.separator() {
                Some(sep) => pairs.push((binding.name.clone(), items.join(sep))),
                None => {
                    debug_assert_eq!(binding.collection_format, CollectionFormat::Multi);
                    pairs.extend(items.into_iter().map(|v| (binding.name.clone(), v)));
                }
            }
            continue;
        }

        if let Some(text) = scalar_query_text(&binding.name, binding.ty, value) {
            pairs.push((binding.name.clone(), text));
        }
    }
    pairs
}

/// Text for one scalar query value, or `None` when the value is absent or the type's zero
/// value. Booleans are always sent, `false` included. A value of the wrong JSON type is
/// treated as absent.
fn scalar_query_text(name: &str, ty: ValueType, value: &Value) -> Option<String> {
    let mismatch = || {
        tracing::debug!(
            parameter = name,
            expected = %ty,
            got = json_kind(value),
            "Omitting query argument of the wrong type"
        );
        None
    };

    match (ty, value) {
        (_, Value::Null) => None,
        (ValueType::Boolean, Value::Bool(b)) => Some(b.to_string()),
        (ValueType::Boolean, Value::String(s)) if s == "true" || s == "false" => Some(s.clone()),
        (ValueType::Integer | ValueType::Number, Value::Number(n)) => {
            (n.as_f64() != Some(0.0)).then(|| n.to_string())
        }
        (ValueType::Integer | ValueType::Number, Value::String(s)) => {
            let s = s.trim();
            match s.parse::<f64>() {
                _ if s.is_empty() => None,
                Ok(n) if n == 0.0 => None,
                Ok(_) => Some(s.to_string()),
                Err(_) => mismatch(),
            }
        }
        (ValueType::String | ValueType::Object, Value::String(s)) => {
            (!s.is_empty()).then(|| s.clone())
        }
        (ValueType::String, Value::Number(_) | Value::Bool(_)) => Some(value_to_string(value)),
        _ => mismatch(),
    }
}

fn build_body(plan: &BodyBinding, arguments: &Map<String, Value>) -> Result<Option<String>> {
    match plan {
        BodyBinding::Raw { field } => match arguments.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => {
                serde_json::from_str::<Value>(text).map_err(|e| {
                    SwaggerToolsError::Request(format!(
                        "argument '{field}' must be valid JSON text: {e}"
                    ))
                })?;
                Ok(Some(text.clone()))
            }
            // Already-structured JSON is serialized as-is.
            Some(other) => Ok(Some(other.to_string())),
        },
        BodyBinding::Fields(names) => {
            let mut object = Map::new();
            for name in names {
                if let Some(v) = arguments.get(name)
                    && !v.is_null()
                {
                    object.insert(name.clone(), v.clone());
                }
            }
            Ok(Some(Value::Object(object).to_string()))
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn binding(path: &str) -> OperationBinding {
        OperationBinding {
            method: HttpMethod::Get,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            org_id_param: "org_id".to_string(),
        }
    }

    fn query(name: &str, ty: ValueType) -> QueryBinding {
        QueryBinding {
            name: name.to_string(),
            ty,
            collection_format: CollectionFormat::Csv,
        }
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn ctx() -> AmbientContext {
        AmbientContext::new()
            .with_org_id("o1")
            .with_credential("t")
            .with_base_url("https://api.example.com")
    }

    #[test]
    fn org_placeholder_comes_from_context_not_arguments() {
        let req = build_request(
            &binding("/v1/orgs/{org_id}/confs/{conf_id}"),
            &args(json!({ "conf_id": "c9", "org_id": "evil" })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.as_str(), "https://api.example.com/v1/orgs/o1/confs/c9");
        assert!(req.body.is_none());
        assert!(req.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn missing_path_argument_leaves_placeholder() {
        let req = build_request(
            &binding("/v1/confs/{conf_id}"),
            &Map::new(),
            &ctx(),
            None,
        )
        .unwrap();
        assert!(req.url.path().ends_with("/v1/confs/%7Bconf_id%7D"));
    }

    #[test]
    fn path_values_are_encoded_as_one_segment() {
        let req = build_request(
            &binding("/v1/confs/{conf_id}"),
            &args(json!({ "conf_id": "a/b c" })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.path(), "/v1/confs/a%2Fb%20c");
    }

    #[test]
    fn missing_org_id_is_context_error_only_when_path_needs_it() {
        let no_org = AmbientContext::new().with_base_url("https://api.example.com");
        let err = build_request(&binding("/v1/orgs/{org_id}"), &Map::new(), &no_org, None)
            .unwrap_err();
        assert!(matches!(err, SwaggerToolsError::Context(_)));

        build_request(&binding("/v1/health"), &Map::new(), &no_org, None).unwrap();
    }

    #[test]
    fn default_base_url_used_without_override() {
        let ctx = AmbientContext::new();
        let req = build_request(&binding("/ping"), &Map::new(), &ctx, Some("http://localhost:1/"))
            .unwrap();
        assert_eq!(req.url.as_str(), "http://localhost:1/ping");

        let err = build_request(&binding("/ping"), &Map::new(), &ctx, None).unwrap_err();
        assert!(matches!(err, SwaggerToolsError::Context(_)));
    }

    #[test]
    fn zero_values_are_omitted_but_false_is_sent() {
        let mut b = binding("/items");
        b.query = vec![
            query("limit", ValueType::Integer),
            query("offset", ValueType::Integer),
            query("search", ValueType::String),
            query("name", ValueType::String),
            query("active", ValueType::Boolean),
            query("ratio", ValueType::Number),
        ];
        let req = build_request(
            &b,
            &args(json!({
                "limit": 0,
                "offset": 20,
                "search": "",
                "name": "a&b",
                "active": false,
                "ratio": 0.5
            })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.query(), Some("offset=20&name=a%26b&active=false&ratio=0.5"));
    }

    #[test]
    fn no_query_string_when_nothing_is_sent() {
        let mut b = binding("/items");
        b.query = vec![query("limit", ValueType::Integer)];
        let req = build_request(&b, &args(json!({ "limit": 0 })), &ctx(), None).unwrap();
        assert_eq!(req.url.query(), None);
    }

    #[test]
    fn mistyped_query_arguments_are_omitted() {
        let mut b = binding("/items");
        b.query = vec![
            query("limit", ValueType::Integer),
            query("offset", ValueType::Integer),
            query("active", ValueType::Boolean),
            query("name", ValueType::String),
        ];
        let req = build_request(
            &b,
            &args(json!({
                "limit": true,
                "offset": "ten",
                "active": "yes",
                "name": { "nested": 1 }
            })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.query(), None);

        let req = build_request(
            &b,
            &args(json!({ "limit": true, "offset": 5 })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.query(), Some("offset=5"));
    }

    #[test]
    fn array_query_parameters_follow_collection_format() {
        let mut b = binding("/items");
        b.query = vec![
            QueryBinding {
                name: "ids".into(),
                ty: ValueType::Array,
                collection_format: CollectionFormat::Csv,
            },
            QueryBinding {
                name: "tag".into(),
                ty: ValueType::Array,
                collection_format: CollectionFormat::Multi,
            },
            QueryBinding {
                name: "empty".into(),
                ty: ValueType::Array,
                collection_format: CollectionFormat::Pipes,
            },
        ];
        let req = build_request(
            &b,
            &args(json!({ "ids": [1, 2], "tag": ["x", "y"], "empty": [] })),
            &ctx(),
            None,
        )
        .unwrap();
        assert_eq!(req.url.query(), Some("ids=1%2C2&tag=x&tag=y"));
    }

    #[test]
    fn raw_body_must_be_valid_json() {
        let mut b = binding("/confs");
        b.method = HttpMethod::Post;
        b.body = Some(BodyBinding::Raw { field: "body".into() });

        let req = build_request(&b, &args(json!({ "body": "{\"a\":1}" })), &ctx(), None).unwrap();
        assert_eq!(req.body.as_deref(), Some("{\"a\":1}"));
        assert_eq!(req.headers[CONTENT_TYPE], "application/json");

        let err = build_request(&b, &args(json!({ "body": "{not json" })), &ctx(), None)
            .unwrap_err();
        assert!(matches!(err, SwaggerToolsError::Request(_)));

        let req = build_request(&b, &Map::new(), &ctx(), None).unwrap();
        assert!(req.body.is_none());
    }

    #[test]
    fn flattened_body_contains_only_supplied_properties() {
        let mut b = binding("/confs");
        b.method = HttpMethod::Post;
        b.body = Some(BodyBinding::Fields(vec![
            "content".into(),
            "description".into(),
            "tags".into(),
        ]));
        let req = build_request(
            &b,
            &args(json!({ "content": "x", "tags": ["a"], "unrelated": 1 })),
            &ctx(),
            None,
        )
        .unwrap();
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "content": "x", "tags": ["a"] }));
    }

    #[test]
    fn header_signer_attaches_sensitive_credential() {
        let mut req = build_request(&binding("/ping"), &Map::new(), &ctx(), None).unwrap();
        HeaderSigner::new("X-ED-API-Token")
            .unwrap()
            .sign(&mut req, &ctx())
            .unwrap();
        let value = &req.headers["x-ed-api-token"];
        assert_eq!(value, "t");
        assert!(value.is_sensitive());
        assert!(!format!("{req:?}").contains("\"t\""));

        let mut req = build_request(&binding("/ping"), &Map::new(), &ctx(), None).unwrap();
        let err = HeaderSigner::new("X-ED-API-Token")
            .unwrap()
            .sign(&mut req, &AmbientContext::new())
            .unwrap_err();
        assert!(matches!(err, SwaggerToolsError::Context(_)));
    }
}
