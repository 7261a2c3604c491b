//! Swagger 2.0 document parsing and `$ref` expansion.
//!
//! Supported references are local only:
//! - `#/definitions/<name>` in body schemas, properties, `allOf` parts and definition aliases
//! - `#/parameters/<name>` in operation and path-item parameter lists
//!
//! Every chain of references is walked with a visited set and a depth bound, so cyclic schemas
//! fail with [`SwaggerToolsError::Expansion`] instead of recursing forever.

use crate::error::{Result, SwaggerToolsError};
use crate::spec::{
    ApiInfo, BodySchema, CollectionFormat, Definition, HttpMethod, Operation, ParamLocation,
    Parameter, Property, ScalarParam, Specification, ValueType,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const PARAMETERS_PREFIX: &str = "#/parameters/";

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    swagger: Option<String>,
    #[serde(default)]
    openapi: Option<String>,
    #[serde(default)]
    info: RawInfo,
    #[serde(default)]
    host: Option<String>,
    #[serde(default, rename = "basePath")]
    base_path: Option<String>,
    #[serde(default)]
    schemes: Vec<String>,
    #[serde(default)]
    paths: Option<BTreeMap<String, RawPathItem>>,
    #[serde(default)]
    definitions: BTreeMap<String, RawSchema>,
    #[serde(default)]
    parameters: BTreeMap<String, RawParameter>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPathItem {
    #[serde(default)]
    parameters: Vec<RawParameter>,
    #[serde(default)]
    get: Option<RawOperation>,
    #[serde(default)]
    put: Option<RawOperation>,
    #[serde(default)]
    post: Option<RawOperation>,
    #[serde(default)]
    delete: Option<RawOperation>,
    #[serde(default)]
    options: Option<RawOperation>,
    #[serde(default)]
    head: Option<RawOperation>,
    #[serde(default)]
    patch: Option<RawOperation>,
}

impl RawPathItem {
    fn operations(&self) -> impl Iterator<Item = (HttpMethod, &RawOperation)> {
        HttpMethod::ALL.into_iter().filter_map(|method| {
            let op = match method {
                HttpMethod::Get => self.get.as_ref(),
                HttpMethod::Put => self.put.as_ref(),
                HttpMethod::Post => self.post.as_ref(),
                HttpMethod::Delete => self.delete.as_ref(),
                HttpMethod::Options => self.options.as_ref(),
                HttpMethod::Head => self.head.as_ref(),
                HttpMethod::Patch => self.patch.as_ref(),
            };
            op.map(|op| (method, op))
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawOperation {
    #[serde(default, rename = "operationId")]
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    parameters: Vec<RawParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawParameter {
    #[serde(default, rename = "$ref")]
    reference: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "in")]
    location: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required: bool,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default, rename = "enum")]
    enum_values: Vec<Value>,
    #[serde(default, rename = "collectionFormat")]
    collection_format: Option<String>,
    #[serde(default)]
    schema: Option<RawSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSchema {
    #[serde(default, rename = "$ref")]
    reference: Option<String>,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, RawSchema>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default, rename = "enum")]
    enum_values: Vec<Value>,
    #[serde(default, rename = "allOf")]
    all_of: Vec<RawSchema>,
}

impl RawSchema {
    fn is_object(&self) -> bool {
        match self.ty.as_deref() {
            Some("object") => true,
            None => !self.properties.is_empty() || !self.all_of.is_empty(),
            Some(_) => false,
        }
    }

    fn value_type(&self) -> ValueType {
        if self.is_object() {
            ValueType::Object
        } else {
            ValueType::from_declared(self.ty.as_deref())
        }
    }
}

/// Parse a Swagger document (JSON or YAML) and expand it into a [`Specification`].
///
/// # Errors
///
/// Returns [`SwaggerToolsError::Parse`] for malformed documents and
/// [`SwaggerToolsError::Expansion`] for references that cannot be resolved.
pub fn expand_document(text: &str, location: &str, max_ref_depth: usize) -> Result<Specification> {
    let parse_error = |message: String| SwaggerToolsError::Parse {
        location: location.to_string(),
        message,
    };

    let raw: RawDocument = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;

    if let Some(version) = &raw.openapi {
        return Err(parse_error(format!(
            "OpenAPI {version} documents are not supported (expected Swagger 2.0)"
        )));
    }
    if let Some(version) = &raw.swagger
        && !version.trim().starts_with('2')
    {
        return Err(parse_error(format!("unsupported swagger version '{version}'")));
    }
    let Some(raw_paths) = &raw.paths else {
        return Err(parse_error("document has no 'paths' object".into()));
    };

    let expander = Expander {
        definitions: &raw.definitions,
        parameters: &raw.parameters,
        max_depth: max_ref_depth,
    };

    let mut definitions = BTreeMap::new();
    for name in raw.definitions.keys() {
        if let Some(def) = expander.expand_named(name)? {
            definitions.insert(name.clone(), def);
        }
    }

    let mut paths = BTreeMap::new();
    for (path, item) in raw_paths {
        let mut operations = BTreeMap::new();
        for (method, raw_op) in item.operations() {
            let op = expander
                .expand_operation(method, path, &item.parameters, raw_op)
                .map_err(|e| match e {
                    SwaggerToolsError::Parse { message, .. } => parse_error(message),
                    other => other,
                })?;
            operations.insert(method, op);
        }
        if !operations.is_empty() {
            paths.insert(path.clone(), operations);
        }
    }

    Ok(Specification {
        info: ApiInfo {
            title: raw.info.title,
            version: raw.info.version,
        },
        host: raw.host,
        base_path: raw.base_path,
        schemes: raw.schemes,
        paths,
        definitions,
    })
}

struct Expander<'a> {
    definitions: &'a BTreeMap<String, RawSchema>,
    parameters: &'a BTreeMap<String, RawParameter>,
    max_depth: usize,
}

impl<'a> Expander<'a> {
    /// Follow a (possibly aliased) definition reference to the schema that carries content.
    fn resolve_definition(&self, reference: &str) -> Result<(String, &'a RawSchema)> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = reference.to_string();
        loop {
            let name = ref_name(&current, DEFINITIONS_PREFIX)?;
            if !seen.insert(name.to_string()) {
                return Err(SwaggerToolsError::Expansion(format!(
                    "Cyclic $ref detected at '{current}' (starting from '{reference}')"
                )));
            }
            if seen.len() > self.max_depth {
                return Err(SwaggerToolsError::Expansion(format!(
                    "$ref chain starting at '{reference}' exceeds maximum depth {}",
                    self.max_depth
                )));
            }
            let schema = self.definitions.get(name).ok_or_else(|| {
                SwaggerToolsError::Expansion(format!("Unresolved $ref '{current}'"))
            })?;
            match &schema.reference {
                Some(next) => current.clone_from(next),
                None => return Ok((name.to_string(), schema)),
            }
        }
    }

    /// Expand a named definition. Non-object definitions (e.g. string enums) are only used as
    /// property types and yield `None`.
    fn expand_named(&self, name: &str) -> Result<Option<Definition>> {
        let (_, schema) = self.resolve_definition(&format!("{DEFINITIONS_PREFIX}{name}"))?;
        if schema.is_object() {
            self.expand_object(schema, 0).map(Some)
        } else {
            Ok(None)
        }
    }

    fn expand_object(&self, schema: &RawSchema, depth: usize) -> Result<Definition> {
        if depth > self.max_depth {
            return Err(SwaggerToolsError::Expansion(format!(
                "schema composition exceeds maximum depth {} (cyclic allOf?)",
                self.max_depth
            )));
        }

        let mut out = Definition::default();
        for part in &schema.all_of {
            let expanded = match &part.reference {
                Some(reference) => {
                    let (_, target) = self.resolve_definition(reference)?;
                    self.expand_object(target, depth + 1)?
                }
                None => self.expand_object(part, depth + 1)?,
            };
            out.merge(expanded);
        }

        for (name, prop) in &schema.properties {
            out.properties.insert(name.clone(), self.expand_property(prop)?);
        }
        for name in &schema.required {
            if !out.required.contains(name) {
                out.required.push(name.clone());
            }
        }
        Ok(out)
    }

    fn expand_property(&self, prop: &RawSchema) -> Result<Property> {
        let Some(reference) = &prop.reference else {
            return Ok(Property {
                ty: prop.value_type(),
                description: prop.description.clone(),
                enum_values: enum_strings(&prop.enum_values),
            });
        };

        let (_, target) = self.resolve_definition(reference)?;
        Ok(Property {
            ty: target.value_type(),
            description: prop
                .description
                .clone()
                .or_else(|| target.description.clone()),
            enum_values: enum_strings(&target.enum_values),
        })
    }

    fn resolve_parameter(&self, raw: &'a RawParameter) -> Result<&'a RawParameter> {
        let Some(reference) = &raw.reference else {
            return Ok(raw);
        };
        let name = ref_name(reference, PARAMETERS_PREFIX)?;
        let shared = self.parameters.get(name).ok_or_else(|| {
            SwaggerToolsError::Expansion(format!("Unresolved $ref '{reference}'"))
        })?;
        if shared.reference.is_some() {
            return Err(SwaggerToolsError::Expansion(format!(
                "shared parameter '{name}' must not itself be a $ref"
            )));
        }
        Ok(shared)
    }

    fn expand_operation(
        &self,
        method: HttpMethod,
        path: &str,
        path_level: &'a [RawParameter],
        raw: &'a RawOperation,
    ) -> Result<Operation> {
        // Operation-level parameters override path-level ones with the same (in, name).
        let mut merged: Vec<&'a RawParameter> = Vec::new();
        for p in path_level.iter().chain(raw.parameters.iter()) {
            let resolved = self.resolve_parameter(p)?;
            if let Some(slot) = merged
                .iter_mut()
                .find(|m| m.name == resolved.name && m.location == resolved.location)
            {
                *slot = resolved;
            } else {
                merged.push(resolved);
            }
        }

        let mut parameters: Vec<Parameter> = Vec::new();
        for p in merged {
            let Some(param) = self.expand_parameter(method, path, p)? else {
                continue;
            };
            // Body names never reach the wire, so only path/query names must be unique.
            let is_body = |p: &Parameter| matches!(p.location, ParamLocation::Body(_));
            if !is_body(&param)
                && parameters
                    .iter()
                    .any(|existing| !is_body(existing) && existing.name == param.name)
            {
                return Err(parse_message(format!(
                    "duplicate parameter '{}' in {method} {path}",
                    param.name
                )));
            }
            if matches!(param.location, ParamLocation::Body(_))
                && parameters
                    .iter()
                    .any(|existing| matches!(existing.location, ParamLocation::Body(_)))
            {
                return Err(parse_message(format!(
                    "more than one body parameter in {method} {path}"
                )));
            }
            parameters.push(param);
        }

        Ok(Operation {
            operation_id: raw.operation_id.clone(),
            summary: raw.summary.clone(),
            description: raw.description.clone(),
            tags: raw.tags.clone(),
            parameters,
        })
    }

    fn expand_parameter(
        &self,
        method: HttpMethod,
        path: &str,
        raw: &RawParameter,
    ) -> Result<Option<Parameter>> {
        if raw.name.trim().is_empty() {
            return Err(parse_message(format!(
                "parameter without a name in {method} {path}"
            )));
        }

        let scalar = || ScalarParam {
            ty: ValueType::from_declared(raw.ty.as_deref()),
            enum_values: enum_strings(&raw.enum_values),
            collection_format: CollectionFormat::from_declared(raw.collection_format.as_deref()),
        };

        let location = match raw.location.as_str() {
            "path" => ParamLocation::Path(scalar()),
            "query" => ParamLocation::Query(scalar()),
            "body" => ParamLocation::Body(self.expand_body_schema(raw.schema.as_ref())?),
            "header" | "formData" => {
                tracing::warn!(
                    parameter = %raw.name,
                    location = %raw.location,
                    operation = %format!("{method} {path}"),
                    "Skipping unsupported parameter location"
                );
                return Ok(None);
            }
            other => {
                return Err(parse_message(format!(
                    "parameter '{}' in {method} {path} has unknown location '{other}'",
                    raw.name
                )));
            }
        };

        Ok(Some(Parameter {
            name: raw.name.clone(),
            description: raw.description.clone(),
            required: raw.required,
            location,
        }))
    }

    fn expand_body_schema(&self, schema: Option<&RawSchema>) -> Result<BodySchema> {
        let Some(schema) = schema else {
            return Ok(BodySchema::Opaque);
        };
        // Only objects with declared properties can be flattened; free-form objects
        // (`additionalProperties`, no `properties`) are passed through as raw JSON.
        if let Some(reference) = &schema.reference {
            let (name, target) = self.resolve_definition(reference)?;
            if target.is_object() && !self.expand_object(target, 0)?.properties.is_empty() {
                return Ok(BodySchema::Definition(name));
            }
            return Ok(BodySchema::Opaque);
        }
        if schema.is_object() {
            let def = self.expand_object(schema, 0)?;
            if !def.properties.is_empty() {
                return Ok(BodySchema::Inline(def));
            }
        }
        Ok(BodySchema::Opaque)
    }
}

fn ref_name<'r>(reference: &'r str, prefix: &str) -> Result<&'r str> {
    reference
        .strip_prefix(prefix)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            SwaggerToolsError::Expansion(format!(
                "Unsupported $ref '{reference}' (expected '{prefix}<name>')"
            ))
        })
}

fn enum_strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

// Location is filled in by `expand_document`, which knows the source.
fn parse_message(message: String) -> SwaggerToolsError {
    SwaggerToolsError::Parse {
        location: String::new(),
        message,
    }
}
