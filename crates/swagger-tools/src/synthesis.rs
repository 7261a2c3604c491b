//! Tool synthesis: one [`ToolDefinition`] plus one [`OperationBinding`] per retained operation.

use crate::config::ToolsConfig;
use crate::error::{Result, SwaggerToolsError};
use crate::filter::{OperationFilter, OperationRef};
use crate::naming::{reserve_unique_tool_name, resolve_tool_name};
use crate::semantics::annotations_for_method;
use crate::spec::{
    BodySchema, CollectionFormat, Definition, HttpMethod, ParamLocation, Parameter, ScalarParam,
    Specification, ValueType,
};
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub ty: ValueType,
    pub required: bool,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
}

/// Flat input schema: field name -> field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    fields: BTreeMap<String, SchemaField>,
}

impl InputSchema {
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, SchemaField> {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.get(name)
    }

    /// Required field names, sorted.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, f)| f.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn insert(&mut self, name: &str, field: SchemaField, context: &str) -> Result<()> {
        if self.fields.contains_key(name) {
            return Err(SwaggerToolsError::Naming(format!(
                "input field '{name}' appears more than once in {context}"
            )));
        }
        self.fields.insert(name.to_string(), field);
        Ok(())
    }

    /// Render as a JSON Schema object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for (name, field) in &self.fields {
            let mut prop = json!({ "type": field.ty });
            if field.ty == ValueType::Array {
                prop["items"] = json!({});
            }
            if let Some(desc) = &field.description {
                prop["description"] = json!(desc);
            }
            if !field.enum_values.is_empty() {
                prop["enum"] = json!(field.enum_values);
            }
            properties.insert(name.clone(), prop);
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        let required = self.required();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBinding {
    pub name: String,
    pub ty: ValueType,
    pub collection_format: CollectionFormat,
}

/// How a request body is assembled from arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyBinding {
    /// JSON object built from these top-level argument names.
    Fields(Vec<String>),
    /// Raw JSON text taken verbatim from one string argument.
    Raw { field: String },
}

/// Everything needed at call time to turn arguments into a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<QueryBinding>,
    pub body: Option<BodyBinding>,
    /// Path placeholder filled from the ambient org id (matched case-insensitively).
    pub org_id_param: String,
}

impl OperationBinding {
    /// Whether the path contains the org placeholder.
    #[must_use]
    pub fn needs_org_id(&self) -> bool {
        path_placeholders(&self.path).any(|name| name.eq_ignore_ascii_case(&self.org_id_param))
    }
}

/// Iterate `{name}` placeholders in a path template.
pub(crate) fn path_placeholders(path: &str) -> impl Iterator<Item = &str> {
    path.split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
}

#[derive(Debug, Clone)]
pub struct SynthesizedTool {
    pub definition: ToolDefinition,
    pub binding: Arc<OperationBinding>,
}

impl SynthesizedTool {
    #[must_use]
    pub fn to_mcp_tool(&self) -> Tool {
        let schema_obj = self
            .definition
            .input_schema
            .to_json()
            .as_object()
            .cloned()
            .unwrap_or_else(JsonObject::new);
        let mut tool = Tool::new(
            self.definition.name.clone(),
            self.definition.description.clone(),
            Arc::new(schema_obj),
        );
        tool.annotations = Some(annotations_for_method(self.binding.method));
        tool
    }
}

#[derive(Debug, Clone)]
pub struct ToolSynthesizer {
    filter: OperationFilter,
    org_id_param: String,
}

impl ToolSynthesizer {
    pub fn new(filter: OperationFilter, org_id_param: impl Into<String>) -> Self {
        Self {
            filter,
            org_id_param: org_id_param.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(OperationFilter::from_config(config), config.org_id_param.clone())
    }

    /// Synthesize tools for every retained operation, in deterministic order.
    ///
    /// # Errors
    ///
    /// Returns [`SwaggerToolsError::Naming`] if any operation cannot be named; no partial tool
    /// set is returned.
    pub fn synthesize(&self, spec: &Specification) -> Result<Vec<SynthesizedTool>> {
        let mut tool_names: HashSet<String> = HashSet::new();
        let mut tools = Vec::new();

        for op in self.filter.apply(spec) {
            let base = resolve_tool_name(op.method, op.path, op.operation, self.filter.marker_tag())?;
            let name = reserve_unique_tool_name(&mut tool_names, &base);
            if name != base {
                tracing::warn!(
                    "Tool name '{}' already taken; {} {} exposed as '{}'",
                    base,
                    op.method,
                    op.path,
                    name
                );
            }
            tools.push(self.synthesize_operation(spec, &op, name)?);
        }

        tracing::debug!(tools = tools.len(), "Synthesized tools");
        Ok(tools)
    }

    fn synthesize_operation(
        &self,
        spec: &Specification,
        op: &OperationRef<'_>,
        name: String,
    ) -> Result<SynthesizedTool> {
        let context = format!("{} {}", op.method, op.path);
        let mut schema = InputSchema::default();
        let mut query = Vec::new();
        let mut body_param = None;

        for param in &op.operation.parameters {
            match &param.location {
                ParamLocation::Path(scalar) => {
                    if param.name.eq_ignore_ascii_case(&self.org_id_param) {
                        continue;
                    }
                    schema.insert(&param.name, scalar_field(param, scalar), &context)?;
                }
                ParamLocation::Query(scalar) => {
                    schema.insert(&param.name, scalar_field(param, scalar), &context)?;
                    query.push(QueryBinding {
                        name: param.name.clone(),
                        ty: scalar.ty,
                        collection_format: scalar.collection_format,
                    });
                }
                ParamLocation::Body(body_schema) => body_param = Some((param, body_schema)),
            }
        }
        // After path/query so that shared names resolve the same way regardless of order.
        let body = match body_param {
            Some((param, body_schema)) => {
                Some(flatten_body(spec, param, body_schema, &mut schema, &context)?)
            }
            None => None,
        };

        let description = op
            .operation
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or_else(|| op.operation.summary.clone().filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| context.clone());

        Ok(SynthesizedTool {
            definition: ToolDefinition {
                name,
                description,
                input_schema: schema,
            },
            binding: Arc::new(OperationBinding {
                method: op.method,
                path: op.path.to_string(),
                query,
                body,
                org_id_param: self.org_id_param.clone(),
            }),
        })
    }
}

fn scalar_field(param: &Parameter, scalar: &ScalarParam) -> SchemaField {
    SchemaField {
        ty: scalar.ty,
        required: param.required,
        enum_values: scalar.enum_values.clone(),
        description: param.description.clone(),
    }
}

fn flatten_body(
    spec: &Specification,
    param: &Parameter,
    body: &BodySchema,
    schema: &mut InputSchema,
    context: &str,
) -> Result<BodyBinding> {
    let definition: Option<&Definition> = match body {
        BodySchema::Definition(name) => {
            let found = spec.definitions.get(name);
            if found.is_none() {
                tracing::warn!(
                    "Definition '{}' for body of {} is missing; accepting raw JSON instead",
                    name,
                    context
                );
            }
            found
        }
        BodySchema::Inline(def) => Some(def),
        BodySchema::Opaque => None,
    };

    let Some(definition) = definition.filter(|d| !d.properties.is_empty()) else {
        let description = match &param.description {
            Some(d) => format!("{d} (JSON text)"),
            None => "Request body as JSON text".to_string(),
        };
        let field = if schema.field(&param.name).is_some() {
            let renamed = format!("{}_body", param.name);
            tracing::warn!(
                "Body parameter '{}' of {} shares its name with a path/query parameter; exposed as '{}'",
                param.name,
                context,
                renamed
            );
            renamed
        } else {
            param.name.clone()
        };
        schema.insert(
            &field,
            SchemaField {
                ty: ValueType::String,
                required: param.required,
                enum_values: Vec::new(),
                description: Some(description),
            },
            context,
        )?;
        return Ok(BodyBinding::Raw { field });
    };

    for (prop_name, prop) in &definition.properties {
        let required = definition.required.contains(prop_name);
        // A property named like a path/query parameter reuses that field; the one argument
        // fills both the URL and the body.
        if let Some(existing) = schema.fields.get_mut(prop_name) {
            tracing::warn!(
                "Body property '{}' of {} shares its name with a path/query parameter; one argument fills both",
                prop_name,
                context
            );
            existing.required |= required;
            continue;
        }
        schema.fields.insert(
            prop_name.clone(),
            SchemaField {
                ty: prop.ty,
                required,
                enum_values: prop.enum_values.clone(),
                description: prop.description.clone(),
            },
        );
    }
    Ok(BodyBinding::Fields(definition.properties.keys().cloned().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::expand_document;

    const DOC: &str = r"
swagger: '2.0'
paths:
  /v1/orgs/{org_id}/confs:
    get:
      tags: [AI, Confs]
      operationId: listConfs
      summary: List configurations
      parameters:
        - { in: path, name: org_id, required: true, type: string }
        - { in: query, name: limit, type: integer }
        - { in: query, name: status, type: string, enum: [active, archived] }
    post:
      tags: [AI]
      description: Create a configuration
      parameters:
        - { in: path, name: ORG_ID, required: true, type: string }
        - in: body
          name: body
          required: false
          schema: { $ref: '#/definitions/Conf' }
  /v1/orgs/{org_id}/confs/{conf_id}:
    put:
      tags: [AI]
      parameters:
        - { in: path, name: org_id, required: true, type: string }
        - { in: path, name: conf_id, required: true, type: string }
        - in: body
          name: raw
          description: Raw payload
          required: true
          schema: { type: string }
  /v1/hidden:
    get:
      tags: [Internal]
definitions:
  Conf:
    type: object
    required: [content, description]
    properties:
      content: { type: string }
      description: { type: string }
      tags: { type: array, items: { type: string } }
";

    fn synthesize(doc: &str) -> Result<Vec<SynthesizedTool>> {
        let spec = expand_document(doc, "test.yaml", 16)?;
        ToolSynthesizer::new(OperationFilter::new(["AI"], "AI"), "org_id").synthesize(&spec)
    }

    fn tool<'a>(tools: &'a [SynthesizedTool], name: &str) -> &'a SynthesizedTool {
        tools
            .iter()
            .find(|t| t.definition.name == name)
            .unwrap_or_else(|| panic!("tool {name} not synthesized"))
    }

    #[test]
    fn one_tool_per_retained_operation() {
        let tools = synthesize(DOC).unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.definition.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["listConfs", "post_v1_orgs_org_id_confs", "put_v1_orgs_org_id_confs_conf_id"]
        );
    }

    #[test]
    fn scalar_fields_keep_type_enum_and_required() {
        let tools = synthesize(DOC).unwrap();
        let list = tool(&tools, "listConfs");
        let schema = &list.definition.input_schema;

        assert!(schema.field("org_id").is_none());
        assert_eq!(schema.field("limit").unwrap().ty, ValueType::Integer);
        assert_eq!(schema.field("status").unwrap().enum_values, vec!["active", "archived"]);
        assert!(schema.required().is_empty());
        assert_eq!(list.definition.description, "List configurations");
        assert!(list.binding.needs_org_id());
    }

    #[test]
    fn body_definition_is_flattened_with_definition_required_list() {
        let tools = synthesize(DOC).unwrap();
        let create = tool(&tools, "post_v1_orgs_org_id_confs");
        let schema = &create.definition.input_schema;

        // Org param excluded even with different casing.
        assert!(schema.field("ORG_ID").is_none());
        assert_eq!(schema.required(), vec!["content", "description"]);
        assert_eq!(schema.field("tags").unwrap().ty, ValueType::Array);
        assert_eq!(
            create.binding.body,
            Some(BodyBinding::Fields(vec![
                "content".into(),
                "description".into(),
                "tags".into()
            ]))
        );
        assert_eq!(create.definition.description, "Create a configuration");
    }

    #[test]
    fn opaque_body_becomes_single_string_field() {
        let tools = synthesize(DOC).unwrap();
        let put = tool(&tools, "put_v1_orgs_org_id_confs_conf_id");
        let raw = put.definition.input_schema.field("raw").unwrap();
        assert_eq!(raw.ty, ValueType::String);
        assert!(raw.required);
        assert_eq!(
            put.binding.body,
            Some(BodyBinding::Raw { field: "raw".into() })
        );
        assert_eq!(put.definition.description, "PUT /v1/orgs/{org_id}/confs/{conf_id}");
    }

    #[test]
    fn missing_definition_falls_back_to_raw_json_field() {
        let mut spec = expand_document(DOC, "test.yaml", 16).unwrap();
        spec.definitions.clear();
        let tools = ToolSynthesizer::new(OperationFilter::new(["AI"], "AI"), "org_id")
            .synthesize(&spec)
            .unwrap();
        let create = tool(&tools, "post_v1_orgs_org_id_confs");
        let field = create.definition.input_schema.field("body").unwrap();
        assert_eq!(field.ty, ValueType::String);
        assert!(!field.required);
        assert_eq!(
            create.binding.body,
            Some(BodyBinding::Raw { field: "body".into() })
        );
    }

    #[test]
    fn synthesis_is_deterministic() {
        let a = synthesize(DOC).unwrap();
        let b = synthesize(DOC).unwrap();
        let defs = |tools: &[SynthesizedTool]| {
            tools.iter().map(|t| t.definition.clone()).collect::<Vec<_>>()
        };
        assert_eq!(defs(&a), defs(&b));
    }

    const SHARED_ID_DOC: &str = r"
swagger: '2.0'
paths:
  /v1/confs/{id}:
    put:
      tags: [AI]
      operationId: replaceConf
      parameters:
        - in: body
          name: body
          required: true
          schema: { $ref: '#/definitions/Conf' }
        - { in: path, name: id, required: true, type: string }
  /v1/health:
    get:
      tags: [AI]
      operationId: health
definitions:
  Conf:
    type: object
    required: [content]
    properties:
      id: { type: string, description: Conf id }
      content: { type: string }
";

    #[test]
    fn body_property_sharing_a_path_name_reuses_the_field() {
        let tools = synthesize(SHARED_ID_DOC).unwrap();
        assert_eq!(tools.len(), 2);

        let put = tool(&tools, "replaceConf");
        let schema = &put.definition.input_schema;
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.required(), vec!["content", "id"]);
        assert_eq!(
            put.binding.body,
            Some(BodyBinding::Fields(vec!["content".into(), "id".into()]))
        );

        let ctx = crate::context::AmbientContext::new();
        let arguments = json!({ "id": "c1", "content": "x" });
        let req = crate::request::build_request(
            &put.binding,
            arguments.as_object().unwrap(),
            &ctx,
            Some("http://api.test"),
        )
        .unwrap();
        assert_eq!(req.url.path(), "/v1/confs/c1");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "id": "c1", "content": "x" }));
    }

    #[test]
    fn raw_body_sharing_a_query_name_is_renamed() {
        let tools = synthesize(
            r"
swagger: '2.0'
paths:
  /items:
    post:
      tags: [AI]
      operationId: createItem
      parameters:
        - { in: query, name: item, type: string }
        - in: body
          name: item
          schema: { type: string }
",
        )
        .unwrap();
        let create = tool(&tools, "createItem");
        assert!(create.definition.input_schema.field("item_body").is_some());
        assert_eq!(
            create.binding.body,
            Some(BodyBinding::Raw { field: "item_body".into() })
        );
    }

    #[test]
    fn free_form_body_payload_is_forwarded() {
        let tools = synthesize(
            r"
swagger: '2.0'
paths:
  /v1/confs/{id}/labels:
    put:
      tags: [AI]
      operationId: setLabels
      parameters:
        - { in: path, name: id, required: true, type: string }
        - in: body
          name: labels
          schema: { $ref: '#/definitions/Labels' }
definitions:
  Labels:
    type: object
    additionalProperties: { type: string }
",
        )
        .unwrap();
        let set = tool(&tools, "setLabels");
        assert_eq!(
            set.binding.body,
            Some(BodyBinding::Raw { field: "labels".into() })
        );

        let arguments = json!({ "id": "c1", "labels": { "env": "prod" } });
        let req = crate::request::build_request(
            &set.binding,
            arguments.as_object().unwrap(),
            &crate::context::AmbientContext::new(),
            Some("http://api.test"),
        )
        .unwrap();
        assert_eq!(req.body.as_deref(), Some(r#"{"env":"prod"}"#));
    }

    #[test]
    fn empty_definition_falls_back_to_raw_json_field() {
        let mut spec = expand_document(DOC, "test.yaml", 16).unwrap();
        spec.definitions.insert("Conf".into(), Definition::default());
        let tools = ToolSynthesizer::new(OperationFilter::new(["AI"], "AI"), "org_id")
            .synthesize(&spec)
            .unwrap();
        let create = tool(&tools, "post_v1_orgs_org_id_confs");
        assert_eq!(
            create.binding.body,
            Some(BodyBinding::Raw { field: "body".into() })
        );
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let tools = synthesize(
            r"
swagger: '2.0'
paths:
  /a:
    get: { tags: [AI, Items] }
  /b:
    get: { tags: [AI, Items] }
",
        )
        .unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.definition.name.as_str()).collect();
        assert_eq!(names, vec!["items", "items_1"]);
    }

    #[test]
    fn json_schema_rendering() {
        let tools = synthesize(DOC).unwrap();
        let create = tool(&tools, "post_v1_orgs_org_id_confs");
        let rendered = create.definition.input_schema.to_json();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["content"]["type"], "string");
        assert_eq!(rendered["properties"]["tags"], json!({ "type": "array", "items": {} }));
        assert!(rendered["properties"]["content"].get("items").is_none());
        assert_eq!(rendered["required"], json!(["content", "description"]));

        let mcp = create.to_mcp_tool();
        assert_eq!(mcp.name, "post_v1_orgs_org_id_confs");
        let annotations = mcp.annotations.unwrap();
        assert_eq!(annotations.idempotent_hint, Some(false));
    }
}
