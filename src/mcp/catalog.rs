use crate::errors::{ErrorCode, McpError};
use crate::mcp::aliases::{builtin_tool_aliases, ToolAlias};
use crate::utils::suggest::suggest;
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

static TOOL_CATALOG: Lazy<Vec<ToolDef>> = Lazy::new(|| {
    let raw = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tool_catalog.json"));
    serde_json::from_str(raw).expect("tool_catalog.json must be valid JSON")
});

static TOOL_MAP: Lazy<HashMap<String, ToolDef>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .cloned()
        .map(|tool| (tool.name.clone(), tool))
        .collect()
});

static TOOL_VALIDATORS: Lazy<HashMap<String, JSONSchema>> = Lazy::new(|| {
    TOOL_CATALOG
        .iter()
        .filter_map(|tool| {
            JSONSchema::compile(&tool.input_schema)
                .ok()
                .map(|schema| (tool.name.clone(), schema))
        })
        .collect()
});

pub fn tool_catalog() -> &'static [ToolDef] {
    &TOOL_CATALOG
}

pub fn tool_by_name(name: &str) -> Option<&'static ToolDef> {
    TOOL_MAP.get(name)
}

/// Action names a catalog tool declares in its `action` enum.
pub fn tool_actions(name: &str) -> Vec<String> {
    tool_by_name(name)
        .and_then(|tool| tool.input_schema.pointer("/properties/action/enum"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn validate_tool_args(tool_name: &str, args: &Value) -> Result<(), McpError> {
    let Some(schema) = TOOL_VALIDATORS.get(tool_name) else {
        return Ok(());
    };
    if let Err(errors) = schema.validate(args) {
        let rendered: Vec<String> = errors
            .take(10)
            .map(|err| render_error(args, &err))
            .collect();
        let action = args.get("action").and_then(|v| v.as_str());
        let header = match action {
            Some(action) => format!("Invalid arguments for {}:{}", tool_name, action),
            None => format!("Invalid arguments for {}", tool_name),
        };
        let mut lines = vec![header];
        lines.extend(rendered.into_iter().map(|line| format!("- {}", line)));
        lines.push(match action {
            Some(action) => format!(
                "Hint: help({{ tool: '{}', action: '{}' }})",
                tool_name, action
            ),
            None => format!("Hint: help({{ tool: '{}' }})", tool_name),
        });
        return Err(McpError::new(ErrorCode::InvalidParams, lines.join("\n")));
    }
    Ok(())
}

fn render_error(args: &Value, err: &jsonschema::ValidationError<'_>) -> String {
    let pointer = err.instance_path.to_string();
    let path = if pointer.is_empty() {
        "(root)".to_string()
    } else {
        pointer.clone()
    };
    match &err.kind {
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            let known = known_properties(&err.schema_path.to_string());
            unexpected
                .iter()
                .map(|field| {
                    let hints = suggest(field, &known, 2);
                    if hints.is_empty() {
                        format!("{}: unknown field '{}'", path, field)
                    } else {
                        format!(
                            "{}: unknown field '{}' (did you mean {}?)",
                            path,
                            field,
                            hints.join(", ")
                        )
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        }
        ValidationErrorKind::Enum { options } => {
            let allowed: Vec<String> = options
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                        .collect()
                })
                .unwrap_or_default();
            let received = args
                .pointer(&pointer)
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let hints = suggest(received, &allowed, 2);
            let mut line = format!("{}: expected one of {}", path, allowed.join(", "));
            if !hints.is_empty() {
                line.push_str(&format!(" (did you mean {}?)", hints.join(", ")));
            }
            line
        }
        ValidationErrorKind::Required { property } => format!(
            "{}: missing required field '{}'",
            path,
            property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string())
        ),
        ValidationErrorKind::Type { kind } => {
            let expected = match kind {
                TypeKind::Single(primitive) => primitive.to_string(),
                TypeKind::Multiple(types) => (*types)
                    .into_iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(" | "),
            };
            format!("{}: expected {}", path, expected)
        }
        _ => format!("{}: {}", path, err),
    }
}

/// Property names declared next to the `additionalProperties` keyword that
/// rejected a field. Only top-level objects and `mentions` items carry one.
fn known_properties(schema_path: &str) -> Vec<String> {
    let is_mentions = schema_path.contains("mentions");
    TOOL_CATALOG
        .iter()
        .flat_map(|tool| {
            let props = if is_mentions {
                tool.input_schema
                    .pointer("/properties/mentions/items/properties")
            } else {
                tool.input_schema.get("properties")
            };
            props
                .and_then(|v| v.as_object())
                .map(|map| map.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect()
}

/// Schema advertised for a flat alias: the target's schema with `action`
/// optional, since the alias already implies it.
fn alias_schema(alias: &ToolAlias, target: &ToolDef) -> Value {
    let mut schema = target.input_schema.clone();
    if let Some(obj) = schema.as_object_mut() {
        if let Some(required) = obj.get_mut("required").and_then(|v| v.as_array_mut()) {
            required.retain(|v| v.as_str() != Some("action"));
        }
        if matches!(alias.action, "create" | "update") {
            if let Some(props) = obj.get_mut("properties").and_then(|v| v.as_object_mut()) {
                props.insert(
                    "fields".to_string(),
                    serde_json::json!({
                        "type": "object",
                        "description": "Same as record."
                    }),
                );
            }
        }
    }
    schema
}

pub fn list_tools() -> Vec<ToolDef> {
    let mut tools: Vec<ToolDef> = TOOL_CATALOG.iter().cloned().collect();
    for alias in builtin_tool_aliases() {
        let Some(target) = tool_by_name(alias.tool) else {
            continue;
        };
        if tools.iter().any(|tool| tool.name == alias.name) {
            continue;
        }
        tools.push(ToolDef {
            name: alias.name.to_string(),
            description: format!("Alias for {} action '{}'.", alias.tool, alias.action),
            input_schema: alias_schema(alias, target),
        });
    }
    tools
}
