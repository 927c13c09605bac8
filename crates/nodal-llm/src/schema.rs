//! Output-schema resolution and JSON post-processing.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value, json};

use crate::error::{LlmError, Result};

/// Field name to type name, e.g. `{"score": "int"}`, in the caller's field order.
pub type SimpleSchema = Map<String, Value>;

static JSON_OBJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

const JSON_ONLY_INSTRUCTION: &str =
    "You must respond with valid JSON only. No other text before or after the JSON Object.";

/// Convert a simple field/type map into an object JSON schema.
///
/// Unknown type names produce no property entry but the field stays required.
/// Field order carries over to `properties` and `required`.
#[must_use]
pub fn convert_output_schema_to_json_schema(simple: &SimpleSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::with_capacity(simple.len());
    for (field, type_name) in simple {
        let json_type = match type_name.as_str().unwrap_or_default() {
            "str" | "string" => Some("string"),
            "int" | "integer" => Some("integer"),
            "float" | "number" => Some("number"),
            "bool" | "boolean" => Some("boolean"),
            _ => None,
        };
        if let Some(t) = json_type {
            properties.insert(field.clone(), json!({ "type": t }));
        }
        required.push(Value::String(field.clone()));
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

#[must_use]
pub fn default_output_schema() -> SimpleSchema {
    SimpleSchema::from_iter([("output".to_owned(), Value::from("string"))])
}

/// The schema a JSON-capable request is shaped with.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub json_schema: Value,
    /// Simple form, when one was supplied or defaulted; preferred for prompt text.
    pub simple: Option<SimpleSchema>,
}

impl OutputSchema {
    /// Schema text embedded in the system prompt for JSON-object mode.
    #[must_use]
    pub fn prompt_text(&self) -> String {
        match &self.simple {
            Some(simple) if !simple.is_empty() => {
                serde_json::to_string(simple).unwrap_or_default()
            }
            _ => self.json_schema.to_string(),
        }
    }
}

/// Pick the effective output schema from the caller's inputs.
///
/// A non-blank JSON schema text wins over the simple form; neither yields the
/// default `{"output": "string"}`. `additionalProperties` is always `false`.
///
/// # Errors
///
/// Returns [`LlmError::InvalidRequest`] if the JSON schema text does not parse to an object.
pub fn resolve_output_schema(
    json_schema_text: Option<&str>,
    simple: Option<&SimpleSchema>,
) -> Result<OutputSchema> {
    let text = json_schema_text.map(str::trim).filter(|t| !t.is_empty());
    let mut resolved = match (text, simple) {
        (Some(text), simple) => {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| LlmError::InvalidRequest(format!("output_json_schema: {e}")))?;
            if !value.is_object() {
                return Err(LlmError::InvalidRequest(
                    "output_json_schema must be a JSON object".into(),
                ));
            }
            OutputSchema {
                json_schema: value,
                simple: simple.cloned(),
            }
        }
        (None, Some(simple)) => OutputSchema {
            json_schema: convert_output_schema_to_json_schema(simple),
            simple: Some(simple.clone()),
        },
        (None, None) => {
            let simple = default_output_schema();
            OutputSchema {
                json_schema: convert_output_schema_to_json_schema(&simple),
                simple: Some(simple),
            }
        }
    };
    if let Some(obj) = resolved.json_schema.as_object_mut() {
        obj.insert("additionalProperties".into(), Value::Bool(false));
    }
    Ok(resolved)
}

/// Wrap a bare schema in the named envelope `json_schema` response formats expect.
#[must_use]
pub fn wrap_named_schema(schema: Value) -> Value {
    let already_named = schema
        .as_object()
        .is_some_and(|o| o.contains_key("name") || o.contains_key("schema"));
    if already_named {
        return schema;
    }
    json!({
        "name": "output",
        "strict": true,
        "schema": schema,
    })
}

/// System-prompt suffix for models that only accept `json_object` mode.
#[must_use]
pub fn schema_instruction(schema_text: &str) -> String {
    format!("\n{JSON_ONLY_INSTRUCTION} The JSON Object must adhere to this schema: {schema_text}")
}

/// Leading system message for JSON-mode calls that carry no other JSON constraint.
#[must_use]
pub fn json_only_instruction() -> &'static str {
    JSON_ONLY_INSTRUCTION
}

fn wrap_output(text: &str, provider_fields: Option<&Map<String, Value>>) -> String {
    let mut obj = Map::new();
    obj.insert("output".into(), Value::String(text.to_owned()));
    if let Some(fields) = provider_fields {
        obj.insert(
            "provider_specific_fields".into(),
            Value::Object(fields.clone()),
        );
    }
    Value::Object(obj).to_string()
}

fn is_json(text: &str) -> bool {
    serde_json::from_str::<serde::de::IgnoredAny>(text).is_ok()
}

/// Turn a raw completion into a JSON document.
///
/// Models without JSON support always get wrapped as `{"output": ...}`. For the rest
/// the text passes through when it parses; otherwise the outermost `{...}` span is
/// tried (only when the text does not already start with `{`) before wrapping.
#[must_use]
pub fn normalize_json_response(
    text: &str,
    provider_fields: Option<&Map<String, Value>>,
    supports_json: bool,
) -> String {
    if !supports_json {
        return wrap_output(text, provider_fields);
    }
    if is_json(text) {
        return text.to_owned();
    }
    tracing::error!("response is not valid JSON: {text}");
    if !text.starts_with('{')
        && let Some(m) = JSON_OBJECT_RE.find(text)
        && is_json(m.as_str())
    {
        return m.as_str().to_owned();
    }
    wrap_output(text, provider_fields)
}
