// ABOUTME: Argument binding bridge between wire argument maps and handler parameter lists
// ABOUTME: Declares parameter schemas, coerces loosely-typed values, and rejects missing required args

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde_json::{json, Map, Value};

use crate::error::McpError;
use crate::protocol::PromptArgument;

/// How a declared parameter accepts wire values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Text parameter: strings pass through, scalar numbers and booleans
    /// are coerced to their string rendering, anything else is a binding
    /// error
    Text,
    /// Structured parameter: any JSON value passes through unchanged
    Json,
}

/// A declared handler parameter
///
/// The parameter list is the handler's binding shape, declared explicitly
/// at registration. The same list drives both argument binding and the
/// advertised schema, so the two can never drift apart.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name, matched against wire argument keys
    pub name: String,
    /// Human-readable description, surfaced in listings
    pub description: Option<String>,
    /// Whether an argument must be supplied for this parameter
    pub required: bool,
    /// Accepted value shape
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Declare a required text parameter
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
            kind: ParamKind::Text,
        }
    }

    /// Declare an optional text parameter
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
            kind: ParamKind::Text,
        }
    }

    /// Override the accepted value shape
    #[must_use]
    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Reusable adapter binding a wire argument map onto a parameter list
///
/// Built once per handler at registration time (never lazily at dispatch),
/// so repeated invocations share the derived binding and schema.
#[derive(Debug, Clone)]
pub struct ArgumentAdapter {
    params: Vec<ParamSpec>,
}

impl ArgumentAdapter {
    /// Build an adapter from a declared parameter list
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when two parameters share a name.
    pub fn new(params: Vec<ParamSpec>) -> Result<Self, McpError> {
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(McpError::configuration(format!(
                    "Duplicate parameter name: {}",
                    param.name
                )));
            }
        }
        Ok(Self { params })
    }

    /// The declared parameter list
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Bind supplied arguments against the declared parameters
    ///
    /// Binding completes fully before any handler runs: every declared
    /// parameter is resolved and coerced here, missing required parameters
    /// fail immediately, and arguments with no matching parameter are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns a `Binding` error naming `capability` and the offending
    /// argument when a required parameter is absent or a value cannot be
    /// coerced.
    pub fn bind(
        &self,
        capability: &str,
        supplied: &Map<String, Value>,
    ) -> Result<BoundArguments, McpError> {
        let mut values = Map::new();
        for param in &self.params {
            match supplied.get(&param.name) {
                Some(value) => {
                    values.insert(param.name.clone(), coerce(capability, param, value)?);
                }
                None if param.required => {
                    return Err(McpError::binding(
                        capability,
                        format!("Missing required argument: {}", param.name),
                    ));
                }
                None => {}
            }
        }
        Ok(BoundArguments {
            capability: capability.to_owned(),
            values,
        })
    }

    /// Render the JSON Schema object advertised for this parameter list
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();
        for param in &self.params {
            let mut schema = Map::new();
            if param.kind == ParamKind::Text {
                schema.insert("type".to_owned(), json!("string"));
            }
            if let Some(desc) = &param.description {
                schema.insert("description".to_owned(), json!(desc));
            }
            properties.insert(param.name.clone(), Value::Object(schema));
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Render the prompt-argument schema advertised for this parameter list
    #[must_use]
    pub fn prompt_arguments(&self) -> Vec<PromptArgument> {
        self.params
            .iter()
            .map(|p| PromptArgument {
                name: p.name.clone(),
                description: p.description.clone(),
                required: p.required,
            })
            .collect()
    }
}

/// Coerce a wire value to a parameter's declared shape
fn coerce(capability: &str, param: &ParamSpec, value: &Value) -> Result<Value, McpError> {
    match param.kind {
        ParamKind::Json => Ok(value.clone()),
        ParamKind::Text => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(McpError::binding(
                capability,
                format!(
                    "Argument '{}' expects text, got {}",
                    param.name,
                    json_type_name(other)
                ),
            )),
        },
    }
}

/// JSON type label for binding error messages
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Fully-bound arguments handed to a handler
///
/// All required parameters are present and already coerced; handlers never
/// observe a partially-bound call.
#[derive(Debug, Clone)]
pub struct BoundArguments {
    capability: String,
    values: Map<String, Value>,
}

impl BoundArguments {
    /// Bound arguments for a parameterless call
    #[must_use]
    pub fn none(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            values: Map::new(),
        }
    }

    /// Raw bound value for a parameter, if supplied
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Bound text value for a parameter, if supplied
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Bound text value for a parameter that must be present
    ///
    /// # Errors
    ///
    /// Returns a `Binding` error when the parameter was not bound; cannot
    /// happen for parameters declared required.
    pub fn require_text(&self, name: &str) -> Result<&str, McpError> {
        self.text(name).ok_or_else(|| {
            McpError::binding(&self.capability, format!("Missing required argument: {name}"))
        })
    }

    /// Number of bound arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no arguments were bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over bound name/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn weather_adapter() -> ArgumentAdapter {
        ArgumentAdapter::new(vec![
            ParamSpec::required("cityName", "The name of the city"),
            ParamSpec::required("currentDateTimeInUtc", "Current UTC timestamp"),
        ])
        .expect("valid params")
    }

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn test_bind_all_required_arguments() {
        let adapter = weather_adapter();
        let bound = adapter
            .bind(
                "get_weather_for_city",
                &args(&[
                    ("cityName", json!("Boston")),
                    ("currentDateTimeInUtc", json!("2026-01-01T00:00:00Z")),
                ]),
            )
            .expect("bind");
        assert_eq!(bound.text("cityName"), Some("Boston"));
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_missing_required_argument_is_binding_error() {
        let adapter = weather_adapter();
        let err = adapter
            .bind(
                "get_weather_for_city",
                &args(&[("cityName", json!("Boston"))]),
            )
            .expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Binding);
        assert!(err.message.contains("get_weather_for_city"));
        assert!(err.message.contains("currentDateTimeInUtc"));
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let adapter = weather_adapter();
        let bound = adapter
            .bind(
                "get_weather_for_city",
                &args(&[
                    ("cityName", json!("Boston")),
                    ("currentDateTimeInUtc", json!("now")),
                    ("unitSystem", json!("metric")),
                ]),
            )
            .expect("bind");
        assert!(bound.get("unitSystem").is_none());
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn test_scalars_coerce_to_text() {
        let adapter =
            ArgumentAdapter::new(vec![ParamSpec::required("limit", "Row limit")]).expect("params");
        let bound = adapter
            .bind("query", &args(&[("limit", json!(25))]))
            .expect("bind");
        assert_eq!(bound.text("limit"), Some("25"));

        let bound = adapter
            .bind("query", &args(&[("limit", json!(true))]))
            .expect("bind");
        assert_eq!(bound.text("limit"), Some("true"));
    }

    #[test]
    fn test_structured_value_is_uncoercible_to_text() {
        let adapter =
            ArgumentAdapter::new(vec![ParamSpec::required("city", "City")]).expect("params");
        let err = adapter
            .bind("query", &args(&[("city", json!({"name": "Boston"}))]))
            .expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Binding);
        assert!(err.message.contains("object"));
    }

    #[test]
    fn test_json_kind_passes_structured_values_through() {
        let adapter = ArgumentAdapter::new(vec![
            ParamSpec::required("filter", "Query filter").with_kind(ParamKind::Json)
        ])
        .expect("params");
        let bound = adapter
            .bind("query", &args(&[("filter", json!({"city": "Boston"}))]))
            .expect("bind");
        assert_eq!(bound.get("filter"), Some(&json!({"city": "Boston"})));
    }

    #[test]
    fn test_optional_parameter_may_be_absent() {
        let adapter = ArgumentAdapter::new(vec![
            ParamSpec::required("city", "City"),
            ParamSpec::optional("units", "Unit system"),
        ])
        .expect("params");
        let bound = adapter
            .bind("forecast", &args(&[("city", json!("Tokyo"))]))
            .expect("bind");
        assert!(bound.get("units").is_none());
        assert_eq!(bound.len(), 1);
    }

    #[test]
    fn test_duplicate_parameter_names_rejected_at_construction() {
        let err = ArgumentAdapter::new(vec![
            ParamSpec::required("city", "City"),
            ParamSpec::optional("city", "Also city"),
        ])
        .expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_require_text_reports_missing_binding() {
        let bound = BoundArguments::none("forecast");
        let err = bound.require_text("city").expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Binding);
        assert!(err.message.contains("forecast"));
    }

    #[test]
    fn test_input_schema_lists_properties_and_required() {
        let adapter = weather_adapter();
        let schema = adapter.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["cityName"]["type"], "string");
        assert_eq!(
            schema["properties"]["cityName"]["description"],
            "The name of the city"
        );
        let required = schema["required"].as_array().expect("required array");
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn test_prompt_arguments_mirror_param_specs() {
        let adapter = ArgumentAdapter::new(vec![
            ParamSpec::required("city", "City to describe"),
            ParamSpec::optional("tone", "Rendering tone"),
        ])
        .expect("params");
        let advertised = adapter.prompt_arguments();
        assert_eq!(advertised.len(), 2);
        assert!(advertised[0].required);
        assert!(!advertised[1].required);
    }
}
