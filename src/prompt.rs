// ABOUTME: Declarative prompt templates parsed from JSON config and rendered through tera
// ABOUTME: Input variables become the advertised argument schema; render output is one assistant message

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use serde::Deserialize;
use tera::Tera;
use tracing::debug;

use crate::binding::{BoundArguments, ParamKind, ParamSpec};
use crate::error::McpError;
use crate::protocol::PromptMessage;
use crate::registry::{PromptSpec, RenderedPrompt};

/// A named input variable declared by a prompt template
#[derive(Debug, Clone, Deserialize)]
pub struct InputVariable {
    /// Variable name, matched against render arguments
    pub name: String,
    /// Human-readable description, surfaced in listings
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the variable must be supplied at render time
    #[serde(default)]
    pub is_required: bool,
}

/// Raw JSON shape of a prompt template config
#[derive(Debug, Deserialize)]
struct TemplateConfig {
    name: String,
    #[serde(default)]
    description: Option<String>,
    template: String,
    #[serde(default)]
    template_format: Option<String>,
    #[serde(default)]
    input_variables: Vec<InputVariable>,
}

/// A parsed prompt template
///
/// Parsing happens once, at configuration time: the template's name,
/// description, and input variables are extracted and become the prompt's
/// advertised argument schema. Rendering substitutes supplied arguments into
/// the template body and wraps the result as a single assistant-authored
/// text message.
///
/// The config shape is JSON:
///
/// ```json
/// {
///   "name": "get_current_weather_for_city",
///   "description": "Provides current weather for a city.",
///   "template": "What is the weather in {{ city }}?",
///   "template_format": "handlebars",
///   "input_variables": [
///     { "name": "city", "description": "The city name", "is_required": true }
///   ]
/// }
/// ```
///
/// Substitution is delegated to the [`tera`] engine with autoescaping off;
/// only the double-brace `handlebars` format is supported.
#[derive(Debug)]
pub struct PromptTemplate {
    name: String,
    description: Option<String>,
    body: String,
    variables: Vec<InputVariable>,
}

impl PromptTemplate {
    /// Parse a JSON prompt template config
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for malformed JSON, an empty name,
    /// an unsupported `template_format`, or duplicate input variables.
    pub fn parse(json: &str) -> Result<Self, McpError> {
        let config: TemplateConfig = serde_json::from_str(json)
            .map_err(|e| McpError::configuration(format!("Invalid prompt template JSON: {e}")))?;

        if config.name.is_empty() {
            return Err(McpError::configuration(
                "Prompt template must declare a non-empty name",
            ));
        }
        match config.template_format.as_deref() {
            Some("handlebars") => {}
            Some(other) => {
                return Err(McpError::configuration(format!(
                    "Unsupported template_format '{other}' in prompt '{}'",
                    config.name
                )));
            }
            None => {
                return Err(McpError::configuration(format!(
                    "Prompt '{}' is missing template_format",
                    config.name
                )));
            }
        }
        for (i, var) in config.input_variables.iter().enumerate() {
            if config.input_variables[..i].iter().any(|v| v.name == var.name) {
                return Err(McpError::configuration(format!(
                    "Duplicate input variable '{}' in prompt '{}'",
                    var.name, config.name
                )));
            }
        }

        debug!(
            prompt = %config.name,
            variable_count = config.input_variables.len(),
            "Parsed prompt template"
        );

        Ok(Self {
            name: config.name,
            description: config.description,
            body: config.template,
            variables: config.input_variables,
        })
    }

    /// The prompt's unique name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The prompt's advertised description
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared input variables, in config order
    #[must_use]
    pub fn variables(&self) -> &[InputVariable] {
        &self.variables
    }

    /// Substitute bound arguments into the template body
    ///
    /// Optional variables that were not supplied render as the empty string.
    /// Missing required variables never reach this point; binding rejects
    /// them first.
    ///
    /// # Errors
    ///
    /// Returns a `Handler` error when the template engine fails.
    pub fn render(&self, arguments: &BoundArguments) -> Result<String, McpError> {
        let mut context = tera::Context::new();
        for var in &self.variables {
            context.insert(&var.name, arguments.text(&var.name).unwrap_or_default());
        }
        Tera::one_off(&self.body, &context, false)
            .map_err(|e| McpError::handler(format!("Prompt '{}' failed to render: {e}", self.name)))
    }

    /// Convert this template into a registry prompt spec
    ///
    /// The returned spec advertises one argument per input variable and
    /// renders through the same binding bridge as every other handler, so a
    /// missing required variable is a Binding error raised before the
    /// template engine runs.
    #[must_use]
    pub fn into_spec(self) -> PromptSpec {
        let mut spec = PromptSpec::new(&self.name);
        if let Some(description) = &self.description {
            spec = spec.with_description(description.clone());
        }
        for var in &self.variables {
            spec = spec.with_param(ParamSpec {
                name: var.name.clone(),
                description: var.description.clone(),
                required: var.is_required,
                kind: ParamKind::Text,
            });
        }
        let description = self.description.clone();
        let template = Arc::new(self);
        spec.with_handler(move |_ctx, args| {
            let template = Arc::clone(&template);
            let description = description.clone();
            async move {
                let rendered = template.render(&args)?;
                Ok(RenderedPrompt {
                    description,
                    messages: vec![PromptMessage::assistant_text(rendered)],
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::{CancellationToken, ServiceMap};
    use crate::error::ErrorKind;
    use crate::protocol::Role;
    use crate::registry::CapabilityRegistry;

    const WEATHER_PROMPT: &str = r#"{
        "name": "get_current_weather_for_city",
        "description": "Provides current weather information for a specified city.",
        "template": "What is the current weather in {{ city }}?",
        "template_format": "handlebars",
        "input_variables": [
            {
                "name": "city",
                "description": "The city for which to get the weather.",
                "is_required": true
            }
        ]
    }"#;

    #[test]
    fn test_parse_extracts_name_description_and_variables() {
        let template = PromptTemplate::parse(WEATHER_PROMPT).expect("parse");
        assert_eq!(template.name(), "get_current_weather_for_city");
        assert_eq!(
            template.description(),
            Some("Provides current weather information for a specified city.")
        );
        assert_eq!(template.variables().len(), 1);
        assert_eq!(template.variables()[0].name, "city");
        assert!(template.variables()[0].is_required);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = PromptTemplate::parse("{not json").expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_parse_rejects_unsupported_template_format() {
        let config = json!({
            "name": "p",
            "template": "{{ x }}",
            "template_format": "semantic-kernel",
            "input_variables": []
        });
        let err = PromptTemplate::parse(&config.to_string()).expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("semantic-kernel"));
    }

    #[test]
    fn test_parse_rejects_missing_template_format() {
        let config = json!({
            "name": "p",
            "template": "{{ x }}",
            "input_variables": []
        });
        assert!(PromptTemplate::parse(&config.to_string()).is_err());
    }

    #[test]
    fn test_parse_rejects_duplicate_input_variables() {
        let config = json!({
            "name": "p",
            "template": "{{ x }}",
            "template_format": "handlebars",
            "input_variables": [{"name": "x"}, {"name": "x"}]
        });
        let err = PromptTemplate::parse(&config.to_string()).expect_err("must fail");
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_parse_rejects_empty_name() {
        let config = json!({
            "name": "",
            "template": "hello",
            "template_format": "handlebars"
        });
        assert!(PromptTemplate::parse(&config.to_string()).is_err());
    }

    #[tokio::test]
    async fn test_rendered_prompt_is_single_assistant_message() {
        let template = PromptTemplate::parse(WEATHER_PROMPT).expect("parse");

        let mut registry = CapabilityRegistry::new();
        registry
            .register_prompt(template.into_spec())
            .expect("register");

        let result = registry
            .get_prompt(
                &std::sync::Arc::new(ServiceMap::new()),
                CancellationToken::new(),
                "get_current_weather_for_city",
                Some(
                    [("city".to_owned(), json!("Paris"))]
                        .into_iter()
                        .collect(),
                ),
            )
            .await
            .expect("render");

        assert_eq!(
            result.description.as_deref(),
            Some("Provides current weather information for a specified city.")
        );
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role, Role::Assistant);
        assert_eq!(
            result.messages[0].content.text.as_deref(),
            Some("What is the current weather in Paris?")
        );
    }

    #[tokio::test]
    async fn test_render_without_required_variable_is_binding_error() {
        let template = PromptTemplate::parse(WEATHER_PROMPT).expect("parse");

        let mut registry = CapabilityRegistry::new();
        registry
            .register_prompt(template.into_spec())
            .expect("register");

        let err = registry
            .get_prompt(
                &std::sync::Arc::new(ServiceMap::new()),
                CancellationToken::new(),
                "get_current_weather_for_city",
                None,
            )
            .await
            .expect_err("binding must fail");
        assert_eq!(err.kind, ErrorKind::Binding);
        assert!(err.message.contains("city"));
    }

    #[tokio::test]
    async fn test_optional_variable_defaults_to_empty_string() {
        let config = json!({
            "name": "greet",
            "template": "Hello {{ name }}{{ suffix }}",
            "template_format": "handlebars",
            "input_variables": [
                {"name": "name", "is_required": true},
                {"name": "suffix", "is_required": false}
            ]
        });
        let template = PromptTemplate::parse(&config.to_string()).expect("parse");

        let mut registry = CapabilityRegistry::new();
        registry
            .register_prompt(template.into_spec())
            .expect("register");

        let result = registry
            .get_prompt(
                &std::sync::Arc::new(ServiceMap::new()),
                CancellationToken::new(),
                "greet",
                Some(
                    [("name".to_owned(), json!("Boston"))]
                        .into_iter()
                        .collect(),
                ),
            )
            .await
            .expect("render");
        assert_eq!(
            result.messages[0].content.text.as_deref(),
            Some("Hello Boston")
        );
    }

    #[test]
    fn test_prompt_spec_advertises_input_variables() {
        let template = PromptTemplate::parse(WEATHER_PROMPT).expect("parse");

        let mut registry = CapabilityRegistry::new();
        registry
            .register_prompt(template.into_spec())
            .expect("register");

        let prompts = registry.list_prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].name, "get_current_weather_for_city");
        assert_eq!(prompts[0].arguments.len(), 1);
        assert_eq!(prompts[0].arguments[0].name, "city");
        assert!(prompts[0].arguments[0].required);
    }
}
