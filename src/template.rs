// ABOUTME: URI template compilation and matching with named `{placeholder}` captures
// ABOUTME: Turns declarative path templates into anchored matchers that extract segment values

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use regex::Regex;
use tracing::debug;

use crate::error::McpError;

/// A compiled URI template matcher
///
/// A template is literal text with zero or more `{name}` placeholders. Each
/// placeholder matches one path segment (one or more characters excluding
/// `/`). Literal text matches exactly and case-sensitively. A template with
/// no placeholders degenerates to exact string equality.
///
/// Compilation happens once, at registration time; matching is read-only
/// and lock-free afterwards.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    pattern: Regex,
    variables: Vec<String>,
}

impl UriTemplate {
    /// Compile a URI template into a matcher
    ///
    /// Placeholder names must be identifier-safe (`[A-Za-z_][A-Za-z0-9_]*`)
    /// and unique within the template. Unbalanced or nested braces are
    /// rejected.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for malformed templates.
    pub fn compile(template: &str) -> Result<Self, McpError> {
        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');

        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    pattern.push_str(&regex::escape(&literal));
                    literal.clear();

                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => {
                                return Err(McpError::configuration(format!(
                                    "Nested '{{' in URI template: {template}"
                                )));
                            }
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(McpError::configuration(format!(
                                    "Unbalanced '{{' in URI template: {template}"
                                )));
                            }
                        }
                    }

                    if !is_identifier_safe(&name) {
                        return Err(McpError::configuration(format!(
                            "Invalid placeholder name '{name}' in URI template: {template}"
                        )));
                    }
                    if variables.iter().any(|v| v == &name) {
                        return Err(McpError::configuration(format!(
                            "Duplicate placeholder '{name}' in URI template: {template}"
                        )));
                    }

                    pattern.push_str("(?P<");
                    pattern.push_str(&name);
                    pattern.push_str(">[^/]+)");
                    variables.push(name);
                }
                '}' => {
                    return Err(McpError::configuration(format!(
                        "Unbalanced '}}' in URI template: {template}"
                    )));
                }
                other => literal.push(other),
            }
        }
        pattern.push_str(&regex::escape(&literal));
        pattern.push('$');

        let compiled = Regex::new(&pattern).map_err(|e| {
            McpError::configuration(format!("URI template '{template}' failed to compile: {e}"))
        })?;

        debug!(
            template,
            pattern,
            variable_count = variables.len(),
            "Compiled URI template"
        );

        Ok(Self {
            template: template.to_owned(),
            pattern: compiled,
            variables,
        })
    }

    /// Match a concrete URI, extracting one captured value per placeholder
    ///
    /// Returns captures in template order, or `None` when the URI does not
    /// match. Non-matching is never an error.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<Vec<(String, String)>> {
        let caps = self.pattern.captures(uri)?;
        let mut captured = Vec::with_capacity(self.variables.len());
        for name in &self.variables {
            // Every placeholder group is non-optional, so a whole-pattern
            // match always carries a value for it.
            let value = caps.name(name)?.as_str().to_owned();
            captured.push((name.clone(), value));
        }
        Some(captured)
    }

    /// Whether the URI matches this template
    #[must_use]
    pub fn is_match(&self, uri: &str) -> bool {
        self.pattern.is_match(uri)
    }

    /// Placeholder names, in template order
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The original template string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Whether the template has no placeholders (matches one exact URI)
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Whether a placeholder name is restricted to identifier-safe characters
fn is_identifier_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
