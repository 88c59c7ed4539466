// ABOUTME: Sample weather capabilities registered through the capstan public API
// ABOUTME: Builds the registry (tool, prompt, resources) and the shared service map

// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 dravr.ai

use capstan::{
    CapabilityRegistry, McpError, ParamSpec, PromptTemplate, ResourceBody, ResourceSpec,
    ResourceTemplateSpec, ServiceMap, ToolOutput, ToolSpec,
};
use tracing::debug;

/// Prompt template config embedded at compile time
const WEATHER_PROMPT_JSON: &str = include_str!("../prompts/get_current_weather_for_city.json");

/// Cities with curated conditions; any other city falls through to the default
const KNOWN_CITIES: [&str; 7] = [
    "Boston", "London", "Miami", "Paris", "Tokyo", "Sydney", "Tel Aviv",
];

/// Smallest valid transparent PNG (1x1 RGBA), served as the mascot blob
pub const MASCOT_PNG: &[u8] = &[
    // PNG signature
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A,
    // IHDR: 1x1, 8-bit RGBA
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89,
    // IDAT: one fully transparent pixel
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4,
    // IEND
    0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// City-to-conditions lookup shared by the weather tool and forecast resource
///
/// Lives in the [`ServiceMap`] so handlers reach it through
/// `ctx.require_service::<CityConditions>()` instead of capturing globals.
#[derive(Debug, Default)]
pub struct CityConditions;

impl CityConditions {
    /// Current conditions for a city; unknown cities get the default report
    #[must_use]
    pub fn current(&self, city: &str) -> &'static str {
        match city {
            "Boston" => "61 and rainy",
            "London" => "55 and cloudy",
            "Miami" => "80 and sunny",
            "Paris" => "60 and rainy",
            "Tokyo" => "50 and sunny",
            "Sydney" => "75 and sunny",
            "Tel Aviv" => "80 and sunny",
            _ => "31 and snowing",
        }
    }
}

/// Build the service map handlers resolve their dependencies from
#[must_use]
pub fn build_services() -> ServiceMap {
    ServiceMap::new().with(CityConditions)
}

/// Build the full weather capability registry
///
/// # Errors
///
/// Returns a `Configuration` error when a registration is invalid; with the
/// fixed set below that only happens if the embedded prompt JSON is edited
/// into an invalid shape.
pub fn build_registry() -> Result<CapabilityRegistry, McpError> {
    let mut registry = CapabilityRegistry::new();

    registry.register_tool(
        ToolSpec::new(
            "get_weather_for_city",
            "Gets the current weather for the specified city and specified date time.",
        )
        .with_param(ParamSpec::required("cityName", "The name of the city"))
        .with_param(ParamSpec::required(
            "currentDateTimeInUtc",
            "The current date and time in UTC",
        ))
        .with_handler(|ctx, args| async move {
            let conditions = ctx.require_service::<CityConditions>()?;
            let city = args.require_text("cityName")?;
            let as_of = args.require_text("currentDateTimeInUtc")?;
            debug!(city, as_of, "Weather lookup");
            Ok(ToolOutput::Text(conditions.current(city).to_owned()))
        }),
    )?;

    registry.register_prompt(PromptTemplate::parse(WEATHER_PROMPT_JSON)?.into_spec())?;

    registry.register_resource(
        ResourceSpec::static_text(
            "weather://cities",
            "known_cities",
            "text/plain",
            KNOWN_CITIES.join("\n"),
        )
        .with_description("Cities with curated weather conditions"),
    )?;

    registry.register_resource(
        ResourceSpec::static_blob(
            "weather://mascot",
            "weather_mascot",
            "image/png",
            MASCOT_PNG.to_vec(),
        )
        .with_description("The weather service mascot"),
    )?;

    registry.register_resource_template(
        ResourceTemplateSpec::new("weather://forecast/{city}", "city_forecast")
            .with_description("Current conditions for the city named in the URI")
            .with_mime_type("text/plain")
            .with_handler(|ctx, args| async move {
                let conditions = ctx.require_service::<CityConditions>()?;
                let city = args.require_text("city")?;
                Ok(ResourceBody::Text(format!(
                    "The weather in {city} is {}.",
                    conditions.current(city)
                )))
            }),
    )?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use capstan::CancellationToken;
    use serde_json::json;

    use super::*;

    fn call_args(pairs: &[(&str, &str)]) -> serde_json::Map<String, serde_json::Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), json!(v)))
            .collect()
    }

    #[test]
    fn test_known_cities_have_curated_conditions() {
        let conditions = CityConditions;
        assert_eq!(conditions.current("Boston"), "61 and rainy");
        assert_eq!(conditions.current("London"), "55 and cloudy");
        assert_eq!(conditions.current("Miami"), "80 and sunny");
        assert_eq!(conditions.current("Paris"), "60 and rainy");
        assert_eq!(conditions.current("Tokyo"), "50 and sunny");
        assert_eq!(conditions.current("Sydney"), "75 and sunny");
        assert_eq!(conditions.current("Tel Aviv"), "80 and sunny");
    }

    #[test]
    fn test_unknown_city_gets_default_conditions() {
        let conditions = CityConditions;
        assert_eq!(conditions.current("Reykjavik"), "31 and snowing");
        assert_eq!(conditions.current(""), "31 and snowing");
    }

    #[test]
    fn test_mascot_png_carries_signature() {
        assert_eq!(&MASCOT_PNG[..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert_eq!(MASCOT_PNG.len(), 67);
    }

    #[test]
    fn test_registry_advertises_all_capability_classes() {
        let registry = build_registry().expect("build");
        assert!(registry.has_tools());
        assert!(registry.has_prompts());
        assert!(registry.has_resources());

        let tools = registry.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_weather_for_city");

        let resources = registry.list_resources();
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].uri, "weather://cities");
        assert_eq!(resources[1].uri, "weather://mascot");

        let templates = registry.list_resource_templates();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].uri_template, "weather://forecast/{city}");
    }

    #[tokio::test]
    async fn test_weather_tool_returns_conditions() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let result = registry
            .call_tool(
                &services,
                CancellationToken::new(),
                "get_weather_for_city",
                Some(call_args(&[
                    ("cityName", "Paris"),
                    ("currentDateTimeInUtc", "2026-02-11T10:30:00Z"),
                ])),
            )
            .await
            .expect("call");

        assert!(result.is_error.is_none());
        assert_eq!(result.content[0].text, "60 and rainy");
    }

    #[tokio::test]
    async fn test_weather_tool_requires_both_params() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let err = registry
            .call_tool(
                &services,
                CancellationToken::new(),
                "get_weather_for_city",
                Some(call_args(&[("cityName", "Paris")])),
            )
            .await
            .expect_err("binding must fail");
        assert!(err.message.contains("currentDateTimeInUtc"));
    }

    #[tokio::test]
    async fn test_prompt_renders_city_question() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let result = registry
            .get_prompt(
                &services,
                CancellationToken::new(),
                "get_current_weather_for_city",
                Some(call_args(&[("city", "Tokyo")])),
            )
            .await
            .expect("render");

        assert_eq!(result.messages.len(), 1);
        assert_eq!(
            result.messages[0].content.text.as_deref(),
            Some("What is the current weather in Tokyo?")
        );
    }

    #[tokio::test]
    async fn test_forecast_template_resolves_city_from_uri() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let result = registry
            .read_resource(
                &services,
                CancellationToken::new(),
                "weather://forecast/Sydney",
            )
            .await
            .expect("read");

        assert_eq!(result.contents.len(), 1);
        assert_eq!(result.contents[0].uri, "weather://forecast/Sydney");
        assert_eq!(
            result.contents[0].text.as_deref(),
            Some("The weather in Sydney is 75 and sunny.")
        );
    }

    #[tokio::test]
    async fn test_cities_resource_lists_known_cities() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let result = registry
            .read_resource(&services, CancellationToken::new(), "weather://cities")
            .await
            .expect("read");

        let body = result.contents[0].text.as_deref().expect("text body");
        for city in KNOWN_CITIES {
            assert!(body.contains(city), "missing {city}");
        }
    }

    #[tokio::test]
    async fn test_mascot_resource_is_base64_png() {
        let registry = build_registry().expect("build");
        let services = Arc::new(build_services());

        let result = registry
            .read_resource(&services, CancellationToken::new(), "weather://mascot")
            .await
            .expect("read");

        assert_eq!(result.contents[0].mime_type.as_deref(), Some("image/png"));
        let blob = result.contents[0].blob.as_deref().expect("blob body");
        // Base64 of the PNG signature prefix
        assert!(blob.starts_with("iVBORw0KGgo"));
    }
}
