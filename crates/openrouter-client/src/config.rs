// Request configuration: generation parameters, provider routing and model selection
// Values are passed through to OpenRouter as-is; range checks are left to the upstream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OpenRouterError, Result};
use crate::types::{Tool, ToolChoice};

/// Which model(s) a request targets
///
/// Either a single (optional) model, or an ordered fallback list that
/// OpenRouter walks when a model is unavailable. The two shapes never mix:
/// a request carries `model` or `models` + `route: "fallback"`, not both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSelection {
    Fallback {
        models: Vec<String>,
        route: FallbackRoute,
    },
    Single {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackRoute {
    Fallback,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self::Single { model: None }
    }
}

impl ModelSelection {
    pub fn single(model: impl Into<String>) -> Self {
        Self::Single {
            model: Some(model.into()),
        }
    }

    /// Ordered fallback list; fails when `models` is empty
    pub fn fallback<I, S>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let models: Vec<String> = models.into_iter().map(Into::into).collect();
        if models.is_empty() {
            return Err(OpenRouterError::InvalidConfig(
                "fallback routing needs at least one model".to_string(),
            ));
        }
        Ok(Self::Fallback {
            models,
            route: FallbackRoute::Fallback,
        })
    }

    /// True for `Single { model: None }`, i.e. "let the account default decide"
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Single { model: None })
    }
}

/// Reasoning token controls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Use reasoning internally but leave it out of the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl ReasoningConfig {
    pub fn effort(effort: ReasoningEffort) -> Self {
        Self {
            effort: Some(effort),
            ..Self::default()
        }
    }

    pub fn low() -> Self {
        Self::effort(ReasoningEffort::Low)
    }

    pub fn medium() -> Self {
        Self::effort(ReasoningEffort::Medium)
    }

    pub fn high() -> Self {
        Self::effort(ReasoningEffort::High)
    }

    /// Fixed reasoning token budget instead of an effort level
    pub fn budget(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Self::default()
        }
    }

    pub fn excluded(mut self) -> Self {
        self.exclude = Some(true);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    /// JSON Schema the output must conform to
    pub schema: Value,
}

impl ResponseFormat {
    pub fn json_schema(name: impl Into<String>, strict: bool, schema: Value) -> Self {
        Self::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: name.into(),
                strict,
                schema,
            },
        }
    }
}

/// Provider routing preferences
/// See https://openrouter.ai/docs/provider-routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantizations: Option<Vec<Quantization>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection: Option<DataCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_fallbacks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_parameters: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    Int4,
    Int8,
    Fp6,
    Fp8,
    Fp16,
    Bf16,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCollection {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

/// OpenRouter-only prompt transforms (not forwarded to providers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transform {
    #[serde(rename = "middle-out")]
    MiddleOut,
}

/// Predicted output, used by some providers to cut latency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Prediction {
    Content { content: String },
}

/// Per-request configuration
///
/// Serializes to the flat JSON object the chat-completion endpoint expects.
/// `http_referer` and `x_title` travel as headers and never appear in the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub model: ModelSelection,

    #[serde(default, skip_serializing)]
    pub http_referer: Option<String>,
    #[serde(default, skip_serializing)]
    pub x_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Token id (as string) -> bias
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<BTreeMap<String, f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<Transform>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

fn pick<T: Clone>(preferred: &Option<T>, fallback: &Option<T>) -> Option<T> {
    preferred.clone().or_else(|| fallback.clone())
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = ModelSelection::single(model);
        self
    }

    /// Route over an ordered list of models; fails when the list is empty
    pub fn fallback_models<I, S>(mut self, models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model = ModelSelection::fallback(models)?;
        Ok(self)
    }

    pub fn http_referer(mut self, referer: impl Into<String>) -> Self {
        self.http_referer = Some(referer.into());
        self
    }

    pub fn x_title(mut self, title: impl Into<String>) -> Self {
        self.x_title = Some(title.into());
        self
    }

    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn reasoning(mut self, reasoning: ReasoningConfig) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn provider(mut self, provider: ProviderPreferences) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn stop(mut self, stop: StopSequences) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn transforms(mut self, transforms: Vec<Transform>) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// Field-wise merge: fields set on `overrides` win, everything else comes from `self`
    pub fn merge(&self, overrides: &Config) -> Config {
        let model = if overrides.model.is_unset() {
            self.model.clone()
        } else {
            overrides.model.clone()
        };

        Config {
            model,
            http_referer: pick(&overrides.http_referer, &self.http_referer),
            x_title: pick(&overrides.x_title, &self.x_title),
            reasoning: pick(&overrides.reasoning, &self.reasoning),
            response_format: pick(&overrides.response_format, &self.response_format),
            provider: pick(&overrides.provider, &self.provider),
            stop: pick(&overrides.stop, &self.stop),
            min_p: overrides.min_p.or(self.min_p),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            temperature: overrides.temperature.or(self.temperature),
            top_a: overrides.top_a.or(self.top_a),
            top_p: overrides.top_p.or(self.top_p),
            top_k: overrides.top_k.or(self.top_k),
            frequency_penalty: overrides.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: overrides.presence_penalty.or(self.presence_penalty),
            repetition_penalty: overrides.repetition_penalty.or(self.repetition_penalty),
            seed: overrides.seed.or(self.seed),
            logit_bias: pick(&overrides.logit_bias, &self.logit_bias),
            tools: pick(&overrides.tools, &self.tools),
            tool_choice: pick(&overrides.tool_choice, &self.tool_choice),
            transforms: pick(&overrides.transforms, &self.transforms),
            prediction: pick(&overrides.prediction, &self.prediction),
        }
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if let ModelSelection::Fallback { models, .. } = &self.model {
            if models.is_empty() {
                return Err(OpenRouterError::InvalidConfig(
                    "fallback routing needs at least one model".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Load a config from a TOML document
    ///
    /// ```toml
    /// models = ["anthropic/claude-3.5-sonnet", "openai/gpt-4o"]
    /// route = "fallback"
    /// temperature = 0.7
    ///
    /// [provider]
    /// order = ["Anthropic"]
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| OpenRouterError::InvalidConfig(e.to_string()))?;

        if table.contains_key("model") && table.contains_key("models") {
            return Err(OpenRouterError::InvalidConfig(
                "`model` and `models` are mutually exclusive".to_string(),
            ));
        }

        let config: Config = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| OpenRouterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_model_serializes_flat() {
        let config = Config::new().model("openai/gpt-4o").temperature(0.5);
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value, json!({"model": "openai/gpt-4o", "temperature": 0.5}));
    }

    #[test]
    fn test_fallback_serializes_models_and_route() {
        let config = Config::new()
            .fallback_models(["a/one", "b/two"])
            .unwrap();
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value, json!({"models": ["a/one", "b/two"], "route": "fallback"}));
        assert!(value.get("model").is_none());
    }

    #[test]
    fn test_empty_fallback_rejected() {
        let result = Config::new().fallback_models(Vec::<String>::new());
        assert!(matches!(result, Err(OpenRouterError::InvalidConfig(_))));
    }

    #[test]
    fn test_reasoning_budget_excluded() {
        let config = Config::new().reasoning(ReasoningConfig::budget(2048).excluded());
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value, json!({"reasoning": {"max_tokens": 2048, "exclude": true}}));
    }

    #[test]
    fn test_headers_not_serialized() {
        let config = Config::new().http_referer("https://example.com").x_title("Demo");
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let defaults = Config::new()
            .model("default/model")
            .temperature(0.2)
            .max_tokens(100)
            .x_title("Default");
        let overrides = Config::new().temperature(1.1);

        let merged = defaults.merge(&overrides);

        assert_eq!(merged.model, ModelSelection::single("default/model"));
        assert_eq!(merged.temperature, Some(1.1));
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.x_title.as_deref(), Some("Default"));
    }

    #[test]
    fn test_merge_fallback_override_replaces_single() {
        let defaults = Config::new().model("default/model");
        let overrides = Config::new().fallback_models(["x/y"]).unwrap();

        let merged = defaults.merge(&overrides);

        assert!(matches!(merged.model, ModelSelection::Fallback { .. }));
    }

    #[test]
    fn test_from_toml_fallback() {
        let config = Config::from_toml_str(
            r#"
            models = ["a/one", "b/two"]
            route = "fallback"
            temperature = 0.7
            x_title = "My App"

            [provider]
            order = ["Anthropic", "OpenAI"]
            quantizations = ["fp8", "bf16"]
            data_collection = "deny"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.model,
            ModelSelection::Fallback {
                models: vec!["a/one".to_string(), "b/two".to_string()],
                route: FallbackRoute::Fallback,
            }
        );
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.x_title.as_deref(), Some("My App"));

        let provider = config.provider.unwrap();
        assert_eq!(provider.quantizations, Some(vec![Quantization::Fp8, Quantization::Bf16]));
        assert_eq!(provider.data_collection, Some(DataCollection::Deny));
    }

    #[test]
    fn test_from_toml_rejects_model_and_models() {
        let result = Config::from_toml_str(
            r#"
            model = "a/one"
            models = ["b/two"]
            route = "fallback"
            "#,
        );

        assert!(matches!(result, Err(OpenRouterError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_toml_rejects_empty_models() {
        let result = Config::from_toml_str(
            r#"
            models = []
            route = "fallback"
            "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_response_format_and_prediction_shapes() {
        let config = Config {
            response_format: Some(ResponseFormat::JsonObject),
            prediction: Some(Prediction::Content {
                content: "draft".to_string(),
            }),
            transforms: Some(vec![Transform::MiddleOut]),
            stop: Some(StopSequences::One("END".to_string())),
            ..Config::default()
        };
        let value = serde_json::to_value(&config).unwrap();

        assert_eq!(value["response_format"], json!({"type": "json_object"}));
        assert_eq!(value["prediction"], json!({"type": "content", "content": "draft"}));
        assert_eq!(value["transforms"], json!(["middle-out"]));
        assert_eq!(value["stop"], json!("END"));
    }
}
