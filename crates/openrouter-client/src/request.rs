// Request Builder: turns messages + configuration into a transport-ready request

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde_json::Value;

use crate::config::Config;
use crate::error::{OpenRouterError, Result};
use crate::types::Message;

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

const HTTP_REFERER: HeaderName = HeaderName::from_static("http-referer");
const X_TITLE: HeaderName = HeaderName::from_static("x-title");

/// A conversation plus optional per-call configuration
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub config: Option<Config>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            config: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }
}

/// Everything the transport needs to issue one HTTP request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    /// Attach this descriptor to a reqwest client
    pub fn into_request(self, http: &reqwest::Client) -> reqwest::RequestBuilder {
        let builder = http.request(self.method, self.url).headers(self.headers);
        match self.body {
            Some(body) => builder.json(&body),
            None => builder,
        }
    }
}

/// Resolve the effective config for a call: the client default, overlaid by the call's own config
pub fn resolve_config(default: &Config, overrides: Option<&Config>) -> Config {
    match overrides {
        Some(overrides) => default.merge(overrides),
        None => default.clone(),
    }
}

/// Header set: JSON content type, bearer auth, plus the optional attribution headers
pub fn build_headers(api_key: &str, config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key), "API key")?);

    if let Some(referer) = &config.http_referer {
        headers.insert(HTTP_REFERER, header_value(referer, "HTTP-Referer")?);
    }
    if let Some(title) = &config.x_title {
        headers.insert(X_TITLE, header_value(title, "X-Title")?);
    }

    Ok(headers)
}

/// JSON body: the configuration object with `messages` (and `stream`) injected
pub fn build_body(messages: &[Message], config: &Config, stream: bool) -> Result<Value> {
    let mut body = serde_json::to_value(config)?;

    let obj = body.as_object_mut().ok_or_else(|| {
        OpenRouterError::InvalidConfig("configuration must serialize to a JSON object".to_string())
    })?;
    obj.insert("messages".to_string(), serde_json::to_value(messages)?);
    if stream {
        obj.insert("stream".to_string(), Value::Bool(true));
    }

    Ok(body)
}

/// POST {base}/chat/completions
pub fn build_chat_request(
    base_url: &str,
    api_key: &str,
    messages: &[Message],
    config: &Config,
    stream: bool,
) -> Result<RequestDescriptor> {
    let url = parse_url(&format!("{}/chat/completions", base_url.trim_end_matches('/')))?;

    Ok(RequestDescriptor {
        method: Method::POST,
        url,
        headers: build_headers(api_key, config)?,
        body: Some(build_body(messages, config, stream)?),
    })
}

/// GET {base}/generation?id=<id>
pub fn build_generation_request(
    base_url: &str,
    api_key: &str,
    generation_id: &str,
) -> Result<RequestDescriptor> {
    let url = Url::parse_with_params(
        &format!("{}/generation", base_url.trim_end_matches('/')),
        &[("id", generation_id)],
    )
    .map_err(|e| OpenRouterError::InvalidConfig(format!("Invalid base URL: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key), "API key")?);

    Ok(RequestDescriptor {
        method: Method::GET,
        url,
        headers,
        body: None,
    })
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| OpenRouterError::InvalidConfig(format!("Invalid base URL: {}", e)))
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| OpenRouterError::InvalidConfig(format!("Invalid {} header value", what)))
}
