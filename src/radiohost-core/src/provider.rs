//! Chat-completion providers.
//!
//! The script generator only depends on [`ChatCompletionProvider`]. Groq,
//! Gemini and OpenAI all expose OpenAI-compatible endpoints, so a single
//! adapter parametrized by [`ProviderKind`] covers them.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RadioError, Result};

/// Decoding parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 4096,
        }
    }
}

/// A service that turns a prompt into response text.
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send `prompt` with the `system` instruction and return the raw reply.
    async fn complete(&self, prompt: &str, system: &str, params: &CompletionParams)
        -> Result<String>;
}

/// Backend selection for [`OpenAiCompatibleProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
    /// Any other OpenAI-compatible endpoint; needs an explicit base URL.
    Custom,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Custom => "custom",
        }
    }

    pub fn default_api_base(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("https://api.groq.com/openai/v1"),
            ProviderKind::Gemini => Some("https://generativelanguage.googleapis.com/v1beta/openai"),
            ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            ProviderKind::Custom => None,
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("llama-3.3-70b-versatile"),
            ProviderKind::Gemini => Some("gemini-2.0-flash"),
            ProviderKind::OpenAi => Some("gpt-4o-mini"),
            ProviderKind::Custom => None,
        }
    }

    /// Environment variables checked for an API key, in order.
    pub fn api_key_vars(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::Groq => &["GROQ_API_KEY", "RADIOHOST_API_KEY"],
            ProviderKind::Gemini => &["GEMINI_API_KEY", "GOOGLE_API_KEY", "RADIOHOST_API_KEY"],
            ProviderKind::OpenAi => &["OPENAI_API_KEY", "RADIOHOST_API_KEY"],
            ProviderKind::Custom => &["RADIOHOST_API_KEY", "OPENAI_API_KEY"],
        }
    }

    pub fn available() -> Vec<&'static str> {
        vec!["groq", "gemini", "openai", "custom"]
    }
}

impl FromStr for ProviderKind {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(ProviderKind::Groq),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "custom" => Ok(ProviderKind::Custom),
            other => Err(RadioError::Config(format!(
                "Unknown provider '{}'. Available providers: {}",
                other,
                ProviderKind::available().join(", ")
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chat-completion adapter for OpenAI-compatible APIs.
pub struct OpenAiCompatibleProvider {
    kind: ProviderKind,
    model: String,
    client: Client<OpenAIConfig>,
}

impl OpenAiCompatibleProvider {
    /// Build an adapter, filling in the base URL and model from `kind`
    /// when they are not given.
    pub fn new(
        kind: ProviderKind,
        api_key: impl Into<String>,
        api_base: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let api_base = api_base
            .or_else(|| kind.default_api_base().map(str::to_string))
            .ok_or_else(|| {
                RadioError::Config(format!("provider '{kind}' requires an api_base"))
            })?;
        let model = model
            .or_else(|| kind.default_model().map(str::to_string))
            .ok_or_else(|| RadioError::Config(format!("provider '{kind}' requires a model")))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RadioError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base);

        let client = Client::with_config(config).with_http_client(http_client);

        Ok(Self {
            kind,
            model,
            client,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        params: &CompletionParams,
    ) -> Result<String> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: system.to_string().into(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: prompt.to_string().into(),
                name: None,
            }),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(params.temperature)
            .top_p(params.top_p)
            .max_completion_tokens(params.max_tokens)
            .build()
            .map_err(|e| RadioError::InvalidRequest(format!("Failed to build request: {}", e)))?;

        debug!(provider = %self.kind, model = %self.model, "sending chat completion");

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(RadioError::Transport {
                status: None,
                message: format!("{} returned an empty response", self.kind),
            });
        }

        Ok(content)
    }
}

fn map_openai_error(err: OpenAIError) -> RadioError {
    match err {
        OpenAIError::ApiError(api) => {
            classify_api_error(&api.message, api.r#type.as_deref(), api.code.as_deref())
        }
        OpenAIError::Reqwest(e) => RadioError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        },
        other => RadioError::Transport {
            status: None,
            message: other.to_string(),
        },
    }
}

/// Decide whether an API error body describes quota exhaustion.
fn classify_api_error(message: &str, kind: Option<&str>, code: Option<&str>) -> RadioError {
    let mentions_limit = |s: &str| {
        let s = s.to_lowercase();
        s.contains("rate_limit") || s.contains("rate limit") || s.contains("resource_exhausted")
    };

    let limited = code.is_some_and(mentions_limit)
        || kind.is_some_and(mentions_limit)
        || mentions_limit(message);

    if limited {
        RadioError::RateLimited {
            retry_after: parse_retry_hint(message),
            message: message.to_string(),
        }
    } else {
        RadioError::Transport {
            status: None,
            message: message.to_string(),
        }
    }
}

static RETRY_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in ([0-9][0-9hms.]*)").expect("retry hint pattern is valid")
});

/// Parse hints such as "Please try again in 7.5s" or "try again in 1m2.5s".
pub(crate) fn parse_retry_hint(message: &str) -> Option<Duration> {
    let token = RETRY_HINT.captures(message)?.get(1)?.as_str();
    parse_compound_duration(token.trim_end_matches('.'))
}

/// Parse `1h2m3.5s` / `450ms` style durations.
fn parse_compound_duration(token: &str) -> Option<Duration> {
    let mut total = 0.0_f64;
    let mut number = String::new();
    let mut chars = token.chars().peekable();
    let mut matched = false;

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }
        let value: f64 = number.parse().ok()?;
        number.clear();
        let seconds = match c {
            'h' => value * 3600.0,
            'm' if chars.peek() == Some(&'s') => {
                chars.next();
                value / 1000.0
            }
            'm' => value * 60.0,
            's' => value,
            _ => return None,
        };
        total += seconds;
        matched = true;
    }

    // A dangling number without a unit is read as seconds.
    if !number.is_empty() {
        total += number.parse::<f64>().ok()?;
        matched = true;
    }

    matched.then(|| Duration::from_millis((total * 1000.0).round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("Groq".parse::<ProviderKind>().unwrap(), ProviderKind::Groq);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert!(matches!(
            "bard".parse::<ProviderKind>(),
            Err(RadioError::Config(_))
        ));
    }

    #[test]
    fn test_provider_defaults() {
        assert_eq!(
            ProviderKind::Groq.default_model(),
            Some("llama-3.3-70b-versatile")
        );
        assert!(ProviderKind::Gemini.default_api_base().unwrap().contains("openai"));
        assert!(ProviderKind::Custom.default_api_base().is_none());
        assert_eq!(ProviderKind::Groq.api_key_vars()[0], "GROQ_API_KEY");
    }

    #[test]
    fn test_custom_provider_requires_base() {
        let result = OpenAiCompatibleProvider::new(ProviderKind::Custom, "key", None, None);
        assert!(matches!(result, Err(RadioError::Config(_))));
    }

    #[test]
    fn test_adapter_fills_defaults() {
        let provider = OpenAiCompatibleProvider::new(ProviderKind::Groq, "key", None, None).unwrap();
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
        assert_eq!(provider.name(), "groq");

        let provider = OpenAiCompatibleProvider::new(
            ProviderKind::OpenAi,
            "key",
            None,
            Some("gpt-4.1".to_string()),
        )
        .unwrap();
        assert_eq!(provider.model(), "gpt-4.1");
    }

    #[test]
    fn test_classify_rate_limit_with_hint() {
        let err = classify_api_error(
            "Rate limit reached for model llama-3.3-70b-versatile. Please try again in 7.5s.",
            Some("tokens"),
            Some("rate_limit_exceeded"),
        );
        match err {
            RadioError::RateLimited { retry_after, .. } => {
                assert_eq!(retry_after, Some(Duration::from_millis(7500)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_other_api_error() {
        let err = classify_api_error("Invalid API Key", Some("invalid_request_error"), None);
        assert!(matches!(err, RadioError::Transport { .. }));
    }

    #[test]
    fn test_parse_retry_hint_formats() {
        assert_eq!(
            parse_retry_hint("Please try again in 1m2.5s."),
            Some(Duration::from_millis(62_500))
        );
        assert_eq!(
            parse_retry_hint("try again in 450ms"),
            Some(Duration::from_millis(450))
        );
        assert_eq!(parse_retry_hint("try again in 3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_retry_hint("quota exceeded"), None);
    }
}
