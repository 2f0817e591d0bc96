//! Configuration module for loading TOML config files.
//!
//! Every section is optional; missing values take the built-in defaults.
//! API keys never live here, they come from the environment.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::assembler::{EmotionMarkers, OutputContainer, VoiceTable};
use crate::audience::Audience;
use crate::error::RadioError;
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, PromptTemplate};
use crate::provider::{CompletionParams, ProviderKind};
use crate::tts::{AudioFormat, DEFAULT_SAMPLE_RATE};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub voices: VoiceTable,
    pub audio: AudioConfig,
    pub prompts: PromptsConfig,
    pub markers: MarkersConfig,
}

/// Chat-completion backend and decoding settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Overrides the provider's default model.
    pub model: Option<String>,
    /// Overrides the provider's default endpoint.
    pub api_base: Option<String>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let params = CompletionParams::default();
        Self {
            provider: ProviderKind::default(),
            model: None,
            api_base: None,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
        }
    }
}

impl LlmConfig {
    pub fn params(&self) -> CompletionParams {
        CompletionParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }
}

/// PCM layout and pause settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bytes_per_sample: u16,
    /// Pause between turns in seconds; the audience default when unset.
    pub pause_seconds: Option<f32>,
    pub container: OutputContainer,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bytes_per_sample: 2,
            pause_seconds: None,
            container: OutputContainer::default(),
        }
    }
}

impl AudioConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            bytes_per_sample: self.bytes_per_sample,
        }
    }

    /// Pause between turns for `audience`.
    pub fn pause_for(&self, audience: Audience) -> Duration {
        let secs = self.pause_seconds.unwrap_or_else(|| audience.pause_seconds());
        Duration::from_millis((secs * 1000.0).round() as u64)
    }
}

/// System prompt and optional template override.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: String,
    pub template: Option<String>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            template: None,
        }
    }
}

/// Extra emotion markers to strip before synthesis.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MarkersConfig {
    pub extra: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RadioError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| RadioError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, RadioError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| RadioError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce nonsense audio or requests.
    pub fn validate(&self) -> Result<(), RadioError> {
        if self.audio.sample_rate == 0 {
            return Err(RadioError::Config("audio.sample_rate must be positive".to_string()));
        }
        if ![1, 2, 4].contains(&self.audio.bytes_per_sample) {
            return Err(RadioError::Config(format!(
                "audio.bytes_per_sample must be 1, 2 or 4, got {}",
                self.audio.bytes_per_sample
            )));
        }
        if let Some(pause) = self.audio.pause_seconds {
            if !(0.0..=10.0).contains(&pause) {
                return Err(RadioError::Config(format!(
                    "audio.pause_seconds must be between 0 and 10, got {}",
                    pause
                )));
            }
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(RadioError::Config(format!(
                "llm.temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(RadioError::Config("llm.max_tokens must be positive".to_string()));
        }
        for (name, voice) in ["rajesh", "priya", "default"].iter().zip(self.voices.all()) {
            if voice.trim().is_empty() {
                return Err(RadioError::Config(format!("voices.{} must not be empty", name)));
            }
        }
        Ok(())
    }

    /// Prompt template with any configured overrides applied.
    pub fn prompt_template(&self) -> PromptTemplate {
        let mut template = PromptTemplate {
            system: self.prompts.system.clone(),
            ..PromptTemplate::default()
        };
        if let Some(body) = &self.prompts.template {
            template.body = body.clone();
        }
        template
    }

    pub fn emotion_markers(&self) -> EmotionMarkers {
        EmotionMarkers::with_extra(self.markers.extra.iter().cloned())
    }
}

/// Default configuration embedded in the binary.
pub fn default_config() -> Config {
    Config::default()
}
