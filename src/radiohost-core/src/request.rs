//! Generation request and conversation styles.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::audience::Audience;
use crate::error::{RadioError, Result};

/// Supported conversation length, in minutes.
pub const MIN_DURATION_MINUTES: u32 = 1;
pub const MAX_DURATION_MINUTES: u32 = 10;

/// Dialogue turns requested per minute of audio.
pub const TURNS_PER_MINUTE: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ConversationStyle {
    Informative,
    #[default]
    Conversational,
    Educational,
    Entertaining,
    StoryTelling,
}

impl ConversationStyle {
    pub fn label(&self) -> &'static str {
        match self {
            ConversationStyle::Informative => "Informative",
            ConversationStyle::Conversational => "Conversational",
            ConversationStyle::Educational => "Educational",
            ConversationStyle::Entertaining => "Entertaining",
            ConversationStyle::StoryTelling => "Story-telling",
        }
    }

    pub fn available() -> Vec<&'static str> {
        vec![
            "informative",
            "conversational",
            "educational",
            "entertaining",
            "story-telling",
        ]
    }
}

impl FromStr for ConversationStyle {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "informative" => Ok(ConversationStyle::Informative),
            "conversational" => Ok(ConversationStyle::Conversational),
            "educational" => Ok(ConversationStyle::Educational),
            "entertaining" => Ok(ConversationStyle::Entertaining),
            "story-telling" | "storytelling" | "story" => Ok(ConversationStyle::StoryTelling),
            other => Err(RadioError::InvalidRequest(format!(
                "Unknown style '{}'. Available styles: {}",
                other,
                ConversationStyle::available().join(", ")
            ))),
        }
    }
}

impl fmt::Display for ConversationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the script generator needs for one conversation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Topic of the conversation.
    pub topic: String,
    /// Source article text, already length-bounded by the caller.
    pub source_text: String,
    pub duration_minutes: u32,
    pub style: ConversationStyle,
    pub audience: Audience,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            source_text: source_text.into(),
            duration_minutes: 2,
            style: ConversationStyle::default(),
            audience: Audience::default(),
        }
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_style(mut self, style: ConversationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    /// Check the request preconditions.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(RadioError::InvalidRequest("topic must not be empty".to_string()));
        }
        if self.source_text.trim().is_empty() {
            return Err(RadioError::InvalidRequest(
                "source text must not be empty".to_string(),
            ));
        }
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes) {
            return Err(RadioError::InvalidRequest(format!(
                "duration must be between {} and {} minutes, got {}",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, self.duration_minutes
            )));
        }
        Ok(())
    }

    /// Approximate number of dialogue turns to ask for.
    pub fn target_turns(&self) -> u32 {
        self.duration_minutes * TURNS_PER_MINUTE
    }
}
