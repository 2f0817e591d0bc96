//! Audience profiles.
//!
//! Each audience carries the guidance that shapes the prompt, plus the
//! prosody and pause defaults the assembler uses when voicing a turn.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Target listener group for a generated conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Audience {
    Kids,
    Teenagers,
    #[default]
    Adults,
    Elderly,
}

/// Static guidance bundle used when rendering the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudienceProfile {
    pub vocabulary: &'static str,
    pub tone: &'static str,
    pub examples: &'static str,
    pub complexity: &'static str,
}

const KIDS: AudienceProfile = AudienceProfile {
    vocabulary: "Simple words, short sentences",
    tone: "Energetic, playful, lots of examples",
    examples: "jaise, achha, dekho, suno",
    complexity: "Very basic concepts only",
};

const TEENAGERS: AudienceProfile = AudienceProfile {
    vocabulary: "Modern slang, trendy words",
    tone: "Casual, relatable, fast-paced",
    examples: "matlab, basically, literally, cool hai",
    complexity: "Moderate depth with pop culture refs",
};

const ADULTS: AudienceProfile = AudienceProfile {
    vocabulary: "Professional yet conversational",
    tone: "Informative but friendly",
    examples: "actually, technically, samajh rahe ho",
    complexity: "Detailed explanations with context",
};

const ELDERLY: AudienceProfile = AudienceProfile {
    vocabulary: "Clear, respectful, traditional",
    tone: "Slow-paced, respectful, storytelling",
    examples: "aap samajh rahe hain, dhyaan se suniye",
    complexity: "Simple with life experience connections",
};

impl Audience {
    pub const ALL: [Audience; 4] = [
        Audience::Kids,
        Audience::Teenagers,
        Audience::Adults,
        Audience::Elderly,
    ];

    /// Look up an audience by key. Unknown keys fall back to `Adults`.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "kids" | "kid" | "children" => Audience::Kids,
            "teenagers" | "teens" | "teen" => Audience::Teenagers,
            "adults" | "adult" => Audience::Adults,
            "elderly" | "elders" | "seniors" => Audience::Elderly,
            other => {
                warn!(audience = other, "unknown audience, using Adults profile");
                Audience::default()
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Audience::Kids => "Kids",
            Audience::Teenagers => "Teenagers",
            Audience::Adults => "Adults",
            Audience::Elderly => "Elderly",
        }
    }

    pub fn profile(&self) -> &'static AudienceProfile {
        match self {
            Audience::Kids => &KIDS,
            Audience::Teenagers => &TEENAGERS,
            Audience::Adults => &ADULTS,
            Audience::Elderly => &ELDERLY,
        }
    }

    /// Pause inserted between turns when the caller does not override it.
    pub fn pause_seconds(&self) -> f32 {
        match self {
            Audience::Elderly => 0.7,
            _ => 0.5,
        }
    }

    /// Baseline speaking rate (percent) and pitch (Hz) offsets.
    fn base_prosody(&self) -> Prosody {
        match self {
            Audience::Kids => Prosody::new(15, 10),
            Audience::Teenagers => Prosody::new(10, 5),
            Audience::Adults => Prosody::new(5, 0),
            Audience::Elderly => Prosody::new(-10, -5),
        }
    }

    /// Prosody for a turn, given which emotion markers its raw text carried.
    ///
    /// Lively markers add 5% rate and 10Hz pitch on top of the magnitude of
    /// the baseline, so an Elderly turn with `*laughs*` becomes `+15%`/`+15Hz`.
    /// A sigh slows the turn to `-5%` and leaves pitch alone.
    pub fn prosody(&self, lively: bool, sigh: bool) -> Prosody {
        let base = self.base_prosody();
        if lively {
            Prosody::new(base.rate_percent.abs() + 5, base.pitch_hz.abs() + 10)
        } else if sigh {
            Prosody::new(-5, base.pitch_hz)
        } else {
            base
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Speaking rate and pitch offsets applied to one synthesized turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prosody {
    pub rate_percent: i32,
    pub pitch_hz: i32,
}

impl Prosody {
    pub fn new(rate_percent: i32, pitch_hz: i32) -> Self {
        Self {
            rate_percent,
            pitch_hz,
        }
    }

    /// Rate as a signed percentage string, e.g. `+15%`.
    pub fn rate_string(&self) -> String {
        format!("{:+}%", self.rate_percent)
    }

    /// Pitch as a signed offset string, e.g. `-5Hz`.
    pub fn pitch_string(&self) -> String {
        format!("{:+}Hz", self.pitch_hz)
    }

    /// Rate as a playback speed multiplier for engines that take one.
    pub fn speed_factor(&self) -> f32 {
        (1.0 + self.rate_percent as f32 / 100.0).max(0.25)
    }
}
