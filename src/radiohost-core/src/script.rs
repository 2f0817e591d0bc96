//! Dialogue script model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Speaking rate used to estimate audio length from a script.
pub const WORDS_PER_MINUTE: usize = 150;

/// One of the two fixed hosts, or a name the model invented.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Speaker {
    /// Male host.
    Rajesh,
    /// Female co-host.
    Priya,
    Other(String),
}

impl Speaker {
    pub fn name(&self) -> &str {
        match self {
            Speaker::Rajesh => "Rajesh",
            Speaker::Priya => "Priya",
            Speaker::Other(name) => name,
        }
    }

    pub fn is_host(&self) -> bool {
        !matches!(self, Speaker::Other(_))
    }
}

impl From<&str> for Speaker {
    fn from(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("rajesh") {
            Speaker::Rajesh
        } else if trimmed.eq_ignore_ascii_case("priya") {
            Speaker::Priya
        } else {
            Speaker::Other(trimmed.to_string())
        }
    }
}

impl From<String> for Speaker {
    fn from(name: String) -> Self {
        Speaker::from(name.as_str())
    }
}

impl From<Speaker> for String {
    fn from(speaker: Speaker) -> Self {
        speaker.name().to_string()
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single attributed line of dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl DialogueTurn {
    pub fn new(speaker: impl Into<Speaker>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// A validated two-host conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub dialogue: Vec<DialogueTurn>,
}

impl Script {
    pub fn word_count(&self) -> usize {
        self.dialogue
            .iter()
            .map(|turn| turn.text.split_whitespace().count())
            .sum()
    }

    /// Rough spoken length of the whole dialogue.
    pub fn estimated_duration(&self) -> Duration {
        Duration::from_secs_f64(self.word_count() as f64 * 60.0 / WORDS_PER_MINUTE as f64)
    }

    /// True when no speaker talks twice in a row.
    pub fn speakers_alternate(&self) -> bool {
        self.dialogue
            .windows(2)
            .all(|pair| pair[0].speaker != pair[1].speaker)
    }
}

/// Format a duration as `m:ss`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Script {
        Script {
            title: "ISRO ki kahani".to_string(),
            description: String::new(),
            dialogue: vec![
                DialogueTurn::new("Rajesh", "Namaste doston! Aaj hum ISRO ki baat karenge."),
                DialogueTurn::new("Priya", "Haan Rajesh, bahut interesting topic hai."),
                DialogueTurn::new("Rajesh", "Chandrayaan mission toh sabko yaad hai!"),
            ],
        }
    }

    #[test]
    fn test_speaker_from_name() {
        assert_eq!(Speaker::from("rajesh"), Speaker::Rajesh);
        assert_eq!(Speaker::from(" Priya "), Speaker::Priya);
        assert_eq!(Speaker::from("Host"), Speaker::Other("Host".to_string()));
        assert!(!Speaker::from("Host").is_host());
    }

    #[test]
    fn test_speaker_serializes_as_name() {
        let turn = DialogueTurn::new("Priya", "Achha!");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"speaker":"Priya","text":"Achha!"}"#);

        let back: DialogueTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.speaker, Speaker::Priya);
    }

    #[test]
    fn test_word_count_and_duration() {
        let script = sample();
        assert_eq!(script.word_count(), 20);
        // 20 words at 150 wpm is 8 seconds.
        assert_eq!(script.estimated_duration().as_millis(), 8000);
    }

    #[test]
    fn test_speakers_alternate() {
        let mut script = sample();
        assert!(script.speakers_alternate());
        script.dialogue.push(DialogueTurn::new("Rajesh", "Aur ek baat..."));
        assert!(!script.speakers_alternate());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(154)), "2:34");
        assert_eq!(format_duration(Duration::from_secs(9)), "0:09");
    }
}
