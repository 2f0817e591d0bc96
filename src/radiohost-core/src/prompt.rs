//! Prompt template for script generation.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::request::GenerationRequest;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// Longest slice of source text embedded in a prompt, in characters.
pub const MAX_SOURCE_CHARS: usize = 2000;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert Hinglish podcast script writer. Return only valid JSON.";

const DEFAULT_TEMPLATE: &str = r#"You are a professional Hinglish podcast script writer. Create a natural 2-person radio conversation.

**Topic:** {topic}

**Wikipedia Source Content:**
{source}

**Target Audience:** {audience}
- Vocabulary: {vocabulary}
- Expression Examples: {examples}
- Tone: {tone}
- Complexity: {complexity}

**Conversation Requirements:**
1. **TWO SPEAKERS:** {host} (male host) and {cohost} (female co-host)
2. **Duration:** Approximately {duration} minutes ({turns_min}-{turns_max} dialogue turns)
3. **Language Style:** Natural Hinglish (60% Hindi, 40% English words mixed naturally)
4. **Conversational Elements:** Include natural fillers and interruptions:
   - Hindi fillers: "umm", "toh", "achha", "haan", "nahi", "arre", "matlab"
   - Reactions: "*laughs*", "*chuckles*", "*sighs*"
   - Interruptions: One speaker can gently interrupt/react to other
5. **Tone:** {style} style suitable for {audience}
6. **Content:** Based on Wikipedia facts, but make it conversational, not robotic

**Code-switching Rules:**
- Technical terms in English: "satellite", "technology", "mission"
- Common words in Hindi: "aur", "ke baad", "kya", "hai"
- Mix naturally: "ISRO ne launch kiya tha Chandrayaan mission"

**JSON OUTPUT FORMAT:**
{
  "title": "Engaging podcast title in Hinglish",
  "description": "Brief 1-line description",
  "dialogue": [
    {
      "speaker": "{host}",
      "text": "Namaste doston! *excited* Aaj hum baat karenge..."
    },
    {
      "speaker": "{cohost}",
      "text": "Haan {host}, aur yeh topic bahut interesting hai because..."
    }
  ]
}

**IMPORTANT:**
- Return ONLY valid JSON, no extra text
- Each dialogue turn should be 2-4 sentences
- Make it sound like real people talking, not reading Wikipedia
- Include {audience}-appropriate vocabulary and examples
- Total {turns_min}-{turns_max} dialogue exchanges

Generate the JSON now:"#;

/// System instruction and body template for the chat-completion call.
///
/// The body uses `{placeholder}` markers which are replaced textually, so a
/// custom template from the config file only needs the markers it cares about.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub system: String,
    pub body: String,
    pub host: String,
    pub cohost: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            body: DEFAULT_TEMPLATE.to_string(),
            host: "Rajesh".to_string(),
            cohost: "Priya".to_string(),
        }
    }
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            body: body.into(),
            ..Self::default()
        }
    }

    /// Render the user prompt for a request.
    ///
    /// Placeholders are substituted in one pass, so inserted text is never
    /// scanned again. Unknown `{name}` markers are left as they are.
    pub fn render(&self, request: &GenerationRequest) -> String {
        let profile = request.audience.profile();
        let turns = request.target_turns();

        PLACEHOLDER
            .replace_all(&self.body, |caps: &Captures| match &caps[1] {
                "topic" => request.topic.trim().to_string(),
                "source" => {
                    truncate_chars(request.source_text.trim(), MAX_SOURCE_CHARS).to_string()
                }
                "audience" => request.audience.label().to_string(),
                "vocabulary" => profile.vocabulary.to_string(),
                "examples" => profile.examples.to_string(),
                "tone" => profile.tone.to_string(),
                "complexity" => profile.complexity.to_string(),
                "style" => request.style.label().to_string(),
                "duration" => request.duration_minutes.to_string(),
                "turns_min" => turns.to_string(),
                "turns_max" => (turns + 2).to_string(),
                "host" => self.host.clone(),
                "cohost" => self.cohost.clone(),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

/// Truncate to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::Audience;
    use crate::request::ConversationStyle;

    fn request() -> GenerationRequest {
        GenerationRequest::new("ISRO", "ISRO is the Indian Space Research Organisation.")
            .with_duration(3)
            .with_style(ConversationStyle::Educational)
            .with_audience(Audience::Elderly)
    }

    #[test]
    fn test_render_embeds_request_fields() {
        let prompt = PromptTemplate::default().render(&request());

        assert!(prompt.contains("**Topic:** ISRO"));
        assert!(prompt.contains("Indian Space Research Organisation"));
        assert!(prompt.contains("**Target Audience:** Elderly"));
        assert!(prompt.contains("Slow-paced, respectful, storytelling"));
        assert!(prompt.contains("aap samajh rahe hain"));
        assert!(prompt.contains("Educational style suitable for Elderly"));
        assert!(prompt.contains("Approximately 3 minutes (9-11 dialogue turns)"));
        assert!(prompt.contains("Rajesh (male host) and Priya (female co-host)"));
        assert!(prompt.contains("Return ONLY valid JSON"));
        assert!(prompt.contains("*laughs*"));
    }

    #[test]
    fn test_render_leaves_no_placeholders() {
        let prompt = PromptTemplate::default().render(&request());
        for marker in ["{topic}", "{source}", "{audience}", "{host}", "{turns_max}"] {
            assert!(!prompt.contains(marker), "placeholder {marker} left in prompt");
        }
        // The JSON example braces survive.
        assert!(prompt.contains("\"dialogue\": ["));
    }

    #[test]
    fn test_render_truncates_source() {
        let long = "ab".repeat(MAX_SOURCE_CHARS);
        let request = GenerationRequest::new("Long", long);
        let prompt = PromptTemplate::new("sys", "[{source}]").render(&request);
        assert_eq!(prompt.len(), MAX_SOURCE_CHARS + 2);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "नमस्ते दुनिया";
        let cut = truncate_chars(text, 3);
        assert_eq!(cut.chars().count(), 3);
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_render_does_not_expand_inserted_text() {
        let request = GenerationRequest::new("{source}", "uses {duration} and {host}");
        let prompt = PromptTemplate::new("sys", "{topic} [{source}] {duration}").render(&request);
        assert_eq!(prompt, "{source} [uses {duration} and {host}] 2");
    }

    #[test]
    fn test_render_keeps_unknown_markers() {
        let template = PromptTemplate::new("sys", "{topic} {unknown} {\"a\": 1}");
        let prompt = template.render(&GenerationRequest::new("Chai", "Tea."));
        assert_eq!(prompt, "Chai {unknown} {\"a\": 1}");
    }

    #[test]
    fn test_custom_template() {
        let template = PromptTemplate::new("Only JSON.", "Talk about {topic} for {audience}.");
        let prompt = template.render(&GenerationRequest::new("Chai", "Tea is a drink."));
        assert_eq!(prompt, "Talk about Chai for Adults.");
        assert_eq!(template.system, "Only JSON.");
    }
}
