//! JSON extraction and structural validation of model responses.
//!
//! Models frequently wrap the requested JSON in markdown fences or surround
//! it with prose, so extraction tries progressively looser strategies before
//! giving up.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{RadioError, Result};
use crate::script::{DialogueTurn, Script};

/// Minimum number of turns a usable script must contain.
pub const MIN_TURNS: usize = 2;

static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*\s*(\{.*?\})\s*```").expect("fence pattern is valid")
});

/// Extract the first usable JSON value from a model response.
///
/// Strategies, in order: the whole response, the contents of a fenced code
/// block, then the span from the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        match serde_json::from_str::<Value>(fenced) {
            Ok(value) => {
                debug!("extracted JSON from fenced code block");
                return Ok(value);
            }
            Err(e) => debug!(error = %e, "fenced block is not valid JSON"),
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            match serde_json::from_str::<Value>(&trimmed[start..=end]) {
                Ok(value) => {
                    debug!("extracted JSON from brace span");
                    return Ok(value);
                }
                Err(e) => debug!(error = %e, "brace span is not valid JSON"),
            }
        }
    }

    Err(RadioError::Parse(format!(
        "no JSON object found in {} chars of response",
        text.len()
    )))
}

/// Contents of the first fenced code block holding an object, with any
/// language tag skipped.
fn fenced_block(text: &str) -> Option<&str> {
    FENCED_OBJECT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Check the structure of an extracted value and build a [`Script`].
///
/// `topic` supplies the placeholder title when the model omitted one.
pub fn validate_script(value: Value, topic: &str) -> Result<Script> {
    let Value::Object(mut object) = value else {
        return Err(RadioError::Validation(
            "response is not a JSON object".to_string(),
        ));
    };

    let entries = match object.remove("dialogue") {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(RadioError::Validation(
                "'dialogue' is not an array".to_string(),
            ));
        }
        None => {
            return Err(RadioError::Validation(
                "missing 'dialogue' key".to_string(),
            ));
        }
    };

    if entries.len() < MIN_TURNS {
        return Err(RadioError::Validation(format!(
            "expected at least {} dialogue turns, got {}",
            MIN_TURNS,
            entries.len()
        )));
    }

    let dialogue = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_turn(index, entry))
        .collect::<Result<Vec<_>>>()?;

    let title = non_blank(&object, "title")
        .unwrap_or_else(|| format!("{} - Hinglish Podcast", topic.trim()));
    let description = non_blank(&object, "description").unwrap_or_default();

    Ok(Script {
        title,
        description,
        dialogue,
    })
}

fn parse_turn(index: usize, entry: Value) -> Result<DialogueTurn> {
    let Value::Object(turn) = entry else {
        return Err(RadioError::Validation(format!(
            "turn {index} is not an object"
        )));
    };

    let speaker = non_blank(&turn, "speaker").ok_or_else(|| {
        RadioError::Validation(format!("turn {index} is missing a speaker"))
    })?;
    let text = non_blank(&turn, "text")
        .ok_or_else(|| RadioError::Validation(format!("turn {index} is missing text")))?;

    Ok(DialogueTurn::new(speaker, text))
}

/// A trimmed, non-empty string field.
fn non_blank(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
