//! Error types for script generation and audio rendering.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadioError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Rate limited{}: {message}", .retry_after.map(|d| format!(" (retry after {:.1}s)", d.as_secs_f32())).unwrap_or_default())]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("Failed to parse JSON from model response: {0}")]
    Parse(String),

    #[error("Invalid script structure: {0}")]
    Validation(String),

    #[error("Speech synthesis failed for turn {turn}: {message}")]
    Synthesis { turn: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RadioError {
    /// Whether a caller-side retry may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RadioError::Transport { .. } | RadioError::RateLimited { .. })
    }

    /// Wait suggested by the remote service, if it gave one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RadioError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RadioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let transport = RadioError::Transport {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        let limited = RadioError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
            message: "slow down".to_string(),
        };

        assert!(transport.is_retryable());
        assert!(limited.is_retryable());
        assert!(!RadioError::Parse("no json".to_string()).is_retryable());
        assert!(!RadioError::Synthesis { turn: 1, message: "boom".to_string() }.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(transport.retry_after(), None);
    }

    #[test]
    fn test_display_includes_status() {
        let err = RadioError::Transport {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Transport error (status 503): unavailable");

        let err = RadioError::Transport {
            status: None,
            message: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "Transport error: timed out");
    }
}
