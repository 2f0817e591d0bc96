//! Radiohost Core Library
//!
//! Generates two-host Hinglish podcast scripts with an LLM and renders them
//! to a single audio stream with a pluggable speech synthesizer.

pub mod assembler;
pub mod audience;
pub mod config;
pub mod error;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod provider;
pub mod request;
pub mod retry;
pub mod script;
pub mod tts;

pub use assembler::{
    AudioAssembler, EmotionMarkers, OutputContainer, RenderCallback, RenderEvent, VoiceTable,
    output_filename,
};
pub use audience::{Audience, AudienceProfile, Prosody};
pub use config::Config;
pub use error::{RadioError, Result};
pub use generator::ScriptGenerator;
pub use prompt::PromptTemplate;
pub use provider::{ChatCompletionProvider, CompletionParams, OpenAiCompatibleProvider, ProviderKind};
pub use request::{ConversationStyle, GenerationRequest};
pub use retry::RetryPolicy;
pub use script::{DialogueTurn, Script, Speaker};
pub use tts::{AudioFormat, KokoroSynthesizer, SilentSynthesizer, SpeechRequest, SpeechSynthesizer};
