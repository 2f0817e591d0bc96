//! Speech synthesis backends.
//!
//! Every backend returns raw 16-bit little-endian mono PCM so that turns and
//! the assembler's silence buffers can be concatenated byte-for-byte.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kokoro_tiny::TtsEngine;
use thiserror::Error;
use tracing::debug;

use crate::audience::Prosody;

/// Sample rate produced by the bundled engines.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Longest text chunk handed to kokoro in one call.
const KOKORO_CHUNK_CHARS: usize = 200;

/// Layout of the raw PCM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bytes_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bytes_per_sample: 2,
        }
    }
}

impl AudioFormat {
    /// Zero-valued samples lasting `duration`.
    pub fn silence(&self, duration: Duration) -> Vec<u8> {
        let samples = self.sample_rate as u128 * duration.as_nanos() / 1_000_000_000;
        vec![0u8; samples as usize * self.bytes_per_sample as usize]
    }

    /// Playback length of `bytes` of PCM in this format.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let bytes_per_second = self.sample_rate as f64 * self.bytes_per_sample as f64;
        if bytes_per_second == 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(bytes as f64 / bytes_per_second)
    }
}

/// One turn's worth of text to voice.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
    pub prosody: Prosody,
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("unknown voice '{0}'")]
    UnknownVoice(String),

    #[error("engine failure: {0}")]
    Engine(String),
}

/// A text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// PCM layout this backend always emits, or `None` if it follows the
    /// assembler's format.
    fn output_format(&self) -> Option<AudioFormat> {
        None
    }

    /// Voice `request` and return its PCM bytes.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SpeechError>;
}

/// Local synthesis with the kokoro ONNX model.
pub struct KokoroSynthesizer {
    engine: Arc<Mutex<TtsEngine>>,
    available_voices: Vec<String>,
}

impl KokoroSynthesizer {
    /// Initialize the engine (downloads the model on first run).
    pub async fn new() -> Result<Self, SpeechError> {
        let engine = TtsEngine::new()
            .await
            .map_err(|e| SpeechError::Engine(format!("Failed to initialize TTS: {}", e)))?;

        let available_voices = engine.voices();

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            available_voices,
        })
    }

    pub fn available_voices(&self) -> &[String] {
        &self.available_voices
    }

    /// Check that a voice ID exists.
    pub fn validate_voice(&self, voice_id: &str) -> Result<(), SpeechError> {
        if voice_id.is_empty() || !self.available_voices.iter().any(|v| v == voice_id) {
            return Err(SpeechError::UnknownVoice(format!(
                "{}. Available voices:\n{}",
                voice_id,
                self.format_available_voices()
            )));
        }
        Ok(())
    }

    /// Hindi and English voices, one per line.
    fn format_available_voices(&self) -> String {
        let mut voices: Vec<&String> = self
            .available_voices
            .iter()
            .filter(|v| {
                ["hf_", "hm_", "af_", "am_", "bf_", "bm_"]
                    .iter()
                    .any(|prefix| v.starts_with(prefix))
            })
            .collect();
        voices.sort();

        voices
            .iter()
            .map(|v| format!("  - {}", v))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl SpeechSynthesizer for KokoroSynthesizer {
    fn name(&self) -> &str {
        "kokoro"
    }

    /// The model runs at 24 kHz; samples are written as 16-bit.
    fn output_format(&self) -> Option<AudioFormat> {
        Some(AudioFormat::default())
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SpeechError> {
        self.validate_voice(&request.voice)?;

        if request.prosody.pitch_hz != 0 {
            debug!(pitch = %request.prosody.pitch_string(), "kokoro ignores pitch offsets");
        }

        let engine = Arc::clone(&self.engine);
        let chunks = split_into_chunks(&request.text, KOKORO_CHUNK_CHARS);
        let voice = request.voice.clone();
        let speed = request.prosody.speed_factor();

        let samples = tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| SpeechError::Engine("TTS engine lock poisoned".to_string()))?;
            let mut all_samples = Vec::new();

            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    // 0.3s breath between chunks
                    all_samples.extend(std::iter::repeat_n(0.0, 7200));
                }
                let samples = engine
                    .synthesize(chunk, Some(voice.as_str()))
                    .map_err(|e| SpeechError::Engine(format!("Synthesis failed: {}", e)))?;
                all_samples.extend(samples);
            }

            Ok::<_, SpeechError>(adjust_audio_speed(all_samples, speed))
        })
        .await
        .map_err(|e| SpeechError::Engine(format!("Synthesis task failed: {}", e)))??;

        Ok(samples_to_pcm16(&samples))
    }
}

/// Placeholder backend that emits silence sized to the spoken text.
///
/// Length is estimated at 150 words per minute and clamped to 2..=10 seconds.
#[derive(Debug, Clone, Default)]
pub struct SilentSynthesizer {
    format: AudioFormat,
}

impl SilentSynthesizer {
    pub fn new(format: AudioFormat) -> Self {
        Self { format }
    }

    pub fn duration_for(text: &str) -> Duration {
        let words = text.split_whitespace().count() as f64;
        Duration::from_secs_f64((words * 60.0 / 150.0).clamp(2.0, 10.0))
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    fn name(&self) -> &str {
        "silent"
    }

    fn output_format(&self) -> Option<AudioFormat> {
        Some(self.format)
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<Vec<u8>, SpeechError> {
        Ok(self.format.silence(Self::duration_for(&request.text)))
    }
}

/// Convert f32 samples in [-1, 1] to 16-bit little-endian PCM.
pub fn samples_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Split text into chunks that are safe for TTS synthesis.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current_chunk = String::new();

    for sentence in text.split_inclusive(&['.', '!', '?', ';'][..]) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        if current_chunk.len() + sentence.len() > max_chars {
            if !current_chunk.is_empty() {
                chunks.push(current_chunk.trim().to_string());
                current_chunk = String::new();
            }

            // An over-long sentence is split on commas instead
            if sentence.len() > max_chars {
                for part in sentence.split_inclusive(',') {
                    if current_chunk.len() + part.len() > max_chars && !current_chunk.is_empty() {
                        chunks.push(current_chunk.trim().to_string());
                        current_chunk = String::new();
                    }
                    current_chunk.push_str(part);
                    current_chunk.push(' ');
                }
            } else {
                current_chunk.push_str(sentence);
                current_chunk.push(' ');
            }
        } else {
            current_chunk.push_str(sentence);
            current_chunk.push(' ');
        }
    }

    if !current_chunk.trim().is_empty() {
        chunks.push(current_chunk.trim().to_string());
    }

    chunks
}

/// Change playback speed by linear interpolation.
/// Rate < 1.0 is slower, rate > 1.0 is faster.
fn adjust_audio_speed(samples: Vec<f32>, rate: f32) -> Vec<f32> {
    if (rate - 1.0).abs() < 0.001 {
        return samples;
    }

    let new_len = (samples.len() as f32 / rate) as usize;
    let mut result = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_pos = i as f32 * rate;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f32;

        if src_idx + 1 < samples.len() {
            result.push(samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac);
        } else if src_idx < samples.len() {
            result.push(samples[src_idx]);
        }
    }

    result
}
