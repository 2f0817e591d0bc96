//! Audio assembly.
//!
//! Voices each dialogue turn in order, separates turns with fixed silence and
//! concatenates everything into one PCM byte stream.
//!
//! Silence is raw zero-valued samples sized for [`AudioFormat`]. The result is
//! only well-formed audio when the synthesizer also emits raw PCM in that
//! format; the bundled backends do.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use hound::{SampleFormat, WavSpec, WavWriter};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::audience::{Audience, Prosody};
use crate::error::{RadioError, Result};
use crate::script::{Script, Speaker};
use crate::tts::{AudioFormat, SpeechRequest, SpeechSynthesizer};

/// Markers that make a turn livelier.
const LIVELY_MARKERS: [&str; 2] = ["*excited*", "*laughs*"];
const SIGH_MARKER: &str = "*sighs*";

/// Markers removed before synthesis by default.
pub const DEFAULT_MARKERS: [&str; 5] = [
    "*excited*",
    "*laughs*",
    "*chuckles*",
    "*sighs*",
    "*thoughtful*",
];

/// Voice identifiers for the two hosts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VoiceTable {
    pub rajesh: String,
    pub priya: String,
    /// Used for any speaker name the model invented.
    pub default: String,
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self {
            rajesh: "hm_omega".to_string(),
            priya: "hf_alpha".to_string(),
            default: "hf_alpha".to_string(),
        }
    }
}

impl VoiceTable {
    pub fn voice_for(&self, speaker: &Speaker) -> &str {
        match speaker {
            Speaker::Rajesh => &self.rajesh,
            Speaker::Priya => &self.priya,
            Speaker::Other(_) => &self.default,
        }
    }

    pub fn all(&self) -> [&str; 3] {
        [&self.rajesh, &self.priya, &self.default]
    }
}

/// Inline tone tags such as `*laughs*`, removed by literal substring match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmotionMarkers {
    markers: Vec<String>,
}

impl Default for EmotionMarkers {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl EmotionMarkers {
    /// Default markers plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut markers = Self::default();
        for marker in extra {
            let marker = marker.into();
            if !marker.is_empty() && !markers.markers.contains(&marker) {
                markers.markers.push(marker);
            }
        }
        markers
    }

    /// Remove every marker and collapse the whitespace left behind.
    pub fn strip(&self, text: &str) -> String {
        let mut result = text.to_string();
        for marker in &self.markers {
            result = result.replace(marker.as_str(), "");
        }
        result.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Prosody for a turn, judged from its raw text.
    pub fn prosody_for(&self, audience: Audience, raw_text: &str) -> Prosody {
        let lively = LIVELY_MARKERS.iter().any(|m| raw_text.contains(m));
        let sigh = raw_text.contains(SIGH_MARKER);
        audience.prosody(lively, sigh)
    }
}

/// How the rendered bytes are stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    /// PCM wrapped in a WAV header.
    #[default]
    Wav,
    /// Concatenated bytes written verbatim.
    Raw,
}

impl OutputContainer {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputContainer::Wav => "wav",
            OutputContainer::Raw => "pcm",
        }
    }
}

impl FromStr for OutputContainer {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "wav" => Ok(OutputContainer::Wav),
            "raw" | "pcm" => Ok(OutputContainer::Raw),
            other => Err(RadioError::Config(format!(
                "Unknown output container '{other}'. Available: wav, raw"
            ))),
        }
    }
}

/// Callback for render progress.
pub type RenderCallback = Box<dyn Fn(RenderEvent) + Send + Sync>;

/// Events emitted while rendering.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    /// A turn is about to be synthesized.
    TurnStart {
        index: usize,
        total: usize,
        speaker: String,
    },
    /// A turn's audio has been collected.
    TurnDone { index: usize, bytes: usize },
    /// All turns are assembled.
    Finished { bytes: usize },
}

/// Renders a [`Script`] to a single PCM stream.
pub struct AudioAssembler {
    synthesizer: Box<dyn SpeechSynthesizer>,
    voices: VoiceTable,
    markers: EmotionMarkers,
    format: AudioFormat,
    callback: Option<RenderCallback>,
}

impl AudioAssembler {
    pub fn new(
        synthesizer: Box<dyn SpeechSynthesizer>,
        voices: VoiceTable,
        format: AudioFormat,
    ) -> Self {
        Self {
            synthesizer,
            voices,
            markers: EmotionMarkers::default(),
            format,
            callback: None,
        }
    }

    pub fn with_markers(mut self, markers: EmotionMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Set a callback for render events.
    pub fn with_callback(mut self, callback: RenderCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Build the synthesis request for one turn.
    pub fn speech_request(&self, speaker: &Speaker, text: &str, audience: Audience) -> SpeechRequest {
        SpeechRequest {
            text: self.markers.strip(text),
            voice: self.voices.voice_for(speaker).to_string(),
            prosody: self.markers.prosody_for(audience, text),
        }
    }

    /// Voice every turn in order and join them with `pause` of silence.
    ///
    /// Turns are synthesized one at a time. The first failing turn aborts
    /// the whole render.
    #[instrument(skip(self, script), fields(turns = script.dialogue.len(), synthesizer = self.synthesizer.name()))]
    pub async fn render(&self, script: &Script, audience: Audience, pause: Duration) -> Result<Vec<u8>> {
        self.check_format()?;

        let total = script.dialogue.len();
        let silence = self.format.silence(pause);
        let mut combined = Vec::new();

        for (index, turn) in script.dialogue.iter().enumerate() {
            self.emit_event(RenderEvent::TurnStart {
                index,
                total,
                speaker: turn.speaker.name().to_string(),
            });

            let request = self.speech_request(&turn.speaker, &turn.text, audience);
            debug!(
                index,
                voice = %request.voice,
                rate = %request.prosody.rate_string(),
                pitch = %request.prosody.pitch_string(),
                "synthesizing turn"
            );

            let audio = self
                .synthesizer
                .synthesize(&request)
                .await
                .map_err(|e| RadioError::Synthesis {
                    turn: index,
                    message: e.to_string(),
                })?;

            self.emit_event(RenderEvent::TurnDone {
                index,
                bytes: audio.len(),
            });
            combined.extend_from_slice(&audio);

            if index + 1 < total {
                combined.extend_from_slice(&silence);
            }
        }

        info!(bytes = combined.len(), "rendered audio");
        self.emit_event(RenderEvent::Finished {
            bytes: combined.len(),
        });
        Ok(combined)
    }

    /// Render, then write the result to `path`.
    ///
    /// Nothing is written unless every turn renders. An existing file at
    /// `path` is overwritten.
    pub async fn render_to_file(
        &self,
        script: &Script,
        audience: Audience,
        pause: Duration,
        path: &Path,
        container: OutputContainer,
    ) -> Result<PathBuf> {
        let audio = self.render(script, audience, pause).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        match container {
            OutputContainer::Raw => fs::write(path, &audio)?,
            OutputContainer::Wav => write_wav(path, &audio, self.format)?,
        }

        info!(path = %path.display(), bytes = audio.len(), "wrote audio");
        Ok(path.to_path_buf())
    }

    /// Silence and the WAV header must describe the same layout the
    /// synthesizer emits.
    fn check_format(&self) -> Result<()> {
        match self.synthesizer.output_format() {
            Some(native) if native != self.format => Err(RadioError::Config(format!(
                "synthesizer '{}' emits {} Hz / {}-byte PCM but the assembler is set to {} Hz / {}-byte",
                self.synthesizer.name(),
                native.sample_rate,
                native.bytes_per_sample,
                self.format.sample_rate,
                self.format.bytes_per_sample
            ))),
            _ => Ok(()),
        }
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: RenderEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }
}

/// Wrap raw little-endian PCM in a WAV container.
///
/// Fails without creating the file if `pcm` ends in a partial sample.
pub fn write_wav(path: &Path, pcm: &[u8], format: AudioFormat) -> Result<()> {
    let width = usize::from(format.bytes_per_sample.max(1));
    if pcm.len() % width != 0 {
        return Err(RadioError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "{} bytes of audio is not a whole number of {}-byte samples",
                pcm.len(),
                width
            ),
        )));
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: format.sample_rate,
        bits_per_sample: format.bytes_per_sample * 8,
        sample_format: SampleFormat::Int,
    };

    let wav_err = |e: hound::Error| RadioError::Io(std::io::Error::other(e));
    let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;

    match format.bytes_per_sample {
        1 => {
            for byte in pcm {
                writer.write_sample(*byte as i8).map_err(wav_err)?;
            }
        }
        2 => {
            for pair in pcm.chunks_exact(2) {
                writer
                    .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                    .map_err(wav_err)?;
            }
        }
        4 => {
            for quad in pcm.chunks_exact(4) {
                writer
                    .write_sample(i32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                    .map_err(wav_err)?;
            }
        }
        other => {
            return Err(RadioError::Config(format!(
                "unsupported sample width: {other} bytes"
            )));
        }
    }

    writer.finalize().map_err(wav_err)
}

/// Generate a file name for a rendered conversation.
pub fn output_filename(topic: &str, audience: Audience, container: OutputContainer) -> String {
    let sanitized: String = topic
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(50)
        .collect();

    format!(
        "Radiohost - {} ({}).{}",
        sanitized.trim(),
        audience.label(),
        container.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::DialogueTurn;
    use crate::tts::SpeechError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Returns `len` bytes of `fill` per turn, failing on `fail_on` if set.
    struct FakeSynth {
        lengths: Vec<usize>,
        fail_on: Option<usize>,
        native: Option<AudioFormat>,
        calls: Arc<Mutex<Vec<SpeechRequest>>>,
    }

    impl FakeSynth {
        fn new(lengths: Vec<usize>) -> (Self, Arc<Mutex<Vec<SpeechRequest>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    lengths,
                    fail_on: None,
                    native: None,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        fn name(&self) -> &str {
            "fake"
        }

        fn output_format(&self) -> Option<AudioFormat> {
            self.native
        }

        async fn synthesize(&self, request: &SpeechRequest) -> std::result::Result<Vec<u8>, SpeechError> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(request.clone());
            if self.fail_on == Some(index) {
                return Err(SpeechError::Engine("service unavailable".to_string()));
            }
            Ok(vec![0xAB; self.lengths[index % self.lengths.len()]])
        }
    }

    fn script() -> Script {
        Script {
            title: "Chai".to_string(),
            description: String::new(),
            dialogue: vec![
                DialogueTurn::new("Rajesh", "*excited* Chai ka time ho gaya!"),
                DialogueTurn::new("Priya", "*sighs* Phir se chai?"),
                DialogueTurn::new("Narrator", "Aur dono hasne lage."),
            ],
        }
    }

    fn assembler(synth: FakeSynth) -> AudioAssembler {
        AudioAssembler::new(Box::new(synth), VoiceTable::default(), AudioFormat::default())
    }

    #[tokio::test]
    async fn test_render_length_is_turns_plus_two_gaps() {
        let (synth, _) = FakeSynth::new(vec![1000, 2000, 3000]);
        let audio = assembler(synth)
            .render(&script(), Audience::Adults, Duration::from_millis(500))
            .await
            .unwrap();

        let gap = 24_000; // 0.5s * 24kHz * 2 bytes
        assert_eq!(audio.len(), 1000 + 2000 + 3000 + 2 * gap);
        // Order: turn 0, gap, turn 1, gap, turn 2. Nothing after the last turn.
        assert!(audio[..1000].iter().all(|b| *b == 0xAB));
        assert!(audio[1000..1000 + gap].iter().all(|b| *b == 0));
        assert!(audio[audio.len() - 3000..].iter().all(|b| *b == 0xAB));
    }

    #[tokio::test]
    async fn test_render_builds_requests() {
        let (synth, calls) = FakeSynth::new(vec![10]);
        assembler(synth)
            .render(&script(), Audience::Elderly, Duration::from_millis(700))
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);

        assert_eq!(calls[0].text, "Chai ka time ho gaya!");
        assert_eq!(calls[0].voice, "hm_omega");
        assert_eq!(calls[0].prosody, Prosody::new(15, 15));

        assert_eq!(calls[1].text, "Phir se chai?");
        assert_eq!(calls[1].voice, "hf_alpha");
        assert_eq!(calls[1].prosody, Prosody::new(-5, -5));

        // Unknown speakers get the default voice and the plain audience prosody.
        assert_eq!(calls[2].voice, "hf_alpha");
        assert_eq!(calls[2].prosody, Prosody::new(-10, -5));
    }

    #[tokio::test]
    async fn test_render_failure_names_turn() {
        let (mut synth, calls) = FakeSynth::new(vec![100]);
        synth.fail_on = Some(1);

        let err = assembler(synth)
            .render(&script(), Audience::Kids, Duration::from_millis(500))
            .await
            .unwrap_err();

        match err {
            RadioError::Synthesis { turn, message } => {
                assert_eq!(turn, 1);
                assert!(message.contains("service unavailable"));
            }
            other => panic!("expected Synthesis error, got {other:?}"),
        }
        // Turn 2 is never attempted.
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_render_to_file_skips_write_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.pcm");
        fs::write(&path, b"previous render").unwrap();

        let (mut synth, _) = FakeSynth::new(vec![100]);
        synth.fail_on = Some(1);
        let result = assembler(synth)
            .render_to_file(&script(), Audience::Adults, Duration::from_millis(500), &path, OutputContainer::Raw)
            .await;

        assert!(matches!(result, Err(RadioError::Synthesis { turn: 1, .. })));
        assert_eq!(fs::read(&path).unwrap(), b"previous render");
    }

    #[tokio::test]
    async fn test_render_to_file_raw_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("podcast.pcm");

        let (synth, _) = FakeSynth::new(vec![4]);
        let written = assembler(synth)
            .render_to_file(&script(), Audience::Adults, Duration::ZERO, &path, OutputContainer::Raw)
            .await
            .unwrap();

        assert_eq!(written, path);
        assert_eq!(fs::read(&path).unwrap(), vec![0xAB; 12]);
    }

    #[tokio::test]
    async fn test_render_rejects_format_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.wav");

        let (mut synth, calls) = FakeSynth::new(vec![480]);
        synth.native = Some(AudioFormat::default());
        let assembler = AudioAssembler::new(
            Box::new(synth),
            VoiceTable::default(),
            AudioFormat {
                sample_rate: 22_050,
                bytes_per_sample: 4,
            },
        );
        let result = assembler
            .render_to_file(&script(), Audience::Adults, Duration::from_millis(500), &path, OutputContainer::Wav)
            .await;

        assert!(matches!(result, Err(RadioError::Config(_))));
        assert!(calls.lock().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_render_accepts_matching_native_format() {
        let (mut synth, _) = FakeSynth::new(vec![100]);
        synth.native = Some(AudioFormat::default());
        let audio = assembler(synth)
            .render(&script(), Audience::Adults, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(audio.len(), 300);
    }

    #[tokio::test]
    async fn test_render_to_file_wav_rejects_partial_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.wav");

        // 3 turns of 3 bytes: 9 bytes cannot be 16-bit samples.
        let (synth, _) = FakeSynth::new(vec![3]);
        let result = assembler(synth)
            .render_to_file(&script(), Audience::Adults, Duration::ZERO, &path, OutputContainer::Wav)
            .await;

        assert!(matches!(result, Err(RadioError::Io(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_render_to_file_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.wav");

        let (synth, _) = FakeSynth::new(vec![480]);
        assembler(synth)
            .render_to_file(&script(), Audience::Adults, Duration::from_millis(10), &path, OutputContainer::Wav)
            .await
            .unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.channels, 1);
        // (3 * 480 + 2 * 480) bytes of 16-bit samples
        assert_eq!(reader.len(), (3 * 480 + 2 * 480) / 2);
    }

    #[tokio::test]
    async fn test_callback_receives_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let (synth, _) = FakeSynth::new(vec![8]);
        assembler(synth)
            .with_callback(Box::new(move |event| sink.lock().unwrap().push(event)))
            .render(&script(), Audience::Teenagers, Duration::ZERO)
            .await
            .unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 7);
        assert!(matches!(events[0], RenderEvent::TurnStart { index: 0, total: 3, .. }));
        assert!(matches!(events[6], RenderEvent::Finished { bytes: 24 }));
    }

    #[test]
    fn test_strip_markers() {
        let markers = EmotionMarkers::default();
        assert_eq!(
            markers.strip("Arre *laughs* yeh toh *chuckles* kamaal hai *thoughtful*"),
            "Arre yeh toh kamaal hai"
        );
        assert_eq!(markers.strip("No markers here"), "No markers here");

        let markers = EmotionMarkers::with_extra(["*giggles*"]);
        assert_eq!(markers.strip("*giggles* Hehe"), "Hehe");
    }

    #[test]
    fn test_voice_table_default_for_unknown() {
        let voices = VoiceTable::default();
        assert_eq!(voices.voice_for(&Speaker::Rajesh), "hm_omega");
        assert_eq!(voices.voice_for(&Speaker::Priya), "hf_alpha");
        assert_eq!(voices.voice_for(&Speaker::Other("Host".to_string())), "hf_alpha");
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename("ISRO: India's space agency?", Audience::Kids, OutputContainer::Wav),
            "Radiohost - ISRO_ India_s space agency_ (Kids).wav"
        );
        let long = "A".repeat(100);
        assert!(output_filename(&long, Audience::Adults, OutputContainer::Raw).len() < 80);
    }

    #[test]
    fn test_container_from_str() {
        assert_eq!("WAV".parse::<OutputContainer>().unwrap(), OutputContainer::Wav);
        assert_eq!("pcm".parse::<OutputContainer>().unwrap(), OutputContainer::Raw);
        assert!("mp3".parse::<OutputContainer>().is_err());
    }
}
