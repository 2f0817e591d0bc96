//! Radiohost CLI - Hinglish Podcast Generator
//!
//! Generates a two-host Hinglish conversation about a topic and renders it
//! to an audio file.

mod wikipedia;

use clap::Parser;
use colored::Colorize;
use radiohost_core::prompt::truncate_chars;
use radiohost_core::script::format_duration;
use radiohost_core::{
    Audience, AudioAssembler, AudioFormat, Config, ConversationStyle, GenerationRequest,
    KokoroSynthesizer, OpenAiCompatibleProvider, ProviderKind, RenderCallback, RenderEvent,
    RetryPolicy, Script, ScriptGenerator, SilentSynthesizer, Speaker, SpeechSynthesizer,
    output_filename,
};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;

use crate::wikipedia::WikipediaClient;

/// Source text handed to the generator is cut to this many characters.
const MAX_SOURCE_CHARS: usize = 3000;

#[derive(Parser)]
#[command(
    name = "radiohost",
    version,
    about = "Radiohost - Generate Hinglish podcast conversations",
    long_about = "Generates a two-host Hinglish podcast script about a topic with an \
                  OpenAI-compatible LLM and renders it to audio with a local TTS engine."
)]
struct Cli {
    /// The topic of the conversation
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Target audience: kids, teenagers, adults or elderly
    #[arg(short, long, default_value = "adults", value_name = "AUDIENCE")]
    audience: String,

    /// Conversation style
    #[arg(short, long, default_value = "conversational", value_name = "STYLE")]
    style: String,

    /// Target length in minutes (1-10)
    #[arg(short, long, default_value = "2", value_name = "MINUTES")]
    duration: u32,

    /// Read source text from a file instead of Wikipedia
    #[arg(long, value_name = "PATH")]
    source_file: Option<PathBuf>,

    /// LLM provider: groq, gemini, openai or custom
    #[arg(short, long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Model name (defaults to the provider's default)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Speech backend: kokoro or silent
    #[arg(long, default_value = "kokoro", value_name = "ENGINE")]
    tts: String,

    /// Audio output path (defaults to a name derived from the topic)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also save the generated script as JSON
    #[arg(long, value_name = "PATH")]
    script_out: Option<PathBuf>,

    /// Generate and print the script without rendering audio
    #[arg(long)]
    script_only: bool,

    /// Total attempts for retryable provider failures
    #[arg(long, default_value = "3", value_name = "N")]
    retries: u32,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => radiohost_core::config::default_config(),
    };

    if let Some(provider) = &cli.provider {
        config.llm.provider = provider.parse::<ProviderKind>()?;
    }
    if cli.model.is_some() {
        config.llm.model = cli.model.clone();
    }

    let audience = Audience::from_key(&cli.audience);
    let style = cli.style.parse::<ConversationStyle>()?;
    let policy = RetryPolicy::default().with_max_attempts(cli.retries);

    // Source text
    let source_text = match &cli.source_file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| format!("Failed to read source file {}: {}", path.display(), e))?,
        None => {
            println!("{} {}", "Fetching Wikipedia article for".dimmed(), cli.topic.bright_white());
            let article = WikipediaClient::new()?.article_for_script(&cli.topic).await;
            if article.fallback {
                eprintln!(
                    "{}",
                    "Warning: No usable Wikipedia article found, using generic source text."
                        .yellow()
                );
            } else {
                println!("{} {}", "Source:".bold(), article.url.dimmed());
            }
            article.key_facts
        }
    };
    let source_text = truncate_chars(&source_text, MAX_SOURCE_CHARS).to_string();

    let request = GenerationRequest::new(&cli.topic, source_text)
        .with_duration(cli.duration)
        .with_style(style)
        .with_audience(audience);

    // Provider
    let kind = config.llm.provider;
    let api_key = kind
        .api_key_vars()
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| {
            eprintln!(
                "{}",
                format!(
                    "Warning: {} not set. API calls may fail.",
                    kind.api_key_vars().join(" / ")
                )
                .yellow()
            );
            String::new()
        });
    let provider = OpenAiCompatibleProvider::new(
        kind,
        api_key,
        config.llm.api_base.clone(),
        config.llm.model.clone(),
    )?;
    let model = provider.model().to_string();

    let generator = ScriptGenerator::new(Box::new(provider))
        .with_template(config.prompt_template())
        .with_params(config.llm.params());

    // Print header
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!(
        "{}",
        format!("  {} - Hinglish Podcast", "Radiohost".bold())
            .bright_blue()
            .bold()
    );
    println!("{}", "═".repeat(70).bright_blue());
    println!();
    println!("{} {}", "Topic:".bold(), cli.topic.bright_white());
    println!("{} {}", "Audience:".bold(), audience.to_string().yellow());
    println!("{} {}", "Style:".bold(), style.to_string().yellow());
    println!("{} {} min", "Duration:".bold(), request.duration_minutes);
    println!("{} {} ({})", "Model:".bold(), model.dimmed(), kind.to_string().dimmed());
    println!();
    println!("{}", "Generating script...".dimmed());

    let script = {
        let generator = &generator;
        let request = &request;
        policy
            .run("generate script", move || generator.generate(request))
            .await
    };
    let script = match script {
        Ok(script) => script,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    print_script(&script);

    if let Some(path) = &cli.script_out {
        let json = serde_json::to_string_pretty(&script)?;
        fs::write(path, json)?;
        println!("{} {}", "Script saved to".green(), path.display());
    }

    if cli.script_only {
        return Ok(());
    }

    // Audio
    let configured = config.audio.format();
    let synthesizer: Box<dyn SpeechSynthesizer> = match cli.tts.trim().to_lowercase().as_str() {
        "kokoro" => {
            println!("{}", "Initializing TTS engine...".dimmed());
            let tts = KokoroSynthesizer::new().await?;
            for voice in config.voices.all() {
                tts.validate_voice(voice)?;
            }
            Box::new(tts)
        }
        "silent" => Box::new(SilentSynthesizer::new(configured)),
        other => {
            eprintln!(
                "{} Unknown TTS engine '{}'. Available: kokoro, silent",
                "Error:".red().bold(),
                other
            );
            std::process::exit(1);
        }
    };

    let format = effective_format(configured, synthesizer.output_format());
    if format != configured {
        eprintln!(
            "{}",
            format!(
                "Warning: {} emits {} Hz / {}-bit audio, ignoring the configured {} Hz / {}-bit.",
                synthesizer.name(),
                format.sample_rate,
                format.bytes_per_sample * 8,
                configured.sample_rate,
                configured.bytes_per_sample * 8
            )
            .yellow()
        );
    }

    let rendered_bytes = Arc::new(AtomicUsize::new(0));
    let assembler = AudioAssembler::new(synthesizer, config.voices.clone(), format)
        .with_markers(config.emotion_markers())
        .with_callback(create_progress_callback(rendered_bytes.clone()));

    let container = config.audio.container;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output_filename(&cli.topic, audience, container)));
    let pause = config.audio.pause_for(audience);

    println!();
    println!("{}", "─".repeat(70).dimmed());
    println!("{}", "Rendering audio...".dimmed());

    let written = assembler
        .render_to_file(&script, audience, pause, &output, container)
        .await;
    let path = match written {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let size = fs::metadata(&path)?.len();
    let audio_length = format.duration_of(rendered_bytes.load(Ordering::SeqCst));

    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", "  Podcast ready.".bright_green().bold());
    println!("{}", "═".repeat(70).bright_blue());
    println!("{} {}", "File:".bold(), path.display().to_string().bright_white());
    println!("{} {:.1} KB", "Size:".bold(), size as f64 / 1024.0);
    println!(
        "{} {} (script estimate {})",
        "Length:".bold(),
        format_duration(audio_length),
        format_duration(script.estimated_duration())
    );
    println!();

    Ok(())
}

/// The synthesizer's fixed PCM layout wins over the configured one.
fn effective_format(configured: AudioFormat, native: Option<AudioFormat>) -> AudioFormat {
    native.unwrap_or(configured)
}

/// Install the stderr log subscriber. `--verbose` overrides `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,radiohost=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_script(script: &Script) {
    println!();
    println!("{}", "═".repeat(70).bright_magenta());
    println!("{}", format!("  {}", script.title).bright_magenta().bold());
    if !script.description.is_empty() {
        println!("  {}", script.description.dimmed());
    }
    println!("{}", "═".repeat(70).bright_magenta());
    println!();

    for turn in &script.dialogue {
        let name = match &turn.speaker {
            Speaker::Rajesh => turn.speaker.name().bright_cyan().bold(),
            Speaker::Priya => turn.speaker.name().bright_magenta().bold(),
            Speaker::Other(name) => name.yellow().bold(),
        };
        println!("{} {}", "▶".bright_cyan(), name);
        let wrapped = textwrap(&turn.text, 66);
        for line in wrapped.lines() {
            println!("  {}", line);
        }
        println!();
    }

    println!(
        "{} {} turns, {} words, about {}",
        "Script:".bold(),
        script.dialogue.len(),
        script.word_count(),
        format_duration(script.estimated_duration())
    );
}

/// Create a callback that prints render progress and records the final size.
fn create_progress_callback(total_bytes: Arc<AtomicUsize>) -> RenderCallback {
    Box::new(move |event| match event {
        RenderEvent::TurnStart {
            index,
            total,
            speaker,
        } => {
            println!(
                "  {} {}",
                format!("[{}/{}]", index + 1, total).dimmed(),
                speaker.bright_cyan()
            );
        }
        RenderEvent::TurnDone { .. } => {}
        RenderEvent::Finished { bytes } => {
            total_bytes.store(bytes, Ordering::SeqCst);
        }
    })
}

/// Simple text wrapping function.
fn textwrap(text: &str, width: usize) -> String {
    let mut result = String::new();
    let mut current_line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_line_len + word_len + 1 > width && current_line_len > 0 {
            result.push('\n');
            current_line_len = 0;
        }
        if current_line_len > 0 {
            result.push(' ');
            current_line_len += 1;
        }
        result.push_str(word);
        current_line_len += word_len;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_textwrap() {
        let wrapped = textwrap("Namaste doston aaj hum ISRO ki baat karenge", 20);
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 20);
        }
        assert_eq!(wrapped.lines().count(), 3);
    }

    #[test]
    fn test_effective_format_prefers_synthesizer() {
        let configured = AudioFormat {
            sample_rate: 22_050,
            bytes_per_sample: 4,
        };
        assert_eq!(
            effective_format(configured, Some(AudioFormat::default())),
            AudioFormat::default()
        );
        assert_eq!(effective_format(configured, None), configured);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["radiohost", "ISRO"]).unwrap();
        assert_eq!(cli.topic, "ISRO");
        assert_eq!(cli.audience, "adults");
        assert_eq!(cli.duration, 2);
        assert_eq!(cli.tts, "kokoro");
        assert_eq!(cli.retries, 3);
        assert!(!cli.script_only);
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "radiohost",
            "Indian Railways",
            "--audience",
            "kids",
            "--duration",
            "5",
            "--provider",
            "gemini",
            "--tts",
            "silent",
            "--script-only",
            "--script-out",
            "script.json",
        ])
        .unwrap();
        assert_eq!(cli.audience, "kids");
        assert_eq!(cli.duration, 5);
        assert_eq!(cli.provider.as_deref(), Some("gemini"));
        assert_eq!(cli.tts, "silent");
        assert!(cli.script_only);
        assert_eq!(cli.script_out, Some(PathBuf::from("script.json")));
    }
}
