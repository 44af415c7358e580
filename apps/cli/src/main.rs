use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use recap_core::{
    ChatCompletionsSummarizer, DeepgramTranscriber, Pipeline, PipelineConfig, PipelineOutcome,
    Provider, VideoUpload,
    transcribe::{DEEPGRAM_MODEL, DEFAULT_LANGUAGE},
};

fn format_duration(d: Duration) -> String {
    if d.as_secs() < 60 {
        let tenths = d.as_millis() / 100;
        format!("{}.{}s", tenths / 10, tenths % 10)
    } else {
        let secs = d.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Transcribe a local video and summarize what was said")]
struct Cli {
    /// Path to the video file
    video: PathBuf,

    /// Summary backend: openai, groq, grok or gemini
    #[arg(short, long, env = "SUMMARY_PROVIDER", default_value = "openai")]
    provider: Provider,

    /// Model used for the summary; defaults to the provider's model
    #[arg(long, env = "SUMMARY_MODEL")]
    summary_model: Option<String>,

    /// Spoken language hint for transcription (e.g. "en", "de")
    #[arg(short, long, env = "TRANSCRIPTION_LANGUAGE", default_value = DEFAULT_LANGUAGE)]
    language: String,

    /// Deepgram model
    #[arg(long, env = "DEEPGRAM_MODEL", default_value = DEEPGRAM_MODEL)]
    deepgram_model: String,

    /// Deepgram API key
    #[arg(long, env = "DEEPGRAM_API_KEY", hide_env_values = true)]
    deepgram_api_key: String,

    /// Explicit ffmpeg binary; otherwise a bundled copy, then PATH
    #[arg(long, env = "FFMPEG_PATH")]
    ffmpeg_path: Option<PathBuf>,

    /// Print the result as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(spinner_style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{} {}", style("Error:").red().bold(), message);
    std::process::exit(1);
}

fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let summary_api_key = cli.provider.api_key_from_env()?;

    let transcriber = DeepgramTranscriber::new(cli.deepgram_api_key.clone())
        .with_model(cli.deepgram_model.clone())
        .with_language(cli.language.clone());
    let summarizer = ChatCompletionsSummarizer::for_provider(
        cli.provider,
        summary_api_key,
        cli.summary_model.clone(),
    );

    let config = PipelineConfig {
        ffmpeg_path: cli.ffmpeg_path.clone(),
        ..PipelineConfig::default()
    };

    Ok(Pipeline::new(
        config,
        Arc::new(transcriber),
        Arc::new(summarizer),
    ))
}

fn print_outcome(outcome: &PipelineOutcome) {
    println!("{}", style("─".repeat(60)).dim());
    println!("\n{}\n", style("Transcription").cyan().bold());
    if outcome.transcription.is_empty() {
        println!("{}", style("(no speech detected)").dim());
    } else {
        println!("{}", outcome.transcription);
    }

    println!("\n{}\n", style("Summary").cyan().bold());
    if outcome.summary.is_degraded() {
        println!("{}", style(outcome.summary.as_str()).yellow());
    } else {
        println!("{}", outcome.summary.as_str());
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let pipeline = match build_pipeline(&cli) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(e),
    };

    let file_name = cli
        .video
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video.mp4".to_string());
    let bytes = tokio::fs::read(&cli.video)
        .await
        .with_context(|| format!("Failed to read {}", cli.video.display()))?;

    if !cli.json {
        println!(
            "\n{}  {}\n",
            style("recap").cyan().bold(),
            style("Video Summarizer").dim()
        );
    }

    let runner = pipeline.runner();
    match runner.check_available().await {
        Ok(version) if !cli.json => println!(
            "{} {} {}",
            style("✓").green().bold(),
            version,
            style(format!("({})", runner.source())).dim()
        ),
        Ok(_) => {}
        Err(e) => fail(e),
    }

    let total_start = Instant::now();
    let spinner = (!cli.json).then(|| create_spinner(&format!("Processing {}...", file_name)));

    let result = pipeline.process(VideoUpload::new(file_name, bytes)).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
            }
            fail(e);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if let Some(spinner) = spinner {
        spinner.finish_with_message(format!(
            "{} Processed {}",
            style("✓").green().bold(),
            style(format!("[{}]", format_duration(total_start.elapsed()))).dim()
        ));
    }

    print_outcome(&outcome);
    Ok(())
}
