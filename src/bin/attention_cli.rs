use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use attention_monitor::acquisition::{FrameSource, SyntheticSource};
use attention_monitor::calibration::{CalibrationController, Clock, ManualClock, SystemClock};
use attention_monitor::config::AppConfig;
use attention_monitor::fixtures::{write_wav, WavFrameSource};
use attention_monitor::notify::{LogNotifier, ThresholdMonitor};
use attention_monitor::pipeline::{AttentionPipeline, FrameReport};
use attention_monitor::store::JsonFileStore;
use attention_monitor::telemetry;
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "attention_cli",
    about = "Offline attention scoring and calibration harness"
)]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file holding the persisted threshold
    #[arg(long, default_value = "attention_store.json")]
    store: PathBuf,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score every frame of a mono WAV recording, one JSON object per line
    Analyze {
        #[arg(long)]
        wav: PathBuf,
        /// Write the reports to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the telemetry snapshot to stderr when done
        #[arg(long)]
        telemetry: bool,
    },
    /// Calibrate the threshold from a baseline recording
    Calibrate {
        #[arg(long)]
        wav: PathBuf,
        /// Pace frames with the wall clock instead of simulated time
        #[arg(long)]
        realtime: bool,
    },
    /// Score a seeded synthetic signal
    Synth {
        #[arg(long, default_value_t = 100)]
        frames: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Generate a drowsy-looking signal instead of a focused one
        #[arg(long)]
        relaxed: bool,
        /// Also save the generated signal as a WAV file
        #[arg(long)]
        wav_out: Option<PathBuf>,
    },
    /// Read or overwrite the persisted threshold
    Threshold {
        #[command(subcommand)]
        action: ThresholdAction,
    },
}

#[derive(Subcommand, Debug)]
enum ThresholdAction {
    Get,
    Set { value: f32 },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    config
        .validate()
        .map_err(|err| anyhow!("invalid configuration: {err}"))?;

    match cli.command {
        Commands::Analyze {
            wav,
            output,
            telemetry,
        } => run_analyze(&config, &cli.store, &wav, output, telemetry),
        Commands::Calibrate { wav, realtime } => {
            run_calibrate(&config, &cli.store, &wav, realtime)
        }
        Commands::Synth {
            frames,
            seed,
            relaxed,
            wav_out,
        } => run_synth(&config, frames, seed, relaxed, wav_out),
        Commands::Threshold { action } => run_threshold(&config, &cli.store, action),
    }
}

fn controller(
    config: &AppConfig,
    store: &Path,
    clock: Arc<dyn Clock>,
) -> Result<CalibrationController> {
    let controller = CalibrationController::new(
        Arc::new(JsonFileStore::new(store)),
        clock,
        config.calibration.clone(),
        config.spectral.band_config_version,
    );
    controller
        .load_calibration()
        .context("loading calibration")?;
    Ok(controller)
}

fn open_recording(config: &AppConfig, wav: &Path) -> Result<WavFrameSource> {
    let source = WavFrameSource::open(wav, config.spectral.frame_len)?;
    if source.sample_rate() as f32 != config.spectral.sample_rate_hz {
        tracing::warn!(
            "{} is sampled at {} Hz but bands assume {} Hz",
            wav.display(),
            source.sample_rate(),
            config.spectral.sample_rate_hz
        );
    }
    Ok(source)
}

#[derive(Serialize)]
struct AnalyzeLine<'a> {
    #[serde(flatten)]
    report: &'a FrameReport,
    attentive: bool,
}

fn run_analyze(
    config: &AppConfig,
    store: &Path,
    wav: &Path,
    output: Option<PathBuf>,
    print_telemetry: bool,
) -> Result<ExitCode> {
    let controller = controller(config, store, Arc::new(SystemClock))?;
    let threshold = controller.get_threshold();
    let mut pipeline = AttentionPipeline::from_config(config)
        .map_err(|err| anyhow!("building pipeline: {err}"))?;
    let mut source = open_recording(config, wav)?;
    let mut monitor = config
        .notification
        .enabled
        .then(|| ThresholdMonitor::new(&config.notification));
    let notifier = LogNotifier;

    let mut lines = Vec::new();
    while let Some(frame) = source.next_frame() {
        let report = match pipeline.process_frame(&frame) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!("skipping frame: {err}");
                continue;
            }
        };
        if let Some(monitor) = monitor.as_mut() {
            monitor.observe(report.score, threshold, report.sequence, &notifier);
        }
        let line = AnalyzeLine {
            report: &report,
            attentive: controller.is_attentive(report.score),
        };
        lines.push(serde_json::to_string(&line)?);
    }

    let body = lines.join("\n");
    match output {
        Some(path) => {
            fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{body}"),
    }

    if print_telemetry {
        let snapshot = telemetry::hub().snapshot();
        eprintln!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(ExitCode::from(0))
}

fn run_calibrate(config: &AppConfig, store: &Path, wav: &Path, realtime: bool) -> Result<ExitCode> {
    let clock: Arc<dyn Clock> = if realtime {
        Arc::new(SystemClock)
    } else {
        Arc::new(ManualClock::new())
    };
    let controller = controller(config, store, clock)?;
    let previous = controller.get_threshold();
    let mut pipeline = AttentionPipeline::from_config(config)
        .map_err(|err| anyhow!("building pipeline: {err}"))?;
    let mut source = open_recording(config, wav)?;

    let threshold = controller
        .calibrate(&mut pipeline, &mut source)
        .with_context(|| format!("calibrating from {}", wav.display()))?;

    println!(
        "{}",
        serde_json::json!({
            "previous_threshold": previous,
            "threshold": threshold,
            "store": store.display().to_string(),
        })
    );
    Ok(ExitCode::from(0))
}

fn run_synth(
    config: &AppConfig,
    frames: usize,
    seed: u64,
    relaxed: bool,
    wav_out: Option<PathBuf>,
) -> Result<ExitCode> {
    let mut pipeline = AttentionPipeline::from_config(config)
        .map_err(|err| anyhow!("building pipeline: {err}"))?;
    let mut source = if relaxed {
        SyntheticSource::relaxed(seed)
    } else {
        SyntheticSource::focused(seed)
    }
    .with_limit(frames);

    let mut recorded = Vec::new();
    let mut scores = Vec::with_capacity(frames);
    while let Some(frame) = source.next_frame() {
        let report = pipeline
            .process_frame(&frame)
            .map_err(|err| anyhow!("scoring synthetic frame: {err}"))?;
        scores.push(report.score);
        if wav_out.is_some() {
            recorded.extend_from_slice(&frame);
        }
    }

    if let Some(path) = wav_out {
        write_wav(&path, &recorded, config.spectral.sample_rate_hz as u32)?;
        tracing::info!("wrote {} samples to {}", recorded.len(), path.display());
    }

    let mean = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };
    println!(
        "{}",
        serde_json::json!({
            "frames": scores.len(),
            "seed": seed,
            "profile": if relaxed { "relaxed" } else { "focused" },
            "mean_score": mean,
            "final_score": scores.last().copied().unwrap_or(0.0),
        })
    );
    Ok(ExitCode::from(0))
}

fn run_threshold(config: &AppConfig, store: &Path, action: ThresholdAction) -> Result<ExitCode> {
    let controller = controller(config, store, Arc::new(SystemClock))?;
    match action {
        ThresholdAction::Get => {
            let state = controller.state();
            println!("{}", serde_json::to_string(&state)?);
        }
        ThresholdAction::Set { value } => {
            controller
                .set_threshold(value)
                .context("persisting threshold")?;
            println!("{}", serde_json::to_string(&controller.state())?);
        }
    }
    Ok(ExitCode::from(0))
}
