//! irisgauge CLI — still-image detection and frame-sequence replay.

use clap::{Args, Parser, Subcommand};
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use irisgauge::{
    CaptureState, Config, DetectionResult, EyeDetector, Feedback, FeedbackSink, Frame,
    FrameSource, Session, SkipReason, TickOutcome, Ticker, UiEffect,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Parser)]
#[command(name = "irisgauge")]
#[command(about = "Estimate pupil and iris diameters (pixels) from eye images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one detection pass on a still image.
    Detect(CliDetectArgs),

    /// Feed a directory of frames through a live session.
    Replay(CliReplayArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the detection result (JSON). Printed to stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CliReplayArgs {
    /// Directory of frames, replayed in file-name order.
    #[arg(long)]
    frames: PathBuf,

    /// Tick interval in milliseconds (overrides the config file).
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Press Capture before this tick index.
    #[arg(long)]
    capture_at: Option<u64>,

    /// Press Retake before this tick index.
    #[arg(long)]
    retake_at: Option<u64>,

    /// Configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write the captured still and its result.
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Replay(args) => run_replay(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<Config> {
    match path {
        Some(path) => {
            tracing::info!("Loading config: {}", path.display());
            Ok(Config::from_json_file(path)?)
        }
        None => Ok(Config::default()),
    }
}

fn load_frame(path: &Path) -> CliResult<Frame> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(Frame::from_rgba_image(img.to_rgba8()))
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", Config::default().to_json_pretty()?);
    Ok(())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;

    tracing::info!("Loading image: {}", args.image.display());
    let frame = load_frame(&args.image)?;
    let (w, h) = frame.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let detector = EyeDetector::with_config(config.detect);
    let result = detector.detect(&frame)?;
    tracing::info!(
        "Pupil diameter {:.2}px, iris diameter {:.2}px, aligned: {}",
        result.pupil_diameter(),
        result.iris_diameter(),
        result.eye_aligned()
    );

    let json = serde_json::to_string_pretty(&result)?;
    match &args.out {
        Some(out) => {
            std::fs::write(out, &json)?;
            tracing::info!("Result written to {}", out.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ── replay ─────────────────────────────────────────────────────────────

/// Frames read from disk in order. Unreadable files are skipped.
struct DirFrameSource {
    paths: VecDeque<PathBuf>,
}

impl DirFrameSource {
    fn open(dir: &Path) -> CliResult<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        Ok(Self {
            paths: paths.into(),
        })
    }

    fn len(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for DirFrameSource {
    fn capture_frame(&mut self) -> Option<Frame> {
        while let Some(path) = self.paths.pop_front() {
            match load_frame(&path) {
                Ok(frame) => {
                    tracing::debug!("Frame {}", path.display());
                    return Some(frame);
                }
                Err(e) => tracing::warn!("{}", e),
            }
        }
        None
    }
}

/// Prints each feedback the way the on-screen label would show it.
#[derive(Default)]
struct ConsoleSink {
    published: usize,
}

impl FeedbackSink for ConsoleSink {
    fn publish(&mut self, feedback: &Feedback) {
        self.published += 1;
        println!(
            "[{:?}] {}",
            feedback.border_color(),
            feedback.label_text().replace('\n', " | ")
        );
    }
}

fn save_still(dir: &Path, frame: &Frame, result: &DetectionResult) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    let still_path = dir.join("still.png");
    frame.to_rgba_image()?.save(&still_path)?;
    let result_path = dir.join("still.json");
    std::fs::write(&result_path, serde_json::to_string_pretty(result)?)?;
    tracing::info!(
        "Still written to {} ({})",
        still_path.display(),
        result_path.display()
    );
    Ok(())
}

fn run_replay(args: &CliReplayArgs) -> CliResult<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(ms) = args.interval_ms {
        config.session.tick_interval_ms = ms;
        config.validate()?;
    }

    let source = DirFrameSource::open(&args.frames)?;
    tracing::info!(
        "Replaying {} frames from {} every {}ms",
        source.len(),
        args.frames.display(),
        config.session.tick_interval_ms
    );
    println!("{}", Feedback::PLACEHOLDER_TEXT.replace('\n', " | "));

    let mut session = Session::new(
        EyeDetector::with_config(config.detect),
        source,
        ConsoleSink::default(),
    );
    let ticker = Ticker::new(Duration::from_millis(config.session.tick_interval_ms));
    let mut failure: Option<CliError> = None;

    let stats = ticker.run(|i| {
        if args.retake_at == Some(i) {
            session.retake();
        }
        if args.capture_at == Some(i) {
            let transition = session.capture();
            if transition.effects.contains(&UiEffect::PersistStill) {
                let r = session.result();
                tracing::info!(
                    "Captured: pupil {:.2}px, iris {:.2}px",
                    r.pupil_diameter(),
                    r.iris_diameter()
                );
                if let (Some(dir), Some(frame)) = (&args.save_dir, session.last_frame()) {
                    if let Err(e) = save_still(dir, frame, session.result()) {
                        failure = Some(e);
                        return ControlFlow::Break(());
                    }
                }
            }
        }

        match session.tick() {
            TickOutcome::Skipped(SkipReason::NoFrame) => ControlFlow::Break(()),
            TickOutcome::Gated if args.retake_at.map_or(true, |r| r <= i) => {
                // Captured with no retake ahead: nothing left to do.
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        }
    });

    if let Some(e) = failure {
        return Err(e);
    }

    let state = session.state();
    let (_, sink, _) = session.into_parts();
    tracing::info!(
        "Replay done: {} ticks, {} dropped, {} published, final state {:?}",
        stats.ticks,
        stats.dropped,
        sink.published,
        state
    );
    if state == CaptureState::Captured && args.save_dir.is_none() {
        tracing::info!("Captured still not saved (no --save-dir)");
    }
    Ok(())
}
