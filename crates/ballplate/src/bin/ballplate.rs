//! ballplate CLI: single-image detection and frame-directory replay.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use ballplate::control::{ARM_JOINTS, HEAD_JOINTS};
use ballplate::core::PlatformPosition;
use ballplate::detect::{self, DetectError};
use ballplate::overlay;
use ballplate::sim::{FixedPose, RecordingActuator, ReplayFrameSource, StaticEyes};
use ballplate::vision::{
    AssignmentMode, Blob, CornerAssignment, PlateDetectorParams, PlateObservation,
};
use ballplate::{Collaborators, Runtime, RuntimeConfig, WorkerStats};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ballplate")]
#[command(about = "Locate a ball on a marked plate and replay the tilt control loop")]
#[command(version)]
struct Cli {
    /// Log verbosity (ignored with the `tracing` feature; use RUST_LOG).
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect plate corners and the ball in one RGB image.
    Detect(DetectArgs),

    /// Feed a directory of frames through the runtime with simulated devices.
    Replay(ReplayArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Input image (PNG, JPEG, ...).
    image: PathBuf,

    /// Runtime config; only its `vision` section is used.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Assign distinct blobs to the four corners.
    #[arg(long)]
    exclusive: bool,

    /// Write the annotated frame here.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Write a top-down platform view here.
    #[arg(long)]
    platform_view: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Directory of frames, replayed in file name order.
    dir: PathBuf,

    /// Runtime config with camera calibration.
    #[arg(long)]
    config: PathBuf,

    /// Frame spacing in milliseconds (default: the config tick period).
    #[arg(long)]
    period_ms: Option<u64>,

    /// Protocol commands, one per line, answered before the first frame is read.
    #[arg(long)]
    commands: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Serialize)]
struct DetectReport<'a> {
    image: String,
    width: usize,
    height: usize,
    foreground_pixels: usize,
    blob_count: usize,
    candidates: &'a [Blob],
    corners: &'a [CornerAssignment],
    target: Option<usize>,
    homography: Option<[[f64; 3]; 3]>,
    position: Option<PlatformPosition>,
    grid_bin: Option<(usize, usize)>,
    degenerate: bool,
}

impl<'a> DetectReport<'a> {
    fn new(image: &Path, obs: &'a PlateObservation) -> Self {
        let position = obs.position();
        Self {
            image: image.display().to_string(),
            width: obs.width,
            height: obs.height,
            foreground_pixels: obs.foreground_pixels,
            blob_count: obs.blob_count,
            candidates: &obs.correspondence.candidates,
            corners: &obs.correspondence.corners,
            target: obs.correspondence.target,
            homography: obs.homography().map(|h| h.to_array()),
            position,
            grid_bin: position.map(|p| p.grid_bin()),
            degenerate: obs.is_degenerate(),
        }
    }
}

#[derive(Serialize)]
struct CommandReply {
    command: String,
    reply: String,
}

#[derive(Serialize)]
struct ReplayReport {
    frames: usize,
    replies: Vec<CommandReply>,
    stats: WorkerStats,
    arm_moves: usize,
    head_moves: usize,
}

fn init_logging(level: LogLevel) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        let _ = LogTracer::init();
        ballplate::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    ballplate::core::init_with_level(level.into())?;
    Ok(())
}

fn run_detect(args: DetectArgs) -> CliResult<()> {
    let mut params = match &args.config {
        Some(path) => RuntimeConfig::vision_params_from_json_file(path)?,
        None => PlateDetectorParams::default(),
    };
    if args.exclusive {
        params.correspondence.mode = AssignmentMode::Exclusive;
    }

    let img = detect::load_rgb(&args.image)?;
    let obs = detect::detect_plate(&img, params)?;
    log::info!(
        "{}: {} blobs, {} corners, target {:?}",
        args.image.display(),
        obs.blob_count,
        obs.corners_found(),
        obs.target_pixel()
    );

    if let Some(path) = &args.overlay {
        overlay::render_overlay(&detect::rgb_view(&img), &obs).save(path)?;
    }
    if let Some(path) = &args.platform_view {
        overlay::render_platform_view(&obs).save(path)?;
    }

    let report = DetectReport::new(&args.image, &obs);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn frame_paths(dir: &Path) -> CliResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"));
        if is_image {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

async fn run_replay(args: ReplayArgs) -> CliResult<()> {
    let config = RuntimeConfig::from_json_file(&args.config)?;
    let period = Duration::from_millis(args.period_ms.unwrap_or(config.timing.tick_period_ms));

    let frames = frame_paths(&args.dir)?
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let stamp = i as f64 * period.as_secs_f64();
            Ok(detect::frame_from_image(detect::load_rgb(path)?, stamp))
        })
        .collect::<Result<Vec<_>, DetectError>>()?;
    let frame_count = frames.len();
    log::info!("replaying {frame_count} frames from {}", args.dir.display());

    let source = ReplayFrameSource::mirrored(frames).held();
    let remaining = source.remaining();
    let play = source.play();
    let head = Arc::new(RecordingActuator::new("head", HEAD_JOINTS));
    let arm = Arc::new(RecordingActuator::new("right_arm", ARM_JOINTS));
    let runtime = Runtime::start(
        config,
        Collaborators {
            frames: Box::new(source),
            pose: Some(Box::new(FixedPose::identity())),
            kinematics: Arc::new(StaticEyes::identity()),
            head: head.clone(),
            arm: arm.clone(),
        },
    )?;

    let client = runtime.client();
    let mut replies = Vec::new();
    if let Some(path) = &args.commands {
        for line in fs::read_to_string(path)?.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let reply = client.send(line).await?;
            replies.push(CommandReply {
                command: line.to_string(),
                reply: reply.to_string(),
            });
        }
    }
    play.store(true, Ordering::SeqCst);

    while remaining.load(Ordering::SeqCst) > 0 {
        tokio::time::sleep(period).await;
    }
    // let the cycle of the last pair finish
    tokio::time::sleep(period * 2).await;
    let stats = runtime.shutdown().await?;

    let report = ReplayReport {
        frames: frame_count,
        replies,
        stats,
        arm_moves: arm.moves().len(),
        head_moves: head.moves().len(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn try_main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;
    match cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Replay(args) => run_replay(args).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
