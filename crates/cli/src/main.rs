use std::collections::HashMap;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use presence_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use presence_core::detection::domain::face_detector::{DetectorConfig, FaceDetector, ModelHint};
use presence_core::detection::domain::quality_gate::QualityGate;
use presence_core::detection::infrastructure::json_file_detector::JsonFileDetector;
use presence_core::dispatch::domain::dispatcher::{DispatchMode, Dispatcher};
use presence_core::dispatch::infrastructure::http_recognition_client::HttpRecognitionClient;
use presence_core::pipeline::frame_sampler::{FrameSampler, SkipFrameSampler, ThrottleSampler};
use presence_core::pipeline::session_controller::{SessionConfig, SessionController};
use presence_core::shared::constants::{
    DEFAULT_CAPTURE_HEIGHT, DEFAULT_CAPTURE_WIDTH, DEFAULT_FRAME_SKIP, DEFAULT_THROTTLE_INTERVAL,
};

/// Live face capture: sample frames, gate and crop faces, send them to a
/// recognition service.
#[derive(Parser)]
#[command(name = "presence")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a capture session over a directory of frame images.
    Capture(CaptureArgs),
    /// Upload a recorded video file for server-side processing.
    Upload(UploadArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Directory of frame images, processed in filename order.
    frames: PathBuf,

    /// Recognition service base URL.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    endpoint: String,

    /// Per-frame detections JSON sidecar (frame index to detection list).
    /// Required in batch mode.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Dispatch mode: batch (detect, gate, crop) or single (whole frames).
    #[arg(long, default_value = "batch")]
    mode: String,

    /// Minimum milliseconds between admitted frames (throttle sampling).
    #[arg(long, conflicts_with = "skip_frames")]
    throttle_ms: Option<u64>,

    /// Admit one frame in every N (periodic-skip sampling).
    #[arg(long)]
    skip_frames: Option<usize>,

    /// Session budget in seconds; capture auto-stops when it expires.
    #[arg(long, default_value = "60")]
    duration_secs: u64,

    /// Capture width frames are resized to.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WIDTH)]
    width: u32,

    /// Capture height frames are resized to.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_HEIGHT)]
    height: u32,

    /// Maximum face tilt in degrees before a detection is rejected.
    #[arg(long, default_value = "15.0")]
    max_rotation: f64,

    /// Minimum landmark count per detection.
    #[arg(long, default_value = "6")]
    min_landmarks: usize,

    /// Minimum eye distance as a fraction of the box width.
    #[arg(long, default_value = "0.3")]
    min_ocular_ratio: f64,

    /// Floor for per-landmark confidence scores.
    #[arg(long, default_value = "0.5")]
    min_landmark_confidence: f64,

    /// Minimum detection confidence forwarded to the detector.
    #[arg(long, default_value = "0.5")]
    min_confidence: f64,

    /// Detector model hint: short or full.
    #[arg(long, default_value = "short")]
    model: String,
}

#[derive(Args)]
struct UploadArgs {
    /// Video file to upload.
    video: PathBuf,

    /// Recognition service base URL.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    endpoint: String,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Capture(args) => run_capture(args),
        Command::Upload(args) => run_upload(args),
    }
}

fn run_capture(args: CaptureArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate(&args)?;
    let mode = parse_mode(&args.mode)?;

    let source = ImageSequenceSource::new(&args.frames, args.width, args.height);
    let detector = build_detector(&args, mode)?;
    let sampler = build_sampler(&args, mode)?;
    let gate = QualityGate {
        max_rotation_degrees: args.max_rotation,
        min_landmark_count: args.min_landmarks,
        min_ocular_ratio: args.min_ocular_ratio,
        min_landmark_confidence: args.min_landmark_confidence,
    };
    let client = HttpRecognitionClient::new(&args.endpoint)?;
    let config = SessionConfig {
        budget: Duration::from_secs(args.duration_secs),
        mode,
    };

    let mut session = SessionController::new(
        config,
        Box::new(source),
        detector,
        sampler,
        gate,
        Dispatcher::new(Box::new(client)),
    );
    session.run()?;
    Ok(())
}

fn run_upload(args: UploadArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.video.exists() {
        return Err(format!("Video file not found: {}", args.video.display()).into());
    }
    let client = HttpRecognitionClient::new(&args.endpoint)?;
    client.upload_video(&args.video)?;
    log::info!("Uploaded {}", args.video.display());
    Ok(())
}

fn build_detector(
    args: &CaptureArgs,
    mode: DispatchMode,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let config = DetectorConfig {
        min_detection_confidence: args.min_confidence,
        model: parse_model(&args.model)?,
    };
    log::debug!("detector options: {config:?}");

    match mode {
        DispatchMode::Batch => {
            let path = args
                .detections
                .as_ref()
                .ok_or("--detections is required in batch mode")?;
            Ok(Box::new(JsonFileDetector::from_file(path)?))
        }
        // Detection runs server-side; the session never calls the detector.
        DispatchMode::SingleFrame => Ok(Box::new(JsonFileDetector::from_map(HashMap::new()))),
    }
}

fn build_sampler(
    args: &CaptureArgs,
    mode: DispatchMode,
) -> Result<Box<dyn FrameSampler>, Box<dyn std::error::Error>> {
    if let Some(ms) = args.throttle_ms {
        return Ok(Box::new(ThrottleSampler::new(Duration::from_millis(ms))));
    }
    if let Some(every) = args.skip_frames {
        return Ok(Box::new(SkipFrameSampler::new(every)?));
    }
    // Defaults mirror the two capture front ends: batch throttles on
    // time, single-frame skips on count.
    Ok(match mode {
        DispatchMode::Batch => Box::new(ThrottleSampler::new(DEFAULT_THROTTLE_INTERVAL)),
        DispatchMode::SingleFrame => Box::new(SkipFrameSampler::new(DEFAULT_FRAME_SKIP)?),
    })
}

fn validate(args: &CaptureArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.frames.is_dir() {
        return Err(format!("Frames directory not found: {}", args.frames.display()).into());
    }
    if args.width == 0 || args.height == 0 {
        return Err("Capture width and height must be positive".into());
    }
    if args.max_rotation < 0.0 {
        return Err(format!("Max rotation must be >= 0, got {}", args.max_rotation).into());
    }
    if !(0.0..=1.0).contains(&args.min_ocular_ratio) {
        return Err(format!(
            "Ocular ratio must be between 0.0 and 1.0, got {}",
            args.min_ocular_ratio
        )
        .into());
    }
    if !(0.0..=1.0).contains(&args.min_landmark_confidence) {
        return Err(format!(
            "Landmark confidence must be between 0.0 and 1.0, got {}",
            args.min_landmark_confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&args.min_confidence) {
        return Err(format!(
            "Detection confidence must be between 0.0 and 1.0, got {}",
            args.min_confidence
        )
        .into());
    }
    Ok(())
}

fn parse_mode(mode: &str) -> Result<DispatchMode, Box<dyn std::error::Error>> {
    match mode {
        "batch" => Ok(DispatchMode::Batch),
        "single" => Ok(DispatchMode::SingleFrame),
        other => Err(format!("Mode must be 'batch' or 'single', got '{other}'").into()),
    }
}

fn parse_model(model: &str) -> Result<ModelHint, Box<dyn std::error::Error>> {
    match model {
        "short" => Ok(ModelHint::Short),
        "full" => Ok(ModelHint::Full),
        other => Err(format!("Model must be 'short' or 'full', got '{other}'").into()),
    }
}
