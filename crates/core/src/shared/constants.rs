use std::time::Duration;

/// Quality gate: detections tilted beyond this many degrees are rejected.
pub const MAX_ROTATION_DEGREES: f64 = 15.0;

/// Quality gate: minimum landmark count for a usable facial geometry.
pub const MIN_LANDMARK_COUNT: usize = 6;

/// Quality gate: minimum distance between the eye landmarks, as a
/// fraction of the bounding-box width.
pub const MIN_OCULAR_RATIO: f64 = 0.3;

/// Quality gate: floor for per-landmark confidence scores.
pub const MIN_LANDMARK_CONFIDENCE: f64 = 0.5;

/// Detector pass-through: minimum detection confidence.
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;

pub const DEFAULT_CAPTURE_WIDTH: u32 = 1344;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 760;

/// Wall-clock budget after which a capture session auto-stops.
pub const DEFAULT_SESSION_BUDGET: Duration = Duration::from_millis(60_000);

/// Periodic-skip sampling: admit one frame in every N.
pub const DEFAULT_FRAME_SKIP: usize = 2;

/// Time-throttle sampling: minimum gap between admitted frames.
pub const DEFAULT_THROTTLE_INTERVAL: Duration = Duration::from_millis(2_000);

pub const RECOGNIZE_BATCH_PATH: &str = "/recognize-batch";
pub const DETECT_AND_RECOGNIZE_PATH: &str = "/detect-and-recognize";
pub const PROCESS_VIDEO_PATH: &str = "/process-video";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
