use crate::shared::constants::DEFAULT_MIN_DETECTION_CONFIDENCE;
use crate::shared::detection::Detection;
use crate::shared::frame::RawFrame;

/// Model-size hint forwarded to the external detector unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ModelHint {
    /// Short-range model, tuned for faces within ~2m.
    #[default]
    Short,
    /// Full-range model.
    Full,
}

/// Detector options the pipeline passes through without interpreting.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorConfig {
    pub min_detection_confidence: f64,
    pub model: ModelHint,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            model: ModelHint::Short,
        }
    }
}

/// Domain interface for face detection.
///
/// The model is a black box to this crate: implementations receive one
/// admitted frame and return zero or more detections. Implementations
/// may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
