use crate::shared::constants::{
    MAX_ROTATION_DEGREES, MIN_LANDMARK_CONFIDENCE, MIN_LANDMARK_COUNT, MIN_OCULAR_RATIO,
};
use crate::shared::detection::Detection;

/// Why a detection failed the quality gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Face tilted beyond the rotation limit.
    Tilted,
    /// Too few landmarks for a usable facial geometry.
    TooFewLandmarks,
    /// Eye landmarks too close relative to the box width, indicating a
    /// poor pose or scale estimate.
    EyesTooClose,
    /// A landmark confidence score fell below the floor.
    LowLandmarkConfidence,
}

/// Heuristic filter rejecting detections unlikely to yield accurate
/// downstream recognition.
///
/// Pure and deterministic: the verdict is recomputed per detection with
/// no retained state. Rules are applied in order and the first failure
/// rejects. Relies on the detector's landmark ordering contract: indices
/// 0 and 1 are the eye centers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityGate {
    pub max_rotation_degrees: f64,
    pub min_landmark_count: usize,
    pub min_ocular_ratio: f64,
    pub min_landmark_confidence: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            max_rotation_degrees: MAX_ROTATION_DEGREES,
            min_landmark_count: MIN_LANDMARK_COUNT,
            min_ocular_ratio: MIN_OCULAR_RATIO,
            min_landmark_confidence: MIN_LANDMARK_CONFIDENCE,
        }
    }
}

impl QualityGate {
    /// Accept/reject verdict for one detection.
    pub fn assess(&self, detection: &Detection) -> bool {
        self.rejection(detection).is_none()
    }

    /// The first failing rule, or `None` when the detection passes.
    pub fn rejection(&self, detection: &Detection) -> Option<RejectReason> {
        if let Some(rotation) = detection.bounding_box.rotation {
            if rotation.abs() > self.max_rotation_degrees {
                return Some(RejectReason::Tilted);
            }
        }

        // The ocular rule reads landmarks[0] and [1], so two is a hard
        // floor even when the configured minimum is lower.
        if detection.landmarks.len() < self.min_landmark_count.max(2) {
            return Some(RejectReason::TooFewLandmarks);
        }

        let ocular = detection.landmarks[0].distance_to(&detection.landmarks[1]);
        if ocular < detection.bounding_box.width * self.min_ocular_ratio {
            return Some(RejectReason::EyesTooClose);
        }

        for landmark in &detection.landmarks {
            if let Some(confidence) = landmark.confidence {
                if confidence < self.min_landmark_confidence {
                    return Some(RejectReason::LowLandmarkConfidence);
                }
            }
        }

        None
    }
}
