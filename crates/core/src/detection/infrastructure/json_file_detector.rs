use std::collections::HashMap;
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::detection::Detection;
use crate::shared::frame::RawFrame;

/// Replays pre-computed detections from a JSON sidecar file.
///
/// The file maps frame indices to detection lists, using the same field
/// shape the external detector emits (normalized center box, optional
/// rotation, landmark list with optional confidence). Frames without an
/// entry yield no detections. Lets the pipeline run end-to-end without
/// bundling a model.
pub struct JsonFileDetector {
    detections: HashMap<usize, Vec<Detection>>,
}

impl JsonFileDetector {
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        let detections: HashMap<usize, Vec<Detection>> = serde_json::from_str(&text)?;
        Ok(Self { detections })
    }

    pub fn from_map(detections: HashMap<usize, Vec<Detection>>) -> Self {
        Self { detections }
    }
}

impl FaceDetector for JsonFileDetector {
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        Ok(self
            .detections
            .get(&frame.index())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: usize) -> RawFrame {
        RawFrame::new(vec![0u8; 10 * 10 * 3], 10, 10, 3, index, 0)
    }

    #[test]
    fn test_replays_detections_for_known_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.json");
        std::fs::write(
            &path,
            r#"{
                "0": [{
                    "boundingBox": {"xCenter": 0.5, "yCenter": 0.5, "width": 0.2, "height": 0.3},
                    "landmarks": [{"x": 0.4, "y": 0.4}]
                }],
                "2": []
            }"#,
        )
        .unwrap();

        let mut detector = JsonFileDetector::from_file(&path).unwrap();
        assert_eq!(detector.detect(&frame(0)).unwrap().len(), 1);
        assert!(detector.detect(&frame(1)).unwrap().is_empty());
        assert!(detector.detect(&frame(2)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_errors() {
        assert!(JsonFileDetector::from_file(Path::new("/nonexistent.json")).is_err());
    }

    #[test]
    fn test_malformed_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFileDetector::from_file(&path).is_err());
    }
}
