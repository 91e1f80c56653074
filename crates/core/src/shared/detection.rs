use serde::Deserialize;

/// Face bounding box in normalized coordinates (0..1 relative to the
/// source frame), center-anchored as emitted by the external detector.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
    /// In-plane rotation in degrees. Absent for detectors that do not
    /// estimate it.
    #[serde(default)]
    pub rotation: Option<f64>,
}

/// One facial keypoint in normalized coordinates.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Per-landmark confidence, when the detector provides one.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl Landmark {
    pub fn distance_to(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One face detection, read-only once produced by the detector.
///
/// Landmark ordering is a contract of the external detector: index 0 and
/// index 1 are the eye centers. The pipeline relies on that ordering and
/// does not attempt to re-derive it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_landmark_distance() {
        let a = Landmark {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            confidence: None,
        };
        let b = Landmark {
            x: 0.3,
            y: 0.4,
            z: 0.0,
            confidence: None,
        };
        assert_relative_eq!(a.distance_to(&b), 0.5);
    }

    #[test]
    fn test_landmark_distance_ignores_z() {
        let a = Landmark {
            x: 0.0,
            y: 0.0,
            z: 0.9,
            confidence: None,
        };
        let b = Landmark {
            x: 0.1,
            y: 0.0,
            z: -0.9,
            confidence: None,
        };
        assert_relative_eq!(a.distance_to(&b), 0.1);
    }

    #[test]
    fn test_deserialize_mediapipe_shape() {
        let json = r#"{
            "boundingBox": {
                "xCenter": 0.5, "yCenter": 0.4,
                "width": 0.2, "height": 0.3, "rotation": -4.5
            },
            "landmarks": [
                {"x": 0.45, "y": 0.35, "z": 0.0, "confidence": 0.9},
                {"x": 0.55, "y": 0.35, "z": 0.0}
            ]
        }"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_relative_eq!(det.bounding_box.x_center, 0.5);
        assert_eq!(det.bounding_box.rotation, Some(-4.5));
        assert_eq!(det.landmarks.len(), 2);
        assert_eq!(det.landmarks[0].confidence, Some(0.9));
        assert_eq!(det.landmarks[1].confidence, None);
    }

    #[test]
    fn test_deserialize_without_rotation_or_landmarks() {
        let json = r#"{
            "boundingBox": {"xCenter": 0.5, "yCenter": 0.5, "width": 0.1, "height": 0.1}
        }"#;
        let det: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(det.bounding_box.rotation, None);
        assert!(det.landmarks.is_empty());
    }
}
