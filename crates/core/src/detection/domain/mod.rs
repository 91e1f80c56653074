pub mod face_detector;
pub mod quality_gate;
