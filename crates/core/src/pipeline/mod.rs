pub mod crop_extractor;
pub mod frame_sampler;
pub mod session_controller;
pub mod session_stats;
