pub mod clock;
pub mod constants;
pub mod detection;
pub mod face_payload;
pub mod frame;
