//! Live face-capture pipeline: turns a raw frame stream into
//! rate-limited, quality-gated face payloads sent to a remote
//! recognition service, bounded to a wall-clock session.

pub mod capture;
pub mod detection;
pub mod dispatch;
pub mod pipeline;
pub mod shared;
