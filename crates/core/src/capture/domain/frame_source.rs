use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::RawFrame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to acquire capture source at {path}: {source}")]
    Acquire {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode frame from {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("capture source produced no frames")]
    Empty,
    #[error("capture source not opened")]
    NotOpened,
}

/// Negotiated capture format, reported by [`FrameSource::open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
}

/// Produces the raw frame stream driving a capture session.
///
/// The camera / browser-media layer lives behind this trait; the session
/// controller only pulls frames in capture order and releases the source
/// on stop. `close` must be idempotent and safe to call if `open` never
/// succeeded.
pub trait FrameSource: Send {
    /// Acquires the underlying media resource. A failure here surfaces
    /// to the caller of start and leaves the session Idle.
    fn open(&mut self) -> Result<CaptureFormat, CaptureError>;

    /// Returns frames in capture order.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<RawFrame, CaptureError>> + '_>;

    /// Releases the media resource.
    fn close(&mut self);
}
