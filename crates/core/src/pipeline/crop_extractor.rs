use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use ndarray::s;
use thiserror::Error;

use crate::shared::detection::BoundingBox;
use crate::shared::face_payload::FacePayload;
use crate::shared::frame::RawFrame;

#[derive(Error, Debug)]
pub enum CropError {
    #[error("failed to encode face crop: {0}")]
    Encode(#[source] image::ImageError),
}

/// Pixel-space crop rectangle, always fully contained in frame bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Converts a normalized center-anchored box to a pixel rectangle
    /// clamped to `[0, frame_width] x [0, frame_height]`. Boxes lying
    /// partly or wholly outside the frame clamp down, possibly to zero
    /// width or height.
    pub fn from_normalized(bbox: &BoundingBox, frame_width: u32, frame_height: u32) -> Self {
        let fw = frame_width as f64;
        let fh = frame_height as f64;

        let x_min = ((bbox.x_center - bbox.width / 2.0) * fw).clamp(0.0, fw);
        let x_max = ((bbox.x_center + bbox.width / 2.0) * fw).clamp(0.0, fw);
        let y_min = ((bbox.y_center - bbox.height / 2.0) * fh).clamp(0.0, fh);
        let y_max = ((bbox.y_center + bbox.height / 2.0) * fh).clamp(0.0, fh);

        let x = x_min.floor() as u32;
        let y = y_min.floor() as u32;
        Self {
            x,
            y,
            width: (x_max.floor() as u32).saturating_sub(x),
            height: (y_max.floor() as u32).saturating_sub(y),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of extracting one detection from one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum CropOutcome {
    Extracted(FacePayload),
    /// The clamped rectangle had zero area; the detection is skipped,
    /// siblings in the same frame are unaffected.
    SkippedEmptyCrop,
}

/// Cuts one detection's bounding box out of a frame and encodes it as a
/// PNG payload.
pub struct CropExtractor;

impl CropExtractor {
    pub fn new() -> Self {
        Self
    }

    /// `timestamp_ms` is the epoch-millisecond capture time stamped onto
    /// the payload; the session loop supplies it so the unit is
    /// deterministic under test.
    pub fn extract(
        &self,
        frame: &RawFrame,
        bbox: &BoundingBox,
        timestamp_ms: u64,
    ) -> Result<CropOutcome, CropError> {
        let rect = CropRect::from_normalized(bbox, frame.width(), frame.height());
        if rect.is_degenerate() {
            return Ok(CropOutcome::SkippedEmptyCrop);
        }

        let pixels = self.copy_region(frame, &rect);
        let png = encode_png(&pixels, rect.width, rect.height)?;
        Ok(CropOutcome::Extracted(FacePayload { png, timestamp_ms }))
    }

    fn copy_region(&self, frame: &RawFrame, rect: &CropRect) -> Vec<u8> {
        let arr = frame.as_ndarray();
        let view = arr.slice(s![
            rect.y as usize..(rect.y + rect.height) as usize,
            rect.x as usize..(rect.x + rect.width) as usize,
            ..
        ]);
        view.iter().copied().collect()
    }
}

impl Default for CropExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CropError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(CropError::Encode)?;
    Ok(buf)
}
