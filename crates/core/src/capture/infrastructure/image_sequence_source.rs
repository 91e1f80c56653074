use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{CaptureError, CaptureFormat, FrameSource};
use crate::shared::clock::epoch_ms;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::RawFrame;

/// Adapts a directory of still images to the [`FrameSource`] interface.
///
/// Files are replayed in lexicographic order, decoded lazily and resized
/// to the requested capture resolution, so a saved frame dump can stand
/// in for a live camera when exercising the pipeline.
pub struct ImageSequenceSource {
    dir: PathBuf,
    width: u32,
    height: u32,
    paths: Option<Vec<PathBuf>>,
}

impl ImageSequenceSource {
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            dir: dir.into(),
            width,
            height,
            paths: None,
        }
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
        let entries = std::fs::read_dir(dir).map_err(|e| CaptureError::Acquire {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn decode(path: &Path, width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
        let img = image::open(path).map_err(|e| CaptureError::Decode {
            path: path.to_path_buf(),
            source: e,
        })?;
        let rgb = image::imageops::resize(
            &img.to_rgb8(),
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Ok(rgb.into_raw())
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<CaptureFormat, CaptureError> {
        let paths = Self::list_images(&self.dir)?;
        if paths.is_empty() {
            return Err(CaptureError::Empty);
        }
        self.paths = Some(paths);
        Ok(CaptureFormat {
            width: self.width,
            height: self.height,
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<RawFrame, CaptureError>> + '_> {
        let Some(paths) = self.paths.take() else {
            return Box::new(std::iter::once(Err(CaptureError::NotOpened)));
        };
        let width = self.width;
        let height = self.height;
        Box::new(paths.into_iter().enumerate().map(move |(index, path)| {
            let data = Self::decode(&path, width, height)?;
            Ok(RawFrame::new(data, width, height, 3, index, epoch_ms()))
        }))
    }

    fn close(&mut self) {
        self.paths = None;
    }
}
