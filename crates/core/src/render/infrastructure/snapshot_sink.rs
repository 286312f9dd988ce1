use std::path::{Path, PathBuf};

use crate::render::domain::display_sink::{DisplayFrame, DisplaySink};
use crate::shared::frame::Frame;

/// Headless sink with a fixed display size.
///
/// Every `every`-th presented frame is written to `path` with the `image`
/// crate, overwriting the previous snapshot. Without a path frames are only
/// counted.
pub struct SnapshotSink {
    size: (u32, u32),
    path: Option<PathBuf>,
    every: usize,
    presented: usize,
    written: usize,
}

impl SnapshotSink {
    pub fn new(size: (u32, u32), path: Option<PathBuf>, every: usize) -> Self {
        Self {
            size,
            path,
            every: every.max(1),
            presented: 0,
            written: 0,
        }
    }
}

impl DisplaySink for SnapshotSink {
    fn display_size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, frame: DisplayFrame) {
        self.presented += 1;
        if let Some(path) = &self.path {
            if (self.presented - 1) % self.every == 0 {
                match write_image(path, &frame.image) {
                    Ok(()) => self.written += 1,
                    Err(e) => log::warn!("Could not write snapshot {}: {e}", path.display()),
                }
            }
        }
    }
}

impl Drop for SnapshotSink {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            log::info!(
                "Wrote {} of {} composed frames to {}",
                self.written,
                self.presented,
                path.display()
            );
        }
    }
}

/// Writes an RGB frame to `path`; the format follows the file extension.
pub fn write_image(path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    img.save(path)?;
    Ok(())
}
