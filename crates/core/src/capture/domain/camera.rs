use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// No frame is available right now; the caller should simply retry.
    #[error("camera not ready")]
    NotReady,
    #[error("failed to open capture device {device}: {reason}")]
    Open { device: String, reason: String },
    #[error("failed to decode frame: {0}")]
    Decode(String),
    #[error("failed to release capture device: {0}")]
    Release(String),
}

/// Domain interface for a frame-producing device.
///
/// `read` is called in a tight loop by the frame source and should return
/// `CaptureError::NotReady` (or any other error) rather than block forever
/// when no frame can be produced.
pub trait Camera: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the underlying device handle. Called once at teardown.
    fn release(&mut self) -> Result<(), CaptureError>;
}
