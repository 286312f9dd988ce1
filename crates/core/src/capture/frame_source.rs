use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::domain::camera::{Camera, CaptureError};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::latest_slot::LatestSlot;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Producer loop: pulls frames from a camera into the latest-frame slot.
///
/// Each cycle makes one acquisition attempt. A successful read overwrites
/// the slot; a failed read leaves the previous frame in place and the next
/// cycle tries again.
pub struct FrameSource {
    camera: Box<dyn Camera>,
    latest: Arc<LatestSlot<Frame>>,
    retry_delay: Duration,
}

impl FrameSource {
    pub fn new(camera: Box<dyn Camera>, latest: Arc<LatestSlot<Frame>>) -> Self {
        Self {
            camera,
            latest,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Pause applied after a failed read before the next attempt.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// One acquisition attempt. Returns `true` when a new frame was published.
    pub fn run_cycle(&mut self, logger: &dyn PipelineLogger) -> bool {
        let started = Instant::now();
        match self.camera.read() {
            Ok(frame) => {
                self.latest.publish(frame);
                logger.timing("capture", started.elapsed().as_secs_f64() * 1000.0);
                true
            }
            Err(CaptureError::NotReady) => {
                log::trace!("Camera not ready, retrying");
                false
            }
            Err(e) => {
                log::debug!("Frame acquisition failed: {e}");
                false
            }
        }
    }

    /// Runs until `cancelled` is set, then releases the camera.
    ///
    /// The camera is released here, on the capture thread, before the loop
    /// returns. A release failure is returned for the owner to report.
    pub fn run(
        mut self,
        cancelled: &AtomicBool,
        logger: &dyn PipelineLogger,
    ) -> Result<(), CaptureError> {
        while !cancelled.load(Ordering::Relaxed) {
            if !self.run_cycle(logger) {
                thread::sleep(self.retry_delay);
            }
        }
        self.camera.release()
    }
}
