use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::detection_model::DetectionModel;
use crate::detection::domain::letterbox::letterbox;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::latest_slot::LatestSlot;

const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(2);

/// Result of one detector cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No frame has been published yet.
    NoFrame,
    /// The latest frame was already processed.
    AlreadySeen,
    /// A new set with this many detections was published.
    Published(usize),
    /// Preprocessing or inference failed; the previous set was kept.
    Failed,
}

/// Consumer loop: runs the model over the latest frame and publishes the
/// resulting [`DetectionSet`].
///
/// The model is warmed up lazily before the first inference, and only
/// once per detector. Boxes stay in model-input space; mapping to frame
/// pixels happens at composition time using the geometry stored alongside.
pub struct Detector {
    model: Box<dyn DetectionModel>,
    frames: Arc<LatestSlot<Frame>>,
    detections: Arc<LatestSlot<DetectionSet>>,
    warmup_attempted: bool,
    last_frame: Option<usize>,
    idle_delay: Duration,
}

impl Detector {
    pub fn new(
        model: Box<dyn DetectionModel>,
        frames: Arc<LatestSlot<Frame>>,
        detections: Arc<LatestSlot<DetectionSet>>,
    ) -> Self {
        Self {
            model,
            frames,
            detections,
            warmup_attempted: false,
            last_frame: None,
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }

    /// Pause applied when there is nothing new to process.
    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    pub fn run_cycle(&mut self, logger: &dyn PipelineLogger) -> CycleOutcome {
        let Some(frame) = self.frames.latest() else {
            return CycleOutcome::NoFrame;
        };
        if self.last_frame == Some(frame.index()) {
            return CycleOutcome::AlreadySeen;
        }
        self.last_frame = Some(frame.index());
        self.ensure_warm(logger);

        let (tensor, geometry) = match letterbox(&frame, self.model.input_size()) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::warn!("Skipping frame {}: {e}", frame.index());
                return CycleOutcome::Failed;
            }
        };

        let started = Instant::now();
        match self.model.infer(tensor) {
            Ok(detections) => {
                let inference_time = started.elapsed();
                let count = detections.len();
                self.detections.publish(DetectionSet {
                    detections,
                    geometry,
                    frame_index: frame.index(),
                    inference_time,
                });
                logger.timing("detect", inference_time.as_secs_f64() * 1000.0);
                logger.metric("detections", count as f64);
                CycleOutcome::Published(count)
            }
            Err(e) => {
                log::warn!(
                    "Inference failed on frame {}, keeping previous detections: {e}",
                    frame.index()
                );
                CycleOutcome::Failed
            }
        }
    }

    /// Runs until `cancelled` is set.
    pub fn run(mut self, cancelled: &AtomicBool, logger: &dyn PipelineLogger) {
        while !cancelled.load(Ordering::Relaxed) {
            match self.run_cycle(logger) {
                CycleOutcome::Published(_) => {}
                _ => thread::sleep(self.idle_delay),
            }
        }
        log::debug!("Detector stopped");
    }

    fn ensure_warm(&mut self, logger: &dyn PipelineLogger) {
        if self.warmup_attempted {
            return;
        }
        self.warmup_attempted = true;
        let started = Instant::now();
        match self.model.warmup() {
            Ok(()) => {
                let message = format!("Model warm-up done in {:.0?}", started.elapsed());
                log::info!("{message}");
                logger.info(&message);
            }
            Err(e) => log::warn!("Model warm-up failed, continuing without it: {e}"),
        }
    }
}
