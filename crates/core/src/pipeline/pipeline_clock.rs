use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::detection::domain::class_names::ClassNames;
use crate::detection::domain::coordinate_mapper::map_detections;
use crate::detection::domain::detection::DetectionSet;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session::{format_elapsed, SessionState};
use crate::render::domain::display_sink::{DisplayFrame, DisplaySink};
use crate::render::domain::overlay::draw_detections;
use crate::shared::frame::Frame;
use crate::shared::latest_slot::LatestSlot;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No frame has been captured yet; the sink was not called.
    NoFrame,
    Presented { detections_drawn: usize },
}

/// Fixed-period compositor.
///
/// Each tick takes whatever frame and detection set are current, draws the
/// overlay at the frame's own resolution when a session is running, resizes
/// once to the sink's size, and presents. It never waits on the capture or
/// detection loops.
pub struct PipelineClock {
    frames: Arc<LatestSlot<Frame>>,
    detections: Arc<LatestSlot<DetectionSet>>,
    session: Arc<SessionState>,
    sink: Box<dyn DisplaySink>,
    class_names: ClassNames,
    line_thickness: u32,
    period: Duration,
    last_mismatch: Option<usize>,
}

impl PipelineClock {
    pub fn new(
        frames: Arc<LatestSlot<Frame>>,
        detections: Arc<LatestSlot<DetectionSet>>,
        session: Arc<SessionState>,
        sink: Box<dyn DisplaySink>,
    ) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            frames,
            detections,
            session,
            sink,
            class_names: defaults.class_names,
            line_thickness: defaults.line_thickness,
            period: defaults.refresh_period,
            last_mismatch: None,
        }
    }

    pub fn with_class_names(mut self, class_names: ClassNames) -> Self {
        self.class_names = class_names;
        self
    }

    pub fn with_line_thickness(mut self, line_thickness: u32) -> Self {
        self.line_thickness = line_thickness;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn tick(&mut self, now: Instant, logger: &dyn PipelineLogger) -> TickOutcome {
        let Some(frame) = self.frames.latest() else {
            return TickOutcome::NoFrame;
        };
        let started = Instant::now();
        let (dw, dh) = self.sink.display_size();
        let session = self.session.snapshot();

        let mut detections_drawn = 0;
        let mut inference_time = None;
        let mut annotated = None;
        if session.running {
            if let Some(set) = self.usable_detections(&frame) {
                let mapped = map_detections(&set, frame.size());
                if let Some(mut canvas) = (*frame).clone().into_rgb_image() {
                    detections_drawn =
                        draw_detections(&mut canvas, &mapped, &self.class_names, self.line_thickness);
                    annotated = Some(Frame::from_rgb_image(canvas, frame.index()));
                }
                inference_time = Some(set.inference_time);
            }
        }

        let composed = annotated.as_ref().unwrap_or(frame.as_ref());
        let image = composed.resized(dw, dh);

        self.sink.present(DisplayFrame {
            image,
            elapsed: format_elapsed(session.elapsed(now)),
            state: session.state(),
            inference_time,
            frame_index: frame.index(),
            detections_drawn,
        });
        logger.timing("compose", started.elapsed().as_secs_f64() * 1000.0);
        TickOutcome::Presented { detections_drawn }
    }

    /// Ticks every period until `cancelled` is set.
    pub fn run(mut self, cancelled: &AtomicBool, logger: &dyn PipelineLogger) {
        let mut next = Instant::now();
        while !cancelled.load(Ordering::Relaxed) {
            self.tick(Instant::now(), logger);

            next += self.period;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; don't try to catch up with a burst of ticks.
                next = now;
            }
        }
        log::debug!("Display clock stopped");
    }

    /// The current set, unless it was computed for a frame of another size.
    fn usable_detections(&mut self, frame: &Frame) -> Option<Arc<DetectionSet>> {
        let set = self.detections.latest()?;
        if set.geometry.original_size != frame.size() {
            if self.last_mismatch != Some(set.frame_index) {
                log::warn!(
                    "Detections from frame {} were computed for {:?}, current frame is {:?}; not drawing them",
                    set.frame_index,
                    set.geometry.original_size,
                    frame.size()
                );
                self.last_mismatch = Some(set.frame_index);
            }
            return None;
        }
        Some(set)
    }
}
