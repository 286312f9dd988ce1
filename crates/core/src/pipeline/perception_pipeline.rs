use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::camera::{Camera, CaptureError};
use crate::capture::frame_source::FrameSource;
use crate::detection::detector::Detector;
use crate::detection::domain::detection::DetectionSet;
use crate::detection::domain::detection_model::DetectionModel;
use crate::pipeline::pipeline_clock::PipelineClock;
use crate::pipeline::pipeline_config::PipelineConfig;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session::SessionState;
use crate::render::domain::display_sink::DisplaySink;
use crate::shared::frame::Frame;
use crate::shared::latest_slot::LatestSlot;

/// Confirmation sent by a loop once it has left its run method.
#[derive(Debug)]
enum Stopped {
    /// Carries the outcome of releasing the camera.
    Capture(Result<(), CaptureError>),
    Detector,
    Clock,
    /// The named loop panicked; the other loops keep running.
    Panicked(&'static str),
}

impl Stopped {
    fn name(&self) -> &'static str {
        match self {
            Stopped::Capture(_) => "capture",
            Stopped::Detector => "detector",
            Stopped::Clock => "clock",
            Stopped::Panicked(name) => name,
        }
    }
}

/// What happened during [`PerceptionPipeline::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Loops that confirmed within the grace period.
    pub stopped: Vec<&'static str>,
    /// Loops that did not confirm in time; their threads are detached.
    pub timed_out: Vec<&'static str>,
    /// Loops that ended by panicking rather than by cancellation.
    pub panicked: Vec<&'static str>,
    pub release_error: Option<CaptureError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.timed_out.is_empty() && self.panicked.is_empty() && self.release_error.is_none()
    }
}

/// Owns the capture, detection and display loops.
///
/// Each loop runs on its own named thread and talks to the others only
/// through the two latest-value slots. Shutdown raises one shared flag and
/// waits a bounded time for every loop to confirm; the capture loop releases
/// the camera itself before confirming.
pub struct PerceptionPipeline {
    session: Arc<SessionState>,
    frames: Arc<LatestSlot<Frame>>,
    detections: Arc<LatestSlot<DetectionSet>>,
    cancelled: Arc<AtomicBool>,
    stopped_rx: Receiver<Stopped>,
    threads: Vec<(&'static str, JoinHandle<()>)>,
    shutdown_grace: Duration,
}

impl PerceptionPipeline {
    /// Starts all three loops. The session starts out stopped.
    pub fn spawn(
        camera: Box<dyn Camera>,
        model: Box<dyn DetectionModel>,
        sink: Box<dyn DisplaySink>,
        config: PipelineConfig,
        logger: Arc<dyn PipelineLogger>,
    ) -> std::io::Result<Self> {
        let session = Arc::new(SessionState::new());
        let frames = Arc::new(LatestSlot::new());
        let detections = Arc::new(LatestSlot::new());
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stopped_tx, stopped_rx) = crossbeam_channel::unbounded();

        let source = FrameSource::new(camera, frames.clone())
            .with_retry_delay(config.capture_retry_delay);
        let detector = Detector::new(model, frames.clone(), detections.clone())
            .with_idle_delay(config.detector_idle_delay);
        let clock = PipelineClock::new(frames.clone(), detections.clone(), session.clone(), sink)
            .with_class_names(config.class_names.clone())
            .with_line_thickness(config.line_thickness)
            .with_period(config.refresh_period);

        let mut pipeline = Self {
            session,
            frames,
            detections,
            cancelled,
            stopped_rx,
            threads: Vec::with_capacity(3),
            shutdown_grace: config.shutdown_grace,
        };

        pipeline.spawn_loop("capture", &stopped_tx, &logger, move |cancelled, logger| {
            Stopped::Capture(source.run(cancelled, logger))
        })?;
        pipeline.spawn_loop("detector", &stopped_tx, &logger, move |cancelled, logger| {
            detector.run(cancelled, logger);
            Stopped::Detector
        })?;
        pipeline.spawn_loop("clock", &stopped_tx, &logger, move |cancelled, logger| {
            clock.run(cancelled, logger);
            Stopped::Clock
        })?;

        log::info!("Pipeline started");
        Ok(pipeline)
    }

    fn spawn_loop<F>(
        &mut self,
        name: &'static str,
        stopped_tx: &Sender<Stopped>,
        logger: &Arc<dyn PipelineLogger>,
        body: F,
    ) -> std::io::Result<()>
    where
        F: FnOnce(&AtomicBool, &dyn PipelineLogger) -> Stopped + Send + 'static,
    {
        let cancelled = self.cancelled.clone();
        let stopped_tx = stopped_tx.clone();
        let logger = logger.clone();
        let spawned = thread::Builder::new()
            .name(format!("perception-{name}"))
            .spawn(move || {
                let run = AssertUnwindSafe(|| body(&cancelled, logger.as_ref()));
                let stopped = panic::catch_unwind(run).unwrap_or_else(|_| {
                    log::error!("{name} loop panicked");
                    Stopped::Panicked(name)
                });
                // The owner may already have given up waiting.
                let _ = stopped_tx.send(stopped);
            });
        match spawned {
            Ok(handle) => {
                self.threads.push((name, handle));
                Ok(())
            }
            Err(e) => {
                // Stop whatever did start before reporting.
                self.cancelled.store(true, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn frames(&self) -> &Arc<LatestSlot<Frame>> {
        &self.frames
    }

    pub fn detections(&self) -> &Arc<LatestSlot<DetectionSet>> {
        &self.detections
    }

    /// Grace period configured at spawn time.
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    pub fn is_shut_down(&self) -> bool {
        self.threads.is_empty()
    }

    /// Stops every loop and waits up to `grace` for them to confirm.
    ///
    /// A camera release failure is reported, not propagated. Calling this
    /// again after a shutdown returns an empty report.
    pub fn shutdown(&mut self, grace: Duration) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        if self.threads.is_empty() {
            return report;
        }

        self.session.stop();
        self.cancelled.store(true, Ordering::Relaxed);
        let deadline = Instant::now() + grace;

        while report.stopped.len() < self.threads.len() {
            match self.stopped_rx.recv_deadline(deadline) {
                Ok(stopped) => {
                    report.stopped.push(stopped.name());
                    match stopped {
                        Stopped::Capture(Err(e)) => {
                            log::error!("Camera release failed: {e}");
                            report.release_error = Some(e);
                        }
                        Stopped::Panicked(name) => report.panicked.push(name),
                        _ => {}
                    }
                }
                Err(_) => break,
            }
        }

        for (name, handle) in self.threads.drain(..) {
            if report.stopped.contains(&name) {
                if handle.join().is_err() {
                    log::error!("{name} thread panicked during shutdown");
                }
            } else {
                log::error!("{name} loop did not stop within {grace:?}");
                report.timed_out.push(name);
            }
        }

        log::info!("Pipeline shut down");
        report
    }
}

impl Drop for PerceptionPipeline {
    /// Runs a full shutdown so the camera is released before the owner goes
    /// away. Does nothing after an explicit [`PerceptionPipeline::shutdown`].
    fn drop(&mut self) {
        let report = self.shutdown(self.shutdown_grace);
        if !report.is_clean() {
            log::warn!("Pipeline dropped without a clean shutdown: {report:?}");
        }
    }
}
