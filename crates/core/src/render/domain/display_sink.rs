use std::time::Duration;

use crate::pipeline::session::ClockState;
use crate::shared::frame::Frame;

/// One composed tick, ready to show.
#[derive(Clone, Debug)]
pub struct DisplayFrame {
    /// RGB image already resized to the sink's display size.
    pub image: Frame,
    /// `HH:MM:SS` run time; `00:00:00` unless a session is running.
    pub elapsed: String,
    pub state: ClockState,
    /// Latency of the inference whose boxes were drawn, if any were.
    pub inference_time: Option<Duration>,
    /// Index of the captured frame this image was composed from.
    pub frame_index: usize,
    pub detections_drawn: usize,
}

impl DisplayFrame {
    pub fn running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Inference latency as shown in the info panel, e.g. `T=42ms`.
    pub fn inference_readout(&self) -> String {
        match self.inference_time {
            Some(t) => format!("T={}ms", t.as_millis()),
            None => "T=---ms".to_string(),
        }
    }
}

/// Where composed frames go.
///
/// The clock asks for the display size fresh on every tick, so a sink whose
/// surface is resized takes effect on the next frame.
pub trait DisplaySink: Send {
    /// Current `(width, height)` of the display surface.
    fn display_size(&self) -> (u32, u32);

    fn present(&mut self, frame: DisplayFrame);
}
