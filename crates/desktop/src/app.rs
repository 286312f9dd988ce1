use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use iced::widget::{button, column, container, image, row, text, Space};
use iced::{window, Element, Length, Size, Subscription, Task, Theme};

use perception_core::pipeline::perception_pipeline::PerceptionPipeline;
use perception_core::pipeline::session::ZERO_ELAPSED;
use perception_core::render::domain::display_sink::DisplayFrame;
use perception_core::render::infrastructure::shared_display::SharedDisplay;
use perception_core::shared::frame::Frame;

use crate::settings::{Appearance, Settings};
use crate::theme;
use crate::workers::pipeline_worker::{self, StartupMessage};

/// Width reserved for the info panel on the right of the video.
pub const PANEL_WIDTH: f32 = 220.0;
pub const INITIAL_WINDOW: Size = Size::new(1000.0, 600.0);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    Resized(Size),
    ToggleSession,
    ToggleAppearance,
    Quit,
}

enum Status {
    Starting(Option<(u64, u64)>),
    Ready,
    Failed(String),
}

pub struct App {
    settings: Settings,
    display: SharedDisplay,
    startup: Option<Receiver<StartupMessage>>,
    pipeline: Option<Box<PerceptionPipeline>>,
    status: Status,
    shown: Option<Arc<DisplayFrame>>,
    handle: Option<image::Handle>,
    wall_clock: String,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let display = SharedDisplay::new(display_size(INITIAL_WINDOW));
        let startup = pipeline_worker::spawn(settings.clone(), display.clone());
        (
            Self {
                settings,
                display,
                startup: Some(startup),
                pipeline: None,
                status: Status::Starting(None),
                shown: None,
                handle: None,
                wall_clock: wall_clock(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                self.poll_startup();
                self.refresh_frame();
                self.wall_clock = wall_clock();
            }
            Message::Resized(size) => {
                self.display.set_size(display_size(size));
            }
            Message::ToggleSession => {
                if let Some(pipeline) = &self.pipeline {
                    let running = pipeline.session().toggle(Instant::now());
                    log::info!("Session {}", if running { "started" } else { "stopped" });
                }
            }
            Message::ToggleAppearance => {
                self.settings.appearance = match self.settings.appearance {
                    Appearance::Dark => Appearance::Light,
                    Appearance::Light => Appearance::Dark,
                };
                self.settings.save();
            }
            Message::Quit => {
                if let Some(mut pipeline) = self.pipeline.take() {
                    let report = pipeline.shutdown(pipeline.shutdown_grace());
                    if !report.is_clean() {
                        log::warn!(
                            "Pipeline did not shut down cleanly: timed out {:?}",
                            report.timed_out
                        );
                    }
                }
                return iced::exit();
            }
        }
        Task::none()
    }

    fn poll_startup(&mut self) {
        let Some(rx) = &self.startup else { return };
        loop {
            match rx.try_recv() {
                Ok(StartupMessage::DownloadProgress(dl, total)) => {
                    self.status = Status::Starting(Some((dl, total)));
                }
                Ok(StartupMessage::Ready(pipeline)) => {
                    self.pipeline = Some(pipeline);
                    self.status = Status::Ready;
                }
                Ok(StartupMessage::Error(e)) => {
                    log::error!("Pipeline failed to start: {e}");
                    self.status = Status::Failed(e);
                }
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        self.startup = None;
    }

    fn refresh_frame(&mut self) {
        let Some(latest) = self.display.latest() else { return };
        if self.shown.as_ref().is_some_and(|shown| Arc::ptr_eq(shown, &latest)) {
            return;
        }
        let frame = &latest.image;
        self.handle = Some(image::Handle::from_rgba(
            frame.width(),
            frame.height(),
            to_rgba(frame),
        ));
        self.shown = Some(latest);
    }

    pub fn view(&self) -> Element<'_, Message> {
        let video: Element<'_, Message> = match &self.handle {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text(self.status_text()).size(16))
                .center(Length::Fill)
                .into(),
        };

        row![
            container(video).width(Length::Fill).height(Length::Fill),
            self.info_panel(),
        ]
        .height(Length::Fill)
        .into()
    }

    fn info_panel(&self) -> Element<'_, Message> {
        let shown = self.shown.as_deref();
        let session_running = self.pipeline.as_ref().map(|p| p.session().is_running());
        let controls = ControlState::new(session_running);
        let running = controls.running;
        let readout = shown.map_or_else(|| "T=---ms".to_string(), DisplayFrame::inference_readout);
        let elapsed = shown.map_or(ZERO_ELAPSED, |f| f.elapsed.as_str());
        let status_color = theme::status_color(&self.theme(), running);

        let info = column![
            text(readout).size(20),
            text(&self.wall_clock).size(20),
            text(elapsed).size(20),
            text(controls.status_label)
                .size(20)
                .color(status_color),
        ]
        .spacing(6);

        let toggle = button(text(controls.toggle_label).size(16))
            .on_press_maybe(controls.toggle_enabled.then_some(Message::ToggleSession))
            .padding([8, 16])
            .width(Length::Fill)
            .style(if running {
                button::danger
            } else {
                button::primary
            });

        let result_count = shown.map_or(0, |f| f.detections_drawn);
        let result = column![
            text("Result").size(14),
            container(text(format!("{result_count} objects")).size(16))
                .padding([6, 10])
                .width(Length::Fill)
                .style(move |_theme: &Theme| container::Style {
                    background: Some(status_color.into()),
                    text_color: Some(iced::Color::WHITE),
                    ..container::Style::default()
                }),
        ]
        .spacing(4);

        let appearance = button(text(format!("Theme: {}", self.settings.appearance)).size(12))
            .on_press(Message::ToggleAppearance)
            .style(button::text);

        let quit = button(text("QUIT").size(16))
            .on_press(Message::Quit)
            .padding([8, 16])
            .width(Length::Fill)
            .style(button::secondary);

        container(
            column![
                info,
                toggle,
                result,
                text(self.status_text()).size(12),
                Space::new().height(Length::Fill),
                appearance,
                quit,
            ]
            .spacing(16)
            .height(Length::Fill),
        )
        .padding(16)
        .width(Length::Fixed(PANEL_WIDTH))
        .height(Length::Fill)
        .into()
    }

    fn status_text(&self) -> String {
        match &self.status {
            Status::Starting(Some((dl, total))) if *total > 0 => {
                format!("Downloading model... {}%", dl * 100 / total)
            }
            Status::Starting(_) => "Starting camera...".to_string(),
            Status::Ready => format!("Device: {}", self.settings.device),
            Status::Failed(e) => format!("Error: {e}"),
        }
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let period = Duration::from_millis(self.settings.refresh_ms.max(1));
        Subscription::batch([
            iced::time::every(period).map(|_| Message::Tick),
            window::resize_events().map(|(_id, size)| Message::Resized(size)),
            window::close_requests().map(|_id| Message::Quit),
        ])
    }
}

/// What the START/STOP button and the status line show.
///
/// Follows the session itself, not the last presented frame, so it is right
/// even before the camera has delivered anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub running: bool,
    pub toggle_label: &'static str,
    pub status_label: &'static str,
    pub toggle_enabled: bool,
}

impl ControlState {
    /// `session_running` is `None` until the pipeline has started.
    pub fn new(session_running: Option<bool>) -> Self {
        let running = session_running.unwrap_or(false);
        Self {
            running,
            toggle_label: if running { "STOP" } else { "START" },
            status_label: if running { "Running." } else { "Stopped." },
            toggle_enabled: session_running.is_some(),
        }
    }
}

/// Pixel size available to the video for a window of `size`.
pub fn display_size(size: Size) -> (u32, u32) {
    let width = (size.width - PANEL_WIDTH).max(1.0);
    let height = size.height.max(1.0);
    (width.round() as u32, height.round() as u32)
}

fn wall_clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Expands packed RGB to the RGBA layout iced image handles expect.
pub fn to_rgba(frame: &Frame) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(frame.width() as usize * frame.height() as usize * 4);
    for px in frame.data().chunks_exact(3) {
        rgba.extend_from_slice(px);
        rgba.push(u8::MAX);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;
    use perception_core::pipeline::session::SessionState;

    #[test]
    fn test_controls_disabled_before_pipeline_starts() {
        let controls = ControlState::new(None);
        assert!(!controls.running);
        assert!(!controls.toggle_enabled);
        assert_eq!(controls.toggle_label, "START");
    }

    #[test]
    fn test_controls_follow_session_without_any_frame() {
        let session = SessionState::new();
        session.start(Instant::now());

        let controls = ControlState::new(Some(session.is_running()));
        assert!(controls.running);
        assert_eq!(controls.toggle_label, "STOP");
        assert_eq!(controls.status_label, "Running.");

        session.stop();
        let controls = ControlState::new(Some(session.is_running()));
        assert_eq!(controls.toggle_label, "START");
        assert_eq!(controls.status_label, "Stopped.");
        assert!(controls.toggle_enabled);
    }

    #[test]
    fn test_display_size_excludes_panel() {
        assert_eq!(display_size(INITIAL_WINDOW), (780, 600));
    }

    #[test]
    fn test_display_size_never_zero() {
        assert_eq!(display_size(Size::new(100.0, 0.0)), (1, 1));
    }

    #[test]
    fn test_to_rgba_adds_opaque_alpha() {
        let frame = Frame::new(vec![10, 20, 30, 40, 50, 60], 2, 1, 3, 0);
        assert_eq!(to_rgba(&frame), vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
