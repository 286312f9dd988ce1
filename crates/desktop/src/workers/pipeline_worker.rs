use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use perception_core::capture::infrastructure::ffmpeg_camera::{CameraOptions, FfmpegCamera};
use perception_core::detection::infrastructure::onnx_yolo_model::{OnnxYoloModel, YoloConfig};
use perception_core::pipeline::perception_pipeline::PerceptionPipeline;
use perception_core::pipeline::pipeline_config::PipelineConfig;
use perception_core::pipeline::pipeline_logger::NullPipelineLogger;
use perception_core::render::infrastructure::shared_display::SharedDisplay;
use perception_core::shared::model_resolver;

use crate::settings::Settings;

pub enum StartupMessage {
    DownloadProgress(u64, u64),
    Ready(Box<PerceptionPipeline>),
    Error(String),
}

/// Resolves the model, opens the camera and starts the pipeline off the UI
/// thread. The pipeline presents into `display`.
pub fn spawn(settings: Settings, display: SharedDisplay) -> Receiver<StartupMessage> {
    let (tx, rx) = crossbeam_channel::unbounded::<StartupMessage>();

    thread::spawn(move || {
        let message = match start_pipeline(&settings, display, &tx) {
            Ok(pipeline) => StartupMessage::Ready(Box::new(pipeline)),
            Err(e) => StartupMessage::Error(e.to_string()),
        };
        let _ = tx.send(message);
    });

    rx
}

fn start_pipeline(
    settings: &Settings,
    display: SharedDisplay,
    tx: &Sender<StartupMessage>,
) -> Result<PerceptionPipeline, Box<dyn std::error::Error>> {
    let model_path = resolve_model(settings, tx)?;
    let model = OnnxYoloModel::new(
        &model_path,
        YoloConfig {
            confidence: settings.confidence,
            iou_threshold: settings.iou_threshold,
            ..YoloConfig::default()
        },
    )?;

    let camera = FfmpegCamera::open(
        &settings.device,
        &CameraOptions {
            video_size: settings.video_size.clone(),
            framerate: None,
        },
    )?;

    let config = PipelineConfig {
        refresh_period: Duration::from_millis(settings.refresh_ms.max(1)),
        line_thickness: settings.line_thickness.max(1),
        ..PipelineConfig::default()
    };
    let pipeline = PerceptionPipeline::spawn(
        Box::new(camera),
        Box::new(model),
        Box::new(display),
        config,
        Arc::new(NullPipelineLogger),
    )?;
    Ok(pipeline)
}

fn resolve_model(
    settings: &Settings,
    tx: &Sender<StartupMessage>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &settings.model_path {
        return Ok(path.clone());
    }
    let tx_dl = tx.clone();
    let path = model_resolver::resolve(
        &settings.model_name,
        settings.model_url.as_deref(),
        None,
        Some(Box::new(move |downloaded, total| {
            let _ = tx_dl.send(StartupMessage::DownloadProgress(downloaded, total));
        })),
    )?;
    Ok(path)
}
