use std::io::BufRead;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use perception_core::capture::infrastructure::ffmpeg_camera::{CameraOptions, FfmpegCamera};
use perception_core::detection::domain::class_names::ClassNames;
use perception_core::detection::infrastructure::onnx_yolo_model::{OnnxYoloModel, YoloConfig};
use perception_core::pipeline::perception_pipeline::PerceptionPipeline;
use perception_core::pipeline::pipeline_config::PipelineConfig;
use perception_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use perception_core::render::infrastructure::snapshot_sink::SnapshotSink;
use perception_core::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_DEVICE, DEFAULT_INPUT_SIZE, DEFAULT_IOU_THRESHOLD,
    DEFAULT_LINE_THICKNESS, DEFAULT_MAX_DETECTIONS, DEFAULT_MODEL_NAME, DEFAULT_REFRESH_MS,
};
use perception_core::shared::model_resolver;

/// Live object detection on a camera feed, without a window.
///
/// Type `start`, `stop`, `toggle` or `quit` on stdin to control the session.
#[derive(Parser)]
#[command(name = "perceive")]
struct Cli {
    /// Capture device, or any URL/file ffmpeg can open.
    #[arg(long, default_value = DEFAULT_DEVICE)]
    device: String,

    /// Requested capture size, e.g. 1280x720.
    #[arg(long)]
    video_size: Option<String>,

    /// Requested capture frame rate, e.g. 30.
    #[arg(long)]
    framerate: Option<String>,

    /// ONNX model file. Resolved by --model-name from the model cache when omitted.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Model file name looked up in the model cache.
    #[arg(long, default_value = DEFAULT_MODEL_NAME)]
    model_name: String,

    /// Where to download the model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f32,

    /// NMS IoU threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou: f32,

    /// Suppress overlapping boxes across classes.
    #[arg(long)]
    agnostic_nms: bool,

    /// Maximum detections per frame.
    #[arg(long, default_value_t = DEFAULT_MAX_DETECTIONS)]
    max_det: usize,

    /// Only keep these class ids (comma-separated).
    #[arg(long, value_delimiter = ',')]
    classes: Option<Vec<usize>>,

    /// Model input size for models without a fixed input shape.
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    img_size: u32,

    /// Display refresh period in milliseconds.
    #[arg(long, default_value_t = DEFAULT_REFRESH_MS)]
    period_ms: u64,

    /// Box outline width in pixels.
    #[arg(long, default_value_t = DEFAULT_LINE_THICKNESS)]
    line_thickness: u32,

    /// Display width of composed frames.
    #[arg(long, default_value = "640")]
    width: u32,

    /// Display height of composed frames.
    #[arg(long, default_value = "480")]
    height: u32,

    /// Save composed frames to this image file (overwritten).
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Save every Nth composed frame.
    #[arg(long, default_value = "20")]
    snapshot_every: usize,

    /// Start a detection session immediately.
    #[arg(long)]
    autostart: bool,

    /// Text file with one class name per line (defaults to COCO).
    #[arg(long)]
    class_names: Option<PathBuf>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Start,
    Stop,
    Toggle,
    Quit,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let model = build_model(&cli)?;
    let class_names = match &cli.class_names {
        Some(path) => ClassNames::from_file(path)
            .map_err(|e| format!("Cannot read class names {}: {e}", path.display()))?,
        None => ClassNames::coco(),
    };
    let camera = FfmpegCamera::open(
        &cli.device,
        &CameraOptions {
            video_size: cli.video_size.clone(),
            framerate: cli.framerate.clone(),
        },
    )?;
    let sink = SnapshotSink::new((cli.width, cli.height), cli.snapshot.clone(), cli.snapshot_every);

    let config = PipelineConfig {
        refresh_period: Duration::from_millis(cli.period_ms),
        line_thickness: cli.line_thickness,
        class_names,
        ..PipelineConfig::default()
    };
    let logger = Arc::new(StdoutPipelineLogger::new());
    let mut pipeline = PerceptionPipeline::spawn(
        Box::new(camera),
        Box::new(model),
        Box::new(sink),
        config,
        logger.clone(),
    )?;

    if cli.autostart {
        pipeline.session().start(Instant::now());
    }
    eprintln!("Capturing from {}. Commands: start, stop, toggle, quit", cli.device);

    let deadline = cli.duration.map(|s| Instant::now() + Duration::from_secs(s));
    control_loop(&pipeline, spawn_stdin_reader(), deadline);

    let report = pipeline.shutdown(pipeline.shutdown_grace());
    logger.summary();
    if let Some(e) = &report.release_error {
        log::warn!("Camera was not released cleanly: {e}");
    }
    if !report.panicked.is_empty() {
        log::warn!("Loops that crashed during the run: {:?}", report.panicked);
    }
    if !report.timed_out.is_empty() {
        log::warn!("Loops still running at exit: {:?}", report.timed_out);
    }
    Ok(())
}

/// Applies stdin commands until `quit`, the deadline, or end of input.
///
/// End of input only ends the run when no `--duration` was given.
fn control_loop(pipeline: &PerceptionPipeline, commands: Receiver<Command>, deadline: Option<Instant>) {
    let mut stdin_open = true;
    loop {
        let wait = match deadline {
            Some(d) => match d.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => return,
            },
            None => Duration::from_secs(3600),
        };

        let received = if stdin_open {
            commands.recv_timeout(wait)
        } else {
            thread::sleep(wait);
            Err(RecvTimeoutError::Timeout)
        };

        match received {
            Ok(Command::Quit) => return,
            Ok(command) => apply(pipeline, command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if deadline.is_none() {
                    return;
                }
                stdin_open = false;
            }
        }
    }
}

fn apply(pipeline: &PerceptionPipeline, command: Command) {
    let session = pipeline.session();
    match command {
        Command::Start => session.start(Instant::now()),
        Command::Stop => session.stop(),
        Command::Toggle => {
            session.toggle(Instant::now());
        }
        Command::Quit => {}
    }
    eprintln!(
        "{}",
        if session.is_running() {
            "Running."
        } else {
            "Stopped."
        }
    );
}

fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("Unknown command '{}'", line.trim()),
            }
        }
    });
    rx
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "stop" => Some(Command::Stop),
        "toggle" | "t" => Some(Command::Toggle),
        "quit" | "q" | "exit" => Some(Command::Quit),
        _ => None,
    }
}

fn build_model(cli: &Cli) -> Result<OnnxYoloModel, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {}", cli.model_name);
            let path = model_resolver::resolve(
                &cli.model_name,
                cli.model_url.as_deref(),
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    let config = YoloConfig {
        confidence: cli.confidence,
        iou_threshold: cli.iou,
        agnostic_nms: cli.agnostic_nms,
        max_detections: cli.max_det,
        classes: cli.classes.clone(),
        input_size: cli.img_size,
    };
    Ok(OnnxYoloModel::new(&model_path, config)?)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.iou) {
        return Err(format!("IoU threshold must be between 0.0 and 1.0, got {}", cli.iou).into());
    }
    if cli.max_det == 0 {
        return Err("--max-det must be at least 1".into());
    }
    if cli.img_size == 0 {
        return Err("--img-size must be positive".into());
    }
    if cli.period_ms == 0 {
        return Err("--period-ms must be positive".into());
    }
    if cli.line_thickness == 0 {
        return Err("--line-thickness must be at least 1".into());
    }
    if cli.width == 0 || cli.height == 0 {
        return Err(format!(
            "Display size must be positive, got {}x{}",
            cli.width, cli.height
        )
        .into());
    }
    if cli.snapshot_every == 0 {
        return Err("--snapshot-every must be at least 1".into());
    }
    if let Some(size) = &cli.video_size {
        if parse_video_size(size).is_none() {
            return Err(format!("Video size must look like WIDTHxHEIGHT, got '{size}'").into());
        }
    }
    Ok(())
}

fn parse_video_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.split_once('x')?;
    let (w, h) = (w.parse().ok()?, h.parse().ok()?);
    (w > 0 && h > 0).then_some((w, h))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["perceive"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let cli = cli(&[]);
        assert_eq!(cli.device, "/dev/video1");
        assert_eq!(cli.period_ms, 50);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_confidence() {
        assert!(validate(&cli(&["--confidence", "1.5"])).is_err());
    }

    #[test]
    fn test_rejects_missing_model_file() {
        assert!(validate(&cli(&["--model", "/nonexistent/model.onnx"])).is_err());
    }

    #[test]
    fn test_rejects_bad_video_size() {
        assert!(validate(&cli(&["--video-size", "hd"])).is_err());
        assert!(validate(&cli(&["--video-size", "1280x720"])).is_ok());
    }

    #[test]
    fn test_classes_are_comma_separated() {
        assert_eq!(cli(&["--classes", "0,2,7"]).classes, Some(vec![0, 2, 7]));
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(" START "), Some(Command::Start));
        assert_eq!(parse_command("stop"), Some(Command::Stop));
        assert_eq!(parse_command("t"), Some(Command::Toggle));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("launch"), None);
    }

    #[test]
    fn test_parse_video_size() {
        assert_eq!(parse_video_size("640x480"), Some((640, 480)));
        assert_eq!(parse_video_size("0x480"), None);
        assert_eq!(parse_video_size("640"), None);
    }
}
