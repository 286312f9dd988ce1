use crate::capture::domain::camera::{Camera, CaptureError};
use crate::shared::frame::Frame;

/// Options passed to the demuxer when the device is opened.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraOptions {
    /// Requested capture size, e.g. `"1280x720"`.
    pub video_size: Option<String>,
    /// Requested capture rate, e.g. `"30"`.
    pub framerate: Option<String>,
}

/// Live capture device read through ffmpeg-next (libavdevice + libavcodec).
///
/// `/dev/videoN` paths are opened as V4L2 devices once libavdevice is
/// registered; anything else ffmpeg can open (RTSP URLs, files) works too.
/// Each decoded picture is converted to RGB24.
pub struct FfmpegCamera {
    device: String,
    state: Option<DecodeState>,
    frame_index: usize,
}

struct DecodeState {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<Scaler>,
    stream_index: usize,
}

struct Scaler {
    context: ffmpeg_next::software::scaling::Context,
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

// Safety: FfmpegCamera is owned and used by the capture thread only.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn open(device: &str, options: &CameraOptions) -> Result<Self, CaptureError> {
        let open_err = |reason: String| CaptureError::Open {
            device: device.to_string(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let mut dict = ffmpeg_next::Dictionary::new();
        if let Some(ref size) = options.video_size {
            dict.set("video_size", size);
        }
        if let Some(ref rate) = options.framerate {
            dict.set("framerate", rate);
        }

        let input = ffmpeg_next::format::input_with_dictionary(&device, dict)
            .map_err(|e| open_err(e.to_string()))?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| open_err("no video stream found".into()))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;

        log::info!(
            "Opened capture device {device} ({}x{})",
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            device: device.to_string(),
            state: Some(DecodeState {
                input,
                decoder,
                scaler: None,
                stream_index,
            }),
            frame_index: 0,
        })
    }
}

impl Camera for FfmpegCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        let Some(state) = self.state.as_mut() else {
            return Err(CaptureError::NotReady);
        };

        loop {
            if let Some(frame) = state.receive(self.frame_index)? {
                self.frame_index += 1;
                return Ok(frame);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut state.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => return Err(CaptureError::NotReady),
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::error::EAGAIN => {
                    return Err(CaptureError::NotReady);
                }
                Err(e) => return Err(CaptureError::Decode(e.to_string())),
            }

            if packet.stream() != state.stream_index {
                continue;
            }

            state
                .decoder
                .send_packet(&packet)
                .map_err(|e| CaptureError::Decode(e.to_string()))?;
        }
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        if let Some(mut state) = self.state.take() {
            // Drain the decoder; an error here only means nothing was buffered.
            let _ = state.decoder.send_eof();
            log::info!("Released capture device {}", self.device);
        }
        Ok(())
    }
}

impl DecodeState {
    /// Pulls one decoded picture out of the decoder, if it has one ready.
    fn receive(&mut self, index: usize) -> Result<Option<Frame>, CaptureError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let (format, width, height) = (decoded.format(), decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Err(CaptureError::Decode("decoder produced an empty picture".into()));
        }

        let stale = self
            .scaler
            .as_ref()
            .map_or(true, |s| s.format != format || s.width != width || s.height != height);
        if stale {
            let context = ffmpeg_next::software::scaling::Context::get(
                format,
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .map_err(|e| CaptureError::Decode(e.to_string()))?;
            self.scaler = Some(Scaler {
                context,
                format,
                width,
                height,
            });
        }

        let Some(scaler) = self.scaler.as_mut() else {
            return Ok(None);
        };
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .context
            .run(&decoded, &mut rgb_frame)
            .map_err(|e| CaptureError::Decode(e.to_string()))?;

        let pixels = extract_rgb_pixels(rgb_frame.data(0), rgb_frame.stride(0), width, height);
        Frame::try_new(pixels, width, height, 3, index)
            .map(Some)
            .ok_or_else(|| CaptureError::Decode(format!("short RGB buffer for {width}x{height}")))
    }
}

/// Copies pixel rows into a tightly packed RGB buffer.
///
/// ffmpeg rows may carry padding bytes (stride > width * 3).
fn extract_rgb_pixels(data: &[u8], stride: usize, width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
