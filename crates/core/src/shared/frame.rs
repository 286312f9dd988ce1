use image::imageops::FilterType;
use image::RgbImage;
use ndarray::ArrayView3;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Frames are shared between pipeline stages behind an `Arc` and never
/// mutated after they are published. Stages that need to draw on a frame
/// work on their own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    /// # Panics
    ///
    /// If `data.len()` is not `width * height * channels`, in every build
    /// profile. Use [`Frame::try_new`] for buffers from untrusted sources.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        let expected = expected_len(width, height, channels);
        assert_eq!(
            data.len(),
            expected,
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Like [`Frame::new`], but returns `None` when the buffer length does
    /// not match the dimensions.
    pub fn try_new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
    ) -> Option<Self> {
        (data.len() == expected_len(width, height, channels)).then(|| Self {
            data,
            width,
            height,
            channels,
            index,
        })
    }

    /// Wraps an `image` RGB buffer without copying.
    pub fn from_rgb_image(image: RgbImage, index: usize) -> Self {
        let (width, height) = image.dimensions();
        Self::new(image.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Capture sequence number assigned by the frame source.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        // Both constructors check the length, so the shape always fits.
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Consumes the frame into an `image` RGB buffer.
    ///
    /// Returns `None` for non-RGB frames.
    pub fn into_rgb_image(self) -> Option<RgbImage> {
        if self.channels != 3 {
            return None;
        }
        RgbImage::from_raw(self.width, self.height, self.data)
    }

    /// Returns a copy scaled to exactly `width` × `height` (aspect ratio is
    /// not preserved). Same-size requests return a plain clone.
    pub fn resized(&self, width: u32, height: u32) -> Frame {
        if (width, height) == self.size() || width == 0 || height == 0 {
            return self.clone();
        }
        let index = self.index;
        match self.clone().into_rgb_image() {
            Some(img) => {
                let scaled = image::imageops::resize(&img, width, height, FilterType::Triangle);
                Frame::from_rgb_image(scaled, index)
            }
            None => self.clone(),
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn expected_len(width: u32, height: u32, channels: u8) -> usize {
    (width as usize) * (height as usize) * (channels as usize)
}
