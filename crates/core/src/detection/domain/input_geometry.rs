/// How a frame was fitted into the model's input tensor.
///
/// The frame is scaled uniformly by `scale_factor` and centred, leaving
/// `pad_left` columns on the left and `pad_top` rows on top (any odd pixel of
/// padding goes to the right/bottom). Inverting a box therefore means
/// subtracting the pads and dividing by the scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputGeometry {
    /// Model input `(width, height)`.
    pub target_size: (u32, u32),
    pub scale_factor: f64,
    pub pad_top: u32,
    pub pad_left: u32,
    /// Source frame `(width, height)`.
    pub original_size: (u32, u32),
}

impl InputGeometry {
    /// Computes the letterbox fit of `original_size` into `target_size`.
    ///
    /// Returns `None` if either size has a zero dimension.
    pub fn letterbox(original_size: (u32, u32), target_size: (u32, u32)) -> Option<Self> {
        let (fw, fh) = original_size;
        let (tw, th) = target_size;
        if fw == 0 || fh == 0 || tw == 0 || th == 0 {
            return None;
        }

        let scale = (tw as f64 / fw as f64).min(th as f64 / fh as f64);
        let new_w = ((fw as f64 * scale).round() as u32).clamp(1, tw);
        let new_h = ((fh as f64 * scale).round() as u32).clamp(1, th);

        Some(Self {
            target_size,
            scale_factor: scale,
            pad_top: (th - new_h) / 2,
            pad_left: (tw - new_w) / 2,
            original_size,
        })
    }

    /// Size of the scaled frame inside the tensor, excluding padding.
    pub fn scaled_size(&self) -> (u32, u32) {
        let (fw, fh) = self.original_size;
        let (tw, th) = self.target_size;
        (
            ((fw as f64 * self.scale_factor).round() as u32).clamp(1, tw),
            ((fh as f64 * self.scale_factor).round() as u32).clamp(1, th),
        )
    }

    /// Projects an original-frame box `[x1, y1, x2, y2]` into model-input space.
    pub fn to_model_space(&self, bbox: [f64; 4]) -> [f64; 4] {
        let s = self.scale_factor;
        let (px, py) = (self.pad_left as f64, self.pad_top as f64);
        [
            bbox[0] * s + px,
            bbox[1] * s + py,
            bbox[2] * s + px,
            bbox[3] * s + py,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_letterbox_landscape_full_hd() {
        let g = InputGeometry::letterbox((1920, 1080), (640, 640)).unwrap();
        assert_relative_eq!(g.scale_factor, 1.0 / 3.0, epsilon = 1e-9);
        assert_eq!(g.pad_left, 0);
        assert_eq!(g.pad_top, 140);
        assert_eq!(g.scaled_size(), (640, 360));
    }

    #[test]
    fn test_letterbox_portrait() {
        // 480x640 portrait into 640x640: scale 1.0, pad 80 left.
        let g = InputGeometry::letterbox((480, 640), (640, 640)).unwrap();
        assert_relative_eq!(g.scale_factor, 1.0);
        assert_eq!(g.pad_left, 80);
        assert_eq!(g.pad_top, 0);
    }

    #[test]
    fn test_letterbox_upscales_small_frames() {
        let g = InputGeometry::letterbox((200, 100), (640, 640)).unwrap();
        assert_relative_eq!(g.scale_factor, 3.2);
        assert_eq!(g.pad_left, 0);
        assert_eq!(g.pad_top, 160);
    }

    #[test]
    fn test_letterbox_non_square_target() {
        let g = InputGeometry::letterbox((640, 480), (320, 192)).unwrap();
        // min(320/640, 192/480) = 0.4 → 256x192, pad_left = 32
        assert_relative_eq!(g.scale_factor, 0.4);
        assert_eq!(g.scaled_size(), (256, 192));
        assert_eq!(g.pad_left, 32);
        assert_eq!(g.pad_top, 0);
    }

    #[rstest]
    #[case::zero_width((0, 480), (640, 640))]
    #[case::zero_height((640, 0), (640, 640))]
    #[case::zero_target((640, 480), (0, 640))]
    fn test_letterbox_rejects_degenerate_sizes(
        #[case] original: (u32, u32),
        #[case] target: (u32, u32),
    ) {
        assert!(InputGeometry::letterbox(original, target).is_none());
    }

    #[test]
    fn test_odd_padding_goes_to_bottom() {
        // 640x479 → scale 1.0, 161 rows of padding: 80 on top, 81 below.
        let g = InputGeometry::letterbox((640, 479), (640, 640)).unwrap();
        assert_eq!(g.pad_top, 80);
    }

    #[test]
    fn test_to_model_space() {
        let g = InputGeometry::letterbox((1920, 1080), (640, 640)).unwrap();
        let projected = g.to_model_space([300.0, 180.0, 900.0, 780.0]);
        assert_relative_eq!(projected[0], 100.0, epsilon = 1e-9);
        assert_relative_eq!(projected[1], 200.0, epsilon = 1e-9);
        assert_relative_eq!(projected[2], 300.0, epsilon = 1e-9);
        assert_relative_eq!(projected[3], 400.0, epsilon = 1e-9);
    }
}
