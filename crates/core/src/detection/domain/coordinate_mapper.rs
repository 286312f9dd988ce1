//! Inverse letterbox: projects model-space boxes back onto frame pixels.
//!
//! Stateless and side-effect free. The steps are: subtract the padding,
//! divide by the scale factor, rescale if the destination differs from the
//! frame the geometry was recorded for, round to the nearest pixel, then clip
//! to the destination bounds.

use crate::detection::domain::detection::{Detection, DetectionSet};
use crate::detection::domain::input_geometry::InputGeometry;

/// Integer pixel box, inclusive-exclusive in spirit but clipped so every
/// coordinate is a valid pixel index of the destination image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl PixelBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// A detection expressed in destination-image pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct MappedDetection {
    pub bbox: PixelBox,
    pub class_id: usize,
    pub confidence: f32,
}

/// Maps one model-space box onto an image of `dest_size`.
///
/// Returns `None` when the destination has a zero dimension.
pub fn map_box(bbox: [f32; 4], geometry: &InputGeometry, dest_size: (u32, u32)) -> Option<PixelBox> {
    let (dw, dh) = dest_size;
    if dw == 0 || dh == 0 {
        return None;
    }

    let (ow, oh) = geometry.original_size;
    let rx = if ow > 0 { dw as f64 / ow as f64 } else { 1.0 };
    let ry = if oh > 0 { dh as f64 / oh as f64 } else { 1.0 };
    let scale = geometry.scale_factor;
    let (px, py) = (geometry.pad_left as f64, geometry.pad_top as f64);

    let x = |v: f32| clip(((v as f64 - px) / scale * rx).round(), dw);
    let y = |v: f32| clip(((v as f64 - py) / scale * ry).round(), dh);

    Some(PixelBox {
        x1: x(bbox[0]),
        y1: y(bbox[1]),
        x2: x(bbox[2]),
        y2: y(bbox[3]),
    })
}

/// Maps every detection of a set onto an image of `dest_size`.
pub fn map_detections(set: &DetectionSet, dest_size: (u32, u32)) -> Vec<MappedDetection> {
    map_all(&set.detections, &set.geometry, dest_size)
}

pub fn map_all(
    detections: &[Detection],
    geometry: &InputGeometry,
    dest_size: (u32, u32),
) -> Vec<MappedDetection> {
    detections
        .iter()
        .filter_map(|d| {
            map_box(d.bbox, geometry, dest_size).map(|bbox| MappedDetection {
                bbox,
                class_id: d.class_id,
                confidence: d.confidence,
            })
        })
        .collect()
}

fn clip(v: f64, limit: u32) -> u32 {
    v.clamp(0.0, (limit - 1) as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn geometry(original: (u32, u32), target: (u32, u32)) -> InputGeometry {
        InputGeometry::letterbox(original, target).unwrap()
    }

    #[test]
    fn test_full_hd_example() {
        let g = geometry((1920, 1080), (640, 640));
        let mapped = map_box([100.0, 200.0, 300.0, 400.0], &g, (1920, 1080)).unwrap();
        assert_eq!(
            mapped,
            PixelBox {
                x1: 300,
                y1: 180,
                x2: 900,
                y2: 780
            }
        );
    }

    #[test]
    fn test_boxes_in_padding_are_clipped() {
        let g = geometry((1920, 1080), (640, 640));
        // Entirely inside the top padding band, and past the right edge.
        let mapped = map_box([-20.0, 10.0, 700.0, 130.0], &g, (1920, 1080)).unwrap();
        assert_eq!(mapped.x1, 0);
        assert_eq!(mapped.y1, 0);
        assert_eq!(mapped.x2, 1919);
        assert_eq!(mapped.y2, 0);
    }

    #[test]
    fn test_bottom_right_corner_clips_to_last_pixel() {
        let g = geometry((1920, 1080), (640, 640));
        let mapped = map_box([0.0, 140.0, 640.0, 500.0], &g, (1920, 1080)).unwrap();
        assert_eq!(mapped.x2, 1919);
        assert_eq!(mapped.y2, 1079);
    }

    #[test]
    fn test_rounds_after_unscaling() {
        // scale 1/3: model x=100.4 → 301.2 → 301. Rounding before unscaling
        // would give 100 → 300.
        let g = geometry((1920, 1080), (640, 640));
        let mapped = map_box([100.4, 140.0, 200.0, 240.0], &g, (1920, 1080)).unwrap();
        assert_eq!(mapped.x1, 301);
    }

    #[test]
    fn test_destination_differs_from_original() {
        // Geometry recorded for 1920x1080, drawn onto a 960x540 copy.
        let g = geometry((1920, 1080), (640, 640));
        let mapped = map_box([100.0, 200.0, 300.0, 400.0], &g, (960, 540)).unwrap();
        assert_eq!(
            mapped,
            PixelBox {
                x1: 150,
                y1: 90,
                x2: 450,
                y2: 390
            }
        );
    }

    #[test]
    fn test_zero_destination_yields_none() {
        let g = geometry((640, 480), (640, 640));
        assert!(map_box([0.0, 0.0, 10.0, 10.0], &g, (0, 480)).is_none());
    }

    #[rstest]
    #[case::full_hd_square((1920, 1080), (640, 640))]
    #[case::portrait((720, 1280), (640, 640))]
    #[case::vga((640, 480), (640, 640))]
    #[case::tiny_upscaled((160, 90), (640, 640))]
    #[case::wide_target((1280, 720), (640, 384))]
    #[case::tall_target((1080, 1920), (320, 640))]
    #[case::odd_sizes((1001, 777), (416, 416))]
    fn test_round_trip_within_one_pixel(#[case] original: (u32, u32), #[case] target: (u32, u32)) {
        let g = geometry(original, target);
        let (w, h) = (original.0 as f64, original.1 as f64);
        let boxes = [
            [0.0, 0.0, w - 1.0, h - 1.0],
            [w * 0.1, h * 0.2, w * 0.4, h * 0.9],
            [w * 0.5, h * 0.5, w * 0.75, h * 0.6],
            [13.0, 7.0, 29.0, 41.0],
        ];

        for b in boxes {
            let b: [f64; 4] = b.map(f64::round);
            let m = g.to_model_space(b);
            let model_box = [m[0] as f32, m[1] as f32, m[2] as f32, m[3] as f32];
            let back = map_box(model_box, &g, original).unwrap();
            let got = [back.x1, back.y1, back.x2, back.y2];
            for (orig, mapped) in b.iter().zip(got) {
                assert!(
                    (orig - mapped as f64).abs() <= 1.0,
                    "{original:?}->{target:?}: {b:?} came back as {got:?}"
                );
            }
        }
    }

    #[test]
    fn test_map_detections_keeps_class_and_confidence() {
        let g = geometry((1920, 1080), (640, 640));
        let set = DetectionSet {
            detections: vec![
                Detection::new([100.0, 200.0, 300.0, 400.0], 2, 0.8),
                Detection::new([0.0, 140.0, 10.0, 150.0], 7, 0.6),
            ],
            geometry: g,
            frame_index: 4,
            inference_time: std::time::Duration::ZERO,
        };
        let mapped = map_detections(&set, (1920, 1080));
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].class_id, 2);
        assert_eq!(mapped[0].confidence, 0.8);
        assert_eq!(mapped[1].class_id, 7);
        assert_eq!(mapped[1].bbox.x1, 0);
        assert_eq!(mapped[1].bbox.y1, 0);
    }
}
