//! Draws mapped detections onto a frame: class-coloured boxes and labels.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detection::domain::class_names::ClassNames;
use crate::detection::domain::coordinate_mapper::MappedDetection;
use crate::render::domain::glyphs::{draw_text_mut, text_size};
use crate::render::domain::palette::{class_color, prefers_dark_text};

/// Box label text, e.g. `person 0.87`.
pub fn label_text(names: &ClassNames, detection: &MappedDetection) -> String {
    format!("{} {:.2}", names.label(detection.class_id), detection.confidence)
}

/// Draws every detection onto `image` and returns how many were drawn.
///
/// Boxes are drawn lowest confidence first so the strongest label ends up
/// on top. Lines grow inwards from the box edge by `thickness` pixels.
pub fn draw_detections(
    image: &mut RgbImage,
    detections: &[MappedDetection],
    names: &ClassNames,
    thickness: u32,
) -> usize {
    if image.width() == 0 || image.height() == 0 {
        return 0;
    }
    let thickness = thickness.max(1);

    let mut order: Vec<&MappedDetection> = detections.iter().collect();
    order.sort_by(|a, b| {
        a.confidence
            .partial_cmp(&b.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for det in &order {
        let color = class_color(det.class_id);
        draw_box(image, det, thickness, color);
        draw_label(image, det, &label_text(names, det), thickness, color);
    }
    order.len()
}

fn draw_box(image: &mut RgbImage, det: &MappedDetection, thickness: u32, color: [u8; 3]) {
    let b = det.bbox;
    let (w, h) = (b.width() + 1, b.height() + 1);
    for t in 0..thickness {
        let (iw, ih) = (w.saturating_sub(2 * t), h.saturating_sub(2 * t));
        if iw == 0 || ih == 0 {
            break;
        }
        let rect = Rect::at((b.x1 + t) as i32, (b.y1 + t) as i32).of_size(iw, ih);
        draw_hollow_rect_mut(image, rect, Rgb(color));
    }
}

fn draw_label(image: &mut RgbImage, det: &MappedDetection, text: &str, scale: u32, color: [u8; 3]) {
    let (tw, th) = text_size(text, scale);
    if tw == 0 {
        return;
    }
    let pad = scale;
    let (bw, bh) = (tw + 2 * pad, th + 2 * pad);

    // Above the box when it fits, otherwise tucked inside its top edge.
    let top = if det.bbox.y1 >= bh {
        det.bbox.y1 - bh
    } else {
        det.bbox.y1
    };
    let left = det.bbox.x1.min(image.width().saturating_sub(bw));

    draw_filled_rect_mut(image, Rect::at(left as i32, top as i32).of_size(bw, bh), Rgb(color));
    let text_color = if prefers_dark_text(color) {
        [0, 0, 0]
    } else {
        [255, 255, 255]
    };
    draw_text_mut(
        image,
        text,
        (left + pad) as i64,
        (top + pad) as i64,
        scale,
        text_color,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::coordinate_mapper::PixelBox;

    fn mapped(x1: u32, y1: u32, x2: u32, y2: u32, class_id: usize, confidence: f32) -> MappedDetection {
        MappedDetection {
            bbox: PixelBox { x1, y1, x2, y2 },
            class_id,
            confidence,
        }
    }

    #[test]
    fn test_label_text() {
        let det = mapped(0, 0, 1, 1, 0, 0.8734);
        assert_eq!(label_text(&ClassNames::coco(), &det), "person 0.87");
        let det = mapped(0, 0, 1, 1, 500, 0.5);
        assert_eq!(label_text(&ClassNames::coco(), &det), "class 500 0.50");
    }

    #[test]
    fn test_box_edges_use_class_color() {
        let mut img = RgbImage::new(200, 200);
        let det = mapped(40, 100, 120, 180, 2, 0.9);
        let drawn = draw_detections(&mut img, &[det], &ClassNames::coco(), 2);

        let color = Rgb(class_color(2));
        assert_eq!(drawn, 1);
        assert_eq!(*img.get_pixel(40, 150), color);
        assert_eq!(*img.get_pixel(41, 150), color);
        assert_eq!(*img.get_pixel(120, 150), color);
        assert_eq!(*img.get_pixel(80, 180), color);
        // Thickness 2 stops at the third pixel in.
        assert_eq!(*img.get_pixel(42, 150), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(80, 140), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_label_sits_above_box_when_there_is_room() {
        let mut img = RgbImage::new(300, 300);
        let det = mapped(50, 100, 250, 250, 0, 0.9);
        draw_detections(&mut img, &[det], &ClassNames::coco(), 1);

        let color = Rgb(class_color(0));
        // Label background covers the row just above the box.
        assert_eq!(*img.get_pixel(50, 99), color);
        // Nothing is painted well inside the box.
        assert_eq!(*img.get_pixel(150, 180), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_label_moves_inside_box_at_top_edge() {
        let mut img = RgbImage::new(300, 300);
        let det = mapped(50, 0, 250, 250, 0, 0.9);
        draw_detections(&mut img, &[det], &ClassNames::coco(), 1);

        // Background fills the inside of the top-left corner.
        assert_eq!(*img.get_pixel(52, 2), Rgb(class_color(0)));
    }

    #[test]
    fn test_label_shifted_left_at_right_edge() {
        let mut img = RgbImage::new(100, 100);
        let det = mapped(95, 50, 99, 60, 0, 0.9);
        draw_detections(&mut img, &[det], &ClassNames::coco(), 1);

        let (tw, _) = text_size("person 0.90", 1);
        let left = 100 - (tw + 2);
        assert_eq!(*img.get_pixel(left, 49), Rgb(class_color(0)));
    }

    #[test]
    fn test_strongest_detection_drawn_last() {
        let mut img = RgbImage::new(100, 100);
        let weak = mapped(10, 30, 60, 80, 1, 0.4);
        let strong = mapped(10, 30, 60, 80, 2, 0.9);
        draw_detections(&mut img, &[strong, weak], &ClassNames::coco(), 1);

        assert_eq!(*img.get_pixel(10, 60), Rgb(class_color(2)));
    }

    #[test]
    fn test_degenerate_box_does_not_panic() {
        let mut img = RgbImage::new(10, 10);
        let det = mapped(9, 9, 9, 9, 0, 0.9);
        assert_eq!(draw_detections(&mut img, &[det], &ClassNames::coco(), 4), 1);
        assert_eq!(*img.get_pixel(9, 9), Rgb(class_color(0)));
    }

    #[test]
    fn test_empty_image_draws_nothing() {
        let mut img = RgbImage::new(0, 0);
        let det = mapped(0, 0, 0, 0, 0, 0.9);
        assert_eq!(draw_detections(&mut img, &[det], &ClassNames::coco(), 2), 0);
    }
}
