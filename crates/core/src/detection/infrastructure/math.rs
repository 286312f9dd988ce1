//! Box overlap and non-max suppression for YOLO post-processing.

use crate::detection::domain::detection::Detection;

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
///
/// With `agnostic == false` only boxes of the same class suppress each other.
/// At most `max_det` boxes are returned.
pub fn nms(mut dets: Vec<Detection>, iou_thresh: f32, agnostic: bool, max_det: usize) -> Vec<Detection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if keep.len() >= max_det {
            break;
        }
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if !agnostic && dets[i].class_id != dets[j].class_id {
                continue;
            }
            if bbox_iou(&dets[i].bbox, &dets[j].bbox) > iou_thresh {
                suppressed[j] = true;
            }
        }
        keep.push(dets[i].clone());
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(bbox: [f32; 4], class_id: usize, confidence: f32) -> Detection {
        Detection::new(bbox, class_id, confidence)
    }

    #[test]
    fn test_bbox_iou_no_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [20.0, 20.0, 30.0, 30.0];
        assert_eq!(bbox_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_bbox_iou_perfect_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((bbox_iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_iou_partial_overlap() {
        let a = [0.0, 0.0, 10.0, 10.0];
        let b = [5.0, 5.0, 15.0, 15.0];
        let expected = 25.0 / 175.0;
        assert!((bbox_iou(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping_same_class() {
        let dets = vec![
            det([0.0, 0.0, 100.0, 100.0], 0, 0.8),
            det([5.0, 5.0, 105.0, 105.0], 0, 0.9),
        ];
        let kept = nms(dets, 0.45, false, 100);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_class_aware_nms_keeps_other_classes() {
        let dets = vec![
            det([0.0, 0.0, 100.0, 100.0], 0, 0.9),
            det([5.0, 5.0, 105.0, 105.0], 2, 0.8),
        ];
        assert_eq!(nms(dets, 0.45, false, 100).len(), 2);
    }

    #[test]
    fn test_agnostic_nms_suppresses_across_classes() {
        let dets = vec![
            det([0.0, 0.0, 100.0, 100.0], 0, 0.9),
            det([5.0, 5.0, 105.0, 105.0], 2, 0.8),
        ];
        let kept = nms(dets, 0.45, true, 100);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_id, 0);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let dets = vec![
            det([0.0, 0.0, 50.0, 50.0], 0, 0.9),
            det([200.0, 200.0, 250.0, 250.0], 0, 0.8),
        ];
        assert_eq!(nms(dets, 0.45, false, 100).len(), 2);
    }

    #[test]
    fn test_nms_caps_at_max_det_by_confidence() {
        let dets = vec![
            det([0.0, 0.0, 10.0, 10.0], 0, 0.6),
            det([20.0, 0.0, 30.0, 10.0], 0, 0.9),
            det([40.0, 0.0, 50.0, 10.0], 0, 0.7),
        ];
        let kept = nms(dets, 0.45, false, 2);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!((kept[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_empty_input() {
        assert!(nms(Vec::new(), 0.45, false, 100).is_empty());
    }
}
