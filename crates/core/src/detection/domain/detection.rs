use std::time::Duration;

use crate::detection::domain::input_geometry::InputGeometry;

/// One detected object, in model-input pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in the letterboxed tensor's coordinate system.
    pub bbox: [f32; 4],
    pub class_id: usize,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: [f32; 4], class_id: usize, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }

    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }
}

/// The output of one detector cycle.
///
/// Boxes and the geometry that produced them always travel together; a set
/// is published and replaced as a single value.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionSet {
    pub detections: Vec<Detection>,
    pub geometry: InputGeometry,
    /// Index of the frame the detections were computed from.
    pub frame_index: usize,
    pub inference_time: Duration,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}
