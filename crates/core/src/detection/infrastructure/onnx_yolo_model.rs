/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Runs the exported network on an already-letterboxed tensor and turns the
/// raw prediction grid into thresholded, NMS-filtered boxes in model-input
/// pixel coordinates.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_model::{DetectionModel, InferenceError};
use crate::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_INPUT_SIZE, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS,
};

use super::execution_provider::Accelerator;
use super::math::nms;

/// Network stride; input sizes are rounded up to a multiple of it.
const MODEL_STRIDE: u32 = 32;

/// Post-processing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct YoloConfig {
    pub confidence: f32,
    pub iou_threshold: f32,
    /// Suppress overlapping boxes regardless of class.
    pub agnostic_nms: bool,
    pub max_detections: usize,
    /// Keep only these class ids when set.
    pub classes: Option<Vec<usize>>,
    /// Input size used when the model's input shape is dynamic.
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            agnostic_nms: false,
            max_detections: DEFAULT_MAX_DETECTIONS,
            classes: None,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

/// Prediction layout of the model output tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, N, 5 + C]`: box, objectness, class scores (YOLOv5).
    Anchors,
    /// `[1, 4 + C, N]`: box, class scores (YOLOv8 and later).
    Transposed,
}

impl OutputLayout {
    pub fn detect(shape: &[usize]) -> Result<Self, InferenceError> {
        match shape {
            [1, a, b] if a < b && *a > 4 => Ok(Self::Transposed),
            [1, _, f] if *f > 5 => Ok(Self::Anchors),
            _ => Err(InferenceError::OutputShape(shape.to_vec())),
        }
    }
}

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxYoloModel {
    session: ort::session::Session,
    config: YoloConfig,
    input_size: (u32, u32),
}

impl OnnxYoloModel {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Falls back to `config.input_size` if the shape is dynamic.
    pub fn new(model_path: &Path, config: YoloConfig) -> Result<Self, InferenceError> {
        let accelerator = Accelerator::preferred();
        log::info!("Loading {} on {accelerator}", model_path.display());
        let session = load_session(model_path, accelerator)
            .map_err(|e| InferenceError::Model(format!("{}: {e}", model_path.display())))?;

        let declared = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                if shape.len() >= 4 && shape[2] > 0 && shape[3] > 0 {
                    Some((shape[3] as u32, shape[2] as u32))
                } else {
                    None
                }
            } else {
                None
            }
        });
        let fallback = make_divisible(config.input_size, MODEL_STRIDE);
        let input_size = declared.unwrap_or((fallback, fallback));

        log::info!(
            "Loaded {} (input {}x{})",
            model_path.display(),
            input_size.0,
            input_size.1
        );

        Ok(Self {
            session,
            config,
            input_size,
        })
    }

    fn run(&mut self, tensor: Array4<f32>) -> Result<(Vec<usize>, Vec<f32>), InferenceError> {
        let input_value =
            ort::value::Tensor::from_array(tensor).map_err(|e| InferenceError::Model(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(InferenceError::Model("model produced no outputs".into()));
        }
        let array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| InferenceError::Model(e.to_string()))?;
        Ok((array.shape().to_vec(), array.iter().copied().collect()))
    }
}

impl DetectionModel for OnnxYoloModel {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    fn warmup(&mut self) -> Result<(), InferenceError> {
        let (w, h) = self.input_size;
        let zeros = Array4::<f32>::zeros((1, 3, h as usize, w as usize));
        self.run(zeros).map(|_| ())
    }

    fn infer(&mut self, tensor: Array4<f32>) -> Result<Vec<Detection>, InferenceError> {
        let (shape, data) = self.run(tensor)?;
        decode_predictions(&shape, &data, &self.config)
    }
}

fn load_session(
    model_path: &Path,
    accelerator: Accelerator,
) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    let session = ort::session::Session::builder()?
        .with_execution_providers(accelerator.execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// Decode a raw YOLO output tensor into filtered detections.
///
/// Boxes come out as `[x1, y1, x2, y2]` in model-input pixels.
pub fn decode_predictions(
    shape: &[usize],
    data: &[f32],
    config: &YoloConfig,
) -> Result<Vec<Detection>, InferenceError> {
    let layout = OutputLayout::detect(shape)?;
    if data.len() != shape.iter().product::<usize>() {
        return Err(InferenceError::OutputShape(shape.to_vec()));
    }

    let (num_dets, num_feats) = match layout {
        OutputLayout::Anchors => (shape[1], shape[2]),
        OutputLayout::Transposed => (shape[2], shape[1]),
    };
    let class_offset = match layout {
        OutputLayout::Anchors => 5,
        OutputLayout::Transposed => 4,
    };
    let value = |det: usize, feat: usize| match layout {
        OutputLayout::Anchors => data[det * num_feats + feat],
        OutputLayout::Transposed => data[feat * num_dets + det],
    };

    let mut candidates = Vec::new();
    for i in 0..num_dets {
        let objectness = match layout {
            OutputLayout::Anchors => value(i, 4),
            OutputLayout::Transposed => 1.0,
        };
        if objectness <= config.confidence {
            continue;
        }

        let mut best = (0usize, f32::MIN);
        for c in 0..num_feats - class_offset {
            let score = value(i, class_offset + c);
            if score > best.1 {
                best = (c, score);
            }
        }
        let (class_id, class_score) = best;
        let confidence = class_score * objectness;
        if confidence <= config.confidence {
            continue;
        }
        if let Some(classes) = &config.classes {
            if !classes.contains(&class_id) {
                continue;
            }
        }

        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        candidates.push(Detection::new(
            [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            class_id,
            confidence,
        ));
    }

    Ok(nms(
        candidates,
        config.iou_threshold,
        config.agnostic_nms,
        config.max_detections,
    ))
}

/// Round `value` up to the nearest multiple of `divisor`.
pub fn make_divisible(value: u32, divisor: u32) -> u32 {
    value.max(1).div_ceil(divisor) * divisor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    /// Builds a `[1, N, 5 + C]` tensor from rows.
    fn anchors(rows: &[Vec<f32>]) -> (Vec<usize>, Vec<f32>) {
        let feats = rows[0].len();
        (
            vec![1, rows.len(), feats],
            rows.iter().flatten().copied().collect(),
        )
    }

    /// Builds a `[1, 4 + C, N]` tensor from per-detection rows.
    fn transposed(rows: &[Vec<f32>]) -> (Vec<usize>, Vec<f32>) {
        let feats = rows[0].len();
        let mut data = Vec::with_capacity(feats * rows.len());
        for f in 0..feats {
            for row in rows {
                data.push(row[f]);
            }
        }
        (vec![1, feats, rows.len()], data)
    }

    #[rstest]
    #[case::v5(vec![1, 25200, 85], OutputLayout::Anchors)]
    #[case::v8(vec![1, 84, 8400], OutputLayout::Transposed)]
    #[case::single_class_v5(vec![1, 3, 6], OutputLayout::Anchors)]
    fn test_layout_detection(#[case] shape: Vec<usize>, #[case] expected: OutputLayout) {
        assert_eq!(OutputLayout::detect(&shape).unwrap(), expected);
    }

    #[rstest]
    #[case::rank_two(vec![25200, 85])]
    #[case::batch_two(vec![2, 25200, 85])]
    #[case::too_few_features(vec![1, 10, 4])]
    fn test_layout_rejects_unknown_shapes(#[case] shape: Vec<usize>) {
        assert!(matches!(
            OutputLayout::detect(&shape),
            Err(InferenceError::OutputShape(_))
        ));
    }

    #[test]
    fn test_decode_anchor_layout_multiplies_objectness() {
        // cx, cy, w, h, obj, class0, class1
        let (shape, data) = anchors(&[
            vec![100.0, 100.0, 40.0, 20.0, 0.9, 0.1, 0.8],
            vec![300.0, 300.0, 10.0, 10.0, 0.3, 0.9, 0.1],
        ]);
        let dets = decode_predictions(&shape, &data, &YoloConfig::default()).unwrap();

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_relative_eq!(dets[0].confidence, 0.72, epsilon = 1e-6);
        assert_eq!(dets[0].bbox, [80.0, 90.0, 120.0, 110.0]);
    }

    #[test]
    fn test_decode_transposed_layout() {
        // cx, cy, w, h, class0, class1, class2
        let (shape, data) = transposed(&[
            vec![50.0, 60.0, 20.0, 20.0, 0.05, 0.1, 0.95],
            vec![200.0, 200.0, 50.0, 50.0, 0.6, 0.2, 0.1],
            vec![400.0, 400.0, 50.0, 50.0, 0.2, 0.3, 0.1],
            vec![10.0, 10.0, 4.0, 4.0, 0.1, 0.1, 0.1],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ]);
        assert_eq!(shape, vec![1, 7, 8]);
        let dets = decode_predictions(&shape, &data, &YoloConfig::default()).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 2);
        assert_eq!(dets[0].bbox, [40.0, 50.0, 60.0, 70.0]);
        assert_eq!(dets[1].class_id, 0);
    }

    #[test]
    fn test_decode_applies_nms() {
        let (shape, data) = anchors(&[
            vec![100.0, 100.0, 50.0, 50.0, 0.95, 0.9],
            vec![102.0, 101.0, 50.0, 50.0, 0.9, 0.9],
        ]);
        let dets = decode_predictions(&shape, &data, &YoloConfig::default()).unwrap();
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn test_decode_class_filter() {
        let (shape, data) = anchors(&[
            vec![100.0, 100.0, 50.0, 50.0, 0.95, 0.9, 0.0],
            vec![300.0, 300.0, 50.0, 50.0, 0.95, 0.0, 0.9],
        ]);
        let config = YoloConfig {
            classes: Some(vec![1]),
            ..YoloConfig::default()
        };
        let dets = decode_predictions(&shape, &data, &config).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
    }

    #[test]
    fn test_decode_rejects_truncated_data() {
        let shape = vec![1, 2, 6];
        assert!(matches!(
            decode_predictions(&shape, &[0.0; 6], &YoloConfig::default()),
            Err(InferenceError::OutputShape(_))
        ));
    }

    #[rstest]
    #[case(640, 640)]
    #[case(600, 608)]
    #[case(1, 32)]
    #[case(0, 32)]
    fn test_make_divisible(#[case] value: u32, #[case] expected: u32) {
        assert_eq!(make_divisible(value, MODEL_STRIDE), expected);
    }

    #[test]
    fn test_missing_model_file_is_a_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxYoloModel::new(&dir.path().join("missing.onnx"), YoloConfig::default());
        assert!(matches!(result, Err(InferenceError::Model(_))));
    }
}
