use ndarray::Array4;
use thiserror::Error;

use crate::detection::domain::detection::Detection;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("frame cannot be letterboxed: {0}")]
    EmptyFrame(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("unexpected model output shape {0:?}")]
    OutputShape(Vec<usize>),
}

/// Domain interface for an object-detection model.
///
/// The input tensor is NCHW float32 with batch size 1, RGB channel order and
/// values scaled to `[0, 1]`, sized to [`DetectionModel::input_size`].
/// Implementations apply their own confidence threshold and non-max
/// suppression and return boxes in the tensor's pixel coordinates.
pub trait DetectionModel: Send {
    /// Model input `(width, height)`.
    fn input_size(&self) -> (u32, u32);

    /// One-time initialisation pass run before the first real inference.
    fn warmup(&mut self) -> Result<(), InferenceError>;

    fn infer(&mut self, tensor: Array4<f32>) -> Result<Vec<Detection>, InferenceError>;
}
