use ndarray::Array4;

use crate::detection::domain::detection_model::InferenceError;
use crate::detection::domain::input_geometry::InputGeometry;
use crate::shared::constants::LETTERBOX_FILL;
use crate::shared::frame::Frame;

/// Letterbox-resize a frame into an NCHW float32 tensor of `target_size`.
///
/// Pixels are resampled nearest-neighbour, normalised to `[0, 1]` and placed
/// at the offsets recorded in the returned [`InputGeometry`]; the remainder
/// is filled with neutral grey.
pub fn letterbox(
    frame: &Frame,
    target_size: (u32, u32),
) -> Result<(Array4<f32>, InputGeometry), InferenceError> {
    if frame.channels() != 3 {
        return Err(InferenceError::EmptyFrame(format!(
            "expected 3 channels, got {}",
            frame.channels()
        )));
    }
    let geometry = InputGeometry::letterbox(frame.size(), target_size).ok_or_else(|| {
        InferenceError::EmptyFrame(format!(
            "cannot fit {}x{} into {}x{}",
            frame.width(),
            frame.height(),
            target_size.0,
            target_size.1
        ))
    })?;

    let (tw, th) = (target_size.0 as usize, target_size.1 as usize);
    let fill = LETTERBOX_FILL as f32 / 255.0;
    let mut tensor = Array4::<f32>::from_elem((1, 3, th, tw), fill);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let (new_w, new_h) = geometry.scaled_size();
    let scale = geometry.scale_factor;
    let (pad_x, pad_y) = (geometry.pad_left as usize, geometry.pad_top as usize);

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y + y, pad_x + x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    Ok((tensor, geometry))
}
