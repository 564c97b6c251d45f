/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, per-class NMS and mapping of
/// boxes back into frame coordinates.
use std::path::Path;

use crate::detection::domain::detection_model::{DetectionModel, ModelError};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_NUM_CLASSES;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;
use super::math::bbox_iou;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of box values (`cx, cy, w, h`) ahead of the class scores in each row.
const BOX_VALUES: usize = 4;

pub struct OnnxYoloModel {
    session: Option<ort::session::Session>,
    num_classes: usize,
    input_size_override: Option<u32>,
    input_size: u32,
}

impl OnnxYoloModel {
    /// `input_size` overrides whatever the model declares; `None` reads it
    /// from the model's NCHW input shape.
    pub fn new(num_classes: usize, input_size: Option<u32>) -> Self {
        Self {
            session: None,
            num_classes: num_classes.max(1),
            input_size_override: input_size,
            input_size: input_size.unwrap_or(DEFAULT_INPUT_SIZE),
        }
    }
}

impl Default for OnnxYoloModel {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_CLASSES, None)
    }
}

impl DetectionModel for OnnxYoloModel {
    fn describe(&self) -> String {
        format!(
            "YOLO/ONNX ({} class(es), input {}px)",
            self.num_classes, self.input_size
        )
    }

    fn load(&mut self, weights: &Path) -> Result<(), ModelError> {
        if !weights.is_file() {
            return Err(ModelError::Unreadable {
                path: weights.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        let unreadable = |e: ort::Error| ModelError::Unreadable {
            path: weights.to_path_buf(),
            reason: e.to_string(),
        };
        let session = ort::session::Session::builder()
            .map_err(unreadable)?
            .with_execution_providers(preferred_execution_providers())
            .map_err(|e| unreadable(e.into()))?
            .commit_from_file(weights)
            .map_err(unreadable)?;

        // NCHW: [1, 3, H, W]; dynamic axes are reported as -1.
        let shape: Vec<i64> = match session.inputs().first().map(|input| input.dtype()) {
            Some(ort::value::ValueType::Tensor { shape, .. }) => shape.iter().copied().collect(),
            _ => {
                return Err(ModelError::Incompatible {
                    path: weights.to_path_buf(),
                    reason: "model has no tensor input".to_string(),
                })
            }
        };
        if shape.len() != 4 {
            return Err(ModelError::Incompatible {
                path: weights.to_path_buf(),
                reason: format!("expected a 4-D image input, got shape {shape:?}"),
            });
        }

        self.input_size = match (self.input_size_override, shape[2]) {
            (Some(size), _) => size,
            (None, h) if h > 0 => h as u32,
            (None, _) => DEFAULT_INPUT_SIZE,
        };
        log::info!(
            "Loaded {} ({})",
            weights.display(),
            self.describe()
        );
        self.session = Some(session);
        Ok(())
    }

    fn infer(&mut self, frame: &Frame, threshold: f64) -> Result<Vec<Detection>, ModelError> {
        let session = self.session.as_mut().ok_or(ModelError::NotLoaded)?;
        let inference = |e: ort::Error| ModelError::Inference(e.to_string());

        let (input_tensor, letterbox) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor).map_err(inference)?;
        let outputs = session.run(ort::inputs![input_value]).map_err(inference)?;
        if outputs.len() == 0 {
            return Err(ModelError::Inference("model produced no outputs".to_string()));
        }
        let tensor = outputs[0].try_extract_array::<f32>().map_err(inference)?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or_else(|| ModelError::Inference("output tensor is not contiguous".to_string()))?;

        let candidates = decode_output(data, &shape, self.num_classes, threshold, &letterbox)?;
        Ok(finalize(candidates, frame.width(), frame.height()))
    }

    fn unload(&mut self) {
        if self.session.take().is_some() {
            log::info!("Unloaded {}", self.describe());
        }
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Mapping between frame coordinates and the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn to_frame(self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.pad_x as f64) / self.scale,
            (y - self.pad_y as f64) / self.scale,
        )
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns the NCHW float32 tensor and the transform back to frame space.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// A detection candidate in frame coordinates, before clamping.
#[derive(Clone, Debug)]
struct Candidate {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    class_id: u32,
    confidence: f64,
}

impl Candidate {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// Parses raw YOLO output into candidates at or above `threshold`.
///
/// Output shape is `[1, features, anchors]` (transposed, the YOLOv8 export)
/// or `[1, anchors, features]`. Each row is `[cx, cy, w, h, score_0, ...]`;
/// any trailing values past the class scores are ignored.
fn decode_output(
    data: &[f32],
    shape: &[usize],
    num_classes: usize,
    threshold: f64,
    letterbox: &Letterbox,
) -> Result<Vec<Candidate>, ModelError> {
    if shape.len() != 3 {
        return Err(ModelError::Inference(format!(
            "unexpected YOLO output shape {shape:?}"
        )));
    }
    let transposed = shape[1] < shape[2];
    let (num_rows, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < BOX_VALUES + num_classes {
        return Err(ModelError::Inference(format!(
            "output rows have {num_feats} values, need {} for {num_classes} class(es)",
            BOX_VALUES + num_classes
        )));
    }
    if data.len() < num_rows * num_feats {
        return Err(ModelError::Inference(format!(
            "output holds {} values, shape {shape:?} needs {}",
            data.len(),
            num_rows * num_feats
        )));
    }

    let value = |row: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_rows + row] as f64
        } else {
            data[row * num_feats + feat] as f64
        }
    };

    let mut candidates = Vec::new();
    for row in 0..num_rows {
        // argmax over class scores; the first maximum wins
        let mut class_id = 0;
        let mut confidence = f64::NEG_INFINITY;
        for class in 0..num_classes {
            let score = value(row, BOX_VALUES + class);
            if score > confidence {
                confidence = score;
                class_id = class;
            }
        }
        if !(confidence >= threshold) {
            continue;
        }

        let (cx, cy, w, h) = (value(row, 0), value(row, 1), value(row, 2), value(row, 3));
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);
        candidates.push(Candidate {
            x1,
            y1,
            x2,
            y2,
            class_id: class_id as u32,
            confidence,
        });
    }
    Ok(candidates)
}

/// Greedy per-class NMS.
///
/// Sorting is stable, so equal confidences keep model order.
fn nms(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id
                && bbox_iou(&kept.corners(), &candidate.corners()) > iou_thresh
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Runs NMS, clamps survivors to the frame and drops boxes left empty.
fn finalize(candidates: Vec<Candidate>, frame_width: u32, frame_height: u32) -> Vec<Detection> {
    nms(candidates, NMS_IOU_THRESH)
        .into_iter()
        .filter_map(|c| {
            let bbox =
                BoundingBox::from_corners_clamped(c.x1, c.y1, c.x2, c.y2, frame_width, frame_height);
            if bbox.is_none() {
                log::trace!("dropping empty box for class {} ({:.2})", c.class_id, c.confidence);
            }
            bbox.map(|bbox| Detection::new(bbox, c.class_id, c.confidence))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
