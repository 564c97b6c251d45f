use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model weights {path} are unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("model {path} is incompatible: {reason}")]
    Incompatible { path: PathBuf, reason: String },
    #[error("model is not loaded")]
    NotLoaded,
    /// One frame could not be processed; the next one may succeed.
    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ModelError::Inference(_))
    }
}

/// Domain interface over an object-detection backend.
///
/// `load` is called exactly once before any `infer`. Implementations must
/// return detections in a stable order (confidence descending, ties in model
/// order) so that identical inputs produce identical outputs.
pub trait DetectionModel {
    fn describe(&self) -> String;

    fn load(&mut self, weights: &Path) -> Result<(), ModelError>;

    /// Detections with confidence at or above `threshold`, boxes inside the
    /// frame. The frame is not modified.
    fn infer(&mut self, frame: &Frame, threshold: f64) -> Result<Vec<Detection>, ModelError>;

    /// Releases the backend session. Idempotent.
    fn unload(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_inference_failures_are_recoverable() {
        assert!(ModelError::Inference("shape".into()).is_recoverable());
        assert!(!ModelError::NotLoaded.is_recoverable());
        assert!(!ModelError::Unreadable {
            path: PathBuf::from("yolo.onnx"),
            reason: "missing".into()
        }
        .is_recoverable());
    }
}
