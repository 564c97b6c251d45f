use thiserror::Error;

use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("display could not be prepared: {0}")]
    Open(String),
    /// The frame was not shown; presentation resumes once a display is usable.
    #[error("frame could not be presented: {0}")]
    Present(String),
}

impl RenderError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::Present(_))
    }
}

/// Draws detection overlays and shows frames on a display surface.
pub trait FrameRenderer {
    fn describe(&self) -> String;

    /// Prepares the display surface. Failures here are fatal for the pipeline.
    fn open(&mut self) -> Result<(), RenderError>;

    /// Returns `frame` with a box and caption drawn for each detection, in
    /// order. Pixels outside the outlines and caption strips are untouched.
    fn draw_detections(&self, frame: Frame, detections: &[Detection]) -> Frame;

    /// Shows the frame on monitor `display_index`, falling back to the
    /// primary monitor when the index is unknown.
    fn present(&mut self, frame: &Frame, display_index: usize) -> Result<(), RenderError>;

    /// Releases the display handle. Idempotent.
    fn close(&mut self) -> Result<(), RenderError>;

    /// True once the operator asked to quit from the display (window closed,
    /// `q` or Esc pressed).
    fn stop_requested(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_present_failures_are_recoverable() {
        assert!(RenderError::Present("no display".into()).is_recoverable());
        assert!(!RenderError::Open("no monitors".into()).is_recoverable());
    }
}
