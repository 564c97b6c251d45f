use crate::rendering::domain::frame_renderer::{FrameRenderer, RenderError};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::overlay_painter::OverlayPainter;

/// Renderer for machines without a display: overlays are still drawn, frames
/// are only logged.
#[derive(Default)]
pub struct HeadlessRenderer {
    painter: OverlayPainter,
    opened: bool,
    presented: u64,
}

impl HeadlessRenderer {
    pub fn new(painter: OverlayPainter) -> Self {
        Self {
            painter,
            opened: false,
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl FrameRenderer for HeadlessRenderer {
    fn describe(&self) -> String {
        "headless".to_string()
    }

    fn open(&mut self) -> Result<(), RenderError> {
        self.opened = true;
        log::info!("Running headless, frames will not be displayed");
        Ok(())
    }

    fn draw_detections(&self, mut frame: Frame, detections: &[Detection]) -> Frame {
        for detection in detections {
            let b = detection.bbox();
            log::debug!(
                "frame {}: {} at ({}, {}) {}x{}",
                frame.sequence(),
                detection.caption(true),
                b.x,
                b.y,
                b.width,
                b.height
            );
        }
        self.painter.paint(&mut frame, detections);
        frame
    }

    fn present(&mut self, frame: &Frame, display_index: usize) -> Result<(), RenderError> {
        if !self.opened {
            return Err(RenderError::Present("renderer is not open".to_string()));
        }
        self.presented += 1;
        log::trace!(
            "frame {} ({}x{}) presented to virtual display {display_index}",
            frame.sequence(),
            frame.width(),
            frame.height()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if self.opened {
            self.opened = false;
            log::info!("Headless renderer closed after {} frame(s)", self.presented);
        }
        Ok(())
    }
}
