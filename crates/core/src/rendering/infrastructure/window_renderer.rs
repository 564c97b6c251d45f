//! Full-screen presentation through a `minifb` window.
//!
//! The window is created lazily on the first `present` so that a missing
//! display only costs the frames shown while it is missing. Creation is
//! retried at most once per retry interval.

use std::time::{Duration, Instant};

use minifb::{Key, ScaleMode, Window, WindowOptions};

use crate::rendering::domain::frame_renderer::{FrameRenderer, RenderError};
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::monitor::{self, Monitor};
use super::overlay_painter::OverlayPainter;

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

pub struct WindowRenderer {
    title: String,
    painter: OverlayPainter,
    retry_interval: Duration,
    monitors: Vec<Monitor>,
    window: Option<Window>,
    /// Monitor index the current window was requested for.
    window_display: Option<usize>,
    last_attempt: Option<Instant>,
    stop: bool,
}

impl WindowRenderer {
    pub fn new(title: impl Into<String>, painter: OverlayPainter, retry_interval: Duration) -> Self {
        Self {
            title: title.into(),
            painter,
            retry_interval,
            monitors: Vec::new(),
            window: None,
            window_display: None,
            last_attempt: None,
            stop: false,
        }
    }

    fn adopt_monitors(&mut self, discovered: Result<Vec<Monitor>, RenderError>) {
        match discovered {
            Ok(monitors) => {
                log::info!("{} monitor(s) available", monitors.len());
                self.monitors = monitors;
            }
            Err(e) => {
                log::warn!("{e}; frames will not be shown until a display appears");
                self.monitors.clear();
            }
        }
    }

    fn create_window(&mut self, display_index: usize) -> Result<(), RenderError> {
        if let Some(last) = self.last_attempt {
            if last.elapsed() < self.retry_interval {
                return Err(RenderError::Present(
                    "display unavailable, waiting to retry".to_string(),
                ));
            }
        }
        self.last_attempt = Some(Instant::now());

        let (target, fell_back) = monitor::select_monitor(&self.monitors, display_index)
            .ok_or_else(|| RenderError::Present("no monitors known".to_string()))?;
        if fell_back {
            log::warn!(
                "Monitor {display_index} not found, using {} ({})",
                target.index,
                target.name
            );
        }

        let options = WindowOptions {
            borderless: true,
            title: false,
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            topmost: true,
            ..WindowOptions::default()
        };
        let mut window = Window::new(
            &self.title,
            target.width as usize,
            target.height as usize,
            options,
        )
        .map_err(|e| RenderError::Present(format!("window creation failed: {e}")))?;
        window.set_position(target.x as isize, target.y as isize);

        log::info!(
            "Presenting on monitor {} ({}x{} at {}, {})",
            target.index,
            target.width,
            target.height,
            target.x,
            target.y
        );
        self.window = Some(window);
        self.window_display = Some(display_index);
        Ok(())
    }
}

impl FrameRenderer for WindowRenderer {
    fn describe(&self) -> String {
        format!("window \"{}\"", self.title)
    }

    /// A machine without a display still starts; presentation keeps failing
    /// recoverably until a window can be created.
    fn open(&mut self) -> Result<(), RenderError> {
        self.adopt_monitors(monitor::discover_monitors());
        Ok(())
    }

    fn draw_detections(&self, mut frame: Frame, detections: &[Detection]) -> Frame {
        self.painter.paint(&mut frame, detections);
        frame
    }

    fn present(&mut self, frame: &Frame, display_index: usize) -> Result<(), RenderError> {
        if self.window_display != Some(display_index) {
            self.window = None;
        }
        if self.window.is_none() {
            self.create_window(display_index)?;
        }
        let Some(window) = self.window.as_mut() else {
            return Err(RenderError::Present("no window".to_string()));
        };

        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let argb = rgb_to_argb(frame.data(), width, height);
        if let Err(e) = window.update_with_buffer(&argb, width, height) {
            self.window = None;
            self.window_display = None;
            return Err(RenderError::Present(format!("window update failed: {e}")));
        }

        if !window.is_open() || window.is_key_down(Key::Q) || window.is_key_down(Key::Escape) {
            if !self.stop {
                log::info!("Quit requested from the display");
            }
            self.stop = true;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), RenderError> {
        if self.window.take().is_some() {
            log::info!("{}: closed", self.describe());
        }
        self.window_display = None;
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        self.stop
    }
}

/// Packs RGB bytes into the `0RGB` words `minifb` expects.
fn rgb_to_argb(buf: &[u8], width: usize, height: usize) -> Vec<u32> {
    buf.chunks_exact(3)
        .take(width * height)
        .map(|px| ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    #[test]
    fn test_rgb_to_argb_packs_channels() {
        let argb = rgb_to_argb(&[0x12, 0x34, 0x56, 255, 0, 0], 2, 1);
        assert_eq!(argb, vec![0x0012_3456, 0x00ff_0000]);
    }

    #[test]
    fn test_draw_detections_returns_painted_frame() {
        let renderer = WindowRenderer::new("test", OverlayPainter::default(), DEFAULT_RETRY_INTERVAL);
        let detection = Detection::new(BoundingBox::new(10, 10, 50, 50), 0, 0.9);
        let frame = Frame::filled(640, 480, [0, 0, 0], 3);

        let drawn = renderer.draw_detections(frame, &[detection]);
        assert_eq!(drawn.sequence(), 3);
        assert_eq!(drawn.pixel(10, 30), Some([0, 255, 255]));
    }

    #[test]
    fn test_close_without_window_is_idempotent() {
        let mut renderer =
            WindowRenderer::new("test", OverlayPainter::default(), DEFAULT_RETRY_INTERVAL);
        renderer.close().unwrap();
        renderer.close().unwrap();
        assert!(!renderer.stop_requested());
    }

    #[test]
    fn test_missing_display_degrades_to_recoverable_present() {
        let mut renderer =
            WindowRenderer::new("test", OverlayPainter::default(), DEFAULT_RETRY_INTERVAL);
        renderer.open().unwrap();
        renderer.adopt_monitors(Err(RenderError::Open("no monitors connected".into())));
        assert!(renderer.monitors.is_empty());

        let err = renderer.present(&Frame::filled(4, 4, [0, 0, 0], 1), 0).unwrap_err();
        assert!(err.is_recoverable());
        assert!(!renderer.stop_requested());
    }

    #[test]
    fn test_present_without_monitors_is_recoverable() {
        let mut renderer =
            WindowRenderer::new("test", OverlayPainter::default(), DEFAULT_RETRY_INTERVAL);
        let frame = Frame::filled(4, 4, [0, 0, 0], 1);
        let err = renderer.present(&frame, 0).unwrap_err();
        assert!(err.is_recoverable());
        // second attempt inside the retry interval does not touch the display
        assert!(renderer.present(&frame, 0).unwrap_err().is_recoverable());
    }
}
