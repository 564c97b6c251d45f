use std::time::Duration;

use crate::rendering::domain::frame_renderer::FrameRenderer;

use super::headless_renderer::HeadlessRenderer;
use super::overlay_painter::{OverlayPainter, OverlayStyle};
use super::window_renderer::{WindowRenderer, DEFAULT_RETRY_INTERVAL};

pub const WINDOW_TITLE: &str = "FaceWatch";

#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    pub headless: bool,
    pub style: OverlayStyle,
    pub retry_interval: Duration,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: false,
            style: OverlayStyle::default(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Creates the windowed renderer, or the headless one when configured.
pub fn create_renderer(config: &RendererConfig) -> Box<dyn FrameRenderer> {
    let painter = OverlayPainter::new(config.style.clone());
    if config.headless {
        log::info!("Using headless renderer");
        Box::new(HeadlessRenderer::new(painter))
    } else {
        log::info!(
            "Using window renderer (retry every {:?})",
            config.retry_interval
        );
        Box::new(WindowRenderer::new(WINDOW_TITLE, painter, config.retry_interval))
    }
}
