mod glyphs;
pub mod headless_renderer;
pub mod monitor;
pub mod overlay_painter;
pub mod renderer_factory;
pub mod window_renderer;
