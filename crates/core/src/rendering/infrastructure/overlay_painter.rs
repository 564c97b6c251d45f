use crate::shared::bounding_box::BoundingBox;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

use super::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Padding around caption text inside its strip.
const STRIP_PADDING: u32 = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStyle {
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
    /// Outline thickness in pixels, drawn inward from the box edge.
    pub thickness: u32,
    /// Integer glyph magnification.
    pub text_scale: u32,
    pub show_confidence: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 255],
            text_color: [0, 0, 0],
            thickness: 2,
            text_scale: 2,
            show_confidence: true,
        }
    }
}

/// Paints detection boxes and captions onto frames in place.
#[derive(Clone, Debug, Default)]
pub struct OverlayPainter {
    style: OverlayStyle,
}

impl OverlayPainter {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// Draws every detection in order; later ones paint over earlier ones.
    pub fn paint(&self, frame: &mut Frame, detections: &[Detection]) {
        for detection in detections {
            self.draw_box(frame, detection.bbox());
            let caption = detection.caption(self.style.show_confidence);
            self.draw_caption(frame, detection.bbox(), &caption);
        }
    }

    fn draw_box(&self, frame: &mut Frame, bbox: &BoundingBox) {
        let t = self.style.thickness.min(bbox.width).min(bbox.height);
        let (x, y, w, h) = (bbox.x, bbox.y, bbox.width, bbox.height);
        let color = self.style.box_color;
        fill_rect(frame, x, y, w, t, color);
        fill_rect(frame, x, bbox.bottom().saturating_sub(t), w, t, color);
        fill_rect(frame, x, y, t, h, color);
        fill_rect(frame, bbox.right().saturating_sub(t), y, t, h, color);
    }

    /// Strip above the box, or inside its top edge when there is no room.
    fn caption_strip(&self, bbox: &BoundingBox, caption: &str) -> (u32, u32, u32, u32) {
        let scale = self.style.text_scale.max(1);
        let strip_w = glyphs::text_width(caption) * scale + 2 * STRIP_PADDING;
        let strip_h = GLYPH_HEIGHT * scale + 2 * STRIP_PADDING;
        let strip_y = if bbox.y >= strip_h {
            bbox.y - strip_h
        } else {
            bbox.y
        };
        (bbox.x, strip_y, strip_w, strip_h)
    }

    fn draw_caption(&self, frame: &mut Frame, bbox: &BoundingBox, caption: &str) {
        let scale = self.style.text_scale.max(1);
        let (sx, sy, sw, sh) = self.caption_strip(bbox, caption);
        fill_rect(frame, sx, sy, sw, sh, self.style.box_color);

        let mut pen_x = sx + STRIP_PADDING;
        let pen_y = sy + STRIP_PADDING;
        for ch in caption.chars() {
            let rows = glyphs::glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 1 {
                        fill_rect(
                            frame,
                            pen_x + col * scale,
                            pen_y + row as u32 * scale,
                            scale,
                            scale,
                            self.style.text_color,
                        );
                    }
                }
            }
            pen_x += GLYPH_ADVANCE * scale;
        }
    }
}

/// Fills a rectangle, clipped to the frame.
fn fill_rect(frame: &mut Frame, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
    let fw = frame.width();
    let fh = frame.height();
    if x >= fw || y >= fh {
        return;
    }
    let x_end = x.saturating_add(width).min(fw);
    let y_end = y.saturating_add(height).min(fh);
    let stride = fw as usize * 3;
    let data = frame.data_mut();
    for py in y..y_end {
        let row = py as usize * stride;
        for px in x..x_end {
            let i = row + px as usize * 3;
            data[i..i + 3].copy_from_slice(&color);
        }
    }
}
