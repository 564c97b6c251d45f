/// Axis-aligned box in integer pixel coordinates of the frame it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from floating-point corners, clamped to a
    /// `frame_width` × `frame_height` frame.
    ///
    /// Returns `None` when nothing of the box is left inside the frame.
    pub fn from_corners_clamped(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return None;
        }
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let left = x1.min(x2).clamp(0.0, fw).round() as u32;
        let top = y1.min(y2).clamp(0.0, fh).round() as u32;
        let right = x1.max(x2).clamp(0.0, fw).round() as u32;
        let bottom = y1.max(y2).clamp(0.0, fh).round() as u32;

        if right <= left || bottom <= top {
            return None;
        }
        Some(Self::new(left, top, right - left, bottom - top))
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// True when the box is non-empty and entirely inside a
    /// `frame_width` × `frame_height` frame.
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= frame_width
            && self.bottom() <= frame_height
    }
}
