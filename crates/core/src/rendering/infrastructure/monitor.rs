//! Monitor discovery and selection.

use crate::rendering::domain::frame_renderer::RenderError;
use crate::shared::constants::FALLBACK_MONITOR_SIZE;

/// One physical display, in virtual-desktop coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Monitor {
    pub index: usize,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
}

impl Monitor {
    /// Stand-in used when the platform cannot enumerate displays.
    pub fn fallback() -> Self {
        Self {
            index: 0,
            name: "primary".to_string(),
            x: 0,
            y: 0,
            width: FALLBACK_MONITOR_SIZE.0,
            height: FALLBACK_MONITOR_SIZE.1,
            is_primary: true,
        }
    }
}

/// Picks monitor `index`, or the primary one (first if none is flagged).
///
/// The boolean is true when the requested index was not available.
pub fn select_monitor(monitors: &[Monitor], index: usize) -> Option<(&Monitor, bool)> {
    if let Some(monitor) = monitors.iter().find(|m| m.index == index) {
        return Some((monitor, false));
    }
    monitors
        .iter()
        .find(|m| m.is_primary)
        .or_else(|| monitors.first())
        .map(|m| (m, true))
}

/// Lists connected displays.
#[cfg(feature = "display-info")]
pub fn discover_monitors() -> Result<Vec<Monitor>, RenderError> {
    let displays = display_info::DisplayInfo::all()
        .map_err(|e| RenderError::Open(format!("monitor enumeration failed: {e}")))?;
    let monitors: Vec<Monitor> = displays
        .into_iter()
        .enumerate()
        .map(|(index, d)| Monitor {
            index,
            name: d.name,
            x: d.x,
            y: d.y,
            width: d.width,
            height: d.height,
            is_primary: d.is_primary,
        })
        .collect();
    if monitors.is_empty() {
        return Err(RenderError::Open("no monitors connected".to_string()));
    }
    for m in &monitors {
        log::debug!(
            "monitor {}: {} {}x{} at ({}, {}){}",
            m.index,
            m.name,
            m.width,
            m.height,
            m.x,
            m.y,
            if m.is_primary { " primary" } else { "" }
        );
    }
    Ok(monitors)
}

/// Without platform enumeration only the primary display is known.
#[cfg(not(feature = "display-info"))]
pub fn discover_monitors() -> Result<Vec<Monitor>, RenderError> {
    log::debug!("monitor enumeration not compiled in, assuming one primary display");
    Ok(vec![Monitor::fallback()])
}
