//! Industrial (Basler-class) camera capture.
//!
//! The vendor SDK is reached through [`IndustrialCameraDriver`]; this module
//! owns the capture policy: device selection, applying the feature profile
//! before the first grab, pixel conversion and mirroring.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

use super::pixel_format::{self, PixelFormat};
use super::source_config::IndustrialCameraConfig;

/// One grabbed image, straight from the vendor SDK.
#[derive(Clone, Debug)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Vendor feature-configuration file (e.g. a pylon `.pfs`).
///
/// Contents are opaque; only the location is checked up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraProfile {
    path: PathBuf,
}

impl CameraProfile {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let path = path.into();
        if !path.is_file() {
            return Err(CaptureError::Profile {
                path,
                reason: "file not found".to_string(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Upper bound on queued images discarded by one [`skip_to_latest`] call.
pub const MAX_SKIPPED_IMAGES: usize = 16;

/// Keeps taking already-queued images until none is left, so the caller ends
/// up holding the newest one.
///
/// `take_queued` must not wait; it returns `Ok(false)` once the queue is
/// empty. Returns how many images were taken.
pub fn skip_to_latest<E>(mut take_queued: impl FnMut() -> Result<bool, E>) -> Result<usize, E> {
    let mut taken = 0;
    while taken < MAX_SKIPPED_IMAGES && take_queued()? {
        taken += 1;
    }
    Ok(taken)
}

/// Vendor SDK seam for industrial cameras.
pub trait IndustrialCameraDriver {
    /// Number of cameras the SDK can see.
    fn device_count(&mut self) -> Result<usize, CaptureError>;

    fn open(&mut self, device_index: usize) -> Result<(), CaptureError>;

    /// Loads the feature profile onto the open device, verbatim.
    fn apply_profile(&mut self, profile: &CameraProfile) -> Result<(), CaptureError>;

    fn start_grabbing(&mut self) -> Result<(), CaptureError>;

    /// Waits at most `timeout` for an image and returns the newest one
    /// available; older queued images are dropped.
    fn grab(&mut self, timeout: Duration) -> Result<RawImage, CaptureError>;

    /// Stops grabbing and closes the device. Must tolerate repeated calls.
    fn close(&mut self) -> Result<(), CaptureError>;
}

pub struct IndustrialFrameSource {
    driver: Box<dyn IndustrialCameraDriver>,
    config: IndustrialCameraConfig,
    opened: bool,
    sequence: u64,
}

impl IndustrialFrameSource {
    pub fn new(driver: Box<dyn IndustrialCameraDriver>, config: IndustrialCameraConfig) -> Self {
        Self {
            driver,
            config,
            opened: false,
            sequence: 0,
        }
    }

    fn device_name(&self) -> String {
        format!("industrial camera #{}", self.config.device_index)
    }
}

impl FrameSource for IndustrialFrameSource {
    fn describe(&self) -> String {
        self.device_name()
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        if self.opened {
            return Ok(());
        }

        let profile = CameraProfile::from_path(&self.config.profile_path)?;
        let count = self.driver.device_count()?;
        if self.config.device_index >= count {
            return Err(CaptureError::Open {
                device: self.device_name(),
                reason: format!("{count} industrial camera(s) connected"),
            });
        }

        self.driver.open(self.config.device_index)?;
        // The device is open from here on; release it if setup fails.
        let setup = self
            .driver
            .apply_profile(&profile)
            .and_then(|()| self.driver.start_grabbing());
        if let Err(e) = setup {
            if let Err(close_err) = self.driver.close() {
                log::warn!("{}: close after failed setup: {close_err}", self.device_name());
            }
            return Err(e);
        }

        log::info!(
            "{}: profile {} applied, grabbing",
            self.device_name(),
            profile.path().display()
        );
        self.opened = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if !self.opened {
            return Err(CaptureError::NotOpen);
        }
        let raw = self.driver.grab(self.config.timeout)?;
        let mut rgb = pixel_format::to_rgb(&raw.data, raw.width, raw.height, raw.format)?;
        if self.config.mirror {
            pixel_format::mirror_horizontal(&mut rgb, raw.width, raw.height);
        }

        self.sequence += 1;
        Ok(Frame::new(rgb, raw.width, raw.height, 3, self.sequence))
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        if !self.opened {
            return Ok(());
        }
        self.opened = false;
        self.driver.close()?;
        log::info!("{}: closed", self.device_name());
        Ok(())
    }
}
