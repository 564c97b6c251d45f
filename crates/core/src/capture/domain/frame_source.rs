use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    /// No frame this time (grab failed, device timed out). The caller may retry.
    #[error("frame unavailable: {0}")]
    Unavailable(String),
    /// The stream has definitively ended; no further frames will arrive.
    #[error("end of stream")]
    EndOfStream,
    #[error("camera device {device} could not be opened: {reason}")]
    Open { device: String, reason: String },
    #[error("camera feature profile {path} could not be applied: {reason}")]
    Profile { path: PathBuf, reason: String },
    #[error("camera {device} failed to close cleanly: {reason}")]
    Close { device: String, reason: String },
    #[error("camera is not open")]
    NotOpen,
    #[error("{0}")]
    Unsupported(String),
}

impl CaptureError {
    /// Whether the controller should retry on the next iteration.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CaptureError::Unavailable(_))
    }
}

/// Uniform interface over camera hardware.
///
/// Implementations own their device handle exclusively. `close` must be
/// idempotent: the second and later calls are no-ops.
pub trait FrameSource {
    /// Short human-readable identification, used in diagnostics.
    fn describe(&self) -> String;

    /// Acquires the device. Failures here are fatal for the pipeline.
    fn open(&mut self) -> Result<(), CaptureError>;

    /// Returns the next frame, bounded by the device timeout.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the device.
    fn close(&mut self) -> Result<(), CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_recoverable() {
        assert!(CaptureError::Unavailable("timeout".into()).is_recoverable());
        assert!(!CaptureError::EndOfStream.is_recoverable());
        assert!(!CaptureError::NotOpen.is_recoverable());
        assert!(!CaptureError::Open {
            device: "/dev/video0".into(),
            reason: "busy".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_profile_error_names_the_file() {
        let err = CaptureError::Profile {
            path: PathBuf::from("/etc/camera.pfs"),
            reason: "bad node".into(),
        };
        assert!(err.to_string().contains("/etc/camera.pfs"));
    }
}
