use crate::capture::domain::frame_source::{CaptureError, FrameSource};

use super::source_config::SourceConfig;

/// Builds the frame source for the configured camera type.
///
/// Backends compiled out of this build fail with [`CaptureError::Unsupported`]
/// so the pipeline can report them as a startup error.
pub fn create_frame_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>, CaptureError> {
    match config {
        SourceConfig::Usb(usb) => create_usb(usb),
        SourceConfig::Industrial(industrial) => create_industrial(industrial),
    }
}

#[cfg(all(feature = "usb-v4l2", target_os = "linux"))]
fn create_usb(
    config: &super::source_config::UsbCameraConfig,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    log::info!(
        "Using V4L2 backend for USB camera {} ({}x{})",
        config.device_index,
        config.width,
        config.height
    );
    Ok(Box::new(super::usb_frame_source::UsbFrameSource::new(
        config.clone(),
    )))
}

#[cfg(not(all(feature = "usb-v4l2", target_os = "linux")))]
fn create_usb(
    config: &super::source_config::UsbCameraConfig,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::Unsupported(format!(
        "USB camera {} requested, but this build has no USB capture backend \
         (enable the `usb-v4l2` feature on Linux)",
        config.device_index
    )))
}

#[cfg(feature = "pylon")]
fn create_industrial(
    config: &super::source_config::IndustrialCameraConfig,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    use super::industrial_frame_source::IndustrialFrameSource;
    use super::pylon_driver::PylonDriver;

    log::info!(
        "Using pylon backend for industrial camera {} (profile {})",
        config.device_index,
        config.profile_path.display()
    );
    Ok(Box::new(IndustrialFrameSource::new(
        Box::new(PylonDriver::new()),
        config.clone(),
    )))
}

#[cfg(not(feature = "pylon"))]
fn create_industrial(
    config: &super::source_config::IndustrialCameraConfig,
) -> Result<Box<dyn FrameSource>, CaptureError> {
    Err(CaptureError::Unsupported(format!(
        "industrial camera {} requested, but this build has no vendor SDK \
         (rebuild with the `pylon` feature)",
        config.device_index
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::source_config::{IndustrialCameraConfig, UsbCameraConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_usb_source_is_created_unopened() {
        let config = SourceConfig::Usb(UsbCameraConfig {
            device_index: 3,
            width: 640,
            height: 480,
            timeout: Duration::from_millis(100),
            mirror: false,
        });
        match create_frame_source(&config) {
            Ok(source) => assert!(source.describe().contains('3')),
            Err(e) => assert!(matches!(e, CaptureError::Unsupported(_))),
        }
    }

    #[cfg(not(feature = "pylon"))]
    #[test]
    fn test_industrial_without_sdk_is_unsupported() {
        let config = SourceConfig::Industrial(IndustrialCameraConfig {
            device_index: 0,
            profile_path: PathBuf::from("camera.pfs"),
            timeout: Duration::from_millis(5000),
            mirror: true,
        });
        let err = create_frame_source(&config).err().unwrap();
        assert!(matches!(err, CaptureError::Unsupported(_)));
        assert!(err.to_string().contains("pylon"));
    }

    #[cfg(feature = "pylon")]
    #[test]
    fn test_industrial_source_is_created_unopened() {
        let config = SourceConfig::Industrial(IndustrialCameraConfig {
            device_index: 1,
            profile_path: PathBuf::from("camera.pfs"),
            timeout: Duration::from_millis(5000),
            mirror: true,
        });
        let source = create_frame_source(&config).unwrap();
        assert_eq!(source.describe(), "industrial camera #1");
    }
}
