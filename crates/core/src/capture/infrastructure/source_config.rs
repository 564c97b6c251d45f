use std::path::PathBuf;
use std::time::Duration;

/// Settings for a V4L2 webcam.
#[derive(Clone, Debug, PartialEq)]
pub struct UsbCameraConfig {
    pub device_index: usize,
    pub width: u32,
    pub height: u32,
    pub timeout: Duration,
    pub mirror: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IndustrialCameraConfig {
    pub device_index: usize,
    pub profile_path: PathBuf,
    pub timeout: Duration,
    pub mirror: bool,
}

/// Which camera backend to build, with its settings.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceConfig {
    Usb(UsbCameraConfig),
    Industrial(IndustrialCameraConfig),
}
