pub mod frame_source_factory;
pub mod industrial_frame_source;
pub mod pixel_format;
pub mod source_config;

#[cfg(all(feature = "usb-v4l2", target_os = "linux"))]
pub mod usb_frame_source;

#[cfg(feature = "pylon")]
pub mod pylon_driver;
