//! USB webcam capture through Video4Linux2.
//!
//! The device is asked for MJPEG at the requested resolution; whatever mode
//! it actually negotiates is kept for the lifetime of the session.

use std::io;

use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::frame::Frame;

use super::pixel_format::{self, PixelFormat};
use super::source_config::UsbCameraConfig;

const BUFFER_COUNT: u32 = 4;

pub struct UsbFrameSource {
    config: UsbCameraConfig,
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    format: PixelFormat,
    width: u32,
    height: u32,
    sequence: u64,
}

impl UsbFrameSource {
    pub fn new(config: UsbCameraConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            config,
            device: None,
            stream: None,
            format: PixelFormat::Mjpeg,
            sequence: 0,
        }
    }

    fn device_path(&self) -> String {
        format!("/dev/video{}", self.config.device_index)
    }

    fn open_error(&self, reason: impl ToString) -> CaptureError {
        CaptureError::Open {
            device: self.device_path(),
            reason: reason.to_string(),
        }
    }

    /// Negotiates a capture format, preferring MJPEG, then YUYV, then RGB24.
    fn negotiate(&self, device: &Device) -> Result<(Format, PixelFormat), CaptureError> {
        for fourcc in [b"MJPG", b"YUYV", b"RGB3"] {
            let requested = Format::new(self.config.width, self.config.height, FourCC::new(fourcc));
            let negotiated = match device.set_format(&requested) {
                Ok(format) => format,
                Err(e) => {
                    log::debug!("{}: set_format {:?} rejected: {e}", self.device_path(), fourcc);
                    continue;
                }
            };
            let name = negotiated.fourcc.str().unwrap_or_default().to_string();
            if let Some(format) = PixelFormat::from_name(&name) {
                return Ok((negotiated, format));
            }
        }
        Err(self.open_error("no supported pixel format (MJPG, YUYV, RGB3)"))
    }
}

impl FrameSource for UsbFrameSource {
    fn describe(&self) -> String {
        format!("USB camera {}", self.device_path())
    }

    fn open(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = Device::new(self.config.device_index).map_err(|e| self.open_error(e))?;
        let (format, pixel_format) = self.negotiate(&device)?;

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| self.open_error(format!("buffer stream: {e}")))?;
        stream.set_timeout(self.config.timeout);

        if format.width != self.config.width || format.height != self.config.height {
            log::warn!(
                "{}: requested {}x{}, device negotiated {}x{}",
                self.device_path(),
                self.config.width,
                self.config.height,
                format.width,
                format.height
            );
        }
        log::info!(
            "{}: streaming {}x{} {:?}",
            self.device_path(),
            format.width,
            format.height,
            pixel_format
        );

        self.width = format.width;
        self.height = format.height;
        self.format = pixel_format;
        self.stream = Some(stream);
        self.device = Some(device);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NotOpen)?;
        let (buf, meta) = CaptureStream::next(stream).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                CaptureError::Unavailable(format!("timed out after {:?}", self.config.timeout))
            }
            _ => CaptureError::Unavailable(format!("dequeue failed: {e}")),
        })?;

        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let mut rgb = pixel_format::to_rgb(&buf[..used], self.width, self.height, self.format)?;
        if self.config.mirror {
            pixel_format::mirror_horizontal(&mut rgb, self.width, self.height);
        }

        self.sequence += 1;
        Ok(Frame::new(rgb, self.width, self.height, 3, self.sequence))
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        // Dropping the stream issues STREAMOFF and unmaps the buffers.
        if self.stream.take().is_some() {
            log::info!("{}: closed", self.device_path());
        }
        self.device = None;
        Ok(())
    }
}

impl Drop for UsbFrameSource {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
