//! Basler pylon SDK driver (requires the pylon runtime to be installed).

use std::time::Duration;

use ouroboros::self_referencing;
use pylon_cxx::{GrabOptions, GrabResult, InstantCamera, Pylon, TimeoutHandling, TlFactory};

use crate::capture::domain::frame_source::CaptureError;

use super::industrial_frame_source::{
    skip_to_latest, CameraProfile, IndustrialCameraDriver, RawImage,
};
use super::pixel_format::PixelFormat;

#[self_referencing]
struct PylonSession {
    pylon: Pylon,
    #[borrows(pylon)]
    #[covariant]
    camera: InstantCamera<'this>,
}

#[derive(Default)]
pub struct PylonDriver {
    session: Option<PylonSession>,
    device_index: usize,
    pixel_format: Option<PixelFormat>,
}

impl PylonDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn device_name(&self) -> String {
        format!("pylon device #{}", self.device_index)
    }

    fn session(&self) -> Result<&PylonSession, CaptureError> {
        self.session.as_ref().ok_or(CaptureError::NotOpen)
    }
}

impl IndustrialCameraDriver for PylonDriver {
    fn device_count(&mut self) -> Result<usize, CaptureError> {
        let pylon = Pylon::new();
        let devices = TlFactory::instance(&pylon)
            .enumerate_devices()
            .map_err(|e| CaptureError::Open {
                device: "pylon transport layer".to_string(),
                reason: e.to_string(),
            })?;
        Ok(devices.len())
    }

    fn open(&mut self, device_index: usize) -> Result<(), CaptureError> {
        self.device_index = device_index;
        let device = self.device_name();
        let open_error = |reason: String| CaptureError::Open {
            device: device.clone(),
            reason,
        };

        let session = PylonSessionTryBuilder {
            pylon: Pylon::new(),
            camera_builder: |pylon: &Pylon| {
                let factory = TlFactory::instance(pylon);
                let devices = factory
                    .enumerate_devices()
                    .map_err(|e| open_error(e.to_string()))?;
                let info = devices
                    .get(device_index)
                    .ok_or_else(|| open_error("device disappeared".to_string()))?;
                factory
                    .create_device(info)
                    .map_err(|e| open_error(e.to_string()))
            },
        }
        .try_build()?;

        session
            .borrow_camera()
            .open()
            .map_err(|e| open_error(e.to_string()))?;
        self.session = Some(session);
        Ok(())
    }

    fn apply_profile(&mut self, profile: &CameraProfile) -> Result<(), CaptureError> {
        let profile_error = |reason: String| CaptureError::Profile {
            path: profile.path().to_path_buf(),
            reason,
        };
        let format_name = {
            let camera = self.session()?.borrow_camera();
            let node_map = camera.node_map().map_err(|e| profile_error(e.to_string()))?;
            node_map
                .load(profile.path(), true)
                .map_err(|e| profile_error(e.to_string()))?;
            node_map
                .enum_node("PixelFormat")
                .and_then(|node| node.value())
                .map_err(|e| profile_error(e.to_string()))?
        };
        let format = PixelFormat::from_name(&format_name)
            .ok_or_else(|| profile_error(format!("unsupported pixel format {format_name}")))?;
        self.pixel_format = Some(format);
        Ok(())
    }

    fn start_grabbing(&mut self) -> Result<(), CaptureError> {
        let device = self.device_name();
        self.session()?
            .borrow_camera()
            .start_grabbing(&GrabOptions::default())
            .map_err(|e| CaptureError::Open {
                device,
                reason: format!("start grabbing: {e}"),
            })
    }

    fn grab(&mut self, timeout: Duration) -> Result<RawImage, CaptureError> {
        let format = self.pixel_format.ok_or(CaptureError::NotOpen)?;
        let camera = self.session()?.borrow_camera();
        let unavailable = |e: pylon_cxx::PylonError| CaptureError::Unavailable(e.to_string());

        let mut result = GrabResult::new().map_err(unavailable)?;
        let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        camera
            .retrieve_result(timeout_ms, &mut result, TimeoutHandling::ThrowException)
            .map_err(unavailable)?;
        // Same effect as the LatestImageOnly grab strategy.
        let skipped = skip_to_latest(|| {
            camera.retrieve_result(0, &mut result, TimeoutHandling::Return)
        })
        .map_err(unavailable)?;
        if skipped > 0 {
            log::trace!("{}: skipped {skipped} queued image(s)", self.device_name());
        }

        if !result.grab_succeeded().map_err(unavailable)? {
            let reason = result
                .error_description()
                .unwrap_or_else(|_| "grab failed".to_string());
            return Err(CaptureError::Unavailable(reason));
        }

        Ok(RawImage {
            data: result.buffer().map_err(unavailable)?.to_vec(),
            width: result.width().map_err(unavailable)?,
            height: result.height().map_err(unavailable)?,
            format,
        })
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let camera = session.borrow_camera();
        let close_error = |e: pylon_cxx::PylonError| CaptureError::Close {
            device: self.device_name(),
            reason: e.to_string(),
        };
        if camera.is_grabbing() {
            camera.stop_grabbing().map_err(close_error)?;
        }
        camera.close().map_err(close_error)?;
        Ok(())
    }
}
