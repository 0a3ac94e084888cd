//! Camera as a [`FrameSource`] for the recognition flow.

use crate::camera::{Camera, CameraError};
use crate::frame::DEFAULT_JPEG_QUALITY;
use memorie_core::capture::FrameSource;

/// Exclusively owns the device between `start` and `stop`.
pub struct CameraSession {
    device_path: String,
    warmup_frames: usize,
    camera: Option<Camera>,
}

impl CameraSession {
    pub fn new(device_path: impl Into<String>, warmup_frames: usize) -> Self {
        Self {
            device_path: device_path.into(),
            warmup_frames,
            camera: None,
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl FrameSource for CameraSession {
    type Error = CameraError;

    fn start(&mut self) -> Result<(), CameraError> {
        if self.camera.is_none() {
            self.camera = Some(Camera::open(&self.device_path)?);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.camera.is_some()
    }

    fn capture_jpeg(&mut self) -> Result<Vec<u8>, CameraError> {
        let camera = self.camera.as_ref().ok_or(CameraError::NotStarted)?;
        let frame = camera.capture_after_warmup(self.warmup_frames)?;
        tracing::debug!(
            seq = frame.sequence,
            width = frame.width,
            height = frame.height,
            format = ?frame.format,
            "frame captured"
        );
        Ok(frame.to_jpeg(DEFAULT_JPEG_QUALITY)?)
    }

    fn stop(&mut self) {
        if let Some(camera) = self.camera.take() {
            tracing::debug!(device = %camera.device_path, "camera released");
        }
    }
}
