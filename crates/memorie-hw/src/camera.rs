//! Color webcam access over V4L2.
//!
//! The camera negotiates MJPG when the driver offers it, so frames can be
//! uploaded without re-encoding, and falls back to YUYV otherwise.

use crate::frame::{self, Frame, FrameFormat};
use std::io;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::capability::Flags;
use v4l::format::Format;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Requested capture size. Drivers may round to the nearest supported mode.
pub const REQUESTED_WIDTH: u32 = 640;
pub const REQUESTED_HEIGHT: u32 = 480;

/// Mmap buffers queued per capture stream.
const STREAM_BUFFERS: u32 = 4;

/// Highest `/dev/videoN` index probed by [`Camera::list_devices`].
const MAX_DEVICE_INDEX: u32 = 16;

const EBUSY: i32 = 16;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no camera at {0}")]
    NotFound(String),
    #[error("camera access denied for {0}")]
    AccessDenied(String),
    #[error("camera {0} is in use by another application")]
    Busy(String),
    #[error("{0} is not a video capture device")]
    NotCaptureDevice(String),
    #[error("camera offers neither MJPG nor YUYV")]
    UnsupportedFormat,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("camera is not started")]
    NotStarted,
    #[error(transparent)]
    Frame(#[from] frame::FrameError),
}

fn io_err(context: &'static str) -> impl FnOnce(io::Error) -> CameraError {
    move |source| CameraError::Io { context, source }
}

/// A video capture device found by [`Camera::list_devices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub path: String,
    pub card: String,
    pub driver: String,
    pub bus: String,
}

/// Pixel layout the camera streams in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Every buffer is a complete JPEG.
    Mjpeg,
    /// Packed 4:2:2, converted to RGB before encoding.
    Yuyv,
}

impl PixelFormat {
    /// Negotiation order.
    const PREFERRED: [PixelFormat; 2] = [PixelFormat::Mjpeg, PixelFormat::Yuyv];

    fn fourcc(self) -> FourCC {
        match self {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv => FourCC::new(b"YUYV"),
        }
    }

    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        Self::PREFERRED.into_iter().find(|p| p.fourcc() == fourcc)
    }
}

/// An open color camera. The device is released when the handle drops.
pub struct Camera {
    device: Device,
    pub device_path: String,
    pub width: u32,
    pub height: u32,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open the device at `device_path` and negotiate a color format.
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        let device = open_device(device_path)?;
        let (format, pixel_format) = negotiate(&device)?;

        tracing::info!(
            device = device_path,
            width = format.width,
            height = format.height,
            format = ?pixel_format,
            "camera ready"
        );

        Ok(Self {
            device,
            device_path: device_path.to_string(),
            width: format.width,
            height: format.height,
            pixel_format,
        })
    }

    /// Capture one frame with no warmup.
    pub fn capture_frame(&self) -> Result<Frame, CameraError> {
        self.capture_after_warmup(0)
    }

    /// Open a stream, skip `warmup` frames while auto-exposure settles, and return the next one.
    pub fn capture_after_warmup(&self, warmup: usize) -> Result<Frame, CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(io_err("could not start capture stream"))?;

        for skipped in 0..warmup {
            stream.next().map_err(io_err("could not read warmup frame"))?;
            tracing::trace!(skipped, "warmup frame dropped");
        }

        let (buf, meta) = stream.next().map_err(io_err("could not read frame"))?;
        // Drivers report 0 bytesused for some fixed-size formats.
        let len = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };
        let (data, format) = self.decode(&buf[..len])?;

        Ok(Frame {
            data,
            width: self.width,
            height: self.height,
            format,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }

    fn decode(&self, buf: &[u8]) -> Result<(Vec<u8>, FrameFormat), CameraError> {
        match self.pixel_format {
            PixelFormat::Mjpeg if frame::is_jpeg(buf) => Ok((buf.to_vec(), FrameFormat::Jpeg)),
            PixelFormat::Mjpeg => Err(CameraError::Io {
                context: "MJPG frame",
                source: io::Error::new(io::ErrorKind::InvalidData, "missing JPEG start marker"),
            }),
            PixelFormat::Yuyv => Ok((
                frame::yuyv_to_rgb(buf, self.width, self.height)?,
                FrameFormat::Rgb8,
            )),
        }
    }

    /// Video capture devices present on this machine.
    pub fn list_devices() -> Vec<CameraDevice> {
        (0..MAX_DEVICE_INDEX)
            .map(|i| format!("/dev/video{i}"))
            .filter_map(|path| probe(&path))
            .collect()
    }
}

fn open_device(path: &str) -> Result<Device, CameraError> {
    if !Path::new(path).exists() {
        return Err(CameraError::NotFound(path.to_string()));
    }

    let device = Device::with_path(path).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => CameraError::AccessDenied(path.to_string()),
        _ if e.raw_os_error() == Some(EBUSY) => CameraError::Busy(path.to_string()),
        _ => CameraError::Io {
            context: "could not open camera",
            source: e,
        },
    })?;

    let caps = device
        .query_caps()
        .map_err(io_err("could not query camera capabilities"))?;
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Err(CameraError::NotCaptureDevice(path.to_string()));
    }
    tracing::debug!(device = path, card = %caps.card, driver = %caps.driver, "camera opened");
    Ok(device)
}

/// Ask for each preferred format in turn; keep the first the driver accepts.
fn negotiate(device: &Device) -> Result<(Format, PixelFormat), CameraError> {
    let current = device
        .format()
        .map_err(io_err("could not read camera format"))?;

    for wanted in PixelFormat::PREFERRED {
        let mut request = current;
        request.fourcc = wanted.fourcc();
        request.width = REQUESTED_WIDTH;
        request.height = REQUESTED_HEIGHT;

        match device.set_format(&request) {
            Ok(applied) => match PixelFormat::from_fourcc(applied.fourcc) {
                Some(pixel_format) => return Ok((applied, pixel_format)),
                None => tracing::debug!(?wanted, got = ?applied.fourcc, "driver substituted format"),
            },
            Err(e) => tracing::debug!(?wanted, error = %e, "format rejected"),
        }
    }

    Err(CameraError::UnsupportedFormat)
}

fn probe(path: &str) -> Option<CameraDevice> {
    if !Path::new(path).exists() {
        return None;
    }
    let caps = Device::with_path(path).ok()?.query_caps().ok()?;
    caps.capabilities
        .contains(Flags::VIDEO_CAPTURE)
        .then(|| CameraDevice {
            path: path.to_string(),
            card: caps.card,
            driver: caps.driver,
            bus: caps.bus,
        })
}
