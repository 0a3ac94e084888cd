//! memorie-hw: color camera capture for face recognition.
//!
//! Provides V4L2 camera access, YUYV/MJPG decoding and JPEG encoding, and a
//! [`CameraSession`] that plugs into the recognition flow as its frame source.

pub mod camera;
pub mod frame;
pub mod session;

pub use camera::{Camera, CameraDevice, CameraError, PixelFormat};
pub use frame::{Frame, FrameError, FrameFormat};
pub use session::CameraSession;
