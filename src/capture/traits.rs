//! Capture trait definitions
//!
//! Device-agnostic camera traits. The coordinator only sees `Camera` and
//! `CameraFactory`, so sessions can run against a real webcam or a synthetic
//! source.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::video::{VideoFrame, VideoParams};

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Camera errors
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },

    #[error("Camera did not start within {0} ms")]
    StartupTimeout(u64),

    #[error("Failed to read frame: {0}")]
    Read(String),

    #[error("Camera already released")]
    Released,
}

/// An open capture device.
///
/// `read_frame` returns the most recent image and must not block for longer
/// than one frame interval.
pub trait Camera: Send {
    /// Actual geometry delivered by the device
    fn params(&self) -> VideoParams;

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Stop capture and free the device. Safe to call more than once.
    fn release(&mut self);
}

/// Opens capture devices
pub trait CameraFactory: Send + Sync {
    /// Open the device at `index`, requesting `requested` geometry
    fn open(&self, index: u32, requested: VideoParams) -> Result<Box<dyn Camera>, CameraError>;

    /// Enumerate available devices
    fn list(&self) -> Vec<CameraInfo> {
        Vec::new()
    }
}
