//! Camera capture
//!
//! This module provides the camera abstraction plus a synthetic test-pattern
//! source and, with the `native-camera` feature, a nokhwa-backed webcam.

pub mod pattern;
pub mod traits;

#[cfg(feature = "native-camera")]
pub mod native;

pub use pattern::{TestPatternCamera, TestPatternFactory};
pub use traits::{Camera, CameraError, CameraFactory, CameraInfo, Resolution};

#[cfg(feature = "native-camera")]
pub use native::NativeCameraFactory;
