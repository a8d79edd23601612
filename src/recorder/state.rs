//! Recorder state
//!
//! Defines the segment recorder state machine and the descriptors it emits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Current state of a segment recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No destination open
    #[default]
    Idle,
    /// Writing frames to a destination
    Recording,
}

/// Token for one open destination.
///
/// Frames and close requests carrying a handle from an earlier segment are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderHandle {
    pub id: Uuid,
    /// Segment index (1-based)
    pub index: u32,
    pub path: PathBuf,
}

/// A completed recording segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentDescriptor {
    /// Segment index (1, 2, 3, ...)
    pub index: u32,

    pub pose_name: String,

    pub score: u8,

    pub feedback: String,

    /// Wall-clock length of the segment
    pub duration_seconds: f64,

    pub file_path: PathBuf,

    pub frame_count: u64,
}
