//! Video I/O
//!
//! Frame types, pluggable container backends and the annotation overlay.

pub mod ffmpeg;
pub mod font;
pub mod overlay;
pub mod raw;
pub mod types;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use ffmpeg::FfmpegBackend;
pub use overlay::{AnnotationOverlay, ScoreBand};
pub use raw::RawBackend;
pub use types::{FrameReader, FrameWriter, VideoBackend, VideoError, VideoFrame, VideoParams};

/// Selectable container backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// H.264 MP4 through the ffmpeg binary
    #[default]
    Ffmpeg,
    /// Uncompressed RGBA container
    Raw,
}

impl BackendKind {
    pub fn build(self) -> Arc<dyn VideoBackend> {
        match self {
            BackendKind::Ffmpeg => Arc::new(FfmpegBackend::default()),
            BackendKind::Raw => Arc::new(RawBackend),
        }
    }
}
