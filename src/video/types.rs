//! Video frame types and backend traits
//!
//! Segment recording and final assembly only talk to these traits, so the
//! container format (FFmpeg-encoded MP4 or raw RGBA) is a runtime choice.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Bytes per RGBA pixel
pub const RGBA_CHANNELS: usize = 4;

/// Largest width or height accepted from a stream header
pub const MAX_DIMENSION: u32 = 16_384;

/// Geometry and timing of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl VideoParams {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self { width, height, fps }
    }

    /// Size in bytes of one RGBA frame
    pub fn frame_size(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(RGBA_CHANNELS)
    }

    /// Reject geometry no real stream has
    pub fn validate(&self) -> Result<(), VideoError> {
        let in_range = |d: u32| (1..=MAX_DIMENSION).contains(&d);
        if !in_range(self.width) || !in_range(self.height) {
            return Err(VideoError::Decoding(format!(
                "Unsupported frame geometry {}x{} (limit {}x{})",
                self.width, self.height, MAX_DIMENSION, MAX_DIMENSION
            )));
        }
        Ok(())
    }
}

/// One RGBA image
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * RGBA_CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgba);
        }
        Self { width, height, data }
    }

    pub fn matches(&self, params: &VideoParams) -> bool {
        self.width == params.width
            && self.height == params.height
            && self.data.len() == params.frame_size()
    }

    /// RGBA value at a pixel, if inside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        self.data
            .get(idx..idx + RGBA_CHANNELS)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }
}

/// Video I/O errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Frame size mismatch: got {got} bytes, expected {expected}")]
    FrameSize { got: usize, expected: usize },
}

/// Sequential writer for one output file
pub trait FrameWriter: Send {
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<(), VideoError>;

    /// Number of frames written so far
    fn frame_count(&self) -> u64;

    /// Flush and close the output, returning the number of frames written
    fn finish(self: Box<Self>) -> Result<u64, VideoError>;
}

/// Sequential reader over one input file
pub trait FrameReader: Send {
    fn params(&self) -> VideoParams;

    /// Next frame, or `None` at end of stream
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, VideoError>;
}

/// A container format that can be written and read back
pub trait VideoBackend: Send + Sync {
    /// File extension for outputs of this backend (without dot)
    fn extension(&self) -> &'static str;

    fn create_writer(
        &self,
        path: &Path,
        params: VideoParams,
    ) -> Result<Box<dyn FrameWriter>, VideoError>;

    fn open_reader(&self, path: &Path) -> Result<Box<dyn FrameReader>, VideoError>;
}
