//! Synthetic camera
//!
//! Produces a moving gradient so sessions can be recorded and assembled
//! without a physical device (CLI replays, tests).

use super::traits::{Camera, CameraError, CameraFactory, CameraInfo, Resolution};
use crate::video::{VideoFrame, VideoParams};

/// Camera that renders a test pattern
pub struct TestPatternCamera {
    params: VideoParams,
    tick: u64,
    released: bool,
}

impl TestPatternCamera {
    pub fn new(params: VideoParams) -> Self {
        Self {
            params,
            tick: 0,
            released: false,
        }
    }

    fn render(&self) -> VideoFrame {
        let VideoParams { width, height, .. } = self.params;
        let shift = (self.tick % 256) as u32;
        let mut data = Vec::with_capacity(self.params.frame_size());
        for y in 0..height {
            for x in 0..width {
                let r = ((x * 255) / width.max(1) + shift) % 256;
                let g = ((y * 255) / height.max(1)) % 256;
                data.extend_from_slice(&[r as u8, g as u8, 96, 255]);
            }
        }
        VideoFrame { width, height, data }
    }
}

impl Camera for TestPatternCamera {
    fn params(&self) -> VideoParams {
        self.params
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if self.released {
            return Err(CameraError::Released);
        }
        let frame = self.render();
        self.tick += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Factory for [`TestPatternCamera`]. Ignores the device index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestPatternFactory;

impl CameraFactory for TestPatternFactory {
    fn open(&self, index: u32, requested: VideoParams) -> Result<Box<dyn Camera>, CameraError> {
        tracing::debug!(
            "Opening test pattern camera {} ({}x{} @ {}fps)",
            index,
            requested.width,
            requested.height,
            requested.fps
        );
        Ok(Box::new(TestPatternCamera::new(requested)))
    }

    fn list(&self) -> Vec<CameraInfo> {
        vec![CameraInfo {
            id: "pattern".to_string(),
            name: "Test pattern".to_string(),
            supported_resolutions: vec![
                Resolution { width: 1920, height: 1080 },
                Resolution { width: 640, height: 480 },
            ],
        }]
    }
}
