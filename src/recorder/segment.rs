//! Segment recorder
//!
//! Owns at most one open video destination. Opening, writing and closing all
//! go through `&mut self`, so a frame can never land in a half-closed file.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::state::{RecorderHandle, RecorderState, SegmentDescriptor};
use crate::utils::error::{CoachError, CoachResult};
use crate::video::{FrameWriter, VideoBackend, VideoFrame, VideoParams};

struct OpenSegment {
    handle: RecorderHandle,
    writer: Box<dyn FrameWriter>,
    started: Instant,
}

/// Records frames into one segment file at a time
pub struct SegmentRecorder {
    backend: Arc<dyn VideoBackend>,
    current: Option<OpenSegment>,
    dropped_frames: u64,
}

impl SegmentRecorder {
    pub fn new(backend: Arc<dyn VideoBackend>) -> Self {
        Self {
            backend,
            current: None,
            dropped_frames: 0,
        }
    }

    pub fn state(&self) -> RecorderState {
        if self.current.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    /// Handle of the open destination, if any
    pub fn active(&self) -> Option<&RecorderHandle> {
        self.current.as_ref().map(|c| &c.handle)
    }

    /// Frames discarded because no matching destination was open
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Open a new destination
    pub fn open(
        &mut self,
        index: u32,
        destination: &Path,
        params: VideoParams,
    ) -> CoachResult<RecorderHandle> {
        if let Some(current) = &self.current {
            return Err(CoachError::InvalidState(format!(
                "segment {} is still recording",
                current.handle.index
            )));
        }

        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoachError::Resource(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let writer = self
            .backend
            .create_writer(destination, params)
            .map_err(|e| CoachError::Resource(format!("Failed to open {:?}: {}", destination, e)))?;

        let handle = RecorderHandle {
            id: Uuid::new_v4(),
            index,
            path: destination.to_path_buf(),
        };

        tracing::info!(
            "Segment {} recording to {:?} ({}x{} @ {}fps)",
            index,
            destination,
            params.width,
            params.height,
            params.fps
        );

        self.current = Some(OpenSegment {
            handle: handle.clone(),
            writer,
            started: Instant::now(),
        });
        Ok(handle)
    }

    /// Append a frame to the open destination
    pub fn write_frame(&mut self, handle: &RecorderHandle, frame: &VideoFrame) -> CoachResult<()> {
        let Some(current) = self.current.as_mut().filter(|c| c.handle.id == handle.id) else {
            self.dropped_frames += 1;
            tracing::debug!(
                "Dropped frame for segment {} ({} dropped so far)",
                handle.index,
                self.dropped_frames
            );
            return Ok(());
        };

        current.writer.write_frame(frame).map_err(|e| {
            CoachError::Resource(format!("Segment {} write failed: {}", handle.index, e))
        })
    }

    /// Finish the open destination and describe it
    pub fn close(
        &mut self,
        handle: &RecorderHandle,
        pose_name: &str,
        score: u8,
        feedback: &str,
    ) -> CoachResult<SegmentDescriptor> {
        match &self.current {
            Some(current) if current.handle.id == handle.id => {}
            Some(current) => {
                return Err(CoachError::InvalidState(format!(
                    "handle for segment {} does not match open segment {}",
                    handle.index, current.handle.index
                )))
            }
            None => return Err(CoachError::InvalidState("no segment is recording".to_string())),
        }

        // The recorder is idle from here on, whether or not the writer finishes cleanly.
        let Some(OpenSegment { handle, writer, started }) = self.current.take() else {
            return Err(CoachError::InvalidState("no segment is recording".to_string()));
        };
        let duration_seconds = started.elapsed().as_secs_f64();

        let frame_count = writer.finish().map_err(|e| {
            CoachError::Resource(format!("Segment {} failed to finalize: {}", handle.index, e))
        })?;

        tracing::info!(
            "Segment {} closed: {} frames in {:.2}s, pose={} score={}",
            handle.index,
            frame_count,
            duration_seconds,
            pose_name,
            score
        );

        Ok(SegmentDescriptor {
            index: handle.index,
            pose_name: pose_name.to_string(),
            score,
            feedback: feedback.to_string(),
            duration_seconds,
            file_path: handle.path,
            frame_count,
        })
    }

    /// Release any open destination without producing a descriptor
    pub fn abort(&mut self) {
        if let Some(current) = self.current.take() {
            let index = current.handle.index;
            if let Err(e) = current.writer.finish() {
                tracing::warn!("Failed to finalize aborted segment {}: {}", index, e);
            } else {
                tracing::info!("Aborted segment {}", index);
            }
        }
    }
}
