//! Per-session state

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::Camera;
use crate::recorder::{RecorderHandle, SegmentDescriptor, SegmentRecorder};
use crate::video::VideoParams;

/// Everything the coordinator tracks for one live session
pub struct SessionState {
    pub id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub camera: Option<Box<dyn Camera>>,
    /// Geometry delivered by the camera when it was opened
    pub capture_params: VideoParams,
    pub active_segment: Option<RecorderHandle>,
    pub recorder: SegmentRecorder,
    /// Completed segments in index order
    pub segments: Vec<SegmentDescriptor>,
    pub segment_counter: u32,
    /// Set when capture or recording failed; no new segments may start
    pub degraded: bool,
    pub frames_classified: u64,
}

impl SessionState {
    pub fn new(
        id: String,
        user_id: String,
        camera: Box<dyn Camera>,
        recorder: SegmentRecorder,
    ) -> Self {
        let capture_params = camera.params();
        Self {
            id,
            user_id,
            started_at: Utc::now(),
            camera: Some(camera),
            capture_params,
            active_segment: None,
            recorder,
            segments: Vec::new(),
            segment_counter: 0,
            degraded: false,
            frames_classified: 0,
        }
    }

    pub fn camera_acquired(&self) -> bool {
        self.camera.is_some()
    }

    /// Stop and drop the camera, if still held
    pub fn release_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
            tracing::debug!("Released camera for session {}", self.id);
        }
    }

    /// Abort any open segment and release the camera
    pub fn release_all(&mut self) {
        if self.active_segment.take().is_some() {
            self.recorder.abort();
        }
        self.release_camera();
    }

    pub fn mark_degraded(&mut self, reason: &str) {
        if !self.degraded {
            tracing::error!("Session {} degraded: {}", self.id, reason);
        }
        self.degraded = true;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            user_id: self.user_id.clone(),
            started_at: self.started_at,
            camera_acquired: self.camera_acquired(),
            degraded: self.degraded,
            active_segment: self.active_segment.as_ref().map(|h| h.index),
            segments: self.segments.clone(),
            frames_classified: self.frames_classified,
            dropped_frames: self.recorder.dropped_frames(),
        }
    }
}

/// Read-only view of a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub camera_acquired: bool,
    pub degraded: bool,
    /// Index of the open segment, if any
    pub active_segment: Option<u32>,
    pub segments: Vec<SegmentDescriptor>,
    pub frames_classified: u64,
    pub dropped_frames: u64,
}

/// Issues `YYYYMMDD_HHMMSS_mmm` ids that strictly increase within the process
#[derive(Debug, Default)]
pub struct SessionIdGenerator {
    last_ms: AtomicI64,
}

impl SessionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_ms.load(Ordering::SeqCst);
        let ms = loop {
            let candidate = now.max(last + 1);
            match self
                .last_ms
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };
        format_session_id(ms)
    }
}

fn format_session_id(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(at) => at.format("%Y%m%d_%H%M%S_%3f").to_string(),
        None => format!("{}", ms),
    }
}
