//! Shared fixtures for unit tests

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::capture::{Camera, CameraError, CameraFactory, TestPatternCamera};
use crate::pose::{Keypoint, Landmark, KEYPOINT_COUNT};
use crate::storage::{
    FinalInfo, HistoryEntry, InMemorySessionStore, PoseRecord, SessionDocument, SessionStore,
};
use crate::utils::error::{CoachError, CoachResult};
use crate::video::{VideoFrame, VideoParams};

fn skeleton(joints: &[(Landmark, f64, f64)]) -> Vec<Keypoint> {
    let mut points = vec![Keypoint::new(0.5, 0.1); KEYPOINT_COUNT];
    for &(landmark, x, y) in joints {
        points[landmark.index()] = Keypoint::new(x, y);
    }
    points
}

/// Arms level, left knee bent near 95°, right leg straight
pub fn warrior_frame() -> Vec<Keypoint> {
    use Landmark::*;
    skeleton(&[
        (LeftShoulder, 0.40, 0.40),
        (RightShoulder, 0.60, 0.40),
        (LeftElbow, 0.30, 0.40),
        (RightElbow, 0.70, 0.40),
        (LeftWrist, 0.20, 0.40),
        (RightWrist, 0.80, 0.40),
        (LeftHip, 0.45, 0.60),
        (RightHip, 0.55, 0.60),
        (LeftKnee, 0.30, 0.60),
        (LeftAnkle, 0.283, 0.799),
        (RightKnee, 0.65, 0.75),
        (RightAnkle, 0.75, 0.90),
    ])
}

/// Standing on a straight right leg, left knee bent near 50°, hands together overhead
pub fn tree_frame() -> Vec<Keypoint> {
    use Landmark::*;
    skeleton(&[
        (LeftShoulder, 0.45, 0.30),
        (RightShoulder, 0.55, 0.30),
        (LeftElbow, 0.42, 0.20),
        (RightElbow, 0.58, 0.20),
        (LeftWrist, 0.48, 0.10),
        (RightWrist, 0.52, 0.10),
        (LeftHip, 0.47, 0.55),
        (RightHip, 0.53, 0.55),
        (RightKnee, 0.53, 0.72),
        (RightAnkle, 0.53, 0.90),
        (LeftKnee, 0.35, 0.65),
        (LeftAnkle, 0.51, 0.68),
    ])
}

/// Hips high, straight arms and legs, torso-thigh angle near 60°
pub fn downward_dog_frame() -> Vec<Keypoint> {
    use Landmark::*;
    skeleton(&[
        (LeftShoulder, 0.35, 0.55),
        (LeftElbow, 0.28, 0.68),
        (LeftWrist, 0.21, 0.81),
        (RightShoulder, 0.36, 0.56),
        (RightElbow, 0.29, 0.69),
        (RightWrist, 0.22, 0.82),
        (LeftHip, 0.55, 0.30),
        (RightHip, 0.56, 0.31),
        (LeftKnee, 0.65, 0.55),
        (LeftAnkle, 0.75, 0.80),
        (RightKnee, 0.66, 0.56),
        (RightAnkle, 0.76, 0.81),
    ])
}

/// Elbows at 90°, knees folded to 20° and 60°, wrists at different heights.
/// Fails nearly every check of every built-in pose.
pub fn crouch_frame() -> Vec<Keypoint> {
    use Landmark::*;
    skeleton(&[
        (LeftShoulder, 0.40, 0.40),
        (LeftElbow, 0.30, 0.40),
        (LeftWrist, 0.30, 0.50),
        (RightShoulder, 0.60, 0.40),
        (RightElbow, 0.70, 0.40),
        (RightWrist, 0.70, 0.30),
        (LeftHip, 0.40, 0.60),
        (LeftKnee, 0.40, 0.70),
        (LeftAnkle, 0.4342, 0.6060),
        (RightHip, 0.60, 0.60),
        (RightKnee, 0.60, 0.70),
        (RightAnkle, 0.6866, 0.65),
    ])
}

/// Store that counts calls and can be told to fail every write
pub struct RecordingStore {
    inner: InMemorySessionStore,
    calls: Mutex<HashMap<&'static str, usize>>,
    fail: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            calls: Mutex::new(HashMap::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    fn record(&self, operation: &'static str) -> CoachResult<()> {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        if self.fail {
            return Err(CoachError::Storage(format!("{} unavailable", operation)));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn save_session(&self, document: &SessionDocument) -> CoachResult<()> {
        self.record("save_session")?;
        self.inner.save_session(document).await
    }

    async fn append_pose_record(&self, session_id: &str, record: &PoseRecord) -> CoachResult<()> {
        self.record("append_pose_record")?;
        self.inner.append_pose_record(session_id, record).await
    }

    async fn update_final_info(&self, session_id: &str, info: &FinalInfo) -> CoachResult<()> {
        self.record("update_final_info")?;
        self.inner.update_final_info(session_id, info).await
    }

    async fn get_session(&self, session_id: &str) -> CoachResult<Option<SessionDocument>> {
        self.inner.get_session(session_id).await
    }

    async fn query_history(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> CoachResult<Vec<HistoryEntry>> {
        self.inner.query_history(user_id, limit, skip).await
    }

    async fn count_sessions(&self, user_id: &str) -> CoachResult<usize> {
        self.inner.count_sessions(user_id).await
    }

    async fn delete_session(&self, session_id: &str) -> CoachResult<bool> {
        self.inner.delete_session(session_id).await
    }
}

/// No device can be opened
pub struct FailingCameraFactory;

impl CameraFactory for FailingCameraFactory {
    fn open(&self, index: u32, _requested: VideoParams) -> Result<Box<dyn Camera>, CameraError> {
        Err(CameraError::Open {
            index,
            reason: "device busy".to_string(),
        })
    }
}

/// Test pattern camera whose reads start failing after a number of frames
pub struct FlakyCamera {
    inner: TestPatternCamera,
    remaining: usize,
}

impl Camera for FlakyCamera {
    fn params(&self) -> VideoParams {
        self.inner.params()
    }

    fn read_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if self.remaining == 0 {
            return Err(CameraError::Read("device unplugged".to_string()));
        }
        self.remaining -= 1;
        self.inner.read_frame()
    }

    fn release(&mut self) {
        self.inner.release();
    }
}

pub struct FlakyCameraFactory {
    good_frames: usize,
}

impl FlakyCameraFactory {
    pub fn new(good_frames: usize) -> Self {
        Self { good_frames }
    }
}

impl CameraFactory for FlakyCameraFactory {
    fn open(&self, _index: u32, requested: VideoParams) -> Result<Box<dyn Camera>, CameraError> {
        Ok(Box::new(FlakyCamera {
            inner: TestPatternCamera::new(requested),
            remaining: self.good_frames,
        }))
    }
}
