//! Session coordinator
//!
//! Drives the lifecycle of practice sessions: camera acquisition, per-pose
//! segment recording, live classification and final assembly.
//!
//! Every operation on a session holds that session's lock for its duration, so
//! segment open/close and frame writes are serialized per session while
//! different sessions proceed in parallel. Classification itself runs before
//! the lock is taken.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::registry::{SessionRegistry, SharedSession};
use super::state::{SessionIdGenerator, SessionSnapshot, SessionState};
use crate::capture::CameraFactory;
use crate::config::CoachConfig;
use crate::export::VideoAssembler;
use crate::feedback::{FeedbackHub, FeedbackReceiver};
use crate::pose::{ClassificationResult, Keypoint, PoseEngine};
use crate::recorder::{RecorderHandle, SegmentDescriptor, SegmentRecorder};
use crate::storage::{FinalInfo, PoseRecord, SessionDocument, SessionStore};
use crate::utils::error::{CoachError, CoachResult};
use crate::video::{VideoBackend, VideoParams};

/// Where and how sessions capture and record
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub camera_index: u32,
    /// Geometry requested from the camera
    pub capture: VideoParams,
    pub segments_dir: PathBuf,
    pub sessions_dir: PathBuf,
}

impl From<&CoachConfig> for CoordinatorSettings {
    fn from(config: &CoachConfig) -> Self {
        Self {
            camera_index: config.camera.index,
            capture: config.camera.params(),
            segments_dir: config.storage.segments_dir(),
            sessions_dir: config.storage.sessions_dir(),
        }
    }
}

/// Owns all live sessions and their collaborators
pub struct SessionCoordinator {
    settings: CoordinatorSettings,
    engine: PoseEngine,
    cameras: Arc<dyn CameraFactory>,
    backend: Arc<dyn VideoBackend>,
    store: Arc<dyn SessionStore>,
    feedback: Arc<FeedbackHub>,
    registry: SessionRegistry,
    ids: SessionIdGenerator,
}

impl SessionCoordinator {
    pub fn new(
        settings: CoordinatorSettings,
        cameras: Arc<dyn CameraFactory>,
        backend: Arc<dyn VideoBackend>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            settings,
            engine: PoseEngine::new(),
            cameras,
            backend,
            store,
            feedback: Arc::new(FeedbackHub::default()),
            registry: SessionRegistry::new(),
            ids: SessionIdGenerator::new(),
        }
    }

    /// Use a custom rule table
    pub fn with_engine(mut self, engine: PoseEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Use a shared feedback hub
    pub fn with_feedback(mut self, feedback: Arc<FeedbackHub>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn engine(&self) -> &PoseEngine {
        &self.engine
    }

    pub fn feedback(&self) -> &Arc<FeedbackHub> {
        &self.feedback
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn session(&self, session_id: &str) -> CoachResult<SharedSession> {
        self.registry
            .get(session_id)
            .ok_or_else(|| CoachError::NotFound(session_id.to_string()))
    }

    /// Open a session for `user_id` and acquire its camera
    pub async fn start_session(&self, user_id: &str) -> CoachResult<String> {
        let session_id = self.ids.next_id();

        let cameras = self.cameras.clone();
        let (index, requested) = (self.settings.camera_index, self.settings.capture);
        let camera = tokio::task::spawn_blocking(move || cameras.open(index, requested))
            .await
            .map_err(|e| CoachError::Camera(format!("camera open task failed: {}", e)))??;

        let state = SessionState::new(
            session_id.clone(),
            user_id.to_string(),
            camera,
            SegmentRecorder::new(self.backend.clone()),
        );
        let document = SessionDocument::new(&session_id, user_id, state.started_at);
        let params = state.capture_params;
        self.registry.insert(state);

        tracing::info!(
            "Session {} started for user {} (camera {} at {}x{} @ {}fps)",
            session_id,
            user_id,
            index,
            params.width,
            params.height,
            params.fps
        );

        best_effort("save session", &session_id, self.store.save_session(&document)).await;
        Ok(session_id)
    }

    /// Classify a keypoint frame and, while a segment is open, record the
    /// current camera image into it
    pub async fn submit_frame(
        &self,
        session_id: &str,
        keypoints: &[Keypoint],
        pose_hint: Option<&str>,
    ) -> CoachResult<ClassificationResult> {
        let session = self.session(session_id)?;
        let result = self.engine.classify(keypoints, pose_hint);

        {
            let mut state = session.lock().await;
            state.frames_classified += 1;
            if let Some(handle) = state.active_segment.clone() {
                capture_into_segment(&mut state, &handle);
            }
        }

        self.feedback.publish(session_id, &result);
        tracing::debug!(
            "Session {}: {} scored {} ({})",
            session_id,
            result.pose_name,
            result.score,
            result.feedback
        );
        Ok(result)
    }

    /// Open the next segment; returns its 1-based index
    pub async fn start_segment(&self, session_id: &str) -> CoachResult<u32> {
        let session = self.session(session_id)?;
        let mut state = session.lock().await;

        if let Some(handle) = &state.active_segment {
            return Err(CoachError::Conflict(format!(
                "segment {} is already recording",
                handle.index
            )));
        }
        if state.degraded || !state.camera_acquired() {
            return Err(CoachError::Camera(format!(
                "camera unavailable for session {}",
                session_id
            )));
        }

        let index = state.segment_counter + 1;
        let destination = self.settings.segments_dir.join(format!(
            "{}_segment_{}.{}",
            session_id,
            index,
            self.backend.extension()
        ));
        let params = state.capture_params;
        let handle = state.recorder.open(index, &destination, params)?;

        state.segment_counter = index;
        state.active_segment = Some(handle);
        tracing::info!("Session {}: segment {} started", session_id, index);
        Ok(index)
    }

    /// Close the open segment, labelling it with the pose that was practised
    pub async fn stop_segment(
        &self,
        session_id: &str,
        pose_name: &str,
        score: u8,
        feedback: &str,
    ) -> CoachResult<SegmentDescriptor> {
        let session = self.session(session_id)?;
        let descriptor = {
            let mut state = session.lock().await;
            let Some(handle) = state.active_segment.take() else {
                return Err(CoachError::Conflict("no segment is recording".to_string()));
            };
            let descriptor = state.recorder.close(&handle, pose_name, score, feedback)?;
            state.segments.push(descriptor.clone());
            descriptor
        };

        tracing::info!(
            "Session {}: segment {} stopped ({} frames, {:.1}s, {} scored {})",
            session_id,
            descriptor.index,
            descriptor.frame_count,
            descriptor.duration_seconds,
            descriptor.pose_name,
            descriptor.score
        );

        let record = PoseRecord::from_segment(&descriptor);
        best_effort(
            "append pose record",
            session_id,
            self.store.append_pose_record(session_id, &record),
        )
        .await;
        Ok(descriptor)
    }

    /// Release the camera, assemble every segment into the session video and
    /// retire the session. Returns the video path.
    ///
    /// A session without segments fails with `EmptyInput` but stays
    /// registered (camera released) until [`teardown_session`](Self::teardown_session).
    pub async fn finalize_session(&self, session_id: &str) -> CoachResult<PathBuf> {
        let session = self.session(session_id)?;
        let mut state = session.lock().await;

        if let Some(handle) = &state.active_segment {
            return Err(CoachError::Conflict(format!(
                "segment {} is still recording",
                handle.index
            )));
        }
        state.release_camera();

        if state.segments.is_empty() {
            return Err(CoachError::EmptyInput(format!(
                "session {} has no recorded segments",
                session_id
            )));
        }

        let segments = state.segments.clone();
        let output = self.settings.sessions_dir.join(format!(
            "{}.{}",
            session_id,
            self.backend.extension()
        ));
        let assembler = VideoAssembler::new(self.backend.clone());
        let merge_output = output.clone();
        let progress_id = session_id.to_string();
        let report = tokio::task::spawn_blocking(move || {
            assembler.merge_with_progress(&segments, &merge_output, |progress| {
                tracing::debug!(
                    "Session {} assembly: {:?} ({:.0}%)",
                    progress_id,
                    progress.stage,
                    progress.percent()
                );
            })
        })
        .await
        .map_err(|e| CoachError::Resource(format!("assembly task failed: {}", e)))??;

        let info = FinalInfo::from_segments(&state.segments, &report.output_path.to_string_lossy());
        drop(state);

        self.registry.remove(session_id);
        self.feedback.unsubscribe(session_id);

        tracing::info!(
            "Session {} finalized: {} segments ({} skipped), {:.1}s, avg score {}, video {:?}",
            session_id,
            report.segments_written.len(),
            report.skipped.len(),
            info.duration_seconds,
            info.avg_score,
            report.output_path
        );

        best_effort(
            "update final info",
            session_id,
            self.store.update_final_info(session_id, &info),
        )
        .await;
        Ok(report.output_path)
    }

    /// Drop a session without assembling it
    pub async fn teardown_session(&self, session_id: &str) -> CoachResult<()> {
        let session = self
            .registry
            .remove(session_id)
            .ok_or_else(|| CoachError::NotFound(session_id.to_string()))?;
        session.lock().await.release_all();
        self.feedback.unsubscribe(session_id);
        tracing::info!("Session {} torn down", session_id);
        Ok(())
    }

    /// Release every camera and recorder and forget all sessions
    pub async fn shutdown(&self) {
        let sessions = self.registry.drain();
        let count = sessions.len();
        for (session_id, session) in sessions {
            session.lock().await.release_all();
            tracing::debug!("Released session {} at shutdown", session_id);
        }
        self.feedback.clear();
        tracing::info!("Coordinator shut down ({} sessions released)", count);
    }

    /// Ids of live sessions, sorted
    pub fn active_sessions(&self) -> Vec<String> {
        self.registry.ids()
    }

    pub async fn session_snapshot(&self, session_id: &str) -> CoachResult<SessionSnapshot> {
        let session = self.session(session_id)?;
        let state = session.lock().await;
        Ok(state.snapshot())
    }

    /// Follow the latest classification of a live session
    pub fn subscribe(&self, session_id: &str) -> CoachResult<FeedbackReceiver> {
        self.session(session_id)?;
        Ok(self.feedback.subscribe(session_id))
    }
}

/// Grab the current camera image into the open segment. Failures degrade the
/// session instead of failing the caller.
fn capture_into_segment(state: &mut SessionState, handle: &RecorderHandle) {
    let frame = match state.camera.as_mut().map(|camera| camera.read_frame()) {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
            state.mark_degraded(&format!("camera read failed: {}", e));
            return;
        }
        None => return,
    };

    if let Err(e) = state.recorder.write_frame(handle, &frame) {
        state.mark_degraded(&format!("segment write failed: {}", e));
    }
}

/// Await a persistence call, logging instead of propagating failure
async fn best_effort<F>(operation: &str, session_id: &str, call: F)
where
    F: Future<Output = CoachResult<()>>,
{
    if let Err(e) = call.await {
        tracing::warn!("Failed to {} for session {}: {}", operation, session_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::TestPatternFactory;
    use crate::pose::UNKNOWN_POSE;
    use crate::test_support::{
        crouch_frame, tree_frame, warrior_frame, FailingCameraFactory, FlakyCameraFactory,
        RecordingStore,
    };
    use crate::video::{FrameReader, RawBackend};
    use tempfile::{tempdir, TempDir};

    fn settings(dir: &TempDir) -> CoordinatorSettings {
        CoordinatorSettings {
            camera_index: 0,
            capture: VideoParams::new(64, 48, 30.0),
            segments_dir: dir.path().join("videos").join("segments"),
            sessions_dir: dir.path().join("videos").join("sessions"),
        }
    }

    fn coordinator(dir: &TempDir, store: Arc<RecordingStore>) -> SessionCoordinator {
        SessionCoordinator::new(
            settings(dir),
            Arc::new(TestPatternFactory),
            Arc::new(RawBackend),
            store,
        )
    }

    fn count_frames(path: &std::path::Path) -> usize {
        let mut reader = RawBackend.open_reader(path).unwrap();
        let mut frames = 0;
        while reader.read_frame().unwrap().is_some() {
            frames += 1;
        }
        frames
    }

    #[tokio::test]
    async fn test_end_to_end_session() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordingStore::new());
        let coach = coordinator(&dir, store.clone());

        let session_id = coach.start_session("alice").await.unwrap();
        assert_eq!(coach.active_sessions(), vec![session_id.clone()]);

        // Warm-up frames are scored but not recorded.
        for _ in 0..5 {
            let result = coach
                .submit_frame(&session_id, &warrior_frame(), Some("WideStance"))
                .await
                .unwrap();
            assert!(result.correct);
            assert!(result.score >= 90);
        }

        let index = coach.start_segment(&session_id).await.unwrap();
        assert_eq!(index, 1);

        let mut last = None;
        for _ in 0..5 {
            let result = coach
                .submit_frame(&session_id, &warrior_frame(), Some("WideStance"))
                .await
                .unwrap();
            assert_eq!(result.pose_name, "Warrior II");
            assert!(result.score >= 90);
            last = Some(result);
        }
        let last = last.unwrap();
        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert_eq!(snapshot.frames_classified, 10);

        let descriptor = coach
            .stop_segment(&session_id, &last.pose_name, last.score, &last.feedback)
            .await
            .unwrap();
        assert_eq!(descriptor.index, 1);
        assert_eq!(descriptor.frame_count, 5);
        assert!(descriptor.file_path.ends_with(format!("{}_segment_1.rgba", session_id)));

        let video = coach.finalize_session(&session_id).await.unwrap();
        let expected = dir.path().join("videos").join("sessions");
        assert_eq!(video, expected.join(format!("{}.rgba", session_id)));
        assert_eq!(count_frames(&video), 5);
        assert!(coach.active_sessions().is_empty());

        assert_eq!(store.calls("save_session"), 1);
        assert_eq!(store.calls("append_pose_record"), 1);
        assert_eq!(store.calls("update_final_info"), 1);

        let document = store.get_session(&session_id).await.unwrap().unwrap();
        assert_eq!(document.user_id, "alice");
        assert_eq!(document.poses.len(), 1);
        assert_eq!(document.poses[0].segment_id, 1);
        assert_eq!(document.avg_score, f64::from(last.score));
        assert_eq!(document.final_video_path.as_deref(), Some(video.to_string_lossy().as_ref()));
    }

    #[tokio::test]
    async fn test_segment_conflicts() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();

        assert!(matches!(
            coach.stop_segment(&session_id, "Tree Pose", 80, "").await,
            Err(CoachError::Conflict(_))
        ));

        coach.start_segment(&session_id).await.unwrap();
        assert!(matches!(
            coach.start_segment(&session_id).await,
            Err(CoachError::Conflict(_))
        ));
        assert!(matches!(
            coach.finalize_session(&session_id).await,
            Err(CoachError::Conflict(_))
        ));

        // The original segment is still the open one.
        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert_eq!(snapshot.active_segment, Some(1));
        assert!(snapshot.camera_acquired);
    }

    #[tokio::test]
    async fn test_segment_indices_are_gapless() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();

        let mut indices = Vec::new();
        for _ in 0..3 {
            let index = coach.start_segment(&session_id).await.unwrap();
            coach.submit_frame(&session_id, &tree_frame(), None).await.unwrap();
            let descriptor = coach.stop_segment(&session_id, "Tree Pose", 100, "").await.unwrap();
            assert_eq!(descriptor.index, index);
            indices.push(index);
        }
        assert_eq!(indices, vec![1, 2, 3]);

        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        let recorded: Vec<u32> = snapshot.segments.iter().map(|s| s.index).collect();
        assert_eq!(recorded, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_finalize_without_segments_is_empty_input() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordingStore::new());
        let coach = coordinator(&dir, store.clone());
        let session_id = coach.start_session("alice").await.unwrap();

        let err = coach.finalize_session(&session_id).await.unwrap_err();
        assert!(matches!(err, CoachError::EmptyInput(_)));

        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert!(!snapshot.camera_acquired);
        assert_eq!(store.calls("update_final_info"), 0);

        coach.teardown_session(&session_id).await.unwrap();
        assert!(coach.active_sessions().is_empty());
        assert!(matches!(
            coach.teardown_session(&session_id).await,
            Err(CoachError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_segment_is_skipped_at_finalize() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();

        coach.start_segment(&session_id).await.unwrap();
        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
        let first = coach.stop_segment(&session_id, "Warrior II", 100, "").await.unwrap();

        coach.start_segment(&session_id).await.unwrap();
        for _ in 0..3 {
            coach.submit_frame(&session_id, &tree_frame(), None).await.unwrap();
        }
        coach.stop_segment(&session_id, "Tree Pose", 100, "").await.unwrap();

        std::fs::write(&first.file_path, b"not a video").unwrap();

        let video = coach.finalize_session(&session_id).await.unwrap();
        assert_eq!(count_frames(&video), 3);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        assert!(matches!(
            coach.submit_frame("missing", &warrior_frame(), None).await,
            Err(CoachError::NotFound(_))
        ));
        assert!(matches!(coach.start_segment("missing").await, Err(CoachError::NotFound(_))));
        assert!(matches!(
            coach.stop_segment("missing", "x", 0, "").await,
            Err(CoachError::NotFound(_))
        ));
        assert!(matches!(coach.finalize_session("missing").await, Err(CoachError::NotFound(_))));
        assert!(matches!(coach.session_snapshot("missing").await, Err(CoachError::NotFound(_))));
        assert!(coach.subscribe("missing").is_err());
    }

    #[tokio::test]
    async fn test_camera_failure_leaves_no_session() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordingStore::new());
        let coach = SessionCoordinator::new(
            settings(&dir),
            Arc::new(FailingCameraFactory),
            Arc::new(RawBackend),
            store.clone(),
        );
        let err = coach.start_session("alice").await.unwrap_err();
        assert!(matches!(err, CoachError::Camera(_)));
        assert!(coach.active_sessions().is_empty());
        assert_eq!(store.calls("save_session"), 0);
    }

    #[tokio::test]
    async fn test_camera_loss_degrades_session() {
        let dir = tempdir().unwrap();
        let coach = SessionCoordinator::new(
            settings(&dir),
            Arc::new(FlakyCameraFactory::new(2)),
            Arc::new(RawBackend),
            Arc::new(RecordingStore::new()),
        );
        let session_id = coach.start_session("alice").await.unwrap();
        coach.start_segment(&session_id).await.unwrap();

        // Third read fails; submissions still succeed.
        for _ in 0..4 {
            let result = coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
            assert_eq!(result.pose_name, "Warrior II");
        }
        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert!(snapshot.degraded);

        let descriptor = coach.stop_segment(&session_id, "Warrior II", 100, "").await.unwrap();
        assert_eq!(descriptor.frame_count, 2);
        assert!(matches!(coach.start_segment(&session_id).await, Err(CoachError::Camera(_))));

        // What was recorded can still be assembled.
        coach.finalize_session(&session_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_frames_outside_segments_are_not_recorded() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();

        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
        coach.start_segment(&session_id).await.unwrap();
        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
        let descriptor = coach.stop_segment(&session_id, "Warrior II", 100, "").await.unwrap();
        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();

        assert_eq!(descriptor.frame_count, 1);
        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert_eq!(snapshot.frames_classified, 3);
    }

    #[tokio::test]
    async fn test_invalid_frames_are_classified_not_rejected() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();

        let short = vec![Keypoint::new(0.5, 0.5); 12];
        let result = coach.submit_frame(&session_id, &short, None).await.unwrap();
        assert_eq!(result.pose_name, UNKNOWN_POSE);

        let result = coach.submit_frame(&session_id, &crouch_frame(), None).await.unwrap();
        assert_eq!(result.pose_name, UNKNOWN_POSE);
    }

    #[tokio::test]
    async fn test_results_reach_subscriber() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let session_id = coach.start_session("alice").await.unwrap();
        let mut rx = coach.subscribe(&session_id).unwrap();

        coach.submit_frame(&session_id, &tree_frame(), None).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.pose_name, "Tree Pose");

        // An unread result is replaced by the next one.
        coach.submit_frame(&session_id, &tree_frame(), None).await.unwrap();
        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().pose_name, "Warrior II");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_persistence_failures_are_swallowed() {
        let dir = tempdir().unwrap();
        let store = Arc::new(RecordingStore::failing());
        let coach = coordinator(&dir, store.clone());

        let session_id = coach.start_session("alice").await.unwrap();
        coach.start_segment(&session_id).await.unwrap();
        coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
        coach.stop_segment(&session_id, "Warrior II", 100, "").await.unwrap();
        coach.finalize_session(&session_id).await.unwrap();

        assert_eq!(store.calls("save_session"), 1);
        assert_eq!(store.calls("append_pose_record"), 1);
        assert_eq!(store.calls("update_final_info"), 1);
    }

    #[tokio::test]
    async fn test_sessions_run_independently() {
        let dir = tempdir().unwrap();
        let coach = Arc::new(coordinator(&dir, Arc::new(RecordingStore::new())));

        let run = |frames: usize| {
            let coach = coach.clone();
            async move {
                let session_id = coach.start_session("alice").await.unwrap();
                coach.start_segment(&session_id).await.unwrap();
                for _ in 0..frames {
                    coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
                }
                let descriptor = coach
                    .stop_segment(&session_id, "Warrior II", 100, "")
                    .await
                    .unwrap();
                (session_id, descriptor.frame_count)
            }
        };

        let (a, b) = tokio::join!(tokio::spawn(run(3)), tokio::spawn(run(6)));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.0, b.0);
        assert_eq!(a.1, 3);
        assert_eq!(b.1, 6);
        assert_eq!(coach.active_sessions().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_segments_stay_gapless_under_concurrent_frames() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        const CYCLES: u32 = 8;

        let dir = tempdir().unwrap();
        let coach = Arc::new(coordinator(&dir, Arc::new(RecordingStore::new())));
        let session_id = coach.start_session("alice").await.unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let submitter = {
            let (coach, stop, session_id) = (coach.clone(), stop.clone(), session_id.clone());
            tokio::spawn(async move {
                let mut submitted: u64 = 0;
                while !stop.load(Ordering::SeqCst) {
                    coach
                        .submit_frame(&session_id, &tree_frame(), Some("Tree Pose"))
                        .await
                        .unwrap();
                    submitted += 1;
                    tokio::task::yield_now().await;
                }
                submitted
            })
        };

        let mut own_frames: u64 = 0;
        for expected in 1..=CYCLES {
            let index = coach.start_segment(&session_id).await.unwrap();
            assert_eq!(index, expected);

            // At least one frame lands in every segment.
            coach.submit_frame(&session_id, &warrior_frame(), None).await.unwrap();
            own_frames += 1;
            tokio::time::sleep(Duration::from_millis(2)).await;

            match coach.stop_segment(&session_id, "Tree Pose", 100, "").await {
                Ok(descriptor) => assert_eq!(descriptor.index, expected),
                Err(e) => panic!("segment {} failed to stop: {}", expected, e),
            }
        }

        stop.store(true, Ordering::SeqCst);
        let total = submitter.await.unwrap() + own_frames;

        let snapshot = coach.session_snapshot(&session_id).await.unwrap();
        assert_eq!(snapshot.frames_classified, total);
        assert_eq!(snapshot.dropped_frames, 0);
        assert_eq!(snapshot.active_segment, None);

        let indices: Vec<u32> = snapshot.segments.iter().map(|s| s.index).collect();
        assert_eq!(indices, (1..=CYCLES).collect::<Vec<_>>());
        assert!(snapshot.segments.iter().all(|s| s.frame_count >= 1));
        let recorded: u64 = snapshot.segments.iter().map(|s| s.frame_count).sum();
        assert!(recorded >= u64::from(CYCLES));
        assert!(recorded <= total);

        let video = coach.finalize_session(&session_id).await.unwrap();
        assert_eq!(count_frames(&video) as u64, recorded);
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let dir = tempdir().unwrap();
        let coach = coordinator(&dir, Arc::new(RecordingStore::new()));
        let first = coach.start_session("alice").await.unwrap();
        let second = coach.start_session("bob").await.unwrap();
        coach.start_segment(&first).await.unwrap();
        let _rx = coach.subscribe(&second).unwrap();

        coach.shutdown().await;
        assert!(coach.active_sessions().is_empty());
        assert!(!coach.feedback().has_subscriber(&second));
        assert!(matches!(coach.start_segment(&first).await, Err(CoachError::NotFound(_))));
    }
}
