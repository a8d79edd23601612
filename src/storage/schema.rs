//! Persisted session documents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recorder::SegmentDescriptor;

/// One practised pose within a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseRecord {
    pub segment_id: u32,
    pub pose_name: String,
    pub score: u8,
    pub correct: bool,
    pub feedback: String,
    pub duration_seconds: f64,
    pub video_path: String,
}

impl PoseRecord {
    pub fn from_segment(segment: &SegmentDescriptor) -> Self {
        Self {
            segment_id: segment.index,
            pose_name: segment.pose_name.clone(),
            score: segment.score,
            correct: segment.score >= crate::pose::PASS_THRESHOLD,
            feedback: segment.feedback.clone(),
            duration_seconds: segment.duration_seconds,
            video_path: segment.file_path.to_string_lossy().to_string(),
        }
    }
}

/// Values written when a session is finalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalInfo {
    pub duration_seconds: f64,
    /// Mean pose score, rounded to one decimal
    pub avg_score: f64,
    pub final_video_path: String,
    pub end_time: DateTime<Utc>,
}

impl FinalInfo {
    /// Summarise completed segments
    pub fn from_segments(segments: &[SegmentDescriptor], final_video_path: &str) -> Self {
        let duration_seconds = segments.iter().map(|s| s.duration_seconds).sum();
        let avg_score = if segments.is_empty() {
            0.0
        } else {
            let total: f64 = segments.iter().map(|s| f64::from(s.score)).sum();
            ((total / segments.len() as f64) * 10.0).round() / 10.0
        };
        Self {
            duration_seconds,
            avg_score,
            final_video_path: final_video_path.to_string(),
            end_time: Utc::now(),
        }
    }
}

/// Stored state of one practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub poses: Vec<PoseRecord>,
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub duration_seconds: f64,
    #[serde(default)]
    pub final_video_path: Option<String>,
}

impl SessionDocument {
    pub fn new(session_id: &str, user_id: &str, start_time: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            start_time,
            end_time: None,
            poses: Vec::new(),
            avg_score: 0.0,
            duration_seconds: 0.0,
            final_video_path: None,
        }
    }

    pub fn apply_final_info(&mut self, info: &FinalInfo) {
        self.duration_seconds = info.duration_seconds;
        self.avg_score = info.avg_score;
        self.final_video_path = Some(info.final_video_path.clone());
        self.end_time = Some(info.end_time);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats::from_poses(&self.poses)
    }

    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            session_id: self.session_id.clone(),
            date: self.start_time,
            duration_seconds: self.duration_seconds,
            avg_score: self.avg_score,
            poses_count: self.poses.len(),
            video_available: self.final_video_path.is_some(),
        }
    }
}

/// Aggregate correctness of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total_poses: usize,
    pub correct_poses: usize,
    /// Percentage of correct poses, rounded to one decimal
    pub accuracy_rate: f64,
}

impl SessionStats {
    pub fn from_poses(poses: &[PoseRecord]) -> Self {
        let total_poses = poses.len();
        let correct_poses = poses.iter().filter(|p| p.correct).count();
        let accuracy_rate = if total_poses == 0 {
            0.0
        } else {
            let rate = correct_poses as f64 / total_poses as f64 * 100.0;
            (rate * 10.0).round() / 10.0
        };
        Self {
            total_poses,
            correct_poses,
            accuracy_rate,
        }
    }
}

/// Row of a user's session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub duration_seconds: f64,
    pub avg_score: f64,
    pub poses_count: usize,
    pub video_available: bool,
}
