//! Assembly types
//!
//! Progress and outcome of merging recorded segments into one video.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Assembly stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MergeStage {
    Preparing,
    /// Copying frames of the segment with this index
    Merging { segment: u32 },
    Finalizing,
    Complete,
}

/// Progress update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeProgress {
    pub stage: MergeStage,
    /// Segments processed so far (written or skipped)
    pub segments_done: usize,
    pub segments_total: usize,
}

impl MergeProgress {
    pub fn percent(&self) -> f32 {
        if self.segments_total == 0 {
            return 0.0;
        }
        (self.segments_done as f32 / self.segments_total as f32) * 100.0
    }
}

/// A segment left out of the merged output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSegment {
    pub index: u32,
    pub reason: String,
}

/// Outcome of a merge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub output_path: PathBuf,
    /// Indices of segments that made it into the output
    pub segments_written: Vec<u32>,
    pub skipped: Vec<SkippedSegment>,
    pub frames_written: u64,
}
