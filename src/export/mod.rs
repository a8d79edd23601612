//! Session video assembly
//!
//! Merges the recorded segments of a session into one annotated video.

pub mod assembler;
pub mod types;

pub use assembler::VideoAssembler;
pub use types::{MergeProgress, MergeReport, MergeStage, SkippedSegment};
