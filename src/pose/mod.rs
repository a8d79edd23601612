//! Pose scoring
//!
//! Turns a frame of 33 body keypoints into a correctness score:
//! - geometry: joint angles from three points
//! - rules: data-driven pose definitions
//! - engine: rule-set selection and feedback phrasing

pub mod engine;
pub mod geometry;
pub mod landmark;
pub mod rules;

pub use engine::{ClassificationResult, PoseEngine, PASS_THRESHOLD, UNKNOWN_POSE};
pub use geometry::angle_between;
pub use landmark::{Keypoint, Landmark, KEYPOINT_COUNT};
pub use rules::RuleSet;
