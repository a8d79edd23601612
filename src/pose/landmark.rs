//! Keypoint types and the fixed 33-point body layout

use serde::{Deserialize, Serialize};

/// Number of keypoints in a complete frame
pub const KEYPOINT_COUNT: usize = 33;

/// A single tracked body-joint position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default = "default_visibility")]
    pub visibility: f64,
}

fn default_visibility() -> f64 {
    1.0
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility: 1.0,
        }
    }
}

/// Named joint indices of the 33-point layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Landmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Landmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Why a keypoint slice cannot be classified
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDefect {
    WrongCount(usize),
    NonFinite(usize),
}

impl FrameDefect {
    pub fn describe(&self) -> String {
        match self {
            FrameDefect::WrongCount(n) => {
                format!("Expected {} keypoints, got {}", KEYPOINT_COUNT, n)
            }
            FrameDefect::NonFinite(i) => format!("Keypoint {} has a non-finite position", i),
        }
    }
}

/// A validated frame of exactly 33 keypoints
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    points: &'a [Keypoint],
}

impl<'a> Frame<'a> {
    /// Validate a keypoint slice before any geometry runs on it
    pub fn validate(points: &'a [Keypoint]) -> Result<Self, FrameDefect> {
        if points.len() != KEYPOINT_COUNT {
            return Err(FrameDefect::WrongCount(points.len()));
        }
        if let Some(i) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(FrameDefect::NonFinite(i));
        }
        Ok(Self { points })
    }

    pub fn get(&self, landmark: Landmark) -> &Keypoint {
        &self.points[landmark.index()]
    }
}
