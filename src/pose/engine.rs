//! Pose classification over data-driven rule-sets

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::landmark::{Frame, Keypoint};
use super::rules::{base_rule_sets, RuleOutcome, RuleSet};

/// Scores at or above this are reported as correct
pub const PASS_THRESHOLD: u8 = 70;

/// Scores at or above this earn the rule-set's excellent message
pub const EXCELLENT_THRESHOLD: u8 = 90;

/// Without a hint, a best score below this is reported as unknown
pub const RECOGNITION_THRESHOLD: u8 = 50;

/// Pose name used when no rule-set applies
pub const UNKNOWN_POSE: &str = "Unknown";

const UNRECOGNIZED_FEEDBACK: &str =
    "Unable to recognize a supported pose, please adjust your position";

/// Result of classifying one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub pose_name: String,
    pub correct: bool,
    pub score: u8,
    pub feedback: String,
    pub angle_details: BTreeMap<String, f64>,
}

impl ClassificationResult {
    /// Result for a frame that could not be attributed to any pose
    pub fn unknown(feedback: impl Into<String>) -> Self {
        Self {
            pose_name: UNKNOWN_POSE.to_string(),
            correct: false,
            score: 0,
            feedback: feedback.into(),
            angle_details: BTreeMap::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.pose_name == UNKNOWN_POSE
    }
}

/// Classifies keypoint frames against a table of rule-sets
#[derive(Debug, Clone)]
pub struct PoseEngine {
    rule_sets: Vec<RuleSet>,
}

impl Default for PoseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseEngine {
    /// Engine over the built-in poses
    pub fn new() -> Self {
        Self::with_rule_sets(base_rule_sets())
    }

    /// Engine over a custom table; table order is the tie-break order
    pub fn with_rule_sets(rule_sets: Vec<RuleSet>) -> Self {
        Self { rule_sets }
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    /// Display names of every supported pose
    pub fn pose_names(&self) -> Vec<&str> {
        self.rule_sets.iter().map(|r| r.name.as_str()).collect()
    }

    /// Find the rule-set a hint refers to
    pub fn find(&self, hint: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|r| r.matches(hint))
    }

    /// Classify one frame of keypoints.
    ///
    /// Never fails: malformed frames and unrecognised poses come back as an
    /// `Unknown` result with score 0.
    pub fn classify(
        &self,
        keypoints: &[Keypoint],
        pose_hint: Option<&str>,
    ) -> ClassificationResult {
        let frame = match Frame::validate(keypoints) {
            Ok(frame) => frame,
            Err(defect) => {
                tracing::debug!("Rejected frame: {}", defect.describe());
                return ClassificationResult::unknown(defect.describe());
            }
        };

        if let Some(hint) = pose_hint {
            match self.find(hint) {
                Some(rules) => return phrase(rules, rules.evaluate(&frame)),
                None => tracing::debug!("Unknown pose hint '{}', evaluating all poses", hint),
            }
        }

        // Strictly-greater comparison keeps the earliest rule-set on ties.
        let best = self
            .rule_sets
            .iter()
            .map(|rules| (rules, rules.evaluate(&frame)))
            .fold(None::<(&RuleSet, RuleOutcome)>, |best, candidate| match best {
                Some(current) if candidate.1.score <= current.1.score => Some(current),
                _ => Some(candidate),
            });

        match best {
            Some((rules, outcome)) if outcome.score >= RECOGNITION_THRESHOLD => {
                phrase(rules, outcome)
            }
            _ => ClassificationResult::unknown(UNRECOGNIZED_FEEDBACK),
        }
    }
}

fn phrase(rules: &RuleSet, outcome: RuleOutcome) -> ClassificationResult {
    let score = outcome.score;
    let feedback = if score >= EXCELLENT_THRESHOLD {
        rules.excellent.clone()
    } else if score >= PASS_THRESHOLD {
        if outcome.triggered.is_empty() {
            rules.hold.clone()
        } else {
            format!("Good! {}", outcome.triggered.join(", "))
        }
    } else {
        format!("Needs adjustment: {}", outcome.triggered.join(", "))
    };

    ClassificationResult {
        pose_name: rules.name.clone(),
        correct: score >= PASS_THRESHOLD,
        score,
        feedback,
        angle_details: outcome.details,
    }
}
