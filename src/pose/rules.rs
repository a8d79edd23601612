//! Pose rule-sets
//!
//! Each supported pose is described purely as data: a list of checks over
//! joint angles (or auxiliary measurements) with an acceptable range, a score
//! penalty and a correction message. Side-asymmetric poses carry a
//! [`SideSelector`] that decides which limb plays which role before the checks
//! run. Adding a pose means adding a [`RuleSet`] to the table.

use std::collections::BTreeMap;

use super::geometry::angle_between;
use super::landmark::{Frame, Landmark};

/// Three joints whose middle one is the angle vertex
pub type JointTriplet = [Landmark; 3];

/// Body side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Which candidate limb takes the primary role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    SmallerAngle,
    LargerAngle,
}

/// Picks a primary side by comparing the same joint angle on both sides.
///
/// Equal angles resolve to the right side.
#[derive(Debug, Clone)]
pub struct SideSelector {
    pub left: JointTriplet,
    pub right: JointTriplet,
    pub prefer: Preference,
}

/// Outcome of side selection for one frame
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub chosen: Side,
    pub chosen_angle: f64,
    pub other: Side,
    pub other_angle: f64,
}

impl SideSelector {
    pub fn select(&self, frame: &Frame<'_>) -> Selection {
        let left = triplet_angle(frame, &self.left);
        let right = triplet_angle(frame, &self.right);

        let left_wins = match self.prefer {
            Preference::SmallerAngle => left < right,
            Preference::LargerAngle => left > right,
        };

        if left_wins {
            Selection {
                chosen: Side::Left,
                chosen_angle: left,
                other: Side::Right,
                other_angle: right,
            }
        } else {
            Selection {
                chosen: Side::Right,
                chosen_angle: right,
                other: Side::Left,
                other_angle: left,
            }
        }
    }
}

/// What a check measures
#[derive(Debug, Clone)]
pub enum Measure {
    /// Angle at a fixed joint triplet
    Angle(JointTriplet),
    /// Angle of the limb picked by the rule-set's side selector
    Chosen,
    /// Angle of the limb not picked by the side selector
    Opposite,
    /// Absolute vertical distance between two keypoints
    VerticalGap(Landmark, Landmark),
}

impl Measure {
    fn decimals(&self) -> i32 {
        match self {
            Measure::VerticalGap(..) => 3,
            _ => 1,
        }
    }
}

/// Inclusive acceptable interval for a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptableRange {
    pub min: f64,
    pub max: f64,
}

impl AcceptableRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One scoring rule within a rule-set
#[derive(Debug, Clone)]
pub struct Check {
    /// Key under which the measurement is reported
    pub label: String,
    pub measure: Measure,
    pub range: AcceptableRange,
    pub penalty: u8,
    /// Correction message; `{side}` is replaced by the measured side
    pub message: String,
}

impl Check {
    pub fn new(
        label: &str,
        measure: Measure,
        range: AcceptableRange,
        penalty: u8,
        message: &str,
    ) -> Self {
        Self {
            label: label.to_string(),
            measure,
            range,
            penalty,
            message: message.to_string(),
        }
    }
}

/// A named pose definition
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Stable identifier used for hints (e.g. `WideStance`)
    pub key: String,
    /// Display name reported in results (e.g. `Warrior II`)
    pub name: String,
    pub selector: Option<SideSelector>,
    pub checks: Vec<Check>,
    /// Feedback when the score reaches the excellent band
    pub excellent: String,
    /// Feedback in the passing band when no check triggered
    pub hold: String,
}

/// Raw scoring outcome before feedback is phrased
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub score: u8,
    pub triggered: Vec<String>,
    pub details: BTreeMap<String, f64>,
}

impl RuleSet {
    /// Whether `hint` names this rule-set
    pub fn matches(&self, hint: &str) -> bool {
        let wanted = normalize(hint);
        normalize(&self.key) == wanted || normalize(&self.name) == wanted
    }

    /// Score a validated frame against every check
    pub fn evaluate(&self, frame: &Frame<'_>) -> RuleOutcome {
        let selection = self.selector.as_ref().map(|s| s.select(frame));

        let mut score: i32 = 100;
        let mut triggered = Vec::new();
        let mut details = BTreeMap::new();

        for check in &self.checks {
            let (value, side) = match (&check.measure, selection) {
                (Measure::Angle(triplet), _) => (triplet_angle(frame, triplet), None),
                (Measure::Chosen, Some(sel)) => (sel.chosen_angle, Some(sel.chosen)),
                (Measure::Opposite, Some(sel)) => (sel.other_angle, Some(sel.other)),
                (Measure::VerticalGap(a, b), _) => {
                    ((frame.get(*a).y - frame.get(*b).y).abs(), None)
                }
                (Measure::Chosen | Measure::Opposite, None) => {
                    tracing::debug!(
                        "Rule-set {} has side-relative check '{}' but no selector",
                        self.key,
                        check.label
                    );
                    continue;
                }
            };

            details.insert(check.label.clone(), round_to(value, check.measure.decimals()));

            if !check.range.contains(value) {
                score -= i32::from(check.penalty);
                let message = match side {
                    Some(side) => check.message.replace("{side}", side.label()),
                    None => check.message.clone(),
                };
                triggered.push(message);
            }
        }

        RuleOutcome {
            score: score.clamp(0, 100) as u8,
            triggered,
            details,
        }
    }
}

fn triplet_angle(frame: &Frame<'_>, triplet: &JointTriplet) -> f64 {
    angle_between(frame.get(triplet[0]), frame.get(triplet[1]), frame.get(triplet[2]))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

const LEFT_ARM: JointTriplet = [Landmark::LeftShoulder, Landmark::LeftElbow, Landmark::LeftWrist];
const RIGHT_ARM: JointTriplet =
    [Landmark::RightShoulder, Landmark::RightElbow, Landmark::RightWrist];
const LEFT_LEG: JointTriplet = [Landmark::LeftHip, Landmark::LeftKnee, Landmark::LeftAnkle];
const RIGHT_LEG: JointTriplet = [Landmark::RightHip, Landmark::RightKnee, Landmark::RightAnkle];
const LEFT_TORSO: JointTriplet = [Landmark::LeftShoulder, Landmark::LeftHip, Landmark::LeftKnee];

const STRAIGHT: AcceptableRange = AcceptableRange::new(160.0, 180.0);

/// Wide stance with arms extended and the front knee bent to a right angle
pub fn wide_stance() -> RuleSet {
    let arm = AcceptableRange::new(170.0, 180.0);
    RuleSet {
        key: "WideStance".into(),
        name: "Warrior II".into(),
        selector: Some(SideSelector {
            left: LEFT_LEG,
            right: RIGHT_LEG,
            prefer: Preference::SmallerAngle,
        }),
        checks: vec![
            Check::new(
                "left_arm_angle",
                Measure::Angle(LEFT_ARM),
                arm,
                15,
                "Straighten your left arm",
            ),
            Check::new(
                "right_arm_angle",
                Measure::Angle(RIGHT_ARM),
                arm,
                15,
                "Straighten your right arm",
            ),
            Check::new(
                "front_knee_angle",
                Measure::Chosen,
                AcceptableRange::new(80.0, 110.0),
                20,
                "Bend your front ({side}) knee to 90 degrees",
            ),
            Check::new(
                "back_knee_angle",
                Measure::Opposite,
                STRAIGHT,
                15,
                "Keep your back ({side}) leg straight",
            ),
        ],
        excellent: "Perfect Warrior II! Your form is excellent.".into(),
        hold: "Hold this pose.".into(),
    }
}

/// Balance on one straight leg with the other leg bent
pub fn single_leg_balance() -> RuleSet {
    RuleSet {
        key: "SingleLegBalance".into(),
        name: "Tree Pose".into(),
        selector: Some(SideSelector {
            left: LEFT_LEG,
            right: RIGHT_LEG,
            prefer: Preference::LargerAngle,
        }),
        checks: vec![
            Check::new(
                "support_knee_angle",
                Measure::Chosen,
                STRAIGHT,
                20,
                "Straighten your supporting ({side}) leg",
            ),
            Check::new(
                "bent_knee_angle",
                Measure::Opposite,
                AcceptableRange::new(30.0, 90.0),
                25,
                "Adjust the angle of your bent ({side}) leg",
            ),
            Check::new(
                "wrist_height_diff",
                Measure::VerticalGap(Landmark::LeftWrist, Landmark::RightWrist),
                AcceptableRange::new(0.0, 0.1),
                15,
                "Keep your balance with both hands at the same height",
            ),
        ],
        excellent: "Perfect Tree Pose! Your balance is excellent.".into(),
        hold: "Keep your balance.".into(),
    }
}

/// Inverted V with straight arms and legs
pub fn inverted_v() -> RuleSet {
    RuleSet {
        key: "InvertedV".into(),
        name: "Downward Dog".into(),
        selector: None,
        checks: vec![
            Check::new(
                "body_angle",
                Measure::Angle(LEFT_TORSO),
                AcceptableRange::new(30.0, 80.0),
                25,
                "Lift your hips to form an inverted V",
            ),
            Check::new(
                "left_leg_angle",
                Measure::Angle(LEFT_LEG),
                STRAIGHT,
                15,
                "Straighten your left leg",
            ),
            Check::new(
                "right_leg_angle",
                Measure::Angle(RIGHT_LEG),
                STRAIGHT,
                15,
                "Straighten your right leg",
            ),
            Check::new(
                "left_arm_angle",
                Measure::Angle(LEFT_ARM),
                STRAIGHT,
                15,
                "Straighten your left arm",
            ),
            Check::new(
                "right_arm_angle",
                Measure::Angle(RIGHT_ARM),
                STRAIGHT,
                15,
                "Straighten your right arm",
            ),
        ],
        excellent: "Perfect Downward Dog! Your form is excellent.".into(),
        hold: "Hold this pose.".into(),
    }
}

/// The built-in rule-sets, in evaluation (and tie-break) order
pub fn base_rule_sets() -> Vec<RuleSet> {
    vec![wide_stance(), single_leg_balance(), inverted_v()]
}
