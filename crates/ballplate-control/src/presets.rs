//! Fixed joint poses and the timed waypoint plans built from them.
//!
//! A plan is a list of waypoints; each waypoint is issued as one position
//! command and then held for its dwell time before the next one is due.
//! [`PlanCursor`] walks a plan against an external clock without sleeping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::limits::PlateLimits;

pub const HEAD_JOINTS: usize = 6;
pub const ARM_JOINTS: usize = 16;

/// Arm joint driven by the x (east-west) axis signal.
pub const ARM_JOINT_X: usize = 4;
/// Arm joint driven by the y (south-north) axis signal.
pub const ARM_JOINT_Y: usize = 6;

pub const HEAD_POSE: [f64; HEAD_JOINTS] = [-22.0, -4.0, 0.0, -22.0, 12.0, 0.0];

/// Reference joint speed for presets and after a stop, deg/s.
pub const PRESET_REF_SPEED: f64 = 10.0;
/// Reference joint speed while the control loop runs, deg/s.
pub const CONTROL_REF_SPEED: f64 = 30.0;

const STAGE_DWELL: Duration = Duration::from_secs(1);
const OPEN_DWELL: Duration = Duration::from_millis(500);

// Wrist and hand joints of the closed grip held during control.
const GRIP: [(usize, f64); 7] = [
    (9, 26.0),
    (10, 120.0),
    (11, 73.0),
    (12, 88.0),
    (13, 90.0),
    (14, 90.0),
    (15, 145.0),
];

/// Which actuator a plan drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limb {
    Head,
    RightArm,
}

impl Limb {
    pub fn joint_count(self) -> usize {
        match self {
            Limb::Head => HEAD_JOINTS,
            Limb::RightArm => ARM_JOINTS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Limb::Head => "head",
            Limb::RightArm => "right_arm",
        }
    }
}

/// Named joint presets reachable through `init`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Head,
    RightArm,
    HandClose1,
    HandClose2,
    HandClose3,
    HandOpen,
}

impl Preset {
    pub fn name(self) -> &'static str {
        match self {
            Preset::Head => "head",
            Preset::RightArm => "right_arm",
            Preset::HandClose1 => "hand_close1",
            Preset::HandClose2 => "hand_close2",
            Preset::HandClose3 => "hand_close3",
            Preset::HandOpen => "hand_open",
        }
    }

    pub fn limb(self) -> Limb {
        match self {
            Preset::Head => Limb::Head,
            _ => Limb::RightArm,
        }
    }
}

/// One position command followed by a dwell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub setpoints: Vec<f64>,
    pub dwell: Duration,
}

/// A timed sequence of position commands for one limb.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionPlan {
    pub preset: Preset,
    pub limb: Limb,
    /// Reference speed applied to every joint before the first waypoint.
    pub ref_speed: Option<f64>,
    pub waypoints: Vec<Waypoint>,
}

impl MotionPlan {
    /// Total time from the first command until the plan completes.
    pub fn duration(&self) -> Duration {
        self.waypoints.iter().map(|w| w.dwell).sum()
    }
}

/// Open hand, arm holding the plate at the current offsets.
pub fn arm_rest_pose(limits: &PlateLimits) -> [f64; ARM_JOINTS] {
    [
        -55.0,
        8.0,
        -20.0,
        40.0,
        limits.x.offset,
        -5.0,
        limits.y.offset,
        0.0,
        64.0,
        11.0,
        0.0,
        8.0,
        11.0,
        7.0,
        0.0,
        7.0,
    ]
}

/// Closed grip with the two axis signals on the tilt joints.
pub fn control_pose(x_signal: f64, y_signal: f64) -> [f64; ARM_JOINTS] {
    let mut pose = [
        -55.0, 8.0, -20.0, 40.0, 0.0, -5.0, 0.0, 0.0, 64.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ];
    for (j, v) in GRIP {
        pose[j] = v;
    }
    pose[ARM_JOINT_X] = x_signal;
    pose[ARM_JOINT_Y] = y_signal;
    pose
}

fn with(mut pose: [f64; ARM_JOINTS], joints: &[(usize, f64)]) -> [f64; ARM_JOINTS] {
    for &(j, v) in joints {
        pose[j] = v;
    }
    pose
}

fn waypoint(pose: &[f64], dwell: Duration) -> Waypoint {
    Waypoint {
        setpoints: pose.to_vec(),
        dwell,
    }
}

/// Build the plan for `preset`, using `limits` for the tilt joint offsets.
pub fn preset_plan(preset: Preset, limits: &PlateLimits) -> MotionPlan {
    let rest = arm_rest_pose(limits);
    let (ref_speed, waypoints) = match preset {
        Preset::Head => (None, vec![waypoint(&HEAD_POSE, Duration::ZERO)]),
        Preset::RightArm => (Some(PRESET_REF_SPEED), vec![waypoint(&rest, Duration::ZERO)]),
        Preset::HandClose1 => {
            let thumb_prox = with(rest, &[(9, 26.0)]);
            let thumb_dist = with(thumb_prox, &[(10, 120.0)]);
            (
                Some(PRESET_REF_SPEED),
                vec![
                    waypoint(&rest, STAGE_DWELL),
                    waypoint(&thumb_prox, STAGE_DWELL),
                    waypoint(&thumb_dist, Duration::ZERO),
                ],
            )
        }
        Preset::HandClose2 => {
            let base = with(rest, &GRIP[..2]);
            let proximal = with(base, &[(11, 73.0), (13, 90.0)]);
            let distal = with(proximal, &[(12, 88.0), (14, 90.0)]);
            (
                Some(PRESET_REF_SPEED),
                vec![
                    waypoint(&base, STAGE_DWELL),
                    waypoint(&proximal, STAGE_DWELL),
                    waypoint(&distal, Duration::ZERO),
                ],
            )
        }
        Preset::HandClose3 => {
            let base = with(rest, &GRIP[..6]);
            let full = with(base, &GRIP[6..]);
            (
                Some(PRESET_REF_SPEED),
                vec![
                    waypoint(&base, STAGE_DWELL),
                    waypoint(&full, STAGE_DWELL),
                ],
            )
        }
        Preset::HandOpen => {
            let open = with(rest, &[(3, 28.0)]);
            (Some(PRESET_REF_SPEED), vec![waypoint(&open, OPEN_DWELL)])
        }
    };
    MotionPlan {
        preset,
        limb: preset.limb(),
        ref_speed,
        waypoints,
    }
}

/// Progress through a [`MotionPlan`] against an external clock.
#[derive(Clone, Debug)]
pub struct PlanCursor {
    plan: MotionPlan,
    next: usize,
    hold_until: Option<Duration>,
}

impl PlanCursor {
    pub fn new(plan: MotionPlan) -> Self {
        Self {
            plan,
            next: 0,
            hold_until: None,
        }
    }

    pub fn plan(&self) -> &MotionPlan {
        &self.plan
    }

    /// `true` before the first waypoint has been issued.
    pub fn is_pending(&self) -> bool {
        self.next == 0
    }

    /// Return the next waypoint if it is due at `now`.
    ///
    /// At most one waypoint is released per call.
    pub fn poll(&mut self, now: Duration) -> Option<&Waypoint> {
        if self.next >= self.plan.waypoints.len() {
            return None;
        }
        if self.hold_until.is_some_and(|t| now < t) {
            return None;
        }
        let wp = &self.plan.waypoints[self.next];
        self.hold_until = Some(now + wp.dwell);
        self.next += 1;
        Some(wp)
    }

    /// `true` once every waypoint was issued and the last dwell elapsed.
    pub fn is_finished(&self, now: Duration) -> bool {
        self.next >= self.plan.waypoints.len() && self.hold_until.is_none_or(|t| now >= t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_pose_matches_held_grip() {
        let pose = control_pose(1.5, -2.5);
        assert_eq!(
            pose,
            [
                -55.0, 8.0, -20.0, 40.0, 1.5, -5.0, -2.5, 0.0, 64.0, 26.0, 120.0, 73.0, 88.0,
                90.0, 90.0, 145.0
            ]
        );
    }

    #[test]
    fn rest_pose_uses_offsets() {
        let limits = PlateLimits::default();
        let pose = arm_rest_pose(&limits);
        assert_eq!(pose[ARM_JOINT_X], 4.0);
        assert_eq!(pose[ARM_JOINT_Y], -12.0);
        assert_eq!(pose[15], 7.0);
    }

    #[test]
    fn hand_close_stages_build_up_the_grip() {
        let limits = PlateLimits::default();
        let c1 = preset_plan(Preset::HandClose1, &limits);
        let c2 = preset_plan(Preset::HandClose2, &limits);
        let c3 = preset_plan(Preset::HandClose3, &limits);

        assert_eq!(c1.waypoints.len(), 3);
        assert_eq!(c1.waypoints[1].setpoints[9], 26.0);
        assert_eq!(c1.waypoints[2].setpoints[10], 120.0);
        assert_eq!(c1.duration(), Duration::from_secs(2));

        assert_eq!(c2.waypoints[0].setpoints[9..11], [26.0, 120.0]);
        assert_eq!(c2.waypoints[1].setpoints[11], 73.0);
        assert_eq!(c2.waypoints[1].setpoints[13], 90.0);
        assert_eq!(c2.waypoints[2].setpoints[12], 88.0);
        assert_eq!(c2.waypoints[2].setpoints[14], 90.0);

        assert_eq!(c3.waypoints[0].setpoints[15], 7.0);
        let last = &c3.waypoints[1].setpoints;
        assert_eq!(last[..], control_pose(4.0, -12.0)[..]);
        assert_eq!(c3.duration(), Duration::from_secs(2));
    }

    #[test]
    fn hand_open_lowers_joint_three() {
        let plan = preset_plan(Preset::HandOpen, &PlateLimits::default());
        assert_eq!(plan.waypoints.len(), 1);
        assert_eq!(plan.waypoints[0].setpoints[3], 28.0);
        assert_eq!(plan.waypoints[0].dwell, Duration::from_millis(500));
    }

    #[test]
    fn right_arm_plan_completes_on_issue() {
        let plan = preset_plan(Preset::RightArm, &PlateLimits::default());
        assert_eq!(plan.waypoints.len(), 1);
        assert_eq!(plan.duration(), Duration::ZERO);
        let mut cursor = PlanCursor::new(plan);
        assert!(cursor.poll(Duration::from_millis(5)).is_some());
        assert!(cursor.is_finished(Duration::from_millis(5)));
    }

    #[test]
    fn head_plan_is_single_immediate_move() {
        let plan = preset_plan(Preset::Head, &PlateLimits::default());
        assert_eq!(plan.limb, Limb::Head);
        assert_eq!(plan.ref_speed, None);
        assert_eq!(plan.waypoints[0].setpoints, HEAD_POSE.to_vec());
    }

    #[test]
    fn cursor_releases_one_waypoint_per_dwell() {
        let plan = preset_plan(Preset::HandClose1, &PlateLimits::default());
        let mut cursor = PlanCursor::new(plan);
        let ms = Duration::from_millis;

        assert!(cursor.is_pending());
        assert!(cursor.poll(ms(0)).is_some());
        assert!(cursor.poll(ms(5)).is_none());
        assert!(cursor.poll(ms(999)).is_none());
        assert_eq!(cursor.poll(ms(1000)).map(|w| w.setpoints[9]), Some(26.0));
        assert!(!cursor.is_finished(ms(1500)));
        assert_eq!(cursor.poll(ms(2000)).map(|w| w.setpoints[10]), Some(120.0));
        assert!(cursor.is_finished(ms(2000)));
        assert!(cursor.poll(ms(5000)).is_none());
    }
}
