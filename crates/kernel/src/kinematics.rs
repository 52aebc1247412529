//! Closed-form inverse kinematics for a planar two-link arm.
//!
//! The arm moves in the plane parallel to the wall, so points are `[x, z]`
//! pairs in wall coordinates. Angles are reported in degrees, measured
//! counter-clockwise from `+x`. The elbow angle is relative to link 1
//! (child-frame convention), which is what a joint hierarchy consumes.

use serde::{Deserialize, Serialize};

/// Distance kept between a clamped target and the reach boundary (meters).
pub const REACH_EPSILON: f32 = 1.0e-4;

/// Which of the two mirror-image solutions to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElbowBranch {
    /// Elbow on the counter-clockwise side of the base-to-target line.
    #[default]
    Up,
    /// Elbow on the clockwise side of the base-to-target line.
    Down,
}

/// Joint angles for one step plus the points they place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPose {
    /// Shoulder rotation (degrees, world frame)
    pub shoulder_deg: f32,
    /// Elbow rotation relative to link 1 (degrees, in (-180, 180])
    pub elbow_deg: f32,
    /// Elbow joint position `[x, z]`
    pub elbow: [f32; 2],
    /// Tool point `[x, z]`; equals the target unless it was clamped
    pub tool: [f32; 2],
    /// Whether the target was moved onto the reachable annulus
    pub clamped: bool,
}

/// Two-link planar arm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoLinkArm {
    /// Shoulder position `[x, z]`
    pub base: [f32; 2],
    /// Upper arm length
    pub l1: f32,
    /// Forearm length
    pub l2: f32,
    /// Solution branch
    pub branch: ElbowBranch,
}

impl TwoLinkArm {
    /// Create an arm rooted at `base` with the given link lengths.
    pub fn new(base: [f32; 2], l1: f32, l2: f32, branch: ElbowBranch) -> Self {
        Self { base, l1, l2, branch }
    }

    /// Outer reach radius, `L1 + L2`.
    pub fn reach(&self) -> f32 {
        self.l1 + self.l2
    }

    /// Inner dead-zone radius, `|L1 - L2|`.
    pub fn inner_reach(&self) -> f32 {
        (self.l1 - self.l2).abs()
    }

    /// Solve for the pose that places the tool at `target`.
    ///
    /// Never fails: targets outside the reachable annulus are scaled along
    /// the base-to-target ray onto its boundary (less [`REACH_EPSILON`]) and
    /// the returned pose reports `clamped = true`.
    pub fn solve(&self, target: [f32; 2]) -> JointPose {
        let mut dx = target[0] - self.base[0];
        let mut dz = target[1] - self.base[1];
        let mut d = (dx * dx + dz * dz).sqrt();
        let mut clamped = false;

        let outer = (self.reach() - REACH_EPSILON).max(0.0);
        let inner = (self.inner_reach() + REACH_EPSILON).min(outer);

        if d < 1.0e-9 {
            // Direction is undefined; reach out along +x.
            dx = 1.0;
            dz = 0.0;
            d = 1.0;
            if inner > 0.0 {
                dx = inner;
                d = inner;
                clamped = true;
            }
        }

        if d > outer {
            let s = outer / d;
            dx *= s;
            dz *= s;
            d = outer;
            clamped = true;
        } else if d < inner {
            let s = inner / d;
            dx *= s;
            dz *= s;
            d = inner;
            clamped = true;
        }

        if clamped {
            tracing::debug!(
                "IK target ({:.4}, {:.4}) clamped to ({:.4}, {:.4})",
                target[0],
                target[1],
                self.base[0] + dx,
                self.base[1] + dz,
            );
        }

        // Law of cosines for the elbow included angle
        let cos_q2 = ((d * d - self.l1 * self.l1 - self.l2 * self.l2)
            / (2.0 * self.l1 * self.l2))
            .clamp(-1.0, 1.0);
        let q2_mag = cos_q2.acos();
        let q2 = match self.branch {
            ElbowBranch::Down => q2_mag,
            ElbowBranch::Up => -q2_mag,
        };

        let q1 = dz.atan2(dx) - (self.l2 * q2.sin()).atan2(self.l1 + self.l2 * q2.cos());

        let elbow = [
            self.base[0] + self.l1 * q1.cos(),
            self.base[1] + self.l1 * q1.sin(),
        ];
        let tool = [self.base[0] + dx, self.base[1] + dz];

        // Relative elbow rotation from the world-facing angle of link 2
        let link2_world = (tool[1] - elbow[1]).atan2(tool[0] - elbow[0]);
        let elbow_rel = wrap_degrees((link2_world - q1).to_degrees());

        JointPose {
            shoulder_deg: q1.to_degrees(),
            elbow_deg: elbow_rel,
            elbow,
            tool,
            clamped,
        }
    }

    /// Elbow and tool points for the given joint angles (degrees).
    pub fn forward(&self, shoulder_deg: f32, elbow_deg: f32) -> ([f32; 2], [f32; 2]) {
        forward_kinematics(shoulder_deg, elbow_deg, self.base, self.l1, self.l2)
    }
}

/// Forward kinematics: returns `(elbow, tool)` for angles in degrees.
pub fn forward_kinematics(
    shoulder_deg: f32,
    elbow_deg: f32,
    base: [f32; 2],
    l1: f32,
    l2: f32,
) -> ([f32; 2], [f32; 2]) {
    let q1 = shoulder_deg.to_radians();
    let q12 = q1 + elbow_deg.to_radians();
    let elbow = [base[0] + l1 * q1.cos(), base[1] + l1 * q1.sin()];
    let tool = [elbow[0] + l2 * q12.cos(), elbow[1] + l2 * q12.sin()];
    (elbow, tool)
}

/// Wrap an angle in degrees to (-180, 180].
fn wrap_degrees(mut a: f32) -> f32 {
    while a <= -180.0 {
        a += 360.0;
    }
    while a > 180.0 {
        a -= 360.0;
    }
    a
}
