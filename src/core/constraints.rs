use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::rigidbody::RigidBody;
use super::types::Axis;
use crate::utils::allocator::BodyHandle;

/// Stable identifier of a constraint registered with a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub u64);

/// Expresses a world-space point in the body's local frame.
pub fn local_anchor(body: &RigidBody, world_point: Vec3) -> Vec3 {
    body.orientation.inverse() * (world_point - body.position)
}

/// World-space position of a body-local anchor.
pub fn world_anchor(body: &RigidBody, local: Vec3) -> Vec3 {
    body.position + body.orientation * local
}

/// Rigid rod between two body-local anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    pub rest_length: f32,
    #[serde(skip)]
    pub(crate) bias: f32,
}

impl DistanceConstraint {
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        local_anchor_a: Vec3,
        local_anchor_b: Vec3,
        rest_length: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            rest_length: rest_length.max(0.0),
            bias: 0.0,
        }
    }

    /// Anchors given in world space; the rest length is their current distance.
    pub fn from_world_anchors(
        (handle_a, a): (BodyHandle, &RigidBody),
        (handle_b, b): (BodyHandle, &RigidBody),
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Self {
        Self::new(
            handle_a,
            handle_b,
            local_anchor(a, anchor_a),
            local_anchor(b, anchor_b),
            anchor_a.distance(anchor_b),
        )
    }

    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length.max(0.0);
        self
    }
}

/// Soft distance link driven by the Baumgarte bias.
///
/// `stiffness` scales the bias, `damping` is the fraction of relative anchor
/// speed removed per substep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpringConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
    #[serde(skip)]
    pub(crate) bias: f32,
}

impl SpringConstraint {
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        local_anchor_a: Vec3,
        local_anchor_b: Vec3,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    ) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            rest_length: rest_length.max(0.0),
            stiffness: stiffness.max(0.0),
            damping: damping.clamp(0.0, 1.0),
            bias: 0.0,
        }
    }

    pub fn from_world_anchors(
        (handle_a, a): (BodyHandle, &RigidBody),
        (handle_b, b): (BodyHandle, &RigidBody),
        anchor_a: Vec3,
        anchor_b: Vec3,
        stiffness: f32,
        damping: f32,
    ) -> Self {
        Self::new(
            handle_a,
            handle_b,
            local_anchor(a, anchor_a),
            local_anchor(b, anchor_b),
            anchor_a.distance(anchor_b),
            stiffness,
            damping,
        )
    }

    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length.max(0.0);
        self
    }
}

/// Rigid attachment: a shared anchor point plus a fixed orientation offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeldConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec3,
    pub local_anchor_b: Vec3,
    /// Orientation of B relative to A: `q_a^-1 * q_b` at creation.
    pub orientation_offset: Quat,
    #[serde(skip)]
    pub(crate) linear_bias: Vec3,
    #[serde(skip)]
    pub(crate) angular_bias: Vec3,
}

impl WeldConstraint {
    /// Welds the bodies in their current relative pose around `anchor`.
    pub fn from_world_anchor(
        (handle_a, a): (BodyHandle, &RigidBody),
        (handle_b, b): (BodyHandle, &RigidBody),
        anchor: Vec3,
    ) -> Self {
        Self {
            body_a: handle_a,
            body_b: handle_b,
            local_anchor_a: local_anchor(a, anchor),
            local_anchor_b: local_anchor(b, anchor),
            orientation_offset: (a.orientation.inverse() * b.orientation).normalize(),
            linear_bias: Vec3::ZERO,
            angular_bias: Vec3::ZERO,
        }
    }

    /// Welds about the midpoint of the two body origins.
    pub fn from_current_pose(a: (BodyHandle, &RigidBody), b: (BodyHandle, &RigidBody)) -> Self {
        let anchor = (a.1.position + b.1.position) * 0.5;
        Self::from_world_anchor(a, b, anchor)
    }
}

/// Set of world axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    pub const NONE: AxisMask = AxisMask { x: false, y: false, z: false };
    pub const ALL: AxisMask = AxisMask { x: true, y: true, z: true };

    pub fn only(axis: Axis) -> Self {
        let mut mask = Self::NONE;
        mask.set(axis, true);
        mask
    }

    pub fn set(&mut self, axis: Axis, locked: bool) {
        match axis {
            Axis::X => self.x = locked,
            Axis::Y => self.y = locked,
            Axis::Z => self.z = locked,
        }
    }

    pub fn contains(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.x || self.y || self.z)
    }

    /// Zeroes the masked components of `v`.
    pub fn remove_from(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            if self.x { 0.0 } else { v.x },
            if self.y { 0.0 } else { v.y },
            if self.z { 0.0 } else { v.z },
        )
    }
}

/// Removes one body's motion along selected world axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisConstraint {
    pub body: BodyHandle,
    pub linear: AxisMask,
    pub angular: AxisMask,
}

impl AxisConstraint {
    pub fn new(body: BodyHandle, linear: AxisMask, angular: AxisMask) -> Self {
        Self {
            body,
            linear,
            angular,
        }
    }

    /// Keeps a body in the plane normal to `axis` without tipping out of it.
    pub fn planar(body: BodyHandle, axis: Axis) -> Self {
        let mut angular = AxisMask::ALL;
        angular.set(axis, false);
        Self::new(body, AxisMask::only(axis), angular)
    }
}

/// Closed set of constraints the solver understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Distance(DistanceConstraint),
    Spring(SpringConstraint),
    Weld(WeldConstraint),
    Axis(AxisConstraint),
}

impl Constraint {
    /// Bodies referenced by the constraint; single-body constraints return `None` second.
    pub fn bodies(&self) -> (BodyHandle, Option<BodyHandle>) {
        match self {
            Constraint::Distance(c) => (c.body_a, Some(c.body_b)),
            Constraint::Spring(c) => (c.body_a, Some(c.body_b)),
            Constraint::Weld(c) => (c.body_a, Some(c.body_b)),
            Constraint::Axis(c) => (c.body, None),
        }
    }

    pub fn involves(&self, body: BodyHandle) -> bool {
        let (a, b) = self.bodies();
        a == body || b == Some(body)
    }

    /// World-space anchor points for debug drawing.
    pub fn anchors(&self, a: &RigidBody, b: Option<&RigidBody>) -> Option<(Vec3, Vec3)> {
        let (la, lb) = match self {
            Constraint::Distance(c) => (c.local_anchor_a, c.local_anchor_b),
            Constraint::Spring(c) => (c.local_anchor_a, c.local_anchor_b),
            Constraint::Weld(c) => (c.local_anchor_a, c.local_anchor_b),
            Constraint::Axis(_) => return None,
        };
        let b = b?;
        Some((world_anchor(a, la), world_anchor(b, lb)))
    }
}

impl From<DistanceConstraint> for Constraint {
    fn from(c: DistanceConstraint) -> Self {
        Constraint::Distance(c)
    }
}

impl From<SpringConstraint> for Constraint {
    fn from(c: SpringConstraint) -> Self {
        Constraint::Spring(c)
    }
}

impl From<WeldConstraint> for Constraint {
    fn from(c: WeldConstraint) -> Self {
        Constraint::Weld(c)
    }
}

impl From<AxisConstraint> for Constraint {
    fn from(c: AxisConstraint) -> Self {
        Constraint::Axis(c)
    }
}
