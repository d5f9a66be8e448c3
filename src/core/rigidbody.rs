use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::shape::{CollisionShape, ShapeKind};
use super::types::{Aabb, Transform, Velocity};
use crate::config::{
    IntegrationType, DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING,
    DEFAULT_REST_VELOCITY_THRESHOLD_SQUARED,
};
use crate::dynamics::integrator;

/// Rigid body state integrated by the physics world.
///
/// An inverse mass of zero marks the body as static: it is never integrated
/// and ignores forces and impulses.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Velocity,
    /// Force accumulated for the next substep, cleared after integration.
    pub force: Vec3,
    /// Torque accumulated for the next substep, cleared after integration.
    pub torque: Vec3,
    pub elasticity: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub(crate) inverse_mass: f32,
    pub(crate) inverse_inertia: Mat3,
    pub(crate) shape: Option<CollisionShape>,
    pub(crate) is_at_rest: bool,
    pub(crate) rest_threshold_sq: f32,
    pub(crate) average_summed_velocity: f32,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            velocity: Velocity::default(),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            elasticity: 0.9,
            friction: 0.5,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            inverse_mass: 1.0,
            inverse_inertia: Mat3::ZERO,
            shape: None,
            is_at_rest: false,
            rest_threshold_sq: DEFAULT_REST_VELOCITY_THRESHOLD_SQUARED,
            average_summed_velocity: 0.0,
        }
    }
}

impl RigidBody {
    /// Dynamic body of unit mass at the origin without a collision shape.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RigidBodyBuilder {
        RigidBodyBuilder::new()
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn mass(&self) -> f32 {
        if self.inverse_mass > 0.0 {
            1.0 / self.inverse_mass
        } else {
            f32::INFINITY
        }
    }

    /// Sets the inverse mass and rebuilds the inverse inertia from the shape.
    ///
    /// Negative or non-finite values are treated as static.
    pub fn set_inverse_mass(&mut self, inverse_mass: f32) {
        self.inverse_mass = if inverse_mass.is_finite() && inverse_mass > 0.0 {
            inverse_mass
        } else {
            0.0
        };
        if self.is_static() {
            self.velocity = Velocity::default();
        }
        self.rebuild_inertia();
    }

    pub fn set_mass(&mut self, mass: f32) {
        if mass.is_finite() && mass > 0.0 {
            self.set_inverse_mass(1.0 / mass);
        } else {
            self.set_inverse_mass(0.0);
        }
    }

    pub fn is_static(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Local-space inverse inertia tensor.
    pub fn inverse_inertia(&self) -> Mat3 {
        self.inverse_inertia
    }

    /// Inverse inertia rotated into world space: `R * I^-1 * R^T`.
    pub fn world_inverse_inertia(&self) -> Mat3 {
        let rotation = Mat3::from_quat(self.orientation);
        rotation * self.inverse_inertia * rotation.transpose()
    }

    pub fn shape(&self) -> Option<&CollisionShape> {
        self.shape.as_ref()
    }

    pub fn set_shape(&mut self, shape: CollisionShape) {
        self.shape = Some(shape);
        self.rebuild_inertia();
    }

    pub fn clear_shape(&mut self) {
        self.shape = None;
        self.rebuild_inertia();
    }

    /// Replaces the shape with one built from `kind` and `half_extents`.
    ///
    /// Kinds that need more than dimensions leave the body shapeless; the
    /// broadphase then skips it.
    pub fn set_shape_kind(&mut self, kind: ShapeKind, half_extents: Vec3) {
        match CollisionShape::from_kind(kind, half_extents) {
            Ok(shape) => self.set_shape(shape),
            Err(err) => {
                log::error!("{err}; body left without a collision shape");
                self.clear_shape();
            }
        }
    }

    fn rebuild_inertia(&mut self) {
        self.inverse_inertia = match &self.shape {
            Some(shape) => shape.build_inverse_inertia(self.inverse_mass),
            None => Mat3::ZERO,
        };
    }

    pub fn transform(&self) -> Transform {
        Transform::from_position_rotation(self.position, self.orientation)
    }

    /// Teleports the body. Velocities are kept.
    pub fn set_transform(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation.normalize();
        self.wake_up();
    }

    pub fn linear_velocity(&self) -> Vec3 {
        self.velocity.linear
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.velocity.angular
    }

    pub fn set_linear_velocity(&mut self, linear: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear = linear;
        self.wake_up();
    }

    pub fn set_angular_velocity(&mut self, angular: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.angular = angular;
        self.wake_up();
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_static() {
            return;
        }
        self.force += force;
        self.wake_up();
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_static() {
            return;
        }
        self.torque += torque;
        self.wake_up();
    }

    /// Applies an impulse at a world-space point.
    pub fn apply_impulse(&mut self, impulse: Vec3, point: Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
        let arm = point - self.position;
        self.velocity.angular += self.world_inverse_inertia() * arm.cross(impulse);
        self.wake_up();
    }

    pub fn is_at_rest(&self) -> bool {
        self.is_at_rest
    }

    pub fn wake_up(&mut self) {
        self.is_at_rest = false;
    }

    /// Puts the body to sleep immediately.
    pub fn put_to_rest(&mut self) {
        if self.is_static() {
            return;
        }
        self.is_at_rest = true;
        self.average_summed_velocity = 0.0;
    }

    pub fn rest_velocity_threshold_squared(&self) -> f32 {
        self.rest_threshold_sq
    }

    /// Zero or a negative value disables the rest test for this body.
    pub fn set_rest_velocity_threshold_squared(&mut self, threshold: f32) {
        self.rest_threshold_sq = threshold;
        if threshold <= 0.0 {
            self.is_at_rest = false;
        }
    }

    /// Updates the moving average of squared speeds and the rest flag.
    pub(crate) fn rest_test(&mut self) {
        const ALPHA: f32 = 0.7;

        if self.rest_threshold_sq <= 0.0 {
            return;
        }
        let summed = self.velocity.linear.length_squared() + self.velocity.angular.length_squared();
        self.average_summed_velocity += ALPHA * (summed - self.average_summed_velocity);
        self.is_at_rest = self.average_summed_velocity <= self.rest_threshold_sq;
    }

    /// Advances the body by `dt` with semi-implicit Euler and no external field.
    pub fn step(&mut self, dt: f32) {
        integrator::integrate_body(self, dt, Vec3::ZERO, IntegrationType::SemiImplicitEuler);
    }

    /// World-space bounds, or `None` without a shape.
    pub fn world_space_aabb(&self) -> Option<Aabb> {
        self.shape
            .as_ref()
            .map(|shape| shape.world_space_aabb(self.position, self.orientation))
    }
}

/// Serializable description of a body, used to spawn it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBodyProperties {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Zero makes the body static.
    pub inverse_mass: f32,
    pub elasticity: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub rest_velocity_threshold_squared: f32,
    pub shape: Option<CollisionShape>,
}

impl Default for RigidBodyProperties {
    fn default() -> Self {
        let body = RigidBody::default();
        Self {
            position: body.position,
            orientation: body.orientation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inverse_mass: body.inverse_mass,
            elasticity: body.elasticity,
            friction: body.friction,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            rest_velocity_threshold_squared: body.rest_threshold_sq,
            shape: None,
        }
    }
}

impl From<RigidBodyProperties> for RigidBody {
    fn from(props: RigidBodyProperties) -> Self {
        let mut body = RigidBody {
            position: props.position,
            orientation: props.orientation.normalize(),
            velocity: Velocity {
                linear: props.linear_velocity,
                angular: props.angular_velocity,
            },
            elasticity: props.elasticity,
            friction: props.friction,
            linear_damping: props.linear_damping,
            angular_damping: props.angular_damping,
            rest_threshold_sq: props.rest_velocity_threshold_squared,
            shape: props.shape,
            ..RigidBody::default()
        };
        body.set_inverse_mass(props.inverse_mass);
        body
    }
}

pub struct RigidBodyBuilder {
    props: RigidBodyProperties,
}

impl Default for RigidBodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBodyBuilder {
    pub fn new() -> Self {
        Self {
            props: RigidBodyProperties::default(),
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.props.position = position;
        self
    }

    pub fn orientation(mut self, orientation: Quat) -> Self {
        self.props.orientation = orientation;
        self
    }

    pub fn linear_velocity(mut self, velocity: Vec3) -> Self {
        self.props.linear_velocity = velocity;
        self
    }

    pub fn angular_velocity(mut self, velocity: Vec3) -> Self {
        self.props.angular_velocity = velocity;
        self
    }

    pub fn inverse_mass(mut self, inverse_mass: f32) -> Self {
        self.props.inverse_mass = inverse_mass;
        self
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.props.inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        self
    }

    pub fn static_body(mut self) -> Self {
        self.props.inverse_mass = 0.0;
        self
    }

    pub fn elasticity(mut self, elasticity: f32) -> Self {
        self.props.elasticity = elasticity;
        self
    }

    pub fn friction(mut self, friction: f32) -> Self {
        self.props.friction = friction;
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.props.linear_damping = linear;
        self.props.angular_damping = angular;
        self
    }

    pub fn rest_velocity_threshold_squared(mut self, threshold: f32) -> Self {
        self.props.rest_velocity_threshold_squared = threshold;
        self
    }

    pub fn shape(mut self, shape: CollisionShape) -> Self {
        self.props.shape = Some(shape);
        self
    }

    pub fn sphere(self, radius: f32) -> Self {
        self.shape(CollisionShape::sphere(radius))
    }

    pub fn cuboid(self, half_extents: Vec3) -> Self {
        self.shape(CollisionShape::cuboid(half_extents))
    }

    pub fn capsule(self, radius: f32, half_height: f32) -> Self {
        self.shape(CollisionShape::capsule(radius, half_height))
    }

    pub fn build(self) -> RigidBody {
        RigidBody::from(self.props)
    }
}
