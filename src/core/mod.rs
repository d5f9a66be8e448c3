//! Core types describing physics bodies, shapes, and constraints.

pub mod constraints;
pub mod rigidbody;
pub mod shape;
pub mod types;

pub use constraints::{
    AxisConstraint, AxisMask, Constraint, ConstraintId, DistanceConstraint, SpringConstraint,
    WeldConstraint,
};
pub use rigidbody::{RigidBody, RigidBodyBuilder, RigidBodyProperties};
pub use shape::{CollisionShape, ShapeKind};
pub use types::{Aabb, Axis, Transform, Velocity};
