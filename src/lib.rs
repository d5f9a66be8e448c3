//! Impulse Physics – real-time rigid-body simulation core.
//!
//! A [`PhysicsWorld`] owns rigid bodies, constraints and one broadphase
//! strategy and advances them with a fixed-timestep accumulator. A
//! [`PhysicsEngine`] runs a world on a dedicated thread and publishes
//! transform snapshots the render thread can read without blocking.

pub mod collision;
pub mod config;
pub mod core;
pub mod debug;
pub mod dynamics;
pub mod error;
pub mod scene;
pub mod simulation;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

pub use collision::broadphase::{
    Broadphase, BroadphaseProxy, BruteForce, CollisionPair, Octree, PairList, SortAndSweep,
};
pub use config::{BroadphaseConfig, IntegrationType, PhysicsConfig, TimestepMode};
pub use crate::core::{
    constraints::{
        AxisConstraint, AxisMask, Constraint, ConstraintId, DistanceConstraint, SpringConstraint,
        WeldConstraint,
    },
    rigidbody::{RigidBody, RigidBodyBuilder, RigidBodyProperties},
    shape::{CollisionShape, ShapeKind},
    types::{Aabb, Axis, Transform, Velocity},
};
pub use debug::{DebugDraw, DebugDrawBuffer, DebugDrawFlags};
pub use dynamics::{integrator::Integrator, solver::ConstraintSolver};
pub use error::PhysicsError;
pub use scene::TransformSink;
pub use simulation::PhysicsEngine;
pub use utils::{
    allocator::{Arena, BodyHandle, Handle},
    profiling::PhysicsStats,
};
pub use world::{BodyTransform, PhysicsWorld, SnapshotReader, TransformSnapshot, WorldState};
