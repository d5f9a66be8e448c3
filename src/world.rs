use std::sync::Arc;

use glam::{Quat, Vec3};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{
    collision::broadphase::{Broadphase, BroadphaseProxy, CollisionPair, PairList},
    config::{BroadphaseConfig, PhysicsConfig, TimestepMode},
    core::{
        constraints::{
            AxisConstraint, AxisMask, Constraint, ConstraintId, DistanceConstraint,
            SpringConstraint, WeldConstraint,
        },
        rigidbody::RigidBody,
        types::Transform,
    },
    debug::{
        DebugDraw, DebugDrawFlags, COLOUR_AT_REST, COLOUR_AWAKE, COLOUR_CONSTRAINT, COLOUR_PAIR,
        COLOUR_STATIC, COLOUR_VELOCITY,
    },
    dynamics::{integrator::Integrator, solver::ConstraintSolver},
    error::PhysicsError,
    scene::TransformSink,
    utils::{
        allocator::{Arena, BodyHandle},
        profiling::{PhysicsStats, ScopedTimer},
    },
};

/// Lifecycle of a [`PhysicsWorld`].
///
/// `Uninitialized -> Running <-> Paused -> Released`; released worlds stay
/// released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorldState {
    Uninitialized,
    Running,
    Paused,
    Released,
}

/// Position and orientation of one body at the end of a completed update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTransform {
    pub handle: BodyHandle,
    pub position: Vec3,
    pub orientation: Quat,
}

/// Immutable copy of every body transform after a completed update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    /// Total substeps the world had run when the snapshot was taken.
    pub step_count: u64,
    /// Sorted by handle.
    pub transforms: Vec<BodyTransform>,
}

impl TransformSnapshot {
    pub fn get(&self, handle: BodyHandle) -> Option<&BodyTransform> {
        self.transforms
            .binary_search_by(|entry| entry.handle.cmp(&handle))
            .ok()
            .map(|index| &self.transforms[index])
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn write_to(&self, sink: &mut dyn TransformSink) {
        for entry in &self.transforms {
            sink.set_world_transform(entry.handle, entry.position, entry.orientation);
        }
    }
}

/// Cheap handle for reading the latest published snapshot from any thread.
///
/// Snapshots are published by swapping an `Arc`, so a reader either sees the
/// previous complete update or the next one.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    shared: Arc<RwLock<Arc<TransformSnapshot>>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Arc<TransformSnapshot> {
        Arc::clone(&self.shared.read())
    }
}

/// Central simulation container: bodies, constraints, one broadphase and the
/// fixed-timestep accumulator.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    state: WorldState,
    bodies: Arena<RigidBody>,
    constraints: Vec<(ConstraintId, Constraint)>,
    next_constraint_id: u64,
    broadphase: Broadphase,
    integrator: Integrator,
    solver: ConstraintSolver,
    accumulator: f32,
    proxies: Vec<BroadphaseProxy>,
    pairs: PairList,
    stats: PhysicsStats,
    step_count: u64,
    snapshot: Arc<RwLock<Arc<TransformSnapshot>>>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::from_valid_config(PhysicsConfig::default())
    }
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("state", &self.state)
            .field("bodies", &self.bodies.len())
            .field("constraints", &self.constraints.len())
            .field("broadphase", &self.broadphase.name())
            .field("step_count", &self.step_count)
            .finish()
    }
}

impl PhysicsWorld {
    /// Creates an uninitialised world after validating `config`.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PhysicsConfig) -> Self {
        Self {
            broadphase: Broadphase::from_config(&config.broadphase),
            integrator: Integrator::new(config.integration, config.gravity),
            solver: ConstraintSolver::new(config.solver_iterations, config.baumgarte_scalar),
            config,
            state: WorldState::Uninitialized,
            bodies: Arena::new(),
            constraints: Vec::new(),
            next_constraint_id: 0,
            accumulator: 0.0,
            proxies: Vec::new(),
            pairs: PairList::new(),
            stats: PhysicsStats::default(),
            step_count: 0,
            snapshot: Arc::new(RwLock::new(Arc::new(TransformSnapshot::default()))),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == WorldState::Paused
    }

    fn transition(&mut self, allowed_from: &[WorldState], to: WorldState) -> Result<(), PhysicsError> {
        if !allowed_from.contains(&self.state) {
            return Err(PhysicsError::InvalidStateTransition {
                from: self.state,
                to,
            });
        }
        log::debug!("physics world {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }

    /// Starts the world; it comes up paused when the config asks for it.
    pub fn init(&mut self) -> Result<(), PhysicsError> {
        let target = if self.config.start_paused {
            WorldState::Paused
        } else {
            WorldState::Running
        };
        self.transition(&[WorldState::Uninitialized], target)?;
        self.accumulator = 0.0;
        self.publish_snapshot();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PhysicsError> {
        self.transition(&[WorldState::Running], WorldState::Paused)
    }

    /// Resumes without replaying the time spent paused.
    pub fn resume(&mut self) -> Result<(), PhysicsError> {
        self.transition(&[WorldState::Paused], WorldState::Running)?;
        self.accumulator = 0.0;
        Ok(())
    }

    /// Pause toggle for the engine shell; setting the current value is a no-op.
    pub fn set_paused(&mut self, paused: bool) -> Result<(), PhysicsError> {
        match (self.state, paused) {
            (WorldState::Paused, true) | (WorldState::Running, false) => Ok(()),
            (_, true) => self.pause(),
            (_, false) => self.resume(),
        }
    }

    /// Drops every body and constraint. The world cannot be restarted.
    pub fn release(&mut self) -> Result<(), PhysicsError> {
        self.transition(
            &[WorldState::Running, WorldState::Paused],
            WorldState::Released,
        )?;
        self.bodies.clear();
        self.constraints.clear();
        self.proxies.clear();
        self.pairs.clear();
        self.accumulator = 0.0;
        self.publish_snapshot();
        Ok(())
    }

    /// Advances the simulation by `elapsed` seconds of wall time and returns
    /// the number of substeps run.
    ///
    /// Only a running world moves. In fixed mode at most
    /// `max_updates_per_frame` substeps run; time left over after the cap is
    /// dropped with a warning.
    pub fn update(&mut self, elapsed: f32) -> u32 {
        if self.state != WorldState::Running {
            return 0;
        }
        if !(elapsed.is_finite() && elapsed > 0.0) {
            return 0;
        }

        self.stats.begin_update();
        let mut frame_time = std::time::Duration::ZERO;
        let substeps = {
            let _timer = ScopedTimer::new("physics::update", &mut frame_time);
            match self.config.timestep_mode {
                TimestepMode::Fixed => self.run_fixed_steps(elapsed),
                TimestepMode::Variable => {
                    self.step_once(elapsed);
                    1
                }
            }
        };
        self.stats.total_frame_time = frame_time;
        self.stats.substeps = substeps;
        self.stats.total_substeps += u64::from(substeps);

        if substeps > 0 {
            self.publish_snapshot();
        }
        substeps
    }

    fn run_fixed_steps(&mut self, elapsed: f32) -> u32 {
        let dt = self.config.fixed_timestep;
        let cap = self.config.max_updates_per_frame;
        self.accumulator += elapsed;

        let mut substeps = 0;
        while self.accumulator >= dt && substeps < cap {
            self.step_once(dt);
            self.accumulator -= dt;
            substeps += 1;
        }

        if self.accumulator >= dt {
            log::warn!(
                "physics too slow to run in real time: dropping {:.3}s after {} substeps",
                self.accumulator,
                substeps
            );
            self.stats.dropped_time = self.accumulator;
            self.stats.slow_frames += 1;
            self.accumulator = 0.0;
        }
        substeps
    }

    /// One substep: broadphase, then constraints, then integration.
    fn step_once(&mut self, dt: f32) {
        {
            let _timer = ScopedTimer::new("physics::broadphase", &mut self.stats.broadphase_time);
            self.proxies.clear();
            self.proxies.extend(
                self.bodies
                    .iter()
                    .filter_map(|(handle, body)| BroadphaseProxy::from_body(handle, body)),
            );
            self.broadphase
                .find_potential_collision_pairs_into(&self.proxies, &mut self.pairs);
        }
        {
            let _timer = ScopedTimer::new("physics::solver", &mut self.stats.solver_time);
            self.solver.solve(&mut self.constraints, &mut self.bodies, dt);
        }
        {
            let _timer = ScopedTimer::new("physics::integrator", &mut self.stats.integrator_time);
            self.integrator.step(&mut self.bodies, dt);
        }

        self.step_count += 1;
        self.stats.body_count = self.bodies.len();
        self.stats.pair_count = self.pairs.len();
        self.stats.constraint_count = self.constraints.len();
    }

    fn publish_snapshot(&self) {
        let mut transforms: Vec<BodyTransform> = self
            .bodies
            .iter()
            .map(|(handle, body)| BodyTransform {
                handle,
                position: body.position,
                orientation: body.orientation,
            })
            .collect();
        transforms.sort_by_key(|entry| entry.handle);

        let snapshot = Arc::new(TransformSnapshot {
            step_count: self.step_count,
            transforms,
        });
        *self.snapshot.write() = snapshot;
    }

    /// Reader for the snapshots this world publishes after every update.
    pub fn snapshot_reader(&self) -> SnapshotReader {
        SnapshotReader {
            shared: Arc::clone(&self.snapshot),
        }
    }

    pub fn latest_snapshot(&self) -> Arc<TransformSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Copies the current body transforms into the scene.
    pub fn write_transforms(&self, sink: &mut dyn TransformSink) {
        for (handle, body) in self.bodies.iter() {
            sink.set_world_transform(handle, body.position, body.orientation);
        }
    }

    /// Takes ownership of `body`. A released world refuses it and returns
    /// [`BodyHandle::INVALID`].
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        if self.state == WorldState::Released {
            log::warn!("add_body on a released physics world ignored");
            return BodyHandle::INVALID;
        }
        self.bodies.insert(body)
    }

    /// Removes a body. Constraints that reference it stay registered and are
    /// skipped from then on.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        self.bodies.remove(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Teleports a body and wakes it. Returns `false` for a stale handle.
    pub fn set_body_transform(&mut self, handle: BodyHandle, transform: Transform) -> bool {
        match self.bodies.get_mut(handle) {
            Some(body) => {
                body.set_transform(transform.position, transform.rotation);
                true
            }
            None => false,
        }
    }

    /// Registers a constraint. A released world drops it; the returned id
    /// then never resolves.
    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) -> ConstraintId {
        let id = ConstraintId(self.next_constraint_id);
        self.next_constraint_id += 1;
        if self.state == WorldState::Released {
            log::warn!("add_constraint on a released physics world ignored");
            return id;
        }
        self.constraints.push((id, constraint.into()));
        id
    }

    /// Distance link between two world-space anchors, rest length = current distance.
    pub fn add_distance_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Option<ConstraintId> {
        let constraint = DistanceConstraint::from_world_anchors(
            (a, self.bodies.get(a)?),
            (b, self.bodies.get(b)?),
            anchor_a,
            anchor_b,
        );
        Some(self.add_constraint(constraint))
    }

    pub fn add_spring_constraint(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
        anchor_a: Vec3,
        anchor_b: Vec3,
        stiffness: f32,
        damping: f32,
    ) -> Option<ConstraintId> {
        let constraint = SpringConstraint::from_world_anchors(
            (a, self.bodies.get(a)?),
            (b, self.bodies.get(b)?),
            anchor_a,
            anchor_b,
            stiffness,
            damping,
        );
        Some(self.add_constraint(constraint))
    }

    /// Welds two bodies in their current relative pose.
    pub fn add_weld_constraint(&mut self, a: BodyHandle, b: BodyHandle) -> Option<ConstraintId> {
        let constraint =
            WeldConstraint::from_current_pose((a, self.bodies.get(a)?), (b, self.bodies.get(b)?));
        Some(self.add_constraint(constraint))
    }

    pub fn add_axis_constraint(
        &mut self,
        body: BodyHandle,
        linear: AxisMask,
        angular: AxisMask,
    ) -> Option<ConstraintId> {
        if !self.bodies.contains(body) {
            return None;
        }
        Some(self.add_constraint(AxisConstraint::new(body, linear, angular)))
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let position = self.constraints.iter().position(|(existing, _)| *existing == id)?;
        Some(self.constraints.remove(position).1)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, constraint)| constraint)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> + '_ {
        self.constraints.iter().map(|(id, constraint)| (*id, constraint))
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
        self.integrator.gravity = gravity;
    }

    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.integrator.parallel()
    }

    /// Swaps the broadphase strategy; takes effect on the next substep.
    pub fn set_broadphase(&mut self, config: BroadphaseConfig) -> Result<(), PhysicsError> {
        let candidate = PhysicsConfig {
            broadphase: config,
            ..self.config.clone()
        };
        candidate.validate()?;
        self.broadphase = Broadphase::from_config(&candidate.broadphase);
        self.config = candidate;
        Ok(())
    }

    pub fn broadphase(&self) -> &Broadphase {
        &self.broadphase
    }

    /// Candidate pairs found by the last substep.
    pub fn collision_pairs(&self) -> &[CollisionPair] {
        self.pairs.as_slice()
    }

    pub fn stats(&self) -> &PhysicsStats {
        &self.stats
    }

    /// Time carried over to the next update.
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Substeps run since creation.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn debug_draw_flags(&self) -> DebugDrawFlags {
        self.config.debug_draw
    }

    pub fn set_debug_draw_flags(&mut self, flags: DebugDrawFlags) {
        self.config.debug_draw = flags;
    }

    /// Emits the layers enabled in the debug-draw flags.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        let flags = self.config.debug_draw;
        if flags.is_empty() {
            return;
        }

        for (_, body) in self.bodies.iter() {
            if flags.aabb {
                if let Some(aabb) = body.world_space_aabb() {
                    let colour = if body.is_static() {
                        COLOUR_STATIC
                    } else if body.is_at_rest() {
                        COLOUR_AT_REST
                    } else {
                        COLOUR_AWAKE
                    };
                    draw.draw_aabb(&aabb, colour);
                }
            }
            if flags.linear_velocity && !body.is_static() {
                draw.draw_line(body.position, body.position + body.linear_velocity(), COLOUR_VELOCITY);
            }
        }

        if flags.constraints {
            for (_, constraint) in &self.constraints {
                let (a, b) = constraint.bodies();
                let Some(body_a) = self.bodies.get(a) else {
                    continue;
                };
                let body_b = b.and_then(|handle| self.bodies.get(handle));
                if let Some((pa, pb)) = constraint.anchors(body_a, body_b) {
                    draw.draw_line(pa, pb, COLOUR_CONSTRAINT);
                    draw.draw_point(pa, 0.05, COLOUR_CONSTRAINT);
                    draw.draw_point(pb, 0.05, COLOUR_CONSTRAINT);
                }
            }
        }

        if flags.broadphase {
            self.broadphase.debug_draw(draw);
        }

        if flags.broadphase_pairs {
            for pair in self.pairs.as_slice() {
                if let (Some(a), Some(b)) = (self.bodies.get(pair.a), self.bodies.get(pair.b)) {
                    draw.draw_line(a.position, b.position, COLOUR_PAIR);
                }
            }
        }
    }
}
