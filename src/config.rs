//! Global configuration constants and the runtime [`PhysicsConfig`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::Axis;
use crate::debug::DebugDrawFlags;
use crate::error::PhysicsError;

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on fixed substeps consumed by a single `update` call.
pub const DEFAULT_MAX_UPDATES_PER_FRAME: u32 = 5;

/// Number of constraint solver sweeps performed per substep.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 1;

/// Fraction of positional error fed back as velocity bias each substep.
pub const DEFAULT_BAUMGARTE_SCALAR: f32 = 0.1;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.02;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.02;

/// Squared-speed average below which a body is put to rest.
pub const DEFAULT_REST_VELOCITY_THRESHOLD_SQUARED: f32 = 0.001;

/// Octree leaves stop splitting at or below this many bodies.
pub const DEFAULT_MAX_OBJECTS_PER_PARTITION: usize = 10;

/// Maximum octree subdivision depth.
pub const DEFAULT_MAX_PARTITION_DEPTH: usize = 5;

/// Rate of the dedicated simulation thread, in Hz.
pub const DEFAULT_THREAD_RATE_HZ: f32 = 120.0;

/// How `PhysicsWorld::update` converts elapsed time into substeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimestepMode {
    /// Accumulate elapsed time and consume it in `fixed_timestep` increments.
    #[default]
    Fixed,
    /// Run exactly one step of the elapsed time.
    Variable,
}

/// Integration scheme used for every dynamic body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IntegrationType {
    /// Velocity first, then position from the new velocity.
    #[default]
    SemiImplicitEuler,
    /// Position from the old velocity, then velocity.
    ExplicitEuler,
    /// Midpoint Runge-Kutta on linear motion.
    RungeKutta2,
    /// Classic fourth-order Runge-Kutta on linear motion.
    RungeKutta4,
}

/// Declarative description of a broadphase strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BroadphaseConfig {
    BruteForce,
    SortAndSweep {
        axis: Axis,
    },
    Octree {
        max_objects_per_partition: usize,
        max_partition_depth: usize,
        leaf: Box<BroadphaseConfig>,
    },
}

impl Default for BroadphaseConfig {
    fn default() -> Self {
        BroadphaseConfig::Octree {
            max_objects_per_partition: DEFAULT_MAX_OBJECTS_PER_PARTITION,
            max_partition_depth: DEFAULT_MAX_PARTITION_DEPTH,
            leaf: Box::new(BroadphaseConfig::BruteForce),
        }
    }
}

/// Tunables consumed from the engine shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub fixed_timestep: f32,
    pub max_updates_per_frame: u32,
    pub timestep_mode: TimestepMode,
    pub gravity: Vec3,
    pub solver_iterations: u32,
    pub baumgarte_scalar: f32,
    pub integration: IntegrationType,
    pub broadphase: BroadphaseConfig,
    /// Start in the paused state once initialised.
    pub start_paused: bool,
    pub debug_draw: DebugDrawFlags,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: DEFAULT_TIME_STEP,
            max_updates_per_frame: DEFAULT_MAX_UPDATES_PER_FRAME,
            timestep_mode: TimestepMode::Fixed,
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte_scalar: DEFAULT_BAUMGARTE_SCALAR,
            integration: IntegrationType::SemiImplicitEuler,
            broadphase: BroadphaseConfig::default(),
            start_paused: false,
            debug_draw: DebugDrawFlags::default(),
        }
    }
}

impl PhysicsConfig {
    pub fn with_fixed_timestep(mut self, fixed_timestep: f32) -> Self {
        self.fixed_timestep = fixed_timestep;
        self
    }

    pub fn with_max_updates_per_frame(mut self, max_updates: u32) -> Self {
        self.max_updates_per_frame = max_updates;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_broadphase(mut self, broadphase: BroadphaseConfig) -> Self {
        self.broadphase = broadphase;
        self
    }

    pub fn with_solver_iterations(mut self, iterations: u32) -> Self {
        self.solver_iterations = iterations;
        self
    }

    pub fn with_timestep_mode(mut self, mode: TimestepMode) -> Self {
        self.timestep_mode = mode;
        self
    }

    pub fn with_integration(mut self, integration: IntegrationType) -> Self {
        self.integration = integration;
        self
    }

    /// Checks every value a running world depends on.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "fixed_timestep must be a positive finite number, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_updates_per_frame == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_updates_per_frame must be at least 1".to_string(),
            ));
        }
        if self.solver_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "solver_iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.baumgarte_scalar) {
            return Err(PhysicsError::InvalidConfig(format!(
                "baumgarte_scalar must lie in [0, 1], got {}",
                self.baumgarte_scalar
            )));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite".to_string()));
        }
        validate_broadphase(&self.broadphase)
    }
}

fn validate_broadphase(config: &BroadphaseConfig) -> Result<(), PhysicsError> {
    match config {
        BroadphaseConfig::BruteForce | BroadphaseConfig::SortAndSweep { .. } => Ok(()),
        BroadphaseConfig::Octree {
            max_objects_per_partition,
            leaf,
            ..
        } => {
            if *max_objects_per_partition == 0 {
                return Err(PhysicsError::InvalidConfig(
                    "octree max_objects_per_partition must be at least 1".to_string(),
                ));
            }
            if matches!(leaf.as_ref(), BroadphaseConfig::Octree { .. }) {
                return Err(PhysicsError::InvalidConfig(
                    "octree leaves cannot delegate to another octree".to_string(),
                ));
            }
            validate_broadphase(leaf)
        }
    }
}
