//! Debug drawing hooks consumed by an external renderer.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::core::types::Aabb;

pub const COLOUR_AWAKE: Vec4 = Vec4::new(0.2, 0.8, 1.0, 1.0);
pub const COLOUR_AT_REST: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
pub const COLOUR_STATIC: Vec4 = Vec4::new(0.5, 0.5, 0.5, 1.0);
pub const COLOUR_CONSTRAINT: Vec4 = Vec4::new(1.0, 0.8, 1.0, 1.0);
pub const COLOUR_BROADPHASE: Vec4 = Vec4::new(1.0, 0.5, 0.0, 0.3);
pub const COLOUR_PAIR: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);
pub const COLOUR_VELOCITY: Vec4 = Vec4::new(0.0, 0.0, 1.0, 1.0);

/// Which layers `PhysicsWorld::debug_draw` emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugDrawFlags {
    pub aabb: bool,
    pub linear_velocity: bool,
    pub constraints: bool,
    /// Partition structure of the active broadphase.
    pub broadphase: bool,
    /// A line between the centres of every candidate pair.
    pub broadphase_pairs: bool,
}

impl DebugDrawFlags {
    pub fn all() -> Self {
        Self {
            aabb: true,
            linear_velocity: true,
            constraints: true,
            broadphase: true,
            broadphase_pairs: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Line and point sink implemented by the renderer.
pub trait DebugDraw {
    fn draw_line(&mut self, from: Vec3, to: Vec3, colour: Vec4);

    fn draw_point(&mut self, position: Vec3, size: f32, colour: Vec4);

    /// Draws the twelve edges of `aabb`.
    fn draw_aabb(&mut self, aabb: &Aabb, colour: Vec4) {
        let c = aabb.corners();
        const EDGES: [(usize, usize); 12] = [
            (0, 1),
            (2, 3),
            (4, 5),
            (6, 7),
            (0, 2),
            (1, 3),
            (4, 6),
            (5, 7),
            (0, 4),
            (1, 5),
            (2, 6),
            (3, 7),
        ];
        for (a, b) in EDGES {
            self.draw_line(c[a], c[b], colour);
        }
    }
}

/// Collects primitives in memory, for renderers that batch once per frame.
#[derive(Debug, Clone, Default)]
pub struct DebugDrawBuffer {
    pub lines: Vec<(Vec3, Vec3, Vec4)>,
    pub points: Vec<(Vec3, f32, Vec4)>,
}

impl DebugDrawBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.points.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.points.is_empty()
    }
}

impl DebugDraw for DebugDrawBuffer {
    fn draw_line(&mut self, from: Vec3, to: Vec3, colour: Vec4) {
        self.lines.push((from, to, colour));
    }

    fn draw_point(&mut self, position: Vec3, size: f32, colour: Vec4) {
        self.points.push((position, size, colour));
    }
}
