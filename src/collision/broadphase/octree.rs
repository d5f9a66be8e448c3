use std::ops::Range;

use glam::Vec3;

use super::{Broadphase, BroadphaseProxy, PairList};
use crate::config::{DEFAULT_MAX_OBJECTS_PER_PARTITION, DEFAULT_MAX_PARTITION_DEPTH};
use crate::core::types::Aabb;
use crate::debug::{DebugDraw, COLOUR_BROADPHASE};

#[derive(Debug, Clone)]
struct OctreeNode {
    bounds: Aabb,
    /// Range into the shared item buffer.
    items: Range<usize>,
}

/// Octree rebuilt every pass. Bodies straddling a split go into every child
/// they touch, and leaves hand their bodies to a secondary broadphase.
///
/// Nodes and item lists live in pools that are cleared, not freed, at the
/// start of each pass.
#[derive(Debug, Clone)]
pub struct Octree {
    pub max_objects_per_partition: usize,
    pub max_partition_depth: usize,
    leaf: Box<Broadphase>,
    nodes: Vec<OctreeNode>,
    items: Vec<usize>,
    leaves: Vec<usize>,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_OBJECTS_PER_PARTITION,
            DEFAULT_MAX_PARTITION_DEPTH,
            Broadphase::BruteForce(super::BruteForce::new()),
        )
    }
}

impl Octree {
    pub fn new(max_objects_per_partition: usize, max_partition_depth: usize, leaf: Broadphase) -> Self {
        Self {
            max_objects_per_partition: max_objects_per_partition.max(1),
            max_partition_depth,
            leaf: Box::new(leaf),
            nodes: Vec::new(),
            items: Vec::new(),
            leaves: Vec::new(),
        }
    }

    pub fn leaf_broadphase(&self) -> &Broadphase {
        &self.leaf
    }

    /// Nodes built by the last pass.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn begin_pass(&mut self) {
        self.leaf.begin_pass();
    }

    pub fn append_pairs(&mut self, proxies: &[BroadphaseProxy], subset: &[usize], out: &mut PairList) {
        self.nodes.clear();
        self.items.clear();
        self.leaves.clear();
        if subset.len() < 2 {
            return;
        }

        let mut root_bounds = Aabb::empty();
        for &index in subset {
            root_bounds.merge(&proxies[index].aabb);
        }
        self.items.extend_from_slice(subset);
        self.nodes.push(OctreeNode {
            bounds: root_bounds,
            items: 0..subset.len(),
        });
        self.divide(0, 0, proxies);

        let leaf = &mut self.leaf;
        for &node in &self.leaves {
            let range = self.nodes[node].items.clone();
            if range.len() > 1 {
                leaf.append_pairs(proxies, &self.items[range], out);
            }
        }
    }

    fn divide(&mut self, node: usize, depth: usize, proxies: &[BroadphaseProxy]) {
        let parent_items = self.nodes[node].items.clone();
        if depth >= self.max_partition_depth || parent_items.len() <= self.max_objects_per_partition {
            self.leaves.push(node);
            return;
        }

        let bounds = self.nodes[node].bounds;
        let center = bounds.center();
        for octant in 0..8 {
            let child_bounds = octant_bounds(&bounds, center, octant);
            let start = self.items.len();
            for k in parent_items.clone() {
                let index = self.items[k];
                if proxies[index].aabb.overlaps(&child_bounds) {
                    self.items.push(index);
                }
            }
            let end = self.items.len();
            if start == end {
                continue;
            }

            let child = self.nodes.len();
            self.nodes.push(OctreeNode {
                bounds: child_bounds,
                items: start..end,
            });

            // A child that kept every object cannot make progress by splitting.
            if end - start == parent_items.len() {
                self.leaves.push(child);
            } else {
                self.divide(child, depth + 1, proxies);
            }
        }
    }

    /// Draws the bounds of every leaf, then the leaf broadphase's own structure.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        for &leaf in &self.leaves {
            draw.draw_aabb(&self.nodes[leaf].bounds, COLOUR_BROADPHASE);
        }
        self.leaf.debug_draw(draw);
    }
}

/// Bounds of octant `octant` (bit 0 = +x, bit 1 = +y, bit 2 = +z).
fn octant_bounds(bounds: &Aabb, center: Vec3, octant: usize) -> Aabb {
    let pick = |bit: usize, low: f32, mid: f32, high: f32| {
        if octant & bit == 0 {
            (low, mid)
        } else {
            (mid, high)
        }
    };
    let (min_x, max_x) = pick(1, bounds.min.x, center.x, bounds.max.x);
    let (min_y, max_y) = pick(2, bounds.min.y, center.y, bounds.max.y);
    let (min_z, max_z) = pick(4, bounds.min.z, center.z, bounds.max.z);
    Aabb::new(Vec3::new(min_x, min_y, min_z), Vec3::new(max_x, max_y, max_z))
}
