//! Broadphase strategies turning the body set into candidate collision pairs.
//!
//! Every strategy returns a superset of the pairs whose world AABBs overlap
//! and never reports a pair where both bodies are static or resting.

mod brute_force;
mod octree;
mod sort_and_sweep;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use brute_force::BruteForce;
pub use octree::Octree;
pub use sort_and_sweep::SortAndSweep;

use crate::config::BroadphaseConfig;
use crate::core::rigidbody::RigidBody;
use crate::core::types::Aabb;
use crate::debug::DebugDraw;
use crate::utils::allocator::BodyHandle;

/// Per-frame view of a body as seen by the broadphase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BroadphaseProxy {
    pub handle: BodyHandle,
    pub aabb: Aabb,
    pub is_static: bool,
    pub is_at_rest: bool,
}

impl BroadphaseProxy {
    /// Shapeless bodies have no proxy.
    pub fn from_body(handle: BodyHandle, body: &RigidBody) -> Option<Self> {
        Some(Self {
            handle,
            aabb: body.world_space_aabb()?,
            is_static: body.is_static(),
            is_at_rest: body.is_at_rest(),
        })
    }

    fn is_inactive(&self) -> bool {
        self.is_static || self.is_at_rest
    }

    /// Pairs where both sides are static or resting cannot produce a response.
    pub fn can_pair_with(&self, other: &BroadphaseProxy) -> bool {
        self.handle != other.handle && !(self.is_inactive() && other.is_inactive())
    }
}

/// Unordered pair of bodies whose bounds may overlap, stored smallest handle first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollisionPair {
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionPair {
    pub fn new(first: BodyHandle, second: BodyHandle) -> Self {
        if first <= second {
            Self { a: first, b: second }
        } else {
            Self { a: second, b: first }
        }
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }
}

/// Output buffer shared by every strategy of one pass; drops duplicates.
#[derive(Debug, Default, Clone)]
pub struct PairList {
    pairs: Vec<CollisionPair>,
    seen: HashSet<CollisionPair>,
    /// Proxy indices of the whole set, kept between passes.
    indices: Vec<usize>,
}

impl PairList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
        self.seen.clear();
    }

    /// Records the pair unless it was already reported this pass.
    pub fn push(&mut self, pair: CollisionPair) -> bool {
        if self.seen.insert(pair) {
            self.pairs.push(pair);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn as_slice(&self) -> &[CollisionPair] {
        &self.pairs
    }

    pub fn into_vec(self) -> Vec<CollisionPair> {
        self.pairs
    }

    /// `0..count` in the reused index buffer; hand it back with
    /// [`PairList::restore_indices`].
    fn take_indices(&mut self, count: usize) -> Vec<usize> {
        let mut indices = std::mem::take(&mut self.indices);
        indices.clear();
        indices.extend(0..count);
        indices
    }

    fn restore_indices(&mut self, indices: Vec<usize>) {
        self.indices = indices;
    }
}

/// Tests the filter and full AABB overlap, then records the pair.
fn report_if_overlapping(a: &BroadphaseProxy, b: &BroadphaseProxy, out: &mut PairList) {
    if a.can_pair_with(b) && a.aabb.overlaps(&b.aabb) {
        out.push(CollisionPair::new(a.handle, b.handle));
    }
}

/// The closed set of broadphase strategies.
#[derive(Debug, Clone)]
pub enum Broadphase {
    BruteForce(BruteForce),
    SortAndSweep(SortAndSweep),
    Octree(Octree),
}

impl Default for Broadphase {
    fn default() -> Self {
        Broadphase::from_config(&BroadphaseConfig::default())
    }
}

impl Broadphase {
    pub fn from_config(config: &BroadphaseConfig) -> Self {
        match config {
            BroadphaseConfig::BruteForce => Broadphase::BruteForce(BruteForce::new()),
            BroadphaseConfig::SortAndSweep { axis } => {
                Broadphase::SortAndSweep(SortAndSweep::new(*axis))
            }
            BroadphaseConfig::Octree {
                max_objects_per_partition,
                max_partition_depth,
                leaf,
            } => Broadphase::Octree(Octree::new(
                *max_objects_per_partition,
                *max_partition_depth,
                Broadphase::from_config(leaf),
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Broadphase::BruteForce(_) => "BruteForce",
            Broadphase::SortAndSweep(_) => "SortAndSweep",
            Broadphase::Octree(_) => "Octree",
        }
    }

    /// Candidate pairs for the whole proxy set.
    pub fn find_potential_collision_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
    ) -> Vec<CollisionPair> {
        let mut out = PairList::new();
        self.find_potential_collision_pairs_into(proxies, &mut out);
        out.into_vec()
    }

    /// Like [`Broadphase::find_potential_collision_pairs`] but reuses `out`.
    pub fn find_potential_collision_pairs_into(
        &mut self,
        proxies: &[BroadphaseProxy],
        out: &mut PairList,
    ) {
        out.clear();
        self.begin_pass();
        let subset = out.take_indices(proxies.len());
        self.append_pairs(proxies, &subset, out);
        out.restore_indices(subset);
    }

    /// Resets state a strategy accumulates over the `append_pairs` calls of
    /// one pass.
    pub fn begin_pass(&mut self) {
        match self {
            Broadphase::BruteForce(_) => {}
            Broadphase::SortAndSweep(b) => b.begin_pass(),
            Broadphase::Octree(b) => b.begin_pass(),
        }
    }

    /// Appends candidate pairs among `proxies[subset[..]]` to `out`.
    pub fn append_pairs(
        &mut self,
        proxies: &[BroadphaseProxy],
        subset: &[usize],
        out: &mut PairList,
    ) {
        match self {
            Broadphase::BruteForce(b) => b.append_pairs(proxies, subset, out),
            Broadphase::SortAndSweep(b) => b.append_pairs(proxies, subset, out),
            Broadphase::Octree(b) => b.append_pairs(proxies, subset, out),
        }
    }

    /// Draws the partition structure built by the most recent pass.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        match self {
            Broadphase::BruteForce(_) => {}
            Broadphase::SortAndSweep(b) => b.debug_draw(draw),
            Broadphase::Octree(b) => b.debug_draw(draw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn proxy(index: u32, center: Vec3, is_static: bool, is_at_rest: bool) -> BroadphaseProxy {
        BroadphaseProxy {
            handle: BodyHandle::new(index, 0),
            aabb: Aabb::from_center_half_extents(center, Vec3::splat(0.5)),
            is_static,
            is_at_rest,
        }
    }

    #[test]
    fn pair_is_canonically_ordered() {
        let a = BodyHandle::new(3, 0);
        let b = BodyHandle::new(1, 2);
        assert_eq!(CollisionPair::new(a, b), CollisionPair::new(b, a));
        assert_eq!(CollisionPair::new(a, b).a, b);
    }

    #[test]
    fn pair_list_drops_duplicates() {
        let mut list = PairList::new();
        let pair = CollisionPair::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0));
        assert!(list.push(pair));
        assert!(!list.push(CollisionPair::new(pair.b, pair.a)));
        assert_eq!(list.len(), 1);
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn index_buffer_is_reused_between_passes() {
        let proxies: Vec<_> = (0..16)
            .map(|i| proxy(i, Vec3::new(i as f32 * 0.6, 0.0, 0.0), false, false))
            .collect();
        let mut broadphase = Broadphase::BruteForce(BruteForce::new());
        let mut out = PairList::new();

        broadphase.find_potential_collision_pairs_into(&proxies, &mut out);
        let first = out.as_slice().to_vec();
        let buffer = out.indices.as_ptr();
        assert_eq!(out.indices.len(), proxies.len());

        broadphase.find_potential_collision_pairs_into(&proxies[..8], &mut out);
        assert_eq!(out.indices.as_ptr(), buffer);
        assert_eq!(out.indices, (0..8).collect::<Vec<_>>());
        assert!(out.len() < first.len());

        broadphase.find_potential_collision_pairs_into(&proxies, &mut out);
        assert_eq!(out.as_slice(), first.as_slice());
    }

    #[test]
    fn inactive_pairs_are_filtered_by_every_strategy() {
        let proxies = [
            proxy(0, Vec3::ZERO, true, false),
            proxy(1, Vec3::new(0.2, 0.0, 0.0), true, false),
            proxy(2, Vec3::new(0.4, 0.0, 0.0), false, true),
            proxy(3, Vec3::new(0.6, 0.0, 0.0), false, true),
            proxy(4, Vec3::new(0.8, 0.0, 0.0), false, false),
        ];

        for config in [
            BroadphaseConfig::BruteForce,
            BroadphaseConfig::SortAndSweep { axis: crate::core::types::Axis::X },
            BroadphaseConfig::Octree {
                max_objects_per_partition: 1,
                max_partition_depth: 3,
                leaf: Box::new(BroadphaseConfig::BruteForce),
            },
        ] {
            let mut broadphase = Broadphase::from_config(&config);
            let pairs = broadphase.find_potential_collision_pairs(&proxies);
            for pair in &pairs {
                assert!(pair.contains(BodyHandle::new(4, 0)), "{} emitted {pair:?}", broadphase.name());
            }
            assert_eq!(pairs.len(), 4, "{}", broadphase.name());
        }
    }
}
