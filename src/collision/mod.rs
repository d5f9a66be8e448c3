//! Collision detection: broadphase strategies producing candidate pairs.

pub mod broadphase;

pub use broadphase::{
    Broadphase, BroadphaseProxy, BruteForce, CollisionPair, Octree, PairList, SortAndSweep,
};
