//! Utility helpers: generational arena, math extensions, and profiling.

pub mod allocator;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, BodyHandle, Handle};
pub use profiling::{PhysicsStats, ScopedTimer};
