use glam::Vec3;

use super::{report_if_overlapping, BroadphaseProxy, PairList};
use crate::core::types::Axis;
use crate::debug::{DebugDraw, COLOUR_BROADPHASE};

/// Sorts proxies by their lower bound on one axis and sweeps the sorted list.
///
/// Degrades towards O(n^2) when bodies cluster orthogonally to the axis.
#[derive(Debug, Clone)]
pub struct SortAndSweep {
    pub axis: Axis,
    order: Vec<usize>,
    /// Lowest min and highest max over every sweep since the last
    /// [`SortAndSweep::begin_pass`].
    extent: Option<(Vec3, Vec3)>,
}

impl Default for SortAndSweep {
    fn default() -> Self {
        Self::new(Axis::X)
    }
}

impl SortAndSweep {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            order: Vec::new(),
            extent: None,
        }
    }

    pub fn begin_pass(&mut self) {
        self.extent = None;
    }

    pub fn append_pairs(&mut self, proxies: &[BroadphaseProxy], subset: &[usize], out: &mut PairList) {
        let axis = self.axis;
        self.order.clear();
        self.order.extend_from_slice(subset);
        self.order
            .sort_by(|&a, &b| proxies[a].aabb.min_on(axis).total_cmp(&proxies[b].aabb.min_on(axis)));

        for (i, &current) in self.order.iter().enumerate() {
            let current = &proxies[current];
            let reach = current.aabb.max_on(axis);

            for &candidate in &self.order[i + 1..] {
                let candidate = &proxies[candidate];
                if candidate.aabb.min_on(axis) > reach {
                    break;
                }
                report_if_overlapping(current, candidate, out);
            }

            self.extent = Some(match self.extent {
                Some((min, max)) => (min.min(current.aabb.min), max.max(current.aabb.max)),
                None => (current.aabb.min, current.aabb.max),
            });
        }
    }

    /// Draws the swept interval along the sort axis.
    pub fn debug_draw(&self, draw: &mut dyn DebugDraw) {
        let Some((min, max)) = self.extent else {
            return;
        };
        let start = min;
        let mut end = min;
        end[self.axis.index()] = max[self.axis.index()];
        draw.draw_line(start, end, COLOUR_BROADPHASE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Aabb;
    use crate::debug::DebugDrawBuffer;
    use crate::utils::allocator::BodyHandle;

    fn proxy(index: u32, center: Vec3) -> BroadphaseProxy {
        BroadphaseProxy {
            handle: BodyHandle::new(index, 0),
            aabb: Aabb::from_center_half_extents(center, Vec3::splat(0.5)),
            is_static: false,
            is_at_rest: false,
        }
    }

    #[test]
    fn extent_spans_every_sweep_of_a_pass() {
        let proxies = [
            proxy(0, Vec3::ZERO),
            proxy(1, Vec3::new(0.5, 0.0, 0.0)),
            proxy(2, Vec3::new(20.0, 0.0, 0.0)),
            proxy(3, Vec3::new(20.5, 0.0, 0.0)),
        ];
        let mut sweep = SortAndSweep::new(Axis::X);
        let mut out = PairList::new();

        sweep.begin_pass();
        sweep.append_pairs(&proxies, &[0, 1], &mut out);
        sweep.append_pairs(&proxies, &[2, 3], &mut out);
        assert_eq!(out.len(), 2);

        let mut draw = DebugDrawBuffer::new();
        sweep.debug_draw(&mut draw);
        assert_eq!(draw.lines.len(), 1);
        let (from, to, _) = draw.lines[0];
        assert_eq!(from.x, -0.5);
        assert_eq!(to.x, 21.0);

        sweep.begin_pass();
        sweep.append_pairs(&proxies, &[2, 3], &mut out);
        draw.clear();
        sweep.debug_draw(&mut draw);
        assert_eq!(draw.lines[0].0.x, 19.5);
    }
}
