use super::{report_if_overlapping, BroadphaseProxy, PairList};

/// Tests every pair; the reference the other strategies are measured against.
#[derive(Debug, Clone, Default)]
pub struct BruteForce;

impl BruteForce {
    pub fn new() -> Self {
        Self
    }

    pub fn append_pairs(&mut self, proxies: &[BroadphaseProxy], subset: &[usize], out: &mut PairList) {
        for (i, &first) in subset.iter().enumerate() {
            for &second in &subset[i + 1..] {
                report_if_overlapping(&proxies[first], &proxies[second], out);
            }
        }
    }
}
