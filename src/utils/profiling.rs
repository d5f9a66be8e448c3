use std::time::{Duration, Instant};

/// Counters and phase timings of the last `PhysicsWorld::update`.
///
/// Phase timings accumulate over every substep of the update.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PhysicsStats {
    pub broadphase_time: Duration,
    pub solver_time: Duration,
    pub integrator_time: Duration,
    pub total_frame_time: Duration,

    pub body_count: usize,
    pub pair_count: usize,
    pub constraint_count: usize,
    /// Substeps run by the last update.
    pub substeps: u32,
    /// Substeps run since the world was created.
    pub total_substeps: u64,
    /// Simulated seconds discarded because the substep cap was hit.
    pub dropped_time: f32,
    /// Updates that hit the substep cap since the world was created.
    pub slow_frames: u64,
}

impl PhysicsStats {
    /// Clears the per-update values, keeping running totals.
    pub fn begin_update(&mut self) {
        self.broadphase_time = Duration::ZERO;
        self.solver_time = Duration::ZERO;
        self.integrator_time = Duration::ZERO;
        self.total_frame_time = Duration::ZERO;
        self.substeps = 0;
        self.dropped_time = 0.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_frame_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        let percent = |d: Duration| (d.as_micros() as f32 / total_us) * 100.0;
        log::debug!(
            "physics: bodies={} pairs={} constraints={} substeps={} frame={:.2}ms \
             (broadphase {:.1}%, solver {:.1}%, integrator {:.1}%)",
            self.body_count,
            self.pair_count,
            self.constraint_count,
            self.substeps,
            self.total_frame_time.as_secs_f32() * 1000.0,
            percent(self.broadphase_time),
            percent(self.solver_time),
            percent(self.integrator_time),
        );
    }
}

/// Logs a warning when `duration` exceeds `budget`.
pub fn warn_if_over_budget(label: &str, duration: Duration, budget: Duration) {
    if duration > budget {
        log::warn!(
            "{label} exceeded budget: {:.2} ms > {:.2} ms",
            duration.as_secs_f32() * 1000.0,
            budget.as_secs_f32() * 1000.0
        );
    }
}

/// Adds the time between construction and drop to `output`.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    output: &'a mut Duration,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str, output: &'a mut Duration) -> Self {
        Self {
            label,
            start: Instant::now(),
            output,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        log::trace!("{} took {:?}", self.label, elapsed);
        *self.output += elapsed;
    }
}
