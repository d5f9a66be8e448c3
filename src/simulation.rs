//! Dedicated simulation thread driving a [`PhysicsWorld`] at a fixed rate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::PhysicsError;
use crate::utils::profiling::warn_if_over_budget;
use crate::world::{PhysicsWorld, SnapshotReader, TransformSnapshot, WorldState};

const STATS_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Owns a world on its own thread; dropped or shut down engines join it.
pub struct PhysicsEngine {
    world: Arc<Mutex<PhysicsWorld>>,
    running: Arc<AtomicBool>,
    snapshots: SnapshotReader,
    thread: Option<JoinHandle<()>>,
    target_hz: f32,
}

impl PhysicsEngine {
    /// Initialises `world` if needed and starts stepping it `target_hz` times a second.
    pub fn start(mut world: PhysicsWorld, target_hz: f32) -> Result<Self, PhysicsError> {
        if !(target_hz.is_finite() && target_hz > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "simulation rate must be positive, got {target_hz}"
            )));
        }
        let period = Duration::try_from_secs_f32(1.0 / target_hz).map_err(|err| {
            PhysicsError::InvalidConfig(format!("simulation rate {target_hz} Hz: {err}"))
        })?;
        match world.state() {
            WorldState::Uninitialized => world.init()?,
            WorldState::Released => {
                return Err(PhysicsError::InvalidStateTransition {
                    from: WorldState::Released,
                    to: WorldState::Running,
                })
            }
            WorldState::Running | WorldState::Paused => {}
        }

        let snapshots = world.snapshot_reader();
        let world = Arc::new(Mutex::new(world));
        let running = Arc::new(AtomicBool::new(true));

        let thread = thread::Builder::new().name("physics".to_string()).spawn({
            let world = Arc::clone(&world);
            let running = Arc::clone(&running);
            move || run_loop(&world, &running, period)
        })?;
        log::info!("physics thread started at {target_hz} Hz");

        Ok(Self {
            world,
            running,
            snapshots,
            thread: Some(thread),
            target_hz,
        })
    }

    pub fn target_hz(&self) -> f32 {
        self.target_hz
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs `f` with exclusive access to the world, between two updates.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut PhysicsWorld) -> R) -> R {
        let mut world = self.world.lock();
        f(&mut world)
    }

    pub fn pause(&self) -> Result<(), PhysicsError> {
        self.with_world(PhysicsWorld::pause)
    }

    pub fn resume(&self) -> Result<(), PhysicsError> {
        self.with_world(PhysicsWorld::resume)
    }

    pub fn snapshot_reader(&self) -> SnapshotReader {
        self.snapshots.clone()
    }

    /// Transforms from the last completed update; never blocks on the simulation.
    pub fn latest_transforms(&self) -> Arc<TransformSnapshot> {
        self.snapshots.latest()
    }

    /// Stops the thread, joins it and hands the world back.
    pub fn shutdown(mut self) -> Result<PhysicsWorld, PhysicsError> {
        self.stop_and_join()?;
        let world = Arc::clone(&self.world);
        drop(self);
        match Arc::try_unwrap(world) {
            Ok(world) => Ok(world.into_inner()),
            Err(shared) => Ok(std::mem::take(&mut *shared.lock())),
        }
    }

    fn stop_and_join(&mut self) -> Result<(), PhysicsError> {
        self.running.store(false, Ordering::Release);
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        thread.join().map_err(|_| {
            log::error!("physics thread panicked");
            PhysicsError::ThreadPanicked
        })?;
        log::info!("physics thread stopped");
        Ok(())
    }
}

impl Drop for PhysicsEngine {
    fn drop(&mut self) {
        // Errors were already logged by stop_and_join.
        let _ = self.stop_and_join();
    }
}

fn run_loop(world: &Mutex<PhysicsWorld>, running: &AtomicBool, period: Duration) {
    let mut last = Instant::now();
    let mut next_report = last + STATS_REPORT_INTERVAL;

    while running.load(Ordering::Acquire) {
        let frame_start = Instant::now();
        let elapsed = frame_start.duration_since(last);
        last = frame_start;

        {
            let mut world = world.lock();
            world.update(elapsed.as_secs_f32());
            if frame_start >= next_report {
                world.stats().report();
                next_report = frame_start + STATS_REPORT_INTERVAL;
            }
        }

        let spent = frame_start.elapsed();
        if spent < period {
            thread::sleep(period - spent);
        } else {
            warn_if_over_budget("physics tick", spent, period);
        }
    }
}
