use impulse_physics::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_physics_world_is_sync_and_send() {
    fn assert_sync_send<T: Sync + Send>() {}
    assert_sync_send::<PhysicsWorld>();
    assert_sync_send::<PhysicsEngine>();
    assert_sync_send::<SnapshotReader>();
}

fn falling_world() -> (PhysicsWorld, BodyHandle) {
    let mut world = PhysicsWorld::new(PhysicsConfig::default()).expect("valid config");
    let body = world.add_body(
        RigidBody::builder()
            .position(Vec3::new(0.0, 100.0, 0.0))
            .sphere(0.5)
            .build(),
    );
    (world, body)
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_engine_steps_on_its_own_thread() {
    let (world, body) = falling_world();
    let engine = PhysicsEngine::start(world, 240.0).expect("engine starts");
    assert!(engine.is_running());

    let reader = engine.snapshot_reader();
    let moved = wait_for(Duration::from_secs(5), || {
        reader
            .latest()
            .get(body)
            .is_some_and(|t| t.position.y < 100.0)
    });
    assert!(moved, "physics thread never published a moved body");

    let world = engine.shutdown().expect("clean shutdown");
    assert!(world.step_count() > 0);
    assert!(world.body(body).is_some_and(|b| b.position.y < 100.0));
}

#[test]
fn test_snapshots_readable_from_many_threads() {
    let (world, body) = falling_world();
    let engine = PhysicsEngine::start(world, 240.0).expect("engine starts");
    let reader = engine.snapshot_reader();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = reader.clone();
            thread::spawn(move || {
                let mut last_step = 0;
                for _ in 0..50 {
                    let snapshot = reader.latest();
                    assert!(snapshot.step_count >= last_step);
                    last_step = snapshot.step_count;
                    assert!(snapshot.get(body).is_some());
                    thread::sleep(Duration::from_millis(1));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("reader thread panicked");
    }
    engine.shutdown().expect("clean shutdown");
}

#[test]
fn test_paused_engine_holds_still() {
    let (world, body) = falling_world();
    let engine = PhysicsEngine::start(world, 240.0).expect("engine starts");

    engine.pause().expect("pause running world");
    let held = engine.with_world(|world| world.body(body).map(|b| b.position));
    thread::sleep(Duration::from_millis(50));
    let still = engine.with_world(|world| world.body(body).map(|b| b.position));
    assert_eq!(held, still);

    engine.resume().expect("resume paused world");
    let moved = wait_for(Duration::from_secs(5), || {
        engine.with_world(|world| world.body(body).map(|b| b.position)) != held
    });
    assert!(moved);
    drop(engine);
}

#[test]
fn test_engine_rejects_bad_rate_and_released_world() {
    let (world, _) = falling_world();
    assert!(PhysicsEngine::start(world, 0.0).is_err());

    let (world, _) = falling_world();
    assert!(matches!(
        PhysicsEngine::start(world, 1e-30),
        Err(PhysicsError::InvalidConfig(_))
    ));

    let (mut world, _) = falling_world();
    world.init().expect("init");
    world.release().expect("release");
    assert!(matches!(
        PhysicsEngine::start(world, 60.0),
        Err(PhysicsError::InvalidStateTransition { .. })
    ));
}

#[test]
fn test_shared_world_across_threads() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default()).expect("valid config");
    world.init().expect("init");
    let world = Arc::new(parking_lot::Mutex::new(world));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                let mut world = world.lock();
                world.update(1.0 / 60.0);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
    assert_eq!(world.lock().step_count(), 4);
}
