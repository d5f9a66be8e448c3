use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use impulse_physics::*;
use std::hint::black_box;

const DT: f32 = 1.0 / 60.0;

/// Deterministic jittered grid so every run sees the same scene.
fn scene(body_count: usize) -> Vec<BroadphaseProxy> {
    let side = (body_count as f32).cbrt().ceil() as usize;
    (0..body_count)
        .map(|i| {
            let (x, y, z) = (i % side, (i / side) % side, i / (side * side));
            let jitter = ((i * 7919) % 97) as f32 / 97.0;
            let center = Vec3::new(x as f32, y as f32, z as f32) * 1.5 + Vec3::splat(jitter);
            BroadphaseProxy {
                handle: BodyHandle::new(i as u32, 0),
                aabb: Aabb::from_center_half_extents(center, Vec3::splat(0.5 + jitter * 0.5)),
                is_static: i % 10 == 0,
                is_at_rest: false,
            }
        })
        .collect()
}

fn prepare_world(body_count: usize, broadphase: BroadphaseConfig) -> PhysicsWorld {
    let mut world =
        PhysicsWorld::new(PhysicsConfig::default().with_broadphase(broadphase)).expect("valid config");
    world.init().expect("init");
    for proxy in scene(body_count) {
        world.add_body(
            RigidBody::builder()
                .position(proxy.aabb.center())
                .sphere(proxy.aabb.half_extents().x)
                .build(),
        );
    }
    world
}

fn strategies() -> [(&'static str, BroadphaseConfig); 3] {
    [
        ("brute_force", BroadphaseConfig::BruteForce),
        ("sort_and_sweep", BroadphaseConfig::SortAndSweep { axis: Axis::X }),
        ("octree", BroadphaseConfig::default()),
    ]
}

fn bench_broadphase(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadphase");
    for &count in &[128usize, 512, 2048] {
        let proxies = scene(count);
        for (name, config) in strategies() {
            let mut broadphase = Broadphase::from_config(&config);
            let mut out = PairList::new();
            group.bench_with_input(BenchmarkId::new(name, count), &proxies, |b, proxies| {
                b.iter(|| {
                    broadphase.find_potential_collision_pairs_into(black_box(proxies), &mut out);
                    black_box(out.len())
                })
            });
        }
    }
    group.finish();
}

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    for &count in &[128usize, 512, 2048] {
        group.bench_with_input(BenchmarkId::new("sequential", count), &count, |b, &count| {
            let mut world = prepare_world(count, BroadphaseConfig::default());
            world.set_parallel_enabled(false);
            b.iter(|| world.update(black_box(DT)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |b, &count| {
            let mut world = prepare_world(count, BroadphaseConfig::default());
            world.set_parallel_enabled(true);
            b.iter(|| world.update(black_box(DT)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_broadphase, bench_world_step);
criterion_main!(benches);
