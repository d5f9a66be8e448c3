use glam::Vec3;

use crate::config::IntegrationType;
use crate::core::rigidbody::RigidBody;
use crate::utils::allocator::Arena;
use crate::utils::math::integrate_orientation;

/// Integrator responsible for stepping rigid bodies forward in time.
#[derive(Debug, Clone)]
pub struct Integrator {
    pub integration: IntegrationType,
    pub gravity: Vec3,
    parallel: bool,
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(IntegrationType::default(), Vec3::ZERO)
    }
}

impl Integrator {
    pub fn new(integration: IntegrationType, gravity: Vec3) -> Self {
        Self {
            integration,
            gravity,
            parallel: cfg!(feature = "parallel"),
        }
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled && cfg!(feature = "parallel");
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Integrates every body in the arena by `dt`.
    pub fn step(&self, bodies: &mut Arena<RigidBody>, dt: f32) {
        let gravity = self.gravity;
        let integration = self.integration;

        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                bodies.par_for_each_mut(|body| integrate_body(body, dt, gravity, integration));
                return;
            }
        }

        for body in bodies.values_mut() {
            integrate_body(body, dt, gravity, integration);
        }
    }
}

/// Advances one body by `dt`.
///
/// Static and resting bodies only lose their accumulated force and torque.
/// `gravity` is an acceleration and does not wake the body.
pub fn integrate_body(body: &mut RigidBody, dt: f32, gravity: Vec3, integration: IntegrationType) {
    if !(dt.is_finite() && dt > 0.0) {
        return;
    }
    if body.is_static() || body.is_at_rest() {
        body.force = Vec3::ZERO;
        body.torque = Vec3::ZERO;
        return;
    }

    match integration {
        IntegrationType::SemiImplicitEuler => {
            integrate_linear_velocity(body, dt, gravity);
            integrate_angular_velocity(body, dt);
            integrate_position(body, dt);
        }
        IntegrationType::ExplicitEuler => {
            integrate_position(body, dt);
            integrate_linear_velocity(body, dt, gravity);
            integrate_angular_velocity(body, dt);
        }
        IntegrationType::RungeKutta2 | IntegrationType::RungeKutta4 => {
            let acceleration = body.force * body.inverse_mass() + gravity;
            let state = LinearState {
                position: body.position,
                velocity: body.velocity.linear,
            };
            let state = if integration == IntegrationType::RungeKutta2 {
                rk2(state, acceleration, dt)
            } else {
                rk4(state, acceleration, dt)
            };
            body.position = state.position;
            body.velocity.linear = state.velocity * linear_damping_factor(body, dt);

            integrate_angular_velocity(body, dt);
            body.orientation = integrate_orientation(body.orientation, body.velocity.angular, dt);
        }
    }

    body.force = Vec3::ZERO;
    body.torque = Vec3::ZERO;
    body.rest_test();
}

fn linear_damping_factor(body: &RigidBody, dt: f32) -> f32 {
    (1.0 - body.linear_damping * dt).max(0.0)
}

fn integrate_linear_velocity(body: &mut RigidBody, dt: f32, gravity: Vec3) {
    let acceleration = body.force * body.inverse_mass() + gravity;
    body.velocity.linear += acceleration * dt;
    body.velocity.linear *= linear_damping_factor(body, dt);
}

fn integrate_angular_velocity(body: &mut RigidBody, dt: f32) {
    body.velocity.angular += body.world_inverse_inertia() * body.torque * dt;
    body.velocity.angular *= (1.0 - body.angular_damping * dt).max(0.0);
}

fn integrate_position(body: &mut RigidBody, dt: f32) {
    body.position += body.velocity.linear * dt;
    body.orientation = integrate_orientation(body.orientation, body.velocity.angular, dt);
}

/// Linear state advanced by the Runge-Kutta schemes.
#[derive(Debug, Clone, Copy)]
struct LinearState {
    position: Vec3,
    velocity: Vec3,
}

/// Time derivative of a [`LinearState`].
#[derive(Debug, Clone, Copy, Default)]
struct Derivative {
    velocity: Vec3,
    acceleration: Vec3,
}

/// Derivative at `dt` past `initial`, reached along `slope`.
///
/// Acceleration is constant over a substep: forces are only accumulated
/// between substeps.
fn evaluate(initial: LinearState, acceleration: Vec3, dt: f32, slope: Derivative) -> Derivative {
    Derivative {
        velocity: initial.velocity + slope.acceleration * dt,
        acceleration,
    }
}

fn rk2(state: LinearState, acceleration: Vec3, dt: f32) -> LinearState {
    let a = evaluate(state, acceleration, 0.0, Derivative::default());
    let b = evaluate(state, acceleration, dt * 0.5, a);
    LinearState {
        position: state.position + b.velocity * dt,
        velocity: state.velocity + b.acceleration * dt,
    }
}

fn rk4(state: LinearState, acceleration: Vec3, dt: f32) -> LinearState {
    let a = evaluate(state, acceleration, 0.0, Derivative::default());
    let b = evaluate(state, acceleration, dt * 0.5, a);
    let c = evaluate(state, acceleration, dt * 0.5, b);
    let d = evaluate(state, acceleration, dt, c);

    let velocity = (a.velocity + (b.velocity + c.velocity) * 2.0 + d.velocity) / 6.0;
    let acceleration =
        (a.acceleration + (b.acceleration + c.acceleration) * 2.0 + d.acceleration) / 6.0;
    LinearState {
        position: state.position + velocity * dt,
        velocity: state.velocity + acceleration * dt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shape::CollisionShape;
    use approx::assert_relative_eq;

    fn falling_body() -> RigidBody {
        RigidBody::builder()
            .shape(CollisionShape::sphere(0.5))
            .damping(0.0, 0.0)
            .rest_velocity_threshold_squared(0.0)
            .build()
    }

    #[test]
    fn semi_implicit_uses_updated_velocity() {
        let mut body = falling_body();
        integrate_body(&mut body, 0.1, Vec3::new(0.0, -10.0, 0.0), IntegrationType::SemiImplicitEuler);
        assert_relative_eq!(body.linear_velocity().y, -1.0, epsilon = 1e-6);
        assert_relative_eq!(body.position.y, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn explicit_uses_previous_velocity() {
        let mut body = falling_body();
        integrate_body(&mut body, 0.1, Vec3::new(0.0, -10.0, 0.0), IntegrationType::ExplicitEuler);
        assert_relative_eq!(body.linear_velocity().y, -1.0, epsilon = 1e-6);
        assert_eq!(body.position.y, 0.0);
    }

    #[test]
    fn schemes_under_constant_acceleration() {
        let gravity = Vec3::new(0.0, -10.0, 0.0);
        let expected = [
            (IntegrationType::SemiImplicitEuler, -0.1),
            (IntegrationType::ExplicitEuler, 0.0),
            // Exact for constant acceleration: y = a t^2 / 2.
            (IntegrationType::RungeKutta2, -0.05),
            (IntegrationType::RungeKutta4, -0.05),
        ];

        for (integration, position_y) in expected {
            let mut body = falling_body();
            integrate_body(&mut body, 0.1, gravity, integration);
            assert_relative_eq!(body.linear_velocity().y, -1.0, epsilon = 1e-6);
            assert_relative_eq!(body.position.y, position_y, epsilon = 1e-6);
        }
    }

    #[test]
    fn runge_kutta_tracks_ballistic_arc() {
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        let launch = Vec3::new(3.0, 10.0, 0.0);
        let dt = 1.0 / 60.0;

        for integration in [IntegrationType::RungeKutta2, IntegrationType::RungeKutta4] {
            let mut body = falling_body();
            body.set_linear_velocity(launch);
            body.apply_torque(Vec3::Y);
            for _ in 0..60 {
                integrate_body(&mut body, dt, gravity, integration);
            }
            let exact = launch + gravity * 0.5;
            assert_relative_eq!(body.position.x, exact.x, epsilon = 1e-3);
            assert_relative_eq!(body.position.y, exact.y, epsilon = 1e-3);
            assert_eq!(body.torque, Vec3::ZERO);
            assert_relative_eq!(body.orientation.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn zero_or_negative_dt_is_a_no_op() {
        let mut body = falling_body();
        body.set_linear_velocity(Vec3::X);
        body.apply_force(Vec3::Y);
        let before = body.clone();

        integrate_body(&mut body, 0.0, Vec3::NEG_Y, IntegrationType::SemiImplicitEuler);
        integrate_body(&mut body, -1.0, Vec3::NEG_Y, IntegrationType::SemiImplicitEuler);

        assert_eq!(body.position, before.position);
        assert_eq!(body.velocity, before.velocity);
        assert_eq!(body.force, before.force);
    }

    #[test]
    fn damping_scales_velocity() {
        let mut body = falling_body();
        body.linear_damping = 0.5;
        body.set_linear_velocity(Vec3::X * 2.0);
        integrate_body(&mut body, 0.1, Vec3::ZERO, IntegrationType::SemiImplicitEuler);
        assert_relative_eq!(body.linear_velocity().x, 2.0 * 0.95, epsilon = 1e-6);
    }

    #[test]
    fn orientation_stays_normalized() {
        let mut body = falling_body();
        body.set_angular_velocity(Vec3::new(3.0, -7.0, 11.0));
        for _ in 0..500 {
            integrate_body(&mut body, 1.0 / 60.0, Vec3::ZERO, IntegrationType::SemiImplicitEuler);
        }
        assert_relative_eq!(body.orientation.length(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn accumulators_are_cleared() {
        let mut body = falling_body();
        body.apply_force(Vec3::X);
        body.apply_torque(Vec3::Y);
        let integrator = Integrator::default();
        let mut arena = Arena::new();
        let handle = arena.insert(body);
        integrator.step(&mut arena, 1.0 / 60.0);

        let body = arena.get(handle).expect("body is live");
        assert_eq!(body.force, Vec3::ZERO);
        assert_eq!(body.torque, Vec3::ZERO);
        assert!(body.linear_velocity().x > 0.0);
    }
}
