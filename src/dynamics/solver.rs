use glam::{Mat3, Quat, Vec3};

use crate::config::{DEFAULT_BAUMGARTE_SCALAR, DEFAULT_SOLVER_ITERATIONS};
use crate::core::constraints::{
    AxisConstraint, Constraint, ConstraintId, DistanceConstraint, SpringConstraint, WeldConstraint,
};
use crate::core::rigidbody::RigidBody;
use crate::utils::allocator::Arena;
use crate::utils::math::{safe_inverse, skew};

/// Impulses smaller than this leave resting bodies asleep.
const WAKE_IMPULSE_THRESHOLD: f32 = 1e-6;

/// Anchors closer than this have no usable direction and are pushed apart
/// along [`COINCIDENT_ANCHOR_AXIS`].
const MIN_ANCHOR_SEPARATION: f32 = 1e-6;

const COINCIDENT_ANCHOR_AXIS: Vec3 = Vec3::X;

/// Sequential impulse solver for the world's constraint list.
///
/// Each substep runs [`ConstraintSolver::pre_solver_step`] once, then
/// `iterations` sweeps of [`ConstraintSolver::apply_impulses`] over the
/// constraints in insertion order.
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    pub iterations: u32,
    pub baumgarte: f32,
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SOLVER_ITERATIONS, DEFAULT_BAUMGARTE_SCALAR)
    }
}

impl ConstraintSolver {
    pub fn new(iterations: u32, baumgarte: f32) -> Self {
        Self {
            iterations: iterations.max(1),
            baumgarte,
        }
    }

    /// Runs the full solve for one substep of length `dt`.
    pub fn solve(
        &self,
        constraints: &mut [(ConstraintId, Constraint)],
        bodies: &mut Arena<RigidBody>,
        dt: f32,
    ) {
        if constraints.is_empty() || !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.pre_solver_step(constraints, bodies, dt);
        for _ in 0..self.iterations {
            self.apply_impulses(constraints, bodies);
        }
    }

    /// Caches the position-error bias of every constraint for this substep.
    pub fn pre_solver_step(
        &self,
        constraints: &mut [(ConstraintId, Constraint)],
        bodies: &Arena<RigidBody>,
        dt: f32,
    ) {
        let factor = self.baumgarte / dt;
        for (id, constraint) in constraints.iter_mut() {
            let (handle_a, handle_b) = constraint.bodies();
            let Some(a) = bodies.get(handle_a) else {
                log::debug!("constraint {id:?} skipped: body {handle_a:?} no longer exists");
                continue;
            };
            let b = match handle_b {
                Some(handle) => match bodies.get(handle) {
                    Some(b) => Some(b),
                    None => {
                        log::debug!("constraint {id:?} skipped: body {handle:?} no longer exists");
                        continue;
                    }
                },
                None => None,
            };

            match (constraint, b) {
                (Constraint::Distance(c), Some(b)) => {
                    let separation = anchor_separation(a, c.local_anchor_a, b, c.local_anchor_b);
                    c.bias = -factor * (separation - c.rest_length);
                }
                (Constraint::Spring(c), Some(b)) => {
                    let separation = anchor_separation(a, c.local_anchor_a, b, c.local_anchor_b);
                    c.bias = -factor * (separation - c.rest_length);
                }
                (Constraint::Weld(c), Some(b)) => pre_solve_weld(c, a, b, factor),
                _ => {}
            }
        }
    }

    /// One Gauss-Seidel sweep over every constraint.
    pub fn apply_impulses(
        &self,
        constraints: &mut [(ConstraintId, Constraint)],
        bodies: &mut Arena<RigidBody>,
    ) {
        for (_, constraint) in constraints.iter_mut() {
            match constraint {
                Constraint::Distance(c) => {
                    if let Some((a, b)) = bodies.get2_mut(c.body_a, c.body_b) {
                        apply_distance(c, a, b);
                    }
                }
                Constraint::Spring(c) => {
                    if let Some((a, b)) = bodies.get2_mut(c.body_a, c.body_b) {
                        apply_spring(c, a, b);
                    }
                }
                Constraint::Weld(c) => {
                    if let Some((a, b)) = bodies.get2_mut(c.body_a, c.body_b) {
                        apply_weld(c, a, b);
                    }
                }
                Constraint::Axis(c) => {
                    if let Some(body) = bodies.get_mut(c.body) {
                        apply_axis(c, body);
                    }
                }
            }
        }
    }
}

fn anchor_separation(a: &RigidBody, local_a: Vec3, b: &RigidBody, local_b: Vec3) -> f32 {
    let pa = a.position + a.orientation * local_a;
    let pb = b.position + b.orientation * local_b;
    pa.distance(pb)
}

/// Anchor arms, unit axis A->B, effective mass and relative anchor speed
/// `n . (v_b - v_a)` of a two-body distance link.
struct AxialLink {
    r_a: Vec3,
    r_b: Vec3,
    normal: Vec3,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_inertia_a: Mat3,
    inv_inertia_b: Mat3,
    effective_mass: f32,
    relative_speed: f32,
}

impl AxialLink {
    fn new(a: &RigidBody, local_a: Vec3, b: &RigidBody, local_b: Vec3) -> Option<Self> {
        let inv_mass_a = a.inverse_mass();
        let inv_mass_b = b.inverse_mass();
        if inv_mass_a + inv_mass_b <= 0.0 {
            return None;
        }

        let r_a = a.orientation * local_a;
        let r_b = b.orientation * local_b;
        let ab = (b.position + r_b) - (a.position + r_a);
        let length = ab.length();
        let normal = if length < MIN_ANCHOR_SEPARATION {
            COINCIDENT_ANCHOR_AXIS
        } else {
            ab / length
        };

        let inv_inertia_a = a.world_inverse_inertia();
        let inv_inertia_b = b.world_inverse_inertia();
        let angular = (inv_inertia_a * r_a.cross(normal)).cross(r_a)
            + (inv_inertia_b * r_b.cross(normal)).cross(r_b);
        let effective_mass = inv_mass_a + inv_mass_b + normal.dot(angular);
        if effective_mass <= f32::EPSILON {
            return None;
        }

        let v_a = a.velocity.linear + a.velocity.angular.cross(r_a);
        let v_b = b.velocity.linear + b.velocity.angular.cross(r_b);

        Some(Self {
            r_a,
            r_b,
            normal,
            inv_mass_a,
            inv_mass_b,
            inv_inertia_a,
            inv_inertia_b,
            effective_mass,
            relative_speed: normal.dot(v_b - v_a),
        })
    }

    /// Applies `+j * n` to A and `-j * n` to B.
    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, j: f32) {
        if !j.is_finite() || j == 0.0 {
            return;
        }
        let impulse = self.normal * j;
        push(a, impulse, self.r_a, self.inv_mass_a, self.inv_inertia_a);
        push(b, -impulse, self.r_b, self.inv_mass_b, self.inv_inertia_b);
    }
}

/// Velocity change from an impulse at arm `r`; wakes the body when it matters.
fn push(body: &mut RigidBody, impulse: Vec3, r: Vec3, inv_mass: f32, inv_inertia: Mat3) {
    if body.is_static() {
        return;
    }
    body.velocity.linear += impulse * inv_mass;
    body.velocity.angular += inv_inertia * r.cross(impulse);
    if impulse.length_squared() > WAKE_IMPULSE_THRESHOLD * WAKE_IMPULSE_THRESHOLD {
        body.wake_up();
    }
}

fn apply_distance(c: &DistanceConstraint, a: &mut RigidBody, b: &mut RigidBody) {
    let Some(link) = AxialLink::new(a, c.local_anchor_a, b, c.local_anchor_b) else {
        return;
    };
    let j = (link.relative_speed - c.bias) / link.effective_mass;
    link.apply(a, b, j);
}

fn apply_spring(c: &SpringConstraint, a: &mut RigidBody, b: &mut RigidBody) {
    let Some(link) = AxialLink::new(a, c.local_anchor_a, b, c.local_anchor_b) else {
        return;
    };
    let j = (c.damping * link.relative_speed - c.stiffness * c.bias) / link.effective_mass;
    link.apply(a, b, j);
}

/// Rotation that takes `target` onto `current`, as a world-space rotation vector.
fn rotation_error(current: Quat, target: Quat) -> Vec3 {
    let mut delta = current * target.inverse();
    if delta.w < 0.0 {
        delta = -delta;
    }
    let (axis, angle) = delta.normalize().to_axis_angle();
    if angle.is_finite() {
        axis * angle
    } else {
        Vec3::ZERO
    }
}

fn pre_solve_weld(c: &mut WeldConstraint, a: &RigidBody, b: &RigidBody, factor: f32) {
    let pa = a.position + a.orientation * c.local_anchor_a;
    let pb = b.position + b.orientation * c.local_anchor_b;
    c.linear_bias = (pb - pa) * factor;

    let target = a.orientation * c.orientation_offset;
    c.angular_bias = rotation_error(b.orientation, target) * factor;
}

fn apply_weld(c: &WeldConstraint, a: &mut RigidBody, b: &mut RigidBody) {
    let inv_mass_a = a.inverse_mass();
    let inv_mass_b = b.inverse_mass();
    if inv_mass_a + inv_mass_b <= 0.0 {
        return;
    }
    let inv_inertia_a = a.world_inverse_inertia();
    let inv_inertia_b = b.world_inverse_inertia();

    // Point-to-point lock.
    {
        let r_a = a.orientation * c.local_anchor_a;
        let r_b = b.orientation * c.local_anchor_b;
        let v_a = a.velocity.linear + a.velocity.angular.cross(r_a);
        let v_b = b.velocity.linear + b.velocity.angular.cross(r_b);
        let relative = v_b - v_a;

        let skew_a = skew(r_a);
        let skew_b = skew(r_b);
        let k = Mat3::IDENTITY * (inv_mass_a + inv_mass_b)
            - skew_a * inv_inertia_a * skew_a
            - skew_b * inv_inertia_b * skew_b;
        let impulse = safe_inverse(k) * -(relative + c.linear_bias);

        push(a, -impulse, r_a, inv_mass_a, inv_inertia_a);
        push(b, impulse, r_b, inv_mass_b, inv_inertia_b);
    }

    // Orientation lock.
    {
        let k = inv_inertia_a + inv_inertia_b;
        let relative = b.velocity.angular - a.velocity.angular;
        let impulse = safe_inverse(k) * -(relative + c.angular_bias);
        if impulse == Vec3::ZERO {
            return;
        }
        let awake = impulse.length_squared() > WAKE_IMPULSE_THRESHOLD * WAKE_IMPULSE_THRESHOLD;
        if !a.is_static() {
            a.velocity.angular -= inv_inertia_a * impulse;
            if awake {
                a.wake_up();
            }
        }
        if !b.is_static() {
            b.velocity.angular += inv_inertia_b * impulse;
            if awake {
                b.wake_up();
            }
        }
    }
}

fn apply_axis(c: &AxisConstraint, body: &mut RigidBody) {
    if body.is_static() {
        return;
    }
    body.velocity.linear = c.linear.remove_from(body.velocity.linear);
    body.velocity.angular = c.angular.remove_from(body.velocity.angular);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constraints::AxisMask;
    use crate::core::shape::CollisionShape;
    use crate::core::types::Axis;
    use approx::assert_relative_eq;

    fn ball(position: Vec3) -> RigidBody {
        RigidBody::builder()
            .position(position)
            .shape(CollisionShape::sphere(0.5))
            .build()
    }

    #[test]
    fn distance_impulse_cancels_separating_velocity() {
        let mut bodies = Arena::new();
        let a = bodies.insert(ball(Vec3::ZERO));
        let b = bodies.insert(ball(Vec3::X));
        if let Some(body) = bodies.get_mut(b) {
            body.set_linear_velocity(Vec3::X * 2.0);
        }
        let mut constraints = vec![(
            ConstraintId(0),
            Constraint::Distance(DistanceConstraint::new(a, b, Vec3::ZERO, Vec3::ZERO, 1.0)),
        )];

        ConstraintSolver::new(1, 0.1).solve(&mut constraints, &mut bodies, 1.0 / 60.0);

        let va = bodies.get(a).map(|b| b.linear_velocity()).unwrap_or_default();
        let vb = bodies.get(b).map(|b| b.linear_velocity()).unwrap_or_default();
        assert_relative_eq!(vb.x - va.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(va.x + vb.x, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn coincident_anchors_separate_along_fallback_axis() {
        let mut bodies = Arena::new();
        let a = bodies.insert(ball(Vec3::ZERO));
        let b = bodies.insert(ball(Vec3::ZERO));
        let mut constraints = vec![(
            ConstraintId(0),
            Constraint::Distance(DistanceConstraint::new(a, b, Vec3::ZERO, Vec3::ZERO, 1.0)),
        )];

        ConstraintSolver::new(1, 0.1).solve(&mut constraints, &mut bodies, 1.0 / 60.0);

        let va = bodies.get(a).map(|b| b.linear_velocity()).unwrap_or_default();
        let vb = bodies.get(b).map(|b| b.linear_velocity()).unwrap_or_default();
        assert!(va.x < 0.0 && vb.x > 0.0, "bodies did not separate: {va} {vb}");
        assert_relative_eq!(va.x + vb.x, 0.0, epsilon = 1e-5);
        assert_eq!(va.y, 0.0);
        assert_eq!(vb.z, 0.0);
    }

    #[test]
    fn static_partner_takes_no_impulse() {
        let mut bodies = Arena::new();
        let anchor = bodies.insert(RigidBody::builder().static_body().sphere(0.5).build());
        let bob = bodies.insert(ball(Vec3::new(0.0, -3.0, 0.0)));
        let mut constraints = vec![(
            ConstraintId(0),
            Constraint::Distance(DistanceConstraint::new(anchor, bob, Vec3::ZERO, Vec3::ZERO, 2.0)),
        )];

        ConstraintSolver::default().solve(&mut constraints, &mut bodies, 1.0 / 60.0);

        let fixed = bodies.get(anchor).map(|b| b.linear_velocity());
        assert_eq!(fixed, Some(Vec3::ZERO));
        let pulled = bodies.get(bob).map(|b| b.linear_velocity().y).unwrap_or_default();
        assert!(pulled > 0.0);
    }

    #[test]
    fn stale_body_skips_constraint() {
        let mut bodies = Arena::new();
        let a = bodies.insert(ball(Vec3::ZERO));
        let b = bodies.insert(ball(Vec3::X * 3.0));
        bodies.remove(b);
        let mut constraints = vec![(
            ConstraintId(7),
            Constraint::Distance(DistanceConstraint::new(a, b, Vec3::ZERO, Vec3::ZERO, 1.0)),
        )];

        ConstraintSolver::default().solve(&mut constraints, &mut bodies, 1.0 / 60.0);
        assert_eq!(bodies.get(a).map(|b| b.linear_velocity()), Some(Vec3::ZERO));
    }

    #[test]
    fn weld_matches_velocities_of_attached_bodies() {
        let mut bodies = Arena::new();
        let a = bodies.insert(ball(Vec3::ZERO));
        let b = bodies.insert(ball(Vec3::X));
        let weld = {
            let (ba, bb) = (bodies.get(a), bodies.get(b));
            match (ba, bb) {
                (Some(ba), Some(bb)) => WeldConstraint::from_current_pose((a, ba), (b, bb)),
                _ => panic!("bodies were just inserted"),
            }
        };
        if let Some(body) = bodies.get_mut(b) {
            body.set_linear_velocity(Vec3::Y);
        }
        let mut constraints = vec![(ConstraintId(0), Constraint::Weld(weld))];

        let solver = ConstraintSolver::new(10, 0.1);
        solver.solve(&mut constraints, &mut bodies, 1.0 / 60.0);

        let (Some(ba), Some(bb)) = (bodies.get(a), bodies.get(b)) else {
            panic!("bodies are live");
        };
        let r_a = Vec3::X * 0.5;
        let r_b = Vec3::X * -0.5;
        let pa = ba.linear_velocity() + ba.angular_velocity().cross(r_a);
        let pb = bb.linear_velocity() + bb.angular_velocity().cross(r_b);
        assert_relative_eq!(pa.y, pb.y, epsilon = 1e-3);
        assert_relative_eq!(ba.angular_velocity().z, bb.angular_velocity().z, epsilon = 1e-3);
    }

    #[test]
    fn axis_constraint_removes_locked_components() {
        let mut bodies = Arena::new();
        let body = bodies.insert(ball(Vec3::ZERO));
        if let Some(b) = bodies.get_mut(body) {
            b.set_linear_velocity(Vec3::new(1.0, 2.0, 3.0));
            b.set_angular_velocity(Vec3::new(4.0, 5.0, 6.0));
        }
        let mut constraints = vec![(
            ConstraintId(0),
            Constraint::Axis(AxisConstraint::new(body, AxisMask::only(Axis::Y), AxisMask::ALL)),
        )];

        ConstraintSolver::default().solve(&mut constraints, &mut bodies, 1.0 / 60.0);

        let b = bodies.get(body).map(|b| (b.linear_velocity(), b.angular_velocity()));
        assert_eq!(b, Some((Vec3::new(1.0, 0.0, 3.0), Vec3::ZERO)));
    }
}
