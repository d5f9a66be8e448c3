//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Rotates `orientation` by world-space angular velocity over `dt` and renormalizes.
pub fn integrate_orientation(orientation: Quat, angular: Vec3, dt: f32) -> Quat {
    (angular_velocity_to_quat(angular, dt) * orientation).normalize()
}

/// Inertia tensor of a Y-aligned capsule of cylinder length `height`.
///
/// Mass is split 60/40 between the cylinder and the two end caps, each cap
/// treated as a solid sphere at the body origin.
pub fn inertia_capsule(radius: f32, height: f32, mass: f32) -> Mat3 {
    let cylinder_mass = mass * 0.6;
    let cap_mass = (mass - cylinder_mass) * 0.5;
    let r2 = radius * radius;

    let across = (1.0 / 12.0) * cylinder_mass * (3.0 * r2 + height * height);
    let cylinder = Vec3::new(across, 0.5 * cylinder_mass * r2, across);
    let caps = Vec3::splat(2.0 * 0.4 * cap_mass * r2);
    Mat3::from_diagonal(cylinder + caps)
}

/// Matrix form of `v.cross(_)`.
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Inverse of `m`, or zero when it is singular.
pub fn safe_inverse(m: Mat3) -> Mat3 {
    let det = m.determinant();
    if det.abs() <= f32::EPSILON {
        Mat3::ZERO
    } else {
        m.inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn skew_matches_cross_product() {
        let a = Vec3::new(1.0, -2.0, 0.5);
        let b = Vec3::new(0.3, 4.0, -1.0);
        let expected = a.cross(b);
        let actual = skew(a) * b;
        assert_relative_eq!(actual.x, expected.x, epsilon = 1e-6);
        assert_relative_eq!(actual.y, expected.y, epsilon = 1e-6);
        assert_relative_eq!(actual.z, expected.z, epsilon = 1e-6);
    }

    #[test]
    fn quarter_turn_about_y() {
        let q = integrate_orientation(Quat::IDENTITY, Vec3::Y * std::f32::consts::FRAC_PI_2, 1.0);
        let rotated = q * Vec3::X;
        assert_relative_eq!(rotated.z, -1.0, epsilon = 1e-5);
    }
}
