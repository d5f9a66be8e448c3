use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::types::Aabb;
use crate::error::PhysicsError;
use crate::utils::math::inertia_capsule;

/// Discriminant of [`CollisionShape`], used when a shape is requested by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Sphere,
    Cuboid,
    Pyramid,
    Capsule,
    Custom,
}

/// Closed set of collision geometries a rigid body can own.
///
/// Pyramids have a square base in the local XZ plane at `-half_extents.y`
/// and their apex at `+half_extents.y`. Capsules run along local Y, with
/// hemisphere centres at `±half_height`. Custom shapes are convex point hulls
/// given in body-local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
    Pyramid { half_extents: Vec3 },
    Capsule { radius: f32, half_height: f32 },
    Custom { vertices: Vec<Vec3> },
}

impl CollisionShape {
    pub fn sphere(radius: f32) -> Self {
        CollisionShape::Sphere { radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        CollisionShape::Cuboid { half_extents }
    }

    pub fn pyramid(half_extents: Vec3) -> Self {
        CollisionShape::Pyramid { half_extents }
    }

    pub fn capsule(radius: f32, half_height: f32) -> Self {
        CollisionShape::Capsule {
            radius,
            half_height,
        }
    }

    pub fn custom(vertices: Vec<Vec3>) -> Self {
        CollisionShape::Custom { vertices }
    }

    /// Builds a shape of `kind` sized by `half_extents`.
    ///
    /// Spheres use the largest half extent as radius. Capsules take their
    /// radius from the larger of x and z and span `half_extents.y` in total.
    /// Custom hulls need explicit vertices and cannot be requested this way.
    pub fn from_kind(kind: ShapeKind, half_extents: Vec3) -> Result<Self, PhysicsError> {
        match kind {
            ShapeKind::Sphere => Ok(CollisionShape::Sphere {
                radius: half_extents.max_element(),
            }),
            ShapeKind::Cuboid => Ok(CollisionShape::Cuboid { half_extents }),
            ShapeKind::Pyramid => Ok(CollisionShape::Pyramid { half_extents }),
            ShapeKind::Capsule => {
                let radius = half_extents.x.max(half_extents.z);
                Ok(CollisionShape::Capsule {
                    radius,
                    half_height: (half_extents.y - radius).max(0.0),
                })
            }
            ShapeKind::Custom => Err(PhysicsError::UnsupportedShape(kind)),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            CollisionShape::Sphere { .. } => ShapeKind::Sphere,
            CollisionShape::Cuboid { .. } => ShapeKind::Cuboid,
            CollisionShape::Pyramid { .. } => ShapeKind::Pyramid,
            CollisionShape::Capsule { .. } => ShapeKind::Capsule,
            CollisionShape::Custom { .. } => ShapeKind::Custom,
        }
    }

    /// Local-space inverse inertia tensor for a body of the given inverse mass.
    ///
    /// A static body (`inv_mass == 0`) always gets the zero tensor, as does any
    /// degenerate shape.
    pub fn build_inverse_inertia(&self, inv_mass: f32) -> Mat3 {
        if inv_mass <= 0.0 {
            return Mat3::ZERO;
        }
        match self {
            CollisionShape::Sphere { radius } => {
                let r2 = radius * radius;
                if r2 <= f32::EPSILON {
                    return Mat3::ZERO;
                }
                Mat3::from_diagonal(Vec3::splat(2.5 * inv_mass / r2))
            }
            CollisionShape::Cuboid { half_extents } => cuboid_inverse_inertia(*half_extents, inv_mass),
            CollisionShape::Pyramid { half_extents } => {
                let dims = *half_extents * 2.0;
                let sq = dims * dims;
                let denominators = Vec3::new(
                    0.2 * sq.x + 0.15 * sq.y,
                    0.2 * sq.z + 0.15 * sq.y,
                    0.2 * sq.z + 0.2 * sq.x,
                );
                if denominators.min_element() <= f32::EPSILON {
                    return Mat3::ZERO;
                }
                Mat3::from_diagonal(Vec3::splat(3.0 * inv_mass) / denominators)
            }
            CollisionShape::Capsule {
                radius,
                half_height,
            } => {
                if *radius <= f32::EPSILON {
                    return Mat3::ZERO;
                }
                let inertia = inertia_capsule(*radius, 2.0 * half_height, 1.0 / inv_mass);
                let principal = Vec3::new(inertia.x_axis.x, inertia.y_axis.y, inertia.z_axis.z);
                Mat3::from_diagonal(Vec3::ONE / principal)
            }
            // Approximated by the hull's local bounding box.
            CollisionShape::Custom { vertices } => {
                if vertices.is_empty() {
                    return Mat3::ZERO;
                }
                cuboid_inverse_inertia(Aabb::from_points(vertices).half_extents(), inv_mass)
            }
        }
    }

    /// Local-space bounds, centred on the body origin for every built-in shape.
    pub fn local_aabb(&self) -> Aabb {
        match self {
            CollisionShape::Sphere { radius } => {
                Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(*radius))
            }
            CollisionShape::Cuboid { half_extents } | CollisionShape::Pyramid { half_extents } => {
                Aabb::from_center_half_extents(Vec3::ZERO, *half_extents)
            }
            CollisionShape::Capsule {
                radius,
                half_height,
            } => Aabb::from_center_half_extents(
                Vec3::ZERO,
                Vec3::new(*radius, half_height + radius, *radius),
            ),
            CollisionShape::Custom { vertices } => {
                if vertices.is_empty() {
                    Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ZERO)
                } else {
                    Aabb::from_points(vertices)
                }
            }
        }
    }

    /// World-space bounds of the shape placed at `position` with `orientation`.
    ///
    /// The result always contains the oriented shape; it may be larger.
    pub fn world_space_aabb(&self, position: Vec3, orientation: Quat) -> Aabb {
        match self {
            CollisionShape::Sphere { radius } => {
                Aabb::from_center_half_extents(position, Vec3::splat(*radius))
            }
            CollisionShape::Cuboid { .. } | CollisionShape::Pyramid { .. } => {
                self.local_aabb().transformed(orientation, position)
            }
            CollisionShape::Capsule {
                radius,
                half_height,
            } => {
                let axis = orientation * Vec3::new(0.0, *half_height, 0.0);
                let mut bounds = Aabb::from_points(&[position + axis, position - axis]);
                bounds.min -= Vec3::splat(*radius);
                bounds.max += Vec3::splat(*radius);
                bounds
            }
            CollisionShape::Custom { vertices } => {
                if vertices.is_empty() {
                    return Aabb::from_center_half_extents(position, Vec3::ZERO);
                }
                let mut bounds = Aabb::empty();
                for vertex in vertices {
                    bounds.extend(position + orientation * *vertex);
                }
                bounds
            }
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        match self {
            CollisionShape::Sphere { radius } => *radius,
            CollisionShape::Cuboid { half_extents } | CollisionShape::Pyramid { half_extents } => {
                half_extents.length()
            }
            CollisionShape::Capsule {
                radius,
                half_height,
            } => radius + half_height,
            CollisionShape::Custom { vertices } => {
                vertices.iter().map(|v| v.length()).fold(0.0, f32::max)
            }
        }
    }
}

fn cuboid_inverse_inertia(half_extents: Vec3, inv_mass: f32) -> Mat3 {
    let dims = half_extents * 2.0;
    let sq = dims * dims;
    let denominators = Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y);
    if denominators.min_element() <= f32::EPSILON {
        return Mat3::ZERO;
    }
    Mat3::from_diagonal(Vec3::splat(12.0 * inv_mass) / denominators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_inverse_inertia_matches_solid_sphere() {
        // I = 2/5 m r^2 with m = 2, r = 0.5 -> I = 0.2
        let inv = CollisionShape::sphere(0.5).build_inverse_inertia(0.5);
        assert_relative_eq!(inv.x_axis.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(inv.y_axis.y, 5.0, epsilon = 1e-5);
        assert_relative_eq!(inv.z_axis.z, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn cuboid_inverse_inertia_matches_box_formula() {
        // 1 x 2 x 3 box of mass 1: Ixx = (4 + 9) / 12
        let inv = CollisionShape::cuboid(Vec3::new(0.5, 1.0, 1.5)).build_inverse_inertia(1.0);
        assert_relative_eq!(inv.x_axis.x, 12.0 / 13.0, epsilon = 1e-5);
        assert_relative_eq!(inv.y_axis.y, 12.0 / 10.0, epsilon = 1e-5);
        assert_relative_eq!(inv.z_axis.z, 12.0 / 5.0, epsilon = 1e-5);
    }

    #[test]
    fn static_and_degenerate_shapes_have_zero_inverse_inertia() {
        assert_eq!(CollisionShape::sphere(1.0).build_inverse_inertia(0.0), Mat3::ZERO);
        assert_eq!(CollisionShape::sphere(0.0).build_inverse_inertia(1.0), Mat3::ZERO);
        assert_eq!(
            CollisionShape::cuboid(Vec3::new(1.0, 0.0, 0.0)).build_inverse_inertia(1.0),
            Mat3::ZERO
        );
        assert_eq!(CollisionShape::custom(Vec::new()).build_inverse_inertia(1.0), Mat3::ZERO);
    }

    #[test]
    fn pyramid_inverse_inertia_is_positive_diagonal() {
        let inv = CollisionShape::pyramid(Vec3::splat(0.5)).build_inverse_inertia(1.0);
        assert_relative_eq!(inv.x_axis.x, 3.0 / 0.35, epsilon = 1e-4);
        assert_relative_eq!(inv.z_axis.z, 3.0 / 0.4, epsilon = 1e-4);
        assert_eq!(inv.x_axis.y, 0.0);
    }

    #[test]
    fn capsule_inertia_is_symmetric_about_its_axis() {
        let inv = CollisionShape::capsule(0.5, 1.0).build_inverse_inertia(1.0);
        assert_relative_eq!(inv.x_axis.x, inv.z_axis.z, epsilon = 1e-6);
        // Spinning about the long axis is easiest.
        assert!(inv.y_axis.y > inv.x_axis.x);
        assert_eq!(CollisionShape::capsule(0.0, 1.0).build_inverse_inertia(1.0), Mat3::ZERO);
        assert_eq!(CollisionShape::capsule(0.5, 1.0).build_inverse_inertia(0.0), Mat3::ZERO);
    }

    #[test]
    fn capsule_from_kind_fits_half_extents() {
        let capsule = CollisionShape::from_kind(ShapeKind::Capsule, Vec3::new(0.5, 2.0, 0.25));
        assert!(matches!(
            capsule,
            Ok(CollisionShape::Capsule { radius, half_height }) if radius == 0.5 && half_height == 1.5
        ));
        if let Ok(shape) = capsule {
            assert_eq!(shape.kind(), ShapeKind::Capsule);
            assert_eq!(shape.local_aabb().half_extents(), Vec3::new(0.5, 2.0, 0.5));
        }
    }

    #[test]
    fn custom_kind_cannot_be_built_from_dimensions() {
        let result = CollisionShape::from_kind(ShapeKind::Custom, Vec3::ONE);
        assert!(matches!(result, Err(PhysicsError::UnsupportedShape(ShapeKind::Custom))));
        let sphere = CollisionShape::from_kind(ShapeKind::Sphere, Vec3::new(0.2, 0.7, 0.1));
        assert!(matches!(sphere, Ok(CollisionShape::Sphere { radius }) if radius == 0.7));
    }

    #[test]
    fn world_aabb_contains_every_rotated_vertex() {
        let half = Vec3::new(1.0, 0.5, 2.0);
        let rotation = Quat::from_euler(glam::EulerRot::XYZ, 0.3, 1.1, -0.7);
        let position = Vec3::new(3.0, -2.0, 1.0);

        for shape in [CollisionShape::cuboid(half), CollisionShape::pyramid(half)] {
            let aabb = shape.world_space_aabb(position, rotation);
            for corner in Aabb::from_center_half_extents(Vec3::ZERO, half).corners() {
                let world = position + rotation * corner;
                assert!(world.cmpge(aabb.min - Vec3::splat(1e-5)).all());
                assert!(world.cmple(aabb.max + Vec3::splat(1e-5)).all());
            }
        }

        let capsule = CollisionShape::capsule(0.5, 1.5);
        let aabb = capsule.world_space_aabb(position, rotation);
        for end in [Vec3::Y * 1.5, Vec3::NEG_Y * 1.5] {
            let centre = position + rotation * end;
            for offset in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
                let world = centre + offset * 0.5;
                assert!(world.cmpge(aabb.min - Vec3::splat(1e-5)).all());
                assert!(world.cmple(aabb.max + Vec3::splat(1e-5)).all());
            }
        }
        // Tighter than the rotated local box.
        let boxed = capsule.local_aabb().transformed(rotation, position);
        assert!(aabb.half_extents().cmple(boxed.half_extents() + Vec3::splat(1e-5)).all());

        let hull = CollisionShape::custom(vec![Vec3::X, Vec3::Y * 2.0, Vec3::NEG_Z]);
        let aabb = hull.world_space_aabb(position, rotation);
        for vertex in [Vec3::X, Vec3::Y * 2.0, Vec3::NEG_Z] {
            let world = position + rotation * vertex;
            assert!(world.cmpge(aabb.min - Vec3::splat(1e-5)).all());
            assert!(world.cmple(aabb.max + Vec3::splat(1e-5)).all());
        }
    }
}
