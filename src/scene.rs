//! Hand-off of simulated transforms to the scene graph.

use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::core::types::Transform;
use crate::utils::allocator::BodyHandle;

/// Receives the world position and orientation of each body once per frame.
///
/// The scene owns scale and hierarchy; physics only writes what it simulates.
pub trait TransformSink {
    fn set_world_transform(&mut self, body: BodyHandle, position: Vec3, orientation: Quat);
}

impl TransformSink for HashMap<BodyHandle, Transform> {
    fn set_world_transform(&mut self, body: BodyHandle, position: Vec3, orientation: Quat) {
        let transform = self.entry(body).or_default();
        transform.position = position;
        transform.rotation = orientation;
    }
}

impl<F> TransformSink for F
where
    F: FnMut(BodyHandle, Vec3, Quat),
{
    fn set_world_transform(&mut self, body: BodyHandle, position: Vec3, orientation: Quat) {
        self(body, position, orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sink_keeps_scale() {
        let handle = BodyHandle::new(0, 0);
        let mut scene = HashMap::new();
        scene.insert(
            handle,
            Transform {
                scale: Vec3::splat(2.0),
                ..Transform::default()
            },
        );

        scene.set_world_transform(handle, Vec3::X, Quat::from_rotation_z(1.0));

        let transform = scene[&handle];
        assert_eq!(transform.position, Vec3::X);
        assert_eq!(transform.scale, Vec3::splat(2.0));
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        let mut sink = |body: BodyHandle, position: Vec3, _: Quat| seen.push((body, position));
        sink.set_world_transform(BodyHandle::new(4, 1), Vec3::Y, Quat::IDENTITY);
        assert_eq!(seen, vec![(BodyHandle::new(4, 1), Vec3::Y)]);
    }
}
