/// Drawable instance: a transform plus the surface it draws.
///
/// Objects are plain per-scene data supplied by the caller every frame.
/// Several objects may share one surface.

use glam::{Mat4, Vec3};

use crate::resource::SurfaceKey;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Object {
    pub position: Vec3,
    /// Euler angles in degrees, applied X then Y then Z
    pub rotation: Vec3,
    pub surface: SurfaceKey,
}

impl Object {
    pub fn new(position: Vec3, rotation: Vec3, surface: SurfaceKey) -> Self {
        Self { position, rotation, surface }
    }

    /// Rx · Ry · Rz · T
    ///
    /// The translation is expressed in the rotated frame: a grid laid out in
    /// XY with rotation (-90, 0, 0) ends up on the XZ plane.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians())
            * Mat4::from_translation(self.position)
    }
}

#[cfg(test)]
#[path = "object_tests.rs"]
mod tests;
