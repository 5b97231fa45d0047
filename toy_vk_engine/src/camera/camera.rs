/// Camera: position plus yaw/pitch orientation.
///
/// The camera only holds state and derives matrices from it. Mapping
/// keyboard and mouse input to `look`/`move_*` calls is the application's job.

use glam::{Mat4, Vec3};

use crate::graphics_device::Extent2D;

/// Lowest pitch, in degrees
pub const MIN_PITCH: f32 = -50.0;
/// Highest pitch, in degrees
pub const MAX_PITCH: f32 = 75.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    /// Degrees around Y, 0 looks down +X
    yaw: f32,
    /// Degrees, clamped to [MIN_PITCH, MAX_PITCH]
    pitch: f32,
    /// Degrees per unit of mouse motion
    sensitivity: f32,
    /// Units per fixed tick
    move_speed: f32,
    direction: Vec3,
}

impl Default for Camera {
    /// At (-2, 0, -2) looking toward the origin
    fn default() -> Self {
        Self::new(Vec3::new(-2.0, 0.0, -2.0), 45.0, 0.0)
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let pitch = pitch.clamp(MIN_PITCH, MAX_PITCH);
        Self {
            position,
            yaw,
            pitch,
            sensitivity: 0.1,
            move_speed: 0.1,
            direction: direction_from(yaw, pitch),
        }
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Unit view direction
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    pub fn set_move_speed(&mut self, move_speed: f32) {
        self.move_speed = move_speed;
    }

    // ===== MOTION =====

    /// Apply a mouse delta (in pixels)
    pub fn look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(MIN_PITCH, MAX_PITCH);
        self.direction = direction_from(self.yaw, self.pitch);
    }

    /// Move along the view direction; negative moves back
    pub fn move_forward(&mut self, ticks: f32) {
        self.position += self.direction * self.move_speed * ticks;
    }

    /// Strafe perpendicular to the view direction; negative moves left
    pub fn move_right(&mut self, ticks: f32) {
        let right = self.direction.cross(Vec3::Y).normalize_or_zero();
        self.position += right * self.move_speed * ticks;
    }

    /// Straight up along world Y; negative moves down
    pub fn move_up(&mut self, ticks: f32) {
        self.position += Vec3::Y * self.move_speed * ticks;
    }

    // ===== MATRICES =====

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.direction, Vec3::Y)
    }
}

/// Perspective projection with depth in [0, 1] and Y flipped for Vulkan clip space
pub fn projection_matrix(extent: Extent2D, fov_y_degrees: f32, near: f32, far: f32) -> Mat4 {
    let mut proj = Mat4::perspective_rh(fov_y_degrees.to_radians(), extent.aspect_ratio(), near, far);
    proj.y_axis.y *= -1.0;
    proj
}

fn direction_from(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
