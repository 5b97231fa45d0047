/// Keyboard and mouse state mapped onto camera motion
///
/// Keys are tracked as held/released from window events; the movement is
/// applied once per fixed tick so speed does not depend on frame rate.

use toy_vk_engine::toyvk::scene::Camera;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeldKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

#[derive(Debug, Default)]
pub struct CameraController {
    keys: HeldKeys,
    /// Mouse motion accumulated since the last `apply`
    pending_look: (f64, f64),
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> HeldKeys {
        self.keys
    }

    /// Record a key transition. Returns false for keys the camera ignores.
    pub fn process_key(&mut self, code: KeyCode, state: ElementState) -> bool {
        let pressed = state == ElementState::Pressed;
        let slot = match code {
            KeyCode::KeyW => &mut self.keys.forward,
            KeyCode::KeyS => &mut self.keys.back,
            KeyCode::KeyA => &mut self.keys.left,
            KeyCode::KeyD => &mut self.keys.right,
            KeyCode::Space => &mut self.keys.up,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut self.keys.down,
            _ => return false,
        };
        *slot = pressed;
        true
    }

    /// Raw mouse motion while the cursor is captured
    pub fn process_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.pending_look.0 += dx;
        self.pending_look.1 += dy;
    }

    /// Forget held keys, e.g. when the window loses focus
    pub fn release_all(&mut self) {
        self.keys = HeldKeys::default();
        self.pending_look = (0.0, 0.0);
    }

    /// Apply pending mouse look and `ticks` fixed steps of movement
    pub fn apply(&mut self, camera: &mut Camera, ticks: u32) {
        let (dx, dy) = std::mem::take(&mut self.pending_look);
        if dx != 0.0 || dy != 0.0 {
            // Screen Y grows downward, pitch grows upward
            camera.look(dx as f32, -dy as f32);
        }

        if ticks == 0 {
            return;
        }
        let ticks = ticks as f32;
        let axis = |positive: bool, negative: bool| (positive as i8 - negative as i8) as f32;

        let forward = axis(self.keys.forward, self.keys.back);
        let right = axis(self.keys.right, self.keys.left);
        let up = axis(self.keys.up, self.keys.down);
        if forward != 0.0 {
            camera.move_forward(forward * ticks);
        }
        if right != 0.0 {
            camera.move_right(right * ticks);
        }
        if up != 0.0 {
            camera.move_up(up * ticks);
        }
    }
}

#[cfg(test)]
#[path = "camera_controller_tests.rs"]
mod tests;
