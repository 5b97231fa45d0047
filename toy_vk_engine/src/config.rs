//! Renderer configuration
//!
//! Built in code by the application; there is no file or command-line layer.

use crate::error::Result;

/// Startup configuration shared by the backend and the core
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Window title, also used as the Vulkan application name
    pub title: String,
    pub app_version: (u32, u32, u32),
    /// Requested window size in pixels
    pub width: u32,
    pub height: u32,
    /// Size of the frame ring. Must not exceed the swapchain image count.
    pub frames_in_flight: u32,
    /// Capacity of the shared descriptor pool (one set per surface instance per frame)
    pub max_descriptor_sets: u32,
    /// Enable VK_LAYER_KHRONOS_validation (also needs the `vulkan-validation` feature)
    pub enable_validation: bool,
    /// Precompiled SPIR-V, relative to the resource directory
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub clear_color: [f32; 4],
    pub fov_y_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Toy Vk Renderer".to_string(),
            app_version: (1, 0, 0),
            width: 800,
            height: 600,
            frames_in_flight: 2,
            max_descriptor_sets: 1024,
            enable_validation: cfg!(debug_assertions),
            vertex_shader: "shaders/vert.spv".to_string(),
            fragment_shader: "shaders/frag.spv".to_string(),
            clear_color: [0.0, 0.0, 0.0, 0.0],
            fov_y_degrees: 45.0,
            near_plane: 0.1,
            far_plane: 100.0,
        }
    }
}

impl Config {
    /// Reject values no device could satisfy
    ///
    /// The frames-in-flight vs. swapchain image count check needs the
    /// negotiated swapchain and happens in `FrameSynchronizer::new`.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            crate::engine_bail!(
                "toyvk::config",
                Configuration,
                "Window size must be non-zero (got {}x{})",
                self.width,
                self.height
            );
        }
        if self.frames_in_flight == 0 {
            crate::engine_bail!("toyvk::config", Configuration, "frames_in_flight must be at least 1");
        }
        if self.max_descriptor_sets < self.frames_in_flight {
            crate::engine_bail!(
                "toyvk::config",
                Configuration,
                "max_descriptor_sets ({}) cannot hold one surface at {} frames in flight",
                self.max_descriptor_sets,
                self.frames_in_flight
            );
        }
        if !(self.near_plane > 0.0 && self.far_plane > self.near_plane) {
            crate::engine_bail!(
                "toyvk::config",
                Configuration,
                "Invalid depth range: near {} far {}",
                self.near_plane,
                self.far_plane
            );
        }
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            crate::engine_bail!(
                "toyvk::config",
                Configuration,
                "Vertical field of view must be in (0, 180) degrees (got {})",
                self.fov_y_degrees
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
