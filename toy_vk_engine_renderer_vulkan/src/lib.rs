/*!
# Toy Vk Engine - Vulkan Backend

Vulkan implementation of the `GraphicsDevice` trait from `toy_vk_engine`,
built on ash (bindings), ash-window (surface creation) and spirq (SPIR-V
entry point checks).

Validation layer support (debug messenger routed to the engine log) is
compiled in only with the `vulkan-validation` feature.

```no_run
use std::sync::Arc;
use toy_vk_engine::toyvk::{Config, Renderer};
use toy_vk_engine_renderer_vulkan::toyvk::VulkanGraphicsDevice;
# fn run(window: &winit::window::Window, vert: &[u8], frag: &[u8]) -> toy_vk_engine::toyvk::Result<()> {
let config = Config::default();
let device = Arc::new(VulkanGraphicsDevice::new(window, &config)?);
let renderer = Renderer::new(device, &config, vert, frag)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_format;
mod vulkan_graphics_device;
mod vulkan_negotiation;
mod vulkan_pipeline;
mod vulkan_shader;
mod vulkan_swapchain;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub mod toyvk {
    pub use crate::vulkan::VulkanGraphicsDevice;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{print_validation_stats_report, validation_stats, ValidationStats};
}
