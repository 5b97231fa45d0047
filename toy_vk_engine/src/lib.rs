/*!
# Toy Vk Engine

Backend-agnostic core of a minimal Vulkan-style 3D renderer.

The core drives a graphics device through the `GraphicsDevice` trait: the
staging upload protocol, the frames-in-flight ring and the per-frame draw
loop are written once here. The Vulkan backend lives in
`toy_vk_engine_renderer_vulkan`; tests use an in-crate simulated device.

## Architecture

- **Negotiator**: scores device candidates and picks surface format, present mode, extent and image count
- **Memory**: memory-type selection, owned buffers/images, staging uploads and layout transitions
- **Frame**: fixed ring of fences, semaphores and command buffers
- **Resource**: texture cache, surfaces and their per-frame descriptor sets
- **Render**: the `Renderer` that records, submits and presents each frame
- **Scene / Camera**: drawable instances and the view/projection they are seen through

Every error is fatal: it propagates as `toyvk::Error` up to `Engine::fatal`.
*/

// Internal modules
mod error;
mod engine;
mod config;
mod frame_clock;
pub mod log;
pub mod graphics_device;
pub mod negotiator;
pub mod memory;
pub mod frame;
pub mod resource;
pub mod camera;
pub mod scene;
pub mod renderer;

// Main toyvk namespace module
pub mod toyvk {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::{Engine, FATAL_EXIT_CODE};

    pub use crate::config::Config;
    pub use crate::frame_clock::{ClockStep, FrameClock, DEFAULT_TICKS_PER_SECOND};

    // Frame draw orchestrator
    pub use crate::renderer::{FrameStats, Renderer};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Device seam implemented by backends
    pub mod device {
        pub use crate::graphics_device::*;
    }

    pub mod negotiator {
        pub use crate::negotiator::*;
    }

    pub mod memory {
        pub use crate::memory::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod resource {
        pub use crate::resource::*;
    }

    pub mod scene {
        pub use crate::camera::*;
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
