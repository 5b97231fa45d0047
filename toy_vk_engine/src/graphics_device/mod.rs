/// Graphics device module - the seam between the core and a backend

pub mod graphics_device;
pub mod types;

pub use graphics_device::*;
pub use types::*;

// Simulated device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
