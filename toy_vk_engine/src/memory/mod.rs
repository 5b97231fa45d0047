/// Memory & upload module

pub mod allocation;
pub mod memory_manager;
pub mod memory_type;

pub use allocation::{GpuBuffer, GpuImage};
pub use memory_manager::{transition_masks, MemoryManager, TEXTURE_FORMAT};
pub use memory_type::find_memory_type;
