/// Drawable mesh: vertex/index buffers, a texture reference and per-frame
/// descriptor sets.
///
/// Descriptors are grouped in banks. A bank holds exactly one descriptor
/// set + uniform buffer per frame slot. Bank 0 exists from creation; more
/// banks are added when the same surface is drawn several times in one
/// frame, so that every instance drawn in a frame has its own uniform
/// buffer.

use slotmap::new_key_type;

use crate::error::Result;
use crate::graphics_device::{BufferHandle, DescriptorSetHandle};
use crate::memory::GpuBuffer;
use crate::resource::texture::TextureKey;
use crate::resource::vertex::UniformBufferObject;

new_key_type! {
    /// Stable key for a surface within a ResourcePool
    pub struct SurfaceKey;
}

/// Descriptor set bound to its own persistently mapped uniform buffer
pub(crate) struct FrameDescriptor {
    pub(crate) set: DescriptorSetHandle,
    pub(crate) uniform: GpuBuffer,
}

/// One descriptor set per frame slot
pub struct DescriptorBank {
    pub(crate) frames: Vec<FrameDescriptor>,
}

impl DescriptorBank {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn descriptor_set(&self, frame: usize) -> Option<DescriptorSetHandle> {
        self.frames.get(frame).map(|f| f.set)
    }

    pub fn uniform_buffer(&self, frame: usize) -> Option<BufferHandle> {
        self.frames.get(frame).map(|f| f.uniform.handle())
    }

    /// Write the matrices for `frame`. Only the slot being recorded may be written.
    pub fn write_uniform(&self, frame: usize, ubo: &UniformBufferObject) -> Result<()> {
        match self.frames.get(frame) {
            Some(f) => f.uniform.write(0, bytemuck::bytes_of(ubo)),
            None => crate::engine_bail!(
                "toyvk::resource",
                InvalidResource,
                "Frame index {} out of range ({} frames in flight)",
                frame,
                self.frames.len()
            ),
        }
    }
}

pub struct Surface {
    pub(crate) vertex_buffer: GpuBuffer,
    pub(crate) index_buffer: GpuBuffer,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) texture: TextureKey,
    pub(crate) banks: Vec<DescriptorBank>,
}

impl Surface {
    pub fn vertex_buffer(&self) -> BufferHandle {
        self.vertex_buffer.handle()
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer.handle()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn texture(&self) -> TextureKey {
        self.texture
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    pub fn bank(&self, index: usize) -> Option<&DescriptorBank> {
        self.banks.get(index)
    }
}
