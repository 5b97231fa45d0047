/// Memory & upload manager
///
/// Creates buffers and images with explicitly selected memory types and
/// moves data into device-local memory through a staging buffer. Every
/// transfer is its own one-shot command buffer followed by a queue idle
/// wait: uploads never overlap rendering or each other.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    AccessFlags, BufferHandle, BufferUsageFlags, CommandBufferHandle, Extent2D, Format,
    GraphicsDevice, ImageAspectFlags, ImageBarrier, ImageDesc, ImageHandle, ImageLayout,
    ImageUsageFlags, MemoryPropertyFlags, PipelineStageFlags, SubmitInfo,
};
use crate::memory::allocation::{GpuBuffer, GpuImage};
use crate::memory::memory_type::find_memory_type;

/// Format of every uploaded texture
pub const TEXTURE_FORMAT: Format = Format::R8G8B8A8_SRGB;

/// Stage and access masks for a supported layout transition
pub fn transition_masks(
    old: ImageLayout,
    new: ImageLayout,
) -> Option<(PipelineStageFlags, AccessFlags, PipelineStageFlags, AccessFlags)> {
    match (old, new) {
        (ImageLayout::Undefined, ImageLayout::TransferDstOptimal) => Some((
            PipelineStageFlags::TOP_OF_PIPE,
            AccessFlags::empty(),
            PipelineStageFlags::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
        )),
        (ImageLayout::TransferDstOptimal, ImageLayout::ShaderReadOnlyOptimal) => Some((
            PipelineStageFlags::TRANSFER,
            AccessFlags::TRANSFER_WRITE,
            PipelineStageFlags::FRAGMENT_SHADER,
            AccessFlags::SHADER_READ,
        )),
        (ImageLayout::Undefined, ImageLayout::DepthStencilAttachmentOptimal) => Some((
            PipelineStageFlags::TOP_OF_PIPE,
            AccessFlags::empty(),
            PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )),
        _ => None,
    }
}

pub struct MemoryManager {
    device: Arc<dyn GraphicsDevice>,
}

impl MemoryManager {
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    // ===== RAW CREATION =====

    /// Buffer bound to dedicated memory with at least `properties`
    pub fn create_buffer(
        &self,
        size: u64,
        usage: BufferUsageFlags,
        properties: MemoryPropertyFlags,
    ) -> Result<GpuBuffer> {
        let buffer = self.device.create_buffer(size, usage)?;
        let requirements = self.device.buffer_memory_requirements(buffer);

        let memory = find_memory_type(self.device.memory_types(), requirements.memory_type_bits, properties)
            .and_then(|type_index| self.device.allocate_memory(requirements.size, type_index));
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                self.device.destroy_buffer(buffer);
                return Err(e);
            }
        };

        // From here on the GpuBuffer owns both halves
        let gpu_buffer = GpuBuffer::new(Arc::clone(&self.device), buffer, memory, size, usage);
        self.device.bind_buffer_memory(buffer, memory)?;
        Ok(gpu_buffer)
    }

    /// Device-local 2D image (one mip, one layer) with a view
    pub fn create_image(
        &self,
        width: u32,
        height: u32,
        format: Format,
        usage: ImageUsageFlags,
        aspect: ImageAspectFlags,
    ) -> Result<GpuImage> {
        let image = self.device.create_image(&ImageDesc { width, height, format, usage })?;
        let requirements = self.device.image_memory_requirements(image);

        let memory = find_memory_type(
            self.device.memory_types(),
            requirements.memory_type_bits,
            MemoryPropertyFlags::DEVICE_LOCAL,
        )
        .and_then(|type_index| self.device.allocate_memory(requirements.size, type_index));
        let memory = match memory {
            Ok(memory) => memory,
            Err(e) => {
                self.device.destroy_image(image);
                return Err(e);
            }
        };
        if let Err(e) = self.device.bind_image_memory(image, memory) {
            self.device.destroy_image(image);
            self.device.free_memory(memory);
            return Err(e);
        }
        let view = match self.device.create_image_view(image, format, aspect) {
            Ok(view) => view,
            Err(e) => {
                self.device.destroy_image(image);
                self.device.free_memory(memory);
                return Err(e);
            }
        };

        Ok(GpuImage::new(Arc::clone(&self.device), image, view, memory, width, height, format))
    }

    /// Host-visible, host-coherent TRANSFER_SRC buffer holding a copy of `data`
    fn create_staging_buffer(&self, data: &[u8]) -> Result<GpuBuffer> {
        let mut staging = self.create_buffer(
            data.len() as u64,
            BufferUsageFlags::TRANSFER_SRC,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
        )?;
        staging.map_persistent()?;
        staging.write(0, data)?;
        staging.unmap();
        Ok(staging)
    }

    // ===== UPLOAD PROTOCOLS =====

    /// Upload `data` into a new device-local buffer
    ///
    /// The buffer gets `TRANSFER_DST | usage`. The staging buffer is gone
    /// when this returns.
    pub fn create_device_local_buffer(&self, data: &[u8], usage: BufferUsageFlags) -> Result<GpuBuffer> {
        if data.is_empty() {
            crate::engine_bail!("toyvk::memory", ResourceCreation, "Cannot upload an empty buffer");
        }
        let size = data.len() as u64;
        let staging = self.create_staging_buffer(data)?;
        let buffer = self.create_buffer(
            size,
            BufferUsageFlags::TRANSFER_DST | usage,
            MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        self.copy_buffer(staging.handle(), buffer.handle(), size)?;
        drop(staging);

        crate::engine_trace!("toyvk::memory", "Uploaded {} bytes to buffer {:?}", size, buffer.handle());
        Ok(buffer)
    }

    /// Upload tightly packed RGBA8 texels into a new sampled sRGB texture
    ///
    /// Undefined → TransferDst, copy, TransferDst → ShaderReadOnly; each step
    /// is submitted and waited on separately.
    pub fn upload_texture_image(&self, width: u32, height: u32, rgba: &[u8]) -> Result<GpuImage> {
        let expected = width as u64 * height as u64 * 4;
        if width == 0 || height == 0 || rgba.len() as u64 != expected {
            crate::engine_bail!(
                "toyvk::memory",
                ResourceCreation,
                "Texture data is {} bytes, expected {} for {}x{} RGBA8",
                rgba.len(),
                expected,
                width,
                height
            );
        }

        let staging = self.create_staging_buffer(rgba)?;
        let image = self.create_image(
            width,
            height,
            TEXTURE_FORMAT,
            ImageUsageFlags::TRANSFER_DST | ImageUsageFlags::SAMPLED,
            ImageAspectFlags::COLOR,
        )?;

        self.transition_image_layout(image.handle(), TEXTURE_FORMAT, ImageLayout::Undefined, ImageLayout::TransferDstOptimal)?;
        self.copy_buffer_to_image(staging.handle(), image.handle(), width, height)?;
        self.transition_image_layout(
            image.handle(),
            TEXTURE_FORMAT,
            ImageLayout::TransferDstOptimal,
            ImageLayout::ShaderReadOnlyOptimal,
        )?;
        drop(staging);

        crate::engine_debug!("toyvk::memory", "Uploaded {}x{} texture {:?}", width, height, image.handle());
        Ok(image)
    }

    /// Depth attachment matching the swapchain extent
    pub fn create_depth_buffer(&self, extent: Extent2D, format: Format) -> Result<GpuImage> {
        if !format.is_depth() {
            crate::engine_bail!("toyvk::memory", ResourceCreation, "{:?} is not a depth format", format);
        }
        let image = self.create_image(
            extent.width,
            extent.height,
            format,
            ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            ImageAspectFlags::DEPTH,
        )?;
        self.transition_image_layout(
            image.handle(),
            format,
            ImageLayout::Undefined,
            ImageLayout::DepthStencilAttachmentOptimal,
        )?;
        Ok(image)
    }

    // ===== ONE-SHOT TRANSFERS =====

    /// Record one layout transition barrier and wait for it
    pub fn transition_image_layout(
        &self,
        image: ImageHandle,
        format: Format,
        old_layout: ImageLayout,
        new_layout: ImageLayout,
    ) -> Result<()> {
        let (src_stage, src_access, dst_stage, dst_access) = match transition_masks(old_layout, new_layout) {
            Some(masks) => masks,
            None => crate::engine_bail!(
                "toyvk::memory",
                ResourceCreation,
                "Unsupported layout transition {:?} -> {:?}",
                old_layout,
                new_layout
            ),
        };
        let aspect = if new_layout == ImageLayout::DepthStencilAttachmentOptimal {
            if format.has_stencil() {
                ImageAspectFlags::DEPTH | ImageAspectFlags::STENCIL
            } else {
                ImageAspectFlags::DEPTH
            }
        } else {
            ImageAspectFlags::COLOR
        };
        let barrier = ImageBarrier {
            image,
            aspect,
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        };
        self.submit_one_shot(|device, cmd| device.cmd_pipeline_barrier(cmd, &barrier))
    }

    pub fn copy_buffer(&self, src: BufferHandle, dst: BufferHandle, size: u64) -> Result<()> {
        self.submit_one_shot(|device, cmd| device.cmd_copy_buffer(cmd, src, dst, size))
    }

    /// `image` must already be in TransferDstOptimal
    pub fn copy_buffer_to_image(&self, src: BufferHandle, image: ImageHandle, width: u32, height: u32) -> Result<()> {
        self.submit_one_shot(|device, cmd| device.cmd_copy_buffer_to_image(cmd, src, image, width, height))
    }

    /// Debug readback: copy a (device-local) buffer into host memory
    pub fn read_back_buffer(&self, buffer: &GpuBuffer) -> Result<Vec<u8>> {
        if !buffer.usage().contains(BufferUsageFlags::TRANSFER_SRC) {
            crate::engine_bail!(
                "toyvk::memory",
                InvalidResource,
                "Buffer {:?} was not created with TRANSFER_SRC and cannot be read back",
                buffer.handle()
            );
        }
        let mut readback = self.create_buffer(
            buffer.size(),
            BufferUsageFlags::TRANSFER_DST,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
        )?;
        self.copy_buffer(buffer.handle(), readback.handle(), buffer.size())?;

        readback.map_persistent()?;
        readback.read(0, buffer.size())
    }

    /// Allocate, record, submit, wait for the queue to drain, free
    fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&dyn GraphicsDevice, CommandBufferHandle),
    {
        let cmd = self.device.allocate_command_buffer()?;
        let result = self.record_and_wait(cmd, record);
        self.device.free_command_buffer(cmd);
        result
    }

    fn record_and_wait<F>(&self, cmd: CommandBufferHandle, record: F) -> Result<()>
    where
        F: FnOnce(&dyn GraphicsDevice, CommandBufferHandle),
    {
        self.device.begin_command_buffer(cmd, true)?;
        record(self.device.as_ref(), cmd);
        self.device.end_command_buffer(cmd)?;
        self.device.queue_submit(&SubmitInfo {
            command_buffer: cmd,
            wait_semaphore: None,
            wait_stage: PipelineStageFlags::empty(),
            signal_semaphore: None,
            fence: None,
        })?;
        self.device.queue_wait_idle()
    }
}

#[cfg(test)]
#[path = "memory_manager_tests.rs"]
mod tests;
