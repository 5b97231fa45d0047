/// GraphicsDevice trait - primitive device operations
///
/// The staging protocol, the frame ring and the draw loop are written once,
/// in the core, against this trait. Backends (Vulkan) translate each call
/// one-to-one into driver calls; the test backend simulates them.

use crate::error::Result;
use crate::graphics_device::types::*;

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Low-level device interface
///
/// All methods take `&self`: the device is shared (`Arc`) by every object
/// that must release device resources on drop. Destroy calls never fail.
pub trait GraphicsDevice {
    // ===== CAPABILITIES =====

    /// Negotiated device, surface and swapchain parameters
    fn context(&self) -> &DeviceContext;

    /// The physical device's memory type list, in driver order
    fn memory_types(&self) -> &[MemoryType];

    /// Views of the swapchain images, one per image index
    fn swapchain_image_views(&self) -> &[ImageViewHandle];

    // ===== BUFFERS, IMAGES, MEMORY =====

    fn create_buffer(&self, size: u64, usage: BufferUsageFlags) -> Result<BufferHandle>;

    fn destroy_buffer(&self, buffer: BufferHandle);

    fn buffer_memory_requirements(&self, buffer: BufferHandle) -> MemoryRequirements;

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle>;

    fn destroy_image(&self, image: ImageHandle);

    fn image_memory_requirements(&self, image: ImageHandle) -> MemoryRequirements;

    /// Allocate `size` bytes from memory type `memory_type_index`
    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryHandle>;

    fn free_memory(&self, memory: MemoryHandle);

    fn bind_buffer_memory(&self, buffer: BufferHandle, memory: MemoryHandle) -> Result<()>;

    fn bind_image_memory(&self, image: ImageHandle, memory: MemoryHandle) -> Result<()>;

    /// Map the first `size` bytes of a host-visible allocation
    ///
    /// The pointer stays valid until `unmap_memory` or `free_memory`.
    fn map_memory(&self, memory: MemoryHandle, size: u64) -> Result<*mut u8>;

    fn unmap_memory(&self, memory: MemoryHandle);

    fn create_image_view(
        &self,
        image: ImageHandle,
        format: Format,
        aspect: ImageAspectFlags,
    ) -> Result<ImageViewHandle>;

    fn destroy_image_view(&self, view: ImageViewHandle);

    /// Linear filtering, repeat addressing, anisotropy clamped to `max_anisotropy`
    fn create_sampler(&self, max_anisotropy: f32) -> Result<SamplerHandle>;

    fn destroy_sampler(&self, sampler: SamplerHandle);

    // ===== COMMAND BUFFERS =====

    /// Allocate a resettable primary command buffer on the graphics queue family
    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle>;

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle);

    /// Reset and begin recording
    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle, one_time_submit: bool) -> Result<()>;

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_copy_buffer(&self, command_buffer: CommandBufferHandle, src: BufferHandle, dst: BufferHandle, size: u64);

    /// Copy tightly packed texels into mip 0 / layer 0 of `dst` (must be in TransferDstOptimal)
    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: ImageHandle,
        width: u32,
        height: u32,
    );

    fn cmd_pipeline_barrier(&self, command_buffer: CommandBufferHandle, barrier: &ImageBarrier);

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear: &ClearValues,
    );

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle);

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle);

    /// Full-extent viewport (depth 0..1) and scissor
    fn cmd_set_viewport_and_scissor(&self, command_buffer: CommandBufferHandle, extent: Extent2D);

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle);

    /// 32-bit indices
    fn cmd_bind_index_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle);

    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        set: DescriptorSetHandle,
    );

    fn cmd_draw_indexed(&self, command_buffer: CommandBufferHandle, index_count: u32);

    // ===== SYNCHRONIZATION AND QUEUES =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle);

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle>;

    fn destroy_fence(&self, fence: FenceHandle);

    /// Block until `fence` is signaled (no timeout)
    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()>;

    fn reset_fence(&self, fence: FenceHandle) -> Result<()>;

    /// Acquire the next swapchain image (no timeout); `signal` fires when it is ready
    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<u32>;

    fn queue_submit(&self, submit: &SubmitInfo) -> Result<()>;

    fn queue_present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<()>;

    fn queue_wait_idle(&self) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;

    // ===== DESCRIPTORS =====

    /// Binding 0: uniform buffer (vertex stage), binding 1: combined image sampler (fragment stage)
    fn create_descriptor_set_layout(&self) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle);

    /// Pool sized for `max_sets` sets of the layout above; sets may be freed individually
    fn create_descriptor_pool(&self, max_sets: u32) -> Result<DescriptorPoolHandle>;

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle);

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle>;

    fn free_descriptor_set(&self, pool: DescriptorPoolHandle, set: DescriptorSetHandle);

    fn write_descriptor_set(&self, set: DescriptorSetHandle, write: &DescriptorWrite);

    // ===== RENDER PASS AND PIPELINE =====

    /// Single subpass: color (cleared, presented) + depth (cleared, discarded)
    fn create_render_pass(&self, color_format: Format, depth_format: Format) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&self, render_pass: RenderPassHandle);

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        color_view: ImageViewHandle,
        depth_view: ImageViewHandle,
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle);

    /// `code` is SPIR-V; only its length and "main" entry point are relied on
    fn create_shader_module(&self, code: &[u8]) -> Result<ShaderModuleHandle>;

    fn destroy_shader_module(&self, module: ShaderModuleHandle);

    fn create_pipeline_layout(&self, set_layout: DescriptorSetLayoutHandle) -> Result<PipelineLayoutHandle>;

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle);

    fn create_graphics_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle>;

    fn destroy_pipeline(&self, pipeline: PipelineHandle);
}
