/// GraphicsDevice implementation for VulkanGraphicsDevice
///
/// Each trait method is one (or a few) ash calls. Handles cross the seam as
/// raw `u64` values; see `vulkan_format.rs`.

use ash::vk;
use toy_vk_engine::toyvk::device::*;
use toy_vk_engine::toyvk::Result;
use toy_vk_engine::{engine_err, engine_warn};

use crate::vulkan::{creation_error, sync_error, VulkanGraphicsDevice};
use crate::vulkan_format::*;
use crate::{vulkan_pipeline, vulkan_shader};

fn full_subresource_range(aspect: ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: aspect_to_vk(aspect),
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    // ===== CAPABILITIES =====

    fn context(&self) -> &DeviceContext {
        &self.context
    }

    fn memory_types(&self) -> &[MemoryType] {
        &self.memory_types
    }

    fn swapchain_image_views(&self) -> &[ImageViewHandle] {
        self.swapchain.view_handles()
    }

    // ===== BUFFERS, IMAGES, MEMORY =====

    fn create_buffer(&self, size: u64, usage: BufferUsageFlags) -> Result<BufferHandle> {
        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(buffer_usage_to_vk(usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        unsafe { self.device.create_buffer(&create_info, None) }
            .map(buffer_from_vk)
            .map_err(|e| creation_error("Failed to create buffer", e))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        unsafe { self.device.destroy_buffer(buffer_to_vk(buffer), None) }
    }

    fn buffer_memory_requirements(&self, buffer: BufferHandle) -> MemoryRequirements {
        let requirements = unsafe { self.device.get_buffer_memory_requirements(buffer_to_vk(buffer)) };
        MemoryRequirements {
            size: requirements.size,
            alignment: requirements.alignment,
            memory_type_bits: requirements.memory_type_bits,
        }
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle> {
        let create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.width,
                height: desc.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(image_usage_to_vk(desc.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        unsafe { self.device.create_image(&create_info, None) }
            .map(image_from_vk)
            .map_err(|e| creation_error("Failed to create image", e))
    }

    fn destroy_image(&self, image: ImageHandle) {
        unsafe { self.device.destroy_image(image_to_vk(image), None) }
    }

    fn image_memory_requirements(&self, image: ImageHandle) -> MemoryRequirements {
        let requirements = unsafe { self.device.get_image_memory_requirements(image_to_vk(image)) };
        MemoryRequirements {
            size: requirements.size,
            alignment: requirements.alignment,
            memory_type_bits: requirements.memory_type_bits,
        }
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryHandle> {
        let allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(size)
            .memory_type_index(memory_type_index);
        unsafe { self.device.allocate_memory(&allocate_info, None) }
            .map(memory_from_vk)
            .map_err(|e| match e {
                vk::Result::ERROR_OUT_OF_HOST_MEMORY | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => engine_err!(
                    "toyvk::vulkan",
                    OutOfMemory,
                    "Failed to allocate {} bytes from memory type {}: {:?}",
                    size,
                    memory_type_index,
                    e
                ),
                other => creation_error("Failed to allocate device memory", other),
            })
    }

    fn free_memory(&self, memory: MemoryHandle) {
        unsafe { self.device.free_memory(memory_to_vk(memory), None) }
    }

    fn bind_buffer_memory(&self, buffer: BufferHandle, memory: MemoryHandle) -> Result<()> {
        unsafe { self.device.bind_buffer_memory(buffer_to_vk(buffer), memory_to_vk(memory), 0) }
            .map_err(|e| creation_error("Failed to bind buffer memory", e))
    }

    fn bind_image_memory(&self, image: ImageHandle, memory: MemoryHandle) -> Result<()> {
        unsafe { self.device.bind_image_memory(image_to_vk(image), memory_to_vk(memory), 0) }
            .map_err(|e| creation_error("Failed to bind image memory", e))
    }

    fn map_memory(&self, memory: MemoryHandle, size: u64) -> Result<*mut u8> {
        unsafe {
            self.device
                .map_memory(memory_to_vk(memory), 0, size, vk::MemoryMapFlags::empty())
        }
        .map(|ptr| ptr.cast::<u8>())
        .map_err(|e| creation_error("Failed to map memory", e))
    }

    fn unmap_memory(&self, memory: MemoryHandle) {
        unsafe { self.device.unmap_memory(memory_to_vk(memory)) }
    }

    fn create_image_view(
        &self,
        image: ImageHandle,
        format: Format,
        aspect: ImageAspectFlags,
    ) -> Result<ImageViewHandle> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image_to_vk(image))
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format_to_vk(format))
            .subresource_range(full_subresource_range(aspect));
        unsafe { self.device.create_image_view(&create_info, None) }
            .map(image_view_from_vk)
            .map_err(|e| creation_error("Failed to create image view", e))
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        unsafe { self.device.destroy_image_view(image_view_to_vk(view), None) }
    }

    fn create_sampler(&self, max_anisotropy: f32) -> Result<SamplerHandle> {
        let create_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(true)
            .max_anisotropy(max_anisotropy.min(self.context.max_anisotropy))
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .min_lod(0.0)
            .max_lod(0.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false);
        unsafe { self.device.create_sampler(&create_info, None) }
            .map(sampler_from_vk)
            .map_err(|e| creation_error("Failed to create sampler", e))
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        unsafe { self.device.destroy_sampler(sampler_to_vk(sampler), None) }
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle> {
        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let buffers = unsafe { self.device.allocate_command_buffers(&allocate_info) }
            .map_err(|e| creation_error("Failed to allocate command buffer", e))?;
        buffers
            .into_iter()
            .next()
            .map(command_buffer_from_vk)
            .ok_or_else(|| engine_err!("toyvk::vulkan", ResourceCreation, "Driver returned no command buffer"))
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        unsafe {
            self.device
                .free_command_buffers(self.command_pool, &[command_buffer_to_vk(command_buffer)])
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle, one_time_submit: bool) -> Result<()> {
        let cmd = command_buffer_to_vk(command_buffer);
        let flags = if one_time_submit {
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
        } else {
            vk::CommandBufferUsageFlags::empty()
        };
        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(|e| creation_error("Failed to reset command buffer", e))?;
            self.device
                .begin_command_buffer(cmd, &vk::CommandBufferBeginInfo::default().flags(flags))
                .map_err(|e| creation_error("Failed to begin command buffer", e))
        }
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        unsafe { self.device.end_command_buffer(command_buffer_to_vk(command_buffer)) }
            .map_err(|e| creation_error("Failed to end command buffer", e))
    }

    fn cmd_copy_buffer(&self, command_buffer: CommandBufferHandle, src: BufferHandle, dst: BufferHandle, size: u64) {
        let region = vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size,
        };
        unsafe {
            self.device.cmd_copy_buffer(
                command_buffer_to_vk(command_buffer),
                buffer_to_vk(src),
                buffer_to_vk(dst),
                &[region],
            )
        }
    }

    fn cmd_copy_buffer_to_image(
        &self,
        command_buffer: CommandBufferHandle,
        src: BufferHandle,
        dst: ImageHandle,
        width: u32,
        height: u32,
    ) {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            // Tightly packed
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D { width, height, depth: 1 },
        };
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                command_buffer_to_vk(command_buffer),
                buffer_to_vk(src),
                image_to_vk(dst),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            )
        }
    }

    fn cmd_pipeline_barrier(&self, command_buffer: CommandBufferHandle, barrier: &ImageBarrier) {
        let image_barrier = vk::ImageMemoryBarrier::default()
            .old_layout(image_layout_to_vk(barrier.old_layout))
            .new_layout(image_layout_to_vk(barrier.new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image_to_vk(barrier.image))
            .subresource_range(full_subresource_range(barrier.aspect))
            .src_access_mask(access_to_vk(barrier.src_access))
            .dst_access_mask(access_to_vk(barrier.dst_access));
        unsafe {
            self.device.cmd_pipeline_barrier(
                command_buffer_to_vk(command_buffer),
                stage_to_vk(barrier.src_stage),
                stage_to_vk(barrier.dst_stage),
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[image_barrier],
            )
        }
    }

    fn cmd_begin_render_pass(
        &self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear: &ClearValues,
    ) {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear.color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: clear.depth,
                    stencil: 0,
                },
            },
        ];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass_to_vk(render_pass))
            .framebuffer(framebuffer_to_vk(framebuffer))
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: extent_to_vk(extent),
            })
            .clear_values(&clear_values);
        unsafe {
            self.device.cmd_begin_render_pass(
                command_buffer_to_vk(command_buffer),
                &begin_info,
                vk::SubpassContents::INLINE,
            )
        }
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        unsafe { self.device.cmd_end_render_pass(command_buffer_to_vk(command_buffer)) }
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        unsafe {
            self.device.cmd_bind_pipeline(
                command_buffer_to_vk(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                pipeline_to_vk(pipeline),
            )
        }
    }

    fn cmd_set_viewport_and_scissor(&self, command_buffer: CommandBufferHandle, extent: Extent2D) {
        let cmd = command_buffer_to_vk(command_buffer);
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: extent_to_vk(extent),
        };
        unsafe {
            self.device.cmd_set_viewport(cmd, 0, &[viewport]);
            self.device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle) {
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(command_buffer_to_vk(command_buffer), 0, &[buffer_to_vk(buffer)], &[0])
        }
    }

    fn cmd_bind_index_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle) {
        unsafe {
            self.device.cmd_bind_index_buffer(
                command_buffer_to_vk(command_buffer),
                buffer_to_vk(buffer),
                0,
                vk::IndexType::UINT32,
            )
        }
    }

    fn cmd_bind_descriptor_set(
        &self,
        command_buffer: CommandBufferHandle,
        layout: PipelineLayoutHandle,
        set: DescriptorSetHandle,
    ) {
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                command_buffer_to_vk(command_buffer),
                vk::PipelineBindPoint::GRAPHICS,
                pipeline_layout_to_vk(layout),
                0,
                &[descriptor_set_to_vk(set)],
                &[],
            )
        }
    }

    fn cmd_draw_indexed(&self, command_buffer: CommandBufferHandle, index_count: u32) {
        unsafe {
            self.device
                .cmd_draw_indexed(command_buffer_to_vk(command_buffer), index_count, 1, 0, 0, 0)
        }
    }

    // ===== SYNCHRONIZATION AND QUEUES =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        unsafe { self.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
            .map(semaphore_from_vk)
            .map_err(|e| sync_error("Failed to create semaphore", e))
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        unsafe { self.device.destroy_semaphore(semaphore_to_vk(semaphore), None) }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        unsafe { self.device.create_fence(&vk::FenceCreateInfo::default().flags(flags), None) }
            .map(fence_from_vk)
            .map_err(|e| sync_error("Failed to create fence", e))
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        unsafe { self.device.destroy_fence(fence_to_vk(fence), None) }
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe { self.device.wait_for_fences(&[fence_to_vk(fence)], true, u64::MAX) }
            .map_err(|e| sync_error("Failed to wait for fence", e))
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        unsafe { self.device.reset_fences(&[fence_to_vk(fence)]) }
            .map_err(|e| sync_error("Failed to reset fence", e))
    }

    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<u32> {
        self.swapchain.acquire(semaphore_to_vk(signal))
    }

    fn queue_submit(&self, submit: &SubmitInfo) -> Result<()> {
        let command_buffers = [command_buffer_to_vk(submit.command_buffer)];
        let wait_semaphores: Vec<vk::Semaphore> = submit.wait_semaphore.map(semaphore_to_vk).into_iter().collect();
        let wait_stages: Vec<vk::PipelineStageFlags> = submit
            .wait_semaphore
            .map(|_| stage_to_vk(submit.wait_stage))
            .into_iter()
            .collect();
        let signal_semaphores: Vec<vk::Semaphore> =
            submit.signal_semaphore.map(semaphore_to_vk).into_iter().collect();

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);
        let fence = submit.fence.map(fence_to_vk).unwrap_or_else(vk::Fence::null);

        unsafe { self.device.queue_submit(self.queue, &[submit_info], fence) }
            .map_err(|e| sync_error("Failed to submit command buffer", e))
    }

    fn queue_present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<()> {
        self.swapchain.present(self.queue, semaphore_to_vk(wait), image_index)
    }

    fn queue_wait_idle(&self) -> Result<()> {
        unsafe { self.device.queue_wait_idle(self.queue) }
            .map_err(|e| sync_error("Failed to wait for queue idle", e))
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }
            .map_err(|e| sync_error("Failed to wait for device idle", e))
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self) -> Result<DescriptorSetLayoutHandle> {
        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ];
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
        unsafe { self.device.create_descriptor_set_layout(&create_info, None) }
            .map(set_layout_from_vk)
            .map_err(|e| creation_error("Failed to create descriptor set layout", e))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        unsafe { self.device.destroy_descriptor_set_layout(set_layout_to_vk(layout), None) }
    }

    fn create_descriptor_pool(&self, max_sets: u32) -> Result<DescriptorPoolHandle> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: max_sets,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: max_sets,
            },
        ];
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets);
        unsafe { self.device.create_descriptor_pool(&create_info, None) }
            .map(descriptor_pool_from_vk)
            .map_err(|e| creation_error("Failed to create descriptor pool", e))
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        unsafe { self.device.destroy_descriptor_pool(descriptor_pool_to_vk(pool), None) }
    }

    fn allocate_descriptor_set(
        &self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        let layouts = [set_layout_to_vk(layout)];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool_to_vk(pool))
            .set_layouts(&layouts);
        let sets = unsafe { self.device.allocate_descriptor_sets(&allocate_info) }
            .map_err(|e| creation_error("Failed to allocate descriptor set", e))?;
        sets.into_iter()
            .next()
            .map(descriptor_set_from_vk)
            .ok_or_else(|| engine_err!("toyvk::vulkan", ResourceCreation, "Driver returned no descriptor set"))
    }

    fn free_descriptor_set(&self, pool: DescriptorPoolHandle, set: DescriptorSetHandle) {
        let result = unsafe {
            self.device
                .free_descriptor_sets(descriptor_pool_to_vk(pool), &[descriptor_set_to_vk(set)])
        };
        if let Err(e) = result {
            engine_warn!("toyvk::vulkan", "Failed to free descriptor set: {:?}", e);
        }
    }

    fn write_descriptor_set(&self, set: DescriptorSetHandle, write: &DescriptorWrite) {
        let dst_set = descriptor_set_to_vk(set);
        let buffer_infos = [vk::DescriptorBufferInfo {
            buffer: buffer_to_vk(write.uniform_buffer),
            offset: 0,
            range: write.uniform_range,
        }];
        let image_infos = [vk::DescriptorImageInfo {
            sampler: sampler_to_vk(write.sampler),
            image_view: image_view_to_vk(write.image_view),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let writes = [
            vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(&buffer_infos),
            vk::WriteDescriptorSet::default()
                .dst_set(dst_set)
                .dst_binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(&image_infos),
        ];
        unsafe { self.device.update_descriptor_sets(&writes, &[]) }
    }

    // ===== RENDER PASS AND PIPELINE =====

    fn create_render_pass(&self, color_format: Format, depth_format: Format) -> Result<RenderPassHandle> {
        vulkan_pipeline::create_render_pass(&self.device, color_format, depth_format).map(render_pass_from_vk)
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        unsafe { self.device.destroy_render_pass(render_pass_to_vk(render_pass), None) }
    }

    fn create_framebuffer(
        &self,
        render_pass: RenderPassHandle,
        color_view: ImageViewHandle,
        depth_view: ImageViewHandle,
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let attachments = [image_view_to_vk(color_view), image_view_to_vk(depth_view)];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass_to_vk(render_pass))
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        unsafe { self.device.create_framebuffer(&create_info, None) }
            .map(framebuffer_from_vk)
            .map_err(|e| creation_error("Failed to create framebuffer", e))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        unsafe { self.device.destroy_framebuffer(framebuffer_to_vk(framebuffer), None) }
    }

    fn create_shader_module(&self, code: &[u8]) -> Result<ShaderModuleHandle> {
        vulkan_shader::create_shader_module(&self.device, code).map(shader_module_from_vk)
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        unsafe { self.device.destroy_shader_module(shader_module_to_vk(module), None) }
    }

    fn create_pipeline_layout(&self, set_layout: DescriptorSetLayoutHandle) -> Result<PipelineLayoutHandle> {
        let set_layouts = [set_layout_to_vk(set_layout)];
        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
        unsafe { self.device.create_pipeline_layout(&create_info, None) }
            .map(pipeline_layout_from_vk)
            .map_err(|e| creation_error("Failed to create pipeline layout", e))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        unsafe { self.device.destroy_pipeline_layout(pipeline_layout_to_vk(layout), None) }
    }

    fn create_graphics_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        vulkan_pipeline::create_graphics_pipeline(&self.device, desc).map(pipeline_from_vk)
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        unsafe { self.device.destroy_pipeline(pipeline_to_vk(pipeline), None) }
    }
}
