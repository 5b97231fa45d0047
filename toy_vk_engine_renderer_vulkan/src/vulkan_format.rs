//! Conversions between the core's device types and `ash::vk`
//!
//! Flag types share Vulkan's bit values, so they convert with `from_raw`.

use ash::vk;
use ash::vk::Handle;
use toy_vk_engine::toyvk::device::*;

// ===== FORMATS =====

pub(crate) fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::D32_SFLOAT => vk::Format::D32_SFLOAT,
        Format::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
        Format::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        Format::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        Format::Other(raw) => vk::Format::from_raw(raw),
    }
}

pub(crate) fn format_from_vk(format: vk::Format) -> Format {
    match format {
        vk::Format::UNDEFINED => Format::Undefined,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8_SRGB,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8_UNORM,
        vk::Format::D32_SFLOAT => Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT => Format::D24_UNORM_S8_UINT,
        vk::Format::R32G32_SFLOAT => Format::R32G32_SFLOAT,
        vk::Format::R32G32B32_SFLOAT => Format::R32G32B32_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => Format::R32G32B32A32_SFLOAT,
        other => Format::Other(other.as_raw()),
    }
}

pub(crate) fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub(crate) fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SrgbNonlinear,
        other => ColorSpace::Other(other.as_raw()),
    }
}

pub(crate) fn surface_format_from_vk(format: &vk::SurfaceFormatKHR) -> SurfaceFormat {
    SurfaceFormat {
        format: format_from_vk(format.format),
        color_space: color_space_from_vk(format.color_space),
    }
}

pub(crate) fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        PresentMode::Other(raw) => vk::PresentModeKHR::from_raw(raw),
    }
}

pub(crate) fn present_mode_from_vk(mode: vk::PresentModeKHR) -> PresentMode {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => PresentMode::Immediate,
        vk::PresentModeKHR::MAILBOX => PresentMode::Mailbox,
        vk::PresentModeKHR::FIFO => PresentMode::Fifo,
        vk::PresentModeKHR::FIFO_RELAXED => PresentMode::FifoRelaxed,
        other => PresentMode::Other(other.as_raw()),
    }
}

pub(crate) fn device_type_from_vk(device_type: vk::PhysicalDeviceType) -> DeviceType {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => DeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => DeviceType::Cpu,
        _ => DeviceType::Other,
    }
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    }
}

// ===== EXTENTS =====

pub(crate) fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D { width: extent.width, height: extent.height }
}

pub(crate) fn extent_from_vk(extent: vk::Extent2D) -> Extent2D {
    Extent2D::new(extent.width, extent.height)
}

pub(crate) fn surface_capabilities_from_vk(caps: &vk::SurfaceCapabilitiesKHR) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent: extent_from_vk(caps.current_extent),
        min_image_extent: extent_from_vk(caps.min_image_extent),
        max_image_extent: extent_from_vk(caps.max_image_extent),
    }
}

// ===== FLAGS =====

pub(crate) fn memory_properties_from_vk(flags: vk::MemoryPropertyFlags) -> MemoryPropertyFlags {
    MemoryPropertyFlags::from_bits_truncate(flags.as_raw())
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsageFlags) -> vk::BufferUsageFlags {
    vk::BufferUsageFlags::from_raw(usage.bits())
}

pub(crate) fn image_usage_to_vk(usage: ImageUsageFlags) -> vk::ImageUsageFlags {
    vk::ImageUsageFlags::from_raw(usage.bits())
}

pub(crate) fn aspect_to_vk(aspect: ImageAspectFlags) -> vk::ImageAspectFlags {
    vk::ImageAspectFlags::from_raw(aspect.bits())
}

pub(crate) fn stage_to_vk(stage: PipelineStageFlags) -> vk::PipelineStageFlags {
    vk::PipelineStageFlags::from_raw(stage.bits())
}

pub(crate) fn access_to_vk(access: AccessFlags) -> vk::AccessFlags {
    vk::AccessFlags::from_raw(access.bits())
}

// ===== HANDLES =====

macro_rules! handle_conversions {
    ($($to:ident / $from:ident : $core:ident => $vk:ty),* $(,)?) => {
        $(
            pub(crate) fn $to(handle: $core) -> $vk {
                <$vk>::from_raw(handle.0)
            }

            pub(crate) fn $from(handle: $vk) -> $core {
                $core(handle.as_raw())
            }
        )*
    };
}

handle_conversions!(
    buffer_to_vk / buffer_from_vk: BufferHandle => vk::Buffer,
    image_to_vk / image_from_vk: ImageHandle => vk::Image,
    image_view_to_vk / image_view_from_vk: ImageViewHandle => vk::ImageView,
    memory_to_vk / memory_from_vk: MemoryHandle => vk::DeviceMemory,
    sampler_to_vk / sampler_from_vk: SamplerHandle => vk::Sampler,
    command_buffer_to_vk / command_buffer_from_vk: CommandBufferHandle => vk::CommandBuffer,
    semaphore_to_vk / semaphore_from_vk: SemaphoreHandle => vk::Semaphore,
    fence_to_vk / fence_from_vk: FenceHandle => vk::Fence,
    descriptor_pool_to_vk / descriptor_pool_from_vk: DescriptorPoolHandle => vk::DescriptorPool,
    set_layout_to_vk / set_layout_from_vk: DescriptorSetLayoutHandle => vk::DescriptorSetLayout,
    descriptor_set_to_vk / descriptor_set_from_vk: DescriptorSetHandle => vk::DescriptorSet,
    render_pass_to_vk / render_pass_from_vk: RenderPassHandle => vk::RenderPass,
    framebuffer_to_vk / framebuffer_from_vk: FramebufferHandle => vk::Framebuffer,
    shader_module_to_vk / shader_module_from_vk: ShaderModuleHandle => vk::ShaderModule,
    pipeline_layout_to_vk / pipeline_layout_from_vk: PipelineLayoutHandle => vk::PipelineLayout,
    pipeline_to_vk / pipeline_from_vk: PipelineHandle => vk::Pipeline,
);

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
