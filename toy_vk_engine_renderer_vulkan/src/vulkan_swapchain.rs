/// Swapchain - presentation images for the window surface
///
/// Created once from the negotiated parameters; there is no recreation
/// path (the window is not resized).

use ash::vk;
use toy_vk_engine::toyvk::device::ImageViewHandle;
use toy_vk_engine::toyvk::negotiator::NegotiatedDevice;
use toy_vk_engine::toyvk::Result;
use toy_vk_engine::engine_debug;

use crate::vulkan::{creation_error, sync_error, InstanceLayer};
use crate::vulkan_format::{
    color_space_to_vk, extent_to_vk, format_to_vk, image_view_from_vk, present_mode_to_vk,
};

pub(crate) struct Swapchain {
    loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    views: Vec<vk::ImageView>,
    /// Core-side handles of `views`, same order
    view_handles: Vec<ImageViewHandle>,
}

impl Swapchain {
    pub(crate) fn new(
        layer: &InstanceLayer,
        physical_device: vk::PhysicalDevice,
        device: &ash::Device,
        negotiated: &NegotiatedDevice,
    ) -> Result<Self> {
        unsafe {
            let capabilities = layer
                .surface_loader
                .get_physical_device_surface_capabilities(physical_device, layer.surface)
                .map_err(|e| creation_error("Failed to query surface capabilities", e))?;

            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(layer.surface)
                .min_image_count(negotiated.image_count)
                .image_format(format_to_vk(negotiated.surface_format.format))
                .image_color_space(color_space_to_vk(negotiated.surface_format.color_space))
                .image_extent(extent_to_vk(negotiated.extent))
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                // Graphics and present share one queue family
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode_to_vk(negotiated.present_mode))
                .clipped(true);

            let loader = ash::khr::swapchain::Device::new(&layer.instance, device);
            let swapchain = loader
                .create_swapchain(&create_info, None)
                .map_err(|e| creation_error("Failed to create swapchain", e))?;

            let mut result = Self {
                loader,
                swapchain,
                views: Vec::new(),
                view_handles: Vec::new(),
            };

            let images = match result.loader.get_swapchain_images(swapchain) {
                Ok(images) => images,
                Err(e) => {
                    result.destroy(device);
                    return Err(creation_error("Failed to get swapchain images", e));
                }
            };

            for &image in &images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format_to_vk(negotiated.surface_format.format))
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                match device.create_image_view(&view_info, None) {
                    Ok(view) => {
                        result.views.push(view);
                        result.view_handles.push(image_view_from_vk(view));
                    }
                    Err(e) => {
                        result.destroy(device);
                        return Err(creation_error("Failed to create swapchain image view", e));
                    }
                }
            }

            engine_debug!(
                "toyvk::vulkan",
                "Swapchain created: {} images (requested {})",
                images.len(),
                negotiated.image_count
            );

            Ok(result)
        }
    }

    pub(crate) fn image_count(&self) -> u32 {
        self.views.len() as u32
    }

    pub(crate) fn view_handles(&self) -> &[ImageViewHandle] {
        &self.view_handles
    }

    /// Blocks until an image is available; a suboptimal swapchain is still used
    pub(crate) fn acquire(&self, signal: vk::Semaphore) -> Result<u32> {
        unsafe { self.loader.acquire_next_image(self.swapchain, u64::MAX, signal, vk::Fence::null()) }
            .map(|(index, _suboptimal)| index)
            .map_err(|e| sync_error("Failed to acquire swapchain image", e))
    }

    pub(crate) fn present(&self, queue: vk::Queue, wait: vk::Semaphore, image_index: u32) -> Result<()> {
        let wait_semaphores = [wait];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe { self.loader.queue_present(queue, &present_info) }
            .map(|_suboptimal| ())
            .map_err(|e| sync_error("Failed to present swapchain image", e))
    }

    /// Views first, then the swapchain; the device must be idle
    pub(crate) fn destroy(&self, device: &ash::Device) {
        unsafe {
            for &view in &self.views {
                device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
