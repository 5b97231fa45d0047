//! Driver queries that describe each physical device to the negotiator

use ash::vk;
use toy_vk_engine::toyvk::negotiator::{DeviceCandidate, QueueFamilyCandidate, DEPTH_FORMAT_CANDIDATES};
use toy_vk_engine::{engine_trace, engine_warn};

use crate::vulkan::InstanceLayer;
use crate::vulkan_format::{
    device_type_from_vk, format_to_vk, present_mode_from_vk, surface_capabilities_from_vk,
    surface_format_from_vk,
};

/// One `DeviceCandidate` per physical device, in enumeration order
pub(crate) fn gather_candidates(
    layer: &InstanceLayer,
    physical_devices: &[vk::PhysicalDevice],
) -> Vec<DeviceCandidate> {
    physical_devices
        .iter()
        .map(|&physical_device| describe_device(layer, physical_device))
        .collect()
}

fn describe_device(layer: &InstanceLayer, physical_device: vk::PhysicalDevice) -> DeviceCandidate {
    let instance = &layer.instance;
    let surface_loader = &layer.surface_loader;

    unsafe {
        let properties = instance.get_physical_device_properties(physical_device);
        let features = instance.get_physical_device_features(physical_device);

        let name = properties
            .device_name_as_c_str()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "<unnamed device>".to_string());

        // Query failures only disqualify this device
        let swapchain_extension = match instance.enumerate_device_extension_properties(physical_device) {
            Ok(extensions) => extensions
                .iter()
                .any(|ext| ext.extension_name_as_c_str() == Ok(ash::khr::swapchain::NAME)),
            Err(e) => {
                engine_warn!("toyvk::vulkan", "Device '{}': extension enumeration failed: {:?}", name, e);
                false
            }
        };

        let queue_families = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .enumerate()
            .map(|(index, family)| {
                let index = index as u32;
                // A failed query counts as "cannot present"
                let supports_present = surface_loader
                    .get_physical_device_surface_support(physical_device, index, layer.surface)
                    .unwrap_or(false);
                QueueFamilyCandidate {
                    index,
                    supports_graphics: family.queue_flags.contains(vk::QueueFlags::GRAPHICS),
                    supports_present,
                }
            })
            .collect();

        let depth_formats = DEPTH_FORMAT_CANDIDATES
            .iter()
            .copied()
            .filter(|&format| {
                instance
                    .get_physical_device_format_properties(physical_device, format_to_vk(format))
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .collect();

        let surface_capabilities = match surface_loader
            .get_physical_device_surface_capabilities(physical_device, layer.surface)
        {
            Ok(caps) => Some(surface_capabilities_from_vk(&caps)),
            Err(e) => {
                engine_warn!("toyvk::vulkan", "Device '{}': surface capability query failed: {:?}", name, e);
                None
            }
        };

        // Devices that cannot present to this surface may fail these queries;
        // empty lists get them rejected by the negotiator instead.
        let surface_formats = surface_loader
            .get_physical_device_surface_formats(physical_device, layer.surface)
            .unwrap_or_default()
            .iter()
            .map(surface_format_from_vk)
            .collect();
        let present_modes = surface_loader
            .get_physical_device_surface_present_modes(physical_device, layer.surface)
            .unwrap_or_default()
            .into_iter()
            .map(present_mode_from_vk)
            .collect();

        let candidate = DeviceCandidate {
            name,
            device_type: device_type_from_vk(properties.device_type),
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            max_sampler_anisotropy: properties.limits.max_sampler_anisotropy,
            geometry_shader: features.geometry_shader == vk::TRUE,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
            swapchain_extension,
            queue_families,
            depth_formats,
            surface_capabilities,
            surface_formats,
            present_modes,
        };

        engine_trace!("toyvk::vulkan", "Queried device candidate: {:?}", candidate);
        candidate
    }
}
