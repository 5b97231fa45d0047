/// VulkanGraphicsDevice - instance, surface, logical device and swapchain
///
/// Construction negotiates the physical device through the core's
/// negotiator, then creates exactly what the negotiated `DeviceContext`
/// describes. The `GraphicsDevice` implementation lives in
/// `vulkan_graphics_device.rs`.

use std::ffi::CStr;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use toy_vk_engine::toyvk::device::{DeviceContext, Extent2D, MemoryType};
use toy_vk_engine::toyvk::negotiator::negotiate;
use toy_vk_engine::toyvk::{Config, Error, Result};
use toy_vk_engine::{engine_debug, engine_err, engine_info, engine_warn};

use crate::vulkan_format::memory_properties_from_vk;
use crate::vulkan_negotiation::gather_candidates;
use crate::vulkan_swapchain::Swapchain;

/// Map a failed driver call to the engine's error classes
///
/// Out-of-memory results (descriptor pool exhaustion included) become
/// `OutOfMemory`, everything else `ResourceCreation`.
pub(crate) fn creation_error(what: &str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_OUT_OF_HOST_MEMORY
        | vk::Result::ERROR_OUT_OF_DEVICE_MEMORY
        | vk::Result::ERROR_OUT_OF_POOL_MEMORY
        | vk::Result::ERROR_FRAGMENTED_POOL => {
            engine_err!("toyvk::vulkan", OutOfMemory, "{}: {:?}", what, result)
        }
        _ => engine_err!("toyvk::vulkan", ResourceCreation, "{}: {:?}", what, result),
    }
}

/// Fence waits, acquire, submit and present failures
pub(crate) fn sync_error(what: &str, result: vk::Result) -> Error {
    engine_err!("toyvk::vulkan", Synchronization, "{}: {:?}", what, result)
}

pub(crate) const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Whether `name` is among the instance layers the loader reports
pub(crate) fn layer_available(layers: &[vk::LayerProperties], name: &CStr) -> bool {
    layers.iter().any(|layer| layer.layer_name_as_c_str() == Ok(name))
}

/// Instance-level objects, destroyed after everything created from them
pub(crate) struct InstanceLayer {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,
    #[cfg(feature = "vulkan-validation")]
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl InstanceLayer {
    fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        let display_handle = window.display_handle().map_err(|e| {
            engine_err!("toyvk::vulkan", CapabilityNegotiation, "Failed to get display handle: {}", e)
        })?;
        let window_handle = window.window_handle().map_err(|e| {
            engine_err!("toyvk::vulkan", CapabilityNegotiation, "Failed to get window handle: {}", e)
        })?;

        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_err!("toyvk::vulkan", CapabilityNegotiation, "Failed to load Vulkan library: {}", e)
            })?;

            // Interior NULs would truncate the name; fall back to a fixed one
            let app_name = std::ffi::CString::new(config.title.as_str())
                .unwrap_or_else(|_| c"Toy Vk Application".to_owned());
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Toy Vk Engine")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_0);

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| creation_error("Failed to query surface extensions", e))?
                .to_vec();

            let validation = Self::validation_requested(config) && Self::validation_available(&entry);
            let mut layer_names = Vec::new();
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
                layer_names.push(VALIDATION_LAYER.as_ptr());
            }

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| creation_error("Failed to create Vulkan instance", e))?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // From here on a failure must release the instance
            let mut layer = Self {
                _entry: entry,
                instance,
                surface_loader,
                surface: vk::SurfaceKHR::null(),
                #[cfg(feature = "vulkan-validation")]
                debug_messenger: None,
            };

            #[cfg(feature = "vulkan-validation")]
            if validation {
                layer.debug_messenger = Some(crate::debug::create_debug_messenger(&layer._entry, &layer.instance)?);
            }

            layer.surface = ash_window::create_surface(
                &layer._entry,
                &layer.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| creation_error("Failed to create window surface", e))?;

            Ok(layer)
        }
    }

    #[cfg(feature = "vulkan-validation")]
    fn validation_requested(config: &Config) -> bool {
        config.enable_validation
    }

    #[cfg(not(feature = "vulkan-validation"))]
    fn validation_requested(config: &Config) -> bool {
        if config.enable_validation {
            engine_warn!(
                "toyvk::vulkan",
                "Validation requested but the crate was built without the 'vulkan-validation' feature"
            );
        }
        false
    }

    /// A missing layer downgrades to running without validation
    unsafe fn validation_available(entry: &ash::Entry) -> bool {
        let layers = match entry.enumerate_instance_layer_properties() {
            Ok(layers) => layers,
            Err(e) => {
                engine_warn!("toyvk::vulkan", "Failed to enumerate instance layers: {:?}", e);
                Vec::new()
            }
        };
        if layer_available(&layers, VALIDATION_LAYER) {
            true
        } else {
            engine_warn!(
                "toyvk::vulkan",
                "{} not installed, continuing without validation",
                VALIDATION_LAYER.to_string_lossy()
            );
            false
        }
    }
}

impl Drop for InstanceLayer {
    fn drop(&mut self) {
        unsafe {
            if self.surface != vk::SurfaceKHR::null() {
                self.surface_loader.destroy_surface(self.surface, None);
            }

            #[cfg(feature = "vulkan-validation")]
            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}

/// Vulkan implementation of the core's `GraphicsDevice`
///
/// One graphics queue that also presents, one resettable command pool and
/// the swapchain created from the negotiated parameters. Driven from a
/// single thread.
pub struct VulkanGraphicsDevice {
    pub(crate) device: ash::Device,
    pub(crate) queue: vk::Queue,
    pub(crate) command_pool: vk::CommandPool,
    pub(crate) swapchain: Swapchain,
    pub(crate) memory_types: Vec<MemoryType>,
    pub(crate) context: DeviceContext,
    // Dropped last: surface and instance outlive the device
    pub(crate) instance: InstanceLayer,
}

impl VulkanGraphicsDevice {
    /// Create instance, surface, device and swapchain for `window`
    ///
    /// No acceptable physical device is a `CapabilityNegotiation` error.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &Config) -> Result<Self> {
        config.validate()?;

        let instance = InstanceLayer::new(window, config)?;

        let physical_devices = unsafe { instance.instance.enumerate_physical_devices() }
            .map_err(|e| creation_error("Failed to enumerate physical devices", e))?;
        let candidates = gather_candidates(&instance, &physical_devices);
        let negotiated = negotiate(&candidates, Extent2D::new(config.width, config.height))?;
        let physical_device = physical_devices[negotiated.index];

        let device = Self::create_logical_device(&instance.instance, physical_device, negotiated.queue_family_index)?;
        let queue = unsafe { device.get_device_queue(negotiated.queue_family_index, 0) };

        let swapchain = match Swapchain::new(&instance, physical_device, &device, &negotiated) {
            Ok(swapchain) => swapchain,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e);
            }
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(negotiated.queue_family_index);
        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                swapchain.destroy(&device);
                unsafe { device.destroy_device(None) };
                return Err(creation_error("Failed to create command pool", e));
            }
        };

        let memory_properties = unsafe { instance.instance.get_physical_device_memory_properties(physical_device) };
        let memory_types = memory_properties
            .memory_types_as_slice()
            .iter()
            .map(|ty| MemoryType {
                property_flags: memory_properties_from_vk(ty.property_flags),
                heap_index: ty.heap_index,
            })
            .collect::<Vec<_>>();

        let context = DeviceContext {
            device_name: candidates[negotiated.index].name.clone(),
            device_type: candidates[negotiated.index].device_type,
            score: negotiated.score,
            queue_family_index: negotiated.queue_family_index,
            surface_format: negotiated.surface_format,
            present_mode: negotiated.present_mode,
            depth_format: negotiated.depth_format,
            extent: negotiated.extent,
            max_anisotropy: negotiated.max_anisotropy,
            image_count: swapchain.image_count(),
        };

        engine_info!(
            "toyvk::vulkan",
            "Vulkan device ready: '{}', {} memory types, {} swapchain images at {}x{}",
            context.device_name,
            memory_types.len(),
            context.image_count,
            context.extent.width,
            context.extent.height
        );

        Ok(Self {
            device,
            queue,
            command_pool,
            swapchain,
            memory_types,
            context,
            instance,
        })
    }

    fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<ash::Device> {
        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)];

        let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .enabled_features(&device_features);

        unsafe { instance.create_device(physical_device, &device_create_info, None) }
            .map_err(|e| creation_error("Failed to create logical device", e))
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                engine_warn!("toyvk::vulkan", "device_wait_idle failed during shutdown: {:?}", e);
            }

            self.device.destroy_command_pool(self.command_pool, None);
            self.swapchain.destroy(&self.device);
            self.device.destroy_device(None);
        }
        engine_debug!("toyvk::vulkan", "Vulkan device destroyed");
        // self.instance drops next: surface, debug messenger, instance
    }
}

#[cfg(test)]
#[path = "vulkan_tests.rs"]
mod tests;
