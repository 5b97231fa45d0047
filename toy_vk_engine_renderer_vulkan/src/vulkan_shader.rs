/// Shader modules from SPIR-V bytes
///
/// The binary is reflected with spirq before the driver sees it, so a
/// module without a `main` entry point fails early with a readable error.

use ash::vk;
use std::io::Cursor;
use toy_vk_engine::toyvk::Result;
use toy_vk_engine::engine_err;

use crate::vulkan::creation_error;

pub(crate) const SHADER_ENTRY_POINT: &std::ffi::CStr = c"main";

/// Decode SPIR-V bytes into aligned words and check the entry point
pub(crate) fn load_spirv(code: &[u8]) -> Result<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(code)).map_err(|e| {
        engine_err!("toyvk::vulkan", ResourceCreation, "Invalid SPIR-V ({} bytes): {}", code.len(), e)
    })?;
    if words.is_empty() {
        return Err(engine_err!("toyvk::vulkan", ResourceCreation, "Empty SPIR-V module"));
    }

    let entry_points = spirq::ReflectConfig::new()
        .spv(words.as_slice())
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!("toyvk::vulkan", ResourceCreation, "SPIR-V reflection failed: {:?}", e))?;

    let entry = SHADER_ENTRY_POINT.to_string_lossy();
    if !entry_points.iter().any(|ep| ep.name == entry) {
        return Err(engine_err!(
            "toyvk::vulkan",
            ResourceCreation,
            "SPIR-V module has no '{}' entry point (found: {:?})",
            entry,
            entry_points.iter().map(|ep| ep.name.as_str()).collect::<Vec<_>>()
        ));
    }

    Ok(words)
}

pub(crate) fn create_shader_module(device: &ash::Device, code: &[u8]) -> Result<vk::ShaderModule> {
    let words = load_spirv(code)?;
    let create_info = vk::ShaderModuleCreateInfo::default().code(&words);
    unsafe { device.create_shader_module(&create_info, None) }
        .map_err(|e| creation_error("Failed to create shader module", e))
}
