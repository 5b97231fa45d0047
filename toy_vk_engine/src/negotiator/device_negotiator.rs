//! Device & surface negotiation
//!
//! Pure selection logic over backend-neutral device descriptions. The
//! backend queries the driver, builds one `DeviceCandidate` per physical
//! device, and lets `negotiate` pick the device and swapchain parameters.

use crate::error::Result;
use crate::graphics_device::{
    ColorSpace, DeviceType, Extent2D, Format, PresentMode, SurfaceCapabilities, SurfaceFormat,
};
use std::fmt;

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [Format; 3] = [
    Format::D32_SFLOAT,
    Format::D32_SFLOAT_S8_UINT,
    Format::D24_UNORM_S8_UINT,
];

/// Bonus added to discrete GPUs
pub const DISCRETE_GPU_BONUS: u32 = 1000;

/// Queue family as seen by negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyCandidate {
    pub index: u32,
    pub supports_graphics: bool,
    /// Can present to the target surface
    pub supports_present: bool,
}

/// Everything negotiation needs to know about one physical device
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCandidate {
    pub name: String,
    pub device_type: DeviceType,
    pub max_image_dimension_2d: u32,
    pub max_sampler_anisotropy: f32,
    pub geometry_shader: bool,
    pub sampler_anisotropy: bool,
    pub swapchain_extension: bool,
    pub queue_families: Vec<QueueFamilyCandidate>,
    /// Candidate formats usable as an optimal-tiling depth attachment
    pub depth_formats: Vec<Format>,
    /// `None` when the driver could not report them for this surface
    pub surface_capabilities: Option<SurfaceCapabilities>,
    pub surface_formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
}

/// Why a device was not considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoGeometryShader,
    NoSamplerAnisotropy,
    NoGraphicsPresentQueue,
    NoSwapchainExtension,
    NoSurfaceCapabilities,
    NoSurfaceFormat,
    NoPresentMode,
    NoDepthFormat,
    ZeroScore,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::NoGeometryShader => "no geometry shader stage",
            Rejection::NoSamplerAnisotropy => "no anisotropic sampling",
            Rejection::NoGraphicsPresentQueue => "no queue family with graphics and present support",
            Rejection::NoSwapchainExtension => "VK_KHR_swapchain not supported",
            Rejection::NoSurfaceCapabilities => "surface capabilities unavailable",
            Rejection::NoSurfaceFormat => "surface reports no formats",
            Rejection::NoPresentMode => "surface reports no present modes",
            Rejection::NoDepthFormat => "no depth attachment format",
            Rejection::ZeroScore => "score is zero",
        };
        f.write_str(text)
    }
}

/// A device that passed every hard requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEvaluation {
    pub score: u32,
    pub queue_family_index: u32,
    pub depth_format: Format,
}

/// Final negotiation result
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedDevice {
    /// Index into the candidate list
    pub index: usize,
    pub score: u32,
    pub queue_family_index: u32,
    pub depth_format: Format,
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub extent: Extent2D,
    pub image_count: u32,
    pub max_anisotropy: f32,
}

/// First candidate format the device supports, in preference order
pub fn find_depth_format(supported: &[Format]) -> Option<Format> {
    DEPTH_FORMAT_CANDIDATES
        .iter()
        .copied()
        .find(|candidate| supported.contains(candidate))
}

/// First family supporting both graphics and presentation
pub fn find_queue_family(families: &[QueueFamilyCandidate]) -> Option<u32> {
    families
        .iter()
        .find(|f| f.supports_graphics && f.supports_present)
        .map(|f| f.index)
}

/// Apply the hard requirements, then score
pub fn evaluate_device(candidate: &DeviceCandidate) -> std::result::Result<DeviceEvaluation, Rejection> {
    if !candidate.geometry_shader {
        return Err(Rejection::NoGeometryShader);
    }
    if !candidate.sampler_anisotropy {
        return Err(Rejection::NoSamplerAnisotropy);
    }
    let queue_family_index =
        find_queue_family(&candidate.queue_families).ok_or(Rejection::NoGraphicsPresentQueue)?;
    if !candidate.swapchain_extension {
        return Err(Rejection::NoSwapchainExtension);
    }
    if candidate.surface_capabilities.is_none() {
        return Err(Rejection::NoSurfaceCapabilities);
    }
    if candidate.surface_formats.is_empty() {
        return Err(Rejection::NoSurfaceFormat);
    }
    if candidate.present_modes.is_empty() {
        return Err(Rejection::NoPresentMode);
    }
    let depth_format = find_depth_format(&candidate.depth_formats).ok_or(Rejection::NoDepthFormat)?;

    let score = score_device(candidate);
    if score == 0 {
        return Err(Rejection::ZeroScore);
    }
    Ok(DeviceEvaluation { score, queue_family_index, depth_format })
}

/// `max_image_dimension_2d`, plus the bonus for discrete GPUs
pub fn score_device(candidate: &DeviceCandidate) -> u32 {
    let bonus = if candidate.device_type == DeviceType::DiscreteGpu {
        DISCRETE_GPU_BONUS
    } else {
        0
    };
    candidate.max_image_dimension_2d.saturating_add(bonus)
}

/// Prefer B8G8R8A8_SRGB + sRGB nonlinear, else the first reported format
pub fn choose_surface_format(formats: &[SurfaceFormat]) -> Option<SurfaceFormat> {
    formats
        .iter()
        .find(|f| f.format == Format::B8G8R8A8_SRGB && f.color_space == ColorSpace::SrgbNonlinear)
        .or_else(|| formats.first())
        .copied()
}

/// Prefer FIFO, else the first reported mode
pub fn choose_present_mode(modes: &[PresentMode]) -> Option<PresentMode> {
    modes
        .iter()
        .find(|m| **m == PresentMode::Fifo)
        .or_else(|| modes.first())
        .copied()
}

/// Undefined current extent: clamp the window size; otherwise take the surface's
pub fn choose_swapchain_extent(capabilities: &SurfaceCapabilities, requested: Extent2D) -> Extent2D {
    if capabilities.current_extent.width == u32::MAX {
        Extent2D {
            width: requested.width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width.max(capabilities.min_image_extent.width),
            ),
            height: requested.height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height.max(capabilities.min_image_extent.height),
            ),
        }
    } else {
        capabilities.current_extent
    }
}

/// One more than the minimum, bounded by the maximum when there is one
pub fn choose_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Highest-scoring acceptable device, logging every rejection
///
/// Ties keep the earlier device. No acceptable device is a
/// `CapabilityNegotiation` error.
pub fn select_device(candidates: &[DeviceCandidate]) -> Result<(usize, DeviceEvaluation)> {
    let mut best: Option<(usize, DeviceEvaluation)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match evaluate_device(candidate) {
            Ok(evaluation) => {
                crate::engine_debug!(
                    "toyvk::negotiator",
                    "Device '{}' ({:?}) scored {}",
                    candidate.name,
                    candidate.device_type,
                    evaluation.score
                );
                if best.map_or(true, |(_, b)| evaluation.score > b.score) {
                    best = Some((index, evaluation));
                }
            }
            Err(reason) => {
                crate::engine_info!(
                    "toyvk::negotiator",
                    "Rejected device '{}': {}",
                    candidate.name,
                    reason
                );
            }
        }
    }

    match best {
        Some(found) => Ok(found),
        None => crate::engine_bail!(
            "toyvk::negotiator",
            CapabilityNegotiation,
            "No suitable device among {} candidate(s)",
            candidates.len()
        ),
    }
}

/// Pick the best device and its swapchain parameters
pub fn negotiate(candidates: &[DeviceCandidate], requested: Extent2D) -> Result<NegotiatedDevice> {
    let (index, evaluation) = select_device(candidates)?;
    let chosen = &candidates[index];

    // Capabilities and both lists were checked by evaluate_device
    let capabilities = chosen.surface_capabilities.as_ref().ok_or_else(|| {
        crate::engine_err!("toyvk::negotiator", CapabilityNegotiation, "No surface capabilities")
    })?;
    let surface_format = choose_surface_format(&chosen.surface_formats).ok_or_else(|| {
        crate::engine_err!("toyvk::negotiator", CapabilityNegotiation, "No surface format")
    })?;
    let present_mode = choose_present_mode(&chosen.present_modes).ok_or_else(|| {
        crate::engine_err!("toyvk::negotiator", CapabilityNegotiation, "No present mode")
    })?;
    let extent = choose_swapchain_extent(capabilities, requested);
    let image_count = choose_image_count(capabilities);

    crate::engine_info!(
        "toyvk::negotiator",
        "Selected '{}' (score {}), {:?}/{:?}, {:?}, {}x{}, {} images, depth {:?}",
        chosen.name,
        evaluation.score,
        surface_format.format,
        surface_format.color_space,
        present_mode,
        extent.width,
        extent.height,
        image_count,
        evaluation.depth_format
    );

    Ok(NegotiatedDevice {
        index,
        score: evaluation.score,
        queue_family_index: evaluation.queue_family_index,
        depth_format: evaluation.depth_format,
        surface_format,
        present_mode,
        extent,
        image_count,
        max_anisotropy: chosen.max_sampler_anisotropy,
    })
}

#[cfg(test)]
#[path = "device_negotiator_tests.rs"]
mod tests;
