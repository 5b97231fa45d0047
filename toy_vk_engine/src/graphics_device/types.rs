/// Backend-neutral device types: opaque handles, formats, flags and
/// the small descriptor structs passed across the `GraphicsDevice` seam.
///
/// Flag bit values match Vulkan so the backend converts with `from_raw`.

use bitflags::bitflags;

// ===== HANDLES =====

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
            pub struct $name(pub u64);

            impl $name {
                pub const NULL: Self = Self(0);

                pub fn is_null(self) -> bool {
                    self.0 == 0
                }
            }
        )*
    };
}

define_handle!(
    BufferHandle,
    ImageHandle,
    ImageViewHandle,
    /// Device memory allocation
    MemoryHandle,
    SamplerHandle,
    CommandBufferHandle,
    SemaphoreHandle,
    FenceHandle,
    DescriptorPoolHandle,
    DescriptorSetLayoutHandle,
    DescriptorSetHandle,
    RenderPassHandle,
    FramebufferHandle,
    ShaderModuleHandle,
    PipelineLayoutHandle,
    PipelineHandle,
);

// ===== FORMATS =====

/// Pixel / vertex attribute formats known to the core
///
/// Anything else a driver reports is carried as `Other(raw)`.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Undefined,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
    D24_UNORM_S8_UINT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    Other(i32),
}

impl Format {
    pub fn has_stencil(self) -> bool {
        matches!(self, Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT)
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Format::D32_SFLOAT | Format::D32_SFLOAT_S8_UINT | Format::D24_UNORM_S8_UINT
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Other(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    /// Vsync-locked queue, always supported by conforming drivers
    Fifo,
    FifoRelaxed,
    Other(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: Format,
    pub color_space: ColorSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

/// Surface limits reported by the presentation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    /// `u32::MAX` width means the window size decides
    pub current_extent: Extent2D,
    pub min_image_extent: Extent2D,
    pub max_image_extent: Extent2D,
}

// ===== FLAGS =====

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL = 0x1;
        const HOST_VISIBLE = 0x2;
        const HOST_COHERENT = 0x4;
        const HOST_CACHED = 0x8;
        const LAZILY_ALLOCATED = 0x10;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsageFlags: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const UNIFORM_BUFFER = 0x10;
        const INDEX_BUFFER = 0x40;
        const VERTEX_BUFFER = 0x80;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsageFlags: u32 {
        const TRANSFER_SRC = 0x1;
        const TRANSFER_DST = 0x2;
        const SAMPLED = 0x4;
        const COLOR_ATTACHMENT = 0x10;
        const DEPTH_STENCIL_ATTACHMENT = 0x20;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspectFlags: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE = 0x1;
        const FRAGMENT_SHADER = 0x80;
        const EARLY_FRAGMENT_TESTS = 0x100;
        const COLOR_ATTACHMENT_OUTPUT = 0x400;
        const TRANSFER = 0x1000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 0x20;
        const COLOR_ATTACHMENT_WRITE = 0x100;
        const DEPTH_STENCIL_ATTACHMENT_READ = 0x200;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 0x400;
        const TRANSFER_READ = 0x800;
        const TRANSFER_WRITE = 0x1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    TransferDstOptimal,
    ShaderReadOnlyOptimal,
    DepthStencilAttachmentOptimal,
}

// ===== MEMORY =====

/// One entry of the device's memory type list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub property_flags: MemoryPropertyFlags,
    pub heap_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub alignment: u64,
    /// Bit `i` set when memory type `i` may back the resource
    pub memory_type_bits: u32,
}

// ===== DESCRIPTORS =====

/// 2D, optimal tiling, one mip level, one array layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: Format,
    pub usage: ImageUsageFlags,
}

/// Single image memory barrier, optionally changing layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: ImageHandle,
    pub aspect: ImageAspectFlags,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src_stage: PipelineStageFlags,
    pub dst_stage: PipelineStageFlags,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

/// One queue submission of one command buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitInfo {
    pub command_buffer: CommandBufferHandle,
    pub wait_semaphore: Option<SemaphoreHandle>,
    pub wait_stage: PipelineStageFlags,
    pub signal_semaphore: Option<SemaphoreHandle>,
    pub fence: Option<FenceHandle>,
}

/// Binding 0 = uniform buffer, binding 1 = combined image sampler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorWrite {
    pub uniform_buffer: BufferHandle,
    pub uniform_range: u64,
    pub image_view: ImageViewHandle,
    pub sampler: SamplerHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    pub color: [f32; 4],
    pub depth: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: Format,
    pub offset: u32,
}

/// Fixed-function state is not configurable: triangle list, back-face
/// culling off, depth test less-than with writes, no blending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDesc {
    pub render_pass: RenderPassHandle,
    pub layout: PipelineLayoutHandle,
    pub vertex_shader: ShaderModuleHandle,
    pub fragment_shader: ShaderModuleHandle,
    pub vertex_stride: u32,
    pub vertex_attributes: Vec<VertexAttribute>,
}

/// Values fixed by device negotiation, immutable for the device's lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceContext {
    pub device_name: String,
    pub device_type: DeviceType,
    pub score: u32,
    pub queue_family_index: u32,
    pub surface_format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub depth_format: Format,
    pub extent: Extent2D,
    pub max_anisotropy: f32,
    /// Number of swapchain images actually created
    pub image_count: u32,
}
