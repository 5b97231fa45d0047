/// Sampled 2D texture owned by the resource pool

use slotmap::new_key_type;

use crate::graphics_device::{ImageHandle, ImageViewHandle};
use crate::memory::GpuImage;

new_key_type! {
    /// Stable key for a texture within a ResourcePool
    pub struct TextureKey;
}

/// RGBA8 sRGB image in ShaderReadOnlyOptimal layout
pub struct Texture {
    /// Source path, or a caller-chosen label for in-memory textures
    label: String,
    image: GpuImage,
}

impl Texture {
    pub(crate) fn new(label: String, image: GpuImage) -> Self {
        Self { label, image }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> ImageHandle {
        self.image.handle()
    }

    pub fn view(&self) -> ImageViewHandle {
        self.image.view()
    }
}
