/// Image decoding collaborator
///
/// The pool only needs tightly packed RGBA8 texels plus dimensions; how
/// they are produced is behind `ImageLoader`.

use std::path::Path;

use crate::error::Result;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major, top row first
    pub rgba: Vec<u8>,
}

pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage>;
}

/// Decodes PNG / JPEG files with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageLoader;

impl ImageLoader for FileImageLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage> {
        let decoded = image::open(path).map_err(|e| {
            crate::engine_err!("toyvk::resource", Io, "Failed to load image '{}': {}", path.display(), e)
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(DecodedImage { width, height, rgba: rgba.into_raw() })
    }
}

#[cfg(test)]
#[path = "image_loader_tests.rs"]
mod tests;
