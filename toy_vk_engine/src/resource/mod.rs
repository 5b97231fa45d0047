//! Resource management module
//!
//! Textures, drawable surfaces and their per-frame descriptor sets.

pub mod image_loader;
mod resource_pool;
pub mod surface;
pub mod texture;
pub mod vertex;

pub use image_loader::{DecodedImage, FileImageLoader, ImageLoader};
pub use resource_pool::ResourcePool;
pub use surface::{DescriptorBank, Surface, SurfaceKey};
pub use texture::{Texture, TextureKey};
pub use vertex::{UniformBufferObject, Vertex};
