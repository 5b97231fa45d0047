//! Resource pool: textures, surfaces and their descriptor sets
//!
//! Textures are owned here and cached by canonical path. Surfaces reference a texture
//! by key and never free it; a texture can only be destroyed once no live
//! surface uses it. Descriptor sets come from one shared pool created with
//! individually freeable sets.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::error::Result;
use crate::graphics_device::{
    BufferUsageFlags, DescriptorPoolHandle, DescriptorSetLayoutHandle, DescriptorWrite,
    GraphicsDevice, ImageViewHandle, MemoryPropertyFlags, SamplerHandle,
};
use crate::memory::MemoryManager;
use crate::resource::image_loader::ImageLoader;
use crate::resource::surface::{DescriptorBank, FrameDescriptor, Surface, SurfaceKey};
use crate::resource::texture::{Texture, TextureKey};
use crate::resource::vertex::{UniformBufferObject, Vertex};

pub struct ResourcePool {
    memory: MemoryManager,
    frames_in_flight: usize,
    set_layout: DescriptorSetLayoutHandle,
    descriptor_pool: DescriptorPoolHandle,
    max_descriptor_sets: u32,
    sets_in_use: u32,
    sampler: SamplerHandle,
    textures: SlotMap<TextureKey, Texture>,
    texture_cache: FxHashMap<PathBuf, TextureKey>,
    surfaces: SlotMap<SurfaceKey, Surface>,
}

impl ResourcePool {
    /// Create the shared descriptor set layout, descriptor pool and sampler
    pub fn new(device: Arc<dyn GraphicsDevice>, frames_in_flight: usize, max_descriptor_sets: u32) -> Result<Self> {
        if frames_in_flight == 0 || (max_descriptor_sets as usize) < frames_in_flight {
            crate::engine_bail!(
                "toyvk::resource",
                Configuration,
                "Descriptor pool of {} sets cannot serve {} frames in flight",
                max_descriptor_sets,
                frames_in_flight
            );
        }

        let set_layout = device.create_descriptor_set_layout()?;
        let descriptor_pool = match device.create_descriptor_pool(max_descriptor_sets) {
            Ok(pool) => pool,
            Err(e) => {
                device.destroy_descriptor_set_layout(set_layout);
                return Err(e);
            }
        };
        let sampler = match device.create_sampler(device.context().max_anisotropy) {
            Ok(sampler) => sampler,
            Err(e) => {
                device.destroy_descriptor_pool(descriptor_pool);
                device.destroy_descriptor_set_layout(set_layout);
                return Err(e);
            }
        };

        Ok(Self {
            memory: MemoryManager::new(device),
            frames_in_flight,
            set_layout,
            descriptor_pool,
            max_descriptor_sets,
            sets_in_use: 0,
            sampler,
            textures: SlotMap::with_key(),
            texture_cache: FxHashMap::default(),
            surfaces: SlotMap::with_key(),
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub fn descriptor_set_layout(&self) -> DescriptorSetLayoutHandle {
        self.set_layout
    }

    pub fn sampler(&self) -> SamplerHandle {
        self.sampler
    }

    pub fn descriptor_sets_in_use(&self) -> u32 {
        self.sets_in_use
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    // ===== TEXTURES =====

    /// Decode and upload the image at `path`, or return the cached texture
    pub fn create_texture(&mut self, path: &Path, loader: &dyn ImageLoader) -> Result<TextureKey> {
        let cache_key = texture_cache_key(path);
        if let Some(&key) = self.texture_cache.get(&cache_key) {
            if self.textures.contains_key(key) {
                crate::engine_trace!("toyvk::resource", "Texture cache hit for '{}'", path.display());
                return Ok(key);
            }
        }

        let decoded = loader.load(path)?;
        let key = self.create_texture_from_pixels(
            &path.display().to_string(),
            decoded.width,
            decoded.height,
            &decoded.rgba,
        )?;
        self.texture_cache.insert(cache_key, key);
        Ok(key)
    }

    /// Upload in-memory RGBA8 texels (not cached)
    pub fn create_texture_from_pixels(&mut self, label: &str, width: u32, height: u32, rgba: &[u8]) -> Result<TextureKey> {
        let image = self.memory.upload_texture_image(width, height, rgba)?;
        let key = self.textures.insert(Texture::new(label.to_string(), image));
        crate::engine_debug!("toyvk::resource", "Created texture '{}' ({}x{})", label, width, height);
        Ok(key)
    }

    pub fn texture(&self, key: TextureKey) -> Option<&Texture> {
        self.textures.get(key)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Destroy a texture no surface references any more
    pub fn destroy_texture(&mut self, key: TextureKey) -> Result<()> {
        if !self.textures.contains_key(key) {
            crate::engine_bail!("toyvk::resource", InvalidResource, "Unknown texture {:?}", key);
        }
        let users = self.surfaces.values().filter(|s| s.texture == key).count();
        if users > 0 {
            crate::engine_bail!(
                "toyvk::resource",
                InvalidResource,
                "Texture {:?} is still used by {} surface(s)",
                key,
                users
            );
        }
        self.texture_cache.retain(|_, cached| *cached != key);
        self.textures.remove(key);
        Ok(())
    }

    // ===== SURFACES =====

    /// Upload geometry and allocate one descriptor set per frame slot
    pub fn create_surface(&mut self, vertices: &[Vertex], indices: &[u32], texture: TextureKey) -> Result<SurfaceKey> {
        let view = self.texture_view(texture)?;
        if vertices.is_empty() || indices.is_empty() {
            crate::engine_bail!("toyvk::resource", ResourceCreation, "Surface needs vertices and indices");
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            crate::engine_bail!(
                "toyvk::resource",
                ResourceCreation,
                "Index {} out of range for {} vertices",
                bad,
                vertices.len()
            );
        }

        let vertex_buffer = self
            .memory
            .create_device_local_buffer(bytemuck::cast_slice(vertices), BufferUsageFlags::VERTEX_BUFFER)?;
        let index_buffer = self
            .memory
            .create_device_local_buffer(bytemuck::cast_slice(indices), BufferUsageFlags::INDEX_BUFFER)?;
        let bank = self.create_bank(view)?;

        let key = self.surfaces.insert(Surface {
            vertex_buffer,
            index_buffer,
            vertex_count: vertices.len() as u32,
            index_count: indices.len() as u32,
            texture,
            banks: vec![bank],
        });
        crate::engine_debug!(
            "toyvk::resource",
            "Created surface {:?}: {} vertices, {} indices",
            key,
            vertices.len(),
            indices.len()
        );
        Ok(key)
    }

    pub fn surface(&self, key: SurfaceKey) -> Option<&Surface> {
        self.surfaces.get(key)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Make sure `key` has at least `banks` descriptor banks
    pub fn ensure_banks(&mut self, key: SurfaceKey, banks: usize) -> Result<()> {
        let (have, texture) = match self.surfaces.get(key) {
            Some(surface) => (surface.banks.len(), surface.texture),
            None => crate::engine_bail!("toyvk::resource", InvalidResource, "Unknown surface {:?}", key),
        };
        if have >= banks {
            return Ok(());
        }
        let view = self.texture_view(texture)?;
        for _ in have..banks {
            let bank = self.create_bank(view)?;
            if let Some(surface) = self.surfaces.get_mut(key) {
                surface.banks.push(bank);
            }
        }
        crate::engine_debug!("toyvk::resource", "Surface {:?} grown to {} descriptor banks", key, banks);
        Ok(())
    }

    /// Destroy the surface's buffers and return its descriptor sets
    ///
    /// The GPU must no longer be using the surface. The texture is left alone.
    pub fn free_surface(&mut self, key: SurfaceKey) -> Result<()> {
        let surface = match self.surfaces.remove(key) {
            Some(surface) => surface,
            None => crate::engine_bail!("toyvk::resource", InvalidResource, "Unknown surface {:?}", key),
        };
        let Surface { banks, .. } = surface;
        for bank in banks {
            self.release_bank(bank);
        }
        Ok(())
    }

    // ===== DESCRIPTORS =====

    fn texture_view(&self, key: TextureKey) -> Result<ImageViewHandle> {
        match self.textures.get(key) {
            Some(texture) => Ok(texture.view()),
            None => crate::engine_bail!("toyvk::resource", InvalidResource, "Unknown texture {:?}", key),
        }
    }

    fn create_bank(&mut self, view: ImageViewHandle) -> Result<DescriptorBank> {
        let needed = self.frames_in_flight as u32;
        if self.sets_in_use + needed > self.max_descriptor_sets {
            crate::engine_bail!(
                "toyvk::resource",
                OutOfMemory,
                "Descriptor pool exhausted: {} of {} sets in use, {} more needed",
                self.sets_in_use,
                self.max_descriptor_sets,
                needed
            );
        }

        let mut bank = DescriptorBank { frames: Vec::with_capacity(self.frames_in_flight) };
        for _ in 0..self.frames_in_flight {
            match self.create_frame_descriptor(view) {
                Ok(frame) => {
                    self.sets_in_use += 1;
                    bank.frames.push(frame);
                }
                Err(e) => {
                    self.release_bank(bank);
                    return Err(e);
                }
            }
        }
        Ok(bank)
    }

    fn create_frame_descriptor(&self, view: ImageViewHandle) -> Result<FrameDescriptor> {
        let device = self.memory.device();
        let mut uniform = self.memory.create_buffer(
            UniformBufferObject::SIZE,
            BufferUsageFlags::UNIFORM_BUFFER,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
        )?;
        uniform.map_persistent()?;

        let set = device.allocate_descriptor_set(self.descriptor_pool, self.set_layout)?;
        device.write_descriptor_set(set, &DescriptorWrite {
            uniform_buffer: uniform.handle(),
            uniform_range: UniformBufferObject::SIZE,
            image_view: view,
            sampler: self.sampler,
        });
        Ok(FrameDescriptor { set, uniform })
    }

    fn release_bank(&mut self, bank: DescriptorBank) {
        let device = Arc::clone(self.memory.device());
        for frame in bank.frames {
            device.free_descriptor_set(self.descriptor_pool, frame.set);
            self.sets_in_use -= 1;
        }
    }
}

impl Drop for ResourcePool {
    fn drop(&mut self) {
        // Destroying the pool returns every remaining set
        self.surfaces.clear();
        self.textures.clear();
        let device = self.memory.device();
        device.destroy_descriptor_pool(self.descriptor_pool);
        device.destroy_sampler(self.sampler);
        device.destroy_descriptor_set_layout(self.set_layout);
    }
}

/// Canonical form of `path`, so different spellings of one file share a texture
///
/// Paths that cannot be canonicalized (e.g. not on disk) only drop `.` components.
pub(crate) fn texture_cache_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| {
        path.components()
            .filter(|component| *component != Component::CurDir)
            .collect()
    })
}

#[cfg(test)]
#[path = "resource_pool_tests.rs"]
mod tests;
