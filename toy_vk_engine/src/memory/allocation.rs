/// Owned GPU allocations
///
/// A `GpuBuffer` / `GpuImage` is the exclusive owner of its device objects
/// and backing memory. Everything is released exactly once, in `Drop`.

use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    BufferHandle, BufferUsageFlags, Format, GraphicsDevice, ImageHandle, ImageViewHandle,
    MemoryHandle,
};

// ===== BUFFER =====

/// Buffer + its dedicated memory
pub struct GpuBuffer {
    device: Arc<dyn GraphicsDevice>,
    buffer: BufferHandle,
    memory: MemoryHandle,
    size: u64,
    usage: BufferUsageFlags,
    /// Persistent mapping, if any
    mapped: Option<NonNull<u8>>,
}

impl GpuBuffer {
    pub(crate) fn new(
        device: Arc<dyn GraphicsDevice>,
        buffer: BufferHandle,
        memory: MemoryHandle,
        size: u64,
        usage: BufferUsageFlags,
    ) -> Self {
        Self { device, buffer, memory, size, usage, mapped: None }
    }

    pub fn handle(&self) -> BufferHandle {
        self.buffer
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory
    }

    /// Requested size in bytes (not the allocation size)
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsageFlags {
        self.usage
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Map the whole buffer until it is dropped
    ///
    /// The memory must be host visible.
    pub fn map_persistent(&mut self) -> Result<()> {
        if self.mapped.is_some() {
            return Ok(());
        }
        let ptr = self.device.map_memory(self.memory, self.size)?;
        match NonNull::new(ptr) {
            Some(ptr) => {
                self.mapped = Some(ptr);
                Ok(())
            }
            None => {
                self.device.unmap_memory(self.memory);
                crate::engine_bail!("toyvk::memory", ResourceCreation, "Mapping returned a null pointer")
            }
        }
    }

    pub fn unmap(&mut self) {
        if self.mapped.take().is_some() {
            self.device.unmap_memory(self.memory);
        }
    }

    /// Copy `bytes` into a persistently mapped buffer at `offset`
    pub fn write(&self, offset: u64, bytes: &[u8]) -> Result<()> {
        let ptr = match self.mapped {
            Some(ptr) => ptr,
            None => crate::engine_bail!(
                "toyvk::memory",
                InvalidResource,
                "Write to unmapped buffer {:?}",
                self.buffer
            ),
        };
        if offset + bytes.len() as u64 > self.size {
            crate::engine_bail!(
                "toyvk::memory",
                InvalidResource,
                "Write of {} bytes at offset {} overflows buffer of {} bytes",
                bytes.len(),
                offset,
                self.size
            );
        }
        // SAFETY: the mapping covers `size` bytes and the range was checked above
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr().add(offset as usize), bytes.len());
        }
        Ok(())
    }

    /// Copy `len` bytes out of a persistently mapped buffer
    pub fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let ptr = match self.mapped {
            Some(ptr) => ptr,
            None => crate::engine_bail!(
                "toyvk::memory",
                InvalidResource,
                "Read from unmapped buffer {:?}",
                self.buffer
            ),
        };
        if offset + len > self.size {
            crate::engine_bail!(
                "toyvk::memory",
                InvalidResource,
                "Read of {} bytes at offset {} overflows buffer of {} bytes",
                len,
                offset,
                self.size
            );
        }
        let mut bytes = vec![0u8; len as usize];
        // SAFETY: same bounds as `write`
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr().add(offset as usize), bytes.as_mut_ptr(), bytes.len());
        }
        Ok(bytes)
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        self.unmap();
        self.device.destroy_buffer(self.buffer);
        self.device.free_memory(self.memory);
    }
}

// ===== IMAGE =====

/// 2D image + view + its dedicated memory
pub struct GpuImage {
    device: Arc<dyn GraphicsDevice>,
    image: ImageHandle,
    view: ImageViewHandle,
    memory: MemoryHandle,
    width: u32,
    height: u32,
    format: Format,
}

impl GpuImage {
    pub(crate) fn new(
        device: Arc<dyn GraphicsDevice>,
        image: ImageHandle,
        view: ImageViewHandle,
        memory: MemoryHandle,
        width: u32,
        height: u32,
        format: Format,
    ) -> Self {
        Self { device, image, view, memory, width, height, format }
    }

    pub fn handle(&self) -> ImageHandle {
        self.image
    }

    pub fn view(&self) -> ImageViewHandle {
        self.view
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        self.device.destroy_image_view(self.view);
        self.device.destroy_image(self.image);
        self.device.free_memory(self.memory);
    }
}
