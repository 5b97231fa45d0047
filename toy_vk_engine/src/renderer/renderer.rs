/// Renderer - the per-frame draw orchestrator
///
/// Owns the frame ring, the resource pool, the shared depth buffer and the
/// single render pass / pipeline pair. `draw_frame` is the only call made
/// every frame.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::camera::{projection_matrix, Camera};
use crate::config::Config;
use crate::error::Result;
use crate::frame::{AcquiredFrame, FrameSynchronizer};
use crate::graphics_device::{
    ClearValues, Extent2D, FramebufferHandle, GraphicsDevice, PipelineDesc, PipelineHandle,
    PipelineLayoutHandle, RenderPassHandle, ShaderModuleHandle,
};
use crate::memory::{GpuImage, MemoryManager};
use crate::resource::{
    ImageLoader, ResourcePool, SurfaceKey, TextureKey, UniformBufferObject, Vertex,
};
use crate::scene::Object;

// ============================================================================
// Statistics
// ============================================================================

/// What one `draw_frame` call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Number of indexed draw calls recorded
    pub draw_calls: u32,
    /// Triangles across all draws
    pub triangles: u32,
    /// Ring slot the frame was recorded in
    pub frame_index: usize,
    /// Swapchain image it was presented to
    pub image_index: u32,
}

impl FrameStats {
    /// Count one indexed draw; counters saturate instead of wrapping
    pub fn record_draw(&mut self, index_count: u32) {
        self.draw_calls = self.draw_calls.saturating_add(1);
        self.triangles = self.triangles.saturating_add(index_count / 3);
    }
}

/// Camera projection parameters taken from `Config`
#[derive(Debug, Clone, Copy)]
struct Projection {
    fov_y_degrees: f32,
    near: f32,
    far: f32,
}

// ============================================================================
// Renderer
// ============================================================================

pub struct Renderer {
    // Fields drop in declaration order, after `Drop::drop` has released the
    // raw handles below: ring first, then surfaces/textures, then depth.
    frames: FrameSynchronizer,
    resources: ResourcePool,
    depth_buffer: GpuImage,
    device: Arc<dyn GraphicsDevice>,
    render_pass: RenderPassHandle,
    framebuffers: Vec<FramebufferHandle>,
    pipeline_layout: PipelineLayoutHandle,
    pipeline: PipelineHandle,
    extent: Extent2D,
    clear_color: [f32; 4],
    projection: Projection,
    frame_count: u64,
}

impl Renderer {
    /// Build everything needed to draw
    ///
    /// `vertex_spirv` and `fragment_spirv` are the precompiled shader
    /// stages; their modules are destroyed again once the pipeline exists.
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        config: &Config,
        vertex_spirv: &[u8],
        fragment_spirv: &[u8],
    ) -> Result<Self> {
        config.validate()?;
        let context = device.context().clone();

        let frames = FrameSynchronizer::new(device.clone(), config.frames_in_flight)?;
        let memory = MemoryManager::new(device.clone());
        let depth_buffer = memory.create_depth_buffer(context.extent, context.depth_format)?;
        let resources = ResourcePool::new(
            device.clone(),
            config.frames_in_flight as usize,
            config.max_descriptor_sets,
        )?;

        // Handles start null; a failure below leaves Drop to release what exists
        let mut renderer = Self {
            frames,
            resources,
            depth_buffer,
            device: device.clone(),
            render_pass: RenderPassHandle::NULL,
            framebuffers: Vec::with_capacity(device.swapchain_image_views().len()),
            pipeline_layout: PipelineLayoutHandle::NULL,
            pipeline: PipelineHandle::NULL,
            extent: context.extent,
            clear_color: config.clear_color,
            projection: Projection {
                fov_y_degrees: config.fov_y_degrees,
                near: config.near_plane,
                far: config.far_plane,
            },
            frame_count: 0,
        };

        renderer.render_pass =
            device.create_render_pass(context.surface_format.format, context.depth_format)?;
        for &view in device.swapchain_image_views() {
            let framebuffer = device.create_framebuffer(
                renderer.render_pass,
                view,
                renderer.depth_buffer.view(),
                context.extent,
            )?;
            renderer.framebuffers.push(framebuffer);
        }

        renderer.pipeline_layout =
            device.create_pipeline_layout(renderer.resources.descriptor_set_layout())?;
        renderer.pipeline = renderer.create_pipeline(vertex_spirv, fragment_spirv)?;

        crate::engine_info!(
            "toyvk::renderer",
            "Renderer ready: {} on {}x{}, {} frames in flight over {} swapchain images",
            context.device_name,
            context.extent.width,
            context.extent.height,
            config.frames_in_flight,
            context.image_count
        );
        Ok(renderer)
    }

    fn create_pipeline(&self, vertex_spirv: &[u8], fragment_spirv: &[u8]) -> Result<PipelineHandle> {
        let vertex_shader = self.device.create_shader_module(vertex_spirv)?;
        let fragment_shader = match self.device.create_shader_module(fragment_spirv) {
            Ok(module) => module,
            Err(e) => {
                self.device.destroy_shader_module(vertex_shader);
                return Err(e);
            }
        };

        let result = self.device.create_graphics_pipeline(&PipelineDesc {
            render_pass: self.render_pass,
            layout: self.pipeline_layout,
            vertex_shader,
            fragment_shader,
            vertex_stride: Vertex::STRIDE,
            vertex_attributes: Vertex::attributes(),
        });

        self.destroy_shader_modules(&[vertex_shader, fragment_shader]);
        result
    }

    fn destroy_shader_modules(&self, modules: &[ShaderModuleHandle]) {
        for &module in modules {
            self.device.destroy_shader_module(module);
        }
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn frames(&self) -> &FrameSynchronizer {
        &self.frames
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Frames drawn since creation
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    // ===== RESOURCES =====

    /// Decode and upload an image file (cached by path)
    pub fn create_texture(&mut self, path: &Path, loader: &dyn ImageLoader) -> Result<TextureKey> {
        self.resources.create_texture(path, loader)
    }

    pub fn create_texture_from_pixels(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureKey> {
        self.resources.create_texture_from_pixels(label, width, height, rgba)
    }

    pub fn create_surface(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
        texture: TextureKey,
    ) -> Result<SurfaceKey> {
        self.resources.create_surface(vertices, indices, texture)
    }

    /// Free a surface once every frame that might draw it has completed
    pub fn free_surface(&mut self, key: SurfaceKey) -> Result<()> {
        self.frames.wait_all()?;
        self.resources.free_surface(key)
    }

    pub fn destroy_texture(&mut self, key: TextureKey) -> Result<()> {
        self.frames.wait_all()?;
        self.resources.destroy_texture(key)
    }

    // ===== FRAME =====

    /// Record, submit and present one frame of `objects` seen from `camera`
    ///
    /// Blocks until the ring slot's previous frame has finished on the GPU.
    pub fn draw_frame(&mut self, camera: &Camera, objects: &[Object]) -> Result<FrameStats> {
        // One descriptor bank per instance of a surface in this frame,
        // allocated before the slot is acquired
        let mut instances: FxHashMap<SurfaceKey, usize> = FxHashMap::default();
        for object in objects {
            *instances.entry(object.surface).or_insert(0) += 1;
        }
        for (&key, &count) in &instances {
            self.resources.ensure_banks(key, count)?;
        }

        let frame = self.frames.acquire_frame()?;
        let stats = self.record(&frame, camera, objects)?;
        self.frames.submit(&frame)?;
        self.frames.present(&frame)?;
        self.frames.advance()?;

        self.frame_count += 1;
        crate::engine_trace!(
            "toyvk::renderer",
            "Frame {} (slot {}, image {}): {} draws, {} triangles",
            self.frame_count,
            stats.frame_index,
            stats.image_index,
            stats.draw_calls,
            stats.triangles
        );
        Ok(stats)
    }

    fn record(&self, frame: &AcquiredFrame, camera: &Camera, objects: &[Object]) -> Result<FrameStats> {
        let device = self.device.as_ref();
        let cmd = frame.command_buffer;
        let framebuffer = match self.framebuffers.get(frame.image_index as usize) {
            Some(&framebuffer) => framebuffer,
            None => crate::engine_bail!(
                "toyvk::renderer",
                Synchronization,
                "Acquired image {} has no framebuffer ({} images)",
                frame.image_index,
                self.framebuffers.len()
            ),
        };

        device.begin_command_buffer(cmd, false)?;
        device.cmd_begin_render_pass(
            cmd,
            self.render_pass,
            framebuffer,
            self.extent,
            &ClearValues { color: self.clear_color, depth: 1.0 },
        );
        device.cmd_bind_pipeline(cmd, self.pipeline);
        device.cmd_set_viewport_and_scissor(cmd, self.extent);

        let view = camera.view_matrix();
        let proj = projection_matrix(
            self.extent,
            self.projection.fov_y_degrees,
            self.projection.near,
            self.projection.far,
        );

        let mut stats = FrameStats {
            frame_index: frame.slot,
            image_index: frame.image_index,
            ..Default::default()
        };
        let mut next_bank: FxHashMap<SurfaceKey, usize> = FxHashMap::default();

        for object in objects {
            let surface = match self.resources.surface(object.surface) {
                Some(surface) => surface,
                None => crate::engine_bail!("toyvk::renderer", InvalidResource, "Unknown surface {:?}", object.surface),
            };
            let bank_index = next_bank.entry(object.surface).or_insert(0);
            let bank = match surface.bank(*bank_index) {
                Some(bank) => bank,
                None => crate::engine_bail!(
                    "toyvk::renderer",
                    InvalidResource,
                    "Surface {:?} has no descriptor bank {}",
                    object.surface,
                    bank_index
                ),
            };
            *bank_index += 1;

            // Only this slot's uniform buffer: the others may still be read
            let ubo = UniformBufferObject { model: object.model_matrix(), view, proj };
            bank.write_uniform(frame.slot, &ubo)?;
            let set = match bank.descriptor_set(frame.slot) {
                Some(set) => set,
                None => crate::engine_bail!("toyvk::renderer", InvalidResource, "No descriptor set for slot {}", frame.slot),
            };

            device.cmd_bind_vertex_buffer(cmd, surface.vertex_buffer());
            device.cmd_bind_index_buffer(cmd, surface.index_buffer());
            device.cmd_bind_descriptor_set(cmd, self.pipeline_layout, set);
            device.cmd_draw_indexed(cmd, surface.index_count());

            stats.record_draw(surface.index_count());
        }

        device.cmd_end_render_pass(cmd);
        device.end_command_buffer(cmd)?;
        Ok(stats)
    }

    /// Block until all submitted frames have completed
    pub fn wait_idle(&mut self) -> Result<()> {
        self.frames.wait_all()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if self.device.wait_idle().is_err() {
            crate::engine_warn!("toyvk::renderer", "wait_idle failed while destroying the renderer");
        }
        if !self.pipeline.is_null() {
            self.device.destroy_pipeline(self.pipeline);
        }
        if !self.pipeline_layout.is_null() {
            self.device.destroy_pipeline_layout(self.pipeline_layout);
        }
        for framebuffer in self.framebuffers.drain(..) {
            self.device.destroy_framebuffer(framebuffer);
        }
        if !self.render_pass.is_null() {
            self.device.destroy_render_pass(self.render_pass);
        }
        crate::engine_debug!("toyvk::renderer", "Renderer destroyed after {} frames", self.frame_count);
    }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
