/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Simulates just enough of a device to check the core's protocols:
/// - memory is real host memory, so copies and readbacks move actual bytes
/// - recorded commands execute when the queue is drained (fence wait or
///   queue idle), like a GPU running behind the CPU
/// - image layouts, usage flags, fence/semaphore states and command buffer
///   states are tracked, and misuse lands in `validation_errors`
/// - uniform buffers read by a draw are compared between submit time and
///   execution time; a difference means the CPU overwrote data the GPU was
///   still going to read

#[cfg(test)]
use crate::error::{Error, Result};
#[cfg(test)]
use crate::graphics_device::types::*;
#[cfg(test)]
use crate::graphics_device::GraphicsDevice;
#[cfg(test)]
use rustc_hash::{FxHashMap, FxHashSet};
#[cfg(test)]
use std::sync::{Mutex, MutexGuard};

// ============================================================================
// Recorded commands and execution results
// ============================================================================

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    CopyBuffer { src: BufferHandle, dst: BufferHandle, size: u64 },
    CopyBufferToImage { src: BufferHandle, dst: ImageHandle, width: u32, height: u32 },
    Barrier(ImageBarrier),
    BeginRenderPass { render_pass: RenderPassHandle, framebuffer: FramebufferHandle, extent: Extent2D, clear: ClearValues },
    EndRenderPass,
    BindPipeline(PipelineHandle),
    SetViewportAndScissor(Extent2D),
    BindVertexBuffer(BufferHandle),
    BindIndexBuffer(BufferHandle),
    BindDescriptorSet(DescriptorSetHandle),
    DrawIndexed { index_count: u32 },
}

/// A draw as seen by the simulated GPU when it executed
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedDraw {
    /// 1-based queue submission number
    pub submission: u64,
    pub descriptor_set: DescriptorSetHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    /// Uniform buffer contents at execution time
    pub uniform_bytes: Vec<u8>,
}

// ============================================================================
// Internal object state
// ============================================================================

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    Pending,
}

#[cfg(test)]
struct MockCommandBuffer {
    state: CommandBufferState,
    one_time: bool,
    commands: Vec<MockCommand>,
}

#[cfg(test)]
struct MockBuffer {
    size: u64,
    usage: BufferUsageFlags,
    memory: Option<MemoryHandle>,
}

#[cfg(test)]
struct MockImage {
    desc: ImageDesc,
    memory: Option<MemoryHandle>,
    layout: ImageLayout,
}

#[cfg(test)]
struct MockMemory {
    data: Box<[u8]>,
    type_index: u32,
    mapped: bool,
}

#[cfg(test)]
struct PendingSubmission {
    id: u64,
    command_buffer: CommandBufferHandle,
    commands: Vec<MockCommand>,
    expected_uniforms: Vec<(DescriptorSetHandle, Vec<u8>)>,
    fence: Option<FenceHandle>,
}

#[cfg(test)]
struct MockDescriptorPool {
    max_sets: u32,
    sets: FxHashSet<DescriptorSetHandle>,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    next_handle: u64,
    buffers: FxHashMap<BufferHandle, MockBuffer>,
    images: FxHashMap<ImageHandle, MockImage>,
    memories: FxHashMap<MemoryHandle, MockMemory>,
    views: FxHashMap<ImageViewHandle, ImageHandle>,
    samplers: FxHashSet<SamplerHandle>,
    command_buffers: FxHashMap<CommandBufferHandle, MockCommandBuffer>,
    semaphores: FxHashMap<SemaphoreHandle, bool>,
    fences: FxHashMap<FenceHandle, bool>,
    descriptor_pools: FxHashMap<DescriptorPoolHandle, MockDescriptorPool>,
    descriptor_sets: FxHashMap<DescriptorSetHandle, Option<DescriptorWrite>>,
    /// Layouts, render passes, framebuffers, shader modules, pipelines
    objects: FxHashMap<u64, &'static str>,
    pending: Vec<PendingSubmission>,
    submission_count: u64,
    next_image_index: u32,
    allocated_bytes: u64,
    calls: Vec<String>,
    executed_draws: Vec<ExecutedDraw>,
    submitted: Vec<(u64, Vec<MockCommand>)>,
    presented: Vec<u32>,
    validation_errors: Vec<String>,
    fail_on: Option<&'static str>,
    memory_budget: Option<u64>,
}

#[cfg(test)]
impl MockState {
    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn call(&mut self, text: String) {
        self.calls.push(text);
    }

    fn invalid(&mut self, text: String) {
        self.validation_errors.push(text);
    }

    fn injected(&mut self, op: &'static str) -> Result<()> {
        if self.fail_on == Some(op) {
            self.fail_on = None;
            let message = format!("injected failure in {}", op);
            return Err(match op {
                "allocate_memory" => Error::OutOfMemory(message),
                "wait_for_fence" | "reset_fence" | "acquire_next_image" | "queue_submit"
                | "queue_present" | "queue_wait_idle" => Error::Synchronization(message),
                _ => Error::ResourceCreation(message),
            });
        }
        Ok(())
    }

    fn record(&mut self, cmd: CommandBufferHandle, command: MockCommand) {
        match self.command_buffers.get_mut(&cmd) {
            Some(cb) if cb.state == CommandBufferState::Recording => cb.commands.push(command),
            _ => self.invalid(format!("{:?} recorded outside begin/end on {:?}", command, cmd)),
        }
    }

    fn uniform_bytes(&self, set: DescriptorSetHandle) -> Vec<u8> {
        let write = match self.descriptor_sets.get(&set) {
            Some(Some(write)) => *write,
            _ => return Vec::new(),
        };
        self.buffer_bytes(write.uniform_buffer, write.uniform_range)
    }

    fn buffer_bytes(&self, buffer: BufferHandle, len: u64) -> Vec<u8> {
        self.buffers
            .get(&buffer)
            .and_then(|b| b.memory)
            .and_then(|m| self.memories.get(&m))
            .map(|m| m.data[..len as usize].to_vec())
            .unwrap_or_default()
    }

    fn write_bytes(&mut self, memory: Option<MemoryHandle>, bytes: &[u8]) {
        if let Some(mem) = memory.and_then(|m| self.memories.get_mut(&m)) {
            mem.data[..bytes.len()].copy_from_slice(bytes);
        }
    }

    /// Execute every pending submission up to and including index `last`
    fn drain(&mut self, last: usize) {
        let batch: Vec<PendingSubmission> = self.pending.drain(..=last).collect();
        for submission in batch {
            self.execute(submission);
        }
    }

    fn drain_all(&mut self) {
        if !self.pending.is_empty() {
            let last = self.pending.len() - 1;
            self.drain(last);
        }
    }

    fn execute(&mut self, submission: PendingSubmission) {
        let mut in_render_pass = false;
        let mut pipeline_bound = false;
        let mut vertex_buffer = BufferHandle::NULL;
        let mut index_buffer = BufferHandle::NULL;
        let mut descriptor_set = DescriptorSetHandle::NULL;
        let mut draw_number = 0usize;

        for command in &submission.commands {
            match command {
                MockCommand::CopyBuffer { src, dst, size } => {
                    let (src_usage, src_size) = match self.buffers.get(src) {
                        Some(b) => (b.usage, b.size),
                        None => {
                            self.invalid(format!("copy from destroyed buffer {:?}", src));
                            continue;
                        }
                    };
                    let (dst_usage, dst_size, dst_memory) = match self.buffers.get(dst) {
                        Some(b) => (b.usage, b.size, b.memory),
                        None => {
                            self.invalid(format!("copy into destroyed buffer {:?}", dst));
                            continue;
                        }
                    };
                    if !src_usage.contains(BufferUsageFlags::TRANSFER_SRC) {
                        self.invalid(format!("copy source {:?} lacks TRANSFER_SRC", src));
                    }
                    if !dst_usage.contains(BufferUsageFlags::TRANSFER_DST) {
                        self.invalid(format!("copy destination {:?} lacks TRANSFER_DST", dst));
                    }
                    if *size > src_size || *size > dst_size {
                        self.invalid(format!("copy of {} bytes overflows {:?} -> {:?}", size, src, dst));
                        continue;
                    }
                    let bytes = self.buffer_bytes(*src, *size);
                    self.write_bytes(dst_memory, &bytes);
                }
                MockCommand::CopyBufferToImage { src, dst, width, height } => {
                    let (layout, usage, memory) = match self.images.get(dst) {
                        Some(image) => (image.layout, image.desc.usage, image.memory),
                        None => {
                            self.invalid(format!("copy into destroyed image {:?}", dst));
                            continue;
                        }
                    };
                    if layout != ImageLayout::TransferDstOptimal {
                        self.invalid(format!("copy into {:?} while in {:?}", dst, layout));
                    }
                    if !usage.contains(ImageUsageFlags::TRANSFER_DST) {
                        self.invalid(format!("image {:?} lacks TRANSFER_DST", dst));
                    }
                    let src_ok = self
                        .buffers
                        .get(src)
                        .map(|b| b.usage.contains(BufferUsageFlags::TRANSFER_SRC))
                        .unwrap_or(false);
                    if !src_ok {
                        self.invalid(format!("copy source {:?} missing or lacks TRANSFER_SRC", src));
                        continue;
                    }
                    let bytes = self.buffer_bytes(*src, *width as u64 * *height as u64 * 4);
                    self.write_bytes(memory, &bytes);
                }
                MockCommand::Barrier(barrier) => {
                    let current = match self.images.get(&barrier.image) {
                        Some(image) => image.layout,
                        None => {
                            self.invalid(format!("barrier on destroyed image {:?}", barrier.image));
                            continue;
                        }
                    };
                    if barrier.old_layout != ImageLayout::Undefined && barrier.old_layout != current {
                        self.invalid(format!(
                            "barrier on {:?} expects {:?} but image is in {:?}",
                            barrier.image, barrier.old_layout, current
                        ));
                    }
                    if let Some(image) = self.images.get_mut(&barrier.image) {
                        image.layout = barrier.new_layout;
                    }
                }
                MockCommand::BeginRenderPass { .. } => {
                    if in_render_pass {
                        self.invalid("nested render pass".to_string());
                    }
                    in_render_pass = true;
                }
                MockCommand::EndRenderPass => in_render_pass = false,
                MockCommand::BindPipeline(_) => pipeline_bound = true,
                MockCommand::SetViewportAndScissor(_) => {}
                MockCommand::BindVertexBuffer(buffer) => vertex_buffer = *buffer,
                MockCommand::BindIndexBuffer(buffer) => index_buffer = *buffer,
                MockCommand::BindDescriptorSet(set) => descriptor_set = *set,
                MockCommand::DrawIndexed { index_count } => {
                    if !in_render_pass || !pipeline_bound {
                        self.invalid("draw outside a render pass or without a pipeline".to_string());
                    }
                    let uniform_bytes = self.uniform_bytes(descriptor_set);
                    if let Some((_, expected)) = submission.expected_uniforms.get(draw_number) {
                        if *expected != uniform_bytes {
                            self.invalid(format!(
                                "uniform buffer of {:?} changed while submission {} was in flight",
                                descriptor_set, submission.id
                            ));
                        }
                    }
                    draw_number += 1;
                    self.executed_draws.push(ExecutedDraw {
                        submission: submission.id,
                        descriptor_set,
                        vertex_buffer,
                        index_buffer,
                        index_count: *index_count,
                        uniform_bytes,
                    });
                }
            }
        }

        if let Some(cb) = self.command_buffers.get_mut(&submission.command_buffer) {
            cb.state = if cb.one_time {
                CommandBufferState::Initial
            } else {
                CommandBufferState::Executable
            };
        }
        if let Some(fence) = submission.fence {
            self.fences.insert(fence, true);
        }
    }
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

#[cfg(test)]
pub struct MockGraphicsDevice {
    context: DeviceContext,
    memory_types: Vec<MemoryType>,
    swapchain_views: Vec<ImageViewHandle>,
    buffer_type_bits: u32,
    image_type_bits: u32,
    state: Mutex<MockState>,
}

#[cfg(test)]
impl MockGraphicsDevice {
    /// Device with `image_count` swapchain images and three memory types:
    /// 0 = DEVICE_LOCAL, 1 = HOST_VISIBLE | HOST_COHERENT,
    /// 2 = DEVICE_LOCAL | HOST_VISIBLE | HOST_COHERENT
    pub fn new(image_count: u32) -> Self {
        Self::with_memory_types(
            image_count,
            vec![
                MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL, heap_index: 0 },
                MemoryType {
                    property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
                    heap_index: 1,
                },
                MemoryType {
                    property_flags: MemoryPropertyFlags::DEVICE_LOCAL
                        | MemoryPropertyFlags::HOST_VISIBLE
                        | MemoryPropertyFlags::HOST_COHERENT,
                    heap_index: 0,
                },
            ],
        )
    }

    pub fn with_memory_types(image_count: u32, memory_types: Vec<MemoryType>) -> Self {
        let mut state = MockState::default();
        let swapchain_views = (0..image_count)
            .map(|_| ImageViewHandle(state.next()))
            .collect();
        let all_types = (1u32 << memory_types.len()) - 1;
        let device_local_types = memory_types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.property_flags.contains(MemoryPropertyFlags::DEVICE_LOCAL))
            .fold(0u32, |bits, (i, _)| bits | (1 << i));

        Self {
            context: DeviceContext {
                device_name: "Mock GPU".to_string(),
                device_type: DeviceType::DiscreteGpu,
                score: 9192,
                queue_family_index: 0,
                surface_format: SurfaceFormat {
                    format: Format::B8G8R8A8_SRGB,
                    color_space: ColorSpace::SrgbNonlinear,
                },
                present_mode: PresentMode::Fifo,
                depth_format: Format::D32_SFLOAT,
                extent: Extent2D::new(800, 600),
                max_anisotropy: 16.0,
                image_count,
            },
            memory_types,
            swapchain_views,
            buffer_type_bits: all_types,
            image_type_bits: device_local_types,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // ===== TEST CONTROLS =====

    /// Make the next call to `op` fail with the matching error class
    pub fn fail_on(&self, op: &'static str) {
        self.lock().fail_on = Some(op);
    }

    /// Fail allocations once the total allocated bytes would exceed `bytes`
    pub fn set_memory_budget(&self, bytes: u64) {
        self.lock().memory_budget = Some(bytes);
    }

    // ===== INSPECTION =====

    /// Every call with its arguments, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Call names only (text before the opening parenthesis)
    pub fn call_names(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|c| c.split('(').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn validation_errors(&self) -> Vec<String> {
        self.lock().validation_errors.clone()
    }

    pub fn executed_draws(&self) -> Vec<ExecutedDraw> {
        self.lock().executed_draws.clone()
    }

    /// Commands of every queue submission, by submission number
    pub fn submitted(&self) -> Vec<(u64, Vec<MockCommand>)> {
        self.lock().submitted.clone()
    }

    pub fn presented(&self) -> Vec<u32> {
        self.lock().presented.clone()
    }

    pub fn pending_submissions(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Vec<u8> {
        let state = self.lock();
        let size = state.buffers.get(&buffer).map(|b| b.size).unwrap_or(0);
        state.buffer_bytes(buffer, size)
    }

    pub fn buffer_memory_type(&self, buffer: BufferHandle) -> Option<u32> {
        let state = self.lock();
        state
            .buffers
            .get(&buffer)
            .and_then(|b| b.memory)
            .and_then(|m| state.memories.get(&m))
            .map(|m| m.type_index)
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsageFlags> {
        self.lock().buffers.get(&buffer).map(|b| b.usage)
    }

    pub fn image_layout(&self, image: ImageHandle) -> Option<ImageLayout> {
        self.lock().images.get(&image).map(|i| i.layout)
    }

    pub fn image_contents(&self, image: ImageHandle) -> Vec<u8> {
        let state = self.lock();
        state
            .images
            .get(&image)
            .and_then(|i| i.memory)
            .and_then(|m| state.memories.get(&m))
            .map(|m| m.data.to_vec())
            .unwrap_or_default()
    }

    pub fn descriptor_write(&self, set: DescriptorSetHandle) -> Option<DescriptorWrite> {
        self.lock().descriptor_sets.get(&set).copied().flatten()
    }

    pub fn fence_signaled(&self, fence: FenceHandle) -> bool {
        self.lock().fences.get(&fence).copied().unwrap_or(false)
    }

    pub fn buffer_count(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn memory_count(&self) -> usize {
        self.lock().memories.len()
    }

    pub fn allocated_bytes(&self) -> u64 {
        self.lock().allocated_bytes
    }

    /// Device objects still alive, excluding the swapchain's own views
    pub fn live_object_count(&self) -> usize {
        let s = self.lock();
        s.buffers.len()
            + s.images.len()
            + s.memories.len()
            + s.views.len()
            + s.samplers.len()
            + s.command_buffers.len()
            + s.semaphores.len()
            + s.fences.len()
            + s.descriptor_pools.len()
            + s.descriptor_sets.len()
            + s.objects.len()
    }

    fn create_object(&self, kind: &'static str) -> u64 {
        let mut s = self.lock();
        let handle = s.next();
        s.objects.insert(handle, kind);
        s.call(format!("create_{}({})", kind, handle));
        handle
    }

    fn destroy_object(&self, kind: &'static str, handle: u64) {
        let mut s = self.lock();
        s.call(format!("destroy_{}({})", kind, handle));
        match s.objects.remove(&handle) {
            Some(found) if found == kind => {}
            _ => s.invalid(format!("destroy of unknown {} {}", kind, handle)),
        }
    }
}

#[cfg(test)]
fn align(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
impl GraphicsDevice for MockGraphicsDevice {
    fn context(&self) -> &DeviceContext {
        &self.context
    }

    fn memory_types(&self) -> &[MemoryType] {
        &self.memory_types
    }

    fn swapchain_image_views(&self) -> &[ImageViewHandle] {
        &self.swapchain_views
    }

    // ===== BUFFERS, IMAGES, MEMORY =====

    fn create_buffer(&self, size: u64, usage: BufferUsageFlags) -> Result<BufferHandle> {
        let mut s = self.lock();
        s.injected("create_buffer")?;
        if size == 0 {
            return Err(Error::ResourceCreation("zero-sized buffer".to_string()));
        }
        let handle = BufferHandle(s.next());
        s.buffers.insert(handle, MockBuffer { size, usage, memory: None });
        s.call(format!("create_buffer({}, {:?})", size, usage));
        Ok(handle)
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_buffer({})", buffer.0));
        if s.buffers.remove(&buffer).is_none() {
            s.invalid(format!("destroy of unknown buffer {:?}", buffer));
        }
        if s.pending.iter().any(|p| {
            p.commands.iter().any(|c| matches!(c,
                MockCommand::CopyBuffer { src, dst, .. } if *src == buffer || *dst == buffer))
        }) {
            s.invalid(format!("buffer {:?} destroyed while in use by pending work", buffer));
        }
    }

    fn buffer_memory_requirements(&self, buffer: BufferHandle) -> MemoryRequirements {
        let s = self.lock();
        let size = s.buffers.get(&buffer).map(|b| b.size).unwrap_or(0);
        MemoryRequirements {
            size: align(size, 16),
            alignment: 16,
            memory_type_bits: self.buffer_type_bits,
        }
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<ImageHandle> {
        let mut s = self.lock();
        s.injected("create_image")?;
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::ResourceCreation("zero-sized image".to_string()));
        }
        let handle = ImageHandle(s.next());
        s.images.insert(handle, MockImage { desc: *desc, memory: None, layout: ImageLayout::Undefined });
        s.call(format!("create_image({}x{}, {:?})", desc.width, desc.height, desc.format));
        Ok(handle)
    }

    fn destroy_image(&self, image: ImageHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_image({})", image.0));
        if s.images.remove(&image).is_none() {
            s.invalid(format!("destroy of unknown image {:?}", image));
        }
    }

    fn image_memory_requirements(&self, image: ImageHandle) -> MemoryRequirements {
        let s = self.lock();
        let size = s
            .images
            .get(&image)
            .map(|i| i.desc.width as u64 * i.desc.height as u64 * 4)
            .unwrap_or(0);
        MemoryRequirements {
            size: align(size, 256),
            alignment: 256,
            memory_type_bits: self.image_type_bits,
        }
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<MemoryHandle> {
        let mut s = self.lock();
        s.injected("allocate_memory")?;
        if memory_type_index as usize >= self.memory_types.len() {
            s.invalid(format!("memory type {} out of range", memory_type_index));
            return Err(Error::ResourceCreation(format!("bad memory type {}", memory_type_index)));
        }
        if let Some(budget) = s.memory_budget {
            if s.allocated_bytes + size > budget {
                return Err(Error::OutOfMemory(format!(
                    "allocation of {} bytes exceeds budget ({} in use of {})",
                    size, s.allocated_bytes, budget
                )));
            }
        }
        let handle = MemoryHandle(s.next());
        s.allocated_bytes += size;
        s.memories.insert(handle, MockMemory {
            data: vec![0u8; size as usize].into_boxed_slice(),
            type_index: memory_type_index,
            mapped: false,
        });
        s.call(format!("allocate_memory({}, {})", size, memory_type_index));
        Ok(handle)
    }

    fn free_memory(&self, memory: MemoryHandle) {
        let mut s = self.lock();
        s.call(format!("free_memory({})", memory.0));
        match s.memories.remove(&memory) {
            Some(mem) => s.allocated_bytes -= mem.data.len() as u64,
            None => s.invalid(format!("free of unknown memory {:?}", memory)),
        }
    }

    fn bind_buffer_memory(&self, buffer: BufferHandle, memory: MemoryHandle) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("bind_buffer_memory({}, {})", buffer.0, memory.0));
        let mem_len = match s.memories.get(&memory) {
            Some(m) => m.data.len() as u64,
            None => return Err(Error::ResourceCreation(format!("unknown memory {:?}", memory))),
        };
        match s.buffers.get_mut(&buffer) {
            Some(b) if b.memory.is_none() && b.size <= mem_len => {
                b.memory = Some(memory);
                Ok(())
            }
            _ => {
                s.invalid(format!("invalid bind of {:?} to {:?}", buffer, memory));
                Err(Error::ResourceCreation(format!("cannot bind {:?}", buffer)))
            }
        }
    }

    fn bind_image_memory(&self, image: ImageHandle, memory: MemoryHandle) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("bind_image_memory({}, {})", image.0, memory.0));
        if !s.memories.contains_key(&memory) {
            return Err(Error::ResourceCreation(format!("unknown memory {:?}", memory)));
        }
        match s.images.get_mut(&image) {
            Some(i) if i.memory.is_none() => {
                i.memory = Some(memory);
                Ok(())
            }
            _ => {
                s.invalid(format!("invalid bind of {:?} to {:?}", image, memory));
                Err(Error::ResourceCreation(format!("cannot bind {:?}", image)))
            }
        }
    }

    fn map_memory(&self, memory: MemoryHandle, size: u64) -> Result<*mut u8> {
        let mut s = self.lock();
        s.call(format!("map_memory({}, {})", memory.0, size));
        let host_visible = s
            .memories
            .get(&memory)
            .map(|m| self.memory_types[m.type_index as usize].property_flags.contains(MemoryPropertyFlags::HOST_VISIBLE));
        match host_visible {
            Some(true) => {}
            Some(false) => {
                s.invalid(format!("map of non host-visible memory {:?}", memory));
                return Err(Error::ResourceCreation("memory is not host visible".to_string()));
            }
            None => return Err(Error::ResourceCreation(format!("unknown memory {:?}", memory))),
        }
        let mem = s.memories.get_mut(&memory).ok_or_else(|| Error::ResourceCreation("unknown memory".to_string()))?;
        if size as usize > mem.data.len() || mem.mapped {
            return Err(Error::ResourceCreation(format!("invalid map of {:?}", memory)));
        }
        mem.mapped = true;
        Ok(mem.data.as_mut_ptr())
    }

    fn unmap_memory(&self, memory: MemoryHandle) {
        let mut s = self.lock();
        s.call(format!("unmap_memory({})", memory.0));
        match s.memories.get_mut(&memory) {
            Some(mem) if mem.mapped => mem.mapped = false,
            _ => s.invalid(format!("unmap of unmapped memory {:?}", memory)),
        }
    }

    fn create_image_view(&self, image: ImageHandle, format: Format, _aspect: ImageAspectFlags) -> Result<ImageViewHandle> {
        let mut s = self.lock();
        s.injected("create_image_view")?;
        if !s.images.contains_key(&image) {
            return Err(Error::ResourceCreation(format!("view of unknown image {:?}", image)));
        }
        let handle = ImageViewHandle(s.next());
        s.views.insert(handle, image);
        s.call(format!("create_image_view({}, {:?})", image.0, format));
        Ok(handle)
    }

    fn destroy_image_view(&self, view: ImageViewHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_image_view({})", view.0));
        if s.views.remove(&view).is_none() {
            s.invalid(format!("destroy of unknown image view {:?}", view));
        }
    }

    fn create_sampler(&self, max_anisotropy: f32) -> Result<SamplerHandle> {
        let mut s = self.lock();
        let handle = SamplerHandle(s.next());
        s.samplers.insert(handle);
        s.call(format!("create_sampler({})", max_anisotropy));
        Ok(handle)
    }

    fn destroy_sampler(&self, sampler: SamplerHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_sampler({})", sampler.0));
        if !s.samplers.remove(&sampler) {
            s.invalid(format!("destroy of unknown sampler {:?}", sampler));
        }
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&self) -> Result<CommandBufferHandle> {
        let mut s = self.lock();
        s.injected("allocate_command_buffer")?;
        let handle = CommandBufferHandle(s.next());
        s.command_buffers.insert(handle, MockCommandBuffer {
            state: CommandBufferState::Initial,
            one_time: false,
            commands: Vec::new(),
        });
        s.call(format!("allocate_command_buffer({})", handle.0));
        Ok(handle)
    }

    fn free_command_buffer(&self, command_buffer: CommandBufferHandle) {
        let mut s = self.lock();
        s.call(format!("free_command_buffer({})", command_buffer.0));
        match s.command_buffers.remove(&command_buffer) {
            Some(cb) if cb.state == CommandBufferState::Pending => {
                s.invalid(format!("{:?} freed while pending", command_buffer));
            }
            Some(_) => {}
            None => s.invalid(format!("free of unknown command buffer {:?}", command_buffer)),
        }
    }

    fn begin_command_buffer(&self, command_buffer: CommandBufferHandle, one_time_submit: bool) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("begin_command_buffer({})", command_buffer.0));
        let state = s.command_buffers.get(&command_buffer).map(|cb| cb.state);
        match state {
            Some(CommandBufferState::Pending) => {
                s.invalid(format!("{:?} re-recorded while still pending on the GPU", command_buffer));
                Err(Error::Synchronization("command buffer in use".to_string()))
            }
            Some(_) => {
                if let Some(cb) = s.command_buffers.get_mut(&command_buffer) {
                    cb.state = CommandBufferState::Recording;
                    cb.one_time = one_time_submit;
                    cb.commands.clear();
                }
                Ok(())
            }
            None => Err(Error::ResourceCreation(format!("unknown command buffer {:?}", command_buffer))),
        }
    }

    fn end_command_buffer(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("end_command_buffer({})", command_buffer.0));
        match s.command_buffers.get_mut(&command_buffer) {
            Some(cb) if cb.state == CommandBufferState::Recording => {
                cb.state = CommandBufferState::Executable;
                Ok(())
            }
            _ => {
                s.invalid(format!("end of {:?} which is not recording", command_buffer));
                Err(Error::ResourceCreation("command buffer not recording".to_string()))
            }
        }
    }

    fn cmd_copy_buffer(&self, command_buffer: CommandBufferHandle, src: BufferHandle, dst: BufferHandle, size: u64) {
        let mut s = self.lock();
        s.call(format!("cmd_copy_buffer({}, {}, {})", src.0, dst.0, size));
        s.record(command_buffer, MockCommand::CopyBuffer { src, dst, size });
    }

    fn cmd_copy_buffer_to_image(&self, command_buffer: CommandBufferHandle, src: BufferHandle, dst: ImageHandle, width: u32, height: u32) {
        let mut s = self.lock();
        s.call(format!("cmd_copy_buffer_to_image({}, {}, {}x{})", src.0, dst.0, width, height));
        s.record(command_buffer, MockCommand::CopyBufferToImage { src, dst, width, height });
    }

    fn cmd_pipeline_barrier(&self, command_buffer: CommandBufferHandle, barrier: &ImageBarrier) {
        let mut s = self.lock();
        s.call(format!("cmd_pipeline_barrier({:?} -> {:?})", barrier.old_layout, barrier.new_layout));
        s.record(command_buffer, MockCommand::Barrier(*barrier));
    }

    fn cmd_begin_render_pass(&self, command_buffer: CommandBufferHandle, render_pass: RenderPassHandle, framebuffer: FramebufferHandle, extent: Extent2D, clear: &ClearValues) {
        let mut s = self.lock();
        s.call(format!("cmd_begin_render_pass({})", framebuffer.0));
        s.record(command_buffer, MockCommand::BeginRenderPass { render_pass, framebuffer, extent, clear: *clear });
    }

    fn cmd_end_render_pass(&self, command_buffer: CommandBufferHandle) {
        let mut s = self.lock();
        s.call("cmd_end_render_pass()".to_string());
        s.record(command_buffer, MockCommand::EndRenderPass);
    }

    fn cmd_bind_pipeline(&self, command_buffer: CommandBufferHandle, pipeline: PipelineHandle) {
        let mut s = self.lock();
        s.call(format!("cmd_bind_pipeline({})", pipeline.0));
        s.record(command_buffer, MockCommand::BindPipeline(pipeline));
    }

    fn cmd_set_viewport_and_scissor(&self, command_buffer: CommandBufferHandle, extent: Extent2D) {
        let mut s = self.lock();
        s.call(format!("cmd_set_viewport_and_scissor({}x{})", extent.width, extent.height));
        s.record(command_buffer, MockCommand::SetViewportAndScissor(extent));
    }

    fn cmd_bind_vertex_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle) {
        let mut s = self.lock();
        s.call(format!("cmd_bind_vertex_buffer({})", buffer.0));
        s.record(command_buffer, MockCommand::BindVertexBuffer(buffer));
    }

    fn cmd_bind_index_buffer(&self, command_buffer: CommandBufferHandle, buffer: BufferHandle) {
        let mut s = self.lock();
        s.call(format!("cmd_bind_index_buffer({})", buffer.0));
        s.record(command_buffer, MockCommand::BindIndexBuffer(buffer));
    }

    fn cmd_bind_descriptor_set(&self, command_buffer: CommandBufferHandle, _layout: PipelineLayoutHandle, set: DescriptorSetHandle) {
        let mut s = self.lock();
        s.call(format!("cmd_bind_descriptor_set({})", set.0));
        s.record(command_buffer, MockCommand::BindDescriptorSet(set));
    }

    fn cmd_draw_indexed(&self, command_buffer: CommandBufferHandle, index_count: u32) {
        let mut s = self.lock();
        s.call(format!("cmd_draw_indexed({})", index_count));
        s.record(command_buffer, MockCommand::DrawIndexed { index_count });
    }

    // ===== SYNCHRONIZATION AND QUEUES =====

    fn create_semaphore(&self) -> Result<SemaphoreHandle> {
        let mut s = self.lock();
        s.injected("create_semaphore")?;
        let handle = SemaphoreHandle(s.next());
        s.semaphores.insert(handle, false);
        s.call(format!("create_semaphore({})", handle.0));
        Ok(handle)
    }

    fn destroy_semaphore(&self, semaphore: SemaphoreHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_semaphore({})", semaphore.0));
        if s.semaphores.remove(&semaphore).is_none() {
            s.invalid(format!("destroy of unknown semaphore {:?}", semaphore));
        }
    }

    fn create_fence(&self, signaled: bool) -> Result<FenceHandle> {
        let mut s = self.lock();
        s.injected("create_fence")?;
        let handle = FenceHandle(s.next());
        s.fences.insert(handle, signaled);
        s.call(format!("create_fence({}, {})", handle.0, signaled));
        Ok(handle)
    }

    fn destroy_fence(&self, fence: FenceHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_fence({})", fence.0));
        if s.pending.iter().any(|p| p.fence == Some(fence)) {
            s.invalid(format!("{:?} destroyed while its submission is pending", fence));
        }
        if s.fences.remove(&fence).is_none() {
            s.invalid(format!("destroy of unknown fence {:?}", fence));
        }
    }

    fn wait_for_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("wait_for_fence({})", fence.0));
        s.injected("wait_for_fence")?;
        match s.fences.get(&fence) {
            Some(true) => return Ok(()),
            Some(false) => {}
            None => return Err(Error::Synchronization(format!("unknown fence {:?}", fence))),
        }
        match s.pending.iter().position(|p| p.fence == Some(fence)) {
            Some(last) => {
                s.drain(last);
                Ok(())
            }
            None => {
                s.invalid(format!("wait on {:?} which nothing will signal", fence));
                Err(Error::Synchronization("fence would never signal".to_string()))
            }
        }
    }

    fn reset_fence(&self, fence: FenceHandle) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("reset_fence({})", fence.0));
        s.injected("reset_fence")?;
        if s.pending.iter().any(|p| p.fence == Some(fence)) {
            s.invalid(format!("reset of {:?} while its submission is pending", fence));
        }
        match s.fences.get_mut(&fence) {
            Some(signaled) => {
                *signaled = false;
                Ok(())
            }
            None => Err(Error::Synchronization(format!("unknown fence {:?}", fence))),
        }
    }

    fn acquire_next_image(&self, signal: SemaphoreHandle) -> Result<u32> {
        let mut s = self.lock();
        s.call(format!("acquire_next_image({})", signal.0));
        s.injected("acquire_next_image")?;
        match s.semaphores.get(&signal).copied() {
            Some(false) => {}
            Some(true) => s.invalid(format!("acquire signals {:?} which is already signaled", signal)),
            None => return Err(Error::Synchronization(format!("unknown semaphore {:?}", signal))),
        }
        s.semaphores.insert(signal, true);
        let index = s.next_image_index % self.context.image_count;
        s.next_image_index += 1;
        Ok(index)
    }

    fn queue_submit(&self, submit: &SubmitInfo) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("queue_submit({})", submit.command_buffer.0));
        s.injected("queue_submit")?;

        let commands = match s.command_buffers.get(&submit.command_buffer) {
            Some(cb) if cb.state == CommandBufferState::Executable => cb.commands.clone(),
            _ => {
                s.invalid(format!("submit of {:?} which is not executable", submit.command_buffer));
                return Err(Error::Synchronization("command buffer not executable".to_string()));
            }
        };
        if let Some(wait) = submit.wait_semaphore {
            match s.semaphores.get(&wait).copied() {
                Some(true) => {
                    s.semaphores.insert(wait, false);
                }
                _ => {
                    s.invalid(format!("submit waits on {:?} which is never signaled", wait));
                    return Err(Error::Synchronization("wait semaphore unsignaled".to_string()));
                }
            }
        }
        if let Some(fence) = submit.fence {
            match s.fences.get(&fence).copied() {
                Some(false) => {}
                Some(true) => {
                    s.invalid(format!("submit with {:?} still signaled", fence));
                    return Err(Error::Synchronization("fence not reset".to_string()));
                }
                None => return Err(Error::Synchronization(format!("unknown fence {:?}", fence))),
            }
        }
        if let Some(signal) = submit.signal_semaphore {
            s.semaphores.insert(signal, true);
        }

        let mut bound = DescriptorSetHandle::NULL;
        let mut expected_uniforms = Vec::new();
        for command in &commands {
            match command {
                MockCommand::BindDescriptorSet(set) => bound = *set,
                MockCommand::DrawIndexed { .. } => expected_uniforms.push((bound, s.uniform_bytes(bound))),
                _ => {}
            }
        }

        s.submission_count += 1;
        let id = s.submission_count;
        s.submitted.push((id, commands.clone()));
        if let Some(cb) = s.command_buffers.get_mut(&submit.command_buffer) {
            cb.state = CommandBufferState::Pending;
        }
        s.pending.push(PendingSubmission {
            id,
            command_buffer: submit.command_buffer,
            commands,
            expected_uniforms,
            fence: submit.fence,
        });
        Ok(())
    }

    fn queue_present(&self, wait: SemaphoreHandle, image_index: u32) -> Result<()> {
        let mut s = self.lock();
        s.call(format!("queue_present({}, {})", wait.0, image_index));
        s.injected("queue_present")?;
        match s.semaphores.get(&wait).copied() {
            Some(true) => {
                s.semaphores.insert(wait, false);
            }
            _ => {
                s.invalid(format!("present waits on {:?} which is never signaled", wait));
                return Err(Error::Synchronization("present semaphore unsignaled".to_string()));
            }
        }
        if image_index >= self.context.image_count {
            return Err(Error::Synchronization(format!("image index {} out of range", image_index)));
        }
        s.presented.push(image_index);
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<()> {
        let mut s = self.lock();
        s.call("queue_wait_idle()".to_string());
        s.injected("queue_wait_idle")?;
        s.drain_all();
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut s = self.lock();
        s.call("wait_idle()".to_string());
        s.drain_all();
        Ok(())
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(&self) -> Result<DescriptorSetLayoutHandle> {
        Ok(DescriptorSetLayoutHandle(self.create_object("descriptor_set_layout")))
    }

    fn destroy_descriptor_set_layout(&self, layout: DescriptorSetLayoutHandle) {
        self.destroy_object("descriptor_set_layout", layout.0);
    }

    fn create_descriptor_pool(&self, max_sets: u32) -> Result<DescriptorPoolHandle> {
        let mut s = self.lock();
        let handle = DescriptorPoolHandle(s.next());
        s.descriptor_pools.insert(handle, MockDescriptorPool { max_sets, sets: FxHashSet::default() });
        s.call(format!("create_descriptor_pool({})", max_sets));
        Ok(handle)
    }

    fn destroy_descriptor_pool(&self, pool: DescriptorPoolHandle) {
        let mut s = self.lock();
        s.call(format!("destroy_descriptor_pool({})", pool.0));
        match s.descriptor_pools.remove(&pool) {
            Some(p) => {
                for set in p.sets {
                    s.descriptor_sets.remove(&set);
                }
            }
            None => s.invalid(format!("destroy of unknown descriptor pool {:?}", pool)),
        }
    }

    fn allocate_descriptor_set(&self, pool: DescriptorPoolHandle, _layout: DescriptorSetLayoutHandle) -> Result<DescriptorSetHandle> {
        let mut s = self.lock();
        s.injected("allocate_descriptor_set")?;
        let handle = DescriptorSetHandle(s.next());
        let p = s
            .descriptor_pools
            .get_mut(&pool)
            .ok_or_else(|| Error::ResourceCreation(format!("unknown descriptor pool {:?}", pool)))?;
        if p.sets.len() as u32 >= p.max_sets {
            return Err(Error::OutOfMemory("descriptor pool exhausted".to_string()));
        }
        p.sets.insert(handle);
        s.descriptor_sets.insert(handle, None);
        s.call(format!("allocate_descriptor_set({})", handle.0));
        Ok(handle)
    }

    fn free_descriptor_set(&self, pool: DescriptorPoolHandle, set: DescriptorSetHandle) {
        let mut s = self.lock();
        s.call(format!("free_descriptor_set({})", set.0));
        let removed = s.descriptor_pools.get_mut(&pool).map(|p| p.sets.remove(&set)).unwrap_or(false);
        if !removed || s.descriptor_sets.remove(&set).is_none() {
            s.invalid(format!("free of unknown descriptor set {:?}", set));
        }
    }

    fn write_descriptor_set(&self, set: DescriptorSetHandle, write: &DescriptorWrite) {
        let mut s = self.lock();
        s.call(format!("write_descriptor_set({})", set.0));
        let uniform_ok = s
            .buffers
            .get(&write.uniform_buffer)
            .map(|b| b.usage.contains(BufferUsageFlags::UNIFORM_BUFFER) && b.size >= write.uniform_range)
            .unwrap_or(false);
        if !uniform_ok {
            s.invalid(format!("descriptor write with invalid uniform buffer {:?}", write.uniform_buffer));
        }
        if !s.views.contains_key(&write.image_view) || !s.samplers.contains(&write.sampler) {
            s.invalid(format!("descriptor write with invalid image view or sampler on {:?}", set));
        }
        match s.descriptor_sets.get_mut(&set) {
            Some(slot) => *slot = Some(*write),
            None => s.invalid(format!("write to unknown descriptor set {:?}", set)),
        }
    }

    // ===== RENDER PASS AND PIPELINE =====

    fn create_render_pass(&self, _color_format: Format, depth_format: Format) -> Result<RenderPassHandle> {
        if !depth_format.is_depth() {
            return Err(Error::ResourceCreation(format!("{:?} is not a depth format", depth_format)));
        }
        Ok(RenderPassHandle(self.create_object("render_pass")))
    }

    fn destroy_render_pass(&self, render_pass: RenderPassHandle) {
        self.destroy_object("render_pass", render_pass.0);
    }

    fn create_framebuffer(&self, _render_pass: RenderPassHandle, _color_view: ImageViewHandle, depth_view: ImageViewHandle, _extent: Extent2D) -> Result<FramebufferHandle> {
        if !self.lock().views.contains_key(&depth_view) {
            return Err(Error::ResourceCreation("framebuffer with unknown depth view".to_string()));
        }
        Ok(FramebufferHandle(self.create_object("framebuffer")))
    }

    fn destroy_framebuffer(&self, framebuffer: FramebufferHandle) {
        self.destroy_object("framebuffer", framebuffer.0);
    }

    fn create_shader_module(&self, code: &[u8]) -> Result<ShaderModuleHandle> {
        self.lock().injected("create_shader_module")?;
        if code.is_empty() || code.len() % 4 != 0 {
            return Err(Error::ResourceCreation(format!("invalid SPIR-V length {}", code.len())));
        }
        Ok(ShaderModuleHandle(self.create_object("shader_module")))
    }

    fn destroy_shader_module(&self, module: ShaderModuleHandle) {
        self.destroy_object("shader_module", module.0);
    }

    fn create_pipeline_layout(&self, _set_layout: DescriptorSetLayoutHandle) -> Result<PipelineLayoutHandle> {
        Ok(PipelineLayoutHandle(self.create_object("pipeline_layout")))
    }

    fn destroy_pipeline_layout(&self, layout: PipelineLayoutHandle) {
        self.destroy_object("pipeline_layout", layout.0);
    }

    fn create_graphics_pipeline(&self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        self.lock().injected("create_graphics_pipeline")?;
        if desc.vertex_attributes.is_empty() || desc.vertex_stride == 0 {
            return Err(Error::ResourceCreation("pipeline without vertex input".to_string()));
        }
        Ok(PipelineHandle(self.create_object("pipeline")))
    }

    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.destroy_object("pipeline", pipeline.0);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
