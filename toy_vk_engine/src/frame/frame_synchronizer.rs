//! Frame synchronizer
//!
//! Fixed ring of frame slots, each with an image-available semaphore, a
//! render-finished semaphore, a completion fence and one reusable command
//! buffer. A slot cycles `Idle → Recording → Submitted` and is only
//! recorded again after its fence has signaled.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    CommandBufferHandle, FenceHandle, GraphicsDevice, PipelineStageFlags, SemaphoreHandle,
    SubmitInfo,
};

/// Where a slot is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Fence signaled, safe to record
    Idle,
    /// Fence reset, image acquired, command buffer owned by the caller
    Recording,
    /// Handed to the queue; the fence signals on completion
    Submitted,
}

/// One ring slot
#[derive(Debug)]
pub struct FrameSlot {
    image_available: SemaphoreHandle,
    render_finished: SemaphoreHandle,
    in_flight: FenceHandle,
    command_buffer: CommandBufferHandle,
    state: SlotState,
}

impl FrameSlot {
    pub fn image_available(&self) -> SemaphoreHandle {
        self.image_available
    }

    pub fn render_finished(&self) -> SemaphoreHandle {
        self.render_finished
    }

    pub fn fence(&self) -> FenceHandle {
        self.in_flight
    }

    pub fn command_buffer(&self) -> CommandBufferHandle {
        self.command_buffer
    }

    pub fn state(&self) -> SlotState {
        self.state
    }
}

/// A slot acquired for recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredFrame {
    /// Ring index, also the per-frame descriptor index
    pub slot: usize,
    /// Swapchain image to render into
    pub image_index: u32,
    pub command_buffer: CommandBufferHandle,
}

pub struct FrameSynchronizer {
    device: Arc<dyn GraphicsDevice>,
    slots: Vec<FrameSlot>,
    current: usize,
}

impl FrameSynchronizer {
    /// Create `frames_in_flight` slots
    ///
    /// More frames in flight than swapchain images is a configuration error.
    pub fn new(device: Arc<dyn GraphicsDevice>, frames_in_flight: u32) -> Result<Self> {
        let image_count = device.context().image_count;
        if frames_in_flight == 0 {
            crate::engine_bail!("toyvk::frame", Configuration, "frames_in_flight must be at least 1");
        }
        if frames_in_flight > image_count {
            crate::engine_bail!(
                "toyvk::frame",
                Configuration,
                "{} frames in flight requested but the swapchain only has {} images",
                frames_in_flight,
                image_count
            );
        }

        // Partially built rings are released by Drop
        let mut synchronizer = Self {
            device,
            slots: Vec::with_capacity(frames_in_flight as usize),
            current: 0,
        };
        for _ in 0..frames_in_flight {
            let slot = synchronizer.create_slot()?;
            synchronizer.slots.push(slot);
        }

        crate::engine_debug!(
            "toyvk::frame",
            "Frame ring ready: {} slots for {} swapchain images",
            frames_in_flight,
            image_count
        );
        Ok(synchronizer)
    }

    fn create_slot(&self) -> Result<FrameSlot> {
        let image_available = self.device.create_semaphore()?;
        let render_finished = match self.device.create_semaphore() {
            Ok(s) => s,
            Err(e) => {
                self.device.destroy_semaphore(image_available);
                return Err(e);
            }
        };
        // Created signaled so the first wait returns immediately
        let in_flight = match self.device.create_fence(true) {
            Ok(f) => f,
            Err(e) => {
                self.device.destroy_semaphore(image_available);
                self.device.destroy_semaphore(render_finished);
                return Err(e);
            }
        };
        let command_buffer = match self.device.allocate_command_buffer() {
            Ok(c) => c,
            Err(e) => {
                self.device.destroy_semaphore(image_available);
                self.device.destroy_semaphore(render_finished);
                self.device.destroy_fence(in_flight);
                return Err(e);
            }
        };
        Ok(FrameSlot {
            image_available,
            render_finished,
            in_flight,
            command_buffer,
            state: SlotState::Idle,
        })
    }

    pub fn frames_in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    /// Wait for the current slot's previous work, then acquire a swapchain image
    pub fn acquire_frame(&mut self) -> Result<AcquiredFrame> {
        let index = self.current;
        let slot = &mut self.slots[index];
        if slot.state == SlotState::Recording {
            crate::engine_bail!("toyvk::frame", Synchronization, "Slot {} is already recording", index);
        }

        self.device.wait_for_fence(slot.in_flight)?;
        slot.state = SlotState::Idle;
        self.device.reset_fence(slot.in_flight)?;
        let image_index = self.device.acquire_next_image(slot.image_available)?;
        slot.state = SlotState::Recording;

        Ok(AcquiredFrame {
            slot: index,
            image_index,
            command_buffer: slot.command_buffer,
        })
    }

    /// Submit the recorded command buffer
    ///
    /// Waits for image-available at color attachment output, signals
    /// render-finished and the slot's fence.
    pub fn submit(&mut self, frame: &AcquiredFrame) -> Result<()> {
        self.expect_state(frame, SlotState::Recording, "submit")?;
        let slot = &self.slots[frame.slot];
        self.device.queue_submit(&SubmitInfo {
            command_buffer: slot.command_buffer,
            wait_semaphore: Some(slot.image_available),
            wait_stage: PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal_semaphore: Some(slot.render_finished),
            fence: Some(slot.in_flight),
        })?;
        self.slots[frame.slot].state = SlotState::Submitted;
        Ok(())
    }

    /// Present once rendering has finished
    pub fn present(&mut self, frame: &AcquiredFrame) -> Result<()> {
        self.expect_state(frame, SlotState::Submitted, "present")?;
        self.device.queue_present(self.slots[frame.slot].render_finished, frame.image_index)
    }

    /// Move to the next slot; only valid once the current one was submitted
    pub fn advance(&mut self) -> Result<()> {
        if self.slots[self.current].state != SlotState::Submitted {
            crate::engine_bail!(
                "toyvk::frame",
                Synchronization,
                "Cannot advance past slot {} in state {:?}",
                self.current,
                self.slots[self.current].state
            );
        }
        self.current = (self.current + 1) % self.slots.len();
        Ok(())
    }

    /// Block until every submitted slot has completed
    pub fn wait_all(&mut self) -> Result<()> {
        for slot in &mut self.slots {
            if slot.state == SlotState::Submitted {
                self.device.wait_for_fence(slot.in_flight)?;
                slot.state = SlotState::Idle;
            }
        }
        Ok(())
    }

    fn expect_state(&self, frame: &AcquiredFrame, expected: SlotState, operation: &str) -> Result<()> {
        let actual = self.slots.get(frame.slot).map(|s| s.state);
        if frame.slot != self.current || actual != Some(expected) {
            crate::engine_bail!(
                "toyvk::frame",
                Synchronization,
                "Cannot {} slot {} (current {}, state {:?})",
                operation,
                frame.slot,
                self.current,
                actual
            );
        }
        Ok(())
    }
}

impl Drop for FrameSynchronizer {
    fn drop(&mut self) {
        if self.device.wait_idle().is_err() {
            crate::engine_warn!("toyvk::frame", "wait_idle failed while destroying the frame ring");
        }
        for slot in self.slots.drain(..) {
            self.device.free_command_buffer(slot.command_buffer);
            self.device.destroy_fence(slot.in_flight);
            self.device.destroy_semaphore(slot.render_finished);
            self.device.destroy_semaphore(slot.image_available);
        }
    }
}

#[cfg(test)]
#[path = "frame_synchronizer_tests.rs"]
mod tests;
