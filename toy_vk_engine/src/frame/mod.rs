/// Frame ring module

pub mod frame_synchronizer;

pub use frame_synchronizer::{AcquiredFrame, FrameSlot, FrameSynchronizer, SlotState};
