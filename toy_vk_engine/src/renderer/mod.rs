/// Renderer module - the frame draw orchestrator

mod renderer;

pub use renderer::{FrameStats, Renderer};
