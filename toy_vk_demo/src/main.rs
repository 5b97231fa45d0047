//! Toy Vk demo: a 15x15 grid of textured models and a free-flying camera
//!
//! Click to capture the mouse, WASD to move, Space/Shift to rise and sink,
//! Escape to release the mouse (or quit when it is not captured).

mod app;
mod camera_controller;
mod mesh_loader;
mod resources;

use app::App;
use toy_vk_engine::engine_err;
use toy_vk_engine::toyvk::{Config, Engine};
use winit::event_loop::{ControlFlow, EventLoop};

fn demo_config() -> Config {
    Config {
        title: "Toy Vk Demo".to_string(),
        ..Config::default()
    }
}

fn main() {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => Engine::fatal(&engine_err!(
            "toyvk::demo",
            CapabilityNegotiation,
            "Cannot create the event loop: {}",
            e
        )),
    };
    // Render continuously, like a game loop
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(demo_config());
    if let Err(e) = event_loop.run_app(&mut app) {
        Engine::fatal(&engine_err!("toyvk::demo", Synchronization, "Event loop terminated abnormally: {}", e));
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
