/// winit application: owns the window, renderer and scene
///
/// Every error that reaches this layer goes to `Engine::fatal`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use toy_vk_engine::glam::Vec3;
use toy_vk_engine::toyvk::resource::{FileImageLoader, SurfaceKey, TextureKey};
use toy_vk_engine::toyvk::scene::{Camera, Object};
use toy_vk_engine::toyvk::{Config, Engine, FrameClock, Renderer, Result, DEFAULT_TICKS_PER_SECOND};
use toy_vk_engine::{engine_err, engine_info, engine_warn};
use toy_vk_engine_renderer_vulkan::toyvk::VulkanGraphicsDevice;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::camera_controller::CameraController;
use crate::mesh_loader::{self, MeshData};
use crate::resources;

const MODEL_PATH: &str = "resources/viking_room.obj";
const TEXTURE_PATH: &str = "resources/viking_room.png";

/// Objects per grid side and the distance between them
const GRID_SIZE: u32 = 15;
const GRID_SPACING: f32 = 3.0;

pub struct App {
    config: Config,
    // Dropped before the window its surface was created for
    renderer: Option<Renderer>,
    window: Option<Window>,
    objects: Vec<Object>,
    camera: Camera,
    controller: CameraController,
    clock: FrameClock,
    mouse_captured: bool,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            renderer: None,
            window: None,
            objects: Vec::new(),
            camera: Camera::default(),
            controller: CameraController::new(),
            clock: FrameClock::new(DEFAULT_TICKS_PER_SECOND, Instant::now()),
            mouse_captured: false,
        }
    }

    // ===== STARTUP =====

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Window> {
        let attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(false);
        event_loop
            .create_window(attributes)
            .map_err(|e| engine_err!("toyvk::demo", ResourceCreation, "Failed to create window: {}", e))
    }

    fn create_renderer(&self, window: &Window, base: &Path) -> Result<Renderer> {
        let vertex_spirv = resources::read_bytes(&resources::resolve(base, &self.config.vertex_shader))?;
        let fragment_spirv = resources::read_bytes(&resources::resolve(base, &self.config.fragment_shader))?;

        let device = Arc::new(VulkanGraphicsDevice::new(window, &self.config)?);
        Renderer::new(device, &self.config, &vertex_spirv, &fragment_spirv)
    }

    /// Upload the model (or the fallback cube) and lay out the grid
    fn create_scene(&mut self, renderer: &mut Renderer, base: &Path) -> Result<()> {
        let mesh = load_mesh(&base.join(MODEL_PATH))?;
        let texture = load_texture(renderer, &base.join(TEXTURE_PATH))?;
        let surface = renderer.create_surface(&mesh.vertices, &mesh.indices, texture)?;

        self.objects = grid(surface);
        engine_info!(
            "toyvk::demo",
            "Scene ready: {} objects, {} triangles each",
            self.objects.len(),
            mesh.triangle_count()
        );
        Ok(())
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = self.create_window(event_loop)?;
        let base = resources::base_dir()?;
        let mut renderer = self.create_renderer(&window, &base)?;
        self.create_scene(&mut renderer, &base)?;

        self.clock = FrameClock::new(DEFAULT_TICKS_PER_SECOND, Instant::now());
        self.renderer = Some(renderer);
        self.window = Some(window);
        Ok(())
    }

    // ===== FRAME =====

    fn redraw(&mut self) -> Result<()> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };

        let step = self.clock.advance(Instant::now());
        self.controller.apply(&mut self.camera, step.ticks);
        let stats = renderer.draw_frame(&self.camera, &self.objects)?;

        if step.second_elapsed {
            engine_info!(
                "toyvk::demo",
                "{} fps | {} draw calls | {} triangles | uptime {}s",
                self.clock.fps(),
                stats.draw_calls,
                stats.triangles,
                self.clock.uptime_seconds()
            );
        }
        Ok(())
    }

    // ===== MOUSE CAPTURE =====

    fn set_mouse_capture(&mut self, captured: bool) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        let grab = if captured {
            window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(e) = grab {
            engine_warn!("toyvk::demo", "Cursor grab not supported: {}", e);
        }
        window.set_cursor_visible(!captured);
        self.mouse_captured = captured;
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, code: KeyCode, state: ElementState) {
        if code == KeyCode::Escape && state == ElementState::Pressed {
            if self.mouse_captured {
                self.set_mouse_capture(false);
            } else {
                event_loop.exit();
            }
            return;
        }
        self.controller.process_key(code, state);
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            Engine::or_fatal(self.start(event_loop));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Focused(false) => {
                self.controller.release_all();
                self.set_mouse_capture(false);
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, .. } if !self.mouse_captured => {
                self.set_mouse_capture(true);
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, repeat: false, .. },
                ..
            } => self.handle_key(event_loop, code, state),
            WindowEvent::RedrawRequested => Engine::or_fatal(self.redraw()),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.mouse_captured {
                self.controller.process_mouse_motion(dx, dy);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut renderer) = self.renderer.take() {
            Engine::or_fatal(renderer.wait_idle());
            engine_info!(
                "toyvk::demo",
                "Shutting down after {} frames ({}s)",
                renderer.frame_count(),
                self.clock.uptime_seconds()
            );
        }
        self.window = None;

        #[cfg(feature = "vulkan-validation")]
        toy_vk_engine_renderer_vulkan::toyvk::print_validation_stats_report();
    }
}

// ===== SCENE HELPERS =====

fn load_mesh(path: &Path) -> Result<MeshData> {
    if path.is_file() {
        return mesh_loader::load_obj(path);
    }
    engine_warn!("toyvk::demo", "'{}' not found, drawing cubes instead", path.display());
    Ok(mesh_loader::cube())
}

fn load_texture(renderer: &mut Renderer, path: &Path) -> Result<TextureKey> {
    if path.is_file() {
        return renderer.create_texture(path, &FileImageLoader);
    }
    engine_warn!("toyvk::demo", "'{}' not found, using a checkerboard texture", path.display());
    renderer.create_texture_from_pixels("checkerboard", 64, 64, &mesh_loader::checkerboard(64, 8))
}

/// GRID_SIZE x GRID_SIZE objects in the XY plane, rotated onto the floor
fn grid(surface: SurfaceKey) -> Vec<Object> {
    let rotation = Vec3::new(-90.0, 0.0, 0.0);
    (0..GRID_SIZE)
        .flat_map(|i| {
            (0..GRID_SIZE).map(move |j| {
                Object::new(Vec3::new(GRID_SPACING * i as f32, GRID_SPACING * j as f32, 0.0), rotation, surface)
            })
        })
        .collect()
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
