//! Hopper -- main loop and application entry point.
//!
//! Architecture: winit drives the event loop via `ApplicationHandler`. All simulation
//! runs inside `RedrawRequested` using a **fixed-timestep** model (see `TimeState`):
//!
//!   1. `begin_frame()` -- measure wall-clock delta, feed accumulator
//!   2. poll the background layout load and the layout file watcher
//!   3. `while should_step()` -- one `controller::advance` per 60 Hz tick
//!   4. clone the static layout mesh, append the player quad, upload
//!   5. issue draw calls, composite the egui overlay
//!
//! Key events only record transitions into `InputState`. The layout mesh is
//! rebuilt from scratch whenever a new block list is accepted.

mod animation;
mod controller;
mod grid;
mod layout;
mod mesh;
#[cfg(test)]
mod replay;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use animation::{AnimationSet, ClipId, CLIP_SPECS};
use controller::{advance, Controls, MotionConfig, Player};
use grid::{build_layout_primitives, GRID};
use hop_core::input::{InputState, Key};
use hop_core::time::{TimeState, FIXED_TICK_US};
use hop_devtools::{DebugOverlay, OverlayStats, PlayerReadout};
use hop_platform::window::PlatformConfig;
use hop_render::texture::checker_rgba8;
use hop_render::{Camera2D, GpuContext, SpritePipeline, SpriteVertex, Texture};
use layout::{LayoutLoader, LayoutState, LayoutWatcher};
use mesh::{
    add_player_quad, build_layout_mesh, count_texture_binds, DrawCall, Mesh, WHITE_TEXTURE,
};

const LAYOUT_PATH: &str = "assets/layouts/background.json";
const PLAYER_TEXTURE_DIR: &str = "assets/textures/player";
const PLACEHOLDER_SIZE: u32 = 64;
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

struct GpuSpriteTexture {
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// All mutable engine state lives here. Constructed lazily in `ApplicationHandler::resumed`
/// once the window and GPU surface are available.
struct EngineState {
    window: Arc<Window>,
    gpu: GpuContext,
    time: TimeState,
    input: InputState,
    camera: Camera2D,
    sprite_pipeline: SpritePipeline,
    debug_overlay: DebugOverlay,

    // --- Layout content ---------------------------------------------------------
    layout_path: PathBuf,
    layout_watcher: LayoutWatcher,
    layout_loader: Option<LayoutLoader>,
    layout: LayoutState,

    // --- Simulation -------------------------------------------------------------
    motion: MotionConfig,
    animations: AnimationSet,
    player: Player,
    paused: bool,
    single_step_requested: bool,
    textures: HashMap<Arc<str>, GpuSpriteTexture>,

    // --- Per-frame GPU mesh state -----------------------------------------------
    // Buffers grow (power-of-two) but never shrink.
    static_mesh: Mesh,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    mesh_vertex_capacity: usize,
    mesh_index_capacity: usize,
    draw_calls: Vec<DrawCall>,
    quad_count: usize,
}

impl EngineState {
    fn new(window: Arc<Window>, config: &PlatformConfig) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone())?;
        let sprite_pipeline = SpritePipeline::new(&gpu.device, gpu.surface_format);
        let debug_overlay = DebugOverlay::new(&gpu.device, gpu.surface_format, &window);
        let animations = AnimationSet::from_specs(&CLIP_SPECS, FIXED_TICK_US)?;
        let motion = MotionConfig::for_grid(&GRID);
        let player = Player::spawn(&motion, &GRID);

        // The camera always shows the logical surface, whatever the window's pixel size.
        let camera = Camera2D::new(config.width, config.height);
        let camera_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::cast_slice(&[camera.build_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        let camera_bind_group =
            sprite_pipeline.create_camera_bind_group(&gpu.device, &camera_buffer);
        let vertex_buffer = create_vertex_buffer(&gpu.device, 1);
        let index_buffer = create_index_buffer(&gpu.device, 1);

        let layout_path = PathBuf::from(LAYOUT_PATH);
        let layout_watcher = LayoutWatcher::new(layout_path.clone());

        let mut state = Self {
            window,
            gpu,
            time: TimeState::new(),
            input: InputState::new(),
            camera,
            sprite_pipeline,
            debug_overlay,
            layout_path,
            layout_watcher,
            layout_loader: None,
            layout: LayoutState::new(),
            motion,
            animations,
            player,
            paused: false,
            single_step_requested: false,
            textures: HashMap::new(),
            static_mesh: Mesh::default(),
            vertex_buffer,
            index_buffer,
            camera_buffer,
            camera_bind_group,
            mesh_vertex_capacity: 0,
            mesh_index_capacity: 0,
            draw_calls: Vec::new(),
            quad_count: 0,
        };

        state.load_textures();
        // Draw the grid and ground right away; blocks join once the worker delivers.
        state.rebuild_layout_mesh();
        state.start_layout_load("startup");
        Ok(state)
    }

    fn load_textures(&mut self) {
        let white = Texture::from_rgba8(
            &self.gpu.device,
            &self.gpu.queue,
            &[255, 255, 255, 255],
            1,
            1,
            WHITE_TEXTURE,
        );
        self.insert_texture(WHITE_TEXTURE, white);

        let mut missing = 0usize;
        let frames: Vec<(ClipId, usize, String)> = self
            .animations
            .texture_keys()
            .map(|(clip, index, key)| (clip, index, key.to_string()))
            .collect();
        for (clip, index, key) in frames {
            let path = Path::new(PLAYER_TEXTURE_DIR).join(format!("{key}.png"));
            let texture = match load_texture_file(&self.gpu.device, &self.gpu.queue, &path) {
                Ok(texture) => texture,
                Err(err) => {
                    log::warn!("{err}. Using placeholder for '{key}'.");
                    missing += 1;
                    placeholder_texture(&self.gpu.device, &self.gpu.queue, clip, index, &key)
                }
            };
            self.insert_texture(&key, texture);
        }

        if missing > 0 {
            log::warn!(
                "{} of {} player frames use placeholders",
                missing,
                self.textures.len() - 1
            );
        } else {
            log::info!("Loaded {} player frames", self.textures.len() - 1);
        }
    }

    fn insert_texture(&mut self, key: &str, texture: Texture) {
        let bind_group = self
            .sprite_pipeline
            .create_texture_bind_group(&self.gpu.device, &texture);
        self.textures.insert(
            Arc::from(key),
            GpuSpriteTexture {
                texture,
                bind_group,
            },
        );
    }

    fn start_layout_load(&mut self, reason: &str) {
        match LayoutLoader::spawn(self.layout_path.clone()) {
            Ok(loader) => {
                log::info!("Loading layout ({reason}): {}", loader.path().display());
                self.layout_loader = Some(loader);
                self.layout.begin_load();
            }
            Err(err) => {
                self.layout.accept(Err(format!("{err} ({reason})")));
            }
        }
    }

    /// Accept a finished background load, or start one if the file changed.
    fn poll_layout(&mut self) {
        if self.layout_loader.is_none() {
            if self.layout_watcher.should_reload() {
                self.start_layout_load("file watcher");
            }
            return;
        }

        let Some(result) = self.layout_loader.as_ref().and_then(LayoutLoader::poll) else {
            return;
        };
        self.layout_loader = None;

        if self.layout.accept(result) {
            self.rebuild_layout_mesh();
        }
    }

    fn rebuild_layout_mesh(&mut self) {
        let prims = build_layout_primitives(&GRID, self.layout.blocks());
        self.static_mesh = build_layout_mesh(&prims);
        log::debug!(
            "Layout mesh rebuilt: {} quads, {} draw calls",
            self.static_mesh.quad_count(),
            self.static_mesh.draw_calls.len()
        );
    }

    fn upload_frame_mesh(&mut self) {
        let mut mesh = self.static_mesh.clone();
        let key = self.player.animation.texture_key(&self.animations);
        add_player_quad(&mut mesh, &self.player, &self.motion, key);

        self.ensure_mesh_capacity(mesh.vertices.len(), mesh.indices.len());
        if !mesh.is_empty() {
            self.gpu
                .queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
            self.gpu
                .queue
                .write_buffer(&self.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        }
        self.quad_count = mesh.quad_count();
        self.draw_calls = mesh.draw_calls;
    }

    fn ensure_mesh_capacity(&mut self, vertex_count: usize, index_count: usize) {
        let needed_vertices = vertex_count.max(1);
        if needed_vertices > self.mesh_vertex_capacity {
            self.mesh_vertex_capacity = needed_vertices.next_power_of_two();
            self.vertex_buffer = create_vertex_buffer(&self.gpu.device, self.mesh_vertex_capacity);
        }

        let needed_indices = index_count.max(1);
        if needed_indices > self.mesh_index_capacity {
            self.mesh_index_capacity = needed_indices.next_power_of_two();
            self.index_buffer = create_index_buffer(&self.gpu.device, self.mesh_index_capacity);
        }
    }

    fn estimate_memory_mb(&self) -> f32 {
        let mut bytes: usize = 0;
        for tex in self.textures.values() {
            let (w, h) = tex.texture.size;
            bytes += (w as usize) * (h as usize) * 4;
        }
        bytes += self.mesh_vertex_capacity * std::mem::size_of::<SpriteVertex>();
        bytes += self.mesh_index_capacity * std::mem::size_of::<u32>();
        bytes as f32 / (1024.0 * 1024.0)
    }

    fn player_readout(&self) -> PlayerReadout {
        let clip = self.animations.clip(self.player.animation.clip);
        PlayerReadout {
            x: self.player.x,
            y: self.player.y,
            velocity_y: self.player.velocity_y,
            facing_scale: self.player.facing.scale(),
            airborne: self.player.airborne,
            jump_origin_y: self.player.jump_origin_y,
            clip_label: self.player.animation.clip.label().to_string(),
            frame_index: self.player.animation.state.frame_index,
            frame_count: clip.frames.len(),
        }
    }

    /// Run the fixed ticks owed this frame. Returns how many advanced the player.
    fn simulate(&mut self) -> u32 {
        let mut controls = Controls::from_input(&self.input);
        let mut ticks_run = 0;
        while self.time.should_step() {
            // Paused ticks still drain the accumulator so resuming does not burst.
            if self.paused && !self.single_step_requested {
                continue;
            }
            self.single_step_requested = false;

            self.player = advance(&self.player, controls, &self.motion, &self.animations);
            // The jump edge belongs to the first tick that sees it.
            controls.jump_pressed = false;
            ticks_run += 1;
        }
        ticks_run
    }

    fn render(&mut self) {
        let camera_uniform = self.camera.build_uniform();
        self.gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera_uniform]),
        );

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let stats = OverlayStats {
            draw_calls: self.draw_calls.len() as u32,
            texture_binds: count_texture_binds(&self.draw_calls) as u32,
            quad_count: self.quad_count as u32,
            memory_estimate_mb: self.estimate_memory_mb(),
            block_count: self.layout.blocks().len() as u32,
            layout_status: self.layout.status().label().to_string(),
            player: self.player_readout(),
            paused: self.paused,
        };
        let (egui_primitives, egui_textures_delta, overlay_actions) =
            self.debug_overlay.prepare(&self.window, &self.time, &stats);

        if overlay_actions.toggle_pause {
            self.paused = !self.paused;
            log::info!(
                "Simulation {}",
                if self.paused { "PAUSED" } else { "RESUMED" }
            );
        }
        if overlay_actions.single_step {
            self.single_step_requested = true;
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut last_bound_texture_key: Option<&Arc<str>> = None;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.sprite_pipeline.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for draw in &self.draw_calls {
                let Some(texture) = self.textures.get(&draw.texture_key) else {
                    continue;
                };
                let need_rebind = match last_bound_texture_key {
                    Some(last) => **last != *draw.texture_key,
                    None => true,
                };
                if need_rebind {
                    render_pass.set_bind_group(1, &texture.bind_group, &[]);
                    last_bound_texture_key = Some(&draw.texture_key);
                }
                render_pass.draw_indexed(
                    draw.index_start..(draw.index_start + draw.index_count),
                    0,
                    0..1,
                );
            }
        }

        self.debug_overlay.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &egui_primitives,
            &egui_textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.debug_overlay
                .paint(&mut egui_pass, &egui_primitives, &screen_descriptor);
        }

        self.debug_overlay.cleanup(&egui_textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    config: PlatformConfig,
    state: Option<EngineState>,
}

impl App {
    fn new() -> Self {
        let (width, height) = GRID.surface_size();
        Self {
            config: PlatformConfig {
                width,
                height,
                ..PlatformConfig::default()
            },
            state: None,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let started = hop_platform::window::create_window(event_loop, &self.config)
            .and_then(|window| EngineState::new(window, &self.config));
        match started {
            Ok(state) => self.state = Some(state),
            Err(err) => {
                log::error!("Startup failed: {err}");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        let egui_consumed = state
            .debug_overlay
            .handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::Focused(false) => {
                // Key-up events for keys held while unfocused never arrive.
                state.input.release_all();
            }

            WindowEvent::KeyboardInput { event, .. } if !egui_consumed => {
                let PhysicalKey::Code(key_code) = event.physical_key else {
                    return;
                };
                let pressed = event.state == ElementState::Pressed;

                // Engine shortcuts act once per physical press.
                if pressed && !event.repeat {
                    match key_code {
                        KeyCode::Escape => {
                            log::info!("Escape pressed, exiting.");
                            event_loop.exit();
                            return;
                        }
                        KeyCode::F3 => {
                            state.debug_overlay.toggle();
                            return;
                        }
                        _ => {}
                    }
                }

                if let Some(game_key) = map_key(key_code) {
                    if pressed {
                        state.input.key_down(game_key);
                    } else {
                        state.input.key_up(game_key);
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if state.gpu.size.0 == 0 || state.gpu.size.1 == 0 {
                    return;
                }

                state.time.begin_frame();
                // Layout swaps happen at the frame boundary, never mid-tick.
                state.poll_layout();
                let ticks_run = state.simulate();
                state.time.end_frame();

                state.upload_frame_mesh();
                state.render();

                // Only clear edge-triggered input after a tick consumed it.
                // Otherwise a press that lands on a frame with 0 ticks is lost.
                if ticks_run > 0 {
                    state.input.end_frame();
                }
            }

            _ => {}
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    let byte_len = (vertex_capacity * std::mem::size_of::<SpriteVertex>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Vertex Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_index_buffer(device: &wgpu::Device, index_capacity: usize) -> wgpu::Buffer {
    let byte_len = (index_capacity * std::mem::size_of::<u32>()).max(1) as u64;
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Index Buffer"),
        size: byte_len,
        usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn load_texture_file(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    path: &Path,
) -> Result<Texture, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read texture '{}': {e}", path.display()))?;
    Texture::from_bytes(device, queue, &bytes, &path.to_string_lossy())
}

/// Checkerboard in the clip's tint. The cell size changes with the frame so a
/// playing clip is still visibly animated.
fn placeholder_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    clip: ClipId,
    frame_index: usize,
    label: &str,
) -> Texture {
    let [r, g, b] = clip.placeholder_tint();
    let light = [r, g, b, 255];
    let dark = [r / 3, g / 3, b / 3, 255];
    let cell = 4 + 4 * (frame_index as u32 % 4);
    let pixels = checker_rgba8(PLACEHOLDER_SIZE, cell, light, dark);
    Texture::from_rgba8(
        device,
        queue,
        &pixels,
        PLACEHOLDER_SIZE,
        PLACEHOLDER_SIZE,
        label,
    )
}

fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        _ => None,
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Hopper starting...");

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
    }
}
