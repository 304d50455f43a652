use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use blastfield_assets::{SpriteLoader, SpritePools};
use blastfield_common::{Aabb, Timestamp};
use blastfield_fx::{DemoConfig, Detonation, EmissionKind, Stage};
use blastfield_input::{Action, Button, InputState};
use blastfield_render::Frame;
use blastfield_render_wgpu::{FlyCamera, WgpuRenderer};
use clap::Parser;
use egui::Context as EguiContext;
use glam::{Vec2, Vec3};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const GROUND_HALF_EXTENT: f32 = 50.0;
const CAMERA_MARGIN: f32 = 2.0;

#[derive(Parser)]
#[command(name = "blastfield-desktop", about = "Blastfield desktop demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the particle sampling seed
    #[arg(long)]
    seed: Option<u64>,
}

fn key_button(key: KeyCode) -> Option<Button> {
    match key {
        KeyCode::KeyW => Some(Button::Forward),
        KeyCode::KeyS => Some(Button::Back),
        KeyCode::KeyA => Some(Button::Left),
        KeyCode::KeyD => Some(Button::Right),
        KeyCode::KeyE => Some(Button::Up),
        KeyCode::KeyQ => Some(Button::Down),
        KeyCode::ShiftLeft => Some(Button::Boost),
        _ => None,
    }
}

fn key_action(key: KeyCode) -> Action {
    match key {
        KeyCode::Space => Action::DropBomb,
        KeyCode::F1 => Action::ToggleHud,
        KeyCode::KeyR => Action::ResetCamera,
        _ => Action::Noop,
    }
}

/// Application state.
struct AppState {
    stage: Stage,
    pools: SpritePools,
    loader: SpriteLoader,
    camera: FlyCamera,
    input: InputState,
    ground_height: f32,
    show_hud: bool,
    mouse_captured: bool,
    started: Instant,
    last_frame: Instant,
    last_detonation: Option<Detonation>,
    fx_events: u64,
}

impl AppState {
    fn new(config: &DemoConfig) -> Self {
        let ground_height = config.bomb.ground_height;
        let ground = Aabb::new(
            Vec3::new(-GROUND_HALF_EXTENT, ground_height, -GROUND_HALF_EXTENT),
            Vec3::new(GROUND_HALF_EXTENT, ground_height, GROUND_HALF_EXTENT),
        );
        let now = Instant::now();
        Self {
            stage: Stage::from_config(config),
            pools: SpritePools::new(),
            loader: SpriteLoader::new(&config.assets),
            camera: FlyCamera::bounded(ground, CAMERA_MARGIN, 0.5, 40.0),
            input: InputState::new(),
            ground_height,
            show_hud: true,
            mouse_captured: false,
            started: now,
            last_frame: now,
            last_detonation: None,
            fx_events: 0,
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.started.elapsed().as_secs_f64() * 1000.0)
    }

    /// One rendered frame: camera, sprite streaming, then exactly one
    /// simulator tick.
    fn update(&mut self, dt: f32) {
        self.camera.apply(self.input.intent(), dt);

        let progress = self.loader.poll(&mut self.pools);
        if progress.loaded_this_frame > 0 && self.loader.is_finished() {
            tracing::info!(
                loaded = self.loader.loaded(),
                failed = self.loader.failed(),
                "sprite loading finished"
            );
        }

        let now = self.now();
        if let Some(detonation) = self.stage.tick(now, &self.pools) {
            self.last_detonation = Some(detonation);
        }

        for event in self.stage.simulator_mut().drain_events() {
            tracing::debug!(?event, "fx event");
            self.fx_events += 1;
        }
    }

    fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if let Some(button) = key_button(key) {
            self.input.set(button, pressed);
            return;
        }
        if pressed {
            self.apply(key_action(key));
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Look(delta) => self.camera.rotate(delta.x, delta.y),
            Action::DropBomb => {
                if self.stage.drop_bomb() {
                    tracing::info!("bomb away");
                }
            }
            Action::ToggleHud => self.show_hud = !self.show_hud,
            Action::ResetCamera => self.camera.reset(),
            Action::Noop => {}
        }
    }

    fn draw_ui(&mut self, ctx: &EguiContext) {
        if !self.show_hud {
            return;
        }

        let mut drop_clicked = false;
        let sim = self.stage.simulator();
        let bomb = self.stage.bomb();

        egui::SidePanel::left("hud")
            .default_width(260.0)
            .show(ctx, |ui| {
                ui.heading("Blastfield");
                ui.separator();
                ui.label(format!("Tick: {}  Seed: {}", sim.tick(), sim.seed()));
                ui.label(format!("Fx events: {}", self.fx_events));
                ui.label(format!(
                    "Camera: ({:.1}, {:.1}, {:.1})",
                    self.camera.position.x, self.camera.position.y, self.camera.position.z
                ));
                let p = bomb.position();
                let bomb_label = if bomb.is_falling() {
                    format!("Bomb: falling at ({:.1}, {:.2}, {:.1})", p.x, p.y, p.z)
                } else {
                    "Bomb: idle".to_string()
                };
                ui.label(bomb_label);
                ui.label(format!("Ground: {:.1}", self.ground_height));

                let ready = !bomb.is_falling() && !sim.has_active(EmissionKind::Burst);
                if ui
                    .add_enabled(ready, egui::Button::new("Drop Bomb (Space)"))
                    .clicked()
                {
                    drop_clicked = true;
                }

                ui.separator();
                ui.heading("Sprites");
                for name in self.pools.names() {
                    ui.label(format!("{name}: {}", self.pools.pool(name).len()));
                }
                if !self.loader.is_finished() {
                    ui.label(format!("Loading... {} left", self.loader.remaining()));
                }
                if self.loader.failed() > 0 {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("{} sprite(s) failed to load", self.loader.failed()),
                    );
                }

                ui.separator();
                ui.heading(format!("Emissions ({})", sim.active_count()));
                for e in sim.emissions() {
                    let mut line = format!("#{} {} a={:.2}", e.id().0, e.kind(), e.opacity());
                    if e.kind().has_particles() {
                        line.push_str(&format!(" n={}", e.particle_count()));
                    }
                    if e.kind() == EmissionKind::Shockwave {
                        line.push_str(&format!(" r={:.1}", e.ring_radius()));
                    }
                    ui.monospace(line);
                }

                if let Some(d) = &self.last_detonation {
                    ui.separator();
                    ui.label(format!(
                        "Last detonation: {} spawned, {} skipped",
                        d.spawned.len(),
                        d.skipped.len()
                    ));
                    for (name, reason) in &d.skipped {
                        ui.small(format!("{name}: {reason}"));
                    }
                }

                ui.separator();
                ui.small("Space: Drop | F1: HUD | RMB: Look | WASD/QE: Move | R: Reset");
            });

        if drop_clicked {
            self.apply(Action::DropBomb);
        }
    }
}

/// Window and GPU resources, created once the event loop resumes.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, egui_ctx: &EguiContext, ground_height: f32) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Blastfield")
            .with_inner_size(PhysicalSize::new(1280u32, 720));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("find adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("blastfield_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = WgpuRenderer::new(
            &device,
            surface_format,
            config.width,
            config.height,
            ground_height,
        );

        let egui_winit = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        })
    }

    fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.config.width = size.width.max(1);
        self.config.height = size.height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.renderer
            .resize(&self.device, self.config.width, self.config.height);
    }

    fn draw(&mut self, state: &mut AppState, egui_ctx: &EguiContext) {
        let output = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        {
            let frame = Frame::capture(&state.stage, state.now(), state.camera.render_view());
            self.renderer
                .render(&self.device, &self.queue, &view, &state.camera, &frame);
        }

        let raw_input = self.egui_winit.take_egui_input(&self.window);
        let full_output = egui_ctx.run(raw_input, |ctx| {
            state.draw_ui(ctx);
        });
        self.egui_winit
            .handle_platform_output(&self.window, full_output.platform_output);

        let paint_jobs = egui_ctx.tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
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
            self.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        output.present();
        self.window.request_redraw();
    }
}

struct GpuApp {
    state: AppState,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
}

impl GpuApp {
    fn new(config: &DemoConfig) -> Self {
        Self {
            state: AppState::new(config),
            gpu: None,
            egui_ctx: EguiContext::default(),
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match Gpu::new(event_loop, &self.egui_ctx, self.state.ground_height) {
            Ok(gpu) => {
                self.state.camera.aspect = gpu.aspect();
                self.gpu = Some(gpu);
            }
            Err(e) => {
                tracing::error!("failed to initialize graphics: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };

        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.resize(new_size);
                self.state.camera.aspect = gpu.aspect();
            }
            WindowEvent::Focused(false) => {
                self.state.input.clear();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                if !repeat {
                    self.state
                        .handle_key(key, key_state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: btn_state,
                ..
            } => {
                self.state.mouse_captured = btn_state == ElementState::Pressed;
                gpu.window.set_cursor_visible(!self.state.mouse_captured);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.state.last_frame).as_secs_f32().min(0.1);
                self.state.last_frame = now;
                self.state.update(dt);
                gpu.draw(&mut self.state, &self.egui_ctx);
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.state.mouse_captured {
                self.state
                    .apply(Action::Look(Vec2::new(delta.0 as f32, delta.1 as f32)));
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => DemoConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DemoConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    tracing::info!(
        seed = config.seed,
        presets = config.presets.len(),
        "blastfield-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(&config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_buttons_and_actions() {
        assert_eq!(key_button(KeyCode::KeyW), Some(Button::Forward));
        assert_eq!(key_button(KeyCode::Space), None);
        assert_eq!(key_action(KeyCode::Space), Action::DropBomb);
        assert_eq!(key_action(KeyCode::KeyW), Action::Noop);
    }

    #[test]
    fn space_drops_bomb_once() {
        let mut state = AppState::new(&DemoConfig::default());
        state.handle_key(KeyCode::Space, true);
        assert!(state.stage.bomb().is_falling());
        let y = state.stage.bomb().position().y;
        state.handle_key(KeyCode::Space, true);
        assert_eq!(state.stage.bomb().position().y, y);
    }

    #[test]
    fn held_keys_move_camera() {
        let mut state = AppState::new(&DemoConfig::default());
        let start = state.camera.position;
        state.handle_key(KeyCode::KeyW, true);
        state.update(0.1);
        assert!(state.camera.position.z < start.z);
        state.handle_key(KeyCode::KeyW, false);
        let stopped = state.camera.position;
        state.update(0.1);
        assert_eq!(state.camera.position, stopped);
    }

    #[test]
    fn frames_drain_the_event_log() {
        let mut state = AppState::new(&DemoConfig::default());
        for frame in 0..400 {
            if frame % 80 == 0 {
                state.handle_key(KeyCode::Space, true);
                state.handle_key(KeyCode::Space, false);
            }
            state.update(0.016);
            assert!(state.stage.simulator().events().is_empty());
        }
        assert!(state.last_detonation.is_some());
        assert!(state.fx_events >= 4);
    }
}
