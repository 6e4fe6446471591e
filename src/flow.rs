//! Flow control and application event loop.
//!
//! # Lifecycle
//!
//! 1. `run` builds the event loop and the [`App`]; the scene state (camera,
//!    uniforms, fireflies, debug panel) exists before any window does.
//! 2. `resumed` creates the window and the GPU context, then starts loading
//!    the model and baked texture in the background.
//! 3. Every `RedrawRequested` runs one [`RenderLoop::tick`]: clock, camera
//!    damping, time uniforms, draw, and a request for the next frame.
//! 4. When the assets arrive ([`FlowEvent::Loaded`]) materials are bound and
//!    the meshes uploaded. Until then only the fireflies are drawn.
//!
//! The loop ends when the window closes or someone calls
//! [`StopToken::stop`].

use std::{
    iter,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    config::PortalConfig,
    context::{Context, SceneState},
    data_structures::uniforms::SceneUniforms,
    debug::{DebugOverlay, DebugPanel, portal_panel},
    error::AssetLoadError,
    resources::{LoadedAssets, load_scene_assets},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Running,
    Stopped,
}

/// Cancels a [`RenderLoop`] from outside: shutdown paths, tests, other threads.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the host should do after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    /// Schedule the next frame.
    Continue,
    Exit,
}

/// Where a tick draws to. The window implements it with the surface; tests
/// implement it with a recorder.
pub trait FrameSink {
    fn draw(&mut self, scene: &mut SceneState) -> Result<(), wgpu::SurfaceError>;

    /// Called after the surface reported itself lost or outdated.
    fn reconfigure(&mut self, scene: &mut SceneState);
}

#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    stop: StopToken,
    frames: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::NotStarted,
            stop: StopToken::new(),
            frames: 0,
        }
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn tick(&mut self, scene: &mut SceneState, sink: &mut impl FrameSink) -> LoopControl {
        self.tick_at(Instant::now(), scene, sink)
    }

    /// One frame at the given instant. Nothing is drawn once stopped.
    pub fn tick_at(
        &mut self,
        now: Instant,
        scene: &mut SceneState,
        sink: &mut impl FrameSink,
    ) -> LoopControl {
        if self.stop.is_stopped() {
            if self.state != LoopState::Stopped {
                log::info!("Render loop stopped after {} frames", self.frames);
                self.state = LoopState::Stopped;
            }
            return LoopControl::Exit;
        }
        if self.state == LoopState::NotStarted {
            log::info!("Render loop started");
            self.state = LoopState::Running;
        }

        let elapsed = scene.clock.elapsed_at(now);
        scene.advance(elapsed);

        match sink.draw(scene) {
            Ok(()) => self.frames += 1,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => sink.reconfigure(scene),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, stopping the render loop");
                self.stop.stop();
                self.state = LoopState::Stopped;
                return LoopControl::Exit;
            }
            Err(e) => log::error!("Unable to render {}", e),
        }
        LoopControl::Continue
    }
}

/// Window, GPU context and debug overlay, created together once a window exists.
pub struct Gpu {
    pub ctx: Context,
    pub overlay: DebugOverlay,
}

impl Gpu {
    pub async fn new(
        window: Arc<Window>,
        scene: &SceneState,
        panel: DebugPanel<SceneUniforms>,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window.clone(), scene).await?;
        let overlay = DebugOverlay::new(&window, &ctx.device, ctx.config.format, panel);
        Ok(Self { ctx, overlay })
    }

    fn resize_to_window(&mut self, scene: &mut SceneState) {
        let (width, height, scale_factor) = logical_size(&self.ctx.window);
        self.ctx.resize(scene, width, height, scale_factor);
    }
}

impl FrameSink for Gpu {
    fn draw(&mut self, scene: &mut SceneState) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let size = [self.ctx.config.width, self.ctx.config.height];
        let ui = self
            .overlay
            .run(&self.ctx.window, size, &mut scene.uniforms);
        self.ctx
            .renderer
            .write_uniforms(&self.ctx.queue, &scene.camera_uniform, &scene.uniforms);

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.ctx.renderer.render(
            &mut encoder,
            &view,
            &self.ctx.targets,
            scene.uniforms.clear_colour,
        );
        self.overlay
            .paint(&self.ctx.device, &self.ctx.queue, &mut encoder, &view, ui);

        self.ctx.queue.submit(iter::once(encoder.finish()));
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }

    fn reconfigure(&mut self, scene: &mut SceneState) {
        self.resize_to_window(scene);
    }
}

/// Window size in logical pixels and the scale factor.
fn logical_size(window: &Window) -> (u32, u32, f32) {
    let scale_factor = window.scale_factor();
    let logical = window.inner_size().to_logical::<f64>(scale_factor);
    (
        logical.width.round() as u32,
        logical.height.round() as u32,
        scale_factor as f32,
    )
}

pub enum FlowEvent {
    /// wasm only: the GPU context finished initialising in `spawn_local`.
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<anyhow::Result<Gpu>>),
    Loaded(Result<LoadedAssets, AssetLoadError>),
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.as_ref().map(|_| "Gpu"))
                .finish(),
            Self::Loaded(result) => f
                .debug_tuple("Loaded")
                .field(&result.as_ref().map(|assets| &assets.graph.name))
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: PortalConfig,
    scene: SceneState,
    // Moves into the overlay once the GPU exists.
    panel: Option<DebugPanel<SceneUniforms>>,
    gpu: Option<Gpu>,
    render_loop: RenderLoop,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(event_loop: &EventLoop<FlowEvent>, config: PortalConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        // Real size arrives with the window.
        let scene = SceneState::new(&config, 1, 1, 1.0, &mut rand::thread_rng());
        let panel = Some(portal_panel(&config));
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            scene,
            panel,
            gpu: None,
            render_loop: RenderLoop::new(),
            error: None,
        })
    }

    pub fn stop_token(&self) -> StopToken {
        self.render_loop.stop_token()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.render_loop.stop_token().stop();
        self.error = Some(error);
        event_loop.exit();
    }

    fn install_gpu(&mut self, mut gpu: Gpu) {
        gpu.resize_to_window(&mut self.scene);
        gpu.ctx.window.request_redraw();
        self.gpu = Some(gpu);
        self.start_loading();
    }

    /// Loads the assets off the event loop; the result comes back as [`FlowEvent::Loaded`].
    fn start_loading(&self) {
        let config = self.config.clone();
        let proxy = self.proxy.clone();
        let load = async move {
            let result = load_scene_assets(&config).await;
            if proxy.send_event(FlowEvent::Loaded(result)).is_err() {
                log::warn!("Event loop closed before the scene finished loading");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.spawn(load);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(load);
    }

    fn on_loaded(&mut self, event_loop: &ActiveEventLoop, assets: LoadedAssets) {
        if let Err(e) = self.scene.attach_scene(assets.graph) {
            self.fail(
                event_loop,
                anyhow::Error::new(e).context("Binding materials to the loaded model failed"),
            );
            return;
        }
        if let (Some(gpu), Some(graph)) = (self.gpu.as_mut(), self.scene.graph.as_ref()) {
            gpu.ctx.upload_scene(graph, &assets.baked);
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        let Some(panel) = self.panel.take() else {
            // still initialising (wasm)
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.window_title.as_str());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("No #{CANVAS_ID} element, winit will create a canvas"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };
        let (width, height, scale_factor) = logical_size(&window);
        self.scene.resize(width, height, scale_factor);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(Gpu::new(window, &self.scene, panel))
            {
                Ok(gpu) => self.install_gpu(gpu),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let scene = self.scene.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = Gpu::new(window, &scene, panel).await;
                if proxy
                    .send_event(FlowEvent::Initialized(Box::new(result)))
                    .is_err()
                {
                    log::warn!("Event loop closed before the GPU was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Initialized(result) => match *result {
                Ok(gpu) => self.install_gpu(gpu),
                Err(e) => self.fail(event_loop, e),
            },
            FlowEvent::Loaded(Ok(assets)) => self.on_loaded(event_loop, assets),
            FlowEvent::Loaded(Err(e)) => {
                // the fireflies keep rendering without the model
                log::error!("Failed to load the scene: {e}");
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        if window_id != gpu.ctx.window.id() {
            return;
        }

        let consumed = gpu.overlay.on_window_event(&gpu.ctx.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                self.render_loop.stop_token().stop();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                gpu.resize_to_window(&mut self.scene);
            }
            WindowEvent::RedrawRequested => match self.render_loop.tick(&mut self.scene, &mut *gpu) {
                LoopControl::Continue => gpu.ctx.window.request_redraw(),
                LoopControl::Exit => event_loop.exit(),
            },
            other => {
                // a drag that ends over the panel must still end
                let released = matches!(
                    other,
                    WindowEvent::MouseInput {
                        state: ElementState::Released,
                        ..
                    }
                );
                if !consumed || released {
                    let height = gpu.ctx.window.inner_size().height as f32;
                    self.scene.controls.handle_window_event(&other, height);
                }
            }
        }
    }
}

/// Opens the window and runs until it closes. Returns the error that ended
/// the app early, if any.
pub fn run(config: PortalConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    log::info!("Starting with assets from {}", config.assets_root.display());
    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(PortalConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
