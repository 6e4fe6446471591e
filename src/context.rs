//! Application context.
//!
//! [`SceneState`] owns everything a frame reads that is not a GPU object:
//! viewport, camera, controls, uniforms, clock, particles and the loaded scene
//! graph. [`Context`] owns the window surface, the device and the renderer.
//! Event handlers borrow both; nothing lives in globals.

use std::sync::Arc;

use anyhow::Context as _;
use instant::Instant;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraUniform, OrbitControls, Projection},
    config::PortalConfig,
    data_structures::{
        colour::Colour,
        material::{Bindings, bind_materials},
        particles::ParticleBuffer,
        scene_graph::SceneGraph,
        uniforms::{FirefliesUniform, PortalUniform, SceneUniforms},
    },
    error::MaterialBindingError,
    pipelines::basic::RenderTarget,
    render::{FrameTargets, SceneRenderer, clamp_surface_size},
};

/// Output size in logical pixels plus the resolution scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: clamp_pixel_ratio(device_pixel_ratio, max_pixel_ratio),
            max_pixel_ratio,
        }
    }

    /// Returns false and changes nothing when either side is zero
    /// (minimised windows, hidden canvases).
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        self.pixel_ratio = clamp_pixel_ratio(device_pixel_ratio, self.max_pixel_ratio);
        true
    }

    /// Renderer size in logical pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Size of the surface actually drawn into.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        (
            ((self.width as f32 * self.pixel_ratio).round() as u32).max(1),
            ((self.height as f32 * self.pixel_ratio).round() as u32).max(1),
        )
    }
}

fn clamp_pixel_ratio(device_pixel_ratio: f32, max_pixel_ratio: f32) -> f32 {
    if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio.min(max_pixel_ratio)
    } else {
        1.0
    }
}

/// Seconds since the first sample. Never pauses.
#[derive(Clone, Copy, Debug, Default)]
pub struct Clock {
    start: Option<Instant>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&mut self) -> f32 {
        self.elapsed_at(Instant::now())
    }

    pub fn elapsed_at(&mut self, now: Instant) -> f32 {
        let start = *self.start.get_or_insert(now);
        now.duration_since(start).as_secs_f32()
    }
}

/// Scene state shared by the render loop, the resize handler and the debug panel.
#[derive(Clone, Debug)]
pub struct SceneState {
    pub viewport: Viewport,
    pub camera: Camera,
    pub projection: Projection,
    pub controls: OrbitControls,
    pub camera_uniform: CameraUniform,
    pub uniforms: SceneUniforms,
    pub clock: Clock,
    pub particles: ParticleBuffer,
    /// `None` until the model has loaded and its materials are bound.
    pub graph: Option<SceneGraph>,
    pub pole_colour: Colour,
}

impl SceneState {
    pub fn new(
        config: &PortalConfig,
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
        rng: &mut impl rand::Rng,
    ) -> Self {
        let viewport = Viewport::new(width, height, device_pixel_ratio, config.max_pixel_ratio);
        let (width, height) = viewport.size();
        let camera = Camera::new(config.camera_eye, config.camera_target);
        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(config.fov_degrees),
            config.znear,
            config.zfar,
        );
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let mut state = Self {
            viewport,
            camera,
            projection,
            controls: OrbitControls::new(config.damping_factor),
            camera_uniform,
            uniforms: SceneUniforms {
                clear_colour: config.clear_colour,
                portal: PortalUniform::new(config.portal_colour_start, config.portal_colour_end),
                fireflies: FirefliesUniform::new(config.firefly_point_size, viewport.pixel_ratio()),
            },
            clock: Clock::new(),
            particles: ParticleBuffer::generate(config.firefly_count, rng),
            graph: None,
            pole_colour: config.pole_colour,
        };
        state.sync_viewport();
        state
    }

    /// Applies a window resize. Sizes are logical pixels. Zero sizes are ignored.
    /// Calling it again with the same arguments leaves the state as it is.
    pub fn resize(&mut self, width: u32, height: u32, device_pixel_ratio: f32) -> bool {
        if !self.viewport.resize(width, height, device_pixel_ratio) {
            return false;
        }
        self.sync_viewport();
        true
    }

    fn sync_viewport(&mut self) {
        let (width, height) = self.viewport.size();
        self.projection.resize(width, height);
        self.camera_uniform.update_view_proj(&self.camera, &self.projection);
        let (buffer_width, buffer_height) = self.viewport.drawing_buffer_size();
        self.uniforms.fireflies.pixel_ratio = self.viewport.pixel_ratio();
        self.uniforms.fireflies.viewport = [buffer_width as f32, buffer_height as f32];
    }

    /// Binds materials and installs the graph. A failed binding leaves the
    /// state without a graph.
    pub fn attach_scene(&mut self, mut graph: SceneGraph) -> Result<Bindings, MaterialBindingError> {
        let bindings = bind_materials(&mut graph, self.pole_colour)?;
        self.graph = Some(graph);
        Ok(bindings)
    }

    /// One animation step: damping, both time uniforms, camera matrices.
    pub fn advance(&mut self, elapsed: f32) {
        self.controls.update(&mut self.camera);
        self.uniforms.set_time(elapsed);
        self.camera_uniform.update_view_proj(&self.camera, &self.projection);
    }
}

/// The GPU side: surface, device, queue, frame targets and scene renderer.
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub targets: FrameTargets,
    pub renderer: SceneRenderer,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneState) -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No GPU adapter can present to this window")?;
        log::info!("Adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    // WebGL doesn't support all of wgpu's features, so if
                    // we're building for the web we'll have to disable some.
                    required_limits: if cfg!(target_arch = "wasm32") {
                        wgpu::Limits::downlevel_webgl2_defaults()
                    } else {
                        wgpu::Limits::default()
                    },
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("Failed to request a GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are computed in linear space; an sRGB surface does the encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface reports no texture formats")?;
        let max_dimension = device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_surface_size(scene.viewport.drawing_buffer_size(), max_dimension);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let target = RenderTarget::for_adapter(&adapter, config.format);
        log::info!("Scene pass at {}x MSAA", target.sample_count);
        let targets = FrameTargets::new(&device, target, [config.width, config.height]);
        let renderer = SceneRenderer::new(&device, target, &scene.particles, &scene.uniforms);

        let mut ctx = Self {
            window,
            surface,
            device,
            queue,
            config,
            targets,
            renderer,
            is_surface_configured: false,
        };
        // wasm canvases start at 0x0 until the first resize
        let size = ctx.window.inner_size();
        if size.width > 0 && size.height > 0 {
            ctx.configure_surface();
        }
        Ok(ctx)
    }

    /// Resizes the scene state and then the surface and depth buffer to the
    /// new drawing-buffer size. `width` and `height` are logical pixels.
    pub fn resize(&mut self, scene: &mut SceneState, width: u32, height: u32, device_pixel_ratio: f32) {
        if !scene.resize(width, height, device_pixel_ratio) {
            return;
        }
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_surface_size(scene.viewport.drawing_buffer_size(), max_dimension);
        self.config.width = width;
        self.config.height = height;
        self.configure_surface();
    }

    /// Reconfigures the surface at its current size, e.g. after it was lost.
    pub fn configure_surface(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.targets = FrameTargets::new(
            &self.device,
            self.targets.target(),
            [self.config.width, self.config.height],
        );
        self.is_surface_configured = true;
    }

    pub fn is_surface_configured(&self) -> bool {
        self.is_surface_configured
    }

    pub fn upload_scene(&mut self, graph: &SceneGraph, baked: &image::DynamicImage) {
        self.renderer
            .upload_scene(&self.device, &self.queue, graph, baked);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        let viewport = Viewport::new(100, 100, 3.0, 2.0);
        assert_eq!(viewport.pixel_ratio(), 2.0);
        assert_eq!(viewport.drawing_buffer_size(), (200, 200));
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut viewport = Viewport::new(640, 480, 1.0, 2.0);
        assert!(!viewport.resize(0, 480, 1.0));
        assert!(!viewport.resize(640, 0, 1.0));
        assert_eq!(viewport.size(), (640, 480));
    }

    #[test]
    fn nonsense_device_pixel_ratio_falls_back_to_one() {
        let viewport = Viewport::new(10, 10, f32::NAN, 2.0);
        assert_eq!(viewport.pixel_ratio(), 1.0);
    }

    #[test]
    fn clock_starts_at_the_first_sample() {
        let mut clock = Clock::new();
        let start = Instant::now();
        assert_eq!(clock.elapsed_at(start), 0.0);
        let later = clock.elapsed_at(start + Duration::from_millis(1500));
        assert!((later - 1.5).abs() < 1e-6);
    }
}
