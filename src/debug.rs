//! Debug panel.
//!
//! A [`DebugPanel`] is an ordered set of named fields. Each field holds the
//! current value (the source of truth), describes the control that edits it,
//! and may carry a hook that pushes new values into some target, typically
//! the [`SceneUniforms`]. The panel itself knows nothing about egui until
//! [`DebugPanel::show`] draws it; [`DebugOverlay`] wires that into winit and
//! wgpu.

use std::fmt;

use winit::{event::WindowEvent, window::Window};

use crate::{
    config::PortalConfig,
    data_structures::{colour::Colour, uniforms::SceneUniforms},
    error::DebugError,
};

pub const CLEAR_COLOUR: &str = "clearColor";
pub const PORTAL_COLOUR_START: &str = "portalColorStart";
pub const PORTAL_COLOUR_END: &str = "portalColorEnd";
pub const FIREFLIES_SIZE: &str = "firefliesSize";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DebugValue {
    Colour(Colour),
    Number(f32),
}

impl DebugValue {
    fn kind(&self) -> &'static str {
        match self {
            DebugValue::Colour(_) => "colour",
            DebugValue::Number(_) => "number",
        }
    }
}

impl fmt::Display for DebugValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugValue::Colour(colour) => write!(f, "{colour}"),
            DebugValue::Number(number) => write!(f, "{number}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    ColourPicker,
    Slider { min: f32, max: f32, step: f32 },
}

type Hook<T> = Box<dyn FnMut(&DebugValue, &mut T)>;

pub struct Field<T> {
    name: String,
    value: DebugValue,
    control: Control,
    hook: Option<Hook<T>>,
}

impl<T> Field<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> DebugValue {
        self.value
    }

    pub fn control(&self) -> Control {
        self.control
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("control", &self.control)
            .field("hook", &self.hook.as_ref().map(|_| "FnMut(&DebugValue, &mut T)"))
            .finish()
    }
}

/// Returned by the `add_*` methods to attach a change hook.
pub struct FieldBuilder<'a, T> {
    field: &'a mut Field<T>,
}

impl<T> FieldBuilder<'_, T> {
    /// Runs synchronously after every change made through [`DebugPanel::set`].
    pub fn on_change(self, hook: impl FnMut(&DebugValue, &mut T) + 'static) -> Self {
        self.field.hook = Some(Box::new(hook));
        self
    }
}

pub struct DebugPanel<T> {
    title: String,
    fields: Vec<Field<T>>,
}

impl<T> fmt::Debug for DebugPanel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugPanel")
            .field("title", &self.title)
            .field("fields", &self.fields)
            .finish()
    }
}

impl<T> DebugPanel<T> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    pub fn add_colour(&mut self, name: &str, initial: Colour) -> FieldBuilder<'_, T> {
        self.insert(name, DebugValue::Colour(initial), Control::ColourPicker)
    }

    /// The initial value is taken as given, even outside `min..=max`.
    pub fn add_number(
        &mut self,
        name: &str,
        initial: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> FieldBuilder<'_, T> {
        self.insert(
            name,
            DebugValue::Number(initial),
            Control::Slider { min, max, step },
        )
    }

    fn insert(&mut self, name: &str, value: DebugValue, control: Control) -> FieldBuilder<'_, T> {
        let field = Field {
            name: name.to_string(),
            value,
            control,
            hook: None,
        };
        let index = match self.fields.iter().position(|f| f.name == name) {
            Some(index) => {
                log::warn!("Debug field {name:?} registered twice, replacing it");
                self.fields[index] = field;
                index
            }
            None => {
                self.fields.push(field);
                self.fields.len() - 1
            }
        };
        FieldBuilder {
            field: &mut self.fields[index],
        }
    }

    pub fn get(&self, name: &str) -> Option<DebugValue> {
        self.field(name).map(|f| f.value)
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    fn field(&self, name: &str) -> Option<&Field<T>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Writes a value the way a control would: numbers are clamped to the
    /// slider range, then the hook runs. Returns the value actually stored.
    pub fn set(&mut self, name: &str, value: DebugValue, target: &mut T) -> Result<DebugValue, DebugError> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| DebugError::UnknownField(name.to_string()))?;

        let value = match (field.control, value) {
            (Control::ColourPicker, DebugValue::Colour(_)) => value,
            (Control::Slider { min, max, .. }, DebugValue::Number(number)) => {
                DebugValue::Number(number.clamp(min, max))
            }
            _ => {
                return Err(DebugError::TypeMismatch {
                    name: name.to_string(),
                    expected: field.value.kind(),
                    found: value.kind(),
                });
            }
        };

        field.value = value;
        if let Some(hook) = field.hook.as_mut() {
            hook(&value, target);
        }
        log::debug!("{name} = {value}");
        Ok(value)
    }

    /// Draws one window with a control per field and applies whatever the
    /// user changed this frame.
    pub fn show(&mut self, ctx: &egui::Context, target: &mut T) {
        let mut changes = Vec::new();
        egui::Window::new(self.title.as_str())
            .resizable(false)
            .show(ctx, |ui| {
                for field in &self.fields {
                    match (field.value, field.control) {
                        (DebugValue::Colour(colour), _) => {
                            let mut rgb = colour.to_array();
                            ui.horizontal(|ui| {
                                if ui.color_edit_button_srgb(&mut rgb).changed() {
                                    changes.push((field.name.clone(), DebugValue::Colour(rgb.into())));
                                }
                                ui.label(field.name.as_str());
                            });
                        }
                        (DebugValue::Number(mut number), Control::Slider { min, max, step }) => {
                            let slider = egui::Slider::new(&mut number, min..=max)
                                .step_by(step as f64)
                                .text(field.name.as_str());
                            if ui.add(slider).changed() {
                                changes.push((field.name.clone(), DebugValue::Number(number)));
                            }
                        }
                        (DebugValue::Number(number), Control::ColourPicker) => {
                            ui.label(format!("{}: {number}", field.name));
                        }
                    }
                }
            });

        for (name, value) in changes {
            if let Err(e) = self.set(&name, value, target) {
                log::warn!("Debug control change rejected: {e}");
            }
        }
    }
}

/// The scene's panel: clear colour, the two portal colours and the firefly size.
///
/// Each hook touches exactly one piece of state.
pub fn portal_panel(config: &PortalConfig) -> DebugPanel<SceneUniforms> {
    let mut panel = DebugPanel::new("Debug");
    panel
        .add_colour(CLEAR_COLOUR, config.clear_colour)
        .on_change(|value, uniforms: &mut SceneUniforms| {
            if let DebugValue::Colour(colour) = value {
                uniforms.clear_colour = *colour;
            }
        });
    panel
        .add_colour(PORTAL_COLOUR_START, config.portal_colour_start)
        .on_change(|value, uniforms: &mut SceneUniforms| {
            if let DebugValue::Colour(colour) = value {
                uniforms.portal.colour_start = colour.to_linear();
            }
        });
    panel
        .add_colour(PORTAL_COLOUR_END, config.portal_colour_end)
        .on_change(|value, uniforms: &mut SceneUniforms| {
            if let DebugValue::Colour(colour) = value {
                uniforms.portal.colour_end = colour.to_linear();
            }
        });
    let (min, max) = config.firefly_size_range;
    panel
        .add_number(FIREFLIES_SIZE, config.firefly_point_size, min, max, config.firefly_size_step)
        .on_change(|value, uniforms: &mut SceneUniforms| {
            if let DebugValue::Number(size) = value {
                uniforms.fireflies.point_size = *size;
            }
        });
    panel
}

/// Surface pixels per egui point.
///
/// egui measures the window in points of `egui_pixels_per_point` physical
/// pixels, but the surface may be smaller than the window when the pixel
/// ratio is capped. The UI is drawn at the surface's own density so it lines
/// up with the pointer once the surface is stretched over the window.
pub fn surface_pixels_per_point(egui_pixels_per_point: f32, surface_width: u32, window_width: u32) -> f32 {
    if window_width == 0 || surface_width == 0 {
        return egui_pixels_per_point;
    }
    egui_pixels_per_point * surface_width as f32 / window_width as f32
}

/// Tessellated UI of one frame, ready to paint.
pub struct PreparedUi {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    screen_descriptor: egui_wgpu::ScreenDescriptor,
}

/// The debug panel hosted in the window: egui input, UI pass and painting.
pub struct DebugOverlay {
    pub panel: DebugPanel<SceneUniforms>,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl DebugOverlay {
    pub fn new(
        window: &Window,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        panel: DebugPanel<SceneUniforms>,
    ) -> Self {
        let state = egui_winit::State::new(
            egui::Context::default(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(device.limits().max_texture_dimension_2d as usize),
        );
        let renderer = egui_wgpu::Renderer::new(device, format, None, 1, false);
        Self {
            panel,
            state,
            renderer,
        }
    }

    /// Feeds a window event to egui. Returns true when egui used it, in which
    /// case the camera controls must not see it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Runs the UI pass. Changes made in the panel land in `uniforms` right away.
    pub fn run(&mut self, window: &Window, size_in_pixels: [u32; 2], uniforms: &mut SceneUniforms) -> PreparedUi {
        let input = self.state.take_egui_input(window);
        let ctx = self.state.egui_ctx().clone();
        let panel = &mut self.panel;
        let output = ctx.run(input, |ctx| panel.show(ctx, uniforms));
        self.state.handle_platform_output(window, output.platform_output);

        let pixels_per_point = surface_pixels_per_point(
            output.pixels_per_point,
            size_in_pixels[0],
            window.inner_size().width,
        );
        PreparedUi {
            paint_jobs: ctx.tessellate(output.shapes, pixels_per_point),
            textures_delta: output.textures_delta,
            screen_descriptor: egui_wgpu::ScreenDescriptor {
                size_in_pixels,
                pixels_per_point,
            },
        }
    }

    /// Paints a prepared UI over whatever `view` already holds.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        ui: PreparedUi,
    ) {
        for (id, image_delta) in &ui.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &ui.paint_jobs, &ui.screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Debug Overlay Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.renderer
                .render(&mut render_pass.forget_lifetime(), &ui.paint_jobs, &ui.screen_descriptor);
        }

        for id in &ui.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}
