//! Shader uniforms and the renderer state the debug panel can reach.
//!
//! [`SceneUniforms`] is the single place that the debug panel, the resize
//! handler and the render loop write to. The renderer copies it into GPU
//! buffers once per frame.

use crate::data_structures::colour::Colour;

/// Uniform block of the portal program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PortalUniform {
    pub colour_start: [f32; 3],
    pub time: f32,
    pub colour_end: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: f32,
}

impl PortalUniform {
    pub fn new(colour_start: Colour, colour_end: Colour) -> Self {
        Self {
            colour_start: colour_start.to_linear(),
            time: 0.0,
            colour_end: colour_end.to_linear(),
            _padding: 0.0,
        }
    }
}

/// Uniform block of the firefly program.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FirefliesUniform {
    pub time: f32,
    pub pixel_ratio: f32,
    pub point_size: f32,
    pub _padding: f32,
    /// Drawing-buffer size in pixels, turns the pixel point size into clip space.
    pub viewport: [f32; 2],
    pub _padding2: [f32; 2],
}

impl FirefliesUniform {
    pub fn new(point_size: f32, pixel_ratio: f32) -> Self {
        Self {
            time: 0.0,
            pixel_ratio,
            point_size,
            _padding: 0.0,
            viewport: [1.0, 1.0],
            _padding2: [0.0; 2],
        }
    }
}

/// Everything a frame reads that can change after startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUniforms {
    pub clear_colour: Colour,
    pub portal: PortalUniform,
    pub fireflies: FirefliesUniform,
}

impl SceneUniforms {
    /// Both animated programs run on the same clock.
    pub fn set_time(&mut self, elapsed: f32) {
        self.portal.time = elapsed;
        self.fireflies.time = elapsed;
    }
}
