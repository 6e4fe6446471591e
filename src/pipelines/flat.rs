use crate::data_structures::{
    colour::Colour,
    instance::InstanceRaw,
    model::{ModelVertex, Vertex},
    texture::Texture,
};
use crate::pipelines::basic::{PipelineOptions, RenderTarget, mk_render_pipeline, mk_uniform, uniform_bind_group_layout};

/// Colour of a solid-colour mesh, linear, alpha always 1.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FlatUniform {
    pub colour: [f32; 4],
}

impl From<Colour> for FlatUniform {
    fn from(colour: Colour) -> Self {
        let [r, g, b] = colour.to_linear();
        Self {
            colour: [r, g, b, 1.0],
        }
    }
}

pub struct FlatResources {
    pub render_pipeline: wgpu::RenderPipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl FlatResources {
    pub fn new(
        device: &wgpu::Device,
        target: RenderTarget,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let bind_group_layout =
            uniform_bind_group_layout(device, "flat_bind_group_layout", wgpu::ShaderStages::FRAGMENT);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Flat Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Flat Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("flat.wgsl").into()),
        };
        let render_pipeline = mk_render_pipeline(
            device,
            &layout,
            target,
            Some(wgpu::BlendState::REPLACE),
            Some(Texture::DEPTH_FORMAT),
            &[ModelVertex::desc(), InstanceRaw::desc()],
            shader,
            PipelineOptions::default(),
        );
        Self {
            render_pipeline,
            bind_group_layout,
        }
    }

    /// Each flat mesh carries its own colour, so each gets its own bind group.
    pub fn mk_bind_group(&self, device: &wgpu::Device, colour: Colour) -> wgpu::BindGroup {
        let (_buffer, bind_group) = mk_uniform(
            device,
            &self.bind_group_layout,
            "Flat Colour Buffer",
            &FlatUniform::from(colour),
        );
        bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_stays_white_in_linear_space() {
        let uniform = FlatUniform::from(Colour::WHITE);
        for channel in uniform.colour {
            assert!((channel - 1.0).abs() < 1e-6);
        }
    }
}
