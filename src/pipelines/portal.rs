use crate::data_structures::{
    instance::InstanceRaw,
    model::{ModelVertex, Vertex},
    texture::Texture,
    uniforms::PortalUniform,
};
use crate::pipelines::basic::{PipelineOptions, RenderTarget, mk_render_pipeline, mk_uniform, uniform_bind_group_layout};

/// The animated portal surface: two noise octaves and an outer glow, mixed
/// between the start and end colours.
pub struct PortalResources {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub render_pipeline: wgpu::RenderPipeline,
}

impl PortalResources {
    pub fn new(
        device: &wgpu::Device,
        target: RenderTarget,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        uniform: &PortalUniform,
    ) -> Self {
        let bind_group_layout =
            uniform_bind_group_layout(device, "portal_bind_group_layout", wgpu::ShaderStages::FRAGMENT);
        let (buffer, bind_group) = mk_uniform(device, &bind_group_layout, "Portal Uniform Buffer", uniform);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portal Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Portal Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("portal.wgsl").into()),
        };
        let render_pipeline = mk_render_pipeline(
            device,
            &layout,
            target,
            Some(wgpu::BlendState::REPLACE),
            Some(Texture::DEPTH_FORMAT),
            &[ModelVertex::desc(), InstanceRaw::desc()],
            shader,
            PipelineOptions {
                // the portal plane is seen from both sides of the arch
                cull_mode: None,
                ..Default::default()
            },
        );
        Self {
            buffer,
            bind_group,
            render_pipeline,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &PortalUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }
}
