use wgpu::util::DeviceExt;

use crate::data_structures::{
    model::Vertex,
    particles::{FireflyRaw, ParticleBuffer},
    texture::Texture,
    uniforms::FirefliesUniform,
};
use crate::pipelines::basic::{PipelineOptions, RenderTarget, mk_render_pipeline, mk_uniform, uniform_bind_group_layout};

/// Additive colour, destination alpha untouched.
pub const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Glowing sprites drawn as one camera-facing quad per firefly.
pub struct FirefliesResources {
    pub instance_buffer: wgpu::Buffer,
    pub num_instances: u32,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub render_pipeline: wgpu::RenderPipeline,
}

impl FirefliesResources {
    pub fn new(
        device: &wgpu::Device,
        target: RenderTarget,
        camera_bind_group_layout: &wgpu::BindGroupLayout,
        particles: &ParticleBuffer,
        uniform: &FirefliesUniform,
    ) -> Self {
        let instance_data = particles.to_raw();
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Firefly Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let bind_group_layout = uniform_bind_group_layout(
            device,
            "fireflies_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let (buffer, bind_group) = mk_uniform(device, &bind_group_layout, "Fireflies Uniform Buffer", uniform);
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fireflies Pipeline Layout"),
            bind_group_layouts: &[camera_bind_group_layout, &bind_group_layout],
            push_constant_ranges: &[],
        });
        let shader = wgpu::ShaderModuleDescriptor {
            label: Some("Fireflies Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("fireflies.wgsl").into()),
        };
        let render_pipeline = mk_render_pipeline(
            device,
            &layout,
            target,
            Some(ADDITIVE_BLEND),
            Some(Texture::DEPTH_FORMAT),
            &[FireflyRaw::desc()],
            shader,
            PipelineOptions {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                cull_mode: None,
                // tested against the scene, but never hide each other
                depth_write_enabled: false,
            },
        );

        Self {
            instance_buffer,
            num_instances: instance_data.len() as u32,
            buffer,
            bind_group,
            render_pipeline,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, uniform: &FirefliesUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[*uniform]));
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.num_instances == 0 {
            return;
        }
        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(1, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        render_pass.draw(0..4, 0..self.num_instances);
    }
}
