//! Frame composition.
//!
//! The bound scene graph is flattened once into [`DrawPlan`]s, one per mesh
//! node that received a material. [`SceneRenderer`] uploads them and sorts
//! them into per-pipeline batches: opaque materials first, then the additive
//! fireflies on top.

use wgpu::util::DeviceExt;

use crate::{
    camera::CameraUniform,
    data_structures::{
        colour::Colour,
        instance::Instance,
        material::Material,
        model::{Mesh, MeshData},
        particles::ParticleBuffer,
        scene_graph::SceneGraph,
        texture::Texture,
        uniforms::SceneUniforms,
    },
    pipelines::{
        basic::{RenderTarget, mk_baked_pipeline, texture_bind_group, uniform_bind_group_layout},
        fireflies::FirefliesResources,
        flat::FlatResources,
        portal::PortalResources,
    },
};

/// A mesh node ready to draw: geometry, world transform and material.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawPlan<'a> {
    pub name: &'a str,
    pub mesh: &'a MeshData,
    pub transform: Instance,
    pub material: Material,
}

/// Collects every non-empty mesh that has a material, with its world transform.
///
/// Meshes nobody bound a material to are left out of the frame.
pub fn plan_draws(graph: &SceneGraph) -> Vec<DrawPlan<'_>> {
    let mut plans = Vec::new();
    graph.visit(|node, world| {
        let Some(mesh) = node.mesh.as_ref().filter(|mesh| !mesh.is_empty()) else {
            return;
        };
        match node.material {
            Some(material) => plans.push(DrawPlan {
                name: &node.name,
                mesh,
                transform: *world,
                material,
            }),
            None => log::debug!("Skipping mesh {:?}: no material bound", node.name),
        }
    });
    plans
}

/// Clamps a drawing-buffer size to what the device can allocate.
pub fn clamp_surface_size((width, height): (u32, u32), max_dimension: u32) -> (u32, u32) {
    (
        width.clamp(1, max_dimension.max(1)),
        height.clamp(1, max_dimension.max(1)),
    )
}

/// Depth and (when multisampled) colour attachments of the scene pass, sized
/// like the surface they resolve into.
#[derive(Debug)]
pub struct FrameTargets {
    target: RenderTarget,
    size: [u32; 2],
    colour: Option<Texture>,
    depth: Texture,
}

impl FrameTargets {
    pub fn new(device: &wgpu::Device, target: RenderTarget, size: [u32; 2]) -> Self {
        let colour = (target.sample_count > 1).then(|| {
            Texture::create_colour_target(device, target.format, size, target.sample_count, "msaa_colour")
        });
        Self {
            target,
            size,
            colour,
            depth: Texture::create_depth_texture(device, size, target.sample_count, "depth_texture"),
        }
    }

    pub fn target(&self) -> RenderTarget {
        self.target
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// The view to draw into and the one to resolve into, given the final output.
    fn colour_views<'a>(
        &'a self,
        output: &'a wgpu::TextureView,
    ) -> (&'a wgpu::TextureView, Option<&'a wgpu::TextureView>) {
        match &self.colour {
            Some(msaa) => (&msaa.view, Some(output)),
            None => (output, None),
        }
    }
}

enum MaterialBinding {
    Baked,
    Flat(wgpu::BindGroup),
    Portal,
}

struct DrawItem {
    mesh: Mesh,
    instance_buffer: wgpu::Buffer,
    binding: MaterialBinding,
}

impl DrawItem {
    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.num_elements, 0, 0..1);
    }
}

/// GPU side of the scene: camera, the four material pipelines and the uploaded meshes.
pub struct SceneRenderer {
    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    baked_pipeline: wgpu::RenderPipeline,
    baked_bind_group: Option<wgpu::BindGroup>,
    flat: FlatResources,
    portal: PortalResources,
    fireflies: FirefliesResources,
    items: Vec<DrawItem>,
}

impl SceneRenderer {
    pub fn new(
        device: &wgpu::Device,
        target: RenderTarget,
        particles: &ParticleBuffer,
        uniforms: &SceneUniforms,
    ) -> Self {
        let camera_bind_group_layout = uniform_bind_group_layout(
            device,
            "camera_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            baked_pipeline: mk_baked_pipeline(device, target, &camera_bind_group_layout),
            baked_bind_group: None,
            flat: FlatResources::new(device, target, &camera_bind_group_layout),
            portal: PortalResources::new(device, target, &camera_bind_group_layout, &uniforms.portal),
            fireflies: FirefliesResources::new(
                device,
                target,
                &camera_bind_group_layout,
                particles,
                &uniforms.fireflies,
            ),
            camera_buffer,
            camera_bind_group,
            items: Vec::new(),
        }
    }

    /// Uploads the baked texture and every drawable mesh of the bound graph.
    /// Replaces whatever was uploaded before.
    pub fn upload_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        graph: &SceneGraph,
        baked: &image::DynamicImage,
    ) {
        let texture = Texture::from_image(device, queue, baked, Some("baked"), true);
        self.baked_bind_group = Some(texture_bind_group(device, &texture));

        self.items = plan_draws(graph)
            .into_iter()
            .map(|plan| {
                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{:?} Instance Buffer", plan.name)),
                    contents: bytemuck::cast_slice(&[plan.transform.to_raw()]),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let binding = match plan.material {
                    Material::Baked => MaterialBinding::Baked,
                    Material::Flat(colour) => MaterialBinding::Flat(self.flat.mk_bind_group(device, colour)),
                    Material::Shader => MaterialBinding::Portal,
                };
                DrawItem {
                    mesh: Mesh::upload(device, plan.name, plan.mesh),
                    instance_buffer,
                    binding,
                }
            })
            .collect();
        log::info!("Uploaded {} meshes", self.items.len());
    }

    pub fn mesh_count(&self) -> usize {
        self.items.len()
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, camera: &CameraUniform, uniforms: &SceneUniforms) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[*camera]));
        self.portal.write(queue, &uniforms.portal);
        self.fireflies.write(queue, &uniforms.fireflies);
    }

    /// Records the scene pass into `output`: clear, opaque batches, then
    /// fireflies. Multisampled targets are resolved into `output`.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        targets: &FrameTargets,
        clear_colour: Colour,
    ) {
        let (view, resolve_target) = targets.colour_views(output);
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_colour.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        let mut baked = Vec::new();
        let mut flats = Vec::new();
        let mut portals = Vec::new();
        for item in &self.items {
            match &item.binding {
                MaterialBinding::Baked => baked.push(item),
                MaterialBinding::Flat(group) => flats.push((item, group)),
                MaterialBinding::Portal => portals.push(item),
            }
        }

        if let Some(group) = &self.baked_bind_group {
            if !baked.is_empty() {
                render_pass.set_pipeline(&self.baked_pipeline);
                render_pass.set_bind_group(1, group, &[]);
                baked.into_iter().for_each(|item| item.draw(&mut render_pass));
            }
        }

        if !flats.is_empty() {
            render_pass.set_pipeline(&self.flat.render_pipeline);
            for (item, group) in flats {
                render_pass.set_bind_group(1, group, &[]);
                item.draw(&mut render_pass);
            }
        }

        if !portals.is_empty() {
            render_pass.set_pipeline(&self.portal.render_pipeline);
            render_pass.set_bind_group(1, &self.portal.bind_group, &[]);
            portals.into_iter().for_each(|item| item.draw(&mut render_pass));
        }

        self.fireflies.draw(&mut render_pass);
    }
}

/// Copies an `Rgba8UnormSrgb` texture back to the CPU.
///
/// The texture needs `COPY_SRC` usage. Rows are padded to wgpu's copy
/// alignment on the GPU and unpadded here.
pub async fn read_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
) -> anyhow::Result<image::RgbaImage> {
    let wgpu::Extent3d { width, height, .. } = texture.size();
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::ImageCopyBuffer {
            buffer: &output_buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    queue.submit(std::iter::once(encoder.finish()));

    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    let buffer_slice = output_buffer.slice(..);
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("readback channel closed"))??;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        data.chunks(padded_bytes_per_row as usize)
            .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
            .copied()
            .collect::<Vec<u8>>()
    };
    output_buffer.unmap();

    image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow::anyhow!("readback of {width}x{height} returned too few bytes"))
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;
    use crate::data_structures::{model::ModelVertex, scene_graph::SceneNode};

    fn triangle() -> MeshData {
        let mut mesh = MeshData::default();
        mesh.append(vec![ModelVertex::default(); 3], vec![0, 1, 2]);
        mesh
    }

    #[test]
    fn surface_size_never_exceeds_the_device_limit() {
        assert_eq!(clamp_surface_size((2560, 1440), 2048), (2048, 1440));
        assert_eq!(clamp_surface_size((800, 600), 2048), (800, 600));
        assert_eq!(clamp_surface_size((0, 600), 2048), (1, 600));
    }

    #[test]
    fn only_bound_meshes_are_drawn() {
        let mut bound = SceneNode::new("baked").with_mesh(triangle());
        bound.material = Some(Material::Baked);
        let unbound = SceneNode::new("stray").with_mesh(triangle());
        let mut no_mesh = SceneNode::new("portalLight");
        no_mesh.material = Some(Material::Shader);
        let graph = SceneGraph::new("Scene", vec![bound, unbound, no_mesh]);

        let plans = plan_draws(&graph);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "baked");
    }

    #[test]
    fn plans_carry_world_transforms() {
        let mut child = SceneNode::new("poleLightA")
            .with_mesh(triangle())
            .with_transform(Instance::from(Vector3::new(0.0, 1.0, 0.0)));
        child.material = Some(Material::Flat(Colour::WHITE));
        let parent = SceneNode::new("group")
            .with_transform(Instance::from(Vector3::new(2.0, 0.0, 0.0)))
            .with_child(child);
        let graph = SceneGraph::new("Scene", vec![parent]);

        let plans = plan_draws(&graph);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].transform.position, Vector3::new(2.0, 1.0, 0.0));
    }
}
