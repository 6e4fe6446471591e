#![cfg(feature = "integration-tests")]

mod common;

use common::test_utils::portal_graph;
use portal_scene::{
    PortalConfig,
    context::SceneState,
    pipelines::basic::RenderTarget,
    render::{FrameTargets, SceneRenderer, read_rgba},
};
use rand::{SeedableRng, rngs::StdRng};

const SIZE: u32 = 64;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

async fn device() -> (wgpu::Device, wgpu::Queue, RenderTarget) {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .expect("no GPU adapter for the headless test");
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .expect("failed to request a device");
    (device, queue, RenderTarget::for_adapter(&adapter, FORMAT))
}

fn target(device: &wgpu::Device) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("test target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn render_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    renderer: &SceneRenderer,
    scene: &SceneState,
    render_target: RenderTarget,
    target: &wgpu::Texture,
) {
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let targets = FrameTargets::new(device, render_target, [SIZE, SIZE]);
    renderer.write_uniforms(queue, &scene.camera_uniform, &scene.uniforms);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    renderer.render(&mut encoder, &view, &targets, scene.uniforms.clear_colour);
    queue.submit(std::iter::once(encoder.finish()));
}

#[test]
fn should_clear_to_the_scene_colour() {
    futures::executor::block_on(async {
        let (device, queue, render_target) = device().await;
        let config = PortalConfig::default().with_firefly_count(0);
        let scene = SceneState::new(&config, SIZE, SIZE, 1.0, &mut StdRng::seed_from_u64(0));
        let renderer = SceneRenderer::new(&device, render_target, &scene.particles, &scene.uniforms);
        let target = target(&device);

        render_frame(&device, &queue, &renderer, &scene, render_target, &target);
        let image = read_rgba(&device, &queue, &target).await.unwrap();

        let [r, g, b] = config.clear_colour.to_array();
        for pixel in image.pixels() {
            let [pr, pg, pb, pa] = pixel.0;
            assert!(pr.abs_diff(r) <= 1 && pg.abs_diff(g) <= 1 && pb.abs_diff(b) <= 1);
            assert_eq!(pa, 255);
        }
    });
}

#[test]
fn should_draw_the_fireflies_before_the_model_arrives() {
    futures::executor::block_on(async {
        let (device, queue, render_target) = device().await;
        let config = PortalConfig::default();
        let scene = SceneState::new(&config, SIZE, SIZE, 1.0, &mut StdRng::seed_from_u64(9));
        let renderer = SceneRenderer::new(&device, render_target, &scene.particles, &scene.uniforms);
        let target = target(&device);

        render_frame(&device, &queue, &renderer, &scene, render_target, &target);
        let image = read_rgba(&device, &queue, &target).await.unwrap();

        let [r, g, b] = config.clear_colour.to_array();
        let lit = image
            .pixels()
            .filter(|pixel| pixel.0[0] > r.saturating_add(8) || pixel.0[1] > g.saturating_add(8) || pixel.0[2] > b.saturating_add(8))
            .count();
        assert!(lit > 0, "no firefly reached the frame");
        assert_eq!(renderer.mesh_count(), 0);
    });
}

#[test]
fn should_resolve_a_single_sampled_frame_too() {
    futures::executor::block_on(async {
        let (device, queue, _) = device().await;
        let render_target = RenderTarget::single_sampled(FORMAT);
        let config = PortalConfig::default().with_firefly_count(0);
        let scene = SceneState::new(&config, SIZE, SIZE, 1.0, &mut StdRng::seed_from_u64(0));
        let renderer = SceneRenderer::new(&device, render_target, &scene.particles, &scene.uniforms);
        let target = target(&device);

        render_frame(&device, &queue, &renderer, &scene, render_target, &target);
        let image = read_rgba(&device, &queue, &target).await.unwrap();

        let [r, g, b] = config.clear_colour.to_array();
        let pixel = image.get_pixel(SIZE / 2, SIZE / 2).0;
        assert!(pixel[0].abs_diff(r) <= 1 && pixel[1].abs_diff(g) <= 1 && pixel[2].abs_diff(b) <= 1);
    });
}

#[test]
fn should_upload_every_bound_mesh() {
    futures::executor::block_on(async {
        let (device, queue, render_target) = device().await;
        let config = PortalConfig::default();
        let mut scene = SceneState::new(&config, SIZE, SIZE, 1.0, &mut StdRng::seed_from_u64(0));
        scene.attach_scene(portal_graph()).unwrap();
        let mut renderer = SceneRenderer::new(&device, render_target, &scene.particles, &scene.uniforms);

        let baked = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
        renderer.upload_scene(&device, &queue, scene.graph.as_ref().unwrap(), &baked);
        assert_eq!(renderer.mesh_count(), 4);

        let target = target(&device);
        render_frame(&device, &queue, &renderer, &scene, render_target, &target);
        read_rgba(&device, &queue, &target).await.unwrap();
    });
}
