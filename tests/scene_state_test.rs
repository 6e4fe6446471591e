use instant::Instant;
use portal_scene::{
    PortalConfig,
    context::SceneState,
    data_structures::particles::{MAX_HEIGHT, SPREAD},
};
use rand::{SeedableRng, rngs::StdRng};

fn scene(width: u32, height: u32, device_pixel_ratio: f32) -> SceneState {
    SceneState::new(
        &PortalConfig::default(),
        width,
        height,
        device_pixel_ratio,
        &mut StdRng::seed_from_u64(42),
    )
}

#[test]
fn should_spawn_thirty_fireflies_inside_the_volume() {
    let scene = scene(800, 600, 1.0);
    assert_eq!(scene.particles.len(), 30);
    assert_eq!(scene.particles.scales.len(), 30);

    for [x, y, z] in &scene.particles.positions {
        assert!((-SPREAD..=SPREAD).contains(x), "x out of range: {x}");
        assert!((0.0..=MAX_HEIGHT).contains(y), "y out of range: {y}");
        assert!((-SPREAD..=SPREAD).contains(z), "z out of range: {z}");
    }
    for scale in &scene.particles.scales {
        assert!((0.0..1.0).contains(scale), "scale out of range: {scale}");
    }
}

#[test]
fn should_honour_the_configured_firefly_count() {
    let config = PortalConfig::default().with_firefly_count(0);
    let scene = SceneState::new(&config, 10, 10, 1.0, &mut StdRng::seed_from_u64(0));
    assert!(scene.particles.is_empty());
}

#[test]
fn should_follow_a_resize() {
    let mut scene = scene(1024, 768, 1.0);
    assert!(scene.resize(800, 600, 1.0));

    assert_eq!(scene.viewport.size(), (800, 600));
    assert!((scene.viewport.aspect() - 800.0 / 600.0).abs() < 1e-4);
    assert_eq!(scene.uniforms.fireflies.viewport, [800.0, 600.0]);
    assert_eq!(scene.uniforms.fireflies.pixel_ratio, 1.0);
}

#[test]
fn should_cap_the_pixel_ratio_at_two() {
    let mut scene = scene(800, 600, 1.0);
    scene.resize(100, 50, 3.0);

    assert_eq!(scene.viewport.pixel_ratio(), 2.0);
    assert_eq!(scene.viewport.drawing_buffer_size(), (200, 100));
    assert_eq!(scene.uniforms.fireflies.pixel_ratio, 2.0);
    assert_eq!(scene.uniforms.fireflies.viewport, [200.0, 100.0]);
}

#[test]
fn should_be_idempotent_on_repeated_resize() {
    let mut scene = scene(800, 600, 1.0);
    scene.resize(1280, 720, 1.5);
    let viewport = scene.viewport;
    let projection = scene.projection;
    let view_proj = scene.camera_uniform.view_proj;
    let uniforms = scene.uniforms.clone();

    scene.resize(1280, 720, 1.5);

    assert_eq!(scene.viewport, viewport);
    assert_eq!(scene.projection, projection);
    assert_eq!(scene.camera_uniform.view_proj, view_proj);
    assert_eq!(scene.uniforms, uniforms);
}

#[test]
fn should_ignore_zero_sized_resizes() {
    let mut scene = scene(800, 600, 1.0);
    assert!(!scene.resize(0, 0, 1.0));
    assert_eq!(scene.viewport.size(), (800, 600));
    assert_eq!(scene.uniforms.fireflies.viewport, [800.0, 600.0]);
}

#[test]
fn should_drive_both_animated_uniforms_from_one_clock() {
    let mut scene = scene(800, 600, 1.0);
    let start = Instant::now();
    scene.clock.elapsed_at(start);

    let elapsed = scene
        .clock
        .elapsed_at(start + std::time::Duration::from_millis(2500));
    scene.advance(elapsed);

    assert!((scene.uniforms.portal.time - 2.5).abs() < 1e-5);
    assert_eq!(scene.uniforms.portal.time, scene.uniforms.fireflies.time);
}
