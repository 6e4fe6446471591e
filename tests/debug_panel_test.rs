use portal_scene::{
    PortalConfig,
    data_structures::{colour::Colour, uniforms::{FirefliesUniform, PortalUniform, SceneUniforms}},
    debug::{
        CLEAR_COLOUR, Control, DebugValue, FIREFLIES_SIZE, PORTAL_COLOUR_END, PORTAL_COLOUR_START,
        portal_panel,
    },
    error::DebugError,
};

fn uniforms(config: &PortalConfig) -> SceneUniforms {
    SceneUniforms {
        clear_colour: config.clear_colour,
        portal: PortalUniform::new(config.portal_colour_start, config.portal_colour_end),
        fireflies: FirefliesUniform::new(config.firefly_point_size, 1.0),
    }
}

#[test]
fn should_expose_the_four_scene_controls_in_order() {
    let panel = portal_panel(&PortalConfig::default());
    let names: Vec<_> = panel.fields().iter().map(|field| field.name()).collect();
    assert_eq!(
        names,
        vec![CLEAR_COLOUR, PORTAL_COLOUR_START, PORTAL_COLOUR_END, FIREFLIES_SIZE]
    );
    assert_eq!(
        panel.get(FIREFLIES_SIZE),
        Some(DebugValue::Number(160.0))
    );
    assert_eq!(
        panel.fields()[3].control(),
        Control::Slider {
            min: 0.0,
            max: 500.0,
            step: 0.01
        }
    );
}

#[test]
fn should_change_only_the_clear_colour() {
    let config = PortalConfig::default();
    let mut panel = portal_panel(&config);
    let mut target = uniforms(&config);
    let before = target.clone();

    let white = Colour::from_rgb_u32(0xffffff);
    panel
        .set(CLEAR_COLOUR, DebugValue::Colour(white), &mut target)
        .unwrap();

    assert_eq!(target.clear_colour, white);
    assert_eq!(target.portal, before.portal);
    assert_eq!(target.fireflies, before.fireflies);
    assert_eq!(panel.get(CLEAR_COLOUR), Some(DebugValue::Colour(white)));
}

#[test]
fn should_change_only_the_matching_portal_colour() {
    let config = PortalConfig::default();
    let mut panel = portal_panel(&config);
    let mut target = uniforms(&config);
    let before = target.clone();

    let black = Colour::from_rgb_u32(0x000000);
    panel
        .set(PORTAL_COLOUR_START, DebugValue::Colour(black), &mut target)
        .unwrap();

    assert_eq!(target.portal.colour_start, [0.0, 0.0, 0.0]);
    assert_eq!(target.portal.colour_end, before.portal.colour_end);
    assert_eq!(target.clear_colour, before.clear_colour);
    assert_eq!(target.fireflies, before.fireflies);
}

#[test]
fn should_clamp_the_firefly_size_to_the_slider() {
    let config = PortalConfig::default();
    let mut panel = portal_panel(&config);
    let mut target = uniforms(&config);

    let stored = panel
        .set(FIREFLIES_SIZE, DebugValue::Number(900.0), &mut target)
        .unwrap();
    assert_eq!(stored, DebugValue::Number(500.0));
    assert_eq!(target.fireflies.point_size, 500.0);

    panel
        .set(FIREFLIES_SIZE, DebugValue::Number(-3.0), &mut target)
        .unwrap();
    assert_eq!(target.fireflies.point_size, 0.0);
}

#[test]
fn should_reject_unknown_fields_and_wrong_types() {
    let config = PortalConfig::default();
    let mut panel = portal_panel(&config);
    let mut target = uniforms(&config);
    let before = target.clone();

    assert_eq!(
        panel.set("fogColor", DebugValue::Number(1.0), &mut target),
        Err(DebugError::UnknownField("fogColor".to_string()))
    );
    assert!(matches!(
        panel.set(CLEAR_COLOUR, DebugValue::Number(1.0), &mut target),
        Err(DebugError::TypeMismatch { .. })
    ));
    assert_eq!(target, before);
}
