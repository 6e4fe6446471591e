//! Scene configuration.

use std::path::PathBuf;

use crate::data_structures::colour::Colour;

/// Overrides the native asset directory.
pub const ASSETS_ENV: &str = "PORTAL_ASSETS";
/// Overrides the initial clear colour, as `#rrggbb`.
pub const CLEAR_COLOUR_ENV: &str = "PORTAL_CLEAR_COLOUR";

/// Everything that is a constant of the scene rather than of the code.
#[derive(Clone, Debug, PartialEq)]
pub struct PortalConfig {
    /// Native only; wasm always fetches from `<origin>/assets`.
    pub assets_root: PathBuf,
    pub baked_texture: String,
    pub model: String,
    /// Where the geometry decoder would live, relative to the asset root.
    pub decoder_path: String,

    pub window_title: String,
    pub camera_eye: [f32; 3],
    pub camera_target: [f32; 3],
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub damping_factor: f32,

    pub firefly_count: usize,
    pub firefly_point_size: f32,
    pub firefly_size_range: (f32, f32),
    pub firefly_size_step: f32,
    pub max_pixel_ratio: f32,

    pub pole_colour: Colour,
    pub clear_colour: Colour,
    pub portal_colour_start: Colour,
    pub portal_colour_end: Colour,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            assets_root: PathBuf::from("assets"),
            baked_texture: "baked.jpg".to_string(),
            model: "portal.glb".to_string(),
            decoder_path: "draco/".to_string(),

            window_title: "Portal".to_string(),
            camera_eye: [4.0, 2.0, 4.0],
            camera_target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            znear: 0.1,
            zfar: 100.0,
            damping_factor: 0.05,

            firefly_count: 30,
            firefly_point_size: 160.0,
            firefly_size_range: (0.0, 500.0),
            firefly_size_step: 0.01,
            max_pixel_ratio: 2.0,

            pole_colour: Colour::from_rgb_u32(0xffffe5),
            clear_colour: Colour::from_rgb_u32(0x201919),
            portal_colour_start: Colour::from_rgb_u32(0xcf2a2a),
            portal_colour_end: Colour::from_rgb_u32(0xf5fffe),
        }
    }
}

impl PortalConfig {
    /// Defaults, with the asset root taken from `PORTAL_ASSETS` and the clear
    /// colour from `PORTAL_CLEAR_COLOUR` when set.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup(ASSETS_ENV).filter(|root| !root.is_empty()) {
            config = config.with_assets_root(root);
        }
        if let Some(text) = lookup(CLEAR_COLOUR_ENV).filter(|text| !text.is_empty()) {
            match Colour::parse(&text) {
                Some(colour) => config = config.with_clear_colour(colour),
                None => log::warn!("Ignoring {CLEAR_COLOUR_ENV}={text:?}: expected #rrggbb"),
            }
        }
        config
    }

    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = root.into();
        self
    }

    pub fn with_clear_colour(mut self, colour: Colour) -> Self {
        self.clear_colour = colour;
        self
    }

    pub fn with_firefly_count(mut self, count: usize) -> Self {
        self.firefly_count = count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_only_the_asset_root() {
        let config = PortalConfig::from_vars(|key| (key == ASSETS_ENV).then(|| "/srv/portal".to_string()));
        assert_eq!(config.assets_root, PathBuf::from("/srv/portal"));
        assert_eq!(config.model, "portal.glb");
    }

    #[test]
    fn env_clear_colour_is_parsed_as_hex() {
        let config = PortalConfig::from_vars(|key| (key == CLEAR_COLOUR_ENV).then(|| "#0a0b0c".to_string()));
        assert_eq!(config.clear_colour, Colour::new(0x0a, 0x0b, 0x0c));
        assert_eq!(config.portal_colour_start.to_hex(), "#cf2a2a");
    }

    #[test]
    fn malformed_clear_colour_keeps_the_default() {
        let config = PortalConfig::from_vars(|key| (key == CLEAR_COLOUR_ENV).then(|| "teal".to_string()));
        assert_eq!(config.clear_colour.to_hex(), "#201919");
    }

    #[test]
    fn empty_env_value_keeps_the_default() {
        let config = PortalConfig::from_vars(|_| Some(String::new()));
        assert_eq!(config.assets_root, PathBuf::from("assets"));
    }

    #[test]
    fn defaults_match_the_scene() {
        let config = PortalConfig::default();
        assert_eq!(config.clear_colour.to_hex(), "#201919");
        assert_eq!(config.portal_colour_start.to_hex(), "#cf2a2a");
        assert_eq!(config.portal_colour_end.to_hex(), "#f5fffe");
        assert_eq!(config.firefly_count, 30);
    }
}
