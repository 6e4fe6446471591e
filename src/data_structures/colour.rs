//! sRGB colours as they appear in the debug panel and config.
//!
//! Colours are stored the way a designer types them (`#rrggbb`, sRGB encoded)
//! and converted to linear values whenever they reach the GPU. The surface is
//! an sRGB format, so a linear clear colour comes back out as the typed hex.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    pub const WHITE: Colour = Colour::from_rgb_u32(0xffffff);
    pub const BLACK: Colour = Colour::from_rgb_u32(0x000000);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xrrggbb` packed into the low 24 bits.
    pub const fn from_rgb_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Parses `#rrggbb`, `0xrrggbb` or a bare `rrggbb`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let digits = text
            .strip_prefix('#')
            .or_else(|| text.strip_prefix("0x"))
            .unwrap_or(text);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(digits, 16).ok().map(Self::from_rgb_u32)
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Linear RGB in `0.0..=1.0`, the space shaders blend in.
    pub fn to_linear(&self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }

    /// Linear, opaque colour for render pass clears.
    pub fn to_wgpu(&self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

impl From<[u8; 3]> for Colour {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

fn srgb_to_linear(channel: u8) -> f32 {
    let c = channel as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_common_hex_spellings() {
        let expected = Colour::new(0x20, 0x19, 0x19);
        assert_eq!(Colour::parse("#201919"), Some(expected));
        assert_eq!(Colour::parse("0x201919"), Some(expected));
        assert_eq!(Colour::parse("201919"), Some(expected));
        assert_eq!(Colour::parse("#CF2A2A"), Some(Colour::new(0xcf, 0x2a, 0x2a)));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert_eq!(Colour::parse("#2019"), None);
        assert_eq!(Colour::parse("#20191g"), None);
        assert_eq!(Colour::parse(""), None);
    }

    #[test]
    fn hex_output_is_lowercase_with_hash() {
        assert_eq!(Colour::from_rgb_u32(0xffffe5).to_hex(), "#ffffe5");
    }

    #[test]
    fn linear_conversion_keeps_the_endpoints() {
        assert_eq!(Colour::WHITE.to_linear(), [1.0, 1.0, 1.0]);
        assert_eq!(Colour::BLACK.to_linear(), [0.0, 0.0, 0.0]);
        let mid = Colour::new(128, 128, 128).to_linear()[0];
        assert!((mid - 0.2158).abs() < 1e-3, "{mid}");
    }
}
