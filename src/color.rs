//! RGB colors parsed from `#rrggbb` hex strings.
//!
//! Components are stored in linear space, which is what shaders and the
//! sRGB surface expect. Hex strings are interpreted as sRGB.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A linear-space RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub Vec3);

impl Color {
    pub const WHITE: Color = Color(Vec3::ONE);

    /// Create a color from linear components.
    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Color(Vec3::new(r, g, b))
    }

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Self::from_rgb_u32(value))
    }

    /// Build from a packed `0xRRGGBB` value.
    pub fn from_rgb_u32(value: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((value >> shift) & 0xff) as f32 / 255.0);
        Color(Vec3::new(channel(16), channel(8), channel(0)))
    }

    /// Format as `#rrggbb` in sRGB.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.0.x), byte(self.0.y), byte(self.0.z))
    }

    #[inline]
    pub fn as_vec3(&self) -> Vec3 {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("'{}' is not a #rrggbb color", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}
