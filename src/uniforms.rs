//! Named shader parameters.
//!
//! Every shader-driven entity owns a [`UniformTable`]: an ordered list of
//! named values that mirrors the WGSL uniform struct of its shader. Order is
//! the declaration order, so the byte layout produced by
//! [`UniformTable::to_bytes`] lines up with the struct field by field.
//!
//! # Example
//!
//! ```ignore
//! let mut uniforms = UniformTable::new();
//! uniforms.set("uTime", 0.0f32);
//! uniforms.set("uColor", Color::from_hex("#73332c").unwrap());
//!
//! // Per frame: updating an existing entry does not allocate.
//! uniforms.set("uTime", elapsed_seconds);
//! ```

use glam::{Vec2, Vec3, Vec4};
use std::collections::HashMap;

use crate::color::Color;

/// A value a material table can hold. Colors are stored as `Vec3`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    F32(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    pub fn wgsl_type(&self) -> &'static str {
        match self {
            UniformValue::F32(_) => "f32",
            UniformValue::Vec2(_) => "vec2<f32>",
            UniformValue::Vec3(_) => "vec3<f32>",
            UniformValue::Vec4(_) => "vec4<f32>",
        }
    }

    /// Bytes written, excluding any padding before the next member.
    pub fn byte_size(&self) -> usize {
        self.components().len() * 4
    }

    /// WGSL uniform-address-space alignment.
    pub fn alignment(&self) -> usize {
        match self {
            UniformValue::F32(_) => 4,
            UniformValue::Vec2(_) => 8,
            UniformValue::Vec3(_) | UniformValue::Vec4(_) => 16,
        }
    }

    /// Append the value's components. A vec3 leaves its 4-byte tail for the
    /// next scalar.
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(bytemuck::cast_slice(&self.components()));
    }

    fn components(&self) -> Vec<f32> {
        match *self {
            UniformValue::F32(v) => vec![v],
            UniformValue::Vec2(v) => v.to_array().to_vec(),
            UniformValue::Vec3(v) => v.to_array().to_vec(),
            UniformValue::Vec4(v) => v.to_array().to_vec(),
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            UniformValue::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            UniformValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::F32(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        UniformValue::Vec3(c.as_vec3())
    }
}

/// Ordered collection of named uniform values.
#[derive(Clone, Debug, Default)]
pub struct UniformTable {
    /// In struct member order.
    values: Vec<(String, UniformValue)>,
    slots: HashMap<String, usize>,
}

impl UniformTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a uniform value.
    ///
    /// Updating an existing name keeps its position and does not allocate.
    pub fn set<V: Into<UniformValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.slots.get(name) {
            Some(&slot) => self.values[slot].1 = value,
            None => {
                self.slots.insert(name.to_string(), self.values.len());
                self.values.push((name.to_string(), value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.slots.get(name).map(|&slot| &self.values[slot].1)
    }

    /// Shorthand for a scalar uniform.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(UniformValue::as_f32)
    }

    /// Shorthand for a vector/color uniform.
    pub fn get_vec3(&self, name: &str) -> Option<Vec3> {
        self.get(name).and_then(UniformValue::as_vec3)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate over all uniforms in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// WGSL struct fields matching this table, one per line.
    pub fn to_wgsl_fields(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!("    {}: {},", name, value.wgsl_type()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Serialize all values to bytes for GPU upload, padded to 16 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.values.len() * 16);
        for (_, value) in &self.values {
            let align = value.alignment();
            while buf.len() % align != 0 {
                buf.push(0);
            }
            value.write_bytes(&mut buf);
        }
        buf.resize((buf.len() + 15) & !15, 0);
        buf
    }

    /// Total byte size with alignment.
    pub fn byte_size(&self) -> usize {
        self.to_bytes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_declaration_order() {
        let mut table = UniformTable::new();
        table.set("uTime", 0.0f32);
        table.set("uColor", Vec3::ONE);
        table.set("uTime", 2.5f32);

        let names: Vec<_> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["uTime", "uColor"]);
        assert_eq!(table.get_f32("uTime"), Some(2.5));
        assert_eq!(table.get_vec3("uTime"), None);
    }

    #[test]
    fn test_scalar_packs_after_vec3() {
        let mut table = UniformTable::new();
        table.set("uOpacity", 1.0f32);
        table.set("uColor", Vec3::new(0.1, 0.2, 0.3));
        table.set("uTime", 3.0f32);

        let bytes = table.to_bytes();
        // uOpacity @0, uColor @16, uTime @28, padded to 32
        assert_eq!(bytes.len(), 32);
        let time = f32::from_le_bytes(bytes[28..32].try_into().unwrap());
        assert_eq!(time, 3.0);
        let green = f32::from_le_bytes(bytes[20..24].try_into().unwrap());
        assert_eq!(green, 0.2);
    }

    #[test]
    fn test_wgsl_fields() {
        let mut table = UniformTable::new();
        table.set("uSize", 100.0f32);
        table.set("uPointA", Vec3::ZERO);
        assert_eq!(
            table.to_wgsl_fields(),
            "    uSize: f32,\n    uPointA: vec3<f32>,"
        );
    }
}
