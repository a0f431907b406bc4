//! WGSL sources and the GPU-side uniform layouts.
//!
//! Every program is assembled from [`COMMON_WGSL`] (frame and object
//! bindings, point sprite helpers) plus its own body. The energy field also
//! pulls in [`NOISE_WGSL`].
//!
//! Bind group 0 holds [`FrameUniforms`]. Bind group 1 holds the node's
//! [`ObjectUniforms`] at binding 0 and its material table at binding 1. The
//! material structs in the WGSL bodies mirror the [`UniformTable`]s built by
//! the entities, field for field.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::color::Color;
use crate::scene::{Light, ShaderProgram, StandardMaterial};
use crate::uniforms::UniformTable;

pub const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
pub const ENERGY_FIELD_WGSL: &str = include_str!("shaders/energy_field.wgsl");
pub const PARTICLES_WGSL: &str = include_str!("shaders/particles.wgsl");
pub const MESH_WGSL: &str = include_str!("shaders/mesh.wgsl");

/// 3D simplex noise, `noise3(p) -> f32` in [-1, 1].
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.79284291400159 - 0.85373472095314 * r;
}

fn noise3(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);
    let D = vec4<f32>(0.0, 0.5, 1.0, 2.0);

    var i = floor(v + dot(v, vec3<f32>(C.y)));
    let x0 = v - i + dot(i, vec3<f32>(C.x));

    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - D.yyy;

    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    let n_ = 0.142857142857;
    let ns = n_ * D.wyz - D.xzx;

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    var m = max(0.6 - vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}
"#;

/// A render program: lit meshes or one of the point shaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    Mesh,
    Points(ShaderProgram),
}

impl Program {
    pub const ALL: [Program; 3] = [
        Program::Mesh,
        Program::Points(ShaderProgram::EnergyField),
        Program::Points(ShaderProgram::AmbientParticles),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Program::Mesh => "Mesh",
            Program::Points(ShaderProgram::EnergyField) => "Energy Field",
            Program::Points(ShaderProgram::AmbientParticles) => "Ambient Particles",
        }
    }

    /// Complete WGSL module for this program.
    pub fn source(&self) -> String {
        match self {
            Program::Mesh => format!("{}\n{}", COMMON_WGSL, MESH_WGSL),
            Program::Points(ShaderProgram::EnergyField) => {
                format!("{}\n{}\n{}", COMMON_WGSL, NOISE_WGSL, ENERGY_FIELD_WGSL)
            }
            Program::Points(ShaderProgram::AmbientParticles) => {
                format!("{}\n{}", COMMON_WGSL, PARTICLES_WGSL)
            }
        }
    }

    /// Per-vertex attributes, in buffer order.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            Program::Mesh => &["position", "normal"],
            Program::Points(program) => program.attributes(),
        }
    }
}

/// Camera state shared by every draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Physical pixels.
    pub viewport: [f32; 2],
    pub _padding: [f32; 2],
}

impl FrameUniforms {
    pub fn new(view: Mat4, projection: Mat4, width: u32, height: u32) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            viewport: [width.max(1) as f32, height.max(1) as f32],
            _padding: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
}

impl From<Mat4> for ObjectUniforms {
    fn from(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
        }
    }
}

/// Material table for a lit mesh under the scene's lights.
///
/// Ambient lights add up. The first directional light is the sun, shining
/// from its position towards the origin.
pub fn mesh_uniforms(material: &StandardMaterial, lights: &[(Light, Vec3)]) -> UniformTable {
    let mut ambient = Vec3::ZERO;
    let mut sun = None;
    for (light, position) in lights {
        match *light {
            Light::Ambient { color, intensity } => ambient += color.as_vec3() * intensity,
            Light::Directional { color, intensity, .. } if sun.is_none() => {
                sun = Some((position.normalize_or_zero(), color.as_vec3() * intensity));
            }
            Light::Directional { .. } => {}
        }
    }
    let (direction, sun_light) = sun.unwrap_or((Vec3::Y, Vec3::ZERO));

    let mut uniforms = UniformTable::new();
    uniforms.set("uColor", material.color);
    uniforms.set("uOpacity", material.opacity);
    uniforms.set("uSunDirection", direction);
    uniforms.set("uSunLight", Color(sun_light));
    uniforms.set("uAmbientLight", Color(ambient));
    uniforms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ShadowSettings;

    #[test]
    fn test_gpu_struct_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 144);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 64);
    }

    #[test]
    fn test_only_energy_field_pulls_noise() {
        assert!(Program::Points(ShaderProgram::EnergyField)
            .source()
            .contains("fn noise3"));
        assert!(!Program::Mesh.source().contains("fn noise3"));
        for program in Program::ALL {
            assert!(program.source().contains("fn quad_corner"));
        }
    }

    #[test]
    fn test_mesh_uniforms_collect_lights() {
        let lights = [
            (
                Light::Ambient {
                    color: Color::WHITE,
                    intensity: 0.8,
                },
                Vec3::ZERO,
            ),
            (
                Light::Directional {
                    color: Color::WHITE,
                    intensity: 0.6,
                    cast_shadow: true,
                    shadow: ShadowSettings {
                        map_size: 1024,
                        far: 45.0,
                        extent: 7.0,
                    },
                },
                Vec3::new(0.0, 8.0, 0.0),
            ),
        ];
        let uniforms = mesh_uniforms(&StandardMaterial::new(Color::WHITE), &lights);

        assert_eq!(uniforms.get_vec3("uSunDirection"), Some(Vec3::Y));
        assert_eq!(uniforms.get_vec3("uAmbientLight"), Some(Vec3::splat(0.8)));
        assert_eq!(uniforms.get_vec3("uSunLight"), Some(Vec3::splat(0.6)));
        assert_eq!(uniforms.byte_size(), 64);
    }
}
