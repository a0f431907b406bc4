//! Asset loading and the one-shot ready signal.
//!
//! [`Resources`] is built with a list of [`AssetSource`]s. Each call to
//! [`Resources::poll`] loads one pending source, so loading spreads across
//! frames. Once the last source has loaded, [`Resources::on_ready`] fires
//! exactly once and the loaded items are available by key.
//!
//! The default source set has a single entry: a procedurally built crystal
//! model under the key [`CRYSTAL_MODEL`].

use glam::Vec3;
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;

use crate::animation::{AnimationClip, KeyframeTrack, TrackTarget};
use crate::color::Color;
use crate::error::AssetError;
use crate::scene::{Geometry, Material, MaterialId, Node, NodeId, NodeKind, Scene, StandardMaterial, Transform};
use crate::signal::Signal;

/// Key of the animated crystal model.
pub const CRYSTAL_MODEL: &str = "crystalModel";

/// A mesh inside a [`ModelAsset`], stored as plain vertex data.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelMesh {
    pub name: String,
    pub transform: Transform,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
}

/// An animated model: meshes sharing one material, plus clips that target
/// the meshes by name.
#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub name: String,
    pub meshes: Vec<ModelMesh>,
    pub material: StandardMaterial,
    pub clips: Vec<AnimationClip>,
}

/// Nodes created by [`ModelAsset::instantiate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelInstance {
    pub root: NodeId,
    /// The material all of the model's meshes share.
    pub material: MaterialId,
}

impl ModelAsset {
    /// Add a fresh copy of the model under `parent`.
    ///
    /// Every mesh casts and receives shadows and uses one shared material.
    pub fn instantiate(&self, scene: &mut Scene, parent: NodeId) -> Result<ModelInstance, AssetError> {
        if self.meshes.is_empty() {
            return Err(AssetError::NoMesh(self.name.clone()));
        }

        let material = scene.add_material(Material::Standard(self.material.clone()));
        let root = scene.add(parent, Node::group(&self.name));
        for mesh in &self.meshes {
            let geometry = Geometry::new()
                .with_attribute("position", 3, mesh.positions.clone())
                .with_attribute("normal", 3, mesh.normals.clone());
            let mut node = Node::new(&mesh.name, NodeKind::Mesh { geometry, material });
            node.transform = mesh.transform;
            node.cast_shadow = true;
            node.receive_shadow = true;
            scene.add(root, node);
        }
        Ok(ModelInstance { root, material })
    }
}

/// A loaded item.
#[derive(Clone, Debug)]
pub enum Asset {
    Model(ModelAsset),
}

/// Something that can produce an [`Asset`].
pub trait AssetSource {
    /// Key the loaded asset is stored under.
    fn name(&self) -> &str;

    fn load(&self) -> Result<Asset, AssetError>;
}

/// Tracks pending sources and loaded items.
pub struct Resources {
    pending: VecDeque<Box<dyn AssetSource>>,
    items: HashMap<String, Asset>,
    total: usize,
    ready: bool,
    /// Fires once, after the last source has loaded.
    pub on_ready: Signal<()>,
}

impl Resources {
    pub fn new(sources: Vec<Box<dyn AssetSource>>) -> Self {
        Self {
            total: sources.len(),
            pending: sources.into(),
            items: HashMap::new(),
            ready: false,
            on_ready: Signal::new(),
        }
    }

    /// The crystal model and nothing else.
    pub fn with_default_sources() -> Self {
        Self::new(vec![Box::new(ProceduralCrystal::default())])
    }

    /// Load the next pending source. Returns whether everything is loaded.
    ///
    /// A failing source stays pending so the error can be reported; loading
    /// does not retry on its own.
    pub fn poll(&mut self) -> Result<bool, AssetError> {
        if self.ready {
            return Ok(true);
        }

        if let Some(source) = self.pending.front() {
            let name = source.name().to_string();
            let asset = source.load()?;
            self.pending.pop_front();
            debug!("Loaded '{}' ({}/{})", name, self.loaded(), self.total);
            self.items.insert(name, asset);
        }

        if self.pending.is_empty() {
            self.ready = true;
            info!("All {} resource(s) loaded", self.total);
            self.on_ready.emit(());
        }
        Ok(self.ready)
    }

    /// Poll until ready.
    pub fn load_all(&mut self) -> Result<(), AssetError> {
        while !self.poll()? {}
        Ok(())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Sources loaded so far.
    pub fn loaded(&self) -> usize {
        self.items.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn item(&self, key: &str) -> Result<&Asset, AssetError> {
        self.items
            .get(key)
            .ok_or_else(|| AssetError::MissingItem(key.to_string()))
    }

    pub fn model(&self, key: &str) -> Result<&ModelAsset, AssetError> {
        match self.item(key)? {
            Asset::Model(model) => Ok(model),
        }
    }
}

/// Crystal built from geometry in code: a hexagonal bipyramid core and three
/// small rock shards, each shard with its own orbit clip.
#[derive(Clone, Debug)]
pub struct ProceduralCrystal {
    /// Clips to build; the crystal needs at least three.
    pub clip_count: usize,
}

impl Default for ProceduralCrystal {
    fn default() -> Self {
        Self { clip_count: 3 }
    }
}

impl AssetSource for ProceduralCrystal {
    fn name(&self) -> &str {
        CRYSTAL_MODEL
    }

    fn load(&self) -> Result<Asset, AssetError> {
        let mut meshes = vec![faceted_mesh("Core", bipyramid(6, 0.55, 1.3), Transform::default())];
        let mut clips = Vec::with_capacity(self.clip_count);

        for i in 0..self.clip_count {
            let name = format!("SmallRock{}", i + 1);
            let orbit = RockOrbit::nth(i);
            meshes.push(faceted_mesh(
                &name,
                bipyramid(4, 0.12, 0.18),
                Transform::from_position(orbit.position_at(0.0)),
            ));
            clips.push(orbit.clip(&name));
        }

        let mut material = StandardMaterial::new(Color::from_rgb_u32(0x9b3d33));
        material.transparent = true;

        Ok(Asset::Model(ModelAsset {
            name: "Crystal".to_string(),
            meshes,
            material,
            clips,
        }))
    }
}

/// Triangles of a bipyramid with `sides` equator vertices.
fn bipyramid(sides: usize, radius: f32, half_height: f32) -> Vec<[Vec3; 3]> {
    let top = Vec3::new(0.0, half_height, 0.0);
    let bottom = -top;
    let ring: Vec<Vec3> = (0..sides)
        .map(|i| {
            let angle = TAU * i as f32 / sides as f32;
            Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
        })
        .collect();

    let mut triangles = Vec::with_capacity(sides * 2);
    for i in 0..sides {
        let a = ring[i];
        let b = ring[(i + 1) % sides];
        triangles.push([top, b, a]);
        triangles.push([bottom, a, b]);
    }
    triangles
}

/// Non-indexed mesh with flat per-face normals.
fn faceted_mesh(name: &str, triangles: Vec<[Vec3; 3]>, transform: Transform) -> ModelMesh {
    let mut positions = Vec::with_capacity(triangles.len() * 9);
    let mut normals = Vec::with_capacity(triangles.len() * 9);
    for [a, b, c] in triangles {
        let normal = (b - a).cross(c - a).normalize_or_zero();
        for v in [a, b, c] {
            positions.extend_from_slice(&v.to_array());
            normals.extend_from_slice(&normal.to_array());
        }
    }
    ModelMesh {
        name: name.to_string(),
        transform,
        positions,
        normals,
    }
}

/// A tilted circular orbit around the core.
struct RockOrbit {
    radius: f32,
    height: f32,
    tilt: f32,
    phase: f32,
    period: f32,
}

impl RockOrbit {
    const KEYS: usize = 16;

    fn nth(i: usize) -> Self {
        let i = i as f32;
        Self {
            radius: 1.1 + 0.2 * i,
            height: 0.4 - 0.4 * i,
            tilt: 0.25 * (i - 1.0),
            phase: i * TAU / 3.0,
            period: 6.0 + 2.0 * i,
        }
    }

    fn position_at(&self, t: f32) -> Vec3 {
        let angle = self.phase + TAU * t / self.period;
        let (s, c) = angle.sin_cos();
        Vec3::new(c * self.radius, self.height + s * self.radius * self.tilt, s * self.radius)
    }

    fn clip(&self, node: &str) -> AnimationClip {
        let times: Vec<f32> = (0..=Self::KEYS)
            .map(|k| self.period * k as f32 / Self::KEYS as f32)
            .collect();
        let positions = times.iter().map(|&t| self.position_at(t)).collect();
        let rotations = times
            .iter()
            .map(|&t| Vec3::new(0.5, TAU * 2.0 * t / self.period, 0.3))
            .collect();
        AnimationClip::new(
            node,
            vec![
                KeyframeTrack::new(node, TrackTarget::Position, times.clone(), positions),
                KeyframeTrack::new(node, TrackTarget::Rotation, times, rotations),
            ],
        )
    }
}
