//! Minimal scene graph.
//!
//! The scene is an arena of [`Node`]s rooted at [`Scene::root`]. Nodes hold a
//! local [`Transform`], optional renderable payload (mesh or point cloud with
//! their [`Geometry`]) or a [`Light`]. Materials live in a separate arena so
//! several meshes of one model can share one material, which is what the
//! crystal's opacity tween relies on.
//!
//! Geometry is owned by its node. Every geometry gets a fresh [`GeometryId`]
//! when built, so renderers can tell when a node's buffer was swapped.
//!
//! Resource release goes through the [`Dispose`] trait and is idempotent.

use glam::{EulerRot, Mat4, Quat, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::color::Color;
use crate::uniforms::UniformTable;

/// Release of GPU-side or otherwise scarce state.
pub trait Dispose {
    /// Release the resource. Returns `true` if this call released it and
    /// `false` if it was already released.
    fn dispose(&mut self) -> bool;

    fn is_disposed(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// Local position, Euler rotation (XYZ, radians) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// A named per-vertex (or per-point) attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Components per item (3 for positions, 1 for scalars).
    pub item_size: usize,
    pub data: Vec<f32>,
}

impl Attribute {
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

/// Vertex data for a mesh or point cloud.
#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    attributes: Vec<Attribute>,
    indices: Option<Vec<u32>>,
    disposed: bool,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            id: GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed)),
            attributes: Vec::new(),
            indices: None,
            disposed: false,
        }
    }

    /// Add (or replace) an attribute.
    pub fn with_attribute(mut self, name: &str, item_size: usize, data: Vec<f32>) -> Self {
        self.attributes.retain(|a| a.name != name);
        self.attributes.push(Attribute {
            name: name.to_string(),
            item_size,
            data,
        });
        self
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    #[inline]
    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Number of items in the `position` attribute.
    pub fn vertex_count(&self) -> usize {
        self.attribute("position").map_or(0, Attribute::count)
    }

    /// Interleave the named attributes item by item.
    ///
    /// Returns `None` if an attribute is missing or the counts disagree.
    pub fn interleave(&self, names: &[&str]) -> Option<Vec<f32>> {
        let attributes = names
            .iter()
            .map(|name| self.attribute(name))
            .collect::<Option<Vec<_>>>()?;
        let count = attributes.first()?.count();
        if attributes.iter().any(|a| a.count() != count) {
            return None;
        }

        let stride: usize = attributes.iter().map(|a| a.item_size).sum();
        let mut out = Vec::with_capacity(count * stride);
        for i in 0..count {
            for attribute in &attributes {
                let n = attribute.item_size;
                out.extend_from_slice(&attribute.data[i * n..(i + 1) * n]);
            }
        }
        Some(out)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispose for Geometry {
    fn dispose(&mut self) -> bool {
        let released = !self.disposed;
        self.disposed = true;
        released
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// An image resource referenced by a material.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    disposed: bool,
}

impl Texture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            disposed: false,
        }
    }
}

impl Dispose for Texture {
    fn dispose(&mut self) -> bool {
        let released = !self.disposed;
        self.disposed = true;
        released
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

/// How fragments combine with what is already drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Blending {
    #[default]
    Normal,
    Additive,
}

/// Which shader a [`ShaderMaterial`] runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderProgram {
    /// Curve-following energy field points.
    EnergyField,
    /// Floating ambient particles.
    AmbientParticles,
}

impl ShaderProgram {
    /// Per-point attributes the shader reads, in vertex-buffer order.
    pub fn attributes(&self) -> &'static [&'static str] {
        match self {
            ShaderProgram::EnergyField => &["position", "aSize", "aStartTime"],
            ShaderProgram::AmbientParticles => &["position", "aScale"],
        }
    }
}

/// Lit surface material.
#[derive(Clone, Debug)]
pub struct StandardMaterial {
    pub color: Color,
    pub opacity: f32,
    pub transparent: bool,
    /// Optional color texture.
    pub map: Option<Texture>,
    disposed: bool,
}

impl StandardMaterial {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
            map: None,
            disposed: false,
        }
    }
}

/// Material whose look is computed by a custom shader from its uniforms.
#[derive(Clone, Debug)]
pub struct ShaderMaterial {
    pub program: ShaderProgram,
    pub uniforms: UniformTable,
    pub blending: Blending,
    pub transparent: bool,
    pub depth_write: bool,
    disposed: bool,
}

impl ShaderMaterial {
    pub fn new(program: ShaderProgram, uniforms: UniformTable) -> Self {
        Self {
            program,
            uniforms,
            blending: Blending::Normal,
            transparent: false,
            depth_write: true,
            disposed: false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Material {
    Standard(StandardMaterial),
    Shader(ShaderMaterial),
}

impl Material {
    /// Opacity of a standard material or the `uOpacity` uniform of a shader.
    pub fn opacity(&self) -> f32 {
        match self {
            Material::Standard(m) => m.opacity,
            Material::Shader(m) => m.uniforms.get_f32("uOpacity").unwrap_or(1.0),
        }
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        match self {
            Material::Standard(m) => m.opacity = opacity,
            Material::Shader(m) => m.uniforms.set("uOpacity", opacity),
        }
    }

    pub fn as_shader(&self) -> Option<&ShaderMaterial> {
        match self {
            Material::Shader(m) => Some(m),
            Material::Standard(_) => None,
        }
    }

    pub fn as_shader_mut(&mut self) -> Option<&mut ShaderMaterial> {
        match self {
            Material::Shader(m) => Some(m),
            Material::Standard(_) => None,
        }
    }

    pub fn as_standard_mut(&mut self) -> Option<&mut StandardMaterial> {
        match self {
            Material::Standard(m) => Some(m),
            Material::Shader(_) => None,
        }
    }

    /// Properties that hold releasable state. Scalars, colors and uniform
    /// values have none and are not listed.
    fn disposable_properties(&mut self) -> Vec<&mut dyn Dispose> {
        match self {
            Material::Standard(m) => m.map.iter_mut().map(|t| t as &mut dyn Dispose).collect(),
            Material::Shader(_) => Vec::new(),
        }
    }

    /// Release every disposable property and then the material itself.
    ///
    /// Returns how many resources this call released.
    pub fn dispose_all(&mut self) -> usize {
        let mut released = self
            .disposable_properties()
            .into_iter()
            .filter_map(|p| p.dispose().then_some(()))
            .count();
        if self.dispose() {
            released += 1;
        }
        released
    }
}

impl Dispose for Material {
    fn dispose(&mut self) -> bool {
        let flag = match self {
            Material::Standard(m) => &mut m.disposed,
            Material::Shader(m) => &mut m.disposed,
        };
        let released = !*flag;
        *flag = true;
        released
    }

    fn is_disposed(&self) -> bool {
        match self {
            Material::Standard(m) => m.disposed,
            Material::Shader(m) => m.disposed,
        }
    }
}

/// Shadow camera settings of a directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub far: f32,
    /// Half extent of the orthographic shadow frustum.
    pub extent: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        cast_shadow: bool,
        shadow: ShadowSettings,
    },
}

#[derive(Debug)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: Geometry,
        material: MaterialId,
    },
    Points {
        geometry: Geometry,
        material: MaterialId,
    },
    Light(Light),
}

#[derive(Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Points with curve-driven motion leave their bounds; don't cull them.
    pub frustum_culled: bool,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::default(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            frustum_culled: true,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: &str) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            NodeKind::Mesh { geometry, .. } | NodeKind::Points { geometry, .. } => Some(geometry),
            _ => None,
        }
    }

    pub fn material(&self) -> Option<MaterialId> {
        match &self.kind {
            NodeKind::Mesh { material, .. } | NodeKind::Points { material, .. } => Some(*material),
            _ => None,
        }
    }

    /// Meshes and point clouds.
    pub fn is_renderable(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. } | NodeKind::Points { .. })
    }
}

/// What a full resource release touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisposeReport {
    pub renderables_visited: usize,
    pub geometries_released: usize,
    pub material_resources_released: usize,
}

/// A renderable node with its accumulated world matrix.
#[derive(Clone, Copy, Debug)]
pub struct Renderable {
    pub node: NodeId,
    pub world: Mat4,
}

#[derive(Debug)]
pub struct Scene {
    nodes: Vec<Node>,
    materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::group("Scene")],
            materials: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Attach `node` under `parent`.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn material_mut(&mut self, id: MaterialId) -> &mut Material {
        &mut self.materials[id.0]
    }

    /// First node named `name` below (and including) `from`, depth first.
    pub fn find_in(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|&id| self.nodes[id.0].name == name)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.find_in(self.root(), name)
    }

    /// `from` and everything below it, depth first, each node once.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev());
        }
        out
    }

    /// Visit `from` and its subtree, depth first.
    pub fn traverse<F: FnMut(NodeId, &Node)>(&self, from: NodeId, mut visit: F) {
        for id in self.descendants(from) {
            visit(id, &self.nodes[id.0]);
        }
    }

    /// Accumulated transform from the root to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = self.nodes[id.0].transform.matrix();
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            matrix = self.nodes[parent.0].transform.matrix() * matrix;
            current = self.nodes[parent.0].parent;
        }
        matrix
    }

    /// Visible meshes and point clouds with world matrices. A hidden node
    /// hides its subtree.
    pub fn renderables(&self) -> Vec<Renderable> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root(), Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.0];
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.matrix();
            if node.is_renderable() {
                out.push(Renderable { node: id, world });
            }
            stack.extend(node.children.iter().rev().map(|&c| (c, world)));
        }
        out
    }

    /// All lights with their world-space positions.
    pub fn lights(&self) -> Vec<(Light, Vec3)> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(|id| match &self.nodes[id.0].kind {
                NodeKind::Light(light) => {
                    Some((*light, self.world_matrix(id).w_axis.truncate()))
                }
                _ => None,
            })
            .collect()
    }

    /// Install `geometry` on a mesh/points node, then release the one it
    /// replaced. Returns the id of the released geometry.
    pub fn replace_geometry(&mut self, id: NodeId, geometry: Geometry) -> Option<GeometryId> {
        let slot = match &mut self.nodes[id.0].kind {
            NodeKind::Mesh { geometry, .. } | NodeKind::Points { geometry, .. } => geometry,
            _ => return None,
        };
        let mut old = std::mem::replace(slot, geometry);
        old.dispose();
        Some(old.id())
    }

    /// Release the geometry and every disposable material resource of each
    /// renderable node. Each node is visited once; shared or already
    /// released resources are skipped, so calling this twice is harmless.
    pub fn release_resources(&mut self) -> DisposeReport {
        let mut report = DisposeReport::default();
        for id in self.descendants(self.root()) {
            let material = match &mut self.nodes[id.0].kind {
                NodeKind::Mesh { geometry, material } | NodeKind::Points { geometry, material } => {
                    report.renderables_visited += 1;
                    if geometry.dispose() {
                        report.geometries_released += 1;
                    }
                    *material
                }
                _ => continue,
            };
            report.material_resources_released += self.materials[material.0].dispose_all();
        }
        report
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
