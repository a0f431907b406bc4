use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::FieldConfig;
use crate::debug::{CommandContext, CommandTable, DebugFolder, Tunable, TunableValue, Tunables};
use crate::error::TuneError;
use crate::field::generator::{self, FieldSample};
use crate::scene::{Blending, Geometry, Material, MaterialId, Node, NodeId, NodeKind, Scene, ShaderMaterial, ShaderProgram};
use crate::uniforms::UniformTable;
use crystalfx_derive::Tunables;

/// Samples per field unless configured otherwise.
pub const DEFAULT_COUNT: usize = 2000;

/// Point size in pixels before perspective.
const POINT_SIZE: f32 = 100.0;

/// Opacity the field is drawn at.
const OPACITY: f32 = 0.5;

/// Live shader parameters of a field, editable from the debug surface.
#[derive(Clone, Debug, PartialEq, Tunables)]
pub struct FlowTuning {
    #[tune(label = "uSpeed", min = 0.001, max = 1.0, step = 0.001)]
    pub speed: f32,
    #[tune(label = "uPerlinMultiplier", max = 5.0, step = 0.001)]
    pub noise_amplitude: f32,
    #[tune(label = "uPerlinFrequency", min = 0.001, max = 5.0, step = 0.001)]
    pub noise_frequency: f32,
    #[tune(label = "uTimeFrequency", min = 0.001, max = 5.0, step = 0.001)]
    pub time_frequency: f32,
}

impl FlowTuning {
    fn from_config(config: &FieldConfig) -> Self {
        Self {
            speed: config.speed,
            noise_amplitude: config.noise_amplitude,
            noise_frequency: config.noise_frequency,
            time_frequency: config.time_frequency,
        }
    }

    fn write(&self, uniforms: &mut UniformTable) {
        uniforms.set("uSpeed", self.speed);
        uniforms.set("uPerlinMultiplier", self.noise_amplitude);
        uniforms.set("uPerlinFrequency", self.noise_frequency);
        uniforms.set("uTimeFrequency", self.time_frequency);
    }
}

/// One energy field: a point-cloud node plus its samples.
///
/// The node's geometry always holds exactly `count` samples.
pub struct FieldInstance {
    label: String,
    config: FieldConfig,
    count: usize,
    samples: Vec<FieldSample>,
    node: NodeId,
    material: MaterialId,
    tuning: FlowTuning,
    commands: CommandTable<FieldInstance>,
}

impl FieldInstance {
    /// Sample a field from fresh entropy and add it to the scene root.
    pub fn new(scene: &mut Scene, config: FieldConfig, count: usize) -> Self {
        Self::with_rng(scene, config, count, &mut SmallRng::from_entropy())
    }

    /// Like [`FieldInstance::new`] but drawing the seed and samples from `rng`.
    pub fn with_rng<R: Rng + ?Sized>(
        scene: &mut Scene,
        config: FieldConfig,
        count: usize,
        rng: &mut R,
    ) -> Self {
        let tuning = FlowTuning::from_config(&config);

        // Declaration order is the shader's struct layout.
        let mut uniforms = UniformTable::new();
        uniforms.set("uTime", 0.0f32);
        uniforms.set("uPixelRatio", 1.0f32);
        uniforms.set("uSize", POINT_SIZE);
        uniforms.set("uSeed", rng.gen::<f32>());
        uniforms.set("uOpacity", OPACITY);
        uniforms.set("uColor", config.color);
        tuning.write(&mut uniforms);
        uniforms.set("uPointA", config.point_a);
        uniforms.set("uPointB", config.point_b);
        uniforms.set("uControlPoint1", config.control_point_1);
        uniforms.set("uControlPoint2", config.control_point_2);

        let mut shader = ShaderMaterial::new(ShaderProgram::EnergyField, uniforms);
        shader.blending = Blending::Additive;
        shader.transparent = true;
        shader.depth_write = false;
        let material = scene.add_material(Material::Shader(shader));

        let samples = generator::generate(count, rng);
        let geometry = build_geometry(&samples);
        let mut node = Node::new("EnergyField", NodeKind::Points { geometry, material });
        node.frustum_culled = false;
        let root = scene.root();
        let node = scene.add(root, node);

        Self {
            label: "Flows".to_string(),
            config,
            count,
            samples,
            node,
            material,
            tuning,
            commands: CommandTable::<FieldInstance>::new().with("reset", |field, ctx| field.reset(ctx.scene)),
        }
    }

    /// Debug folder name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Per-frame update. Writes `uTime` and nothing else.
    pub fn update(&self, scene: &mut Scene, elapsed_seconds: f32) {
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            shader.uniforms.set("uTime", elapsed_seconds);
        }
    }

    /// Regenerate from fresh entropy and swap the new geometry in.
    pub fn reset(&mut self, scene: &mut Scene) {
        self.reset_with_rng(scene, &mut SmallRng::from_entropy());
    }

    /// Regenerate from `rng`. The new geometry is installed before the old
    /// one is released.
    pub fn reset_with_rng<R: Rng + ?Sized>(&mut self, scene: &mut Scene, rng: &mut R) {
        let samples = generator::generate(self.count, rng);
        let geometry = build_geometry(&samples);
        if let Some(old) = scene.replace_geometry(self.node, geometry) {
            debug!("{}: regenerated {} samples, released {:?}", self.label, self.count, old);
        }
        self.samples = samples;
    }

    /// `min(device_pixel_ratio, 2)` is applied by the caller.
    pub fn set_pixel_ratio(&self, scene: &mut Scene, pixel_ratio: f32) {
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            shader.uniforms.set("uPixelRatio", pixel_ratio);
        }
    }

    pub fn samples(&self) -> &[FieldSample] {
        &self.samples
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn tuning(&self) -> &FlowTuning {
        &self.tuning
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }
}

impl DebugFolder for FieldInstance {
    fn folder_name(&self) -> String {
        self.label.clone()
    }

    fn tunables(&self) -> Vec<Tunable> {
        self.tuning.tunables()
    }

    fn set_tunable(&mut self, scene: &mut Scene, key: &str, value: TunableValue) -> Result<(), TuneError> {
        self.tuning.set_tunable(key, value)?;
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            self.tuning.write(&mut shader.uniforms);
        }
        Ok(())
    }

    fn command_names(&self) -> Vec<&'static str> {
        self.commands.names()
    }

    fn invoke(&mut self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), TuneError> {
        let command = self.commands.lookup(command)?;
        command(self, ctx);
        Ok(())
    }
}

fn build_geometry(samples: &[FieldSample]) -> Geometry {
    let mut positions = Vec::with_capacity(samples.len() * 3);
    let mut sizes = Vec::with_capacity(samples.len());
    let mut start_times = Vec::with_capacity(samples.len());
    for sample in samples {
        positions.extend_from_slice(&sample.position.to_array());
        sizes.push(sample.size);
        start_times.push(sample.phase_offset);
    }
    Geometry::new()
        .with_attribute("position", 3, positions)
        .with_attribute("aSize", 1, sizes)
        .with_attribute("aStartTime", 1, start_times)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Dispose;
    use glam::Vec3;

    fn field(scene: &mut Scene, count: usize) -> FieldInstance {
        FieldInstance::with_rng(scene, FieldConfig::default(), count, &mut SmallRng::seed_from_u64(9))
    }

    #[test]
    fn test_uniform_order() {
        let mut scene = Scene::new();
        let field = field(&mut scene, 10);
        let shader = scene.material(field.material()).as_shader().unwrap();
        let names: Vec<_> = shader.uniforms.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "uTime",
                "uPixelRatio",
                "uSize",
                "uSeed",
                "uOpacity",
                "uColor",
                "uSpeed",
                "uPerlinMultiplier",
                "uPerlinFrequency",
                "uTimeFrequency",
                "uPointA",
                "uPointB",
                "uControlPoint1",
                "uControlPoint2",
            ]
        );
        assert_eq!(shader.uniforms.byte_size(), 128);
        assert_eq!(shader.blending, Blending::Additive);
        assert!(!shader.depth_write);
        assert!(!scene.node(field.node()).frustum_culled);
    }

    #[test]
    fn test_update_writes_time_only() {
        let mut scene = Scene::new();
        let field = field(&mut scene, 10);
        let before = scene.material(field.material()).as_shader().unwrap().uniforms.clone();

        field.update(&mut scene, 12.5);

        let after = &scene.material(field.material()).as_shader().unwrap().uniforms;
        for ((name, a), (_, b)) in before.iter().zip(after.iter()) {
            if name == "uTime" {
                assert_eq!(b.as_f32(), Some(12.5));
            } else {
                assert_eq!(a, b, "{} changed", name);
            }
        }
    }

    #[test]
    fn test_reset_swaps_geometry() {
        let mut scene = Scene::new();
        let mut field = field(&mut scene, 300);
        let old_id = scene.node(field.node()).geometry().unwrap().id();
        let old_first = field.samples()[0];

        field.reset_with_rng(&mut scene, &mut SmallRng::seed_from_u64(10));

        let geometry = scene.node(field.node()).geometry().unwrap();
        assert_ne!(geometry.id(), old_id);
        assert!(!geometry.is_disposed());
        assert_eq!(geometry.vertex_count(), 300);
        assert_eq!(geometry.attribute("aSize").unwrap().count(), 300);
        assert_eq!(field.samples().len(), 300);
        assert_ne!(field.samples()[0], old_first);
        assert_eq!(field.config().point_b, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn test_tunable_writes_uniform() {
        let mut scene = Scene::new();
        let mut field = field(&mut scene, 1);
        field
            .set_tunable(&mut scene, "speed", TunableValue::Float(3.0))
            .unwrap();

        assert_eq!(field.tuning().speed, 1.0);
        let shader = scene.material(field.material()).as_shader().unwrap();
        assert_eq!(shader.uniforms.get_f32("uSpeed"), Some(1.0));
        assert_eq!(
            field.set_tunable(&mut scene, "uSpeed", TunableValue::Float(0.5)),
            Err(TuneError::UnknownKey("uSpeed".into()))
        );
    }

    #[test]
    fn test_reset_command() {
        let mut scene = Scene::new();
        let mut field = field(&mut scene, 5).with_label("Flows 2");
        let old_id = scene.node(field.node()).geometry().unwrap().id();
        let timeline = crate::timeline::Timeline::new();

        assert_eq!(field.folder_name(), "Flows 2");
        assert_eq!(field.command_names(), vec!["reset"]);
        let mut ctx = CommandContext {
            timeline: &timeline,
            scene: &mut scene,
        };
        field.invoke("reset", &mut ctx).unwrap();
        assert_ne!(scene.node(field.node()).geometry().unwrap().id(), old_id);
    }
}
