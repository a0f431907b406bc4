//! Ambient particles floating above the crystal.
//!
//! A static point cloud sampled once in a 3 x 5 x 3 box. Only the shader's
//! `uTime` and `uOpacity` change after construction.

use log::debug;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::color::Color;
use crate::config::ParticlesOptions;
use crate::debug::{CommandContext, CommandTable, DebugFolder, Tunable, TunableValue, Tunables};
use crate::entity::{log_transition, RevealState, Revealable, Track};
use crate::error::TuneError;
use crate::scene::{Blending, Geometry, Material, MaterialId, Node, NodeId, NodeKind, Scene, ShaderMaterial, ShaderProgram};
use crate::time::Tick;
use crate::timeline::Timeline;
use crate::tween::Tween;
use crate::uniforms::UniformTable;
use crystalfx_derive::Tunables;

/// Box the particles are sampled in, centred at y = 8 in node space.
const EXTENT_X: f32 = 3.0;
const EXTENT_Y: f32 = 5.0;
const EXTENT_Z: f32 = 3.0;
const CENTER_Y: f32 = 8.0;
/// Node offset, putting the cloud's centre at y = 3.
const NODE_Y: f32 = -5.0;

const REVEAL_DELAY: f32 = 3.0;
const FADE_DURATION: f32 = 2.0;

/// Debug-editable look of the particles.
#[derive(Clone, Debug, PartialEq, Tunables)]
pub struct ParticlesTuning {
    #[tune(label = "Color")]
    pub color: Color,
    #[tune(label = "Opacity", min = 0.0, max = 1.0)]
    pub opacity: f32,
}

pub struct AmbientParticles {
    node: NodeId,
    material: MaterialId,
    state: RevealState,
    opacity: f32,
    opacity_track: Track<f32>,
    color: Color,
    commands: CommandTable<AmbientParticles>,
}

impl AmbientParticles {
    pub fn new(scene: &mut Scene, options: &ParticlesOptions) -> Self {
        Self::with_rng(scene, options, &mut SmallRng::from_entropy())
    }

    pub fn with_rng<R: Rng + ?Sized>(scene: &mut Scene, options: &ParticlesOptions, rng: &mut R) -> Self {
        let mut positions = Vec::with_capacity(options.count * 3);
        let mut scales = Vec::with_capacity(options.count);
        for _ in 0..options.count {
            positions.push((rng.gen::<f32>() - 0.5) * EXTENT_X);
            positions.push((rng.gen::<f32>() - 0.5) * EXTENT_Y + CENTER_Y);
            positions.push((rng.gen::<f32>() - 0.5) * EXTENT_Z);
            scales.push(rng.gen::<f32>());
        }
        let geometry = Geometry::new()
            .with_attribute("position", 3, positions)
            .with_attribute("aScale", 1, scales);

        let mut uniforms = UniformTable::new();
        uniforms.set("uOpacity", options.opacity);
        uniforms.set("uColor", options.color);
        uniforms.set("uTime", 0.0f32);
        uniforms.set("uPixelRatio", 1.0f32);
        uniforms.set("uSize", options.size);

        let mut shader = ShaderMaterial::new(ShaderProgram::AmbientParticles, uniforms);
        shader.transparent = true;
        shader.blending = Blending::Additive;
        shader.depth_write = false;
        let material = scene.add_material(Material::Shader(shader));

        let root = scene.root();
        let mut node = Node::new("AmbientParticles", NodeKind::Points { geometry, material });
        node.transform.position.y = NODE_Y;
        let node = scene.add(root, node);

        Self {
            node,
            material,
            state: RevealState::NotRevealed,
            opacity: options.opacity,
            opacity_track: Track::new(),
            color: options.color,
            commands: CommandTable::<AmbientParticles>::new()
                .with("reveal", |particles, ctx| particles.reveal_animation(ctx.timeline))
                .with("hide", |particles, ctx| particles.hide_animation(ctx.timeline)),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Opacity written on the last update.
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_pixel_ratio(&self, scene: &mut Scene, pixel_ratio: f32) {
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            shader.uniforms.set("uPixelRatio", pixel_ratio);
        }
    }

    fn tuning(&self) -> ParticlesTuning {
        ParticlesTuning {
            color: self.color,
            opacity: self.opacity,
        }
    }
}

impl Revealable for AmbientParticles {
    fn name(&self) -> &'static str {
        "particles"
    }

    /// Fade in after a delay.
    fn reveal_animation(&mut self, timeline: &Timeline) {
        self.opacity_track.start(
            Tween::new(self.opacity, 1.0, FADE_DURATION)
                .starting_at(timeline.time())
                .with_delay(REVEAL_DELAY),
        );
        let next = self.state.on_reveal();
        log_transition(self.name(), self.state, next);
        self.state = next;
        debug!("Particles reveal at {:.3}s", timeline.time());
    }

    fn hide_animation(&mut self, timeline: &Timeline) {
        self.opacity_track.start(
            Tween::new(self.opacity, 0.0, FADE_DURATION).starting_at(timeline.time()),
        );
        let next = self.state.on_hide();
        log_transition(self.name(), self.state, next);
        self.state = next;
        debug!("Particles hide at {:.3}s", timeline.time());
    }

    fn update(&mut self, scene: &mut Scene, timeline: &Timeline, tick: &Tick) {
        let time = timeline.time();
        if let Some(opacity) = self.opacity_track.sample(time) {
            self.opacity = opacity;
        }
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            shader.uniforms.set("uOpacity", self.opacity);
            shader.uniforms.set("uTime", tick.seconds());
        }

        let finished = self.state.is_transitioning() && self.opacity_track.is_complete(time);
        let next = self.state.settle(finished);
        log_transition(self.name(), self.state, next);
        self.state = next;
    }

    fn reveal_state(&self) -> RevealState {
        self.state
    }

    fn as_debug(&self) -> &dyn DebugFolder {
        self
    }

    fn as_debug_mut(&mut self) -> &mut dyn DebugFolder {
        self
    }
}

impl DebugFolder for AmbientParticles {
    fn folder_name(&self) -> String {
        "Particles".to_string()
    }

    fn tunables(&self) -> Vec<Tunable> {
        self.tuning().tunables()
    }

    /// A manual opacity edit stops any running fade.
    fn set_tunable(&mut self, scene: &mut Scene, key: &str, value: TunableValue) -> Result<(), TuneError> {
        let mut tuning = self.tuning();
        tuning.set_tunable(key, value)?;
        if tuning.opacity != self.opacity {
            self.opacity_track.clear();
        }
        self.color = tuning.color;
        self.opacity = tuning.opacity;
        if let Some(shader) = scene.material_mut(self.material).as_shader_mut() {
            shader.uniforms.set("uColor", self.color);
            shader.uniforms.set("uOpacity", self.opacity);
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

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn setup() -> (Scene, AmbientParticles) {
        let mut scene = Scene::new();
        let particles =
            AmbientParticles::with_rng(&mut scene, &ParticlesOptions::default(), &mut SmallRng::seed_from_u64(5));
        (scene, particles)
    }

    fn step(particles: &mut AmbientParticles, scene: &mut Scene, timeline: &mut Timeline, seconds: f32) {
        timeline.seek(seconds);
        let tick = Tick {
            elapsed_ms: seconds * 1000.0,
            delta_ms: 16.0,
            frame: 0,
        };
        particles.update(scene, timeline, &tick);
    }

    fn uniform_opacity(scene: &Scene, particles: &AmbientParticles) -> f32 {
        scene.material(particles.material()).opacity()
    }

    #[test]
    fn test_sampled_in_box() {
        let (scene, particles) = setup();
        let node = scene.node(particles.node());
        assert_eq!(node.transform.position, Vec3::new(0.0, NODE_Y, 0.0));

        let geometry = node.geometry().unwrap();
        assert_eq!(geometry.vertex_count(), 200);
        let positions = &geometry.attribute("position").unwrap().data;
        for p in positions.chunks(3) {
            assert!(p[0].abs() <= 1.5);
            assert!((5.5..=10.5).contains(&p[1]));
            assert!(p[2].abs() <= 1.5);
        }
        for s in &geometry.attribute("aScale").unwrap().data {
            assert!((0.0..1.0).contains(s));
        }
    }

    #[test]
    fn test_uniform_layout() {
        let (scene, particles) = setup();
        let shader = scene.material(particles.material()).as_shader().unwrap();
        let names: Vec<_> = shader.uniforms.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["uOpacity", "uColor", "uTime", "uPixelRatio", "uSize"]);
        assert_eq!(shader.uniforms.byte_size(), 48);
    }

    #[test]
    fn test_reveal_waits_for_delay() {
        let (mut scene, mut particles) = setup();
        let mut timeline = Timeline::new();
        particles.hide_animation(&timeline);
        step(&mut particles, &mut scene, &mut timeline, 2.0);
        assert_eq!(uniform_opacity(&scene, &particles), 0.0);
        assert_eq!(particles.reveal_state(), RevealState::Hidden);

        particles.reveal_animation(&timeline);
        step(&mut particles, &mut scene, &mut timeline, 4.9);
        assert_eq!(uniform_opacity(&scene, &particles), 0.0);
        step(&mut particles, &mut scene, &mut timeline, 6.0);
        // power1.out at half way is 0.75
        assert!((uniform_opacity(&scene, &particles) - 0.75).abs() < 1e-5);
        assert_eq!(particles.reveal_state(), RevealState::Revealing);
        step(&mut particles, &mut scene, &mut timeline, 7.0);
        assert_eq!(uniform_opacity(&scene, &particles), 1.0);
        assert_eq!(particles.reveal_state(), RevealState::Revealed);
    }

    #[test]
    fn test_update_writes_time_in_seconds() {
        let (mut scene, mut particles) = setup();
        let mut timeline = Timeline::new();
        step(&mut particles, &mut scene, &mut timeline, 2.5);
        let shader = scene.material(particles.material()).as_shader().unwrap();
        assert_eq!(shader.uniforms.get_f32("uTime"), Some(2.5));
    }

    #[test]
    fn test_opacity_edit_cancels_fade() {
        let (mut scene, mut particles) = setup();
        let mut timeline = Timeline::new();
        particles.hide_animation(&timeline);
        step(&mut particles, &mut scene, &mut timeline, 1.0);

        particles
            .set_tunable(&mut scene, "opacity", TunableValue::Float(0.3))
            .unwrap();
        step(&mut particles, &mut scene, &mut timeline, 1.5);
        assert_eq!(uniform_opacity(&scene, &particles), 0.3);

        let red = Color::from_hex("#ff0000").unwrap();
        particles
            .set_tunable(&mut scene, "color", TunableValue::Color(red))
            .unwrap();
        let shader = scene.material(particles.material()).as_shader().unwrap();
        assert_eq!(shader.uniforms.get_vec3("uColor"), Some(red.as_vec3()));
    }
}
