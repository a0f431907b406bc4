//! Scene composition.
//!
//! [`World`] builds every visual entity once the resources are ready: the
//! crystal, the ambient particles, the lights and one [`FieldInstance`] per
//! configured field. Before that it holds nothing and its per-frame calls do
//! nothing. Composition happens exactly once.
//!
//! ```ignore
//! let mut world = World::new(&config, &mut resources);
//!
//! // Each frame:
//! resources.poll()?;
//! world.poll_ready(&mut scene, &mut resources, pixel_ratio)?;
//! world.update(&mut scene, &timeline, &tick);
//! ```

use log::{debug, info, trace};

use crate::config::SceneConfig;
use crate::crystal::Crystal;
use crate::debug::{CommandContext, CommandTable, DebugFolder, Tunable, TunableValue};
use crate::entity::Revealable;
use crate::environment::Environment;
use crate::error::{AssetError, TuneError};
use crate::field::FieldInstance;
use crate::particles::AmbientParticles;
use crate::resources::Resources;
use crate::scene::Scene;
use crate::signal::ListenerId;
use crate::time::Tick;
use crate::timeline::Timeline;

/// Name of the composer's own debug folder.
pub const WORLD_FOLDER: &str = "World";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComposerState {
    Uninitialized,
    Composed,
}

pub struct World {
    config: SceneConfig,
    ready_listener: Option<ListenerId>,
    state: ComposerState,
    entities: Vec<Box<dyn Revealable>>,
    fields: Vec<FieldInstance>,
    environment: Option<Environment>,
    commands: CommandTable<World>,
}

impl World {
    /// Subscribe to the resources' ready signal. Nothing is built yet.
    pub fn new(config: &SceneConfig, resources: &mut Resources) -> Self {
        Self {
            config: config.clone(),
            ready_listener: Some(resources.on_ready.subscribe()),
            state: ComposerState::Uninitialized,
            entities: Vec::new(),
            fields: Vec::new(),
            environment: None,
            commands: CommandTable::<World>::new()
                .with("reveal", |world, ctx| world.reveal_animation(ctx.timeline))
                .with("hide", |world, ctx| world.hide_animation(ctx.timeline))
                .with("reset_fields", |world, ctx| world.reset_fields(ctx.scene)),
        }
    }

    /// Compose if the ready signal has fired. Returns whether composed.
    pub fn poll_ready(
        &mut self,
        scene: &mut Scene,
        resources: &mut Resources,
        pixel_ratio: f32,
    ) -> Result<bool, AssetError> {
        if let Some(listener) = self.ready_listener {
            if !resources.on_ready.drain(listener).is_empty() {
                self.compose(scene, resources, pixel_ratio)?;
            }
        }
        Ok(self.is_composed())
    }

    /// Build all entities. Only the first successful call does anything.
    pub fn compose(&mut self, scene: &mut Scene, resources: &Resources, pixel_ratio: f32) -> Result<(), AssetError> {
        if self.is_composed() {
            debug!("World already composed, ignoring");
            return Ok(());
        }

        let crystal = Crystal::new(scene, resources, self.config.crystal.clone())?;
        let particles = AmbientParticles::new(scene, &self.config.particles);
        particles.set_pixel_ratio(scene, pixel_ratio);
        let environment = Environment::new(scene, self.config.environment.clone());

        let fields: Vec<FieldInstance> = self
            .config
            .fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let instance = FieldInstance::new(scene, field.clone(), self.config.field_count)
                    .with_label(format!("Flows {}", i + 1));
                instance.set_pixel_ratio(scene, pixel_ratio);
                instance
            })
            .collect();

        self.entities = vec![Box::new(crystal), Box::new(particles)];
        self.fields = fields;
        self.environment = Some(environment);
        self.state = ComposerState::Composed;
        info!(
            "World composed: {} entities, {} fields of {} samples",
            self.entities.len(),
            self.fields.len(),
            self.config.field_count
        );
        Ok(())
    }

    /// Fan out to every entity and field.
    pub fn update(&mut self, scene: &mut Scene, timeline: &Timeline, tick: &Tick) {
        if !self.is_composed() {
            trace!("World update before ready, skipped");
            return;
        }
        for entity in &mut self.entities {
            entity.update(scene, timeline, tick);
        }
        let seconds = tick.seconds();
        for field in &self.fields {
            field.update(scene, seconds);
        }
    }

    /// Reveal every revealable entity. Fields are not revealable.
    pub fn reveal_animation(&mut self, timeline: &Timeline) {
        if !self.is_composed() {
            debug!("Reveal requested before the world was composed, ignoring");
            return;
        }
        for entity in &mut self.entities {
            entity.reveal_animation(timeline);
        }
    }

    pub fn hide_animation(&mut self, timeline: &Timeline) {
        if !self.is_composed() {
            debug!("Hide requested before the world was composed, ignoring");
            return;
        }
        for entity in &mut self.entities {
            entity.hide_animation(timeline);
        }
    }

    /// Regenerate every field's samples.
    pub fn reset_fields(&mut self, scene: &mut Scene) {
        for field in &mut self.fields {
            field.reset(scene);
        }
    }

    /// Drop the ready subscription. Composition can no longer happen.
    pub fn detach(&mut self, resources: &mut Resources) {
        if let Some(listener) = self.ready_listener.take() {
            resources.on_ready.unsubscribe(listener);
        }
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    #[inline]
    pub fn is_composed(&self) -> bool {
        self.state == ComposerState::Composed
    }

    pub fn entities(&self) -> &[Box<dyn Revealable>] {
        &self.entities
    }

    pub fn fields(&self) -> &[FieldInstance] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldInstance] {
        &mut self.fields
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Debug folder names, empty unless debug is enabled.
    pub fn folder_names(&self) -> Vec<String> {
        if !self.config.debug {
            return Vec::new();
        }
        let mut names = vec![WORLD_FOLDER.to_string()];
        names.extend(self.entities.iter().map(|e| e.as_debug().folder_name()));
        names.extend(self.fields.iter().map(|f| f.folder_name()));
        names.extend(self.environment.iter().map(|e| e.folder_name()));
        names
    }

    /// Tunables of one folder.
    pub fn folder_tunables(&mut self, folder: &str) -> Result<Vec<Tunable>, TuneError> {
        Ok(self.folder_mut(folder)?.tunables())
    }

    pub fn set_tunable(
        &mut self,
        scene: &mut Scene,
        folder: &str,
        key: &str,
        value: TunableValue,
    ) -> Result<(), TuneError> {
        self.folder_mut(folder)?.set_tunable(scene, key, value)
    }

    /// Run a named command in a folder.
    pub fn invoke(&mut self, folder: &str, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), TuneError> {
        debug!("Debug command {}/{}", folder, command);
        self.folder_mut(folder)?.invoke(command, ctx)
    }

    fn folder_mut(&mut self, folder: &str) -> Result<&mut dyn DebugFolder, TuneError> {
        if !self.config.debug {
            return Err(TuneError::UnknownFolder(folder.to_string()));
        }
        if folder == WORLD_FOLDER {
            return Ok(self);
        }
        if let Some(i) = self
            .entities
            .iter()
            .position(|e| e.as_debug().folder_name() == folder)
        {
            return Ok(self.entities[i].as_debug_mut());
        }
        if let Some(i) = self.fields.iter().position(|f| f.folder_name() == folder) {
            return Ok(&mut self.fields[i]);
        }
        match self.environment.as_mut() {
            Some(environment) if environment.folder_name() == folder => Ok(environment),
            _ => Err(TuneError::UnknownFolder(folder.to_string())),
        }
    }
}

impl DebugFolder for World {
    fn folder_name(&self) -> String {
        WORLD_FOLDER.to_string()
    }

    fn tunables(&self) -> Vec<Tunable> {
        Vec::new()
    }

    fn set_tunable(&mut self, _scene: &mut Scene, key: &str, _value: TunableValue) -> Result<(), TuneError> {
        Err(TuneError::UnknownKey(key.to_string()))
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
    use crate::entity::RevealState;

    fn small_config(debug: bool) -> SceneConfig {
        SceneConfig {
            debug,
            field_count: 64,
            ..SceneConfig::default()
        }
    }

    fn tick(seconds: f32) -> Tick {
        Tick {
            elapsed_ms: seconds * 1000.0,
            delta_ms: 16.0,
            frame: 1,
        }
    }

    #[test]
    fn test_nothing_before_ready() {
        let mut resources = Resources::with_default_sources();
        let mut scene = Scene::new();
        let mut world = World::new(&small_config(false), &mut resources);
        let timeline = Timeline::new();

        world.reveal_animation(&timeline);
        world.hide_animation(&timeline);
        world.update(&mut scene, &timeline, &tick(1.0));

        assert_eq!(world.state(), ComposerState::Uninitialized);
        assert!(world.entities().is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_composes_once_on_ready() {
        let mut resources = Resources::with_default_sources();
        let mut scene = Scene::new();
        let mut world = World::new(&small_config(false), &mut resources);

        assert!(!world.poll_ready(&mut scene, &mut resources, 1.0).unwrap());
        resources.load_all().unwrap();
        assert!(world.poll_ready(&mut scene, &mut resources, 1.0).unwrap());

        let nodes = scene.len();
        world.compose(&mut scene, &resources, 1.0).unwrap();
        assert!(world.poll_ready(&mut scene, &mut resources, 1.0).unwrap());
        assert_eq!(scene.len(), nodes);

        assert_eq!(world.entities().len(), 2);
        assert_eq!(world.fields().len(), 3);
        assert_eq!(world.fields()[0].samples().len(), 64);
        assert!(world.environment().is_some());
    }

    #[test]
    fn test_reveal_reaches_entities_only() {
        let mut resources = Resources::with_default_sources();
        resources.load_all().unwrap();
        let mut scene = Scene::new();
        let mut world = World::new(&small_config(false), &mut resources);
        world.compose(&mut scene, &resources, 2.0).unwrap();

        let timeline = Timeline::new();
        world.reveal_animation(&timeline);
        for entity in world.entities() {
            assert_eq!(entity.reveal_state(), RevealState::Revealing);
        }
        let field = &world.fields()[2];
        let shader = scene.material(field.material()).as_shader().unwrap();
        assert_eq!(shader.uniforms.get_f32("uPixelRatio"), Some(2.0));
    }

    #[test]
    fn test_debug_folders() {
        let mut resources = Resources::with_default_sources();
        resources.load_all().unwrap();
        let mut scene = Scene::new();
        let mut world = World::new(&small_config(true), &mut resources);
        world.compose(&mut scene, &resources, 1.0).unwrap();

        assert_eq!(
            world.folder_names(),
            vec!["World", "Crystal", "Particles", "Flows 1", "Flows 2", "Flows 3", "Environment"]
        );

        let timeline = Timeline::new();
        let mut ctx = CommandContext {
            timeline: &timeline,
            scene: &mut scene,
        };
        world.invoke("World", "hide", &mut ctx).unwrap();
        for entity in world.entities() {
            assert_eq!(entity.reveal_state(), RevealState::Hiding);
        }
        assert_eq!(
            world.invoke("Lasers", "fire", &mut ctx),
            Err(TuneError::UnknownFolder("Lasers".into()))
        );

        world
            .set_tunable(&mut scene, "Flows 2", "time_frequency", TunableValue::Float(1.5))
            .unwrap();
        assert_eq!(world.fields()[1].tuning().time_frequency, 1.5);
        assert_eq!(world.fields()[0].tuning().time_frequency, 0.3);
    }

    #[test]
    fn test_debug_disabled_hides_folders() {
        let mut resources = Resources::with_default_sources();
        let world = World::new(&small_config(false), &mut resources);
        assert!(world.folder_names().is_empty());
    }
}
