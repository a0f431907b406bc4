//! The crystal: an animated model that drops in, hovers and recedes.
//!
//! The model sits under a parent group. Reveal and hide animate the parent
//! (and the model's shared material opacity); per-frame spin and hover act
//! on the model itself, so the two never fight over a transform.
//!
//! Three clips play concurrently on the model for the orbiting rock shards.

use glam::Vec3;
use log::debug;

use crate::animation::AnimationMixer;
use crate::config::CrystalOptions;
use crate::debug::{CommandContext, CommandTable, DebugFolder, Tunable, TunableValue, Tunables};
use crate::entity::{log_transition, RevealState, Revealable, Track};
use crate::error::{AssetError, TuneError};
use crate::resources::{Resources, CRYSTAL_MODEL};
use crate::scene::{MaterialId, Node, NodeId, Scene};
use crate::time::Tick;
use crate::timeline::{Position, Sequence, Timeline};
use crate::tween::{Easing, Tween};

/// Clips the crystal plays; the model must carry at least this many.
pub const REQUIRED_CLIPS: usize = 3;

/// Parent height the reveal drops from.
const REVEAL_HEIGHT: f32 = 10.0;
const REVEAL_DURATION: f32 = 3.0;
const HIDE_DURATION: f32 = 2.0;
/// Parent z the hide recedes to.
const HIDE_DEPTH: f32 = -2.0;

pub struct Crystal {
    options: CrystalOptions,
    parent: NodeId,
    model: NodeId,
    material: MaterialId,
    mixer: AnimationMixer,
    state: RevealState,
    /// Latches on when the first reveal finishes.
    hovering: bool,
    /// Last values written to the scene, the `from` of the next tween.
    current: Vec3,
    opacity: f32,
    parent_y: Track<f32>,
    parent_z: Track<f32>,
    opacity_track: Track<f32>,
    hide_ends_at: f32,
    commands: CommandTable<Crystal>,
}

impl Crystal {
    /// Instantiate the crystal model under a new parent group.
    ///
    /// Fails if the model is missing, has no mesh, or has fewer than
    /// [`REQUIRED_CLIPS`] clips.
    pub fn new(scene: &mut Scene, resources: &Resources, options: CrystalOptions) -> Result<Self, AssetError> {
        let asset = resources.model(CRYSTAL_MODEL)?;
        if asset.clips.len() < REQUIRED_CLIPS {
            return Err(AssetError::NotEnoughClips {
                found: asset.clips.len(),
                required: REQUIRED_CLIPS,
            });
        }

        let root = scene.root();
        let parent = scene.add(root, Node::group("CrystalParent"));
        let instance = asset.instantiate(scene, parent)?;

        let material = scene.material_mut(instance.material);
        if let Some(standard) = material.as_standard_mut() {
            standard.transparent = true;
        }
        let opacity = material.opacity();

        let mut mixer = AnimationMixer::new(instance.root);
        for clip in &asset.clips[..REQUIRED_CLIPS] {
            mixer.play(clip.clone(), scene);
        }

        Ok(Self {
            options,
            parent,
            model: instance.root,
            material: instance.material,
            mixer,
            state: RevealState::NotRevealed,
            hovering: false,
            current: scene.node(parent).transform.position,
            opacity,
            parent_y: Track::new(),
            parent_z: Track::new(),
            opacity_track: Track::new(),
            hide_ends_at: 0.0,
            commands: CommandTable::<Crystal>::new()
                .with("reveal", |crystal, ctx| crystal.reveal_animation(ctx.timeline))
                .with("hide", |crystal, ctx| crystal.hide_animation(ctx.timeline)),
        })
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn model(&self) -> NodeId {
        self.model
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    pub fn options(&self) -> &CrystalOptions {
        &self.options
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    /// Whether hover has been switched on by a finished reveal.
    pub fn is_hovering(&self) -> bool {
        self.hovering
    }

    fn apply_tracks(&mut self, scene: &mut Scene, time: f32) {
        if let Some(y) = self.parent_y.sample(time) {
            self.current.y = y;
        }
        if let Some(z) = self.parent_z.sample(time) {
            self.current.z = z;
        }
        scene.node_mut(self.parent).transform.position = self.current;

        if let Some(opacity) = self.opacity_track.sample(time) {
            self.opacity = opacity;
        }
        scene.material_mut(self.material).set_opacity(self.opacity);
    }
}

impl Revealable for Crystal {
    fn name(&self) -> &'static str {
        "crystal"
    }

    /// Opacity 1 and parent at (x, 10, 0) immediately, then drop to y = 0.
    fn reveal_animation(&mut self, timeline: &Timeline) {
        let now = timeline.time();
        self.opacity_track.start(Tween::set(1.0, now));
        self.parent_z.start(Tween::set(0.0, now));
        self.parent_y.start(
            Tween::new(REVEAL_HEIGHT, 0.0, REVEAL_DURATION)
                .starting_at(now)
                .with_easing(Easing::Power1InOut),
        );

        let next = self.state.on_reveal();
        log_transition(self.name(), self.state, next);
        self.state = next;
        debug!("Crystal reveal at {:.3}s", now);
    }

    /// Fade out and recede together.
    fn hide_animation(&mut self, timeline: &Timeline) {
        let now = timeline.time();
        let mut sequence = Sequence::starting_at(now);
        let fade = sequence.place(
            Tween::new(self.opacity, 0.0, HIDE_DURATION).with_easing(Easing::Power1InOut),
            Position::AfterPrevious,
        );
        let recede = sequence.place(
            Tween::new(self.current.z, HIDE_DEPTH, HIDE_DURATION).with_easing(Easing::Power1InOut),
            Position::RelativeToEnd(-HIDE_DURATION),
        );
        self.opacity_track.start(fade);
        self.parent_z.start(recede);
        self.hide_ends_at = sequence.ends_at();

        let next = self.state.on_hide();
        log_transition(self.name(), self.state, next);
        self.state = next;
        debug!("Crystal hide at {:.3}s", now);
    }

    fn update(&mut self, scene: &mut Scene, timeline: &Timeline, tick: &Tick) {
        let time = timeline.time();
        self.apply_tracks(scene, time);

        let finished = match self.state {
            RevealState::Revealing => self.parent_y.is_complete(time),
            RevealState::Hiding => time >= self.hide_ends_at,
            _ => false,
        };
        let next = self.state.settle(finished);
        if next == RevealState::Revealed {
            self.hovering = true;
        }
        log_transition(self.name(), self.state, next);
        self.state = next;

        self.mixer.update(tick.delta_ms * 0.001, scene);

        let model = &mut scene.node_mut(self.model).transform;
        model.rotation.y += self.options.rotation_speed;
        if self.hovering {
            model.position.y = (tick.elapsed_ms * self.options.hover_speed).sin() * self.options.hover_amplitude;
        }
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

impl DebugFolder for Crystal {
    fn folder_name(&self) -> String {
        "Crystal".to_string()
    }

    fn tunables(&self) -> Vec<Tunable> {
        self.options.tunables()
    }

    fn set_tunable(&mut self, _scene: &mut Scene, key: &str, value: TunableValue) -> Result<(), TuneError> {
        self.options.set_tunable(key, value)
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
