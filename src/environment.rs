//! Scene lighting: white ambient fill plus a shadow-casting sun.

use log::debug;

use crate::color::Color;
use crate::config::EnvironmentOptions;
use crate::debug::{CommandContext, DebugFolder, Tunable, TunableValue, Tunables};
use crate::error::TuneError;
use crate::scene::{Light, Node, NodeId, NodeKind, Scene, ShadowSettings};

/// Orthographic half extent of the sun's shadow camera.
const SHADOW_EXTENT: f32 = 7.0;
const SHADOW_FAR: f32 = 45.0;

pub struct Environment {
    options: EnvironmentOptions,
    ambient: NodeId,
    sun: NodeId,
}

impl Environment {
    pub fn new(scene: &mut Scene, options: EnvironmentOptions) -> Self {
        let root = scene.root();
        let ambient = scene.add(
            root,
            Node::new(
                "AmbientLight",
                NodeKind::Light(Light::Ambient {
                    color: Color::WHITE,
                    intensity: options.ambient_intensity,
                }),
            ),
        );
        let sun = scene.add(
            root,
            Node::new(
                "SunLight",
                NodeKind::Light(Light::Directional {
                    color: Color::WHITE,
                    intensity: options.sun_intensity,
                    cast_shadow: true,
                    shadow: ShadowSettings {
                        map_size: options.shadow_map_size,
                        far: SHADOW_FAR,
                        extent: SHADOW_EXTENT,
                    },
                }),
            )
            .with_position(options.sun_position),
        );
        debug!("Environment lights at {:?}", options.sun_position);

        Self { options, ambient, sun }
    }

    pub fn ambient(&self) -> NodeId {
        self.ambient
    }

    pub fn sun(&self) -> NodeId {
        self.sun
    }

    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }
}

impl DebugFolder for Environment {
    fn folder_name(&self) -> String {
        "Environment".to_string()
    }

    fn tunables(&self) -> Vec<Tunable> {
        self.options.tunables()
    }

    fn set_tunable(&mut self, scene: &mut Scene, key: &str, value: TunableValue) -> Result<(), TuneError> {
        self.options.set_tunable(key, value)?;
        if let NodeKind::Light(Light::Directional { intensity, .. }) = &mut scene.node_mut(self.sun).kind {
            *intensity = self.options.sun_intensity;
        }
        Ok(())
    }

    fn command_names(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn invoke(&mut self, command: &str, _ctx: &mut CommandContext<'_>) -> Result<(), TuneError> {
        Err(TuneError::UnknownCommand(command.to_string()))
    }
}
