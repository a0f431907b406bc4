//! Scene configuration.
//!
//! [`SceneConfig`] describes everything the experience builds: the three
//! energy fields, the crystal, the ambient particles, lighting and the
//! window. `Default` is the reference composition. Configurations serialize
//! to JSON; missing keys fall back to their defaults, so a file only needs to
//! list what it changes.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::color::Color;
use crate::error::ConfigError;
use crystalfx_derive::Tunables;

/// Shared color of the reference fields and particles.
pub const EMBER: &str = "#73332c";

fn ember() -> Color {
    Color::from_hex(EMBER).unwrap_or(Color::WHITE)
}

/// Parameters of one energy field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldConfig {
    /// Curve start.
    pub point_a: Vec3,
    /// Curve end, where the flow converges.
    pub point_b: Vec3,
    pub control_point_1: Vec3,
    pub control_point_2: Vec3,
    pub color: Color,
    /// Curve traversal speed (`uSpeed`).
    pub speed: f32,
    /// Noise displacement strength (`uPerlinMultiplier`).
    pub noise_amplitude: f32,
    /// Spatial noise frequency (`uPerlinFrequency`).
    pub noise_frequency: f32,
    /// Temporal noise frequency (`uTimeFrequency`).
    pub time_frequency: f32,
}

impl FieldConfig {
    /// Field with the reference look between the given curve points.
    pub fn between(point_a: Vec3, control_point_1: Vec3, control_point_2: Vec3) -> Self {
        Self {
            point_a,
            control_point_1,
            control_point_2,
            ..Self::default()
        }
    }

    /// The three fields of the reference composition.
    pub fn reference_set() -> Vec<Self> {
        vec![
            Self::between(
                Vec3::new(0.3, -100.0, 0.0),
                Vec3::new(4.0, -4.0, -8.0),
                Vec3::new(6.0, 5.0, 5.0),
            ),
            Self::between(
                Vec3::new(0.3, 100.0, 20.0),
                Vec3::new(0.0, -3.0, -15.0),
                Vec3::new(-8.0, 10.0, 4.0),
            ),
            Self::between(
                Vec3::new(0.3, -100.0, 20.0),
                Vec3::new(0.0, -3.0, 10.0),
                Vec3::new(8.0, 10.0, 4.0),
            ),
        ]
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            point_a: Vec3::new(0.3, -100.0, 0.0),
            point_b: Vec3::new(0.0, 3.0, 0.0),
            control_point_1: Vec3::new(4.0, -4.0, -8.0),
            control_point_2: Vec3::new(6.0, 5.0, 5.0),
            color: ember(),
            speed: 0.078,
            noise_amplitude: 0.78,
            noise_frequency: 2.0,
            time_frequency: 0.3,
        }
    }
}

/// Crystal motion. Also the crystal's debug tunables.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Tunables)]
#[serde(default)]
pub struct CrystalOptions {
    /// Added to the model's Y rotation every frame, in radians.
    #[tune(label = "Rotation Speed")]
    pub rotation_speed: f32,
    #[tune(label = "Hover Amplitude", min = 0.001, max = 0.4)]
    pub hover_amplitude: f32,
    /// Radians per millisecond of elapsed time.
    #[tune(label = "Hover Speed", min = 0.001, max = 0.01)]
    pub hover_speed: f32,
}

impl Default for CrystalOptions {
    fn default() -> Self {
        Self {
            rotation_speed: 0.01,
            hover_amplitude: 0.1,
            hover_speed: 0.002,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParticlesOptions {
    pub count: usize,
    pub color: Color,
    /// Starting opacity, before any reveal or hide.
    pub opacity: f32,
    /// Point size in pixels before perspective (`uSize`).
    pub size: f32,
}

impl Default for ParticlesOptions {
    fn default() -> Self {
        Self {
            count: 200,
            color: ember(),
            opacity: 1.0,
            size: 100.0,
        }
    }
}

/// Lighting. `sun_intensity` is tunable.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Tunables)]
#[serde(default)]
pub struct EnvironmentOptions {
    pub ambient_intensity: f32,
    #[tune(label = "LightIntensity", min = 0.0, max = 10.0, step = 0.001)]
    pub sun_intensity: f32,
    pub sun_position: Vec3,
    pub shadow_map_size: u32,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.8,
            sun_intensity: 0.6,
            sun_position: Vec3::new(2.0, 8.0, 8.0),
            shadow_map_size: 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "crystalfx".into(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Complete scene configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Expose debug folders and commands.
    pub debug: bool,
    /// Samples per energy field.
    pub field_count: usize,
    pub fields: Vec<FieldConfig>,
    pub crystal: CrystalOptions,
    pub particles: ParticlesOptions,
    pub environment: EnvironmentOptions,
    pub window: WindowConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            debug: false,
            field_count: 2000,
            fields: FieldConfig::reference_set(),
            crystal: CrystalOptions::default(),
            particles: ParticlesOptions::default(),
            environment: EnvironmentOptions::default(),
            window: WindowConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the scene can't be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_count == 0 {
            return Err(ConfigError::Invalid("field_count must be at least 1".into()));
        }
        if self.particles.count == 0 {
            return Err(ConfigError::Invalid("particles.count must be at least 1".into()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} is empty",
                self.window.width, self.window.height
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            let points = [
                field.point_a,
                field.point_b,
                field.control_point_1,
                field.control_point_2,
            ];
            if !points.iter().all(|p| p.is_finite()) {
                return Err(ConfigError::Invalid(format!("fields[{}] has a non-finite point", i)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::{TunableValue, Tunables};

    #[test]
    fn test_default_is_reference_composition() {
        let config = SceneConfig::default();
        assert_eq!(config.fields.len(), 3);
        assert_eq!(config.field_count, 2000);
        assert_eq!(config.fields[1].point_a, Vec3::new(0.3, 100.0, 20.0));
        for field in &config.fields {
            assert_eq!(field.point_b, Vec3::new(0.0, 3.0, 0.0));
            assert_eq!(field.color.to_hex(), EMBER);
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = SceneConfig::from_json(r#"{ "debug": true, "crystal": { "hover_amplitude": 0.3 } }"#)
            .unwrap();
        assert!(config.debug);
        assert_eq!(config.crystal.hover_amplitude, 0.3);
        assert_eq!(config.crystal.rotation_speed, 0.01);
        assert_eq!(config.fields.len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SceneConfig::from_json(r#"{ "field_count": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SceneConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("crystalfx-config-{}.json", std::process::id()));
        let mut config = SceneConfig::default();
        config.particles.count = 50;
        config.save(&path).unwrap();

        let loaded = SceneConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.particles.count, 50);
        assert_eq!(loaded.fields.len(), 3);
        assert_eq!(loaded.fields[2].control_point_2, config.fields[2].control_point_2);
        // Colors go through hex, so compare at 8-bit precision.
        assert_eq!(loaded.fields[0].color.to_hex(), EMBER);
    }

    #[test]
    fn test_crystal_tunables_clamp() {
        let mut options = CrystalOptions::default();
        options
            .set_tunable("hover_amplitude", TunableValue::Float(2.0))
            .unwrap();
        assert_eq!(options.hover_amplitude, 0.4);

        let keys: Vec<_> = options.tunables().into_iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["rotation_speed", "hover_amplitude", "hover_speed"]);
    }

    #[test]
    fn test_environment_exposes_only_sun() {
        let options = EnvironmentOptions::default();
        let tunables = options.tunables();
        assert_eq!(tunables.len(), 1);
        assert_eq!(tunables[0].label, "LightIntensity");
        assert_eq!(tunables[0].max, Some(10.0));
    }
}
