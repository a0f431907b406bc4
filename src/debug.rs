//! Debug inspection surface.
//!
//! Each entity exposes a flat map of named tunable values plus a table of
//! named commands, grouped under a folder name. A UI (or a test) lists the
//! tunables, writes new values back, and invokes commands by name.
//!
//! Option structs get their tunable map from `#[derive(Tunables)]`:
//!
//! ```ignore
//! #[derive(Tunables)]
//! struct CrystalOptions {
//!     #[tune(label = "Rotation Speed")]
//!     rotation_speed: f32,
//!     #[tune(label = "Hover Amplitude", min = 0.001, max = 0.4)]
//!     hover_amplitude: f32,
//! }
//!
//! options.set_tunable("hover_amplitude", TunableValue::Float(5.0))?;
//! assert_eq!(options.hover_amplitude, 0.4); // clamped
//! ```
//!
//! Entities wrap their options in a [`DebugFolder`], which also writes the
//! new values through to the scene (uniforms, lights) and runs commands.

use crate::color::Color;
use crate::error::TuneError;
use crate::scene::Scene;
use crate::timeline::Timeline;

/// A tunable's current value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TunableValue {
    Float(f32),
    Color(Color),
    Toggle(bool),
}

/// One entry in a debug folder.
#[derive(Clone, Debug, PartialEq)]
pub struct Tunable {
    pub key: &'static str,
    pub label: &'static str,
    pub value: TunableValue,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub step: Option<f32>,
}

/// Field types usable with `#[derive(Tunables)]`.
pub trait TunableField: Sized {
    fn to_tunable_value(&self) -> TunableValue;

    /// `None` if `value` holds a different type.
    fn from_tunable_value(value: TunableValue) -> Option<Self>;

    /// Apply the tunable's range. Only numeric fields have one.
    fn clamp_to(self, _min: Option<f32>, _max: Option<f32>) -> Self {
        self
    }
}

impl TunableField for f32 {
    fn to_tunable_value(&self) -> TunableValue {
        TunableValue::Float(*self)
    }

    fn from_tunable_value(value: TunableValue) -> Option<Self> {
        match value {
            TunableValue::Float(v) => Some(v),
            _ => None,
        }
    }

    fn clamp_to(self, min: Option<f32>, max: Option<f32>) -> Self {
        let v = min.map_or(self, |min| self.max(min));
        max.map_or(v, |max| v.min(max))
    }
}

impl TunableField for Color {
    fn to_tunable_value(&self) -> TunableValue {
        TunableValue::Color(*self)
    }

    fn from_tunable_value(value: TunableValue) -> Option<Self> {
        match value {
            TunableValue::Color(c) => Some(c),
            _ => None,
        }
    }
}

impl TunableField for bool {
    fn to_tunable_value(&self) -> TunableValue {
        TunableValue::Toggle(*self)
    }

    fn from_tunable_value(value: TunableValue) -> Option<Self> {
        match value {
            TunableValue::Toggle(b) => Some(b),
            _ => None,
        }
    }
}

/// A flat key → value map over a struct's fields.
///
/// Usually derived.
pub trait Tunables {
    fn tunables(&self) -> Vec<Tunable>;

    /// Write a value, clamped to the tunable's range.
    fn set_tunable(&mut self, key: &str, value: TunableValue) -> Result<(), TuneError>;

    fn tunable(&self, key: &str) -> Option<Tunable> {
        self.tunables().into_iter().find(|t| t.key == key)
    }
}

/// What a debug command may touch.
pub struct CommandContext<'a> {
    pub timeline: &'a Timeline,
    pub scene: &'a mut Scene,
}

/// A debug command acting on its entity.
pub type Command<T> = fn(&mut T, &mut CommandContext<'_>);

/// Named commands of one entity type.
pub struct CommandTable<T> {
    commands: Vec<(&'static str, Command<T>)>,
}

impl<T> CommandTable<T> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with(mut self, name: &'static str, command: Command<T>) -> Self {
        self.commands.push((name, command));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.iter().map(|(name, _)| *name).collect()
    }

    pub fn lookup(&self, name: &str) -> Result<Command<T>, TuneError> {
        self.commands
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, command)| *command)
            .ok_or_else(|| TuneError::UnknownCommand(name.to_string()))
    }
}

impl<T> Default for CommandTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An entity's folder on the debug surface.
pub trait DebugFolder {
    fn folder_name(&self) -> String;

    fn tunables(&self) -> Vec<Tunable>;

    /// Write a tunable and apply it to whatever it drives in the scene.
    fn set_tunable(&mut self, scene: &mut Scene, key: &str, value: TunableValue) -> Result<(), TuneError>;

    fn command_names(&self) -> Vec<&'static str>;

    fn invoke(&mut self, command: &str, ctx: &mut CommandContext<'_>) -> Result<(), TuneError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: u32,
    }

    fn bump(counter: &mut Counter, _: &mut CommandContext<'_>) {
        counter.hits += 1;
    }

    #[test]
    fn test_float_clamp() {
        assert_eq!(5.0f32.clamp_to(Some(0.001), Some(0.4)), 0.4);
        assert_eq!((-1.0f32).clamp_to(None, Some(5.0)), -1.0);
        assert_eq!(0.2f32.clamp_to(Some(0.001), None), 0.2);
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(f32::from_tunable_value(TunableValue::Toggle(true)), None);
        assert_eq!(
            Color::from_tunable_value(TunableValue::Color(Color::WHITE)),
            Some(Color::WHITE)
        );
    }

    #[test]
    fn test_command_table() {
        let table = CommandTable::new().with("bump", bump as Command<Counter>);
        let mut counter = Counter { hits: 0 };
        let timeline = Timeline::new();
        let mut scene = Scene::new();
        let mut ctx = CommandContext {
            timeline: &timeline,
            scene: &mut scene,
        };

        let command = table.lookup("bump").unwrap();
        command(&mut counter, &mut ctx);
        assert_eq!(counter.hits, 1);
        assert_eq!(table.names(), vec!["bump"]);
        assert_eq!(
            table.lookup("nope").err(),
            Some(TuneError::UnknownCommand("nope".into()))
        );
    }
}
