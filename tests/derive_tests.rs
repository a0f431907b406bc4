//! Integration tests for the `#[derive(Tunables)]` macro.
//!
//! These tests use the derived implementations the way the debug surface
//! does: list the tunables, then write values back by key.

use crystalfx::debug::{TunableValue, Tunables};
use crystalfx::{Color, TuneError, Tunables};

#[derive(Tunables, Clone, Debug, PartialEq)]
struct Lamp {
    #[tune(label = "Brightness", min = 0.0, max = 10.0, step = 0.1)]
    brightness: f32,
    #[tune(label = "Tint")]
    tint: Color,
    #[tune]
    enabled: bool,
    // Not exposed
    serial: u32,
}

fn lamp() -> Lamp {
    Lamp {
        brightness: 1.0,
        tint: Color::WHITE,
        enabled: true,
        serial: 42,
    }
}

#[test]
fn test_tunables_follow_declaration_order() {
    let keys: Vec<_> = lamp().tunables().iter().map(|t| t.key).collect();
    assert_eq!(keys, vec!["brightness", "tint", "enabled"]);
}

#[test]
fn test_attribute_metadata() {
    let lamp = lamp();
    let brightness = lamp.tunable("brightness").unwrap();
    assert_eq!(brightness.label, "Brightness");
    assert_eq!(brightness.value, TunableValue::Float(1.0));
    assert_eq!(brightness.min, Some(0.0));
    assert_eq!(brightness.max, Some(10.0));
    assert_eq!(brightness.step, Some(0.1));

    // Bare #[tune] labels with the field name and has no range
    let enabled = lamp.tunable("enabled").unwrap();
    assert_eq!(enabled.label, "enabled");
    assert_eq!(enabled.min, None);
    assert_eq!(enabled.value, TunableValue::Toggle(true));
}

#[test]
fn test_untagged_fields_are_hidden() {
    let mut lamp = lamp();
    assert!(lamp.tunable("serial").is_none());
    assert_eq!(
        lamp.set_tunable("serial", TunableValue::Float(1.0)),
        Err(TuneError::UnknownKey("serial".into()))
    );
    assert_eq!(lamp.serial, 42);
}

#[test]
fn test_set_clamps_to_range() {
    let mut lamp = lamp();
    lamp.set_tunable("brightness", TunableValue::Float(25.0)).unwrap();
    assert_eq!(lamp.brightness, 10.0);
    lamp.set_tunable("brightness", TunableValue::Float(-3.0)).unwrap();
    assert_eq!(lamp.brightness, 0.0);
    lamp.set_tunable("brightness", TunableValue::Float(4.5)).unwrap();
    assert_eq!(lamp.brightness, 4.5);
}

#[test]
fn test_set_rejects_wrong_type() {
    let mut lamp = lamp();
    assert_eq!(
        lamp.set_tunable("tint", TunableValue::Float(1.0)),
        Err(TuneError::TypeMismatch("tint".into()))
    );

    let red = Color::from_hex("#ff0000").unwrap();
    lamp.set_tunable("tint", TunableValue::Color(red)).unwrap();
    lamp.set_tunable("enabled", TunableValue::Toggle(false)).unwrap();
    assert_eq!(lamp.tint, red);
    assert!(!lamp.enabled);
}

#[test]
fn test_crate_option_structs() {
    use crystalfx::config::{CrystalOptions, EnvironmentOptions};

    let mut crystal = CrystalOptions::default();
    let labels: Vec<_> = crystal.tunables().iter().map(|t| t.label).collect();
    assert_eq!(labels, vec!["Rotation Speed", "Hover Amplitude", "Hover Speed"]);

    crystal
        .set_tunable("hover_speed", TunableValue::Float(1.0))
        .unwrap();
    assert_eq!(crystal.hover_speed, 0.01);

    let environment = EnvironmentOptions::default();
    let sun = environment.tunable("sun_intensity").unwrap();
    assert_eq!(sun.label, "LightIntensity");
    assert_eq!(sun.step, Some(0.001));
}
