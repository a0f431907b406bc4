//! # crystalfx
//!
//! A crystal reveal scene: an animated crystal model that rises into view,
//! ambient particles fading in above it and several curve-following energy
//! fields made of procedurally sampled points.
//!
//! ## Quick Start
//!
//! ```ignore
//! use crystalfx::prelude::*;
//!
//! let sizes = Sizes::new(1280, 720, 1.0);
//! let renderer = HeadlessRenderer::new(sizes.width, sizes.height, sizes.pixel_ratio);
//! let mut experience = Experience::new(SceneConfig::default(), Box::new(renderer), sizes)?;
//!
//! experience.step(16.0)?;   // loads resources and composes the world
//! experience.reveal();
//! for _ in 0..240 {
//!     experience.step(16.0)?;
//! }
//! experience.destroy();
//! ```
//!
//! ## Core Concepts
//!
//! ### Time
//!
//! The [`time::Clock`] produces ticks in milliseconds. Every tick scrubs the
//! master [`timeline::Timeline`] to the elapsed time in seconds, and every
//! tween is a pure function of that cursor. Scrubbing back to an earlier
//! time reproduces the earlier positions and opacities.
//!
//! ### Entities
//!
//! The crystal and the ambient particles implement
//! [`entity::Revealable`]: `reveal_animation`, `hide_animation` and a
//! per-tick `update`. Energy fields are not revealable; they only advance
//! their shader time.
//!
//! ### Composition
//!
//! [`world::World`] waits for the resources' ready signal and then builds
//! everything exactly once. [`experience::Experience`] owns the world and
//! all collaborators and tears them down on [`experience::Experience::destroy`].
//!
//! ### Debug surface
//!
//! With `debug` enabled, every entity exposes a folder of tunables generated
//! by `#[derive(Tunables)]` plus a table of named commands.

extern crate self as crystalfx;

pub mod animation;
pub mod camera;
pub mod color;
pub mod config;
pub mod crystal;
pub mod debug;
pub mod entity;
pub mod environment;
pub mod error;
pub mod experience;
pub mod field;
pub mod gpu;
pub mod input;
pub mod particles;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod shader;
pub mod signal;
pub mod time;
pub mod timeline;
pub mod tween;
pub mod uniforms;
pub mod window;
pub mod world;

pub use crystalfx_derive::Tunables;
pub use glam::{Vec2, Vec3, Vec4};

pub use color::Color;
pub use error::{AssetError, ConfigError, Error, GpuError, RenderError, TuneError};
pub use experience::{Experience, Sizes};

/// Everything needed to build and drive an experience.
pub mod prelude {
    pub use crate::config::{CrystalOptions, EnvironmentOptions, FieldConfig, ParticlesOptions, SceneConfig};
    pub use crate::debug::{DebugFolder, TunableValue, Tunables};
    pub use crystalfx_derive::Tunables;
    pub use crate::entity::{RevealState, Revealable};
    pub use crate::experience::{Experience, Sizes};
    pub use crate::renderer::{HeadlessRenderer, Renderer};
    pub use crate::scene::{Dispose, Scene};
    pub use crate::time::Tick;
    pub use crate::timeline::Timeline;
    pub use crate::Color;
    pub use glam::Vec3;
}
