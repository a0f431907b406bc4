//! Energy fields.
//!
//! An energy field is a cloud of points, sampled once per (re)generation by
//! the [`generator`], that the energy-field shader streams along a cubic
//! Bézier curve from `pointA` through two control points to `pointB`. The
//! CPU side only owns the samples and the uniform table; all motion happens
//! on the GPU.

pub mod generator;
mod instance;

pub use generator::{generate, generate_fresh, FieldSample};
pub use instance::{FieldInstance, FlowTuning, DEFAULT_COUNT};
