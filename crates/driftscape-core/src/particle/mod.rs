//! Weather-style particle effects.
//!
//! A [`ParticleSimulator`] owns one bounded pool per active effect type and is
//! stepped once per render tick. [`sprites`] turns the live pool into draw
//! primitives whose paints come from a small opacity-bucketed [`PaintCache`].

mod settings;
mod simulator;
mod sprite;

pub use settings::{ParticleSettings, ParticleType};
pub use simulator::{MAX_FRAME_DELTA, NOMINAL_FRAME_DELTA, Particle, ParticleSimulator};
pub use sprite::{OPACITY_BUCKETS, PaintCache, ParticleSprite, quantize_opacity, sprites};
