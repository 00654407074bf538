use kurbo::{Point, Vec2};

use super::{Particle, ParticleSimulator, ParticleType};
use crate::render::{Color, Paint};

/// Number of discrete opacity levels across `[0, 1]`.
pub const OPACITY_BUCKETS: usize = 11;

const SNOW_COLOR: Color = Color::WHITE;
const RAIN_COLOR: Color = Color::new(200, 220, 255, 180);
const RAIN_STROKE_WIDTH: f64 = 1.5;
/// Streak length relative to particle size.
const RAIN_LENGTH_FACTOR: f64 = 4.0;
/// Horizontal streak lean relative to wind speed.
const RAIN_LEAN_FACTOR: f64 = 0.02;

/// Maps a continuous opacity to its bucket index `0..=10`.
pub fn quantize_opacity(opacity: f64) -> u8 {
    // Bounded to 0..=10 by the clamp
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bucket = (opacity.clamp(0.0, 1.0) * 10.0).round() as u8;
    bucket
}

/// Precomputed paints for one effect type, one per opacity bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintCache {
    kind: ParticleType,
    paints: [Paint; OPACITY_BUCKETS],
}

impl PaintCache {
    pub fn new(kind: ParticleType) -> Self {
        let (color, stroke_width) = match kind {
            ParticleType::Rain => (RAIN_COLOR, RAIN_STROKE_WIDTH),
            ParticleType::Snow | ParticleType::None => (SNOW_COLOR, 0.0),
        };
        let paints = std::array::from_fn(|i| Paint {
            color,
            bucket: u8::try_from(i).unwrap_or(u8::MAX),
            stroke_width,
        });
        Self { kind, paints }
    }

    pub fn kind(&self) -> ParticleType {
        self.kind
    }

    /// Paint for the bucket containing `opacity`.
    pub fn paint(&self, opacity: f64) -> Paint {
        self.paints[usize::from(quantize_opacity(opacity))]
    }
}

/// Draw primitive for one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParticleSprite {
    /// Filled disc.
    Flake {
        center: Point,
        radius: f64,
        paint: Paint,
    },
    /// Short line leaning with the wind.
    Streak { from: Point, to: Point, paint: Paint },
}

impl ParticleSprite {
    fn from_particle(kind: ParticleType, particle: &Particle, paint: Paint) -> Option<Self> {
        match kind {
            ParticleType::None => None,
            ParticleType::Snow => Some(Self::Flake {
                center: particle.position,
                radius: particle.size,
                paint,
            }),
            ParticleType::Rain => {
                let to = particle.position
                    + Vec2::new(
                        particle.speed_x * RAIN_LEAN_FACTOR,
                        particle.size * RAIN_LENGTH_FACTOR,
                    );
                Some(Self::Streak {
                    from: particle.position,
                    to,
                    paint,
                })
            }
        }
    }

    pub fn paint(&self) -> Paint {
        match self {
            Self::Flake { paint, .. } | Self::Streak { paint, .. } => *paint,
        }
    }
}

/// Lazily yields this tick's sprites for the live pool.
///
/// A cache built for a different effect type yields nothing.
pub fn sprites<'a>(
    sim: &'a ParticleSimulator,
    cache: &'a PaintCache,
) -> impl Iterator<Item = ParticleSprite> + 'a {
    let kind = sim.kind();
    let matches = cache.kind() == kind;
    sim.particles()
        .iter()
        .filter(move |_| matches)
        .filter_map(move |p| ParticleSprite::from_particle(kind, p, cache.paint(p.opacity)))
}
