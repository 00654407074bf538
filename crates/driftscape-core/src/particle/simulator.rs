use kurbo::{Point, Size};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{ParticleSettings, ParticleType};

/// Longest frame delta accepted before it is treated as a stall.
pub const MAX_FRAME_DELTA: f64 = 0.5;

/// Delta substituted for a stalled frame.
pub const NOMINAL_FRAME_DELTA: f64 = 1.0 / 60.0;

/// Horizontal spawn band extends this far past each side.
const SPAWN_MARGIN: f64 = 50.0;
const RETIRE_BELOW: f64 = 50.0;
const RETIRE_SIDE: f64 = 100.0;
/// Degrees per second.
const SPIN_RATE: f64 = 30.0;

/// One live particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub size: f64,
    pub speed_y: f64,
    /// Fixed wind sample drawn at spawn.
    pub speed_x: f64,
    pub opacity: f64,
    /// Degrees.
    pub rotation: f64,
}

impl Particle {
    pub fn advance(&mut self, dt: f64) {
        self.position.y += self.speed_y * dt;
        self.position.x += self.speed_x * dt;
        self.rotation += SPIN_RATE * dt;
    }

    fn is_out_of_bounds(&self, bounds: Size) -> bool {
        self.position.y > bounds.height + RETIRE_BELOW
            || self.position.x < -RETIRE_SIDE
            || self.position.x > bounds.width + RETIRE_SIDE
    }
}

/// Bounded particle pool with a fractional spawn accumulator.
#[derive(Debug, Clone)]
pub struct ParticleSimulator {
    kind: ParticleType,
    settings: ParticleSettings,
    particles: Vec<Particle>,
    accumulator: f64,
    bounds: Size,
    active: bool,
    rng: ChaCha8Rng,
}

impl ParticleSimulator {
    /// Creates an inactive simulator with no effect selected.
    pub fn new(seed: u64) -> Self {
        Self {
            kind: ParticleType::None,
            settings: ParticleSettings::default(),
            particles: Vec::new(),
            accumulator: 0.0,
            bounds: Size::ZERO,
            active: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn kind(&self) -> ParticleType {
        self.kind
    }

    pub fn settings(&self) -> &ParticleSettings {
        &self.settings
    }

    pub fn bounds(&self) -> Size {
        self.bounds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Switches the effect. `None` deactivates and empties the pool.
    pub fn set_effect(&mut self, kind: ParticleType, settings: ParticleSettings) {
        self.kind = kind;
        self.settings = settings;
        self.clear();
        self.active = !kind.is_none();
        tracing::debug!("[particles] Effect set to {kind:?} (max {})", settings.max_particles);
    }

    /// Replaces the settings of the current effect, trimming the pool to the
    /// new capacity.
    pub fn set_settings(&mut self, settings: ParticleSettings) {
        self.settings = settings;
        self.particles.truncate(settings.max_particles);
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active && !self.kind.is_none();
        if !self.active {
            self.clear();
        }
    }

    pub fn resize(&mut self, bounds: Size) {
        self.bounds = bounds;
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.accumulator = 0.0;
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        if !self.active || self.bounds.width <= 0.0 || self.bounds.height <= 0.0 {
            return;
        }
        let dt = if dt > MAX_FRAME_DELTA {
            NOMINAL_FRAME_DELTA
        } else {
            dt.max(0.0)
        };

        self.spawn(dt);

        let bounds = self.bounds;
        for particle in &mut self.particles {
            particle.advance(dt);
        }
        self.particles.retain(|p| !p.is_out_of_bounds(bounds));
        tracing::trace!("[particles] {} live", self.particles.len());
    }

    fn spawn(&mut self, dt: f64) {
        let capacity = self.settings.max_particles;
        if self.particles.len() >= capacity {
            return;
        }
        self.accumulator += self.settings.spawn_rate * dt;
        while self.accumulator >= 1.0 && self.particles.len() < capacity {
            let particle = self.spawn_one();
            self.particles.push(particle);
            self.accumulator -= 1.0;
        }
    }

    fn spawn_one(&mut self) -> Particle {
        let s = self.settings;
        let size = lerp(s.min_size, s.max_size, self.rng.random());
        let speed_y = lerp(s.min_speed, s.max_speed, self.rng.random());
        let speed_x = (self.rng.random::<f64>() - 0.5) * 2.0 * s.wind_strength;
        let x = self.rng.random::<f64>() * (self.bounds.width + SPAWN_MARGIN * 2.0) - SPAWN_MARGIN;
        let opacity = s.opacity * (0.7 + 0.3 * self.rng.random::<f64>());
        let rotation = self.rng.random::<f64>() * 360.0;

        Particle {
            position: Point::new(x, -2.0 * size),
            size,
            speed_y,
            speed_x,
            opacity,
            rotation,
        }
    }
}

fn lerp(min: f64, max: f64, t: f64) -> f64 {
    min + t * (max - min)
}
