use serde::{Deserialize, Serialize};

/// Particle effect kind. Selects default settings and draw style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ParticleType {
    #[default]
    None,
    Snow,
    Rain,
}

impl ParticleType {
    /// Default settings for this effect.
    pub fn default_settings(self) -> ParticleSettings {
        match self {
            Self::None => ParticleSettings::default(),
            Self::Snow => ParticleSettings {
                max_particles: 200,
                spawn_rate: 15.0,
                min_size: 2.0,
                max_size: 6.0,
                min_speed: 30.0,
                max_speed: 80.0,
                wind_strength: 10.0,
                opacity: 0.7,
            },
            Self::Rain => ParticleSettings {
                max_particles: 300,
                spawn_rate: 30.0,
                min_size: 1.0,
                max_size: 3.0,
                min_speed: 200.0,
                max_speed: 400.0,
                wind_strength: 20.0,
                opacity: 0.5,
            },
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

/// Spawn and appearance parameters for one emitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleSettings {
    pub max_particles: usize,
    /// Particles per second.
    pub spawn_rate: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub wind_strength: f64,
    pub opacity: f64,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            max_particles: 100,
            spawn_rate: 10.0,
            min_size: 2.0,
            max_size: 6.0,
            min_speed: 50.0,
            max_speed: 150.0,
            wind_strength: 0.0,
            opacity: 0.8,
        }
    }
}

impl ParticleSettings {
    pub fn with_max_particles(self, max_particles: usize) -> Self {
        Self {
            max_particles,
            ..self
        }
    }

    pub fn with_opacity(self, opacity: f64) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            ..self
        }
    }

    pub fn with_spawn_rate(self, spawn_rate: f64) -> Self {
        Self { spawn_rate, ..self }
    }
}
