//! Persisted application settings.
//!
//! Plain serde records; reading and writing files is the host's job.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::particle::ParticleType;
use crate::scene::MAX_PARTICLE_Z_INDEX;
use crate::tracking::DEFAULT_SMOOTHING;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub window: WindowSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image_path: Option<PathBuf>,
    pub layers: Vec<LayerSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle_preset: Option<ParticlePresetSettings>,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSettings {
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 600.0,
            left: None,
            top: None,
        }
    }
}

/// One foreground layer. Geometry is restored only when all four of
/// `x`, `y`, `width` and `height` are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerSettings {
    pub image_path: PathBuf,
    pub name: String,
    pub z_index: i32,
    pub depth_factor: f64,
    pub max_offset_x: f64,
    pub max_offset_y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub rotation: f64,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            image_path: PathBuf::new(),
            name: String::new(),
            z_index: 1,
            depth_factor: 0.5,
            max_offset_x: 50.0,
            max_offset_y: 30.0,
            x: None,
            y: None,
            width: None,
            height: None,
            rotation: 0.0,
        }
    }
}

impl LayerSettings {
    /// Stored geometry as `(x, y, width, height)` if complete.
    pub fn geometry(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.x?, self.y?, self.width?, self.height?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticlePresetSettings {
    #[serde(rename = "type")]
    pub kind: ParticleType,
    pub z_index: i32,
    pub max_particles: usize,
    pub opacity: f64,
}

impl Default for ParticlePresetSettings {
    fn default() -> Self {
        Self {
            kind: ParticleType::None,
            z_index: MAX_PARTICLE_Z_INDEX,
            max_particles: 200,
            opacity: 0.8,
        }
    }
}

/// Tuning knobs for the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub smoothing_factor: f64,
    /// Fixed particle seed; random when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particle_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: DEFAULT_SMOOTHING,
            particle_seed: None,
        }
    }
}
