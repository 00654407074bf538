//! Scene model: layers, emitters and the structural editing operations.
//!
//! z-index 0 is reserved for at most one background layer. Foreground layers
//! occupy 1..=10 and are kept sequential (1..N) after every removal and
//! reorder.

use std::path::{Path, PathBuf};

use kurbo::Rect;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SceneError;
use crate::parallax::{ParallaxSettings, recommended_depth_factor};
use crate::particle::{ParticleSettings, ParticleType};

/// Unique identifier for a layer.
pub type LayerId = Uuid;

pub const MAX_LAYERS: usize = 11;
pub const MAX_FOREGROUND_LAYERS: usize = 10;
pub const BACKGROUND_Z_INDEX: i32 = 0;
pub const MAX_Z_INDEX: i32 = 10;
/// Particle effects may be placed anywhere from just above the background
/// to above every layer.
pub const MIN_PARTICLE_Z_INDEX: i32 = 1;
pub const MAX_PARTICLE_Z_INDEX: i32 = 11;

/// Stored layer geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerTransform {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, clockwise.
    pub rotation: f64,
    pub scale: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl LayerTransform {
    pub fn with_position(self, x: f64, y: f64) -> Self {
        Self { x, y, ..self }
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn with_rotation(self, rotation: f64) -> Self {
        Self { rotation, ..self }
    }

    pub fn with_bounds(self, bounds: Rect) -> Self {
        self.with_position(bounds.x0, bounds.y0)
            .with_size(bounds.width(), bounds.height())
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// One positioned image in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub image_path: PathBuf,
    pub z_index: i32,
    #[serde(default)]
    pub transform: LayerTransform,
    #[serde(default)]
    pub parallax: ParallaxSettings,
    #[serde(default = "default_true")]
    pub visible: bool,
}

fn default_true() -> bool {
    true
}

impl Layer {
    /// Creates a layer with the depth factor recommended for `z_index`.
    pub fn new(name: impl Into<String>, image_path: impl Into<PathBuf>, z_index: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            image_path: image_path.into(),
            z_index,
            transform: LayerTransform::default(),
            parallax: ParallaxSettings::default()
                .with_depth_factor(recommended_depth_factor(z_index)),
            visible: true,
        }
    }

    pub fn is_background(&self) -> bool {
        self.z_index == BACKGROUND_Z_INDEX
    }
}

/// A particle effect source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticleEmitter {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ParticleType,
    pub settings: ParticleSettings,
    pub enabled: bool,
    pub z_index: i32,
}

impl ParticleEmitter {
    pub fn new(kind: ParticleType) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            settings: kind.default_settings(),
            enabled: true,
            z_index: MAX_PARTICLE_Z_INDEX,
        }
    }

    pub fn with_z_index(self, z_index: i32) -> Self {
        Self {
            z_index: z_index.clamp(MIN_PARTICLE_Z_INDEX, MAX_PARTICLE_Z_INDEX),
            ..self
        }
    }
}

/// Layered scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: Uuid,
    pub name: String,
    pub width: f64,
    pub height: f64,
    layers: Vec<Layer>,
    #[serde(default)]
    emitters: Vec<ParticleEmitter>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Untitled", 800.0, 600.0)
    }
}

impl Scene {
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            width,
            height,
            layers: Vec::new(),
            emitters: Vec::new(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn background(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.is_background())
    }

    /// Foreground layers sorted by z-index.
    pub fn foreground(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.iter().filter(|l| !l.is_background()).collect();
        layers.sort_by_key(|l| l.z_index);
        layers
    }

    pub fn foreground_count(&self) -> usize {
        self.layers.iter().filter(|l| !l.is_background()).count()
    }

    /// Inserts a layer at an explicit z-index.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        image_path: impl Into<PathBuf>,
        z_index: i32,
    ) -> Result<LayerId, SceneError> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(SceneError::LayerLimit(MAX_LAYERS));
        }
        if !(BACKGROUND_Z_INDEX..=MAX_Z_INDEX).contains(&z_index) {
            return Err(SceneError::ZIndexOutOfRange(z_index));
        }
        if z_index == BACKGROUND_Z_INDEX && self.background().is_some() {
            return Err(SceneError::BackgroundExists);
        }
        if z_index != BACKGROUND_Z_INDEX && self.foreground_count() >= MAX_FOREGROUND_LAYERS {
            return Err(SceneError::ForegroundLimit(MAX_FOREGROUND_LAYERS));
        }

        let mut layer = Layer::new(name, image_path, z_index);
        if layer.is_background() {
            layer.parallax = ParallaxSettings::background();
        }
        let id = layer.id;
        self.layers.push(layer);
        Ok(id)
    }

    /// Installs `image_path` as the background, replacing any existing one.
    ///
    /// Returns the new layer id and the id of the replaced layer.
    pub fn set_background(&mut self, image_path: &Path) -> (LayerId, Option<LayerId>) {
        let replaced = self.remove_background();
        let mut layer = Layer::new("Background", image_path, BACKGROUND_Z_INDEX);
        layer.parallax = ParallaxSettings::background();
        let id = layer.id;
        self.layers.push(layer);
        (id, replaced)
    }

    pub fn remove_background(&mut self) -> Option<LayerId> {
        let index = self.layers.iter().position(Layer::is_background)?;
        Some(self.layers.remove(index).id)
    }

    /// Appends a foreground layer on top of the existing ones.
    pub fn add_foreground(&mut self, image_path: &Path) -> Result<LayerId, SceneError> {
        let count = self.foreground_count();
        if count >= MAX_FOREGROUND_LAYERS {
            return Err(SceneError::ForegroundLimit(MAX_FOREGROUND_LAYERS));
        }
        let z_index = i32::try_from(count + 1).map_err(|_| SceneError::LayerLimit(MAX_LAYERS))?;
        self.add_layer(format!("Layer {z_index}"), image_path, z_index)
    }

    /// Removes a layer. Remaining foreground layers are renumbered 1..N.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(index);
        if !removed.is_background() {
            self.resequence_foreground();
        }
        Some(removed)
    }

    /// Moves the foreground layer at position `from` (in z order) to `to`
    /// and renumbers 1..N.
    pub fn reorder_foreground(&mut self, from: usize, to: usize) -> Result<(), SceneError> {
        let mut order: Vec<LayerId> = self.foreground().iter().map(|l| l.id).collect();
        let len = order.len();
        if from >= len {
            return Err(SceneError::ReorderOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(SceneError::ReorderOutOfRange { index: to, len });
        }
        let moved = order.remove(from);
        order.insert(to, moved);
        self.assign_sequential(&order);
        Ok(())
    }

    /// Renumbers foreground layers 1..N keeping their relative order.
    pub fn resequence_foreground(&mut self) {
        let order: Vec<LayerId> = self.foreground().iter().map(|l| l.id).collect();
        self.assign_sequential(&order);
    }

    fn assign_sequential(&mut self, order: &[LayerId]) {
        for (z, id) in (1..).zip(order) {
            if let Some(layer) = self.layer_mut(*id) {
                layer.z_index = z;
            }
        }
    }

    pub fn emitters(&self) -> &[ParticleEmitter] {
        &self.emitters
    }

    /// Adds an emitter with the defaults for `kind`.
    pub fn add_emitter(&mut self, kind: ParticleType) -> &ParticleEmitter {
        let index = self.emitters.len();
        self.emitters.push(ParticleEmitter::new(kind));
        &self.emitters[index]
    }

    pub fn remove_emitter(&mut self, id: Uuid) -> bool {
        let before = self.emitters.len();
        self.emitters.retain(|e| e.id != id);
        self.emitters.len() != before
    }

    /// The first enabled emitter.
    pub fn active_emitter(&self) -> Option<&ParticleEmitter> {
        self.emitters.iter().find(|e| e.enabled && !e.kind.is_none())
    }

    /// Replaces every emitter with a single one.
    pub fn set_single_emitter(&mut self, emitter: Option<ParticleEmitter>) {
        self.emitters.clear();
        self.emitters.extend(emitter);
    }
}
