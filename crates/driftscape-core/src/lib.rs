//! Driftscape Core Library
//!
//! Real-time compositing for a desktop wallpaper overlay: image layers that
//! drift with the pointer (parallax), a weather-style particle effect, and an
//! edit mode for dragging, resizing and rotating layers with undo.
//!
//! The [`Compositor`] owns everything. Hosts feed it [`InputEvent`]s, call
//! [`Compositor::tick`] on their render clock and replay the returned
//! [`Frame`] into a [`Renderer`].

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod editing;
pub mod engine;
pub mod error;
pub mod input;
pub mod parallax;
pub mod particle;
pub mod render;
pub mod scene;
pub mod settings;
pub mod stack;
pub mod tracking;

pub use editing::{
    CursorKind, EditAction, LayerManipulator, ManipulationMode, ResizeDirection,
    SelectionIndicator, UndoStack,
};
pub use engine::{AppMode, Compositor, EngineEvent};
pub use error::{ImageLoadError, SceneError};
pub use input::{ClickThrough, EventSource, InputEvent, InputQueue, Key, KeyEvent};
pub use parallax::{ParallaxSettings, recommended_depth_factor};
pub use particle::{ParticleSettings, ParticleSimulator, ParticleType};
pub use render::{Color, DrawCommand, Frame, Paint, Renderer};
pub use scene::{Layer, LayerId, LayerTransform, ParticleEmitter, Scene};
pub use settings::{AppSettings, EngineConfig, LayerSettings, ParticlePresetSettings, WindowSettings};
pub use stack::{FsImageLoader, ImageLoader, ImageResource, RenderInfo, VisualStack};
pub use tracking::{MouseTracker, virtual_display_bounds};

pub use kurbo;
