//! The compositor: owns the scene and every core component and routes input
//! between them.
//!
//! In viewer mode global pointer samples drive parallax offsets. In edit mode
//! canvas pointer events drive the layer manipulator and parallax is frozen
//! at rest.

use std::path::Path;

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::editing::{
    CursorKind, GestureTarget, LayerManipulator, SelectionIndicator, UndoStack, classify_press,
};
use crate::input::{ClickThrough, InputEvent, InputQueue, Key, KeyEvent};
use crate::parallax::ParallaxSettings;
use crate::particle::{PaintCache, ParticleSimulator, ParticleType, sprites};
use crate::render::{DrawCommand, Frame};
use crate::scene::{
    LayerId, MAX_PARTICLE_Z_INDEX, MIN_PARTICLE_Z_INDEX, ParticleEmitter, Scene,
};
use crate::settings::{AppSettings, EngineConfig, LayerSettings, ParticlePresetSettings};
use crate::stack::{ImageLoader, VisualStack};
use crate::tracking::MouseTracker;

/// Interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppMode {
    /// Click-through overlay animated by the pointer.
    #[default]
    Viewer,
    /// Interactive layer editing.
    Edit,
}

/// Change notification queued after each mutating operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    ModeChanged(AppMode),
    SelectionChanged(Option<LayerId>),
    LayerGeometryChanged(LayerId),
    LayersChanged,
    ParticlesChanged,
}

pub struct Compositor {
    config: EngineConfig,
    scene: Scene,
    stack: VisualStack,
    tracker: MouseTracker,
    particles: ParticleSimulator,
    paints: PaintCache,
    particle_z: i32,
    manipulator: LayerManipulator,
    undo: UndoStack,
    mode: AppMode,
    loader: Box<dyn ImageLoader>,
    click_through: Box<dyn ClickThrough>,
    events: Vec<EngineEvent>,
}

impl Compositor {
    /// Creates an empty compositor in viewer mode.
    pub fn new(
        config: EngineConfig,
        viewport: Size,
        loader: Box<dyn ImageLoader>,
        mut click_through: Box<dyn ClickThrough>,
    ) -> Self {
        let seed = config.particle_seed.unwrap_or_else(rand::random);
        let mut particles = ParticleSimulator::new(seed);
        particles.resize(viewport);
        click_through.set_click_through(true);

        Self {
            config,
            scene: Scene::new("Untitled", viewport.width, viewport.height),
            stack: VisualStack::new(viewport),
            tracker: MouseTracker::new(config.smoothing_factor),
            particles,
            paints: PaintCache::new(ParticleType::None),
            particle_z: MAX_PARTICLE_Z_INDEX,
            manipulator: LayerManipulator::new(),
            undo: UndoStack::new(),
            mode: AppMode::Viewer,
            loader,
            click_through,
            events: Vec::new(),
        }
    }

    /// Captures the virtual display the pointer moves across.
    pub fn initialize(&mut self, display: Rect) {
        self.tracker.initialize(display);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn stack(&self) -> &VisualStack {
        &self.stack
    }

    pub fn particles(&self) -> &ParticleSimulator {
        &self.particles
    }

    pub fn manipulator(&self) -> &LayerManipulator {
        &self.manipulator
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn viewport(&self) -> Size {
        self.stack.viewport()
    }

    /// Drains queued change notifications.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: EngineEvent) {
        tracing::trace!("[engine] {event:?}");
        self.events.push(event);
    }

    // ========================================================================
    // Mode
    // ========================================================================

    /// Switches mode. Returns `false` when already in `mode`.
    pub fn set_mode(&mut self, mode: AppMode) -> bool {
        if mode == self.mode {
            return false;
        }
        if self.mode == AppMode::Edit {
            self.finish_gesture();
            if self.manipulator.selected().is_some() {
                self.manipulator.clear_selection();
                self.emit(EngineEvent::SelectionChanged(None));
            }
        }
        if mode == AppMode::Edit {
            let ids: Vec<LayerId> = self.stack.layer_ids().collect();
            self.stack
                .update_all_offsets(ids.into_iter().map(|id| (id, Vec2::ZERO)));
        }

        self.mode = mode;
        self.click_through.set_click_through(mode == AppMode::Viewer);
        tracing::info!("[engine] Mode changed to {mode:?}");
        self.emit(EngineEvent::ModeChanged(mode));
        true
    }

    pub fn toggle_mode(&mut self) {
        let next = match self.mode {
            AppMode::Viewer => AppMode::Edit,
            AppMode::Edit => AppMode::Viewer,
        };
        self.set_mode(next);
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Handles every event queued since the last call.
    pub fn drain(&mut self, queue: &InputQueue) -> usize {
        let events = queue.drain();
        let count = events.len();
        for event in events {
            self.handle(event);
        }
        count
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerSample(point) => self.on_pointer_sample(point),
            InputEvent::PointerPressed(point) => self.on_press(point),
            InputEvent::PointerMoved(point) => self.on_move(point),
            InputEvent::PointerReleased(_) => self.on_release(),
            InputEvent::Key(key) => self.on_key(key),
            InputEvent::EditMode(edit) => {
                self.set_mode(if edit { AppMode::Edit } else { AppMode::Viewer });
            }
        }
    }

    fn on_pointer_sample(&mut self, point: Point) {
        if self.mode == AppMode::Edit {
            return;
        }
        let normalized = self.tracker.normalize(point);
        let offsets: Vec<(LayerId, Vec2)> = self
            .scene
            .layers()
            .iter()
            .map(|l| (l.id, l.parallax.offset(normalized)))
            .collect();
        self.stack.update_all_offsets(offsets);
    }

    fn on_press(&mut self, point: Point) {
        if self.mode != AppMode::Edit {
            return;
        }
        let indicator = self.manipulator.indicator(&self.stack);
        match classify_press(point, indicator.as_ref(), &self.stack) {
            GestureTarget::RotationHandle => {
                self.manipulator.start_rotation(point, &self.stack);
            }
            GestureTarget::ResizeHandle(direction) => {
                self.manipulator.start_resize(point, direction, &self.stack);
            }
            GestureTarget::Body(id) => {
                if self.manipulator.selected() != Some(id) && self.manipulator.select(id, &self.stack)
                {
                    self.emit(EngineEvent::SelectionChanged(Some(id)));
                }
                self.manipulator.start_drag(point, &self.stack);
            }
            GestureTarget::Empty => {
                if !self.manipulator.is_active() && self.manipulator.selected().is_some() {
                    self.manipulator.clear_selection();
                    self.emit(EngineEvent::SelectionChanged(None));
                }
            }
        }
    }

    fn on_move(&mut self, point: Point) {
        if self.mode != AppMode::Edit {
            return;
        }
        if self.manipulator.update(point, &mut self.stack)
            && let Some(id) = self.manipulator.selected()
        {
            self.emit(EngineEvent::LayerGeometryChanged(id));
        }
    }

    fn on_release(&mut self) {
        if self.mode == AppMode::Edit {
            self.finish_gesture();
        }
    }

    fn on_key(&mut self, event: KeyEvent) {
        match (event.key, event.ctrl, self.mode) {
            (Key::F12, _, _) => self.toggle_mode(),
            (Key::Escape, _, AppMode::Edit) => {
                self.set_mode(AppMode::Viewer);
            }
            (Key::Z, true, AppMode::Edit) => {
                self.undo();
            }
            _ => {}
        }
    }

    fn finish_gesture(&mut self) {
        if !self.manipulator.is_active() {
            return;
        }
        let selected = self.manipulator.selected();
        self.manipulator.end_all(&self.stack, &mut self.undo);
        if let Some(id) = selected {
            self.sync_transform(id);
            self.emit(EngineEvent::LayerGeometryChanged(id));
        }
    }

    /// Cursor to show over `point`.
    pub fn cursor_at(&self, point: Point) -> CursorKind {
        if self.mode != AppMode::Edit {
            return CursorKind::Default;
        }
        if let Some(indicator) = self.manipulator.indicator(&self.stack) {
            let cursor = indicator.cursor_at(point);
            if cursor != CursorKind::Default {
                return cursor;
            }
        }
        if self.stack.hit_test_foreground(point).is_some() {
            CursorKind::Move
        } else {
            CursorKind::Default
        }
    }

    pub fn selection_indicator(&self) -> Option<SelectionIndicator> {
        if self.mode != AppMode::Edit {
            return None;
        }
        self.manipulator.indicator(&self.stack)
    }

    /// Selects a foreground layer while editing.
    pub fn select(&mut self, id: LayerId) -> bool {
        if self.mode != AppMode::Edit || !self.manipulator.select(id, &self.stack) {
            return false;
        }
        self.emit(EngineEvent::SelectionChanged(Some(id)));
        true
    }

    /// Reverts the most recent gesture.
    pub fn undo(&mut self) -> bool {
        if self.manipulator.is_active() {
            return false;
        }
        let Some(action) = self.undo.undo(&mut self.stack) else {
            return false;
        };
        let id = action.layer();
        self.sync_transform(id);
        self.emit(EngineEvent::LayerGeometryChanged(id));
        true
    }

    // ========================================================================
    // Scene editing
    // ========================================================================

    /// Installs the background image, replacing any existing background.
    pub fn set_background(&mut self, path: &Path) -> bool {
        let (id, replaced) = self.scene.set_background(path);
        if let Some(old) = replaced {
            self.stack.remove_layer(old);
            self.undo.forget_layer(old);
        }
        let Some(layer) = self.scene.layer(id) else {
            return false;
        };
        if !self.stack.add_layer(layer, self.loader.as_ref()) {
            self.scene.remove_layer(id);
            if replaced.is_some() {
                self.emit(EngineEvent::LayersChanged);
            }
            return false;
        }
        self.stack.scale_background_to_fit(id, self.stack.viewport());
        self.sync_transform(id);
        self.emit(EngineEvent::LayersChanged);
        true
    }

    pub fn remove_background(&mut self) -> bool {
        let Some(id) = self.scene.background().map(|l| l.id) else {
            return false;
        };
        self.remove_layer(id)
    }

    /// Adds a foreground layer above the existing ones.
    pub fn add_layer(&mut self, path: &Path) -> Option<LayerId> {
        let id = match self.scene.add_foreground(path) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!("[engine] Cannot add layer {}: {err}", path.display());
                return None;
            }
        };
        if !self.load_layer(id, None) {
            return None;
        }
        self.emit(EngineEvent::LayersChanged);
        Some(id)
    }

    /// Loads a scene layer into the stack, rolling it back out of the scene
    /// when its image cannot be loaded.
    fn load_layer(&mut self, id: LayerId, geometry: Option<Rect>) -> bool {
        let Some(layer) = self.scene.layer(id) else {
            return false;
        };
        let rotation = layer.transform.rotation;
        if !self.stack.add_layer(layer, self.loader.as_ref()) {
            self.scene.remove_layer(id);
            self.sync_z_indices();
            return false;
        }
        if let Some(bounds) = geometry {
            self.stack.update_transform(id, bounds);
        }
        self.stack.update_rotation(id, rotation);
        self.sync_transform(id);
        true
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        let Some(removed) = self.scene.remove_layer(id) else {
            return false;
        };
        self.stack.remove_layer(id);
        self.undo.forget_layer(id);
        if self.manipulator.selected() == Some(id) {
            self.manipulator.clear_selection();
            self.emit(EngineEvent::SelectionChanged(None));
        }
        if !removed.is_background() {
            self.sync_z_indices();
        }
        self.emit(EngineEvent::LayersChanged);
        true
    }

    /// Moves the foreground layer at z-order position `from` to `to`.
    pub fn reorder_layer(&mut self, from: usize, to: usize) -> bool {
        if let Err(err) = self.scene.reorder_foreground(from, to) {
            tracing::warn!("[engine] {err}");
            return false;
        }
        self.sync_z_indices();
        self.emit(EngineEvent::LayersChanged);
        true
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        let Some(layer) = self.scene.layer_mut(id) else {
            return false;
        };
        layer.visible = visible;
        self.stack.set_visible(id, visible);
        if !visible && self.manipulator.selected() == Some(id) {
            self.manipulator.clear_selection();
            self.emit(EngineEvent::SelectionChanged(None));
        }
        self.emit(EngineEvent::LayersChanged);
        true
    }

    pub fn set_layer_parallax(&mut self, id: LayerId, parallax: ParallaxSettings) -> bool {
        let Some(layer) = self.scene.layer_mut(id) else {
            return false;
        };
        layer.parallax = parallax;
        self.emit(EngineEvent::LayersChanged);
        true
    }

    fn sync_z_indices(&mut self) {
        for layer in self.scene.layers() {
            self.stack.update_z_index(layer.id, layer.z_index);
        }
    }

    /// Copies the stack's geometry back into the scene.
    fn sync_transform(&mut self, id: LayerId) {
        let Some(info) = self.stack.render_info(id) else {
            return;
        };
        if let Some(layer) = self.scene.layer_mut(id) {
            layer.transform = layer
                .transform
                .with_bounds(info.bounds())
                .with_rotation(info.rotation);
        }
    }

    /// Resizes the drawing surface.
    pub fn resize(&mut self, viewport: Size) {
        self.stack.set_viewport(viewport);
        self.particles.resize(viewport);
        self.scene.width = viewport.width;
        self.scene.height = viewport.height;
        if let Some(id) = self.scene.background().map(|l| l.id) {
            self.stack.scale_background_to_fit(id, viewport);
            self.sync_transform(id);
        }
    }

    // ========================================================================
    // Particles
    // ========================================================================

    pub fn set_particle_preset(&mut self, preset: ParticlePresetSettings) {
        let z_index = preset.z_index.clamp(MIN_PARTICLE_Z_INDEX, MAX_PARTICLE_Z_INDEX);
        if preset.kind.is_none() {
            self.scene.set_single_emitter(None);
            self.particles
                .set_effect(ParticleType::None, ParticleType::None.default_settings());
        } else {
            let settings = preset
                .kind
                .default_settings()
                .with_max_particles(preset.max_particles)
                .with_opacity(preset.opacity);
            let emitter = ParticleEmitter {
                settings,
                ..ParticleEmitter::new(preset.kind)
            }
            .with_z_index(z_index);
            self.scene.set_single_emitter(Some(emitter));
            self.particles.set_effect(preset.kind, settings);
        }
        self.paints = PaintCache::new(preset.kind);
        self.particle_z = z_index;
        self.emit(EngineEvent::ParticlesChanged);
    }

    pub fn particle_preset(&self) -> ParticlePresetSettings {
        match self.scene.active_emitter() {
            Some(emitter) => ParticlePresetSettings {
                kind: emitter.kind,
                z_index: emitter.z_index,
                max_particles: emitter.settings.max_particles,
                opacity: emitter.settings.opacity,
            },
            None => ParticlePresetSettings::default(),
        }
    }

    pub fn set_particles_active(&mut self, active: bool) {
        self.particles.set_active(active);
        self.emit(EngineEvent::ParticlesChanged);
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Advances animation by `dt` seconds and returns the frame to draw.
    pub fn tick(&mut self, dt: f64) -> Frame {
        self.particles.step(dt);
        self.frame()
    }

    /// Draw commands for the current state, back to front. Particles paint
    /// above every layer below their z-index.
    pub fn frame(&self) -> Frame {
        let mut commands = Vec::with_capacity(self.stack.len() + self.particles.len());
        let mut particles_drawn = false;
        for (z_index, command) in self.stack.draw_commands() {
            if !particles_drawn && z_index >= self.particle_z {
                self.push_particles(&mut commands);
                particles_drawn = true;
            }
            commands.push(command);
        }
        if !particles_drawn {
            self.push_particles(&mut commands);
        }
        Frame { commands }
    }

    fn push_particles(&self, commands: &mut Vec<DrawCommand>) {
        commands.extend(sprites(&self.particles, &self.paints).map(DrawCommand::Particle));
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Rebuilds the scene from persisted settings.
    pub fn apply_settings(&mut self, settings: &AppSettings) {
        self.manipulator.clear_selection();
        self.undo.clear();
        self.stack.clear();
        let viewport = self.stack.viewport();
        self.scene = Scene::new("Untitled", viewport.width, viewport.height);
        self.config = settings.engine;
        self.tracker.set_smoothing(settings.engine.smoothing_factor);

        if let Some(path) = &settings.background_image_path {
            self.set_background(path);
        }

        let mut layers: Vec<&LayerSettings> = settings.layers.iter().collect();
        layers.sort_by_key(|l| l.z_index);
        for entry in layers {
            self.restore_layer(entry);
        }

        self.set_particle_preset(settings.particle_preset.unwrap_or_default());
        tracing::info!(
            "[engine] Restored {} layers from settings",
            self.scene.layer_count()
        );
        self.emit(EngineEvent::LayersChanged);
    }

    fn restore_layer(&mut self, entry: &LayerSettings) {
        let id = match self.scene.add_foreground(&entry.image_path) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(
                    "[engine] Skipping layer {}: {err}",
                    entry.image_path.display()
                );
                return;
            }
        };
        let geometry = entry
            .geometry()
            .map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h));
        if let Some(layer) = self.scene.layer_mut(id) {
            if !entry.name.is_empty() {
                layer.name.clone_from(&entry.name);
            }
            layer.parallax = ParallaxSettings::default()
                .with_depth_factor(entry.depth_factor)
                .with_max_offset(entry.max_offset_x, entry.max_offset_y);
            layer.transform = layer.transform.with_rotation(entry.rotation);
            if let Some(bounds) = geometry {
                layer.transform = layer.transform.with_bounds(bounds);
            }
        }
        self.load_layer(id, geometry);
    }

    /// Exports the scene. Window placement is left at its defaults.
    pub fn to_settings(&self) -> AppSettings {
        let layers = self
            .scene
            .foreground()
            .into_iter()
            .map(|l| LayerSettings {
                image_path: l.image_path.clone(),
                name: l.name.clone(),
                z_index: l.z_index,
                depth_factor: l.parallax.depth_factor,
                max_offset_x: l.parallax.max_offset_x,
                max_offset_y: l.parallax.max_offset_y,
                x: Some(l.transform.x),
                y: Some(l.transform.y),
                width: Some(l.transform.width),
                height: Some(l.transform.height),
                rotation: l.transform.rotation,
            })
            .collect();
        let preset = self.particle_preset();

        AppSettings {
            background_image_path: self.scene.background().map(|l| l.image_path.clone()),
            layers,
            particle_preset: (!preset.kind.is_none()).then_some(preset),
            engine: self.config,
            ..AppSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::editing::ManipulationMode;
    use crate::stack::tests::FixedLoader;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<bool>>>);

    impl ClickThrough for Recorder {
        fn set_click_through(&mut self, enabled: bool) {
            self.0.lock().push(enabled);
        }
    }

    fn compositor() -> (Compositor, Recorder) {
        let recorder = Recorder::default();
        let config = EngineConfig {
            smoothing_factor: 1.0,
            particle_seed: Some(7),
        };
        let mut compositor = Compositor::new(
            config,
            Size::new(800.0, 600.0),
            Box::new(FixedLoader(200, 100)),
            Box::new(recorder.clone()),
        );
        compositor.initialize(Rect::new(0.0, 0.0, 1000.0, 1000.0));
        (compositor, recorder)
    }

    fn edit(compositor: &mut Compositor) {
        compositor.handle(InputEvent::Key(KeyEvent::new(Key::F12)));
        assert_eq!(compositor.mode(), AppMode::Edit);
    }

    #[test]
    fn test_mode_toggle_drives_click_through() {
        let (mut c, recorder) = compositor();
        assert_eq!(c.mode(), AppMode::Viewer);
        assert!(!c.set_mode(AppMode::Viewer));
        edit(&mut c);
        c.handle(InputEvent::Key(KeyEvent::new(Key::Escape)));
        assert_eq!(c.mode(), AppMode::Viewer);
        assert_eq!(*recorder.0.lock(), vec![true, false, true]);
        let modes: Vec<_> = c
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::ModeChanged(_)))
            .collect();
        assert_eq!(
            modes,
            vec![
                EngineEvent::ModeChanged(AppMode::Edit),
                EngineEvent::ModeChanged(AppMode::Viewer)
            ]
        );
    }

    #[test]
    fn test_viewer_pointer_drives_parallax() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        // depth 0.3 for z=1, max 50x30
        c.handle(InputEvent::PointerSample(Point::new(1000.0, 500.0)));
        let offset = c.stack().offset(id);
        assert!((offset.x - 15.0).abs() < 0.001);
        assert!(offset.y.abs() < 0.001);
        // stored geometry is untouched
        assert_eq!(c.stack().bounds(id), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
    }

    #[test]
    fn test_edit_mode_ignores_global_pointer_and_rests_layers() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        c.handle(InputEvent::PointerSample(Point::new(1000.0, 1000.0)));
        assert!(c.stack().offset(id).x > 0.0);
        edit(&mut c);
        assert_eq!(c.stack().offset(id), Vec2::ZERO);
        c.handle(InputEvent::PointerSample(Point::new(0.0, 0.0)));
        assert_eq!(c.stack().offset(id), Vec2::ZERO);
    }

    #[test]
    fn test_drag_gesture_updates_scene_and_undo() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        edit(&mut c);

        c.handle(InputEvent::PointerPressed(Point::new(50.0, 50.0)));
        assert_eq!(c.manipulator().selected(), Some(id));
        assert_eq!(c.manipulator().mode(), ManipulationMode::Dragging);
        c.handle(InputEvent::PointerMoved(Point::new(80.0, 90.0)));
        c.handle(InputEvent::PointerReleased(Point::new(80.0, 90.0)));

        let t = c.scene().layer(id).unwrap().transform;
        assert!((t.x - 30.0).abs() < 0.001);
        assert!((t.y - 40.0).abs() < 0.001);
        assert_eq!(c.undo_stack().len(), 1);

        c.handle(InputEvent::Key(KeyEvent::with_ctrl(Key::Z)));
        let t = c.scene().layer(id).unwrap().transform;
        assert!(t.x.abs() < 0.001);
        assert!(t.y.abs() < 0.001);
        assert!(!c.undo_stack().can_undo());
    }

    #[test]
    fn test_press_on_empty_clears_selection() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        edit(&mut c);
        assert!(c.select(id));
        c.handle(InputEvent::PointerPressed(Point::new(700.0, 500.0)));
        assert_eq!(c.manipulator().selected(), None);
    }

    #[test]
    fn test_background_is_not_selectable() {
        let (mut c, _) = compositor();
        assert!(c.set_background(Path::new("bg.png")));
        edit(&mut c);
        c.handle(InputEvent::PointerPressed(Point::new(400.0, 300.0)));
        assert_eq!(c.manipulator().selected(), None);
        assert_eq!(c.manipulator().mode(), ManipulationMode::None);
        let bg = c.scene().background().unwrap().id;
        assert!(!c.select(bg));
    }

    #[test]
    fn test_background_covers_viewport() {
        let (mut c, _) = compositor();
        assert!(c.set_background(Path::new("bg.png")));
        let bg = c.scene().background().unwrap().id;
        // 200x100 into 800x600: ratio 6 -> 1200x600 centered
        assert_eq!(
            c.stack().bounds(bg),
            Some(Rect::new(-200.0, 0.0, 1000.0, 600.0))
        );
        c.resize(Size::new(400.0, 400.0));
        assert_eq!(
            c.stack().bounds(bg),
            Some(Rect::new(-200.0, 0.0, 600.0, 400.0))
        );
    }

    #[test]
    fn test_rotation_handle_press_starts_rotation() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        edit(&mut c);
        assert!(c.select(id));
        // rotation handle sits 30 above the top edge midpoint
        c.handle(InputEvent::PointerPressed(Point::new(100.0, -30.0)));
        assert_eq!(c.manipulator().mode(), ManipulationMode::Rotating);
        c.handle(InputEvent::PointerMoved(Point::new(200.0, 50.0)));
        c.handle(InputEvent::PointerReleased(Point::new(200.0, 50.0)));
        let rotation = c.scene().layer(id).unwrap().transform.rotation;
        assert!((rotation - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_leaving_edit_finishes_gesture() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        edit(&mut c);
        c.handle(InputEvent::PointerPressed(Point::new(10.0, 10.0)));
        c.handle(InputEvent::PointerMoved(Point::new(20.0, 10.0)));
        c.handle(InputEvent::EditMode(false));
        assert_eq!(c.manipulator().mode(), ManipulationMode::None);
        assert_eq!(c.manipulator().selected(), None);
        assert_eq!(c.undo_stack().len(), 1);
        assert!((c.scene().layer(id).unwrap().transform.x - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_remove_and_reorder_keep_z_sequential() {
        let (mut c, _) = compositor();
        let a = c.add_layer(Path::new("a.png")).unwrap();
        let b = c.add_layer(Path::new("b.png")).unwrap();
        let d = c.add_layer(Path::new("d.png")).unwrap();

        assert!(c.reorder_layer(2, 0));
        assert_eq!(c.stack().paint_order(), &[d, a, b]);
        assert_eq!(c.scene().layer(d).unwrap().z_index, 1);

        assert!(c.remove_layer(a));
        assert_eq!(c.stack().paint_order(), &[d, b]);
        assert_eq!(c.scene().layer(b).unwrap().z_index, 2);
        assert!(!c.remove_layer(a));
        assert!(!c.reorder_layer(5, 0));
    }

    #[test]
    fn test_failed_image_rolls_back_layer() {
        let (mut c, _) = compositor();
        assert!(c.add_layer(Path::new("missing.png")).is_none());
        assert_eq!(c.scene().layer_count(), 0);
        assert!(c.stack().is_empty());
    }

    #[test]
    fn test_layer_limit_reports_failure() {
        let (mut c, _) = compositor();
        for i in 0..10 {
            assert!(c.add_layer(Path::new(&format!("{i}.png"))).is_some());
        }
        assert!(c.add_layer(Path::new("extra.png")).is_none());
        assert_eq!(c.scene().foreground_count(), 10);
    }

    #[test]
    fn test_particles_paint_at_preset_depth() {
        let (mut c, _) = compositor();
        let low = c.add_layer(Path::new("low.png")).unwrap();
        let high = c.add_layer(Path::new("high.png")).unwrap();
        c.set_particle_preset(ParticlePresetSettings {
            kind: ParticleType::Snow,
            z_index: 2,
            max_particles: 50,
            opacity: 0.8,
        });
        let mut frame = Frame::default();
        for _ in 0..20 {
            frame = c.tick(0.1);
        }
        assert!(frame.particle_count() > 0);
        assert!(frame.particle_count() <= 50);

        let low_pos = frame
            .commands
            .iter()
            .position(|cmd| matches!(cmd, DrawCommand::Image { layer, .. } if *layer == low))
            .unwrap();
        let high_pos = frame
            .commands
            .iter()
            .position(|cmd| matches!(cmd, DrawCommand::Image { layer, .. } if *layer == high))
            .unwrap();
        let first_particle = frame
            .commands
            .iter()
            .position(|cmd| matches!(cmd, DrawCommand::Particle(_)))
            .unwrap();
        assert!(low_pos < first_particle);
        assert!(first_particle < high_pos);
    }

    #[test]
    fn test_preset_z_is_clamped_and_none_clears() {
        let (mut c, _) = compositor();
        c.set_particle_preset(ParticlePresetSettings {
            kind: ParticleType::Rain,
            z_index: 99,
            ..ParticlePresetSettings::default()
        });
        assert_eq!(c.particle_preset().z_index, 11);
        assert_eq!(c.particle_preset().kind, ParticleType::Rain);
        for _ in 0..10 {
            c.tick(0.1);
        }
        assert!(!c.particles().is_empty());

        c.set_particle_preset(ParticlePresetSettings::default());
        assert!(c.particles().is_empty());
        assert!(c.scene().emitters().is_empty());
        assert_eq!(c.tick(0.1).particle_count(), 0);
    }

    #[test]
    fn test_settings_round_trip() {
        let (mut c, _) = compositor();
        c.set_background(Path::new("bg.png"));
        let a = c.add_layer(Path::new("a.png")).unwrap();
        c.add_layer(Path::new("b.png")).unwrap();
        edit(&mut c);
        c.handle(InputEvent::PointerPressed(Point::new(10.0, 10.0)));
        c.handle(InputEvent::PointerMoved(Point::new(60.0, 30.0)));
        c.handle(InputEvent::PointerReleased(Point::new(60.0, 30.0)));
        assert_eq!(c.manipulator().selected(), Some(c.scene().foreground()[1].id));
        assert!(c.select(a));
        c.set_particle_preset(ParticlePresetSettings {
            kind: ParticleType::Snow,
            z_index: 3,
            max_particles: 120,
            opacity: 0.6,
        });

        let settings = c.to_settings();
        assert_eq!(settings.layers.len(), 2);
        assert_eq!(settings.background_image_path.as_deref(), Some(Path::new("bg.png")));
        assert_eq!(settings.layers[1].geometry(), Some((50.0, 20.0, 200.0, 100.0)));

        let json = serde_json::to_string(&settings).unwrap();
        let parsed: AppSettings = serde_json::from_str(&json).unwrap();

        let (mut restored, _) = compositor();
        restored.apply_settings(&parsed);
        assert_eq!(restored.scene().layer_count(), 3);
        let fg = restored.scene().foreground();
        assert_eq!(fg[1].image_path, Path::new("b.png"));
        assert_eq!(
            restored.stack().bounds(fg[1].id),
            Some(Rect::new(50.0, 20.0, 250.0, 120.0))
        );
        assert_eq!(restored.particle_preset().max_particles, 120);
        assert_eq!(restored.particle_preset().z_index, 3);
    }

    #[test]
    fn test_restore_without_geometry_uses_contain_layout() {
        let (mut c, _) = compositor();
        let settings = AppSettings {
            layers: vec![
                LayerSettings {
                    image_path: "second.png".into(),
                    z_index: 7,
                    ..LayerSettings::default()
                },
                LayerSettings {
                    image_path: "first.png".into(),
                    z_index: 3,
                    x: Some(5.0),
                    ..LayerSettings::default()
                },
            ],
            ..AppSettings::default()
        };
        c.apply_settings(&settings);
        let fg = c.scene().foreground();
        assert_eq!(fg[0].image_path, Path::new("first.png"));
        assert_eq!(fg[0].z_index, 1);
        assert_eq!(fg[1].z_index, 2);
        assert_eq!(c.stack().bounds(fg[0].id), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
        assert!((fg[0].parallax.depth_factor - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_remove_background_keeps_foreground() {
        let (mut c, _) = compositor();
        assert!(!c.remove_background());
        assert!(c.set_background(Path::new("bg.png")));
        let fg = c.add_layer(Path::new("a.png")).unwrap();
        let bg = c.scene().background().unwrap().id;
        c.take_events();

        assert!(c.remove_background());
        assert!(c.scene().background().is_none());
        assert!(!c.stack().contains(bg));
        assert_eq!(c.scene().layer(fg).unwrap().z_index, 1);
        assert_eq!(c.frame().layers().collect::<Vec<_>>(), vec![fg]);
        assert_eq!(c.take_events(), vec![EngineEvent::LayersChanged]);
        assert!(!c.remove_background());
    }

    #[test]
    fn test_hiding_layer_drops_it_from_frame_and_selection() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        edit(&mut c);
        assert!(c.select(id));
        c.take_events();

        assert!(c.set_layer_visible(id, false));
        assert_eq!(c.manipulator().selected(), None);
        assert_eq!(
            c.take_events(),
            vec![EngineEvent::SelectionChanged(None), EngineEvent::LayersChanged]
        );
        assert!(!c.scene().layer(id).unwrap().visible);
        assert!(c.frame().is_empty());
        assert!(!c.select(id));
        c.handle(InputEvent::PointerPressed(Point::new(50.0, 50.0)));
        assert_eq!(c.manipulator().selected(), None);

        assert!(c.set_layer_visible(id, true));
        assert_eq!(c.frame().layers().collect::<Vec<_>>(), vec![id]);
        assert!(c.select(id));
        assert!(!c.set_layer_visible(LayerId::new_v4(), false));
    }

    #[test]
    fn test_layer_parallax_applies_on_next_sample() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        c.take_events();
        let parallax = ParallaxSettings::default().with_depth_factor(1.0);
        assert!(c.set_layer_parallax(id, parallax));
        assert_eq!(c.take_events(), vec![EngineEvent::LayersChanged]);
        assert_eq!(c.scene().layer(id).unwrap().parallax, parallax);

        c.handle(InputEvent::PointerSample(Point::new(1000.0, 1000.0)));
        let offset = c.stack().offset(id);
        assert!((offset.x - 50.0).abs() < 0.001);
        assert!((offset.y - 30.0).abs() < 0.001);
        assert!(!c.set_layer_parallax(LayerId::new_v4(), parallax));
    }

    #[test]
    fn test_particles_can_be_paused() {
        let (mut c, _) = compositor();
        c.set_particle_preset(ParticlePresetSettings {
            kind: ParticleType::Snow,
            ..ParticlePresetSettings::default()
        });
        for _ in 0..10 {
            c.tick(0.1);
        }
        assert!(!c.particles().is_empty());
        c.take_events();

        c.set_particles_active(false);
        assert_eq!(c.take_events(), vec![EngineEvent::ParticlesChanged]);
        assert!(c.particles().is_empty());
        assert_eq!(c.tick(0.1).particle_count(), 0);

        c.set_particles_active(true);
        for _ in 0..10 {
            c.tick(0.1);
        }
        assert!(!c.particles().is_empty());
    }

    #[test]
    fn test_drain_processes_queue() {
        let (mut c, _) = compositor();
        let queue = InputQueue::new();
        queue.push(InputEvent::EditMode(true));
        queue.push(InputEvent::Key(KeyEvent::new(Key::Other(42))));
        assert_eq!(c.drain(&queue), 2);
        assert_eq!(c.mode(), AppMode::Edit);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_cursor_hints() {
        let (mut c, _) = compositor();
        let id = c.add_layer(Path::new("a.png")).unwrap();
        assert_eq!(c.cursor_at(Point::new(50.0, 50.0)), CursorKind::Default);
        edit(&mut c);
        assert_eq!(c.cursor_at(Point::new(50.0, 50.0)), CursorKind::Move);
        assert!(c.select(id));
        assert_eq!(c.cursor_at(Point::new(200.0, 100.0)), CursorKind::ResizeNwse);
        assert!(c.selection_indicator().is_some());
    }
}
