//! Gesture state machine for drag, resize and rotate.
//!
//! Each gesture snapshots the layer's geometry at press time, applies
//! absolute updates relative to that snapshot on every move, and records an
//! undo entry on release when the geometry actually changed.

use kurbo::{Point, Rect};

use super::handles::{ResizeDirection, SelectionIndicator};
use super::undo::{EditAction, UndoStack};
use crate::scene::LayerId;
use crate::stack::VisualStack;

/// Smallest width or height a resize may produce.
pub const MIN_LAYER_SIZE: f64 = 20.0;
/// Changes below this are not recorded for undo.
pub const EDIT_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManipulationMode {
    #[default]
    None,
    Dragging,
    Resizing,
    Rotating,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Drag {
        anchor: Point,
        original: Rect,
    },
    Resize {
        anchor: Point,
        original: Rect,
        direction: ResizeDirection,
    },
    Rotate {
        center: Point,
        start_angle: f64,
        original_rotation: f64,
    },
}

/// Angle in degrees from `center` to `point`, clockwise in screen space.
pub fn angle_to(center: Point, point: Point) -> f64 {
    (point - center).atan2().to_degrees()
}

/// Bounds after dragging `direction` by `delta` from `original`.
///
/// Corner handles keep the original aspect ratio with width driving height.
/// Both sides are floored at [`MIN_LAYER_SIZE`] and the edges opposite the
/// handle stay fixed.
pub fn resized_bounds(original: Rect, direction: ResizeDirection, delta: kurbo::Vec2) -> Rect {
    let (w0, h0) = (original.width(), original.height());
    let aspect = if w0 > 0.0 && h0 > 0.0 { w0 / h0 } else { 1.0 };

    let (mut width, mut height) = match direction {
        ResizeDirection::TopLeft | ResizeDirection::BottomLeft => {
            let w = w0 - delta.x;
            (w, w / aspect)
        }
        ResizeDirection::TopRight | ResizeDirection::BottomRight => {
            let w = w0 + delta.x;
            (w, w / aspect)
        }
        ResizeDirection::Top => (w0, h0 - delta.y),
        ResizeDirection::Bottom => (w0, h0 + delta.y),
        ResizeDirection::Left => (w0 - delta.x, h0),
        ResizeDirection::Right => (w0 + delta.x, h0),
    };

    if width < MIN_LAYER_SIZE {
        width = MIN_LAYER_SIZE;
        if direction.is_diagonal() {
            height = MIN_LAYER_SIZE / aspect;
        }
    }
    if height < MIN_LAYER_SIZE {
        height = MIN_LAYER_SIZE;
        if direction.is_diagonal() {
            width = MIN_LAYER_SIZE * aspect;
        }
    }

    let x = if direction.moves_left_edge() {
        original.x1 - width
    } else {
        original.x0
    };
    let y = if direction.moves_top_edge() {
        original.y1 - height
    } else {
        original.y0
    };
    Rect::new(x, y, x + width, y + height)
}

/// Selection plus at most one active gesture.
#[derive(Debug, Clone)]
pub struct LayerManipulator {
    selected: Option<LayerId>,
    gesture: Gesture,
}

impl Default for LayerManipulator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManipulator {
    pub fn new() -> Self {
        Self {
            selected: None,
            gesture: Gesture::Idle,
        }
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn mode(&self) -> ManipulationMode {
        match self.gesture {
            Gesture::Idle => ManipulationMode::None,
            Gesture::Drag { .. } => ManipulationMode::Dragging,
            Gesture::Resize { .. } => ManipulationMode::Resizing,
            Gesture::Rotate { .. } => ManipulationMode::Rotating,
        }
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn resize_direction(&self) -> Option<ResizeDirection> {
        match self.gesture {
            Gesture::Resize { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Selects a visible foreground layer. Background, hidden and unknown
    /// layers are refused.
    pub fn select(&mut self, id: LayerId, stack: &VisualStack) -> bool {
        if !stack.is_visible(id) || stack.is_background(id) {
            tracing::debug!("[edit] Refusing to select {id}");
            return false;
        }
        if self.is_active() && self.selected != Some(id) {
            tracing::warn!("[edit] Cannot change selection during a gesture");
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Drops the selection and any active gesture without recording it.
    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.gesture = Gesture::Idle;
    }

    pub fn selected_bounds(&self, stack: &VisualStack) -> Option<Rect> {
        stack.bounds(self.selected?)
    }

    pub fn selected_rotation(&self, stack: &VisualStack) -> f64 {
        self.selected.map_or(0.0, |id| stack.rotation(id))
    }

    /// Handle geometry for the current selection.
    pub fn indicator(&self, stack: &VisualStack) -> Option<SelectionIndicator> {
        let id = self.selected?;
        Some(SelectionIndicator::new(stack.bounds(id)?, stack.rotation(id)))
    }

    fn can_start(&self, stack: &VisualStack) -> Option<Rect> {
        if self.is_active() {
            tracing::warn!("[edit] Gesture already active ({:?})", self.mode());
            return None;
        }
        self.selected_bounds(stack)
    }

    pub fn start_drag(&mut self, point: Point, stack: &VisualStack) -> bool {
        let Some(original) = self.can_start(stack) else {
            return false;
        };
        self.gesture = Gesture::Drag {
            anchor: point,
            original,
        };
        tracing::debug!("[edit] Drag started at ({}, {})", point.x, point.y);
        true
    }

    pub fn start_resize(
        &mut self,
        point: Point,
        direction: ResizeDirection,
        stack: &VisualStack,
    ) -> bool {
        let Some(original) = self.can_start(stack) else {
            return false;
        };
        self.gesture = Gesture::Resize {
            anchor: point,
            original,
            direction,
        };
        tracing::debug!("[edit] Resize started ({direction:?})");
        true
    }

    pub fn start_rotation(&mut self, point: Point, stack: &VisualStack) -> bool {
        let Some(original) = self.can_start(stack) else {
            return false;
        };
        let center = original.center();
        self.gesture = Gesture::Rotate {
            center,
            start_angle: angle_to(center, point),
            original_rotation: self.selected_rotation(stack),
        };
        tracing::debug!("[edit] Rotation started");
        true
    }

    pub fn update_drag(&mut self, point: Point, stack: &mut VisualStack) -> bool {
        let (Gesture::Drag { anchor, original }, Some(id)) = (self.gesture, self.selected) else {
            return false;
        };
        let moved = original.origin() + (point - anchor);
        stack.update_position(id, moved.x, moved.y);
        true
    }

    pub fn update_resize(&mut self, point: Point, stack: &mut VisualStack) -> bool {
        let (
            Gesture::Resize {
                anchor,
                original,
                direction,
            },
            Some(id),
        ) = (self.gesture, self.selected)
        else {
            return false;
        };
        stack.update_transform(id, resized_bounds(original, direction, point - anchor));
        true
    }

    pub fn update_rotation(&mut self, point: Point, stack: &mut VisualStack) -> bool {
        let (
            Gesture::Rotate {
                center,
                start_angle,
                original_rotation,
            },
            Some(id),
        ) = (self.gesture, self.selected)
        else {
            return false;
        };
        let rotation = original_rotation + (angle_to(center, point) - start_angle);
        stack.update_rotation(id, rotation);
        true
    }

    /// Applies a pointer move to whichever gesture is active.
    pub fn update(&mut self, point: Point, stack: &mut VisualStack) -> bool {
        match self.gesture {
            Gesture::Idle => false,
            Gesture::Drag { .. } => self.update_drag(point, stack),
            Gesture::Resize { .. } => self.update_resize(point, stack),
            Gesture::Rotate { .. } => self.update_rotation(point, stack),
        }
    }

    pub fn end_drag(&mut self, stack: &VisualStack, undo: &mut UndoStack) -> Option<EditAction> {
        let Gesture::Drag { original, .. } = self.gesture else {
            return None;
        };
        self.finish(stack, undo, |id, current| {
            let moved = (current.x0 - original.x0).abs() > EDIT_EPSILON
                || (current.y0 - original.y0).abs() > EDIT_EPSILON;
            moved.then_some(EditAction::Move {
                layer: id,
                x: original.x0,
                y: original.y0,
            })
        })
    }

    pub fn end_resize(&mut self, stack: &VisualStack, undo: &mut UndoStack) -> Option<EditAction> {
        let Gesture::Resize { original, .. } = self.gesture else {
            return None;
        };
        self.finish(stack, undo, |id, current| {
            let resized = (current.width() - original.width()).abs() > EDIT_EPSILON
                || (current.height() - original.height()).abs() > EDIT_EPSILON;
            resized.then_some(EditAction::Resize {
                layer: id,
                bounds: original,
            })
        })
    }

    pub fn end_rotation(
        &mut self,
        stack: &VisualStack,
        undo: &mut UndoStack,
    ) -> Option<EditAction> {
        let Gesture::Rotate {
            original_rotation, ..
        } = self.gesture
        else {
            return None;
        };
        let current = self.selected_rotation(stack);
        self.finish(stack, undo, |id, _| {
            ((current - original_rotation).abs() > EDIT_EPSILON).then_some(EditAction::Rotate {
                layer: id,
                rotation: original_rotation,
            })
        })
    }

    /// Finalizes whichever gesture is active, if any.
    pub fn end_all(&mut self, stack: &VisualStack, undo: &mut UndoStack) -> Option<EditAction> {
        match self.gesture {
            Gesture::Idle => None,
            Gesture::Drag { .. } => self.end_drag(stack, undo),
            Gesture::Resize { .. } => self.end_resize(stack, undo),
            Gesture::Rotate { .. } => self.end_rotation(stack, undo),
        }
    }

    fn finish(
        &mut self,
        stack: &VisualStack,
        undo: &mut UndoStack,
        record: impl FnOnce(LayerId, Rect) -> Option<EditAction>,
    ) -> Option<EditAction> {
        let mode = self.mode();
        self.gesture = Gesture::Idle;
        let id = self.selected?;
        let current = stack.bounds(id)?;
        let action = record(id, current)?;
        undo.push(action);
        tracing::debug!("[edit] {mode:?} finished, recorded {action:?}");
        Some(action)
    }
}
