//! Bounded undo history for layer geometry edits.

use std::collections::VecDeque;

use kurbo::Rect;

use crate::scene::LayerId;
use crate::stack::VisualStack;

pub const MAX_UNDO_ENTRIES: usize = 50;

/// A completed gesture, holding the geometry from before it started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditAction {
    Move { layer: LayerId, x: f64, y: f64 },
    Resize { layer: LayerId, bounds: Rect },
    Rotate { layer: LayerId, rotation: f64 },
}

impl EditAction {
    pub fn layer(&self) -> LayerId {
        match self {
            Self::Move { layer, .. } | Self::Resize { layer, .. } | Self::Rotate { layer, .. } => {
                *layer
            }
        }
    }

    /// Restores the recorded geometry.
    pub fn revert(&self, stack: &mut VisualStack) {
        match *self {
            Self::Move { layer, x, y } => stack.update_position(layer, x, y),
            Self::Resize { layer, bounds } => stack.update_transform(layer, bounds),
            Self::Rotate { layer, rotation } => stack.update_rotation(layer, rotation),
        }
    }
}

/// LIFO of edit actions that drops the oldest entry past capacity.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    actions: VecDeque<EditAction>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: EditAction) {
        self.actions.push_back(action);
        while self.actions.len() > MAX_UNDO_ENTRIES {
            self.actions.pop_front();
        }
    }

    /// Pops the newest action and reverts it.
    pub fn undo(&mut self, stack: &mut VisualStack) -> Option<EditAction> {
        let action = self.actions.pop_back()?;
        action.revert(stack);
        tracing::debug!("[edit] Undo {action:?}");
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Drops every action targeting `layer`.
    pub fn forget_layer(&mut self, layer: LayerId) {
        self.actions.retain(|a| a.layer() != layer);
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &EditAction> {
        self.actions.iter().rev()
    }
}
