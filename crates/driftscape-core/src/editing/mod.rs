//! Interactive layer editing: handle geometry, gesture state machine and
//! bounded undo.

mod handles;
mod manipulation;
mod undo;

pub use handles::{
    CursorKind, GestureTarget, HANDLE_SIZE, HandleHit, ROTATION_HANDLE_OFFSET,
    ROTATION_HANDLE_SIZE, ResizeDirection, SelectionIndicator, classify_press,
};
pub use manipulation::{
    EDIT_EPSILON, LayerManipulator, MIN_LAYER_SIZE, ManipulationMode, angle_to, resized_bounds,
};
pub use undo::{EditAction, MAX_UNDO_ENTRIES, UndoStack};
