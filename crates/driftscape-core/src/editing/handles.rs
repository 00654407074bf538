//! Selection indicator geometry.
//!
//! Handle positions are laid out in the layer's unrotated frame and then
//! rotated about the bounds center, so they follow rotated layers.

use kurbo::{Affine, Point, Rect, Size};

use crate::scene::LayerId;
use crate::stack::VisualStack;

/// Side length of a resize handle square.
pub const HANDLE_SIZE: f64 = 8.0;
/// Diameter of the rotation handle.
pub const ROTATION_HANDLE_SIZE: f64 = 12.0;
/// Distance of the rotation handle above the top edge midpoint.
pub const ROTATION_HANDLE_OFFSET: f64 = 30.0;

/// One of the eight compass resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeDirection {
    /// Clockwise from the top-left corner.
    pub const ALL: [Self; 8] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
    ];

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::TopLeft | Self::TopRight | Self::BottomRight | Self::BottomLeft
        )
    }

    /// Whether dragging this handle moves the left edge.
    pub fn moves_left_edge(self) -> bool {
        matches!(self, Self::TopLeft | Self::Left | Self::BottomLeft)
    }

    /// Whether dragging this handle moves the top edge.
    pub fn moves_top_edge(self) -> bool {
        matches!(self, Self::TopLeft | Self::Top | Self::TopRight)
    }

    /// Handle center in the layer's local frame.
    fn local_center(self, size: Size) -> Point {
        let (w, h) = (size.width, size.height);
        match self {
            Self::TopLeft => Point::new(0.0, 0.0),
            Self::Top => Point::new(w / 2.0, 0.0),
            Self::TopRight => Point::new(w, 0.0),
            Self::Right => Point::new(w, h / 2.0),
            Self::BottomRight => Point::new(w, h),
            Self::Bottom => Point::new(w / 2.0, h),
            Self::BottomLeft => Point::new(0.0, h),
            Self::Left => Point::new(0.0, h / 2.0),
        }
    }

    pub fn cursor(self) -> CursorKind {
        match self {
            Self::TopLeft | Self::BottomRight => CursorKind::ResizeNwse,
            Self::TopRight | Self::BottomLeft => CursorKind::ResizeNesw,
            Self::Top | Self::Bottom => CursorKind::ResizeNs,
            Self::Left | Self::Right => CursorKind::ResizeWe,
        }
    }
}

/// Pointer cursor hint for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorKind {
    #[default]
    Default,
    Move,
    Rotate,
    ResizeNwse,
    ResizeNesw,
    ResizeNs,
    ResizeWe,
}

/// Handle under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleHit {
    Rotation,
    Resize(ResizeDirection),
}

/// Handle geometry for one selected layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionIndicator {
    bounds: Rect,
    rotation: f64,
    transform: Affine,
}

impl SelectionIndicator {
    /// `rotation` in degrees about the bounds center.
    pub fn new(bounds: Rect, rotation: f64) -> Self {
        let transform = Affine::rotate_about(rotation.to_radians(), bounds.center())
            * Affine::translate(bounds.origin().to_vec2());
        Self {
            bounds,
            rotation,
            transform,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    fn to_screen(&self, local: Point) -> Point {
        self.transform * local
    }

    /// Rotated corners, clockwise from top-left.
    pub fn outline(&self) -> [Point; 4] {
        let size = self.bounds.size();
        [
            self.to_screen(Point::ZERO),
            self.to_screen(Point::new(size.width, 0.0)),
            self.to_screen(Point::new(size.width, size.height)),
            self.to_screen(Point::new(0.0, size.height)),
        ]
    }

    pub fn handle_center(&self, direction: ResizeDirection) -> Point {
        self.to_screen(direction.local_center(self.bounds.size()))
    }

    pub fn handle_rect(&self, direction: ResizeDirection) -> Rect {
        Rect::from_center_size(self.handle_center(direction), (HANDLE_SIZE, HANDLE_SIZE))
    }

    /// All resize handles in clockwise order.
    pub fn handles(&self) -> impl Iterator<Item = (ResizeDirection, Rect)> + '_ {
        ResizeDirection::ALL
            .into_iter()
            .map(|d| (d, self.handle_rect(d)))
    }

    pub fn rotation_handle_center(&self) -> Point {
        let local = Point::new(self.bounds.width() / 2.0, -ROTATION_HANDLE_OFFSET);
        self.to_screen(local)
    }

    /// Bounding box of the rotation handle circle.
    pub fn rotation_handle_rect(&self) -> Rect {
        Rect::from_center_size(
            self.rotation_handle_center(),
            (ROTATION_HANDLE_SIZE, ROTATION_HANDLE_SIZE),
        )
    }

    /// Stem from the top edge midpoint to the rotation handle.
    pub fn rotation_stem(&self) -> (Point, Point) {
        let top_mid = self.to_screen(Point::new(self.bounds.width() / 2.0, 0.0));
        (top_mid, self.rotation_handle_center())
    }

    /// The rotation handle wins over resize handles.
    pub fn hit_test(&self, point: Point) -> Option<HandleHit> {
        if contains(self.rotation_handle_rect(), point) {
            return Some(HandleHit::Rotation);
        }
        self.handles()
            .find(|(_, rect)| contains(*rect, point))
            .map(|(d, _)| HandleHit::Resize(d))
    }

    /// Whether `point` lies inside the rotated body.
    pub fn body_contains(&self, point: Point) -> bool {
        let local = self.transform.inverse() * point;
        let size = self.bounds.size();
        local.x >= 0.0 && local.x <= size.width && local.y >= 0.0 && local.y <= size.height
    }

    pub fn cursor_at(&self, point: Point) -> CursorKind {
        match self.hit_test(point) {
            Some(HandleHit::Rotation) => CursorKind::Rotate,
            Some(HandleHit::Resize(d)) => d.cursor(),
            None if self.body_contains(point) => CursorKind::Move,
            None => CursorKind::Default,
        }
    }
}

fn contains(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// What a pointer press is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureTarget {
    RotationHandle,
    ResizeHandle(ResizeDirection),
    Body(LayerId),
    Empty,
}

/// Classifies a press: rotation handle, then resize handles, then the body of
/// the topmost foreground layer, then empty space.
pub fn classify_press(
    point: Point,
    selection: Option<&SelectionIndicator>,
    stack: &VisualStack,
) -> GestureTarget {
    if let Some(indicator) = selection {
        match indicator.hit_test(point) {
            Some(HandleHit::Rotation) => return GestureTarget::RotationHandle,
            Some(HandleHit::Resize(d)) => return GestureTarget::ResizeHandle(d),
            None => {}
        }
    }
    stack
        .hit_test_foreground(point)
        .map_or(GestureTarget::Empty, GestureTarget::Body)
}
