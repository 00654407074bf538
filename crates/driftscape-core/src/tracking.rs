//! Pointer smoothing and normalization against the virtual display.

use kurbo::{Point, Rect, Vec2};

/// Default exponential smoothing factor.
pub const DEFAULT_SMOOTHING: f64 = 0.15;

const MIN_SMOOTHING: f64 = 0.01;
const MAX_SMOOTHING: f64 = 1.0;

/// Bounding box spanning every monitor.
///
/// Returns `Rect::ZERO` for an empty monitor list.
pub fn virtual_display_bounds(monitors: &[Rect]) -> Rect {
    let mut iter = monitors.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(*first, |acc, r| acc.union(*r))
}

/// Converts raw screen-space pointer samples into a smoothed position
/// normalized to `[-1, 1]` on both axes.
///
/// The display geometry is captured once by [`MouseTracker::initialize`] and
/// does not follow window resizes.
#[derive(Debug, Clone)]
pub struct MouseTracker {
    smoothing: f64,
    center: Point,
    half_extent: Vec2,
    smoothed: Point,
}

impl Default for MouseTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

impl MouseTracker {
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing: smoothing.clamp(MIN_SMOOTHING, MAX_SMOOTHING),
            center: Point::ZERO,
            half_extent: Vec2::ZERO,
            smoothed: Point::ZERO,
        }
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.smoothing = smoothing.clamp(MIN_SMOOTHING, MAX_SMOOTHING);
    }

    /// Captures the virtual display bounds and recenters the filter.
    pub fn initialize(&mut self, display: Rect) {
        self.center = display.center();
        self.half_extent = Vec2::new(display.width() / 2.0, display.height() / 2.0);
        self.smoothed = self.center;
        let (width, height) = (display.width(), display.height());
        tracing::debug!(
            "[tracking] Display {}x{} centered at ({}, {})",
            width,
            height,
            self.center.x,
            self.center.y
        );
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn smoothed(&self) -> Point {
        self.smoothed
    }

    /// Feeds one raw sample through the filter and returns the normalized
    /// smoothed position.
    pub fn normalize(&mut self, raw: Point) -> Vec2 {
        self.smoothed += (raw - self.smoothed) * self.smoothing;
        let delta = self.smoothed - self.center;
        Vec2::new(
            normalize_axis(delta.x, self.half_extent.x),
            normalize_axis(delta.y, self.half_extent.y),
        )
    }

    /// Snaps the filter back to the display center.
    pub fn reset_to_center(&mut self) {
        self.smoothed = self.center;
    }
}

fn normalize_axis(delta: f64, half: f64) -> f64 {
    if half <= 0.0 {
        return 0.0;
    }
    (delta / half).clamp(-1.0, 1.0)
}
