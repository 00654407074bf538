//! Parallax offset math.
//!
//! A layer's visual offset is the normalized pointer position scaled by the
//! layer's maximum offset and depth factor. Depth 0 stays pinned, depth 1
//! moves the full maximum offset.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};

/// Per-layer parallax parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallaxSettings {
    pub depth_factor: f64,
    pub max_offset_x: f64,
    pub max_offset_y: f64,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for ParallaxSettings {
    fn default() -> Self {
        Self {
            depth_factor: 1.0,
            max_offset_x: 50.0,
            max_offset_y: 30.0,
            invert_x: false,
            invert_y: false,
        }
    }
}

impl ParallaxSettings {
    /// Parameters applied to the z-index 0 background layer.
    pub fn background() -> Self {
        Self {
            depth_factor: 0.1,
            max_offset_x: 20.0,
            max_offset_y: 10.0,
            ..Self::default()
        }
    }

    pub fn with_depth_factor(self, depth_factor: f64) -> Self {
        Self {
            depth_factor,
            ..self
        }
    }

    pub fn with_max_offset(self, max_offset_x: f64, max_offset_y: f64) -> Self {
        Self {
            max_offset_x,
            max_offset_y,
            ..self
        }
    }

    /// Offset for a pointer position normalized to `[-1, 1]` on both axes.
    pub fn offset(&self, normalized: Vec2) -> Vec2 {
        let x = normalized.x * self.max_offset_x * self.depth_factor;
        let y = normalized.y * self.max_offset_y * self.depth_factor;
        Vec2::new(
            if self.invert_x { -x } else { x },
            if self.invert_y { -y } else { y },
        )
    }
}

/// Depth factor suggested for a newly added layer at `z_index`.
///
/// Background sits almost still; higher layers move progressively more.
pub fn recommended_depth_factor(z_index: i32) -> f64 {
    match z_index {
        0 => 0.1,
        1..=3 => 0.3,
        4..=6 => 0.6,
        z => 1.0 + f64::from(z - 7) * 0.15,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_scales_with_depth() {
        let settings = ParallaxSettings::default().with_depth_factor(0.5);
        let offset = settings.offset(Vec2::new(1.0, -1.0));
        assert!((offset.x - 25.0).abs() < 0.001);
        assert!((offset.y + 15.0).abs() < 0.001);
    }

    #[test]
    fn test_offset_at_center_is_zero() {
        let offset = ParallaxSettings::default().offset(Vec2::ZERO);
        assert!(offset.x.abs() < 0.001);
        assert!(offset.y.abs() < 0.001);
    }

    #[test]
    fn test_zero_depth_pins_layer() {
        let settings = ParallaxSettings::default().with_depth_factor(0.0);
        let offset = settings.offset(Vec2::new(0.8, 0.8));
        assert!(offset.x.abs() < 0.001);
        assert!(offset.y.abs() < 0.001);
    }

    #[test]
    fn test_inversion_is_per_axis() {
        let settings = ParallaxSettings {
            invert_x: true,
            ..ParallaxSettings::default()
        };
        let offset = settings.offset(Vec2::new(0.5, 0.5));
        assert!((offset.x + 25.0).abs() < 0.001);
        assert!((offset.y - 15.0).abs() < 0.001);
    }

    #[test]
    fn test_recommended_depth_factor() {
        assert!((recommended_depth_factor(0) - 0.1).abs() < 0.001);
        assert!((recommended_depth_factor(1) - 0.3).abs() < 0.001);
        assert!((recommended_depth_factor(3) - 0.3).abs() < 0.001);
        assert!((recommended_depth_factor(4) - 0.6).abs() < 0.001);
        assert!((recommended_depth_factor(6) - 0.6).abs() < 0.001);
        assert!((recommended_depth_factor(7) - 1.0).abs() < 0.001);
        assert!((recommended_depth_factor(10) - 1.45).abs() < 0.001);
    }

    #[test]
    fn test_background_defaults() {
        let bg = ParallaxSettings::background();
        assert!((bg.depth_factor - 0.1).abs() < 0.001);
        assert!((bg.max_offset_x - 20.0).abs() < 0.001);
        assert!((bg.max_offset_y - 10.0).abs() < 0.001);
    }
}
