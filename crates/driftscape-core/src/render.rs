//! Per-frame draw output.
//!
//! The compositor produces a [`Frame`]: an ordered list of draw commands,
//! back to front. Any backend implementing [`Renderer`] can replay it.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::particle::ParticleSprite;
use crate::scene::LayerId;
use crate::stack::ImageResource;

/// RGBA color representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

/// Fill or stroke paint with opacity quantized to a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    /// Opacity bucket `0..=10`.
    pub bucket: u8,
    /// Zero for fills.
    pub stroke_width: f64,
}

impl Paint {
    pub fn opacity(&self) -> f64 {
        f64::from(self.bucket) / 10.0
    }
}

/// One draw operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Image stretched into `rect` and rotated by `rotation` degrees about the
    /// rect center.
    Image {
        layer: LayerId,
        image: ImageResource,
        rect: Rect,
        rotation: f64,
    },
    Particle(ParticleSprite),
}

/// Rendering backend.
pub trait Renderer {
    fn draw_image(&mut self, image: &ImageResource, rect: Rect, rotation: f64);

    fn fill_disc(&mut self, center: Point, radius: f64, paint: &Paint);

    fn stroke_line(&mut self, from: Point, to: Point, paint: &Paint);
}

/// Draw commands for one tick, back to front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Layer ids in paint order.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Image { layer, .. } => Some(*layer),
            DrawCommand::Particle(_) => None,
        })
    }

    pub fn particle_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Particle(_)))
            .count()
    }

    pub fn replay(&self, renderer: &mut impl Renderer) {
        for command in &self.commands {
            match command {
                DrawCommand::Image {
                    image,
                    rect,
                    rotation,
                    ..
                } => renderer.draw_image(image, *rect, *rotation),
                DrawCommand::Particle(ParticleSprite::Flake {
                    center,
                    radius,
                    paint,
                }) => renderer.fill_disc(*center, *radius, paint),
                DrawCommand::Particle(ParticleSprite::Streak { from, to, paint }) => {
                    renderer.stroke_line(*from, *to, paint);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{PaintCache, ParticleType};

    #[derive(Default)]
    struct Tally {
        images: Vec<Rect>,
        discs: Vec<f64>,
        lines: Vec<(Point, Point)>,
    }

    impl Renderer for Tally {
        fn draw_image(&mut self, _image: &ImageResource, rect: Rect, _rotation: f64) {
            self.images.push(rect);
        }

        fn fill_disc(&mut self, _center: Point, radius: f64, _paint: &Paint) {
            self.discs.push(radius);
        }

        fn stroke_line(&mut self, from: Point, to: Point, _paint: &Paint) {
            self.lines.push((from, to));
        }
    }

    #[test]
    fn test_replay_dispatches_each_command() {
        let layer = LayerId::new_v4();
        let snow = PaintCache::new(ParticleType::Snow);
        let rain = PaintCache::new(ParticleType::Rain);
        let frame = Frame {
            commands: vec![
                DrawCommand::Image {
                    layer,
                    image: ImageResource::new(std::path::Path::new("a.png"), 10, 10),
                    rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                    rotation: 0.0,
                },
                DrawCommand::Particle(ParticleSprite::Flake {
                    center: Point::new(5.0, 5.0),
                    radius: 3.0,
                    paint: snow.paint(1.0),
                }),
                DrawCommand::Particle(ParticleSprite::Streak {
                    from: Point::new(1.0, 1.0),
                    to: Point::new(2.0, 9.0),
                    paint: rain.paint(1.0),
                }),
            ],
        };
        assert_eq!(frame.layers().collect::<Vec<_>>(), vec![layer]);
        assert_eq!(frame.particle_count(), 2);

        let mut tally = Tally::default();
        frame.replay(&mut tally);
        assert_eq!(tally.images, vec![Rect::new(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(tally.discs, vec![3.0]);
        assert_eq!(tally.lines, vec![(Point::new(1.0, 1.0), Point::new(2.0, 9.0))]);
    }
}
