//! Layer visual stack.
//!
//! Holds the authoritative geometry of every rendered layer plus its
//! transient parallax offset, and keeps a paint order sorted by z-index
//! (ties in insertion order). Operations on unknown ids are no-ops.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use kurbo::{Point, Rect, Size, Vec2};

use crate::error::ImageLoadError;
use crate::render::DrawCommand;
use crate::scene::{BACKGROUND_Z_INDEX, Layer, LayerId};

/// A loaded image: its source and native pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    source: Arc<Path>,
    width: u32,
    height: u32,
}

impl ImageResource {
    pub fn new(source: &Path, width: u32, height: u32) -> Self {
        Self {
            source: Arc::from(source),
            width,
            height,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Turns an image path into a renderable resource.
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<ImageResource, ImageLoadError>;
}

/// Loads images from the local filesystem, reading only their headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &Path) -> Result<ImageResource, ImageLoadError> {
        if path.as_os_str().is_empty() {
            return Err(ImageLoadError::EmptyPath);
        }
        if !path.is_file() {
            return Err(ImageLoadError::NotFound(path.to_path_buf()));
        }
        let (width, height) =
            image::image_dimensions(path).map_err(|source| ImageLoadError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        if width == 0 || height == 0 {
            return Err(ImageLoadError::ZeroSize(path.to_path_buf()));
        }
        Ok(ImageResource::new(path, width, height))
    }
}

/// Fits `image` inside `bounds` preserving aspect ratio. Never upscales.
pub fn contain_size(image: Size, bounds: Size) -> Size {
    if bounds.width <= 0.0 || bounds.height <= 0.0 || image.width <= 0.0 || image.height <= 0.0 {
        return image;
    }
    let ratio = (bounds.width / image.width).min(bounds.height / image.height);
    if ratio >= 1.0 {
        return image;
    }
    Size::new(image.width * ratio, image.height * ratio)
}

/// Scales `image` to fill `target` preserving aspect ratio, centered.
pub fn cover_rect(image: Size, target: Size) -> Rect {
    if target.width <= 0.0 || target.height <= 0.0 || image.width <= 0.0 || image.height <= 0.0 {
        return Rect::from_origin_size(Point::ZERO, image);
    }
    let ratio = (target.width / image.width).max(target.height / image.height);
    let scaled = Size::new(image.width * ratio, image.height * ratio);
    let origin = Point::new(
        (target.width - scaled.width) / 2.0,
        (target.height - scaled.height) / 2.0,
    );
    Rect::from_origin_size(origin, scaled)
}

/// Geometry and depth of one rendered layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: i32,
    /// Degrees, clockwise, about the bounds center.
    pub rotation: f64,
}

impl RenderInfo {
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

#[derive(Debug, Clone)]
struct StackEntry {
    image: ImageResource,
    info: RenderInfo,
    offset: Vec2,
    visible: bool,
}

/// Depth-ordered set of rendered layers.
#[derive(Debug, Clone, Default)]
pub struct VisualStack {
    entries: HashMap<LayerId, StackEntry>,
    paint_order: Vec<LayerId>,
    viewport: Size,
}

impl VisualStack {
    pub fn new(viewport: Size) -> Self {
        Self {
            entries: HashMap::new(),
            paint_order: Vec::new(),
            viewport,
        }
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Layer ids back to front.
    pub fn paint_order(&self) -> &[LayerId] {
        &self.paint_order
    }

    /// Loads the layer's image and inserts it.
    ///
    /// Load failures are logged and leave the stack unchanged.
    pub fn add_layer(&mut self, layer: &Layer, loader: &dyn ImageLoader) -> bool {
        match loader.load(&layer.image_path) {
            Ok(image) => {
                self.insert(layer, image);
                true
            }
            Err(err) => {
                tracing::warn!("[stack] Skipping layer {} ({}): {err}", layer.name, layer.id);
                false
            }
        }
    }

    /// Inserts an already loaded image, contain-fitted into the layer's
    /// stored size (or the viewport when it has none).
    pub fn insert(&mut self, layer: &Layer, image: ImageResource) {
        self.remove_layer(layer.id);

        let t = &layer.transform;
        let bounds = if t.width > 0.0 && t.height > 0.0 {
            Size::new(t.width, t.height)
        } else {
            self.viewport
        };
        let size = contain_size(image.size(), bounds);
        let info = RenderInfo {
            x: t.x,
            y: t.y,
            width: size.width,
            height: size.height,
            z_index: layer.z_index,
            rotation: t.rotation,
        };
        self.entries.insert(
            layer.id,
            StackEntry {
                image,
                info,
                offset: Vec2::ZERO,
                visible: layer.visible,
            },
        );
        self.insert_in_paint_order(layer.id, layer.z_index);
    }

    fn insert_in_paint_order(&mut self, id: LayerId, z_index: i32) {
        let position = self
            .paint_order
            .iter()
            .filter(|other| {
                self.entries
                    .get(*other)
                    .is_some_and(|e| e.info.z_index <= z_index)
            })
            .count();
        self.paint_order.insert(position, id);
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.entries.remove(&id).is_none() {
            return false;
        }
        self.paint_order.retain(|other| *other != id);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.paint_order.clear();
    }

    /// Cover-fits the background layer over `target`.
    pub fn scale_background_to_fit(&mut self, id: LayerId, target: Size) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if entry.info.z_index != BACKGROUND_Z_INDEX {
            return;
        }
        let rect = cover_rect(entry.image.size(), target);
        entry.info.x = rect.x0;
        entry.info.y = rect.y0;
        entry.info.width = rect.width();
        entry.info.height = rect.height();
    }

    pub fn is_background(&self, id: LayerId) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|e| e.info.z_index == BACKGROUND_Z_INDEX)
    }

    pub fn update_z_index(&mut self, id: LayerId, z_index: i32) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        entry.info.z_index = z_index;
        self.paint_order.retain(|other| *other != id);
        self.insert_in_paint_order(id, z_index);
    }

    pub fn is_visible(&self, id: LayerId) -> bool {
        self.entries.get(&id).is_some_and(|e| e.visible)
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.visible = visible;
        }
    }

    /// Sets the parallax translation. Stored geometry is untouched.
    pub fn update_offset(&mut self, id: LayerId, offset: Vec2) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.offset = offset;
        }
    }

    pub fn update_all_offsets(&mut self, offsets: impl IntoIterator<Item = (LayerId, Vec2)>) {
        for (id, offset) in offsets {
            self.update_offset(id, offset);
        }
    }

    pub fn offset(&self, id: LayerId) -> Vec2 {
        self.entries.get(&id).map_or(Vec2::ZERO, |e| e.offset)
    }

    pub fn update_position(&mut self, id: LayerId, x: f64, y: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.info.x = x;
            entry.info.y = y;
        }
    }

    pub fn update_size(&mut self, id: LayerId, width: f64, height: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.info.width = width;
            entry.info.height = height;
        }
    }

    pub fn update_transform(&mut self, id: LayerId, bounds: Rect) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.info.x = bounds.x0;
            entry.info.y = bounds.y0;
            entry.info.width = bounds.width();
            entry.info.height = bounds.height();
        }
    }

    pub fn update_rotation(&mut self, id: LayerId, rotation: f64) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.info.rotation = rotation;
        }
    }

    pub fn render_info(&self, id: LayerId) -> Option<RenderInfo> {
        self.entries.get(&id).map(|e| e.info)
    }

    pub fn bounds(&self, id: LayerId) -> Option<Rect> {
        self.entries.get(&id).map(|e| e.info.bounds())
    }

    /// Rotation in degrees, 0 for unknown layers.
    pub fn rotation(&self, id: LayerId) -> f64 {
        self.entries.get(&id).map_or(0.0, |e| e.info.rotation)
    }

    /// Topmost visible layer whose axis-aligned bounds contain `point`.
    pub fn hit_test(&self, point: Point) -> Option<LayerId> {
        self.hit_test_where(point, |_| true)
    }

    /// Topmost visible, non-background layer containing `point`.
    pub fn hit_test_foreground(&self, point: Point) -> Option<LayerId> {
        self.hit_test_where(point, |info| info.z_index != BACKGROUND_Z_INDEX)
    }

    fn hit_test_where(&self, point: Point, accept: impl Fn(&RenderInfo) -> bool) -> Option<LayerId> {
        self.paint_order.iter().rev().copied().find(|id| {
            self.entries.get(id).is_some_and(|e| {
                e.visible && accept(&e.info) && contains_inclusive(e.info.bounds(), point)
            })
        })
    }

    /// Image draw commands for visible layers, back to front, with parallax
    /// offsets applied.
    pub fn draw_commands(&self) -> impl Iterator<Item = (i32, DrawCommand)> + '_ {
        self.paint_order.iter().filter_map(|id| {
            let entry = self.entries.get(id)?;
            if !entry.visible {
                return None;
            }
            let rect = entry.info.bounds() + entry.offset;
            Some((
                entry.info.z_index,
                DrawCommand::Image {
                    layer: *id,
                    image: entry.image.clone(),
                    rect,
                    rotation: entry.info.rotation,
                },
            ))
        })
    }

    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.paint_order.iter().copied()
    }
}

fn contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Loader that reports a fixed size for every path except `missing.png`.
    pub(crate) struct FixedLoader(pub u32, pub u32);

    impl ImageLoader for FixedLoader {
        fn load(&self, path: &Path) -> Result<ImageResource, ImageLoadError> {
            if path == Path::new("missing.png") {
                return Err(ImageLoadError::NotFound(PathBuf::from(path)));
            }
            Ok(ImageResource::new(path, self.0, self.1))
        }
    }

    fn layer(z: i32) -> Layer {
        Layer::new(format!("z{z}"), format!("{z}.png"), z)
    }

    #[test]
    fn test_contain_size() {
        let s = contain_size(Size::new(1000.0, 500.0), Size::new(200.0, 200.0));
        assert!((s.width - 200.0).abs() < 0.001);
        assert!((s.height - 100.0).abs() < 0.001);

        let s = contain_size(Size::new(50.0, 50.0), Size::new(200.0, 200.0));
        assert!((s.width - 50.0).abs() < 0.001);
        assert!((s.height - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_cover_rect() {
        let r = cover_rect(Size::new(100.0, 100.0), Size::new(200.0, 100.0));
        assert!((r.width() - 200.0).abs() < 0.001);
        assert!((r.height() - 200.0).abs() < 0.001);
        assert!(r.x0.abs() < 0.001);
        assert!((r.y0 + 50.0).abs() < 0.001);
    }

    #[test]
    fn test_cover_rect_degenerate_target() {
        let r = cover_rect(Size::new(100.0, 80.0), Size::new(0.0, 100.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 100.0, 80.0));
    }

    #[test]
    fn test_add_layer_contain_fits_viewport() {
        let mut stack = VisualStack::new(Size::new(200.0, 200.0));
        let l = layer(1);
        assert!(stack.add_layer(&l, &FixedLoader(1000, 500)));
        let b = stack.bounds(l.id).unwrap();
        assert!((b.width() - 200.0).abs() < 0.001);
        assert!((b.height() - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_failed_load_is_skipped() {
        let mut stack = VisualStack::new(Size::new(200.0, 200.0));
        let l = Layer::new("gone", "missing.png", 1);
        assert!(!stack.add_layer(&l, &FixedLoader(10, 10)));
        assert!(stack.is_empty());
        assert!(stack.bounds(l.id).is_none());
    }

    #[test]
    fn test_paint_order_ties_keep_insertion_order() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let loader = FixedLoader(10, 10);
        let a = layer(2);
        let b = layer(1);
        let c = layer(2);
        let bg = layer(0);
        for l in [&a, &b, &c, &bg] {
            stack.add_layer(l, &loader);
        }
        assert_eq!(stack.paint_order(), &[bg.id, b.id, a.id, c.id]);
    }

    #[test]
    fn test_update_z_index_reorders() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let loader = FixedLoader(10, 10);
        let a = layer(1);
        let b = layer(2);
        stack.add_layer(&a, &loader);
        stack.add_layer(&b, &loader);
        stack.update_z_index(a.id, 3);
        assert_eq!(stack.paint_order(), &[b.id, a.id]);
        stack.update_z_index(a.id, 2);
        assert_eq!(stack.paint_order(), &[b.id, a.id]);
    }

    #[test]
    fn test_offset_does_not_touch_geometry() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let l = layer(1);
        stack.add_layer(&l, &FixedLoader(10, 10));
        stack.update_offset(l.id, Vec2::new(5.0, -3.0));
        assert_eq!(stack.bounds(l.id), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let (_, cmd) = stack.draw_commands().next().unwrap();
        let DrawCommand::Image { rect, .. } = cmd else {
            panic!("expected image");
        };
        assert_eq!(rect, Rect::new(5.0, -3.0, 15.0, 7.0));
    }

    #[test]
    fn test_hit_test_prefers_highest_z() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let loader = FixedLoader(50, 50);
        let bg = layer(0);
        let low = layer(1);
        let high = layer(2);
        stack.add_layer(&bg, &loader);
        stack.add_layer(&high, &loader);
        stack.add_layer(&low, &loader);
        assert_eq!(stack.hit_test(Point::new(10.0, 10.0)), Some(high.id));
        assert_eq!(stack.hit_test(Point::new(80.0, 80.0)), None);

        stack.update_position(high.id, 60.0, 60.0);
        stack.update_position(low.id, 60.0, 0.0);
        assert_eq!(stack.hit_test(Point::new(10.0, 10.0)), Some(bg.id));
        assert_eq!(stack.hit_test_foreground(Point::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_hit_test_ignores_rotation_and_invisible() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let l = layer(1);
        stack.add_layer(&l, &FixedLoader(40, 20));
        stack.update_rotation(l.id, 90.0);
        assert_eq!(stack.hit_test(Point::new(35.0, 5.0)), Some(l.id));
        stack.set_visible(l.id, false);
        assert_eq!(stack.hit_test(Point::new(35.0, 5.0)), None);
        assert_eq!(stack.draw_commands().count(), 0);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut stack = VisualStack::new(Size::new(100.0, 100.0));
        let id = LayerId::new_v4();
        stack.update_position(id, 1.0, 1.0);
        stack.update_z_index(id, 4);
        stack.update_rotation(id, 10.0);
        assert!(stack.bounds(id).is_none());
        assert!(stack.rotation(id).abs() < 0.001);
        assert!(!stack.remove_layer(id));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_background_cover() {
        let mut stack = VisualStack::new(Size::new(200.0, 100.0));
        let bg = layer(0);
        let fg = layer(1);
        stack.add_layer(&bg, &FixedLoader(100, 100));
        stack.add_layer(&fg, &FixedLoader(100, 100));
        stack.scale_background_to_fit(bg.id, Size::new(200.0, 100.0));
        stack.scale_background_to_fit(fg.id, Size::new(200.0, 100.0));
        assert_eq!(stack.bounds(bg.id), Some(Rect::new(0.0, -50.0, 200.0, 150.0)));
        assert_eq!(stack.bounds(fg.id), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(stack.is_background(bg.id));
        assert!(!stack.is_background(fg.id));
    }
}
