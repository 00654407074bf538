//! Headless renderer that summarizes frames instead of drawing them.

use std::collections::BTreeSet;
use std::io::Write;

use driftscape_core::kurbo::{Point, Rect};
use driftscape_core::{ImageResource, Paint, Renderer};
use serde::Serialize;

/// Counts of what one frame would draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSummary {
    pub tick: u64,
    pub images: usize,
    pub flakes: usize,
    pub streaks: usize,
    /// Distinct opacity buckets used by particle paints.
    pub paint_buckets: usize,
    /// Union of all image rects, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_extent: Option<[f64; 4]>,
}

#[derive(Debug, Default)]
pub struct SummaryRenderer {
    summary: FrameSummary,
    buckets: BTreeSet<u8>,
    extent: Option<Rect>,
}

impl SummaryRenderer {
    pub fn begin(&mut self, tick: u64) {
        self.summary = FrameSummary {
            tick,
            ..FrameSummary::default()
        };
        self.buckets.clear();
        self.extent = None;
    }

    pub fn finish(&mut self) -> FrameSummary {
        let mut summary = std::mem::take(&mut self.summary);
        summary.paint_buckets = self.buckets.len();
        summary.image_extent = self.extent.map(|r| [r.x0, r.y0, r.x1, r.y1]);
        summary
    }
}

impl Renderer for SummaryRenderer {
    fn draw_image(&mut self, _image: &ImageResource, rect: Rect, _rotation: f64) {
        self.summary.images += 1;
        self.extent = Some(self.extent.map_or(rect, |e| e.union(rect)));
    }

    fn fill_disc(&mut self, _center: Point, _radius: f64, paint: &Paint) {
        self.summary.flakes += 1;
        self.buckets.insert(paint.bucket);
    }

    fn stroke_line(&mut self, _from: Point, _to: Point, paint: &Paint) {
        self.summary.streaks += 1;
        self.buckets.insert(paint.bucket);
    }
}

/// Writes one JSON line per summary.
pub fn write_summary(out: &mut impl Write, summary: &FrameSummary) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, summary)?;
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftscape_core::Color;
    use std::path::Path;

    #[test]
    fn test_summary_counts() {
        let mut renderer = SummaryRenderer::default();
        renderer.begin(3);
        let image = ImageResource::new(Path::new("a.png"), 10, 10);
        renderer.draw_image(&image, Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
        renderer.draw_image(&image, Rect::new(5.0, 5.0, 30.0, 20.0), 45.0);
        let paint = Paint {
            color: Color::WHITE,
            bucket: 7,
            stroke_width: 0.0,
        };
        renderer.fill_disc(Point::new(1.0, 1.0), 2.0, &paint);
        renderer.fill_disc(Point::new(2.0, 1.0), 2.0, &paint);
        renderer.stroke_line(Point::ZERO, Point::new(1.0, 4.0), &Paint { bucket: 5, ..paint });

        let summary = renderer.finish();
        assert_eq!(summary.tick, 3);
        assert_eq!(summary.images, 2);
        assert_eq!(summary.flakes, 2);
        assert_eq!(summary.streaks, 1);
        assert_eq!(summary.paint_buckets, 2);
        assert_eq!(summary.image_extent, Some([0.0, 0.0, 30.0, 20.0]));
    }

    #[test]
    fn test_write_summary_is_json_line() {
        let mut out = Vec::new();
        write_summary(&mut out, &FrameSummary::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"paintBuckets\":0"));
    }
}
