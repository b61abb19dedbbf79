//! Radar chart rendering

use futures::future::{BoxFuture, FutureExt};
use image::{Rgba, RgbaImage};

use crate::rendering::raster::{draw_line, fill_circle, fill_polygon, TRANSPARENT};
use crate::report::{Dimension, DimensionScores};
use crate::Result;

/// Draws the three-dimension chart into a canvas-sized pixel buffer.
///
/// Implementations may be slow or asynchronous; the coordinator bounds each
/// call with a timeout.
pub trait ChartRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render<'a>(&'a self, scores: DimensionScores, width: u32, height: u32) -> BoxFuture<'a, Result<RgbaImage>>;
}

/// Built-in radar chart: concentric grid, one axis per dimension, the filled
/// score polygon and point markers.
#[derive(Debug, Clone)]
pub struct RadarChart {
    /// Value at the outer ring.
    pub max: f32,
    pub rings: u32,
    pub grid: Rgba<u8>,
    pub line: Rgba<u8>,
    pub fill: Rgba<u8>,
}

impl Default for RadarChart {
    fn default() -> Self {
        Self {
            max: 10.0,
            rings: 5,
            grid: Rgba([221, 221, 221, 255]),
            line: Rgba([76, 175, 80, 255]),
            fill: Rgba([76, 175, 80, 51]),
        }
    }
}

impl RadarChart {
    fn vertex(center: (f32, f32), radius: f32, index: usize) -> (f32, f32) {
        // First axis points straight up, the rest follow clockwise.
        let angle = -std::f32::consts::FRAC_PI_2 + index as f32 * 2.0 * std::f32::consts::PI / 3.0;
        (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
    }

    pub fn draw(&self, scores: &DimensionScores, width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, TRANSPARENT);
        if width == 0 || height == 0 {
            return img;
        }
        let center = (width as f32 / 2.0, height as f32 / 2.0);
        let radius = width.min(height) as f32 * 0.4;

        for ring in 1..=self.rings {
            let r = radius * ring as f32 / self.rings as f32;
            let pts: Vec<_> = (0..3).map(|i| Self::vertex(center, r, i)).collect();
            for i in 0..pts.len() {
                draw_line(&mut img, pts[i], pts[(i + 1) % pts.len()], 1.0, self.grid);
            }
        }
        for i in 0..Dimension::ALL.len() {
            draw_line(&mut img, center, Self::vertex(center, radius, i), 1.0, self.grid);
        }

        let points: Vec<_> = Dimension::ALL
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let value = f32::from(scores.get(*d)).min(self.max);
                Self::vertex(center, radius * value / self.max, i)
            })
            .collect();
        fill_polygon(&mut img, &points, self.fill);
        for i in 0..points.len() {
            draw_line(&mut img, points[i], points[(i + 1) % points.len()], 2.0, self.line);
        }
        for p in &points {
            fill_circle(&mut img, *p, 4.0, self.line);
        }
        img
    }
}

impl ChartRenderer for RadarChart {
    fn name(&self) -> &str {
        "radar"
    }

    fn render<'a>(&'a self, scores: DimensionScores, width: u32, height: u32) -> BoxFuture<'a, Result<RgbaImage>> {
        async move { Ok(self.draw(&scores, width, height)) }.boxed()
    }
}

/// Whether a canvas bitmap has no visible pixel at all.
pub fn is_blank(bitmap: &RgbaImage) -> bool {
    bitmap.pixels().all(|p| p[3] == 0)
}
