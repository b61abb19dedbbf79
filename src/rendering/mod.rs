//! In-process block rasterizer.
//!
//! Renders the sanitized capture clone without a browser: layout over inline
//! styles, a display list, then pixels at the requested scale. Text is drawn
//! as glyph blocks, so output is deterministic and suited to golden tests.

pub mod layout;
pub mod paint;
pub mod raster;

use futures::future::{BoxFuture, FutureExt};
use image::RgbaImage;
use log::debug;

use crate::capture::{prepare_clone, CaptureOptions, CapturedBuffer, Rasterizer};
use crate::dom::{Document, NodeId};
use crate::{Error, Result};

use layout::layout_document;
use paint::{build_display_list, execute, Transform};

/// Largest buffer edge in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

#[derive(Debug, Clone, Default)]
pub struct BlockRasterizer;

impl BlockRasterizer {
    pub fn new() -> Self {
        Self
    }

    /// Rasterize `root` of `doc`, sized to the root's border box.
    pub fn render(&self, doc: &Document, root: NodeId, options: &CaptureOptions) -> Result<CapturedBuffer> {
        let clone = prepare_clone(doc, root, options)?;
        let tree = layout_document(&clone, options.window.width as f32)
            .ok_or_else(|| Error::RasterizationFailure("document has no renderable root".into()))?;
        let Some(root_box) = tree.find(root) else {
            // A root that generates no box (display: none) captures as empty.
            return Ok(RgbaImage::new(0, 0));
        };

        let scale = options.scale;
        let width = (root_box.rect.width * scale).round() as u32;
        let height = (root_box.rect.height * scale).round() as u32;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(Error::RasterizationFailure(format!(
                "{}x{} exceeds the {}px limit",
                width, height, MAX_DIMENSION
            )));
        }

        let mut commands = Vec::new();
        build_display_list(&clone, root_box, &mut commands);
        debug!(
            "Painting {} commands into {}x{} at scale {}",
            commands.len(),
            width,
            height,
            scale
        );

        let mut img = RgbaImage::from_pixel(width, height, options.background);
        let transform = Transform {
            origin: (root_box.rect.x, root_box.rect.y),
            scale,
        };
        execute(&commands, &mut img, &transform);
        Ok(img)
    }
}

impl Rasterizer for BlockRasterizer {
    fn name(&self) -> &str {
        "block"
    }

    fn rasterize<'a>(
        &'a self,
        doc: &'a Document,
        root: NodeId,
        options: &'a CaptureOptions,
    ) -> BoxFuture<'a, Result<CapturedBuffer>> {
        async move { self.render(doc, root, options) }.boxed()
    }
}
