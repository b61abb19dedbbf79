//! Visual capture pipeline
//!
//! A capture walks through five stages: readiness (see [`crate::readiness`]),
//! sanitization of an off-screen clone ([`sanitize`]), rasterization driven
//! by the [`invoker`], bounding-box cropping ([`crop`]) and delivery of the
//! encoded artifact ([`emit`]). [`pipeline::LongImagePipeline`] runs them in
//! order.

pub mod crop;
pub mod emit;
pub mod invoker;
pub mod loader;
pub mod pipeline;
pub mod sanitize;
pub mod status;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};

use crate::dom::{Document, Element, NodeId};
use crate::rendering::raster::{css_color, WHITE};
use crate::{CaptureConfig, Error, Result, Viewport};

pub use crop::{crop, CropBounds, CropPolicy};
pub use emit::{Artifact, ArtifactEmitter, DirectorySink, DownloadSink, EmitOutcome, MemorySink};
pub use invoker::{CaptureInvoker, CaptureTicket};
pub use loader::{BuiltinSource, RasterizerLoader, RasterizerSource};
pub use pipeline::{CaptureOutcome, LongImagePipeline};
pub use sanitize::{SanitizeReport, Sanitizer};
pub use status::StatusNotifier;

/// Raw rasterizer output. Never mutated in place.
pub type CapturedBuffer = RgbaImage;
/// Output of [`crop`], always a fresh buffer.
pub type CroppedBuffer = RgbaImage;

/// Decides whether an element is left out of the clone.
pub type ElementFilter = Arc<dyn Fn(&Element) -> bool + Send + Sync>;
/// Runs against the clone (first argument) with read access to the live
/// document, before any pixel is produced.
pub type CloneHook = Arc<dyn Fn(&mut Document, &Document) + Send + Sync>;

/// Attribute marking elements that must never appear in a capture.
pub const EXCLUDE_ATTR: &str = "data-capture";
pub const EXCLUDE_CLASS: &str = "capture-exclude";

/// Tags with no visual contribution.
pub const NON_VISUAL_TAGS: &[&str] = &["noscript", "script", "style", "link", "meta", "title"];

pub fn is_marked_excluded(el: &Element) -> bool {
    el.attr(EXCLUDE_ATTR) == Some("exclude") || el.has_class(EXCLUDE_CLASS)
}

/// Capture-time exclusion: the input view, page chrome, status banners,
/// buttons, non-visual tags and anything carrying the exclusion marker.
pub fn default_exclusion() -> ElementFilter {
    Arc::new(|el: &Element| {
        el.id() == Some(crate::report::template::ids::INPUT_PAGE)
            || el.has_class(crate::report::template::ids::HEADER_BUTTONS_CLASS)
            || el.has_class(crate::report::template::ids::STATUS_TIP_CLASS)
            || el.tag == "button"
            || NON_VISUAL_TAGS.contains(&el.tag.as_str())
            || is_marked_excluded(el)
    })
}

/// Fixed option set handed to the rasterizer.
#[derive(Clone)]
pub struct CaptureOptions {
    /// Device pixel ratio applied to the layout.
    pub scale: f32,
    pub background: Rgba<u8>,
    /// Window the clone is laid out in.
    pub window: Viewport,
    pub timeout: Duration,
    pub ignore_elements: ElementFilter,
    pub on_clone: Option<CloneHook>,
}

impl fmt::Debug for CaptureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureOptions")
            .field("scale", &self.scale)
            .field("background", &self.background)
            .field("window", &self.window)
            .field("timeout", &self.timeout)
            .field("on_clone", &self.on_clone.is_some())
            .finish()
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

impl CaptureOptions {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self {
            scale: config.scale,
            background: css_color(&config.background).unwrap_or(WHITE),
            window: config.viewport,
            timeout: Duration::from_millis(config.rasterizer_timeout_ms),
            ignore_elements: default_exclusion(),
            on_clone: None,
        }
    }

    pub fn with_on_clone(mut self, hook: CloneHook) -> Self {
        self.on_clone = Some(hook);
        self
    }

    pub fn with_ignore_elements(mut self, filter: ElementFilter) -> Self {
        self.ignore_elements = filter;
        self
    }
}

/// Turns a document subtree into pixels.
///
/// Implementations must clone the document (see [`prepare_clone`]) and run
/// `options.on_clone` on the clone before producing pixels. The live document
/// is only read.
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &str;

    fn rasterize<'a>(
        &'a self,
        doc: &'a Document,
        root: NodeId,
        options: &'a CaptureOptions,
    ) -> BoxFuture<'a, Result<CapturedBuffer>>;
}

/// Clone `doc` the way a capture library does: canvases come out blank,
/// ignored elements are left out, then the clone hook runs. Node ids are
/// preserved, so `root` stays valid in the clone.
pub fn prepare_clone(doc: &Document, root: NodeId, options: &CaptureOptions) -> Result<Document> {
    if doc.element(root).is_none() {
        return Err(Error::ElementNotFound(format!("capture root {:?}", root)));
    }
    let mut clone = doc.clone_for_capture();
    let ignored: Vec<NodeId> = clone
        .elements()
        .into_iter()
        .filter(|id| *id != root && !doc.is_within(root, *id))
        .filter(|id| clone.element(*id).map_or(false, |el| (options.ignore_elements)(el)))
        .collect();
    for id in ignored {
        clone.remove(id);
    }
    if let Some(hook) = &options.on_clone {
        hook(&mut clone, doc);
    }
    if !clone.is_attached(root) {
        return Err(Error::ElementNotFound("capture root was removed from the clone".into()));
    }
    Ok(clone)
}
