//! Snapshot sanitizer: makes a cloned report document render like the
//! on-screen report, without interactive chrome.

use std::sync::Arc;

use log::{debug, warn};

use super::{is_marked_excluded, CloneHook};
use crate::dom::{Document, Element, NodeId, ScrollPosition};
use crate::readiness::{fallback_markup, DiagramCache};
use crate::report::template::ids;
use crate::report::DimensionScores;
use crate::CaptureConfig;

const DIAGRAM_FONT: &str = "Arial, Microsoft YaHei, sans-serif";
const DIAGRAM_FONT_SIZE: &str = "16px";

/// Where the diagram in the clone came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramSource {
    /// The cloned markup was already complete.
    #[default]
    Kept,
    Cache,
    Fallback,
    /// No diagram container in the clone.
    Missing,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub removed: usize,
    pub neutralized: usize,
    pub canvases_copied: usize,
    pub canvas_failures: usize,
    pub diagram: DiagramSource,
    pub force_shown: usize,
}

#[derive(Debug, Clone)]
pub struct Sanitizer {
    scores: DimensionScores,
    cache: DiagramCache,
    min_fragment_len: usize,
}

fn is_chrome(el: &Element) -> bool {
    el.tag == "button"
        || el.tag == "noscript"
        || el.tag == "script"
        || el.tag == "style"
        || el.tag == "meta"
        || (el.tag == "link" && el.attr("rel").map_or(false, |r| r.eq_ignore_ascii_case("stylesheet")))
        || el.id() == Some(ids::INPUT_PAGE)
        || el.has_class(ids::HEADER_BUTTONS_CLASS)
        || el.has_class(ids::STATUS_TIP_CLASS)
        || el.has_class(ids::ERROR_CLASS)
        || is_marked_excluded(el)
}

fn is_layout_root(el: &Element) -> bool {
    matches!(el.tag.as_str(), "html" | "body")
        || el.has_class("container")
        || el.id() == Some(ids::REPORT_PAGE)
}

fn is_out_of_flow(el: &Element) -> bool {
    matches!(
        el.style.get("position").map(|p| p.trim().to_ascii_lowercase()).as_deref(),
        Some("fixed") | Some("absolute") | Some("sticky")
    )
}

fn is_zero_height(value: &str) -> bool {
    matches!(value.trim(), "0" | "0px")
}

impl Sanitizer {
    pub fn new(scores: DimensionScores, cache: DiagramCache) -> Self {
        Self {
            scores,
            cache,
            min_fragment_len: CaptureConfig::default().min_fragment_len,
        }
    }

    pub fn with_min_fragment_len(mut self, len: usize) -> Self {
        self.min_fragment_len = len;
        self
    }

    /// Wrap the sanitizer as a clone hook for [`super::CaptureOptions`].
    pub fn into_hook(self) -> CloneHook {
        Arc::new(move |clone: &mut Document, live: &Document| {
            let report = self.apply(clone, live);
            debug!("Sanitized clone: {:?}", report);
        })
    }

    /// Transform `clone` in place. `live` is only read.
    pub fn apply(&self, clone: &mut Document, live: &Document) -> SanitizeReport {
        let mut report = SanitizeReport {
            removed: self.remove_chrome(clone),
            neutralized: self.neutralize_layout(clone),
            ..Default::default()
        };
        self.copy_canvases(clone, live, &mut report);
        report.diagram = self.rederive_diagram(clone);
        report.force_shown = self.force_show(clone);
        self.hide_header(clone);
        self.apply_typography(clone);
        clone.scroll = ScrollPosition::default();
        report
    }

    fn remove_chrome(&self, doc: &mut Document) -> usize {
        let targets: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|id| doc.element(*id).map_or(false, is_chrome))
            .collect();
        targets.into_iter().filter(|id| doc.remove(*id)).count()
    }

    fn neutralize_layout(&self, doc: &mut Document) -> usize {
        let mut count = 0;
        for id in doc.elements() {
            let Some(el) = doc.element_mut(id) else { continue };
            if !is_layout_root(el) && !is_out_of_flow(el) {
                continue;
            }
            el.style.set("position", "static");
            el.style.set("left", "0");
            el.style.set("top", "0");
            el.style.set("transform", "none");
            el.style.set("height", "auto");
            el.style.set("min-height", "auto");
            match el.tag.as_str() {
                "body" => {
                    el.style.set("display", "block");
                    el.style.set("margin", "0");
                    el.style.set("padding", "0");
                    el.style.set("background-color", "#ffffff");
                }
                _ if el.has_class("container") => {
                    el.style.set("max-width", "1000px");
                    el.style.set("margin", "0 auto");
                    el.style.set("padding", "10px");
                }
                _ => {}
            }
            count += 1;
        }
        count
    }

    /// Runs after `force_show`, which would otherwise reveal it again.
    fn hide_header(&self, doc: &mut Document) {
        for header in doc.elements_by_tag("header") {
            if let Some(el) = doc.element_mut(header) {
                el.style.set("display", "none");
            }
        }
    }

    fn copy_canvases(&self, clone: &mut Document, live: &Document, report: &mut SanitizeReport) {
        for canvas in clone.elements_by_tag("canvas") {
            let Some(id) = clone.element(canvas).and_then(|e| e.id()).map(str::to_string) else {
                continue;
            };
            let source = live
                .get_element_by_id(&id)
                .and_then(|n| live.element(n))
                .filter(|e| e.tag == "canvas");
            let Some(source) = source else {
                warn!("Canvas #{} has no live counterpart; leaving it blank", id);
                report.canvas_failures += 1;
                continue;
            };
            let Some(bitmap) = source.bitmap.clone() else {
                debug!("Live canvas #{} is blank", id);
                continue;
            };
            let (w, h) = source.canvas_size();
            if bitmap.dimensions() != (w, h) {
                warn!(
                    "Canvas #{} bitmap is {}x{} but the element is {}x{}; leaving it blank",
                    id,
                    bitmap.width(),
                    bitmap.height(),
                    w,
                    h
                );
                report.canvas_failures += 1;
                continue;
            }
            if let Some(target) = clone.element_mut(canvas) {
                target.set_attr("width", &w.to_string());
                target.set_attr("height", &h.to_string());
                target.bitmap = Some(bitmap);
                report.canvases_copied += 1;
            }
        }
    }

    fn rederive_diagram(&self, doc: &mut Document) -> DiagramSource {
        let Some(container) = doc.get_element_by_id(ids::DIAGRAM) else {
            return DiagramSource::Missing;
        };
        if doc.inner_html(container).trim().chars().count() >= self.min_fragment_len {
            return DiagramSource::Kept;
        }
        let (markup, source) = match self.cache.latest_for(&self.scores) {
            Some(cached) => (cached, DiagramSource::Cache),
            None => (fallback_markup(self.scores.composite()), DiagramSource::Fallback),
        };
        if let Err(err) = doc.set_inner_html(container, &markup) {
            warn!("Could not restore diagram markup: {}", err);
        }
        source
    }

    fn force_show(&self, doc: &mut Document) -> usize {
        let mut count = 0;
        for id in doc.elements() {
            let Some(el) = doc.element_mut(id) else { continue };
            if el.id() == Some(ids::INPUT_PAGE) {
                continue;
            }
            let mut touched = false;
            if el.style.get("display").map(str::trim) == Some("none") {
                el.style.set("display", "block");
                touched = true;
            }
            if el.style.get("visibility").map(str::trim) == Some("hidden") {
                el.style.set("visibility", "visible");
                touched = true;
            }
            if el.style.get("height").map_or(false, is_zero_height) {
                el.style.set("height", "auto");
                touched = true;
            }
            if el.has_class(ids::REPORT_SECTION_CLASS) || el.id() == Some(ids::REPORT_PAGE) {
                el.style.set("display", "block");
                el.style.set("visibility", "visible");
                el.style.set("overflow", "visible");
                el.style.set("opacity", "1");
                touched = true;
            }
            if touched {
                count += 1;
            }
        }
        count
    }

    fn apply_typography(&self, doc: &mut Document) {
        let diagram = doc.get_element_by_id(ids::DIAGRAM);
        for id in doc.elements() {
            let in_diagram = diagram.map_or(false, |d| doc.is_within(id, d));
            let Some(el) = doc.element_mut(id) else { continue };
            el.style.set("-webkit-font-smoothing", "antialiased");
            el.style.set("text-rendering", "optimizeLegibility");
            if !in_diagram {
                continue;
            }
            el.style.set("font-family", DIAGRAM_FONT);
            el.style.set("font-size", DIAGRAM_FONT_SIZE);
            el.style.set("font-weight", "bold");
            if matches!(el.tag.as_str(), "text" | "tspan") {
                el.set_attr("font-family", DIAGRAM_FONT);
                el.set_attr("font-size", DIAGRAM_FONT_SIZE);
                el.set_attr("font-weight", "bold");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DEFAULT_PAGE;
    use image::{Rgba, RgbaImage};

    fn scores() -> DimensionScores {
        DimensionScores::new(9, 4, 2).unwrap()
    }

    fn live_page() -> Document {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let canvas = doc.get_element_by_id(ids::RADAR_CHART).unwrap();
        doc.element_mut(canvas).unwrap().bitmap = Some(RgbaImage::from_pixel(500, 350, Rgba([76, 175, 80, 255])));
        doc
    }

    #[test]
    fn strips_chrome_and_marked_elements() {
        let live = live_page();
        let mut clone = live.clone_for_capture();
        let report = Sanitizer::new(scores(), DiagramCache::new()).apply(&mut clone, &live);

        assert!(report.removed > 0);
        assert!(clone.elements_by_tag("button").is_empty());
        assert!(clone.elements_by_class("header-buttons").is_empty());
        assert!(clone.elements_by_class("compat-warning").is_empty());
        assert!(clone.elements_by_tag("noscript").is_empty());
        assert!(clone.elements_by_tag("script").is_empty());
        assert!(clone.elements_by_tag("meta").is_empty());
        assert!(clone.get_element_by_id(ids::INPUT_PAGE).is_none());
        // the live document is untouched
        assert_eq!(live.elements_by_tag("button").len(), 3);
    }

    #[test]
    fn copies_canvas_pixels_from_live_document() {
        let live = live_page();
        let mut clone = live.clone_for_capture();
        let report = Sanitizer::new(scores(), DiagramCache::new()).apply(&mut clone, &live);
        assert_eq!(report.canvases_copied, 1);
        let canvas = clone.get_element_by_id(ids::RADAR_CHART).unwrap();
        let bitmap = clone.element(canvas).unwrap().bitmap.as_ref().unwrap();
        assert_eq!(*bitmap.get_pixel(10, 10), Rgba([76, 175, 80, 255]));
    }

    #[test]
    fn neutralizes_layout_and_forces_visibility() {
        let live = live_page();
        let mut clone = live.clone_for_capture();
        Sanitizer::new(scores(), DiagramCache::new()).apply(&mut clone, &live);

        let page = clone.get_element_by_id(ids::REPORT_PAGE).unwrap();
        let style = &clone.element(page).unwrap().style;
        assert_eq!(style.get("display"), Some("block"));
        assert_eq!(style.get("position"), Some("static"));
        assert_eq!(style.get("overflow"), Some("visible"));

        let body = clone.body().unwrap();
        assert_eq!(clone.element(body).unwrap().style.get("background-color"), Some("#ffffff"));
        let header = clone.elements_by_tag("header")[0];
        assert_eq!(clone.element(header).unwrap().style.get("display"), Some("none"));
    }

    #[test]
    fn header_stays_out_of_the_rendered_clone() {
        let live = live_page();
        let mut clone = live.clone_for_capture();
        Sanitizer::new(scores(), DiagramCache::new()).apply(&mut clone, &live);

        let header = clone.elements_by_tag("header")[0];
        let body = clone.body().unwrap();
        let layout = crate::rendering::layout::layout_document(&clone, 1000.0).unwrap();
        assert!(layout.find(body).is_some());
        assert!(layout.find(header).is_none());
    }

    #[test]
    fn diagram_comes_from_cache_then_fallback() {
        let live = live_page();
        let cache = DiagramCache::new();

        let mut clone = live.clone_for_capture();
        let report = Sanitizer::new(scores(), cache.clone()).apply(&mut clone, &live);
        assert_eq!(report.diagram, DiagramSource::Fallback);
        let container = clone.get_element_by_id(ids::DIAGRAM).unwrap();
        assert!(clone.text_content(container).contains("综合得分: 67.8"));

        cache.store(scores(), format!("<div>{}</div>", "x".repeat(120)));
        let mut clone = live.clone_for_capture();
        let report = Sanitizer::new(scores(), cache).apply(&mut clone, &live);
        assert_eq!(report.diagram, DiagramSource::Cache);
    }

    #[test]
    fn diagram_text_gets_bold_font_attributes() {
        let mut live = live_page();
        let container = live.get_element_by_id(ids::DIAGRAM).unwrap();
        live.set_inner_html(
            container,
            &format!(
                "<svg width=\"10\" height=\"10\"><text x=\"1\" y=\"1\">{}</text></svg>",
                "节点".repeat(60)
            ),
        )
        .unwrap();
        let mut clone = live.clone_for_capture();
        let report = Sanitizer::new(scores(), DiagramCache::new()).apply(&mut clone, &live);
        assert_eq!(report.diagram, DiagramSource::Kept);
        let text = clone.elements_by_tag("text")[0];
        let el = clone.element(text).unwrap();
        assert_eq!(el.attr("font-weight"), Some("bold"));
        assert_eq!(el.attr("font-size"), Some("16px"));
        assert_eq!(el.style.get("font-family"), Some(DIAGRAM_FONT));
    }
}
