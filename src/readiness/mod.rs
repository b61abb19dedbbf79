//! Rendering readiness
//!
//! The report page is populated by several independent producers: the chart
//! renderer draws canvas pixels, the diagram engine produces SVG markup, and
//! the text panels are generated synchronously from the scores. Before a
//! capture can start, every one of those fragments has to be present and
//! current. [`ReadinessCoordinator`] checks each fragment, regenerates the
//! ones that are missing, and falls back to static content when a renderer is
//! absent, fails, or runs out of time. No fragment failure is fatal.

pub mod chart;
pub mod diagram;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};

use crate::dom::{Document, NodeId, SharedDocument};
use crate::report::content::{evaluation_rows_html, narrative_html, compass_html};
use crate::report::template::ids;
use crate::report::{Dimension, DimensionScores};
use crate::{CaptureConfig, Error, Result};

pub use chart::{ChartRenderer, RadarChart};
pub use diagram::{fallback_markup, DiagramEngine, Flowchart, SvgFlowchart};

/// Class of the textual panel shown instead of the chart.
pub const CHART_FALLBACK_CLASS: &str = "chart-fallback";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    Chart,
    Diagram,
    Table,
    Narrative,
    Compass,
}

/// What happened to one fragment during a readiness pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentStatus {
    AlreadyReady,
    Generated,
    /// Existing content was redrawn in place.
    Refreshed,
    /// Static content was used; the reason is the renderer error.
    Fallback(String),
}

impl FragmentStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FragmentStatus::Fallback(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessReport {
    pub chart: FragmentStatus,
    pub diagram: FragmentStatus,
    pub table: FragmentStatus,
    pub narrative: FragmentStatus,
    pub compass: FragmentStatus,
}

impl ReadinessReport {
    pub fn status(&self, fragment: Fragment) -> &FragmentStatus {
        match fragment {
            Fragment::Chart => &self.chart,
            Fragment::Diagram => &self.diagram,
            Fragment::Table => &self.table,
            Fragment::Narrative => &self.narrative,
            Fragment::Compass => &self.compass,
        }
    }

    pub fn fallbacks(&self) -> usize {
        [&self.chart, &self.diagram, &self.table, &self.narrative, &self.compass]
            .iter()
            .filter(|s| s.is_fallback())
            .count()
    }
}

/// Most recent diagram markup, tagged with the scores it was produced for.
#[derive(Clone, Default)]
pub struct DiagramCache {
    slot: Arc<RwLock<Option<(DimensionScores, String)>>>,
}

impl fmt::Debug for DiagramCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagramCache").field("filled", &self.latest().is_some()).finish()
    }
}

impl DiagramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, scores: DimensionScores, markup: String) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some((scores, markup));
    }

    pub fn latest(&self) -> Option<String> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|(_, m)| m.clone())
    }

    /// Latest markup, only if it was produced for `scores`.
    pub fn latest_for(&self, scores: &DimensionScores) -> Option<String> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().filter(|(s, _)| s == scores).map(|(_, m)| m.clone())
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

/// Scores each fragment was last generated for. Content of unknown origin
/// is never treated as current.
#[derive(Debug, Clone, Default)]
struct Provenance {
    slots: Arc<RwLock<HashMap<Fragment, DimensionScores>>>,
}

impl Provenance {
    fn is_current(&self, fragment: Fragment, scores: &DimensionScores) -> bool {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(&fragment) == Some(scores)
    }

    fn record(&self, fragment: Fragment, scores: DimensionScores) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.insert(fragment, scores);
    }

    fn forget(&self, fragment: Fragment) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.remove(&fragment);
    }

    fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessTimeouts {
    pub chart: Duration,
    pub diagram: Duration,
}

impl Default for ReadinessTimeouts {
    fn default() -> Self {
        let config = CaptureConfig::default();
        Self {
            chart: Duration::from_millis(config.chart_timeout_ms),
            diagram: Duration::from_millis(config.diagram_timeout_ms),
        }
    }
}

async fn bounded<T>(budget: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(budget, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::RenderTimeout(budget.as_millis() as u64)),
    }
}

fn require(doc: &Document, id: &str) -> Result<NodeId> {
    doc.get_element_by_id(id)
        .ok_or_else(|| Error::ElementNotFound(format!("#{}", id)))
}

/// Trimmed inner markup length in characters.
fn content_len(doc: &Document, id: NodeId) -> usize {
    doc.inner_html(id).trim().chars().count()
}

#[derive(Clone)]
pub struct ReadinessCoordinator {
    chart: Option<Arc<dyn ChartRenderer>>,
    diagram: Option<Arc<dyn DiagramEngine>>,
    cache: DiagramCache,
    provenance: Provenance,
    timeouts: ReadinessTimeouts,
    min_fragment_len: usize,
}

impl fmt::Debug for ReadinessCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessCoordinator")
            .field("chart", &self.chart.as_ref().map(|c| c.name().to_string()))
            .field("diagram", &self.diagram.as_ref().map(|d| d.name().to_string()))
            .field("timeouts", &self.timeouts)
            .field("min_fragment_len", &self.min_fragment_len)
            .finish()
    }
}

impl Default for ReadinessCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessCoordinator {
    /// Coordinator with the built-in chart and diagram renderers.
    pub fn new() -> Self {
        Self::bare()
            .with_chart(Arc::new(RadarChart::default()))
            .with_diagram(Arc::new(SvgFlowchart::default()))
    }

    /// Coordinator with no renderers; every graphic degrades to fallback content.
    pub fn bare() -> Self {
        Self {
            chart: None,
            diagram: None,
            cache: DiagramCache::new(),
            provenance: Provenance::default(),
            timeouts: ReadinessTimeouts::default(),
            min_fragment_len: CaptureConfig::default().min_fragment_len,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new()
            .with_timeouts(ReadinessTimeouts {
                chart: Duration::from_millis(config.chart_timeout_ms),
                diagram: Duration::from_millis(config.diagram_timeout_ms),
            })
            .with_min_fragment_len(config.min_fragment_len)
    }

    pub fn with_chart(mut self, chart: Arc<dyn ChartRenderer>) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn without_chart(mut self) -> Self {
        self.chart = None;
        self
    }

    pub fn with_diagram(mut self, diagram: Arc<dyn DiagramEngine>) -> Self {
        self.diagram = Some(diagram);
        self
    }

    pub fn without_diagram(mut self) -> Self {
        self.diagram = None;
        self
    }

    pub fn with_timeouts(mut self, timeouts: ReadinessTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_min_fragment_len(mut self, len: usize) -> Self {
        self.min_fragment_len = len;
        self
    }

    pub fn cache(&self) -> &DiagramCache {
        &self.cache
    }

    pub fn min_fragment_len(&self) -> usize {
        self.min_fragment_len
    }

    /// Bring every fragment up to date for `scores`, regenerating only what
    /// is missing or too short.
    pub async fn ensure_ready(&self, doc: &SharedDocument, scores: DimensionScores) -> Result<ReadinessReport> {
        if self.cache.latest().is_some() && self.cache.latest_for(&scores).is_none() {
            debug!("Scores changed since the last diagram; invalidating cache");
            self.cache.invalidate();
        }
        self.run(doc, scores, false).await
    }

    /// Generate every fragment from scratch.
    pub async fn render_report(&self, doc: &SharedDocument, scores: DimensionScores) -> Result<ReadinessReport> {
        self.cache.invalidate();
        self.run(doc, scores, true).await
    }

    /// Drop every generated fragment and the chart pixels, and forget the
    /// cached diagram.
    pub async fn clear_report(&self, doc: &SharedDocument) -> Result<()> {
        self.cache.invalidate();
        self.provenance.clear();
        let mut guard = doc.lock().await;
        for id in [ids::EVALUATION_TBODY, ids::NARRATIVE, ids::DIAGRAM, ids::COMPASS] {
            let node = require(&guard, id)?;
            guard.clear_children(node);
        }
        let canvas = require(&guard, ids::RADAR_CHART)?;
        remove_chart_fallback(&mut guard, canvas);
        if let Some(el) = guard.element_mut(canvas) {
            el.bitmap = None;
        }
        debug!("Report fragments cleared");
        Ok(())
    }

    async fn run(&self, doc: &SharedDocument, scores: DimensionScores, force: bool) -> Result<ReadinessReport> {
        let chart = self.ensure_chart(doc, scores, force).await?;
        let diagram = self.ensure_diagram(doc, scores, force).await?;

        let mut guard = doc.lock().await;
        let table = self.ensure_markup(&mut guard, Fragment::Table, scores, force, evaluation_rows_html)?;
        let narrative = self.ensure_markup(&mut guard, Fragment::Narrative, scores, force, narrative_html)?;
        let compass = self.ensure_markup(&mut guard, Fragment::Compass, scores, force, compass_html)?;
        drop(guard);

        let report = ReadinessReport {
            chart,
            diagram,
            table,
            narrative,
            compass,
        };
        info!(
            "Report fragments ready ({} fallback{})",
            report.fallbacks(),
            if report.fallbacks() == 1 { "" } else { "s" }
        );
        Ok(report)
    }

    /// Whether the content in `node` can be kept as is for `scores`.
    fn is_current(&self, doc: &Document, node: NodeId, fragment: Fragment, scores: &DimensionScores) -> bool {
        content_len(doc, node) >= self.min_fragment_len && self.provenance.is_current(fragment, scores)
    }

    fn ensure_markup(
        &self,
        doc: &mut Document,
        fragment: Fragment,
        scores: DimensionScores,
        force: bool,
        generate: fn(&DimensionScores) -> String,
    ) -> Result<FragmentStatus> {
        let id = container_id(fragment);
        let node = require(doc, id)?;
        if !force && self.is_current(doc, node, fragment, &scores) {
            return Ok(FragmentStatus::AlreadyReady);
        }
        doc.set_inner_html(node, &generate(&scores))?;
        self.provenance.record(fragment, scores);
        debug!("Generated #{}", id);
        Ok(FragmentStatus::Generated)
    }

    async fn ensure_chart(&self, doc: &SharedDocument, scores: DimensionScores, force: bool) -> Result<FragmentStatus> {
        let (size, has_pixels) = {
            let guard = doc.lock().await;
            let canvas = require(&guard, ids::RADAR_CHART)?;
            let el = guard
                .element(canvas)
                .ok_or_else(|| Error::ElementNotFound(format!("#{}", ids::RADAR_CHART)))?;
            let has_pixels = el.bitmap.as_ref().map_or(false, |b| !chart::is_blank(b));
            (el.canvas_size(), has_pixels)
        };
        let current = has_pixels && self.provenance.is_current(Fragment::Chart, &scores);

        let Some(renderer) = self.chart.as_ref() else {
            if current && !force {
                return Ok(FragmentStatus::AlreadyReady);
            }
            let err = Error::RendererUnavailable("no chart renderer installed".into());
            warn!("Chart degraded to text panel: {}", err);
            let mut guard = doc.lock().await;
            install_chart_fallback(&mut guard, &scores)?;
            update_legend(&mut guard, &scores);
            self.provenance.forget(Fragment::Chart);
            return Ok(FragmentStatus::Fallback(err.to_string()));
        };

        let drawn = bounded(self.timeouts.chart, renderer.render(scores, size.0, size.1)).await;
        let mut guard = doc.lock().await;
        update_legend(&mut guard, &scores);
        match drawn {
            Ok(bitmap) => {
                let canvas = require(&guard, ids::RADAR_CHART)?;
                remove_chart_fallback(&mut guard, canvas);
                if let Some(el) = guard.element_mut(canvas) {
                    el.bitmap = Some(bitmap);
                }
                self.provenance.record(Fragment::Chart, scores);
                if has_pixels {
                    debug!("Chart redrawn by {}", renderer.name());
                    Ok(FragmentStatus::Refreshed)
                } else {
                    debug!("Chart drawn by {}", renderer.name());
                    Ok(FragmentStatus::Generated)
                }
            }
            Err(err) if current && !force => {
                warn!("Chart refresh failed, keeping existing pixels: {}", err);
                Ok(FragmentStatus::AlreadyReady)
            }
            Err(err) => {
                warn!("Chart degraded to text panel: {}", err);
                install_chart_fallback(&mut guard, &scores)?;
                self.provenance.forget(Fragment::Chart);
                Ok(FragmentStatus::Fallback(err.to_string()))
            }
        }
    }

    async fn ensure_diagram(&self, doc: &SharedDocument, scores: DimensionScores, force: bool) -> Result<FragmentStatus> {
        {
            let guard = doc.lock().await;
            let container = require(&guard, ids::DIAGRAM)?;
            if !force && self.is_current(&guard, container, Fragment::Diagram, &scores) {
                if self.cache.latest_for(&scores).is_none() {
                    self.cache.store(scores, guard.inner_html(container));
                }
                return Ok(FragmentStatus::AlreadyReady);
            }
        }

        let composite = scores.composite();
        let preferred = match self.diagram.as_ref() {
            Some(engine) => {
                let chart = Flowchart::for_score(composite);
                bounded(self.timeouts.diagram, engine.render(&chart))
                    .await
                    .map(|svg| diagram::wrap_svg(&svg))
            }
            None => Err(Error::RendererUnavailable("no diagram engine installed".into())),
        };

        let (markup, status) = match preferred {
            Ok(markup) => (markup, FragmentStatus::Generated),
            Err(err) => {
                warn!("Diagram degraded to text flowchart: {}", err);
                (fallback_markup(composite), FragmentStatus::Fallback(err.to_string()))
            }
        };

        let mut guard = doc.lock().await;
        let container = require(&guard, ids::DIAGRAM)?;
        guard.set_inner_html(container, &markup)?;
        self.provenance.record(Fragment::Diagram, scores);
        self.cache.store(scores, markup);
        Ok(status)
    }
}

fn container_id(fragment: Fragment) -> &'static str {
    match fragment {
        Fragment::Chart => ids::RADAR_CHART,
        Fragment::Diagram => ids::DIAGRAM,
        Fragment::Table => ids::EVALUATION_TBODY,
        Fragment::Narrative => ids::NARRATIVE,
        Fragment::Compass => ids::COMPASS,
    }
}

/// Write the per-dimension scores into the chart legend.
fn update_legend(doc: &mut Document, scores: &DimensionScores) {
    for dim in Dimension::ALL {
        let id = format!("{}-score", dim.key());
        if let Some(node) = doc.get_element_by_id(&id) {
            let _ = doc.set_inner_html(node, &scores.get(dim).to_string());
        }
    }
}

fn chart_fallback_html(scores: &DimensionScores) -> String {
    let rows: String = Dimension::ALL
        .iter()
        .map(|d| format!("<p>{}：{}/9</p>", d.label(), scores.get(*d)))
        .collect();
    format!(
        "<div style=\"padding: 20px; background-color: #f1f8e9; text-align: center;\"><h4>三维能力得分</h4>{}</div>",
        rows
    )
}

/// Replace the canvas with a textual score panel. The canvas stays in the
/// document but is excluded from captures.
fn install_chart_fallback(doc: &mut Document, scores: &DimensionScores) -> Result<()> {
    let canvas = require(doc, ids::RADAR_CHART)?;
    remove_chart_fallback(doc, canvas);
    let panel = doc.create_element("div");
    if let Some(el) = doc.element_mut(panel) {
        el.add_class(CHART_FALLBACK_CLASS);
    }
    doc.insert_after(canvas, panel)?;
    doc.set_inner_html(panel, &chart_fallback_html(scores))?;
    if let Some(el) = doc.element_mut(canvas) {
        el.set_attr("data-capture", "exclude");
        el.style.set("display", "none");
    }
    Ok(())
}

fn remove_chart_fallback(doc: &mut Document, canvas: NodeId) {
    for panel in doc.elements_by_class(CHART_FALLBACK_CLASS) {
        doc.remove(panel);
    }
    if let Some(el) = doc.element_mut(canvas) {
        if el.attr("data-capture") == Some("exclude") {
            el.remove_attr("data-capture");
            el.style.remove("display");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::shared;
    use crate::report::DEFAULT_PAGE;
    use futures::future::{BoxFuture, FutureExt};
    use image::RgbaImage;

    struct FailingEngine;

    impl DiagramEngine for FailingEngine {
        fn name(&self) -> &str {
            "failing"
        }

        fn render<'a>(&'a self, _chart: &'a Flowchart) -> BoxFuture<'a, Result<String>> {
            async { Err(Error::Other("syntax error in graph".into())) }.boxed()
        }
    }

    struct SlowChart;

    impl ChartRenderer for SlowChart {
        fn name(&self) -> &str {
            "slow"
        }

        fn render<'a>(&'a self, _scores: DimensionScores, w: u32, h: u32) -> BoxFuture<'a, Result<RgbaImage>> {
            async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(RgbaImage::new(w, h))
            }
            .boxed()
        }
    }

    fn scores() -> DimensionScores {
        DimensionScores::new(8, 7, 5).unwrap()
    }

    #[tokio::test]
    async fn builtin_renderers_populate_everything() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new();
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert_eq!(report.chart, FragmentStatus::Generated);
        assert_eq!(report.diagram, FragmentStatus::Generated);
        assert_eq!(report.fallbacks(), 0);

        let guard = doc.lock().await;
        let canvas = guard.get_element_by_id(ids::RADAR_CHART).unwrap();
        assert!(guard.element(canvas).unwrap().bitmap.is_some());
        let legend = guard.get_element_by_id("advanced-score").unwrap();
        assert_eq!(guard.text_content(legend), "8");
        let diagram = guard.get_element_by_id(ids::DIAGRAM).unwrap();
        assert!(guard.inner_html(diagram).contains("<svg"));
        assert!(coordinator.cache().latest_for(&scores()).is_some());
    }

    #[tokio::test]
    async fn second_pass_is_idempotent() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new();
        coordinator.ensure_ready(&doc, scores()).await.unwrap();
        let before = doc.lock().await.to_html();
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert_eq!(report.chart, FragmentStatus::Refreshed);
        assert_eq!(report.diagram, FragmentStatus::AlreadyReady);
        assert_eq!(report.table, FragmentStatus::AlreadyReady);
        assert_eq!(doc.lock().await.to_html(), before);
    }

    #[tokio::test]
    async fn missing_diagram_engine_uses_static_flowchart() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new().without_diagram();
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert!(report.diagram.is_fallback());

        let guard = doc.lock().await;
        let diagram = guard.get_element_by_id(ids::DIAGRAM).unwrap();
        let expected = crate::report::format_score(scores().composite());
        assert!(guard.inner_html(diagram).contains(&expected));
    }

    #[tokio::test]
    async fn failing_engine_falls_back() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new().with_diagram(Arc::new(FailingEngine));
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert_eq!(
            report.diagram,
            FragmentStatus::Fallback("syntax error in graph".to_string())
        );
        assert!(coordinator.cache().latest().unwrap().contains("进化路径流程图"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chart_times_out_into_text_panel() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new().with_chart(Arc::new(SlowChart));
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert_eq!(
            report.chart,
            FragmentStatus::Fallback(Error::RenderTimeout(2000).to_string())
        );
        let guard = doc.lock().await;
        let panel = guard.elements_by_class(CHART_FALLBACK_CLASS);
        assert_eq!(panel.len(), 1);
        assert!(guard.text_content(panel[0]).contains("高阶应用层：8/9"));
    }

    #[tokio::test]
    async fn changed_scores_invalidate_the_cache() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new();
        coordinator.ensure_ready(&doc, scores()).await.unwrap();
        let other = DimensionScores::new(1, 2, 3).unwrap();
        coordinator.render_report(&doc, other).await.unwrap();
        assert!(coordinator.cache().latest_for(&scores()).is_none());
        assert!(coordinator.cache().latest_for(&other).is_some());
    }

    #[tokio::test]
    async fn stale_fragments_are_regenerated_for_new_scores() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        let coordinator = ReadinessCoordinator::new().without_diagram();
        let first = DimensionScores::new(9, 9, 9).unwrap();
        let second = DimensionScores::new(1, 2, 3).unwrap();
        coordinator.ensure_ready(&doc, first).await.unwrap();

        let report = coordinator.ensure_ready(&doc, second).await.unwrap();
        assert!(report.diagram.is_fallback());
        assert_eq!(report.table, FragmentStatus::Generated);
        assert_eq!(report.narrative, FragmentStatus::Generated);
        assert_eq!(report.compass, FragmentStatus::Generated);

        let guard = doc.lock().await;
        let diagram = guard.get_element_by_id(ids::DIAGRAM).unwrap();
        let markup = guard.inner_html(diagram);
        assert!(markup.contains("18.9"));
        assert!(!markup.contains("100.0"));
        let cached = coordinator.cache().latest_for(&second).unwrap();
        assert!(cached.contains("18.9"));
    }

    #[tokio::test]
    async fn content_of_unknown_origin_is_not_trusted() {
        let doc = shared(Document::parse(DEFAULT_PAGE));
        {
            let mut guard = doc.lock().await;
            let diagram = guard.get_element_by_id(ids::DIAGRAM).unwrap();
            let stale = format!("<p>{}</p>", "x".repeat(200));
            guard.set_inner_html(diagram, &stale).unwrap();
        }
        let coordinator = ReadinessCoordinator::new();
        let report = coordinator.ensure_ready(&doc, scores()).await.unwrap();
        assert_eq!(report.diagram, FragmentStatus::Generated);
        assert!(coordinator.cache().latest_for(&scores()).unwrap().contains("<svg"));
    }

    #[tokio::test]
    async fn missing_container_is_an_error() {
        let doc = shared(Document::new());
        let err = ReadinessCoordinator::bare().ensure_ready(&doc, scores()).await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
    }
}
