//! Report session: the input view / report view state machine that owns the
//! current scores.

use std::time::Duration;

use log::{info, warn};

use crate::capture::{CaptureOutcome, LongImagePipeline, StatusNotifier};
use crate::dom::{shared, Document, SharedDocument};
use crate::readiness::ReadinessReport;
use crate::report::template::ids;
use crate::report::{DimensionScores, DEFAULT_PAGE};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Input,
    Report,
}

#[derive(Debug)]
pub struct ReportSession {
    doc: SharedDocument,
    pipeline: LongImagePipeline,
    scores: Option<DimensionScores>,
}

impl ReportSession {
    /// Session over the built-in report page.
    pub fn new(pipeline: LongImagePipeline) -> Self {
        Self::with_document(pipeline, Document::parse(DEFAULT_PAGE))
    }

    pub fn with_document(pipeline: LongImagePipeline, doc: Document) -> Self {
        Self {
            doc: shared(doc),
            pipeline,
            scores: None,
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    pub fn pipeline(&self) -> &LongImagePipeline {
        &self.pipeline
    }

    pub fn scores(&self) -> Option<DimensionScores> {
        self.scores
    }

    pub fn view(&self) -> View {
        if self.scores.is_some() {
            View::Report
        } else {
            View::Input
        }
    }

    fn notifier(&self) -> StatusNotifier {
        StatusNotifier::new(
            self.doc.clone(),
            Duration::from_millis(self.pipeline.config().status_dismiss_ms),
        )
    }

    /// Validate `input`, switch to the report view and render every
    /// fragment. Invalid input leaves the input view showing an inline error.
    pub async fn generate(&mut self, input: &str) -> Result<ReadinessReport> {
        let notifier = self.notifier();
        let scores = match DimensionScores::parse_input(input) {
            Ok(scores) => scores,
            Err(err) => {
                let message = match &err {
                    Error::InvalidInput(message) => message.clone(),
                    other => other.to_string(),
                };
                if let Err(banner_err) = notifier.input_error(&message).await {
                    warn!("Could not show input error '{}': {}", message, banner_err);
                }
                return Err(err);
            }
        };
        notifier.clear_input_error().await;

        {
            let mut doc = self.doc.lock().await;
            if let Some(field) = doc.get_element_by_id(ids::SCORE_INPUT) {
                if let Some(el) = doc.element_mut(field) {
                    el.set_attr("value", input.trim());
                }
            }
            switch_view(&mut doc, View::Report);
        }
        self.scores = Some(scores);
        info!(
            "Generating report for {}/{}/{} (composite {:.1})",
            scores.advanced(),
            scores.comprehensive(),
            scores.basic(),
            scores.composite()
        );
        self.pipeline.coordinator().render_report(&self.doc, scores).await
    }

    /// Return to the input view and drop the generated report.
    pub async fn back_to_input(&mut self) -> Result<()> {
        {
            let mut doc = self.doc.lock().await;
            switch_view(&mut doc, View::Input);
        }
        self.scores = None;
        self.pipeline.coordinator().clear_report(&self.doc).await
    }

    /// Produce the long image of the current report.
    pub async fn capture(&self) -> Result<CaptureOutcome> {
        let scores = self
            .scores
            .ok_or_else(|| Error::InvalidInput("no report has been generated".into()))?;
        self.pipeline.run(&self.doc, scores).await
    }
}

/// Show one page and hide the other. Both the `active` class and the inline
/// `display` are updated, since captures only see inline styles.
fn switch_view(doc: &mut Document, view: View) {
    let (show, hide) = match view {
        View::Input => (ids::INPUT_PAGE, ids::REPORT_PAGE),
        View::Report => (ids::REPORT_PAGE, ids::INPUT_PAGE),
    };
    if let Some(el) = doc.get_element_by_id(hide).and_then(|n| doc.element_mut(n)) {
        el.remove_class("active");
        el.style.set("display", "none");
    }
    if let Some(el) = doc.get_element_by_id(show).and_then(|n| doc.element_mut(n)) {
        el.add_class("active");
        el.style.set("display", "block");
    }
    doc.scroll = Default::default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemorySink;
    use crate::CaptureConfig;
    use std::sync::Arc;

    fn session() -> ReportSession {
        let pipeline = LongImagePipeline::from_config(CaptureConfig::default(), Arc::new(MemorySink::new()));
        ReportSession::new(pipeline)
    }

    async fn display_of(session: &ReportSession, id: &str) -> Option<String> {
        let doc = session.document().lock().await;
        let node = doc.get_element_by_id(id)?;
        doc.element(node)?.style.get("display").map(str::to_string)
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_input_stays_on_input_view() {
        let mut s = session();
        let err = s.generate("87.55").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "请输入99.9格式的分数"));
        assert_eq!(s.view(), View::Input);
        let doc = s.document().lock().await;
        let banner = doc.elements_by_class(ids::ERROR_CLASS);
        assert_eq!(banner.len(), 1);
        assert_eq!(doc.text_content(banner[0]), "请输入99.9格式的分数");
    }

    #[tokio::test(start_paused = true)]
    async fn misplaced_decimal_point_gets_the_format_message() {
        let mut s = session();
        let err = s.generate("8.75").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m == "请输入有效的分数格式（99.9）"));
        assert_eq!(s.view(), View::Input);
        let doc = s.document().lock().await;
        let banner = doc.elements_by_class(ids::ERROR_CLASS);
        assert_eq!(banner.len(), 1);
        assert_eq!(doc.text_content(banner[0]), "请输入有效的分数格式（99.9）");
    }

    #[tokio::test(start_paused = true)]
    async fn generate_then_back_clears_fragments() {
        let mut s = session();
        let report = s.generate("87.5").await.unwrap();
        assert_eq!(report.fallbacks(), 0);
        assert_eq!(s.view(), View::Report);
        assert_eq!(display_of(&s, ids::REPORT_PAGE).await.as_deref(), Some("block"));
        assert_eq!(display_of(&s, ids::INPUT_PAGE).await.as_deref(), Some("none"));
        assert!(s.pipeline().coordinator().cache().latest().is_some());

        s.back_to_input().await.unwrap();
        assert_eq!(s.view(), View::Input);
        assert_eq!(display_of(&s, ids::INPUT_PAGE).await.as_deref(), Some("block"));
        assert!(s.pipeline().coordinator().cache().latest().is_none());
        let doc = s.document().lock().await;
        for id in [ids::EVALUATION_TBODY, ids::NARRATIVE, ids::DIAGRAM, ids::COMPASS] {
            let node = doc.get_element_by_id(id).unwrap();
            assert!(doc.children(node).is_empty(), "#{} not cleared", id);
        }
        let canvas = doc.get_element_by_id(ids::RADAR_CHART).unwrap();
        assert!(doc.element(canvas).unwrap().bitmap.is_none());
    }

    #[tokio::test]
    async fn capture_requires_a_report() {
        let s = session();
        assert!(matches!(s.capture().await, Err(Error::InvalidInput(_))));
    }
}
