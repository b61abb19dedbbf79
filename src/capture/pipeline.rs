//! End-to-end long-image generation.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use super::emit::success_message;
use super::status::{self, StatusKind, StatusListener, StatusNotifier};
use super::{
    crop, ArtifactEmitter, CaptureInvoker, CaptureOptions, DownloadSink, EmitOutcome, RasterizerLoader, Sanitizer,
};
use crate::dom::SharedDocument;
use crate::readiness::{ReadinessCoordinator, ReadinessReport};
use crate::report::template::ids;
use crate::report::DimensionScores;
use crate::{CaptureConfig, Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub readiness: ReadinessReport,
    /// Size of the raw rasterizer output.
    pub captured: (u32, u32),
    /// False when cropping failed and the raw buffer was emitted.
    pub cropped: bool,
    pub artifact: EmitOutcome,
}

/// Runs readiness, capture, crop and emit in order for one report root.
pub struct LongImagePipeline {
    config: CaptureConfig,
    coordinator: ReadinessCoordinator,
    loader: Arc<RasterizerLoader>,
    invoker: CaptureInvoker,
    emitter: ArtifactEmitter,
    root_selector: String,
    listener: Option<StatusListener>,
}

impl std::fmt::Debug for LongImagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongImagePipeline")
            .field("root_selector", &self.root_selector)
            .field("coordinator", &self.coordinator)
            .field("loader", &self.loader)
            .finish()
    }
}

impl LongImagePipeline {
    pub fn new(
        config: CaptureConfig,
        coordinator: ReadinessCoordinator,
        loader: Arc<RasterizerLoader>,
        emitter: ArtifactEmitter,
    ) -> Self {
        Self {
            config,
            coordinator,
            loader,
            invoker: CaptureInvoker::new(),
            emitter,
            root_selector: format!("#{}", ids::REPORT_PAGE),
            listener: None,
        }
    }

    /// Built-in renderers and rasterizer, artifacts delivered to `sink`.
    pub fn from_config(config: CaptureConfig, sink: Arc<dyn DownloadSink>) -> Self {
        let coordinator = ReadinessCoordinator::from_config(&config);
        let loader = Arc::new(RasterizerLoader::builtin(Duration::from_millis(
            config.library_load_timeout_ms,
        )));
        let emitter = ArtifactEmitter::new(config.report_name.clone(), sink);
        Self::new(config, coordinator, loader, emitter)
    }

    pub fn with_root(mut self, selector: &str) -> Self {
        self.root_selector = selector.to_string();
        self
    }

    pub fn with_invoker(mut self, invoker: CaptureInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_status_listener(mut self, listener: StatusListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn coordinator(&self) -> &ReadinessCoordinator {
        &self.coordinator
    }

    pub fn invoker(&self) -> &CaptureInvoker {
        &self.invoker
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    fn notifier(&self, doc: &SharedDocument) -> StatusNotifier {
        let notifier = StatusNotifier::new(doc.clone(), Duration::from_millis(self.config.status_dismiss_ms));
        match &self.listener {
            Some(listener) => notifier.with_listener(listener.clone()),
            None => notifier,
        }
    }

    /// Banners are cosmetic: a document that cannot show one must not turn
    /// into a different error than the one being reported.
    async fn notify(&self, notifier: &StatusNotifier, kind: StatusKind, text: &str) {
        if let Err(err) = notifier.show(kind, text).await {
            warn!("Could not show status banner '{}': {}", text, err);
        }
    }

    /// Produce the long image for `scores`. Every failure is reported as a
    /// status banner before it is returned.
    pub async fn run(&self, doc: &SharedDocument, scores: DimensionScores) -> Result<CaptureOutcome> {
        let notifier = self.notifier(doc);

        let ticket = match self.invoker.begin(&self.root_selector) {
            Ok(ticket) => ticket,
            Err(err) => {
                self.notify(&notifier, StatusKind::Info, status::BUSY).await;
                return Err(err);
            }
        };

        if !self.loader.is_loaded() {
            self.notify(&notifier, StatusKind::Info, status::LOADING_LIBRARY).await;
        }
        let rasterizer = match self.loader.get().await {
            Ok(r) => r,
            Err(err) => {
                self.notify(&notifier, StatusKind::Error, status::LOAD_FAILED).await;
                return Err(err);
            }
        };

        self.notify(&notifier, StatusKind::Info, status::GENERATING).await;
        let readiness = match self.coordinator.ensure_ready(doc, scores).await {
            Ok(report) => report,
            Err(err) => {
                warn!("Content preparation failed: {}", err);
                self.notify(&notifier, StatusKind::Error, status::PREPARE_FAILED).await;
                return Err(err);
            }
        };

        let sanitizer = Sanitizer::new(scores, self.coordinator.cache().clone())
            .with_min_fragment_len(self.coordinator.min_fragment_len());
        let options = CaptureOptions::from_config(&self.config).with_on_clone(sanitizer.into_hook());

        let captured = match self
            .invoker
            .capture_with(&ticket, doc, rasterizer.as_ref(), &options)
            .await
        {
            Ok(buffer) => buffer,
            Err(err) => {
                let text = match &err {
                    Error::CaptureEmptyResult(_) => status::EMPTY_RESULT.to_string(),
                    other => status::rasterization_failed(&other.to_string()),
                };
                self.notify(&notifier, StatusKind::Error, &text).await;
                return Err(err);
            }
        };

        self.notify(&notifier, StatusKind::Info, status::CROPPING).await;
        let (image, cropped) = match crop(&captured, &self.config.crop) {
            Ok(image) => (image, true),
            Err(err) => {
                warn!("{}; emitting uncropped image", err);
                self.notify(&notifier, StatusKind::Info, status::CROP_FAILED).await;
                (captured.clone(), false)
            }
        };

        let artifact = match self.emitter.emit(&image).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Saving the long image failed: {}", err);
                self.notify(&notifier, StatusKind::Error, &status::save_failed(&err.to_string()))
                    .await;
                return Err(err);
            }
        };
        self.notify(
            &notifier,
            StatusKind::Success,
            &success_message(artifact.width, artifact.height),
        )
        .await;
        drop(ticket);

        info!("Long image ready: {}", artifact.file_name);
        Ok(CaptureOutcome {
            readiness,
            captured: captured.dimensions(),
            cropped,
            artifact,
        })
    }
}
