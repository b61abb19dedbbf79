//! Capture invocation: one rasterizer call per request, with temporary page
//! state saved before and restored after.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use super::{CaptureOptions, CapturedBuffer, Rasterizer};
use crate::dom::{Document, NodeId, ScrollPosition, SharedDocument};
use crate::report::template::ids;
use crate::{Error, Result};

type Registry = Arc<Mutex<HashSet<String>>>;

/// Exclusive right to capture one root. Released on drop.
pub struct CaptureTicket {
    root: String,
    registry: Registry,
}

impl CaptureTicket {
    pub fn root(&self) -> &str {
        &self.root
    }
}

impl fmt::Debug for CaptureTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureTicket").field("root", &self.root).finish()
    }
}

impl Drop for CaptureTicket {
    fn drop(&mut self) {
        let mut in_flight = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.root);
    }
}

/// Page state the capture changes temporarily.
#[derive(Debug, Default)]
struct ChromeState {
    /// Header button containers and their previous inline `display`.
    buttons: Vec<(NodeId, Option<String>)>,
    scroll: ScrollPosition,
}

impl ChromeState {
    fn hide(doc: &mut Document) -> Self {
        let mut state = ChromeState {
            scroll: doc.scroll,
            ..Default::default()
        };
        for node in doc.elements_by_class(ids::HEADER_BUTTONS_CLASS) {
            if let Some(el) = doc.element_mut(node) {
                state.buttons.push((node, el.style.get("display").map(str::to_string)));
                el.style.set("display", "none");
            }
        }
        let stale = doc.elements_by_class(ids::STATUS_TIP_CLASS);
        if !stale.is_empty() {
            debug!("Removing {} stale status banner(s)", stale.len());
        }
        for node in stale {
            doc.remove(node);
        }
        doc.scroll = ScrollPosition::default();
        state
    }

    fn restore(self, doc: &mut Document) {
        doc.scroll = self.scroll;
        for (node, display) in self.buttons {
            if let Some(el) = doc.element_mut(node) {
                match display {
                    Some(value) => el.style.set("display", &value),
                    None => {
                        el.style.remove("display");
                    }
                }
            }
        }
    }
}

fn validate(buffer: &CapturedBuffer) -> Result<()> {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::CaptureEmptyResult(format!("{}x{}", w, h)));
    }
    if buffer.get_pixel_checked(w / 2, h / 2).is_none() {
        return Err(Error::CaptureEmptyResult("centre pixel could not be sampled".into()));
    }
    Ok(())
}

/// Drives the rasterizer and rejects re-entrant captures of the same root.
#[derive(Clone, Default)]
pub struct CaptureInvoker {
    in_flight: Registry,
}

impl fmt::Debug for CaptureInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("CaptureInvoker").field("in_flight", &*in_flight).finish()
    }
}

impl CaptureInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `root`. Fails with [`Error::CaptureInProgress`] while another
    /// ticket for the same root is alive.
    pub fn begin(&self, root: &str) -> Result<CaptureTicket> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(root.to_string()) {
            return Err(Error::CaptureInProgress(root.to_string()));
        }
        Ok(CaptureTicket {
            root: root.to_string(),
            registry: self.in_flight.clone(),
        })
    }

    pub fn is_busy(&self, root: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(root)
    }

    pub async fn capture(
        &self,
        doc: &SharedDocument,
        root_selector: &str,
        rasterizer: &dyn Rasterizer,
        options: &CaptureOptions,
    ) -> Result<CapturedBuffer> {
        let ticket = self.begin(root_selector)?;
        self.capture_with(&ticket, doc, rasterizer, options).await
    }

    /// Capture the root held by `ticket`. Chrome visibility and scroll are
    /// restored whether or not rasterization succeeds.
    pub async fn capture_with(
        &self,
        ticket: &CaptureTicket,
        doc: &SharedDocument,
        rasterizer: &dyn Rasterizer,
        options: &CaptureOptions,
    ) -> Result<CapturedBuffer> {
        let mut guard = doc.lock().await;
        let root = guard
            .query(ticket.root())?
            .ok_or_else(|| Error::ElementNotFound(ticket.root().to_string()))?;

        let saved = ChromeState::hide(&mut guard);
        debug!("Rasterizing {} with {}", ticket.root(), rasterizer.name());
        let result = tokio::time::timeout(options.timeout, rasterizer.rasterize(&guard, root, options)).await;
        saved.restore(&mut guard);
        drop(guard);

        let buffer = match result {
            Ok(Ok(buffer)) => buffer,
            Ok(Err(err)) => {
                warn!("Rasterizer {} failed: {}", rasterizer.name(), err);
                return Err(match err {
                    Error::RasterizationFailure(_) | Error::CaptureEmptyResult(_) => err,
                    other => Error::RasterizationFailure(other.to_string()),
                });
            }
            Err(_) => {
                return Err(Error::RasterizationFailure(format!(
                    "timed out after {}ms",
                    options.timeout.as_millis()
                )))
            }
        };
        validate(&buffer)?;
        info!(
            "Captured {} at {}x{}",
            ticket.root(),
            buffer.width(),
            buffer.height()
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::shared;
    use futures::future::{BoxFuture, FutureExt};
    use image::RgbaImage;
    use std::time::Duration;

    /// Records what the live document looked like while it was rasterized.
    struct FixedSize {
        size: (u32, u32),
        seen: Mutex<Vec<(Option<String>, ScrollPosition)>>,
    }

    impl Rasterizer for FixedSize {
        fn name(&self) -> &str {
            "fixed-size"
        }

        fn rasterize<'a>(
            &'a self,
            doc: &'a Document,
            _root: NodeId,
            _options: &'a CaptureOptions,
        ) -> BoxFuture<'a, Result<CapturedBuffer>> {
            async move {
                let buttons = doc.elements_by_class(ids::HEADER_BUTTONS_CLASS)[0];
                let display = doc.element(buttons).unwrap().style.get("display").map(str::to_string);
                self.seen.lock().unwrap().push((display, doc.scroll));
                Ok(RgbaImage::new(self.size.0, self.size.1))
            }
            .boxed()
        }
    }

    fn page() -> SharedDocument {
        let mut doc = Document::parse(
            r#"<body><div id="report-page"><div class="header-buttons" style="display: flex"></div>
               <div class="image-generation-tip">old</div><p>body</p></div></body>"#,
        );
        doc.scroll = ScrollPosition { x: 0, y: 420 };
        shared(doc)
    }

    fn fixed_size(w: u32, h: u32) -> FixedSize {
        FixedSize {
            size: (w, h),
            seen: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn hides_chrome_during_capture_and_restores_after() {
        let doc = page();
        let rasterizer = fixed_size(40, 30);
        let buffer = CaptureInvoker::new()
            .capture(&doc, "#report-page", &rasterizer, &CaptureOptions::default())
            .await
            .unwrap();
        assert_eq!(buffer.dimensions(), (40, 30));
        assert_eq!(
            rasterizer.seen.lock().unwrap()[0],
            (Some("none".to_string()), ScrollPosition::default())
        );

        let guard = doc.lock().await;
        let buttons = guard.elements_by_class(ids::HEADER_BUTTONS_CLASS)[0];
        assert_eq!(guard.element(buttons).unwrap().style.get("display"), Some("flex"));
        assert_eq!(guard.scroll.y, 420);
        assert!(guard.elements_by_class(ids::STATUS_TIP_CLASS).is_empty());
    }

    #[tokio::test]
    async fn empty_result_is_rejected_after_restoring() {
        let doc = page();
        let err = CaptureInvoker::new()
            .capture(&doc, "#report-page", &fixed_size(0, 30), &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CaptureEmptyResult(_)));
        assert_eq!(doc.lock().await.scroll.y, 420);
    }

    #[test]
    fn second_ticket_for_same_root_is_rejected() {
        let invoker = CaptureInvoker::new();
        let first = invoker.begin("#report-page").unwrap();
        assert!(matches!(
            invoker.begin("#report-page"),
            Err(Error::CaptureInProgress(_))
        ));
        assert!(invoker.begin("#other").is_ok());
        drop(first);
        assert!(!invoker.is_busy("#report-page"));
        assert!(invoker.begin("#report-page").is_ok());
    }

    struct Hang;

    impl Rasterizer for Hang {
        fn name(&self) -> &str {
            "hang"
        }

        fn rasterize<'a>(
            &'a self,
            _doc: &'a Document,
            _root: NodeId,
            _options: &'a CaptureOptions,
        ) -> BoxFuture<'a, Result<CapturedBuffer>> {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RgbaImage::new(1, 1))
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_restores_chrome() {
        let doc = page();
        let err = CaptureInvoker::new()
            .capture(&doc, "#report-page", &Hang, &CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RasterizationFailure(_)));
        let guard = doc.lock().await;
        let buttons = guard.elements_by_class(ids::HEADER_BUTTONS_CLASS)[0];
        assert_eq!(guard.element(buttons).unwrap().style.get("display"), Some("flex"));
    }
}
