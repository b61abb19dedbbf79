//! Headless Chrome rasterizer.
//!
//! A dedicated worker thread owns the browser and tab; async callers send it
//! commands and await the reply on a oneshot channel. The sanitized clone is
//! serialized, canvases are swapped for PNG `<img>` data URLs, and the whole
//! page is loaded as a base64 `data:` URL before the root element is
//! screenshotted.

use std::ffi::OsStr;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::future::{BoxFuture, FutureExt};
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::capture::emit::encode_png;
use crate::capture::{prepare_clone, CaptureOptions, CapturedBuffer, Rasterizer, RasterizerSource};
use crate::dom::{Document, NodeId};
use crate::{Error, Result, Viewport};

/// Marks the capture root inside the serialized clone.
const ROOT_MARKER: &str = "data-capture-root";

enum Command {
    Capture(String, oneshot::Sender<Result<Vec<u8>>>),
    Close,
}

/// Rasterizer backed by a headless Chrome worker thread.
pub struct ChromeRasterizer {
    cmd_tx: Mutex<Sender<Command>>,
    scale: f32,
}

impl std::fmt::Debug for ChromeRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromeRasterizer").field("scale", &self.scale).finish()
    }
}

impl ChromeRasterizer {
    /// Start Chrome on a worker thread and wait until it is ready.
    pub async fn launch(window: Viewport, scale: f32) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let scale_arg = format!("--force-device-scale-factor={}", scale);
            let launch_options = match LaunchOptions::default_builder()
                .headless(true)
                .window_size(Some((window.width, window.height)))
                .args(vec![OsStr::new(&scale_arg)])
                .build()
            {
                Ok(o) => o,
                Err(e) => {
                    let _ = init_tx.send(Err(Error::RasterizerLoadFailure(format!(
                        "Failed to build launch options: {}",
                        e
                    ))));
                    return;
                }
            };
            let browser = match Browser::new(launch_options) {
                Ok(b) => b,
                Err(e) => {
                    let _ = init_tx.send(Err(Error::RasterizerLoadFailure(format!("Failed to launch browser: {}", e))));
                    return;
                }
            };
            let tab = match browser.new_tab() {
                Ok(t) => t,
                Err(e) => {
                    let _ = init_tx.send(Err(Error::RasterizerLoadFailure(format!("Failed to create tab: {}", e))));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Capture(url, resp) => {
                        let res = screenshot_root(&tab, &url);
                        let _ = resp.send(res);
                    }
                    Command::Close => break,
                }
            }
            debug!("Chrome worker exiting");
        });

        init_rx
            .await
            .map_err(|e| Error::RasterizerLoadFailure(format!("Worker init canceled: {}", e)))??;
        info!("Headless Chrome ready ({}x{} @ {}x)", window.width, window.height, scale);
        Ok(Self {
            cmd_tx: Mutex::new(cmd_tx),
            scale,
        })
    }

    async fn send(&self, url: String) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .send(Command::Capture(url, tx))
            .map_err(|e| Error::RasterizationFailure(format!("Chrome worker is gone: {}", e)))?;
        rx.await
            .map_err(|e| Error::RasterizationFailure(format!("Chrome worker dropped the reply: {}", e)))?
    }
}

impl Drop for ChromeRasterizer {
    fn drop(&mut self) {
        let _ = self.cmd_tx.lock().unwrap_or_else(|e| e.into_inner()).send(Command::Close);
    }
}

fn screenshot_root(tab: &headless_chrome::Tab, url: &str) -> Result<Vec<u8>> {
    tab.navigate_to(url)
        .map_err(|e| Error::RasterizationFailure(format!("Navigation failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| Error::RasterizationFailure(format!("Wait for navigation failed: {}", e)))?;
    let root = tab
        .wait_for_element(&format!("[{}]", ROOT_MARKER))
        .map_err(|e| Error::RasterizationFailure(format!("Capture root not rendered: {}", e)))?;
    root.capture_screenshot(Page::CaptureScreenshotFormatOption::Png)
        .map_err(|e| Error::RasterizationFailure(format!("Screenshot failed: {}", e)))
}

/// Serialize the prepared clone into a self-contained `data:` URL.
pub fn clone_to_data_url(clone: &mut Document, root: NodeId) -> Result<String> {
    for canvas in clone.elements_by_tag("canvas") {
        let Some(bitmap) = clone.element_mut(canvas).and_then(|el| el.bitmap.take()) else {
            continue;
        };
        let (w, h) = bitmap.dimensions();
        let src = format!("data:image/png;base64,{}", STANDARD.encode(encode_png(&bitmap)?));
        let img = clone.create_element("img");
        if let Some(el) = clone.element_mut(img) {
            el.set_attr("src", &src);
            el.set_attr("width", &w.to_string());
            el.set_attr("height", &h.to_string());
        }
        clone.insert_after(canvas, img)?;
        clone.remove(canvas);
    }
    if let Some(el) = clone.element_mut(root) {
        el.set_attr(ROOT_MARKER, "1");
    }
    let html = format!("<!DOCTYPE html>{}", clone.to_html());
    Ok(format!("data:text/html;charset=utf-8;base64,{}", STANDARD.encode(html.as_bytes())))
}

impl Rasterizer for ChromeRasterizer {
    fn name(&self) -> &str {
        "chrome"
    }

    fn rasterize<'a>(
        &'a self,
        doc: &'a Document,
        root: NodeId,
        options: &'a CaptureOptions,
    ) -> BoxFuture<'a, Result<CapturedBuffer>> {
        async move {
            if (options.scale - self.scale).abs() > f32::EPSILON {
                warn!(
                    "Chrome was launched at scale {}, ignoring requested {}",
                    self.scale, options.scale
                );
            }
            let mut clone = prepare_clone(doc, root, options)?;
            let url = clone_to_data_url(&mut clone, root)?;
            let png = self.send(url).await?;
            let img = image::load_from_memory(&png)
                .map_err(|e| Error::RasterizationFailure(format!("Undecodable screenshot: {}", e)))?;
            Ok(img.to_rgba8())
        }
        .boxed()
    }
}

/// Rasterizer source that launches headless Chrome.
#[derive(Debug, Clone)]
pub struct ChromeSource {
    window: Viewport,
    scale: f32,
}

impl ChromeSource {
    pub fn new(window: Viewport, scale: f32) -> Self {
        Self { window, scale }
    }
}

impl RasterizerSource for ChromeSource {
    fn name(&self) -> &str {
        "chrome"
    }

    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn Rasterizer>>> {
        async move {
            let r = ChromeRasterizer::launch(self.window, self.scale).await?;
            Ok(Arc::new(r) as Arc<dyn Rasterizer>)
        }
        .boxed()
    }
}
