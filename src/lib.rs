//! Report Capture
//!
//! Turns a dynamically rendered assessment report into one cropped,
//! shareable PNG "long image".
//!
//! # Pipeline
//!
//! - **Readiness**: make sure the radar chart, flowchart diagram and text
//!   fragments exist, degrading to static fallbacks when a renderer is
//!   missing, fails, or runs out of time
//! - **Sanitize**: strip interactive chrome and neutralize layout in an
//!   off-screen clone, never in the live page
//! - **Capture**: rasterize the clone at a fixed scale
//! - **Crop**: trim background margins with a conservative bounding box
//! - **Emit**: encode a PNG and hand it to a download sink
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use report_capture::capture::{DirectorySink, LongImagePipeline};
//! use report_capture::session::ReportSession;
//! use report_capture::CaptureConfig;
//!
//! # async fn run() -> report_capture::Result<()> {
//! let config = CaptureConfig::default();
//! let sink = Arc::new(DirectorySink::new("out"));
//! let pipeline = LongImagePipeline::from_config(config, sink);
//! let mut session = ReportSession::new(pipeline);
//! session.generate("87.5").await?;
//! let outcome = session.capture().await?;
//! println!("{} ({}x{})", outcome.artifact.file_name, outcome.artifact.width, outcome.artifact.height);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod capture;
pub mod dom;
pub mod readiness;
pub mod rendering;
pub mod report;
pub mod session;
pub mod source;

// Headless Chrome rasterizer
#[cfg(feature = "cdp")]
pub mod cdp;

pub use capture::{CaptureOptions, CropPolicy, LongImagePipeline, Rasterizer};
pub use readiness::ReadinessCoordinator;
pub use report::{Dimension, DimensionScores};
pub use session::ReportSession;

/// Configuration for the capture pipeline
///
/// Defaults match the report viewer: a 1.5x capture on white, 15 s for the
/// rasterizer, 10 s per rasterizer source, 2 s for the chart and 3 s for the
/// diagram.
///
/// # Examples
///
/// ```
/// let cfg = report_capture::CaptureConfig::default();
/// assert_eq!(cfg.scale, 1.5);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Base of the artifact file name
    pub report_name: String,
    /// Window the capture clone is laid out in
    pub viewport: Viewport,
    /// Device pixel ratio of the capture
    pub scale: f32,
    /// Canvas fill behind the captured content
    pub background: String,
    pub rasterizer_timeout_ms: u64,
    /// Budget per rasterizer source (primary, then fallback)
    pub library_load_timeout_ms: u64,
    pub chart_timeout_ms: u64,
    pub diagram_timeout_ms: u64,
    /// How long status banners stay on screen
    pub status_dismiss_ms: u64,
    /// Text fragments shorter than this are regenerated before capture
    pub min_fragment_len: usize,
    pub crop: CropPolicy,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            report_name: "CTA测评报告_优化版".to_string(),
            viewport: Viewport::default(),
            scale: 1.5,
            background: "#ffffff".to_string(),
            rasterizer_timeout_ms: 15_000,
            library_load_timeout_ms: 10_000,
            chart_timeout_ms: 2_000,
            diagram_timeout_ms: 3_000,
            status_dismiss_ms: 3_000,
            min_fragment_len: 100,
            crop: CropPolicy::default(),
        }
    }
}

impl CaptureConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: CaptureConfig =
            serde_json::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.report_name.trim().is_empty() {
            return Err(Error::ConfigError("report_name must not be empty".into()));
        }
        if !(self.scale.is_finite() && self.scale > 0.0 && self.scale <= 4.0) {
            return Err(Error::ConfigError(format!("scale {} must be in (0, 4]", self.scale)));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must not be empty".into()));
        }
        if rendering::raster::css_color(&self.background).is_none() {
            return Err(Error::ConfigError(format!("unsupported background color '{}'", self.background)));
        }
        if self.rasterizer_timeout_ms == 0 || self.library_load_timeout_ms == 0 {
            return Err(Error::ConfigError("timeouts must be positive".into()));
        }
        self.crop.validate()
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
