//! Artifact emission: PNG encoding, file naming, delivery.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use log::info;

use crate::{Error, Result};

/// An encoded image ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Where finished artifacts go.
pub trait DownloadSink: Send + Sync {
    /// Persist `artifact`; returns its location when the sink has one.
    fn deliver<'a>(&'a self, artifact: &'a Artifact) -> BoxFuture<'a, Result<Option<PathBuf>>>;
}

/// Writes artifacts into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DownloadSink for DirectorySink {
    fn deliver<'a>(&'a self, artifact: &'a Artifact) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        async move {
            tokio::fs::create_dir_all(&self.dir).await?;
            let path = self.dir.join(&artifact.file_name);
            tokio::fs::write(&path, &artifact.png).await?;
            Ok(Some(path))
        }
        .boxed()
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    artifacts: Arc<Mutex<Vec<Artifact>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifacts(&self) -> Vec<Artifact> {
        self.artifacts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl DownloadSink for MemorySink {
    fn deliver<'a>(&'a self, artifact: &'a Artifact) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        async move {
            self.artifacts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(artifact.clone());
            Ok(None)
        }
        .boxed()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOutcome {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    pub location: Option<PathBuf>,
}

/// ISO-8601 UTC timestamp truncated to seconds, with `:` and `.` replaced
/// by `-` so it is safe in file names.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S")
        .to_string()
        .replace([':', '.'], "-")
}

pub fn file_name(report_name: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}.png", report_name, file_stamp(now))
}

/// Lossless RGBA PNG at the best compression level.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    encoder
        .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
        .map_err(|e| Error::EncodeError(e.to_string()))?;
    Ok(out)
}

pub fn success_message(width: u32, height: u32) -> String {
    format!("✅ 长图生成成功！尺寸: {}×{}", width, height)
}

pub struct ArtifactEmitter {
    report_name: String,
    sink: Arc<dyn DownloadSink>,
}

impl std::fmt::Debug for ArtifactEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactEmitter")
            .field("report_name", &self.report_name)
            .finish()
    }
}

impl ArtifactEmitter {
    pub fn new(report_name: impl Into<String>, sink: Arc<dyn DownloadSink>) -> Self {
        Self {
            report_name: report_name.into(),
            sink,
        }
    }

    pub async fn emit(&self, image: &RgbaImage) -> Result<EmitOutcome> {
        self.emit_at(image, Utc::now()).await
    }

    pub async fn emit_at(&self, image: &RgbaImage, now: DateTime<Utc>) -> Result<EmitOutcome> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::EncodeError("refusing to encode an empty image".into()));
        }
        let artifact = Artifact {
            file_name: file_name(&self.report_name, now),
            width: image.width(),
            height: image.height(),
            png: encode_png(image)?,
        };
        let location = self.sink.deliver(&artifact).await?;
        info!(
            "Emitted {} ({}x{}, {} bytes)",
            artifact.file_name,
            artifact.width,
            artifact.height,
            artifact.png.len()
        );
        Ok(EmitOutcome {
            file_name: artifact.file_name,
            width: artifact.width,
            height: artifact.height,
            bytes: artifact.png.len(),
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgba;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 30).unwrap()
    }

    #[test]
    fn file_name_uses_dashed_timestamp() {
        assert_eq!(file_stamp(at()), "2024-03-09T07-05-30");
        assert_eq!(
            file_name("CTA测评报告_优化版", at()),
            "CTA测评报告_优化版_2024-03-09T07-05-30.png"
        );
    }

    #[test]
    fn png_round_trips_losslessly() {
        let mut img = RgbaImage::from_pixel(7, 5, Rgba([1, 2, 3, 4]));
        img.put_pixel(6, 4, Rgba([250, 251, 252, 253]));
        let bytes = encode_png(&img).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }

    #[tokio::test]
    async fn emitter_delivers_to_sink() {
        let sink = MemorySink::new();
        let emitter = ArtifactEmitter::new("report", Arc::new(sink.clone()));
        let outcome = emitter
            .emit_at(&RgbaImage::from_pixel(3, 2, Rgba([0, 0, 0, 255])), at())
            .await
            .unwrap();
        assert_eq!(outcome.file_name, "report_2024-03-09T07-05-30.png");
        assert_eq!((outcome.width, outcome.height), (3, 2));
        assert_eq!(outcome.location, None);
        assert_eq!(sink.artifacts().len(), 1);
    }

    #[tokio::test]
    async fn directory_sink_writes_file() {
        let dir = std::env::temp_dir().join(format!("report-capture-emit-{}", std::process::id()));
        let emitter = ArtifactEmitter::new("report", Arc::new(DirectorySink::new(&dir)));
        let outcome = emitter
            .emit_at(&RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255])), at())
            .await
            .unwrap();
        let path = outcome.location.unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), outcome.bytes);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn success_message_reports_size() {
        assert_eq!(success_message(1500, 4200), "✅ 长图生成成功！尺寸: 1500×4200");
    }
}
