use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use report_capture::capture::status::StatusMessage;
use report_capture::capture::{ArtifactEmitter, DirectorySink, LongImagePipeline, RasterizerLoader};
use report_capture::dom::Document;
use report_capture::report::DEFAULT_PAGE;
use report_capture::{source, CaptureConfig, ReadinessCoordinator, ReportSession};

/// Render an assessment report for a score and save it as a long PNG.
#[derive(Debug, Parser)]
#[command(name = "report-capture", version)]
struct Args {
    /// Score in NN.N form, e.g. 87.5
    #[arg(long)]
    score: String,

    /// Report page to render (file path or http(s) URL); the built-in page by default
    #[arg(long)]
    page: Option<String>,

    /// Directory the PNG is written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// JSON capture config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device pixel ratio override
    #[arg(long)]
    scale: Option<f32>,

    /// Skip the diagram engine and use the text flowchart
    #[arg(long)]
    text_diagram: bool,

    /// Rasterize with headless Chrome, falling back to the built-in rasterizer
    #[arg(long)]
    chrome: bool,
}

fn load_config(args: &Args) -> anyhow::Result<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            CaptureConfig::from_json(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => CaptureConfig::default(),
    };
    if let Some(scale) = args.scale {
        config.scale = scale;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[cfg(feature = "cdp")]
fn chrome_loader(config: &CaptureConfig, timeout: Duration) -> anyhow::Result<RasterizerLoader> {
    let chrome = report_capture::cdp::ChromeSource::new(config.viewport, config.scale);
    Ok(RasterizerLoader::new(Arc::new(chrome), timeout)
        .with_fallback(Arc::new(report_capture::capture::BuiltinSource)))
}

#[cfg(not(feature = "cdp"))]
fn chrome_loader(_config: &CaptureConfig, _timeout: Duration) -> anyhow::Result<RasterizerLoader> {
    bail!("--chrome needs a build with the `cdp` feature")
}

fn loader(args: &Args, config: &CaptureConfig) -> anyhow::Result<RasterizerLoader> {
    let timeout = Duration::from_millis(config.library_load_timeout_ms);
    if args.chrome {
        chrome_loader(config, timeout)
    } else {
        Ok(RasterizerLoader::builtin(timeout))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let doc = match &args.page {
        Some(page) => source::load_page(page, Duration::from_millis(config.rasterizer_timeout_ms))
            .await
            .with_context(|| format!("loading {}", page))?,
        None => Document::parse(DEFAULT_PAGE),
    };

    let mut coordinator = ReadinessCoordinator::from_config(&config);
    if args.text_diagram {
        coordinator = coordinator.without_diagram();
    }
    let loader = Arc::new(loader(&args, &config)?);
    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    let emitter = ArtifactEmitter::new(config.report_name.clone(), Arc::new(DirectorySink::new(&args.out_dir)));
    let pipeline = LongImagePipeline::new(config, coordinator, loader, emitter)
        .with_status_listener(Arc::new(|m: &StatusMessage| println!("{}", m.text)));

    let mut session = ReportSession::with_document(pipeline, doc);
    if let Err(err) = session.generate(&args.score).await {
        bail!("cannot generate report for '{}': {}", args.score, err);
    }
    let outcome = session.capture().await.context("long image generation failed")?;

    let fallbacks = outcome.readiness.fallbacks();
    if fallbacks > 0 {
        log::warn!("{} fragment(s) used fallback content", fallbacks);
    }
    match &outcome.artifact.location {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", outcome.artifact.file_name),
    }
    Ok(())
}
