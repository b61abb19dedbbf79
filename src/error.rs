//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing, capturing or emitting a report image
#[derive(Error, Debug)]
pub enum Error {
    /// A chart or diagram renderer is not installed
    #[error("Renderer unavailable: {0}")]
    RendererUnavailable(String),

    /// A renderer did not finish within its time budget
    #[error("Rendering timed out after {0}ms")]
    RenderTimeout(u64),

    /// The rasterizer returned a zero-sized or unsampleable buffer
    #[error("Capture produced an empty image: {0}")]
    CaptureEmptyResult(String),

    /// Cropping failed; callers fall back to the uncropped buffer
    #[error("Crop failed: {0}")]
    CropFailure(String),

    /// Neither the primary nor the fallback rasterizer source could be loaded
    #[error("Rasterizer could not be loaded: {0}")]
    RasterizerLoadFailure(String),

    /// The rasterizer itself failed
    #[error("Rasterization failed: {0}")]
    RasterizationFailure(String),

    /// A capture for the same root is already running
    #[error("A capture of '{0}' is already in progress")]
    CaptureInProgress(String),

    /// User input was rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A selector or id did not match any element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Image encoding failed
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Failed to load a page
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error while persisting an artifact
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the pipeline recovers from this error locally instead of
    /// surfacing it to the user.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::RendererUnavailable(_) | Error::RenderTimeout(_) | Error::CropFailure(_)
        )
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}
