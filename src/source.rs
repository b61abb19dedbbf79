//! Loading the report page from a file or an http(s) URL.

use std::path::Path;
use std::time::Duration;

use log::{debug, info};
use url::Url;

use crate::dom::Document;
use crate::{Error, Result};

/// Where a page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    File(std::path::PathBuf),
    Remote(Url),
}

impl PageLocation {
    /// `http://` and `https://` are fetched; `file://` URLs and anything that
    /// does not parse as a URL are read from disk.
    pub fn parse(location: &str) -> Result<Self> {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(PageLocation::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(PageLocation::File)
                .map_err(|_| Error::LoadError(format!("invalid file URL: {}", location))),
            // Windows drive letters parse as a one-letter scheme
            Ok(url) if url.scheme().len() > 1 => {
                Err(Error::LoadError(format!("unsupported scheme '{}'", url.scheme())))
            }
            _ => Ok(PageLocation::File(Path::new(location).to_path_buf())),
        }
    }
}

/// Fetch the page HTML and parse it.
pub async fn load_page(location: &str, timeout: Duration) -> Result<Document> {
    let html = match PageLocation::parse(location)? {
        PageLocation::File(path) => {
            debug!("Reading page from {}", path.display());
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::LoadError(format!("{}: {}", path.display(), e)))?
        }
        PageLocation::Remote(url) => fetch(url, timeout).await?,
    };
    info!("Loaded page from {} ({} bytes)", location, html.len());
    Ok(Document::parse(&html))
}

#[cfg(feature = "http")]
async fn fetch(url: Url, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::LoadError(format!("Failed to build HTTP client: {}", e)))?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::LoadError(format!("{}: {}", url, e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::LoadError(format!("{} returned HTTP {}", url, status)));
    }
    response
        .text()
        .await
        .map_err(|e| Error::LoadError(format!("{}: {}", url, e)))
}

#[cfg(not(feature = "http"))]
async fn fetch(url: Url, _timeout: Duration) -> Result<String> {
    Err(Error::LoadError(format!(
        "{}: built without the `http` feature",
        url
    )))
}
