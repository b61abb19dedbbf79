//! Lazy rasterizer loading with a primary and a fallback source.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use log::{info, warn};
use tokio::sync::OnceCell;

use super::Rasterizer;
use crate::rendering::BlockRasterizer;
use crate::{Error, Result};

/// Somewhere a rasterizer can be obtained from.
pub trait RasterizerSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn Rasterizer>>>;
}

/// Always-available in-process block rasterizer.
#[derive(Debug, Clone, Default)]
pub struct BuiltinSource;

impl RasterizerSource for BuiltinSource {
    fn name(&self) -> &str {
        "builtin"
    }

    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn Rasterizer>>> {
        async { Ok(Arc::new(BlockRasterizer::new()) as Arc<dyn Rasterizer>) }.boxed()
    }
}

/// Loads the rasterizer on first use and caches it. Each source gets its
/// own time budget; when both fail the attempt ends with
/// [`Error::RasterizerLoadFailure`] and the next call starts over.
pub struct RasterizerLoader {
    primary: Arc<dyn RasterizerSource>,
    fallback: Option<Arc<dyn RasterizerSource>>,
    timeout: Duration,
    loaded: OnceCell<Arc<dyn Rasterizer>>,
}

impl fmt::Debug for RasterizerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterizerLoader")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|s| s.name().to_string()))
            .field("timeout", &self.timeout)
            .field("loaded", &self.loaded.get().map(|r| r.name().to_string()))
            .finish()
    }
}

impl RasterizerLoader {
    pub fn new(primary: Arc<dyn RasterizerSource>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            timeout,
            loaded: OnceCell::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn RasterizerSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Loader backed only by the built-in rasterizer.
    pub fn builtin(timeout: Duration) -> Self {
        Self::new(Arc::new(BuiltinSource), timeout)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    async fn try_source(&self, source: &dyn RasterizerSource) -> Result<Arc<dyn Rasterizer>> {
        match tokio::time::timeout(self.timeout, source.load()).await {
            Ok(result) => result,
            Err(_) => Err(Error::RasterizerLoadFailure(format!(
                "{} did not load within {}ms",
                source.name(),
                self.timeout.as_millis()
            ))),
        }
    }

    pub async fn get(&self) -> Result<Arc<dyn Rasterizer>> {
        self.loaded
            .get_or_try_init(|| async {
                let primary_err = match self.try_source(self.primary.as_ref()).await {
                    Ok(r) => {
                        info!("Rasterizer loaded from {}", self.primary.name());
                        return Ok(r);
                    }
                    Err(e) => e,
                };
                warn!("Primary rasterizer source {} failed: {}", self.primary.name(), primary_err);

                let Some(fallback) = self.fallback.as_ref() else {
                    return Err(Error::RasterizerLoadFailure(primary_err.to_string()));
                };
                match self.try_source(fallback.as_ref()).await {
                    Ok(r) => {
                        info!("Rasterizer loaded from fallback {}", fallback.name());
                        Ok(r)
                    }
                    Err(fallback_err) => Err(Error::RasterizerLoadFailure(format!(
                        "{}; {}",
                        primary_err, fallback_err
                    ))),
                }
            })
            .await
            .cloned()
    }
}
