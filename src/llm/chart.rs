use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Supplies the chart image shown to the vision model.
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// PNG bytes, or `None` when no chart is available this cycle.
    async fn capture(&self) -> Result<Option<Vec<u8>>>;
}

/// Reads a screenshot written by an external capture job.
pub struct FileChartSource {
    path: PathBuf,
}

impl FileChartSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ChartSource for FileChartSource {
    async fn capture(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("Loaded chart image {} ({} bytes)", self.path.display(), bytes.len());
                Ok(Some(bytes))
            }
            Ok(_) => {
                warn!("⚠️ Chart image {} is empty", self.path.display());
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("⚠️ Chart image {} not found", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
