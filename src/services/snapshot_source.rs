use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

use crate::models::StockMetricSnapshot;

/// Supplier of the latest metric snapshot per symbol.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshots(&self) -> anyhow::Result<Vec<StockMetricSnapshot>>;
}

/// Fixed in-memory set, for tests and for deployments without a feed.
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshotSource {
    snapshots: Vec<StockMetricSnapshot>,
}

impl StaticSnapshotSource {
    pub fn new(snapshots: Vec<StockMetricSnapshot>) -> Self {
        Self { snapshots }
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch_snapshots(&self) -> anyhow::Result<Vec<StockMetricSnapshot>> {
        Ok(self.snapshots.clone())
    }
}

/// Reads a JSON array of snapshots from disk on every fetch, so an external
/// job can refresh the file in place.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch_snapshots(&self) -> anyhow::Result<Vec<StockMetricSnapshot>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading snapshots from {}", self.path.display()))?;
        let snapshots: Vec<StockMetricSnapshot> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing snapshots in {}", self.path.display()))?;

        tracing::debug!(
            path = %self.path.display(),
            count = snapshots.len(),
            "Loaded metric snapshots"
        );
        Ok(snapshots)
    }
}
