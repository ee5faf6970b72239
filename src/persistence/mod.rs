use std::path::{Path, PathBuf};

use crate::models::AssetSeries;
use crate::Result;

/// JSON file store for per-symbol candle histories
///
/// The file holds an array of `{symbol, candles}` records; symbol order is
/// preserved across save and load.
pub struct CandleStore {
    path: PathBuf,
}

impl CandleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<AssetSeries>> {
        let bytes = std::fs::read(&self.path)?;
        let series: Vec<AssetSeries> = serde_json::from_slice(&bytes)?;
        tracing::info!(
            "Loaded {} symbols ({} candles) from {}",
            series.len(),
            series.iter().map(AssetSeries::len).sum::<usize>(),
            self.path.display()
        );
        Ok(series)
    }

    pub fn save(&self, series: &[AssetSeries]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec(series)?)?;
        tracing::info!("Saved {} symbols to {}", series.len(), self.path.display());
        Ok(())
    }
}
