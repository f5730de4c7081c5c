//! Load-once cache of the prepared rental tables.

use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

use super::loader::{DataLoader, LoaderError};
use super::model::Datasets;
use crate::stats::Categorizer;

/// Locations of the two source files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPaths {
    pub daily: PathBuf,
    pub hourly: PathBuf,
}

impl Default for DatasetPaths {
    fn default() -> Self {
        Self {
            daily: PathBuf::from("day.csv"),
            hourly: PathBuf::from("hour.csv"),
        }
    }
}

/// Read-through memo of both tables, keyed by the paths it was built with.
///
/// The first successful [`DatasetCache::get`] loads, normalizes and
/// categorizes; every later call returns the same tables. Failed loads are
/// not memoized.
pub struct DatasetCache {
    paths: DatasetPaths,
    datasets: OnceLock<Datasets>,
}

impl DatasetCache {
    pub fn new(paths: DatasetPaths) -> Self {
        Self {
            paths,
            datasets: OnceLock::new(),
        }
    }

    /// Build a cache already holding `datasets`.
    pub fn with_datasets(paths: DatasetPaths, datasets: Datasets) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(datasets);
        Self {
            paths,
            datasets: cell,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.datasets.get().is_some()
    }

    pub fn get(&self) -> Result<&Datasets, LoaderError> {
        if let Some(datasets) = self.datasets.get() {
            return Ok(datasets);
        }
        let loaded = Self::load(&self.paths)?;
        Ok(self.datasets.get_or_init(|| loaded))
    }

    fn load(paths: &DatasetPaths) -> Result<Datasets, LoaderError> {
        let mut daily = DataLoader::load_daily(&paths.daily)?;
        Categorizer::attach(&mut daily);
        let hourly = DataLoader::load_hourly(&paths.hourly)?;

        info!(
            "Prepared {} daily and {} hourly records",
            daily.len(),
            hourly.len()
        );

        Ok(Datasets { daily, hourly })
    }
}
