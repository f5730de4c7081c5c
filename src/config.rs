//! Dashboard configuration file.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app::{ViewKind, ViewRequest, DEFAULT_PEAK_HOURS};
use crate::data::{DatasetPaths, FilterError, FilterSpec};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid filters: {0}")]
    Filter(#[from] FilterError),
    #[error("No views selected")]
    NoViews,
    #[error("Peak hour {0} is outside 0-23")]
    PeakHour(u8),
}

fn default_views() -> Vec<ViewKind> {
    ViewKind::ALL.to_vec()
}

fn default_peak_hours() -> BTreeSet<u8> {
    DEFAULT_PEAK_HOURS.into_iter().collect()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dashboard-output")
}

fn default_charts() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    #[serde(default)]
    pub data: DatasetPaths,
    #[serde(default)]
    pub filters: FilterSpec,
    #[serde(default = "default_views")]
    pub views: Vec<ViewKind>,
    /// Hours compared in the temporal view's peak-hour distribution.
    #[serde(default = "default_peak_hours")]
    pub peak_hours: BTreeSet<u8>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_charts")]
    pub charts: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data: DatasetPaths::default(),
            filters: FilterSpec::default(),
            views: default_views(),
            peak_hours: default_peak_hours(),
            output_dir: default_output_dir(),
            charts: default_charts(),
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file. Absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DashboardConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.views.is_empty() {
            return Err(ConfigError::NoViews);
        }
        if let Some(&hour) = self.peak_hours.iter().find(|h| **h > 23) {
            return Err(ConfigError::PeakHour(hour));
        }
        self.filters.validate()?;
        Ok(())
    }

    /// One request per selected view, in selection order, without repeats.
    pub fn requests(&self) -> Vec<ViewRequest> {
        let mut seen = Vec::new();
        for &kind in &self.views {
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }
        seen.into_iter()
            .map(|kind| match kind {
                ViewKind::TemporalPatterns => ViewRequest::TemporalPatterns {
                    filters: self.filters.clone(),
                    peak_hours: self.peak_hours.clone(),
                },
                other => other.request(self.filters.clone()),
            })
            .collect()
    }
}
