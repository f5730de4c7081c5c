//! CSV Data Loader Module
//! Reads the daily and hourly rental files with Polars and checks their schema.

use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::model::{DailyRecord, HourlyRecord};
use super::processor::{DataProcessor, ProcessorError};
use super::schema::{Granularity, COL_INSTANT};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{granularity} data unavailable at {}: {reason}", path.display())]
    DataUnavailable {
        granularity: Granularity,
        path: PathBuf,
        reason: String,
    },
    #[error("{granularity} data at {} has no column '{column}'", path.display())]
    SchemaMismatch {
        granularity: Granularity,
        path: PathBuf,
        column: String,
    },
}

/// A freshly loaded table whose weather columns still hold [0,1] fractions.
///
/// Only the unit normalizer can turn this into a usable table, and it
/// consumes the frame doing so.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub(crate) df: DataFrame,
    pub(crate) granularity: Granularity,
}

impl RawFrame {
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }
}

/// Reads rental CSV files with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Load one rental table, verify its columns and drop the row identifier.
    pub fn load_csv(path: &Path, granularity: Granularity) -> Result<RawFrame, LoaderError> {
        let unavailable = |reason: String| LoaderError::DataUnavailable {
            granularity,
            path: path.to_path_buf(),
            reason,
        };

        if !path.is_file() {
            return Err(unavailable("file not found".to_string()));
        }

        info!("Loading {} data from {}", granularity, path.display());

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| unavailable(e.to_string()))?;

        let present = column_names(&df);
        if let Some(missing) = granularity
            .required_columns()
            .into_iter()
            .find(|required| !present.iter().any(|c| c == required))
        {
            return Err(LoaderError::SchemaMismatch {
                granularity,
                path: path.to_path_buf(),
                column: missing.to_string(),
            });
        }

        let df = if present.iter().any(|c| c == COL_INSTANT) {
            debug!("Dropping identifier column '{}'", COL_INSTANT);
            df.drop(COL_INSTANT).map_err(|e| unavailable(e.to_string()))?
        } else {
            df
        };

        info!(
            "Loaded {} rows, {} columns of {} data",
            df.height(),
            df.width(),
            granularity
        );

        Ok(RawFrame { df, granularity })
    }

    /// Load the daily table as normalized, typed records.
    ///
    /// Cells that cannot be read as their column's type fail the load as
    /// `DataUnavailable`, naming column and row.
    pub fn load_daily(path: &Path) -> Result<Vec<DailyRecord>, LoaderError> {
        let granularity = Granularity::Daily;
        let frame = DataProcessor::normalize_units(Self::load_csv(path, granularity)?)
            .map_err(|e| unparsable(granularity, path, e))?;
        DataProcessor::daily_records(&frame).map_err(|e| unparsable(granularity, path, e))
    }

    /// Load the hourly table as normalized, typed records.
    pub fn load_hourly(path: &Path) -> Result<Vec<HourlyRecord>, LoaderError> {
        let granularity = Granularity::Hourly;
        let frame = DataProcessor::normalize_units(Self::load_csv(path, granularity)?)
            .map_err(|e| unparsable(granularity, path, e))?;
        DataProcessor::hourly_records(&frame).map_err(|e| unparsable(granularity, path, e))
    }
}

fn unparsable(granularity: Granularity, path: &Path, err: ProcessorError) -> LoaderError {
    LoaderError::DataUnavailable {
        granularity,
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_files {
    //! Temporary CSV files for loader tests.

    use std::path::PathBuf;

    pub const DAILY_HEADER: &str = "instant,dteday,season,yr,mnth,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";
    pub const HOURLY_HEADER: &str = "instant,dteday,season,yr,mnth,hr,holiday,weekday,workingday,weathersit,temp,atemp,hum,windspeed,casual,registered,cnt";

    /// Write `contents` to a file unique to this process and test name.
    pub fn write_csv(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bikeshare-tests-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.csv"));
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn daily_csv(name: &str) -> PathBuf {
        let body = [
            DAILY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,2,0.344167,0.363625,0.805833,0.160446,331,654,985",
            "2,2011-01-02,1,0,1,0,0,0,2,0.363478,0.353739,0.696087,0.248539,131,670,801",
            "3,2011-01-03,1,0,1,0,1,1,1,0.5,0.189405,0.437273,0.248309,120,1229,1349",
        ]
        .join("\n");
        write_csv(name, &body)
    }

    pub fn hourly_csv(name: &str) -> PathBuf {
        let body = [
            HOURLY_HEADER,
            "1,2011-01-01,1,0,1,0,0,6,0,1,0.24,0.2879,0.81,0,3,13,16",
            "2,2011-01-01,1,0,1,1,0,6,0,1,0.22,0.2727,0.8,0,8,32,40",
            "3,2011-01-03,1,0,1,8,0,1,1,1,0.2,0.2576,0.64,0.1045,5,150,155",
        ]
        .join("\n");
        write_csv(name, &body)
    }
}
