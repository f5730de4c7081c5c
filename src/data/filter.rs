//! Row filtering by date, category codes, temperature and hour.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use super::model::RentalRecord;
use super::schema::{DayType, Season, WeatherSituation};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("{field} range is inverted: {start} > {end}")]
    InvertedRange {
        field: &'static str,
        start: String,
        end: String,
    },
    #[error("hour {0} is outside 0-23")]
    HourOutOfDomain(u8),
    #[error("temperature bound {0} is not a number")]
    NotANumber(f64),
}

/// Closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub start: T,
    pub end: T,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: &T) -> bool {
        &self.start <= value && value <= &self.end
    }
}

/// Conjunction of optional predicates over rental rows.
///
/// An omitted predicate matches every row. A supplied but empty code set
/// matches none. `hour_range` only constrains rows that carry an hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSpec {
    pub date_range: Option<Bounds<NaiveDate>>,
    pub seasons: Option<BTreeSet<Season>>,
    pub weather: Option<BTreeSet<WeatherSituation>>,
    pub day_types: Option<BTreeSet<DayType>>,
    /// Temperature bounds in °C.
    pub temperature_range: Option<Bounds<f64>>,
    pub hour_range: Option<Bounds<u8>>,
}

impl FilterSpec {
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(Bounds::new(start, end));
        self
    }

    pub fn with_seasons(mut self, seasons: impl IntoIterator<Item = Season>) -> Self {
        self.seasons = Some(seasons.into_iter().collect());
        self
    }

    pub fn with_weather(mut self, weather: impl IntoIterator<Item = WeatherSituation>) -> Self {
        self.weather = Some(weather.into_iter().collect());
        self
    }

    pub fn with_day_types(mut self, day_types: impl IntoIterator<Item = DayType>) -> Self {
        self.day_types = Some(day_types.into_iter().collect());
        self
    }

    pub fn with_temperature_range(mut self, min: f64, max: f64) -> Self {
        self.temperature_range = Some(Bounds::new(min, max));
        self
    }

    pub fn with_hour_range(mut self, min: u8, max: u8) -> Self {
        self.hour_range = Some(Bounds::new(min, max));
        self
    }

    /// The same spec reduced to its date range.
    pub fn date_only(&self) -> FilterSpec {
        FilterSpec {
            date_range: self.date_range,
            ..FilterSpec::default()
        }
    }

    /// Whether no predicate is supplied.
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterSpec::default()
    }

    /// Reject ranges a front end should never hand over.
    pub fn validate(&self) -> Result<(), FilterError> {
        if let Some(range) = &self.date_range {
            if range.start > range.end {
                return Err(FilterError::InvertedRange {
                    field: "date",
                    start: range.start.to_string(),
                    end: range.end.to_string(),
                });
            }
        }
        if let Some(range) = &self.temperature_range {
            for bound in [range.start, range.end] {
                if bound.is_nan() {
                    return Err(FilterError::NotANumber(bound));
                }
            }
            if range.start > range.end {
                return Err(FilterError::InvertedRange {
                    field: "temperature",
                    start: range.start.to_string(),
                    end: range.end.to_string(),
                });
            }
        }
        if let Some(range) = &self.hour_range {
            if let Some(hour) = [range.start, range.end].into_iter().find(|h| *h > 23) {
                return Err(FilterError::HourOutOfDomain(hour));
            }
            if range.start > range.end {
                return Err(FilterError::InvertedRange {
                    field: "hour",
                    start: range.start.to_string(),
                    end: range.end.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Whether `record` satisfies every supplied predicate.
    pub fn matches<R: RentalRecord>(&self, record: &R) -> bool {
        fn allowed<T: Ord>(set: &Option<BTreeSet<T>>, value: &T) -> bool {
            set.as_ref().map_or(true, |s| s.contains(value))
        }

        if let Some(range) = &self.date_range {
            if !range.contains(&record.date()) {
                return false;
            }
        }
        if !allowed(&self.seasons, &record.season())
            || !allowed(&self.weather, &record.weather())
            || !allowed(&self.day_types, &record.day_type())
        {
            return false;
        }
        if let Some(range) = &self.temperature_range {
            if !range.contains(&record.conditions().temperature) {
                return false;
            }
        }
        match (&self.hour_range, record.hour()) {
            (Some(range), Some(hour)) => range.contains(&hour),
            _ => true,
        }
    }
}

/// Return copies of the rows that pass `spec`, in their original order.
///
/// No matching rows yields an empty vector.
pub fn filter_records<R: RentalRecord>(records: &[R], spec: &FilterSpec) -> Vec<R> {
    if spec.is_unconstrained() {
        return records.to_vec();
    }
    let kept: Vec<R> = records
        .iter()
        .filter(|r| spec.matches(*r))
        .cloned()
        .collect();
    debug!("Filter kept {} of {} rows", kept.len(), records.len());
    kept
}
