//! Data Processor Module
//! Rescales the normalized weather fractions into physical units and turns
//! the result into typed records.

use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use polars::prelude::*;
use thiserror::Error;

use super::loader::RawFrame;
use super::model::{Conditions, DailyRecord, HourlyRecord};
use super::schema::*;

/// Multiplier turning the temperature fraction into °C.
pub const TEMP_SCALE: f64 = 41.0;
/// Multiplier turning the feels-like fraction into °C.
pub const FEELS_LIKE_SCALE: f64 = 50.0;
/// Multiplier turning the humidity fraction into %.
pub const HUMIDITY_SCALE: f64 = 100.0;
/// Multiplier turning the wind speed fraction into km/h.
pub const WIND_SPEED_SCALE: f64 = 67.0;

const SCALED_COLUMNS: [(&str, f64); 4] = [
    (COL_TEMP, TEMP_SCALE),
    (COL_FEELS_LIKE, FEELS_LIKE_SCALE),
    (COL_HUMIDITY, HUMIDITY_SCALE),
    (COL_WIND_SPEED, WIND_SPEED_SCALE),
];

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: &'static str,
        row: usize,
        reason: String,
    },
}

/// A table whose weather columns are in physical units.
///
/// Constructed only by [`DataProcessor::normalize_units`], so scaling cannot
/// be applied twice.
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    df: DataFrame,
}

/// Handles unit scaling and record extraction.
pub struct DataProcessor;

impl DataProcessor {
    /// Scale temperature, feels-like temperature, humidity and wind speed
    /// from [0,1] fractions into °C, °C, % and km/h.
    pub fn normalize_units(raw: RawFrame) -> Result<NormalizedFrame, ProcessorError> {
        let RawFrame { df, granularity } = raw;

        for (name, _) in SCALED_COLUMNS {
            let column = df.column(name)?.cast(&DataType::Float64)?;
            let values = column.f64()?;
            if let (Some(min), Some(max)) = (values.min(), values.max()) {
                if min < 0.0 || max > 1.0 {
                    warn!(
                        "{} column '{}' spans [{}, {}], outside the expected [0, 1] fraction domain",
                        granularity, name, min, max
                    );
                }
            }
        }

        let scaled: Vec<Expr> = SCALED_COLUMNS
            .iter()
            .map(|&(name, factor)| (col(name).cast(DataType::Float64) * lit(factor)).alias(name))
            .collect();

        let df = df.lazy().with_columns(scaled).collect()?;
        debug!("Normalized units of {} {} rows", df.height(), granularity);

        Ok(NormalizedFrame { df })
    }

    /// Convert a normalized daily table into records, deriving the month from
    /// the date.
    pub fn daily_records(frame: &NormalizedFrame) -> Result<Vec<DailyRecord>, ProcessorError> {
        let columns = CommonColumns::extract(&frame.df)?;
        (0..frame.df.height())
            .map(|row| {
                let date = columns.date(row)?;
                Ok(DailyRecord {
                    date,
                    month: date.month(),
                    season: columns.season(row)?,
                    weather: columns.weather(row)?,
                    day_type: columns.day_type(row)?,
                    holiday: columns.flag(COL_HOLIDAY, &columns.holiday, row)?,
                    weekday: columns.weekday(row)?,
                    conditions: columns.conditions(row)?,
                    casual: columns.count(COL_CASUAL, &columns.casual, row)?,
                    registered: columns.count(COL_REGISTERED, &columns.registered, row)?,
                    count: columns.count(COL_COUNT, &columns.count, row)?,
                    usage_tier: None,
                })
            })
            .collect()
    }

    /// Convert a normalized hourly table into records.
    pub fn hourly_records(frame: &NormalizedFrame) -> Result<Vec<HourlyRecord>, ProcessorError> {
        let columns = CommonColumns::extract(&frame.df)?;
        let hours = integer_column(&frame.df, COL_HOUR)?;
        (0..frame.df.height())
            .map(|row| {
                let date = columns.date(row)?;
                let hour = int_at(&hours, COL_HOUR, row)?;
                let hour = u8::try_from(hour)
                    .ok()
                    .filter(|h| *h <= 23)
                    .ok_or_else(|| invalid(COL_HOUR, row, format!("hour {hour} outside 0-23")))?;
                Ok(HourlyRecord {
                    date,
                    month: date.month(),
                    hour,
                    season: columns.season(row)?,
                    weather: columns.weather(row)?,
                    day_type: columns.day_type(row)?,
                    holiday: columns.flag(COL_HOLIDAY, &columns.holiday, row)?,
                    weekday: columns.weekday(row)?,
                    conditions: columns.conditions(row)?,
                    casual: columns.count(COL_CASUAL, &columns.casual, row)?,
                    registered: columns.count(COL_REGISTERED, &columns.registered, row)?,
                    count: columns.count(COL_COUNT, &columns.count, row)?,
                })
            })
            .collect()
    }
}

/// Materialized columns shared by both granularities.
struct CommonColumns {
    dates: Vec<Option<String>>,
    season: Vec<Option<i64>>,
    weather: Vec<Option<i64>>,
    working_day: Vec<Option<i64>>,
    holiday: Vec<Option<i64>>,
    weekday: Vec<Option<i64>>,
    temp: Vec<Option<f64>>,
    feels_like: Vec<Option<f64>>,
    humidity: Vec<Option<f64>>,
    wind_speed: Vec<Option<f64>>,
    casual: Vec<Option<i64>>,
    registered: Vec<Option<i64>>,
    count: Vec<Option<i64>>,
}

impl CommonColumns {
    fn extract(df: &DataFrame) -> Result<Self, ProcessorError> {
        let date_column = df.column(COL_DATE)?.cast(&DataType::String)?;
        let dates = date_column
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();

        Ok(Self {
            dates,
            season: integer_column(df, COL_SEASON)?,
            weather: integer_column(df, COL_WEATHER)?,
            working_day: integer_column(df, COL_WORKING_DAY)?,
            holiday: integer_column(df, COL_HOLIDAY)?,
            weekday: integer_column(df, COL_WEEKDAY)?,
            temp: float_column(df, COL_TEMP)?,
            feels_like: float_column(df, COL_FEELS_LIKE)?,
            humidity: float_column(df, COL_HUMIDITY)?,
            wind_speed: float_column(df, COL_WIND_SPEED)?,
            casual: integer_column(df, COL_CASUAL)?,
            registered: integer_column(df, COL_REGISTERED)?,
            count: integer_column(df, COL_COUNT)?,
        })
    }

    fn date(&self, row: usize) -> Result<NaiveDate, ProcessorError> {
        let text = self
            .dates
            .get(row)
            .and_then(|v| v.as_deref())
            .ok_or_else(|| invalid(COL_DATE, row, "missing value".to_string()))?;
        NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map_err(|e| invalid(COL_DATE, row, format!("'{text}': {e}")))
    }

    fn season(&self, row: usize) -> Result<Season, ProcessorError> {
        let code = int_at(&self.season, COL_SEASON, row)?;
        Season::try_from(code).map_err(|e| invalid(COL_SEASON, row, e.to_string()))
    }

    fn weather(&self, row: usize) -> Result<WeatherSituation, ProcessorError> {
        let code = int_at(&self.weather, COL_WEATHER, row)?;
        WeatherSituation::try_from(code).map_err(|e| invalid(COL_WEATHER, row, e.to_string()))
    }

    fn day_type(&self, row: usize) -> Result<DayType, ProcessorError> {
        let code = int_at(&self.working_day, COL_WORKING_DAY, row)?;
        DayType::try_from(code).map_err(|e| invalid(COL_WORKING_DAY, row, e.to_string()))
    }

    fn flag(
        &self,
        name: &'static str,
        values: &[Option<i64>],
        row: usize,
    ) -> Result<bool, ProcessorError> {
        match int_at(values, name, row)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(invalid(name, row, format!("flag {other} is not 0 or 1"))),
        }
    }

    fn weekday(&self, row: usize) -> Result<u8, ProcessorError> {
        let day = int_at(&self.weekday, COL_WEEKDAY, row)?;
        u8::try_from(day)
            .ok()
            .filter(|d| *d <= 6)
            .ok_or_else(|| invalid(COL_WEEKDAY, row, format!("weekday {day} outside 0-6")))
    }

    fn count(
        &self,
        name: &'static str,
        values: &[Option<i64>],
        row: usize,
    ) -> Result<u32, ProcessorError> {
        let value = int_at(values, name, row)?;
        u32::try_from(value).map_err(|_| invalid(name, row, format!("count {value} is negative")))
    }

    fn conditions(&self, row: usize) -> Result<Conditions, ProcessorError> {
        Ok(Conditions {
            temperature: float_at(&self.temp, COL_TEMP, row)?,
            feels_like: float_at(&self.feels_like, COL_FEELS_LIKE, row)?,
            humidity: float_at(&self.humidity, COL_HUMIDITY, row)?,
            wind_speed: float_at(&self.wind_speed, COL_WIND_SPEED, row)?,
        })
    }
}

fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, ProcessorError> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, ProcessorError> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

fn int_at(values: &[Option<i64>], name: &'static str, row: usize) -> Result<i64, ProcessorError> {
    values
        .get(row)
        .copied()
        .flatten()
        .ok_or_else(|| invalid(name, row, "missing value".to_string()))
}

fn float_at(values: &[Option<f64>], name: &'static str, row: usize) -> Result<f64, ProcessorError> {
    values
        .get(row)
        .copied()
        .flatten()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| invalid(name, row, "missing value".to_string()))
}

fn invalid(column: &'static str, row: usize, reason: String) -> ProcessorError {
    ProcessorError::InvalidValue {
        column,
        row,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::test_files::*;
    use crate::data::loader::DataLoader;

    fn normalized_daily(name: &str) -> NormalizedFrame {
        let raw = DataLoader::load_csv(&daily_csv(name), Granularity::Daily).unwrap();
        DataProcessor::normalize_units(raw).unwrap()
    }

    #[test]
    fn half_temperature_fraction_is_twenty_and_a_half_degrees() {
        let frame = normalized_daily("processor_half");
        let records = DataProcessor::daily_records(&frame).unwrap();
        assert!((records[2].conditions.temperature - 20.5).abs() < 1e-9);
    }

    #[test]
    fn every_weather_column_is_scaled_once() {
        let frame = normalized_daily("processor_scale");
        let records = DataProcessor::daily_records(&frame).unwrap();
        let first = &records[0].conditions;
        assert!((first.temperature - 0.344167 * 41.0).abs() < 1e-9);
        assert!((first.feels_like - 0.363625 * 50.0).abs() < 1e-9);
        assert!((first.humidity - 80.5833).abs() < 1e-9);
        assert!((first.wind_speed - 0.160446 * 67.0).abs() < 1e-9);
        for record in &records {
            assert!((0.0..=41.0).contains(&record.conditions.temperature));
            assert!((0.0..=100.0).contains(&record.conditions.humidity));
            assert!((0.0..=67.0).contains(&record.conditions.wind_speed));
        }
    }

    #[test]
    fn daily_records_carry_typed_codes_and_month() {
        let frame = normalized_daily("processor_codes");
        let records = DataProcessor::daily_records(&frame).unwrap();
        assert_eq!(records.len(), 3);
        let first = &records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2011, 1, 1).unwrap());
        assert_eq!(first.month, 1);
        assert_eq!(first.season, Season::Spring);
        assert_eq!(first.weather, WeatherSituation::Cloudy);
        assert_eq!(first.day_type, DayType::WeekendOrHoliday);
        assert_eq!(first.weekday, 6);
        assert_eq!(first.count, 985);
        assert_eq!(first.casual + first.registered, first.count);
        assert_eq!(records[2].day_type, DayType::WorkingDay);
        assert!(records.iter().all(|r| r.usage_tier.is_none()));
    }

    #[test]
    fn hourly_records_carry_hour() {
        let raw = DataLoader::load_csv(&hourly_csv("processor_hourly"), Granularity::Hourly).unwrap();
        let frame = DataProcessor::normalize_units(raw).unwrap();
        let records = DataProcessor::hourly_records(&frame).unwrap();
        assert_eq!(
            records.iter().map(|r| r.hour).collect::<Vec<_>>(),
            vec![0, 1, 8]
        );
        assert!((records[0].conditions.temperature - 0.24 * 41.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_domain_season_is_rejected() {
        let body = format!(
            "{DAILY_HEADER}\n1,2011-01-01,5,0,1,0,6,0,2,0.3,0.3,0.8,0.1,331,654,985\n"
        );
        let raw = DataLoader::load_csv(&write_csv("processor_bad_season", &body), Granularity::Daily)
            .unwrap();
        let frame = DataProcessor::normalize_units(raw).unwrap();
        let err = DataProcessor::daily_records(&frame).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::InvalidValue {
                column: COL_SEASON,
                row: 0,
                ..
            }
        ));
    }

    #[test]
    fn fraction_bounds_map_to_unit_bounds() {
        let body = [
            DAILY_HEADER,
            "1,2011-01-01,1,0,1,0,6,0,1,0.0,0.0,0.0,0.0,0,0,0",
            "2,2011-01-02,1,0,1,0,0,0,1,1.0,1.0,1.0,1.0,10,20,30",
        ]
        .join("\n");
        let raw = DataLoader::load_csv(&write_csv("processor_bounds", &body), Granularity::Daily)
            .unwrap();
        let records = DataProcessor::daily_records(&DataProcessor::normalize_units(raw).unwrap())
            .unwrap();

        let low = &records[0].conditions;
        assert_eq!(
            (low.temperature, low.feels_like, low.humidity, low.wind_speed),
            (0.0, 0.0, 0.0, 0.0)
        );
        let high = &records[1].conditions;
        assert!((high.temperature - 41.0).abs() < 1e-9);
        assert!((high.feels_like - 50.0).abs() < 1e-9);
        assert!((high.humidity - 100.0).abs() < 1e-9);
        assert!((high.wind_speed - 67.0).abs() < 1e-9);
    }
}
