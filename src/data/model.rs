//! Typed rental records.

use chrono::NaiveDate;
use serde::Serialize;

use super::schema::{DayType, Season, UsageTier, WeatherSituation};

/// Weather conditions in physical units, shared by both granularities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Conditions {
    /// Air temperature in °C.
    pub temperature: f64,
    /// Feels-like temperature in °C.
    pub feels_like: f64,
    /// Relative humidity in %.
    pub humidity: f64,
    /// Wind speed in km/h.
    pub wind_speed: f64,
}

/// One row of the daily table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// Calendar month of `date` (1-12).
    pub month: u32,
    pub season: Season,
    pub weather: WeatherSituation,
    pub day_type: DayType,
    pub holiday: bool,
    /// Day of week as coded in the source (0 = Sunday).
    pub weekday: u8,
    pub conditions: Conditions,
    pub casual: u32,
    pub registered: u32,
    pub count: u32,
    /// Attached once by the categorizer when the cache is populated.
    pub usage_tier: Option<UsageTier>,
}

/// One row of the hourly table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    pub date: NaiveDate,
    pub month: u32,
    /// Hour of day (0-23).
    pub hour: u8,
    pub season: Season,
    pub weather: WeatherSituation,
    pub day_type: DayType,
    pub holiday: bool,
    pub weekday: u8,
    pub conditions: Conditions,
    pub casual: u32,
    pub registered: u32,
    pub count: u32,
}

/// Read access shared by daily and hourly rows, used by the filter engine
/// and the aggregator.
pub trait RentalRecord: Clone {
    fn date(&self) -> NaiveDate;
    fn season(&self) -> Season;
    fn weather(&self) -> WeatherSituation;
    fn day_type(&self) -> DayType;
    fn conditions(&self) -> &Conditions;
    fn count(&self) -> u32;

    /// Hour of day; `None` for daily rows.
    fn hour(&self) -> Option<u8> {
        None
    }
}

impl RentalRecord for DailyRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn season(&self) -> Season {
        self.season
    }

    fn weather(&self) -> WeatherSituation {
        self.weather
    }

    fn day_type(&self) -> DayType {
        self.day_type
    }

    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn count(&self) -> u32 {
        self.count
    }
}

impl RentalRecord for HourlyRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn season(&self) -> Season {
        self.season
    }

    fn weather(&self) -> WeatherSituation {
        self.weather
    }

    fn day_type(&self) -> DayType {
        self.day_type
    }

    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn hour(&self) -> Option<u8> {
        Some(self.hour)
    }
}

/// Both base tables after normalization and categorization.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub daily: Vec<DailyRecord>,
    pub hourly: Vec<HourlyRecord>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built rows for unit tests.

    use super::*;
    use chrono::Datelike;

    pub fn conditions(temperature: f64) -> Conditions {
        Conditions {
            temperature,
            feels_like: temperature + 1.0,
            humidity: 50.0,
            wind_speed: 10.0,
        }
    }

    pub fn day(
        date: (i32, u32, u32),
        season: Season,
        weather: WeatherSituation,
        day_type: DayType,
        temperature: f64,
        count: u32,
    ) -> DailyRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        DailyRecord {
            date,
            month: date.month(),
            season,
            weather,
            day_type,
            holiday: false,
            weekday: date.weekday().num_days_from_sunday() as u8,
            conditions: conditions(temperature),
            casual: count / 5,
            registered: count - count / 5,
            count,
            usage_tier: None,
        }
    }

    pub fn hour(
        date: (i32, u32, u32),
        hour: u8,
        day_type: DayType,
        count: u32,
    ) -> HourlyRecord {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        HourlyRecord {
            date,
            month: date.month(),
            hour,
            season: Season::Summer,
            weather: WeatherSituation::Clear,
            day_type,
            holiday: false,
            weekday: date.weekday().num_days_from_sunday() as u8,
            conditions: conditions(20.0),
            casual: 0,
            registered: count,
            count,
        }
    }

    /// A week of daily rows covering every season and weather code.
    pub fn sample_days() -> Vec<DailyRecord> {
        use DayType::*;
        use Season::*;
        use WeatherSituation::*;
        vec![
            day((2011, 1, 1), Spring, Cloudy, WeekendOrHoliday, 8.2, 985),
            day((2011, 1, 3), Spring, Clear, WorkingDay, 6.0, 1349),
            day((2011, 4, 12), Summer, LightPrecipitation, WorkingDay, 17.5, 795),
            day((2011, 7, 9), Fall, Clear, WeekendOrHoliday, 31.0, 4866),
            day((2011, 7, 11), Fall, Clear, WorkingDay, 30.2, 5298),
            day((2011, 11, 2), Winter, Cloudy, WorkingDay, 14.1, 3974),
            day((2012, 10, 29), Winter, HeavyPrecipitation, WorkingDay, 18.0, 22),
        ]
    }
}
