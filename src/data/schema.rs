//! Column names and enumerated codes of the rental datasets.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// Source column names
pub const COL_INSTANT: &str = "instant";
pub const COL_DATE: &str = "dteday";
pub const COL_SEASON: &str = "season";
pub const COL_YEAR: &str = "yr";
pub const COL_MONTH: &str = "mnth";
pub const COL_HOUR: &str = "hr";
pub const COL_HOLIDAY: &str = "holiday";
pub const COL_WEEKDAY: &str = "weekday";
pub const COL_WORKING_DAY: &str = "workingday";
pub const COL_WEATHER: &str = "weathersit";
pub const COL_TEMP: &str = "temp";
pub const COL_FEELS_LIKE: &str = "atemp";
pub const COL_HUMIDITY: &str = "hum";
pub const COL_WIND_SPEED: &str = "windspeed";
pub const COL_CASUAL: &str = "casual";
pub const COL_REGISTERED: &str = "registered";
pub const COL_COUNT: &str = "cnt";

/// Columns both files must carry.
pub const DAILY_COLUMNS: [&str; 15] = [
    COL_DATE,
    COL_SEASON,
    COL_YEAR,
    COL_MONTH,
    COL_HOLIDAY,
    COL_WEEKDAY,
    COL_WORKING_DAY,
    COL_WEATHER,
    COL_TEMP,
    COL_FEELS_LIKE,
    COL_HUMIDITY,
    COL_WIND_SPEED,
    COL_CASUAL,
    COL_REGISTERED,
    COL_COUNT,
];

/// Granularity of a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Hourly,
}

impl Granularity {
    /// Columns that must be present for this granularity.
    pub fn required_columns(self) -> Vec<&'static str> {
        let mut cols = DAILY_COLUMNS.to_vec();
        if self == Granularity::Hourly {
            cols.push(COL_HOUR);
        }
        cols
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "daily"),
            Granularity::Hourly => write!(f, "hourly"),
        }
    }
}

/// A numeric code outside the domain of its enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} is not a valid {kind} code")]
pub struct InvalidCode {
    pub kind: &'static str,
    pub code: i64,
}

/// Season of the year (source codes 1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Season {
    Spring = 1,
    Summer = 2,
    Fall = 3,
    Winter = 4,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Spring, Season::Summer, Season::Fall, Season::Winter];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
        }
    }
}

/// Weather situation, ordered by severity (source codes 1-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WeatherSituation {
    Clear = 1,
    Cloudy = 2,
    LightPrecipitation = 3,
    HeavyPrecipitation = 4,
}

impl WeatherSituation {
    pub const ALL: [WeatherSituation; 4] = [
        WeatherSituation::Clear,
        WeatherSituation::Cloudy,
        WeatherSituation::LightPrecipitation,
        WeatherSituation::HeavyPrecipitation,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherSituation::Clear => "Clear",
            WeatherSituation::Cloudy => "Cloudy",
            WeatherSituation::LightPrecipitation => "Light rain/snow",
            WeatherSituation::HeavyPrecipitation => "Heavy rain/snow",
        }
    }
}

/// Working-day indicator (source codes 0/1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DayType {
    WeekendOrHoliday = 0,
    WorkingDay = 1,
}

impl DayType {
    pub const ALL: [DayType; 2] = [DayType::WeekendOrHoliday, DayType::WorkingDay];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            DayType::WeekendOrHoliday => "Weekend/holiday",
            DayType::WorkingDay => "Working day",
        }
    }
}

/// Ordinal usage tier of a day's total rentals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum UsageTier {
    #[serde(rename = "Low Usage")]
    Low,
    #[serde(rename = "Moderate Usage")]
    Moderate,
    #[serde(rename = "High Usage")]
    High,
}

impl UsageTier {
    pub const ALL: [UsageTier; 3] = [UsageTier::Low, UsageTier::Moderate, UsageTier::High];

    pub fn label(self) -> &'static str {
        match self {
            UsageTier::Low => "Low Usage",
            UsageTier::Moderate => "Moderate Usage",
            UsageTier::High => "High Usage",
        }
    }

    /// Position in [`UsageTier::ALL`].
    pub fn index(self) -> usize {
        match self {
            UsageTier::Low => 0,
            UsageTier::Moderate => 1,
            UsageTier::High => 2,
        }
    }
}

/// Short English month name for a calendar month (1-12).
pub fn month_label(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    month
        .checked_sub(1)
        .and_then(|i| NAMES.get(i as usize))
        .copied()
        .unwrap_or("?")
}

macro_rules! code_conversions {
    ($ty:ident, $kind:literal, [$($variant:ident),+]) => {
        impl TryFrom<i64> for $ty {
            type Error = InvalidCode;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                $(
                    if code == $ty::$variant as i64 {
                        return Ok($ty::$variant);
                    }
                )+
                Err(InvalidCode { kind: $kind, code })
            }
        }

        impl TryFrom<u8> for $ty {
            type Error = InvalidCode;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                Self::try_from(code as i64)
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> u8 {
                value.code()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

code_conversions!(Season, "season", [Spring, Summer, Fall, Winter]);
code_conversions!(
    WeatherSituation,
    "weather situation",
    [Clear, Cloudy, LightPrecipitation, HeavyPrecipitation]
);
code_conversions!(DayType, "working-day", [WeekendOrHoliday, WorkingDay]);

impl fmt::Display for UsageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
