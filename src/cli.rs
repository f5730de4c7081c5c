//! Command-line flags. Every flag overrides the matching config value.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::app::ViewKind;
use crate::config::DashboardConfig;
use crate::data::schema::InvalidCode;
use crate::data::{Bounds, DayType, Season, WeatherSituation};

#[derive(Debug, Parser)]
#[command(
    name = "bikeshare_dashboard",
    version,
    about = "Bike-sharing usage dashboard: JSON report and SVG charts"
)]
pub struct Cli {
    /// JSON config file.
    #[arg(short, long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Daily aggregates CSV (day.csv).
    #[arg(long, value_name = "CSV")]
    pub daily: Option<PathBuf>,

    /// Hourly aggregates CSV (hour.csv).
    #[arg(long, value_name = "CSV")]
    pub hourly: Option<PathBuf>,

    /// View to compute; repeat for several. Defaults to all.
    #[arg(long = "view", value_enum)]
    pub views: Vec<ViewKind>,

    /// First date to keep (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Season code 1-4; repeat for several.
    #[arg(long = "season", value_parser = parse_code::<Season>)]
    pub seasons: Vec<Season>,

    /// Weather situation code 1-4; repeat for several.
    #[arg(long = "weather", value_parser = parse_code::<WeatherSituation>)]
    pub weather: Vec<WeatherSituation>,

    /// Day type: 0 weekend/holiday, 1 working day; repeat for both.
    #[arg(long = "day-type", value_parser = parse_code::<DayType>)]
    pub day_types: Vec<DayType>,

    /// Lowest temperature to keep, °C.
    #[arg(long, requires = "temp_max", allow_negative_numbers = true)]
    pub temp_min: Option<f64>,

    /// Highest temperature to keep, °C.
    #[arg(long, requires = "temp_min", allow_negative_numbers = true)]
    pub temp_max: Option<f64>,

    /// First hour of day to keep (hourly data only).
    #[arg(long, requires = "hour_max", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour_min: Option<u8>,

    /// Last hour of day to keep (hourly data only).
    #[arg(long, requires = "hour_min", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour_max: Option<u8>,

    /// Hour compared in the peak-hour distribution; repeat for several.
    /// Defaults to 8 and 17.
    #[arg(long = "peak-hour", value_parser = clap::value_parser!(u8).range(0..=23))]
    pub peak_hours: Vec<u8>,

    /// Output directory for the report and charts.
    #[arg(short, long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// Write the JSON report only.
    #[arg(long)]
    pub no_charts: bool,
}

fn parse_code<T>(raw: &str) -> Result<T, String>
where
    T: TryFrom<u8, Error = InvalidCode>,
{
    let code: u8 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a numeric code"))?;
    T::try_from(code).map_err(|err| err.to_string())
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut DashboardConfig) {
        if let Some(daily) = &self.daily {
            config.data.daily = daily.clone();
        }
        if let Some(hourly) = &self.hourly {
            config.data.hourly = hourly.clone();
        }
        if !self.views.is_empty() {
            config.views = self.views.clone();
        }

        let filters = &mut config.filters;
        if let (Some(from), Some(to)) = (self.from, self.to) {
            filters.date_range = Some(Bounds::new(from, to));
        }
        if !self.seasons.is_empty() {
            filters.seasons = Some(self.seasons.iter().copied().collect());
        }
        if !self.weather.is_empty() {
            filters.weather = Some(self.weather.iter().copied().collect());
        }
        if !self.day_types.is_empty() {
            filters.day_types = Some(self.day_types.iter().copied().collect());
        }
        if let (Some(min), Some(max)) = (self.temp_min, self.temp_max) {
            filters.temperature_range = Some(Bounds::new(min, max));
        }
        if let (Some(min), Some(max)) = (self.hour_min, self.hour_max) {
            filters.hour_range = Some(Bounds::new(min, max));
        }

        if !self.peak_hours.is_empty() {
            config.peak_hours = self.peak_hours.iter().copied().collect();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if self.no_charts {
            config.charts = false;
        }
    }
}
