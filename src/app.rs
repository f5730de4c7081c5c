//! Bike-sharing dashboard views
//! Evaluates view requests against the cached tables.

use clap::ValueEnum;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::data::{
    filter_records, DatasetCache, Datasets, DayType, FilterSpec, HourlyRecord, LoaderError,
    Season, WeatherSituation,
};
use crate::stats::{
    BoxSummary, Categorizer, CorrelationMatrix, GroupShare, GroupValue, ScatterPoint,
    StatsCalculator, Summary, TierDistribution, TierShare,
};

/// Hours compared in the peak-hour distribution unless others are chosen.
pub const DEFAULT_PEAK_HOURS: [u8; 2] = [8, 17];

/// The three analysis views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ViewKind {
    WeatherImpact,
    TemporalPatterns,
    UsageCategorization,
}

impl ViewKind {
    pub const ALL: [ViewKind; 3] = [
        ViewKind::WeatherImpact,
        ViewKind::TemporalPatterns,
        ViewKind::UsageCategorization,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::WeatherImpact => "Weather impact on rentals",
            ViewKind::TemporalPatterns => "Usage patterns over time",
            ViewKind::UsageCategorization => "Usage categorization",
        }
    }

    /// Short name used for output files.
    pub fn slug(self) -> &'static str {
        match self {
            ViewKind::WeatherImpact => "weather_impact",
            ViewKind::TemporalPatterns => "temporal_patterns",
            ViewKind::UsageCategorization => "usage_categorization",
        }
    }

    /// A request for this view; the temporal view compares the default peak
    /// hours.
    pub fn request(self, filters: FilterSpec) -> ViewRequest {
        match self {
            ViewKind::WeatherImpact => ViewRequest::WeatherImpact(filters),
            ViewKind::TemporalPatterns => ViewRequest::TemporalPatterns {
                filters,
                peak_hours: DEFAULT_PEAK_HOURS.into_iter().collect(),
            },
            ViewKind::UsageCategorization => ViewRequest::UsageCategorization(filters),
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A request for one analysis view under the given filters.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRequest {
    WeatherImpact(FilterSpec),
    /// `peak_hours` picks the hours whose count distributions are compared,
    /// independent of the filters' hour range.
    TemporalPatterns {
        filters: FilterSpec,
        peak_hours: BTreeSet<u8>,
    },
    UsageCategorization(FilterSpec),
}

impl ViewRequest {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewRequest::WeatherImpact(_) => ViewKind::WeatherImpact,
            ViewRequest::TemporalPatterns { .. } => ViewKind::TemporalPatterns,
            ViewRequest::UsageCategorization(_) => ViewKind::UsageCategorization,
        }
    }

    pub fn filters(&self) -> &FilterSpec {
        match self {
            ViewRequest::WeatherImpact(spec)
            | ViewRequest::TemporalPatterns { filters: spec, .. }
            | ViewRequest::UsageCategorization(spec) => spec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherImpactReport {
    pub summary: Summary,
    pub mean_by_weather_and_day_type: Vec<GroupValue<(WeatherSituation, DayType)>>,
    pub correlation: CorrelationMatrix,
    pub totals_by_weather: Vec<GroupShare<WeatherSituation>>,
    pub distribution_by_weather_and_day_type: Vec<BoxSummary<(WeatherSituation, DayType)>>,
    pub temperature_scatter: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyPattern {
    pub summary: Summary,
    pub mean_by_hour_and_day_type: Vec<GroupValue<(u8, DayType)>>,
    pub peak_working_hour: Option<GroupValue<u8>>,
    pub peak_hours: BTreeSet<u8>,
    /// Count distributions of the peak hours only.
    pub distribution_by_hour_and_day_type: Vec<BoxSummary<(u8, DayType)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPattern {
    pub summary: Summary,
    pub mean_by_season: Vec<GroupValue<Season>>,
    pub distribution_by_season: Vec<BoxSummary<Season>>,
    pub distribution_by_season_and_weather: Vec<BoxSummary<(Season, WeatherSituation)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub summary: Summary,
    pub mean_by_month: Vec<GroupValue<u32>>,
}

/// Sections of the temporal view; a section is absent when its input is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalReport {
    pub hourly: Option<HourlyPattern>,
    pub seasonal: Option<SeasonalPattern>,
    pub monthly: Option<MonthlyTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    pub summary: Summary,
    pub tiers: TierDistribution,
    pub by_season: Vec<TierShare<Season>>,
    pub by_weather: Vec<TierShare<WeatherSituation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ViewReport {
    WeatherImpact(WeatherImpactReport),
    TemporalPatterns(TemporalReport),
    UsageCategorization(UsageReport),
}

/// Result of one view: data, or an explicit "no data" signal when the
/// filters leave nothing to aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewOutcome {
    Ready { report: ViewReport },
    NoData { view: ViewKind },
}

impl ViewReport {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewReport::WeatherImpact(_) => ViewKind::WeatherImpact,
            ViewReport::TemporalPatterns(_) => ViewKind::TemporalPatterns,
            ViewReport::UsageCategorization(_) => ViewKind::UsageCategorization,
        }
    }
}

impl ViewOutcome {
    pub fn view(&self) -> ViewKind {
        match self {
            ViewOutcome::Ready { report } => report.kind(),
            ViewOutcome::NoData { view } => *view,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ViewOutcome::NoData { .. })
    }
}

/// Evaluates view requests against a shared dataset cache.
pub struct Dashboard {
    cache: DatasetCache,
}

impl Dashboard {
    pub fn new(cache: DatasetCache) -> Self {
        Self { cache }
    }

    /// Evaluate one request.
    pub fn view(&self, request: &ViewRequest) -> Result<ViewOutcome, LoaderError> {
        let datasets = self.cache.get()?;
        Ok(Self::evaluate(datasets, request))
    }

    /// Evaluate independent requests in parallel, keeping request order.
    pub fn views(&self, requests: &[ViewRequest]) -> Result<Vec<ViewOutcome>, LoaderError> {
        let datasets = self.cache.get()?;
        Ok(requests
            .par_iter()
            .map(|request| Self::evaluate(datasets, request))
            .collect())
    }

    /// Pure evaluation of a request over prepared tables.
    pub fn evaluate(datasets: &Datasets, request: &ViewRequest) -> ViewOutcome {
        let kind = request.kind();
        debug!("Evaluating '{}' with {:?}", kind, request.filters());

        let report = match request {
            ViewRequest::WeatherImpact(spec) => {
                Self::weather_impact(datasets, spec).map(ViewReport::WeatherImpact)
            }
            ViewRequest::TemporalPatterns {
                filters,
                peak_hours,
            } => Self::temporal_patterns(datasets, filters, peak_hours)
                .map(ViewReport::TemporalPatterns),
            ViewRequest::UsageCategorization(spec) => {
                Self::usage_categorization(datasets, spec).map(ViewReport::UsageCategorization)
            }
        };

        match report {
            Some(report) => ViewOutcome::Ready { report },
            None => {
                info!("No rows match the filters for '{}'", kind);
                ViewOutcome::NoData { view: kind }
            }
        }
    }

    fn weather_impact(datasets: &Datasets, spec: &FilterSpec) -> Option<WeatherImpactReport> {
        let days = filter_records(&datasets.daily, spec);
        if days.is_empty() {
            return None;
        }
        Some(WeatherImpactReport {
            summary: StatsCalculator::summary(&days),
            mean_by_weather_and_day_type: StatsCalculator::mean_count_by_weather_and_day_type(
                &days,
            ),
            correlation: StatsCalculator::correlation_matrix(&days),
            totals_by_weather: StatsCalculator::total_count_by_weather(&days),
            distribution_by_weather_and_day_type: StatsCalculator::box_summary_by(&days, |r| {
                (r.weather, r.day_type)
            }),
            temperature_scatter: StatsCalculator::temperature_scatter(&days),
        })
    }

    fn temporal_patterns(
        datasets: &Datasets,
        spec: &FilterSpec,
        peak_hours: &BTreeSet<u8>,
    ) -> Option<TemporalReport> {
        let hours = filter_records(&datasets.hourly, spec);
        let hourly = (!hours.is_empty()).then(|| {
            let means = StatsCalculator::mean_count_by_hour_and_day_type(&hours);
            let at_peak: Vec<HourlyRecord> = hours
                .iter()
                .filter(|r| peak_hours.contains(&r.hour))
                .cloned()
                .collect();
            HourlyPattern {
                summary: StatsCalculator::summary(&hours),
                peak_working_hour: StatsCalculator::peak_hour(&means, DayType::WorkingDay),
                mean_by_hour_and_day_type: means,
                peak_hours: peak_hours.clone(),
                distribution_by_hour_and_day_type: StatsCalculator::box_summary_by(
                    &at_peak,
                    |r| (r.hour, r.day_type),
                ),
            }
        });

        let days = filter_records(&datasets.daily, spec);
        let seasonal = (!days.is_empty()).then(|| SeasonalPattern {
            summary: StatsCalculator::summary(&days),
            mean_by_season: StatsCalculator::mean_count_by_season(&days),
            distribution_by_season: StatsCalculator::box_summary_by(&days, |r| r.season),
            distribution_by_season_and_weather: StatsCalculator::box_summary_by(&days, |r| {
                (r.season, r.weather)
            }),
        });

        // The monthly trend only honours the date range.
        let dated = filter_records(&datasets.daily, &spec.date_only());
        let monthly = (!dated.is_empty()).then(|| MonthlyTrend {
            summary: StatsCalculator::summary(&dated),
            mean_by_month: StatsCalculator::mean_count_by_month(&dated),
        });

        if hourly.is_none() && seasonal.is_none() && monthly.is_none() {
            return None;
        }
        Some(TemporalReport {
            hourly,
            seasonal,
            monthly,
        })
    }

    fn usage_categorization(datasets: &Datasets, spec: &FilterSpec) -> Option<UsageReport> {
        let days = filter_records(&datasets.daily, spec);
        if days.is_empty() {
            return None;
        }
        Some(UsageReport {
            summary: StatsCalculator::summary(&days),
            tiers: Categorizer::distribution(&days),
            by_season: Categorizer::crosstab_by_season(&days),
            by_weather: Categorizer::crosstab_by_weather(&days),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{hour, sample_days};
    use crate::data::model::HourlyRecord;
    use crate::data::DatasetPaths;
    use chrono::NaiveDate;

    fn datasets() -> Datasets {
        let mut daily = sample_days();
        Categorizer::attach(&mut daily);
        let hourly: Vec<HourlyRecord> = (0..24)
            .flat_map(|h| {
                [
                    hour((2011, 7, 9), h, DayType::WeekendOrHoliday, 20 + h as u32),
                    hour((2011, 7, 11), h, DayType::WorkingDay, 100 * (h as u32 % 9)),
                ]
            })
            .collect();
        Datasets { daily, hourly }
    }

    fn report(outcome: ViewOutcome) -> ViewReport {
        match outcome {
            ViewOutcome::Ready { report } => report,
            ViewOutcome::NoData { view } => panic!("no data for {view}"),
        }
    }

    #[test]
    fn weather_impact_under_temperature_filter() {
        let data = datasets();
        let spec = FilterSpec::default().with_temperature_range(10.0, 35.0);
        let outcome = Dashboard::evaluate(&data, &ViewRequest::WeatherImpact(spec));
        let ViewReport::WeatherImpact(r) = report(outcome) else {
            panic!("wrong report kind");
        };
        assert_eq!(r.summary.rows, 5);
        assert_eq!(r.temperature_scatter.len(), 5);
        assert!(r
            .temperature_scatter
            .iter()
            .all(|p| (10.0..=35.0).contains(&p.temperature)));
        assert!(r.correlation.is_degenerate()); // fixture humidity is constant
    }

    #[test]
    fn absent_season_yields_no_data() {
        let mut data = datasets();
        data.daily.retain(|r| r.season != Season::Spring);
        let spec = FilterSpec::default().with_seasons([Season::Spring]);
        for kind in [ViewKind::WeatherImpact, ViewKind::UsageCategorization] {
            let outcome = Dashboard::evaluate(&data, &kind.request(spec.clone()));
            assert_eq!(outcome, ViewOutcome::NoData { view: kind });
            assert!(outcome.is_empty());
        }
    }

    #[test]
    fn temporal_view_keeps_monthly_trend_independent_of_categories() {
        let data = datasets();
        let spec = FilterSpec::default()
            .with_seasons([Season::Spring])
            .with_hour_range(7, 9);
        let ViewReport::TemporalPatterns(r) =
            report(Dashboard::evaluate(&data, &ViewKind::TemporalPatterns.request(spec)))
        else {
            panic!("wrong report kind");
        };
        // hourly fixtures are all summer
        assert!(r.hourly.is_none());
        let seasonal = r.seasonal.unwrap();
        assert_eq!(seasonal.mean_by_season.len(), 1);
        let monthly = r.monthly.unwrap();
        assert_eq!(monthly.summary.rows, data.daily.len());
    }

    #[test]
    fn temporal_view_finds_peak_hour() {
        let data = datasets();
        let spec = FilterSpec::default()
            .with_date_range(
                NaiveDate::from_ymd_opt(2011, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2011, 7, 31).unwrap(),
            )
            .with_hour_range(6, 20);
        let ViewReport::TemporalPatterns(r) =
            report(Dashboard::evaluate(&data, &ViewKind::TemporalPatterns.request(spec)))
        else {
            panic!("wrong report kind");
        };
        let hourly = r.hourly.unwrap();
        assert_eq!(hourly.summary.rows, 30);
        let peak = hourly.peak_working_hour.unwrap();
        assert_eq!(peak.key, 8);
        assert_eq!(r.monthly.unwrap().mean_by_month.len(), 1);
    }

    #[test]
    fn usage_view_crosstabs_sum_to_one_hundred() {
        let data = datasets();
        let ViewReport::UsageCategorization(r) = report(Dashboard::evaluate(
            &data,
            &ViewRequest::UsageCategorization(FilterSpec::default()),
        )) else {
            panic!("wrong report kind");
        };
        assert_eq!(r.tiers.counts.iter().sum::<usize>(), data.daily.len());
        for share in &r.by_season {
            assert!((share.percent.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
        assert_eq!(r.by_weather.len(), 4);
    }

    #[test]
    fn parallel_views_preserve_request_order() {
        let cache = DatasetCache::with_datasets(DatasetPaths::default(), datasets());
        let dashboard = Dashboard::new(cache);
        let requests: Vec<ViewRequest> = ViewKind::ALL
            .iter()
            .map(|k| k.request(FilterSpec::default()))
            .collect();
        let outcomes = dashboard.views(&requests).unwrap();
        assert_eq!(outcomes.len(), 3);
        for (outcome, request) in outcomes.iter().zip(&requests) {
            assert!(!outcome.is_empty());
            assert_eq!(outcome.view(), request.kind());
        }
        // NaN cells compare unequal, so compare the serialized form
        let again = dashboard.view(&requests[0]).unwrap();
        assert_eq!(
            serde_json::to_value(&again).unwrap(),
            serde_json::to_value(&outcomes[0]).unwrap()
        );
    }

    #[test]
    fn peak_hour_distribution_covers_selected_hours_only() {
        let data = datasets();
        let ViewReport::TemporalPatterns(r) = report(Dashboard::evaluate(
            &data,
            &ViewKind::TemporalPatterns.request(FilterSpec::default()),
        )) else {
            panic!("wrong report kind");
        };
        let hourly = r.hourly.unwrap();
        let keys: Vec<(u8, DayType)> = hourly
            .distribution_by_hour_and_day_type
            .iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                (8, DayType::WeekendOrHoliday),
                (8, DayType::WorkingDay),
                (17, DayType::WeekendOrHoliday),
                (17, DayType::WorkingDay),
            ]
        );
        assert_eq!(hourly.mean_by_hour_and_day_type.len(), 48);

        let request = ViewRequest::TemporalPatterns {
            filters: FilterSpec::default(),
            peak_hours: [3, 21].into_iter().collect(),
        };
        let ViewReport::TemporalPatterns(r) = report(Dashboard::evaluate(&data, &request)) else {
            panic!("wrong report kind");
        };
        let hourly = r.hourly.unwrap();
        assert!(hourly
            .distribution_by_hour_and_day_type
            .iter()
            .all(|b| b.key.0 == 3 || b.key.0 == 21));
        assert_eq!(hourly.distribution_by_hour_and_day_type.len(), 4);
    }
}
