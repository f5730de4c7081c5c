//! Statistics Calculator Module
//! Grouped means and sums, box summaries and the weather correlation matrix
//! behind each analysis view.

use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::data::model::{DailyRecord, HourlyRecord, RentalRecord};
use crate::data::schema::{DayType, Season, WeatherSituation};

/// Row count, total and mean of a set of rental counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub rows: usize,
    pub total: u64,
    /// `None` when there are no rows.
    pub mean: Option<f64>,
}

/// Aggregate value of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue<K> {
    pub key: K,
    /// Rows that fell into this group.
    pub rows: usize,
    pub value: f64,
}

/// Five-number summary of the counts in one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary<K> {
    pub key: K,
    pub rows: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Sum of counts in one group together with its share of the overall total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShare<K> {
    pub key: K,
    pub total: u64,
    /// Percentage of the overall total; `None` when the overall total is zero.
    pub percent: Option<f64>,
}

/// One point of the temperature scatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub temperature: f64,
    pub count: u32,
    pub weather: WeatherSituation,
    pub wind_speed: f64,
}

/// Variables of the weather correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CorrelationVariable {
    Count,
    Temperature,
    Humidity,
    WindSpeed,
}

impl CorrelationVariable {
    pub const ALL: [CorrelationVariable; 4] = [
        CorrelationVariable::Count,
        CorrelationVariable::Temperature,
        CorrelationVariable::Humidity,
        CorrelationVariable::WindSpeed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CorrelationVariable::Count => "cnt",
            CorrelationVariable::Temperature => "temp",
            CorrelationVariable::Humidity => "hum",
            CorrelationVariable::WindSpeed => "windspeed",
        }
    }

    fn index(self) -> usize {
        match self {
            CorrelationVariable::Count => 0,
            CorrelationVariable::Temperature => 1,
            CorrelationVariable::Humidity => 2,
            CorrelationVariable::WindSpeed => 3,
        }
    }

    fn value(self, record: &DailyRecord) -> f64 {
        match self {
            CorrelationVariable::Count => record.count as f64,
            CorrelationVariable::Temperature => record.conditions.temperature,
            CorrelationVariable::Humidity => record.conditions.humidity,
            CorrelationVariable::WindSpeed => record.conditions.wind_speed,
        }
    }
}

/// Pairwise Pearson correlations. Undefined cells hold NaN, which serializes
/// to `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: [CorrelationVariable; 4],
    pub values: [[f64; 4]; 4],
}

impl CorrelationMatrix {
    pub fn get(&self, a: CorrelationVariable, b: CorrelationVariable) -> Option<f64> {
        let v = self.values[a.index()][b.index()];
        (!v.is_nan()).then_some(v)
    }

    /// Whether any cell is undefined (too few rows or a constant column).
    pub fn is_degenerate(&self) -> bool {
        self.values.iter().flatten().any(|v| v.is_nan())
    }
}

/// Group-by helpers and per-view aggregates.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Row count, sum and mean of the rental counts.
    pub fn summary<R: RentalRecord>(records: &[R]) -> Summary {
        let total: u64 = records.iter().map(|r| r.count() as u64).sum();
        let mean = if records.is_empty() {
            None
        } else {
            Some(total as f64 / records.len() as f64)
        };
        Summary {
            rows: records.len(),
            total,
            mean,
        }
    }

    /// Collect counts per key, preserving every key present in the input.
    fn group_counts<R, K, F>(records: &[R], key: F) -> BTreeMap<K, Vec<f64>>
    where
        R: RentalRecord,
        K: Ord,
        F: Fn(&R) -> K,
    {
        let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
        for record in records {
            groups
                .entry(key(record))
                .or_default()
                .push(record.count() as f64);
        }
        groups
    }

    /// Mean count per key, ordered by key.
    pub fn mean_count_by<R, K, F>(records: &[R], key: F) -> Vec<GroupValue<K>>
    where
        R: RentalRecord,
        K: Ord,
        F: Fn(&R) -> K,
    {
        Self::group_counts(records, key)
            .into_iter()
            .map(|(key, counts)| GroupValue {
                key,
                rows: counts.len(),
                value: counts.iter().mean(),
            })
            .collect()
    }

    /// Sum of counts per key with each group's share of the total.
    pub fn total_count_by<R, K, F>(records: &[R], key: F) -> Vec<GroupShare<K>>
    where
        R: RentalRecord,
        K: Ord,
        F: Fn(&R) -> K,
    {
        let mut totals: BTreeMap<K, u64> = BTreeMap::new();
        for record in records {
            *totals.entry(key(record)).or_default() += record.count() as u64;
        }
        let overall: u64 = totals.values().sum();
        totals
            .into_iter()
            .map(|(key, total)| GroupShare {
                key,
                total,
                percent: (overall > 0).then(|| total as f64 / overall as f64 * 100.0),
            })
            .collect()
    }

    /// Five-number summary of counts per key.
    pub fn box_summary_by<R, K, F>(records: &[R], key: F) -> Vec<BoxSummary<K>>
    where
        R: RentalRecord,
        K: Ord,
        F: Fn(&R) -> K,
    {
        Self::group_counts(records, key)
            .into_iter()
            .map(|(key, mut counts)| {
                counts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                BoxSummary {
                    key,
                    rows: counts.len(),
                    min: Self::percentile(&counts, 0.0),
                    q1: Self::percentile(&counts, 25.0),
                    median: Self::percentile(&counts, 50.0),
                    q3: Self::percentile(&counts, 75.0),
                    max: Self::percentile(&counts, 100.0),
                }
            })
            .collect()
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Pearson correlation of two equally long samples; NaN when fewer than
    /// two pairs or either sample is constant.
    pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
        if xs.len() != ys.len() || xs.len() < 2 {
            return f64::NAN;
        }
        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 || sx.is_nan() || sy.is_nan() {
            return f64::NAN;
        }
        xs.iter().covariance(ys.iter()) / (sx * sy)
    }

    // -- weather impact --------------------------------------------------

    /// Mean count per (weather situation, day type).
    pub fn mean_count_by_weather_and_day_type(
        records: &[DailyRecord],
    ) -> Vec<GroupValue<(WeatherSituation, DayType)>> {
        Self::mean_count_by(records, |r| (r.weather, r.day_type))
    }

    /// Correlations among count, temperature, humidity and wind speed.
    pub fn correlation_matrix(records: &[DailyRecord]) -> CorrelationMatrix {
        let columns: Vec<Vec<f64>> = CorrelationVariable::ALL
            .iter()
            .map(|var| records.iter().map(|r| var.value(r)).collect())
            .collect();

        let mut values = [[f64::NAN; 4]; 4];
        for (i, row) in values.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let r = Self::pearson(&columns[i], &columns[j]);
                *cell = if i == j && !r.is_nan() { 1.0 } else { r };
            }
        }

        CorrelationMatrix {
            variables: CorrelationVariable::ALL,
            values,
        }
    }

    /// Sum of counts per weather situation.
    pub fn total_count_by_weather(records: &[DailyRecord]) -> Vec<GroupShare<WeatherSituation>> {
        Self::total_count_by(records, |r| r.weather)
    }

    pub fn temperature_scatter(records: &[DailyRecord]) -> Vec<ScatterPoint> {
        records
            .iter()
            .map(|r| ScatterPoint {
                temperature: r.conditions.temperature,
                count: r.count,
                weather: r.weather,
                wind_speed: r.conditions.wind_speed,
            })
            .collect()
    }

    // -- temporal patterns -------------------------------------------------

    /// Mean count per (hour, day type).
    pub fn mean_count_by_hour_and_day_type(
        records: &[HourlyRecord],
    ) -> Vec<GroupValue<(u8, DayType)>> {
        Self::mean_count_by(records, |r| (r.hour, r.day_type))
    }

    /// Hour with the highest mean count for `day_type`.
    pub fn peak_hour(
        hourly_means: &[GroupValue<(u8, DayType)>],
        day_type: DayType,
    ) -> Option<GroupValue<u8>> {
        hourly_means
            .iter()
            .filter(|g| g.key.1 == day_type)
            .max_by(|a, b| {
                a.value
                    .partial_cmp(&b.value)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    // earliest hour wins a tie
                    .then(b.key.0.cmp(&a.key.0))
            })
            .map(|g| GroupValue {
                key: g.key.0,
                rows: g.rows,
                value: g.value,
            })
    }

    pub fn mean_count_by_season(records: &[DailyRecord]) -> Vec<GroupValue<Season>> {
        Self::mean_count_by(records, |r| r.season)
    }

    /// Mean count per calendar month (1-12).
    pub fn mean_count_by_month(records: &[DailyRecord]) -> Vec<GroupValue<u32>> {
        Self::mean_count_by(records, |r| r.month)
    }
}
