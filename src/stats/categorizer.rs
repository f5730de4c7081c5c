//! Usage tier binning of daily totals.

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::data::model::DailyRecord;
use crate::data::schema::{Season, UsageTier, WeatherSituation};

/// Lowest count of the moderate tier.
pub const MODERATE_FROM: u32 = 1000;
/// Lowest count of the high tier.
pub const HIGH_FROM: u32 = 3000;

/// Bin edges `[min, 1000, 3000, max]`, each bin closed on its lower edge and
/// the last bin closed on both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageBins {
    pub min: u32,
    pub max: u32,
}

impl UsageBins {
    /// Outer edges from the observed counts; `None` for an empty table.
    pub fn from_counts(counts: impl IntoIterator<Item = u32>) -> Option<Self> {
        counts.into_iter().fold(None, |bins, c| match bins {
            None => Some(UsageBins { min: c, max: c }),
            Some(b) => Some(UsageBins {
                min: b.min.min(c),
                max: b.max.max(c),
            }),
        })
    }

    /// Tier of `count`, or `None` outside `[min, max]`.
    pub fn classify(&self, count: u32) -> Option<UsageTier> {
        if count < self.min || count > self.max {
            return None;
        }
        Some(if count < MODERATE_FROM {
            UsageTier::Low
        } else if count < HIGH_FROM {
            UsageTier::Moderate
        } else {
            UsageTier::High
        })
    }
}

/// Number and share of days in each tier, in tier order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierDistribution {
    pub counts: [usize; 3],
    pub percent: [f64; 3],
}

/// Row-normalized tier percentages of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierShare<K> {
    pub key: K,
    pub rows: usize,
    /// Percentages in [`UsageTier::ALL`] order, summing to 100.
    pub percent: [f64; 3],
}

/// Assigns usage tiers and cross-tabulates them.
pub struct Categorizer;

impl Categorizer {
    /// One tier per row, using the table's own min/max as outer edges.
    pub fn categorize(records: &[DailyRecord]) -> Vec<UsageTier> {
        let Some(bins) = UsageBins::from_counts(records.iter().map(|r| r.count)) else {
            return Vec::new();
        };
        records
            .iter()
            .filter_map(|r| bins.classify(r.count))
            .collect()
    }

    /// Store each row's tier on the row itself.
    pub fn attach(records: &mut [DailyRecord]) {
        let tiers = Self::categorize(records);
        for (record, tier) in records.iter_mut().zip(tiers) {
            record.usage_tier = Some(tier);
        }
        debug!("Attached usage tiers to {} daily rows", records.len());
    }

    /// Days per tier and their share of all days, from the attached tiers.
    /// Rows without a tier are left out.
    pub fn distribution(records: &[DailyRecord]) -> TierDistribution {
        let mut counts = [0usize; 3];
        for tier in records.iter().filter_map(|r| r.usage_tier) {
            counts[tier.index()] += 1;
        }
        TierDistribution {
            counts,
            percent: Self::normalize(&counts),
        }
    }

    /// Tier percentages within each key's rows, from the attached tiers.
    pub fn crosstab_by<K, F>(records: &[DailyRecord], key: F) -> Vec<TierShare<K>>
    where
        K: Ord,
        F: Fn(&DailyRecord) -> K,
    {
        let mut groups: BTreeMap<K, [usize; 3]> = BTreeMap::new();
        for record in records {
            if let Some(tier) = record.usage_tier {
                groups.entry(key(record)).or_default()[tier.index()] += 1;
            }
        }
        groups
            .into_iter()
            .map(|(key, counts)| TierShare {
                key,
                rows: counts.iter().sum(),
                percent: Self::normalize(&counts),
            })
            .collect()
    }

    pub fn crosstab_by_season(records: &[DailyRecord]) -> Vec<TierShare<Season>> {
        Self::crosstab_by(records, |r| r.season)
    }

    pub fn crosstab_by_weather(records: &[DailyRecord]) -> Vec<TierShare<WeatherSituation>> {
        Self::crosstab_by(records, |r| r.weather)
    }

    fn normalize(counts: &[usize; 3]) -> [f64; 3] {
        let total: usize = counts.iter().sum();
        if total == 0 {
            return [f64::NAN; 3];
        }
        counts.map(|c| c as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{day, sample_days};
    use crate::data::schema::DayType;

    fn days_with_counts(counts: &[u32]) -> Vec<DailyRecord> {
        let mut days: Vec<DailyRecord> = counts
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let season = if i % 2 == 0 { Season::Spring } else { Season::Fall };
                day(
                    (2011, 6, i as u32 + 1),
                    season,
                    WeatherSituation::Clear,
                    DayType::WorkingDay,
                    20.0,
                    c,
                )
            })
            .collect();
        Categorizer::attach(&mut days);
        days
    }

    fn tiered_sample() -> Vec<DailyRecord> {
        let mut days = sample_days();
        Categorizer::attach(&mut days);
        days
    }

    #[test]
    fn three_counts_fall_into_three_tiers() {
        let days = days_with_counts(&[500, 1500, 3500]);
        assert_eq!(
            Categorizer::categorize(&days),
            vec![UsageTier::Low, UsageTier::Moderate, UsageTier::High]
        );
    }

    #[test]
    fn breakpoints_are_lower_bound_inclusive() {
        let days = days_with_counts(&[22, 999, 1000, 2999, 3000, 8714]);
        assert_eq!(
            Categorizer::categorize(&days),
            vec![
                UsageTier::Low,
                UsageTier::Low,
                UsageTier::Moderate,
                UsageTier::Moderate,
                UsageTier::High,
                UsageTier::High,
            ]
        );
    }

    #[test]
    fn outer_edges_include_extremes() {
        let bins = UsageBins::from_counts([3000, 3200]).unwrap();
        assert_eq!(bins.classify(3000), Some(UsageTier::High));
        assert_eq!(bins.classify(3200), Some(UsageTier::High));
        assert_eq!(bins.classify(3201), None);
        assert!(UsageBins::from_counts(Vec::new()).is_none());
    }

    #[test]
    fn every_row_gets_exactly_one_tier() {
        let mut days = sample_days();
        Categorizer::attach(&mut days);
        assert!(days.iter().all(|d| d.usage_tier.is_some()));
        assert_eq!(days[0].usage_tier, Some(UsageTier::Low));
        assert_eq!(days[1].usage_tier, Some(UsageTier::Moderate));
        assert_eq!(days[3].usage_tier, Some(UsageTier::High));
    }

    #[test]
    fn distribution_counts_days_per_tier() {
        let dist = Categorizer::distribution(&tiered_sample());
        assert_eq!(dist.counts, [3, 1, 3]);
        assert!((dist.percent.iter().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn crosstab_rows_sum_to_one_hundred() {
        let days = days_with_counts(&[500, 1500, 3500, 4000, 900]);
        let by_season = Categorizer::crosstab_by_season(&days);
        assert_eq!(by_season.len(), 2);

        let spring = &by_season[0];
        assert_eq!(spring.key, Season::Spring);
        assert_eq!(spring.rows, 3);
        assert!((spring.percent[UsageTier::Low.index()] - 200.0 / 3.0).abs() < 1e-9);
        assert!((spring.percent[UsageTier::High.index()] - 100.0 / 3.0).abs() < 1e-9);

        let fall = &by_season[1];
        assert_eq!(fall.percent, [0.0, 50.0, 50.0]);

        for share in &by_season {
            assert!((share.percent.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
        let by_weather = Categorizer::crosstab_by_weather(&tiered_sample());
        for share in &by_weather {
            assert!((share.percent.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        }
        assert_eq!(by_weather.len(), 4);
    }

    #[test]
    fn empty_table_has_no_tiers() {
        assert!(Categorizer::categorize(&[]).is_empty());
        assert!(Categorizer::crosstab_by_season(&[]).is_empty());
        let dist = Categorizer::distribution(&[]);
        assert_eq!(dist.counts, [0, 0, 0]);
        assert!(dist.percent.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn summaries_read_the_attached_tier() {
        let mut days = tiered_sample();
        // a filtered copy keeps the tier binned on the full table
        days[0].usage_tier = Some(UsageTier::High);
        days[1].usage_tier = None;
        let dist = Categorizer::distribution(&days);
        assert_eq!(dist.counts, [2, 0, 4]);
        let rows: usize = Categorizer::crosstab_by_season(&days)
            .iter()
            .map(|s| s.rows)
            .sum();
        assert_eq!(rows, days.len() - 1);
    }
}
