//! Derived views over a dataset or a filtered view of one: summary counts,
//! the daily time series, and top-N rankings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data_models::Observation;
use crate::facets::CategoryField;

pub const DEFAULT_TOP_N: usize = 10;

/// Grouping column for rankings; any categorical field qualifies.
pub type GroupKey = CategoryField;

/// Sums saturate at `u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    /// Number of rows.
    pub count: usize,
    /// Sum of `initial_three_min_cnt`, null read as 0.
    pub total: u64,
}

pub fn summarize<'a>(rows: impl IntoIterator<Item = &'a Observation>) -> Summary {
    rows.into_iter().fold(Summary::default(), |acc, row| Summary {
        count: acc.count + 1,
        total: acc.total.saturating_add(row.count_or_zero()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub total: u64,
}

/// Per-date totals, ascending by date. Only dates present in the input
/// appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.points.iter().fold(0u64, |acc, p| acc.saturating_add(p.total))
    }

    /// One point per calendar day in `[start, end]`, missing days as 0.
    /// Points outside the range are dropped.
    pub fn zero_filled(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let by_date: BTreeMap<NaiveDate, u64> =
            self.points.iter().map(|p| (p.date, p.total)).collect();
        let points = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| SeriesPoint {
                date,
                total: by_date.get(&date).copied().unwrap_or(0),
            })
            .collect();
        TimeSeries { points }
    }
}

pub fn daily_series<'a>(rows: impl IntoIterator<Item = &'a Observation>) -> TimeSeries {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows {
        let total = by_date.entry(row.date).or_insert(0);
        *total = total.saturating_add(row.count_or_zero());
    }
    TimeSeries {
        points: by_date
            .into_iter()
            .map(|(date, total)| SeriesPoint { date, total })
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    /// Number of rows per key.
    Occurrences,
    /// Summed `initial_three_min_cnt` per key, null read as 0.
    #[default]
    TotalCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub key: String,
    pub value: u64,
}

/// Top `n` keys by `metric`, descending; ties broken by ascending key.
/// Rows with a null key are skipped.
pub fn top_n<'a>(
    rows: impl IntoIterator<Item = &'a Observation>,
    key: GroupKey,
    metric: RankMetric,
    n: usize,
) -> Vec<RankEntry> {
    let mut groups: BTreeMap<&'a str, u64> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key.value_of(row) {
            let increment = match metric {
                RankMetric::Occurrences => 1,
                RankMetric::TotalCount => row.count_or_zero(),
            };
            let value = groups.entry(k).or_insert(0);
            *value = value.saturating_add(increment);
        }
    }

    let mut entries: Vec<RankEntry> = groups
        .into_iter()
        .map(|(key, value)| RankEntry {
            key: key.to_string(),
            value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::Observation;

    fn obs(date: (i32, u32, u32), name: &str, count: Option<u64>) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start_time: None,
            end_time: None,
            common_name: name.to_string(),
            scientific_name: None,
            full_name: name.to_string(),
            interval_length: None,
            initial_three_min_cnt: count,
            temperature: None,
            humidity: None,
            id_method: None,
            site_name: None,
            observer: None,
        }
    }

    #[test]
    fn test_empty_aggregates() {
        let rows: Vec<Observation> = Vec::new();
        assert_eq!(summarize(&rows), Summary { count: 0, total: 0 });
        assert!(daily_series(&rows).is_empty());
        assert!(top_n(&rows, CategoryField::CommonName, RankMetric::TotalCount, 10).is_empty());
    }

    #[test]
    fn test_zero_filled_series() {
        let rows = vec![obs((2023, 5, 1), "Robin", Some(2)), obs((2023, 5, 3), "Robin", Some(1))];
        let series = daily_series(&rows);
        assert_eq!(series.len(), 2);

        let start = NaiveDate::from_ymd_opt(2023, 4, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 5, 3).unwrap();
        let filled = series.zero_filled(start, end);
        let totals: Vec<u64> = filled.points().iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![0, 2, 0, 1]);
    }

    #[test]
    fn test_zero_filled_inverted_range_is_empty() {
        let series = daily_series(&[obs((2023, 5, 1), "Robin", Some(2))]);
        let start = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert!(series.zero_filled(start, end).is_empty());
    }

    #[test]
    fn test_occurrence_ranking_ignores_counts() {
        let rows = vec![
            obs((2023, 5, 1), "Robin", Some(10)),
            obs((2023, 5, 1), "Jay", Some(1)),
            obs((2023, 5, 2), "Jay", None),
        ];
        let ranking = top_n(&rows, CategoryField::CommonName, RankMetric::Occurrences, 10);
        assert_eq!(ranking[0], RankEntry { key: "Jay".into(), value: 2 });
        assert_eq!(ranking[1], RankEntry { key: "Robin".into(), value: 1 });
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let rows = vec![
            obs((2023, 5, 1), "Robin", Some(u64::MAX)),
            obs((2023, 5, 1), "Robin", Some(1)),
        ];
        assert_eq!(summarize(&rows).total, u64::MAX);
        let series = daily_series(&rows);
        assert_eq!(series.points()[0].total, u64::MAX);
        assert_eq!(series.total(), u64::MAX);
        let ranking = top_n(&rows, CategoryField::CommonName, RankMetric::TotalCount, 1);
        assert_eq!(ranking[0].value, u64::MAX);
    }

    #[test]
    fn test_null_keys_are_skipped() {
        let rows = vec![obs((2023, 5, 1), "Robin", Some(1))];
        assert!(top_n(&rows, CategoryField::Observer, RankMetric::TotalCount, 10).is_empty());
    }
}
