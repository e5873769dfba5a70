//! Batch summary reports: the non-interactive overviews (missing values,
//! richness per site, observer leaderboard, monthly trend, weather
//! correlation) computed over a normalized dataset.

use chrono::Datelike;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::{self, GroupKey, RankEntry, RankMetric, Summary};
use crate::data_models::{Column, Dataset, Observation};
use crate::normalizer::NormalizeOutcome;

/// Null count per column present in the schema.
pub fn missing_value_counts(dataset: &Dataset) -> BTreeMap<Column, usize> {
    let schema = dataset.schema();
    schema
        .columns()
        .map(|column| {
            let missing = dataset.iter().filter(|row| is_null(row, column)).count();
            (column, missing)
        })
        .collect()
}

fn is_null(row: &Observation, column: Column) -> bool {
    match column {
        Column::Date | Column::CommonName => false,
        Column::StartTime => row.start_time.is_none(),
        Column::EndTime => row.end_time.is_none(),
        Column::ScientificName => row.scientific_name.is_none(),
        Column::IntervalLength => row.interval_length.is_none(),
        Column::InitialThreeMinCnt => row.initial_three_min_cnt.is_none(),
        Column::Temperature => row.temperature.is_none(),
        Column::Humidity => row.humidity.is_none(),
        Column::IdMethod => row.id_method.is_none(),
        Column::SiteName => row.site_name.is_none(),
        Column::Observer => row.observer.is_none(),
    }
}

/// Species by number of rows, the plain `value_counts` leaderboard.
pub fn occurrence_ranking<'a>(
    rows: impl IntoIterator<Item = &'a Observation>,
    species_key: GroupKey,
    n: usize,
) -> Vec<RankEntry> {
    aggregate::top_n(rows, species_key, RankMetric::Occurrences, n)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRichness {
    pub site_name: String,
    pub species: usize,
}

/// Distinct `common_name`s per site, descending; ties by site name.
/// `None` when the source has no `site_name` column.
pub fn species_richness_by_site(dataset: &Dataset) -> Option<Vec<SiteRichness>> {
    if !dataset.schema().contains(Column::SiteName) {
        return None;
    }
    let mut by_site: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in dataset {
        if let Some(site) = row.site_name.as_deref() {
            by_site.entry(site).or_default().insert(row.common_name.as_str());
        }
    }
    let mut richness: Vec<SiteRichness> = by_site
        .into_iter()
        .map(|(site, species)| SiteRichness {
            site_name: site.to_string(),
            species: species.len(),
        })
        .collect();
    richness.sort_by(|a, b| b.species.cmp(&a.species).then_with(|| a.site_name.cmp(&b.site_name)));
    Some(richness)
}

/// Observers ranked by summed count. `None` without an `observer` column.
pub fn top_observers(dataset: &Dataset, n: usize) -> Option<Vec<RankEntry>> {
    if !dataset.schema().contains(Column::Observer) {
        return None;
    }
    Some(aggregate::top_n(dataset, GroupKey::Observer, RankMetric::TotalCount, n))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRow {
    pub year: i32,
    /// January first; months without rows are 0.
    pub months: [u64; 12],
}

/// Year × month totals, years ascending.
pub fn monthly_trend<'a>(rows: impl IntoIterator<Item = &'a Observation>) -> Vec<MonthlyRow> {
    let mut by_year: BTreeMap<i32, [u64; 12]> = BTreeMap::new();
    for row in rows {
        let cells = by_year.entry(row.date.year()).or_insert([0; 12]);
        let cell = &mut cells[row.date.month0() as usize];
        *cell = cell.saturating_add(row.count_or_zero());
    }
    by_year
        .into_iter()
        .map(|(year, months)| MonthlyRow { year, months })
        .collect()
}

pub const CORRELATION_VARIABLES: [&str; 3] = ["temperature", "humidity", "initial_three_min_cnt"];

/// Pearson correlation over rows where temperature, humidity and count are
/// all non-null. Rows and columns follow [`CORRELATION_VARIABLES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub variables: [&'static str; 3],
    pub samples: usize,
    /// `None` where a variable has zero variance or fewer than two samples exist.
    pub values: [[Option<f64>; 3]; 3],
}

/// `None` when either weather column is absent from the source.
pub fn weather_correlation(dataset: &Dataset) -> Option<CorrelationMatrix> {
    let schema = dataset.schema();
    if !schema.contains(Column::Temperature) || !schema.contains(Column::Humidity) {
        return None;
    }
    let samples: Vec<[f64; 3]> = dataset
        .iter()
        .filter_map(|row| match (row.temperature, row.humidity, row.initial_three_min_cnt) {
            (Some(t), Some(h), Some(c)) => Some([t, h, c as f64]),
            _ => None,
        })
        .collect();

    let mut values = [[None; 3]; 3];
    for (i, row) in values.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = pearson(&samples, i, j);
        }
    }
    Some(CorrelationMatrix {
        variables: CORRELATION_VARIABLES,
        samples: samples.len(),
        values,
    })
}

fn pearson(samples: &[[f64; 3]], a: usize, b: usize) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let n = samples.len() as f64;
    let mean_a = samples.iter().map(|s| s[a]).sum::<f64>() / n;
    let mean_b = samples.iter().map(|s| s[b]).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for s in samples {
        let da = s[a] - mean_a;
        let db = s[b] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    Some((cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0))
}

/// Everything the non-interactive overview prints for one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    pub rows: usize,
    pub columns: usize,
    pub dropped: usize,
    pub summary: Summary,
    pub missing_values: BTreeMap<Column, usize>,
    pub species_metric: RankMetric,
    pub top_species: Vec<RankEntry>,
    pub species_richness: Option<Vec<SiteRichness>>,
    pub top_observers: Option<Vec<RankEntry>>,
    pub monthly_trend: Vec<MonthlyRow>,
    pub weather_correlation: Option<CorrelationMatrix>,
}

impl DatasetReport {
    /// `top_species` ranks `species_key` by `metric`.
    pub fn build(
        outcome: &NormalizeOutcome,
        species_key: GroupKey,
        metric: RankMetric,
        top_n: usize,
    ) -> Self {
        let dataset = &outcome.dataset;
        DatasetReport {
            rows: dataset.len(),
            columns: dataset.schema().len(),
            dropped: outcome.dropped,
            summary: aggregate::summarize(dataset),
            missing_values: missing_value_counts(dataset),
            species_metric: metric,
            top_species: aggregate::top_n(dataset, species_key, metric, top_n),
            species_richness: species_richness_by_site(dataset),
            top_observers: top_observers(dataset, top_n),
            monthly_trend: monthly_trend(dataset),
            weather_correlation: weather_correlation(dataset),
        }
    }
}
