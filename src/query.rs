//! Interactive query building: optional facet bounds become a
//! [`FacetSelection`], and the ranking is taken over the rows the
//! configured [`RankScope`] names.

use chrono::NaiveDate;

use crate::aggregate::{self, GroupKey, RankEntry, RankMetric};
use crate::config::{RankScope, SpeciesKey};
use crate::data_models::Dataset;
use crate::facets::{CategoryField, FacetDomain, FacetId, FacetRegistry, MeasureField};
use crate::filter::{FacetSelection, View};

/// Requested facet values; `None` leaves a facet unconstrained. A single
/// open range bound is filled in by [`build_selection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilters {
    pub year: Option<i32>,
    /// Matched against the column named by the species key.
    pub species: Option<String>,
    pub full_name: Option<String>,
    pub interval: Option<String>,
    pub id_method: Option<String>,
    pub site: Option<String>,
    pub observer: Option<String>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Open numeric bounds become infinities; open date bounds take the
/// dataset's first or last date.
///
/// With the full-name species key, `species` and `full_name` select the
/// same facet and `full_name` wins.
pub fn build_selection(
    filters: &QueryFilters,
    species_key: SpeciesKey,
    registry: &FacetRegistry,
) -> FacetSelection {
    let mut selection = FacetSelection::new();
    if let Some(year) = filters.year {
        selection = selection.year(year);
    }
    let categories = [
        (species_key.field(), &filters.species),
        (CategoryField::FullName, &filters.full_name),
        (CategoryField::IntervalLength, &filters.interval),
        (CategoryField::IdMethod, &filters.id_method),
        (CategoryField::SiteName, &filters.site),
        (CategoryField::Observer, &filters.observer),
    ];
    for (field, value) in categories {
        if let Some(value) = value {
            selection = selection.category(field, value.trim());
        }
    }

    let ranges = [
        (MeasureField::Temperature, filters.temp_min, filters.temp_max),
        (MeasureField::Humidity, filters.humidity_min, filters.humidity_max),
    ];
    for (field, low, high) in ranges {
        if low.is_some() || high.is_some() {
            selection = selection.range(
                field,
                low.unwrap_or(f64::NEG_INFINITY),
                high.unwrap_or(f64::INFINITY),
            );
        }
    }

    if filters.from.is_some() || filters.to.is_some() {
        let (lower, upper) = match registry.get(FacetId::DateRange).map(|f| &f.domain) {
            Some(FacetDomain::Dates { start, end }) => (*start, *end),
            _ => (NaiveDate::MIN, NaiveDate::MAX),
        };
        selection = selection.dates(filters.from.unwrap_or(lower), filters.to.unwrap_or(upper));
    }
    selection
}

/// Top-N over the whole dataset or over the selected rows only.
pub fn ranking(
    dataset: &Dataset,
    view: &View<'_>,
    scope: RankScope,
    key: GroupKey,
    metric: RankMetric,
    n: usize,
) -> Vec<RankEntry> {
    match scope {
        RankScope::Dataset => aggregate::top_n(dataset, key, metric, n),
        RankScope::Selection => aggregate::top_n(view, key, metric, n),
    }
}
