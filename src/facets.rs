//! Facet registry: which filter dimensions a dataset supports, and their
//! domains.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::data_models::{Column, Dataset, Observation};
use crate::errors::EngineError;
use crate::filter::FacetSelection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetId {
    Year,
    DateRange,
    CommonName,
    FullName,
    IntervalLength,
    IdMethod,
    SiteName,
    Observer,
    Temperature,
    Humidity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    Categorical,
    Range,
}

impl FacetId {
    pub const ALL: [FacetId; 10] = [
        FacetId::Year,
        FacetId::DateRange,
        FacetId::CommonName,
        FacetId::FullName,
        FacetId::IntervalLength,
        FacetId::IdMethod,
        FacetId::SiteName,
        FacetId::Observer,
        FacetId::Temperature,
        FacetId::Humidity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FacetId::Year => "year",
            FacetId::DateRange => "date_range",
            FacetId::CommonName => "common_name",
            FacetId::FullName => "full_name",
            FacetId::IntervalLength => "interval_length",
            FacetId::IdMethod => "id_method",
            FacetId::SiteName => "site_name",
            FacetId::Observer => "observer",
            FacetId::Temperature => "temperature",
            FacetId::Humidity => "humidity",
        }
    }

    pub fn kind(&self) -> FacetKind {
        match self {
            FacetId::DateRange | FacetId::Temperature | FacetId::Humidity => FacetKind::Range,
            _ => FacetKind::Categorical,
        }
    }

    /// Source column whose presence makes the facet available.
    pub fn source_column(&self) -> Column {
        match self {
            FacetId::Year | FacetId::DateRange => Column::Date,
            FacetId::CommonName | FacetId::FullName => Column::CommonName,
            FacetId::IntervalLength => Column::IntervalLength,
            FacetId::IdMethod => Column::IdMethod,
            FacetId::SiteName => Column::SiteName,
            FacetId::Observer => Column::Observer,
            FacetId::Temperature => Column::Temperature,
            FacetId::Humidity => Column::Humidity,
        }
    }
}

impl fmt::Display for FacetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text-valued dimensions: categorical facets and ranking group keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryField {
    CommonName,
    FullName,
    IntervalLength,
    IdMethod,
    SiteName,
    Observer,
}

impl CategoryField {
    pub fn facet(&self) -> FacetId {
        match self {
            CategoryField::CommonName => FacetId::CommonName,
            CategoryField::FullName => FacetId::FullName,
            CategoryField::IntervalLength => FacetId::IntervalLength,
            CategoryField::IdMethod => FacetId::IdMethod,
            CategoryField::SiteName => FacetId::SiteName,
            CategoryField::Observer => FacetId::Observer,
        }
    }

    /// The row's value for this field. `interval_length` is stored trimmed.
    pub fn value_of<'a>(&self, obs: &'a Observation) -> Option<&'a str> {
        match self {
            CategoryField::CommonName => Some(obs.common_name.as_str()),
            CategoryField::FullName => Some(obs.full_name.as_str()),
            CategoryField::IntervalLength => obs.interval_length.as_deref(),
            CategoryField::IdMethod => obs.id_method.as_deref(),
            CategoryField::SiteName => obs.site_name.as_deref(),
            CategoryField::Observer => obs.observer.as_deref(),
        }
    }
}

/// Real-valued range dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureField {
    Temperature,
    Humidity,
}

impl MeasureField {
    pub fn facet(&self) -> FacetId {
        match self {
            MeasureField::Temperature => FacetId::Temperature,
            MeasureField::Humidity => FacetId::Humidity,
        }
    }

    pub fn value_of(&self, obs: &Observation) -> Option<f64> {
        match self {
            MeasureField::Temperature => obs.temperature,
            MeasureField::Humidity => obs.humidity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetDomain {
    Values { values: Vec<String> },
    Years { years: Vec<i32> },
    Numeric { min: f64, max: f64 },
    Dates { start: NaiveDate, end: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub id: FacetId,
    pub kind: FacetKind,
    pub domain: FacetDomain,
}

impl Facet {
    /// An available facet whose domain is empty: selecting anything in it
    /// matches nothing, so callers should hide or disable it.
    pub fn is_inert(&self) -> bool {
        match &self.domain {
            FacetDomain::Values { values } => values.is_empty(),
            FacetDomain::Years { years } => years.is_empty(),
            FacetDomain::Numeric { .. } | FacetDomain::Dates { .. } => false,
        }
    }
}

/// Capability map of a dataset. A pure function of the dataset; facets over
/// columns absent from the source are simply not registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FacetRegistry {
    facets: BTreeMap<FacetId, Facet>,
}

impl FacetRegistry {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let schema = dataset.schema();
        let mut facets = BTreeMap::new();

        for id in FacetId::ALL {
            if !schema.contains(id.source_column()) {
                continue;
            }
            let domain = match id {
                FacetId::Year => Some(year_domain(dataset)),
                FacetId::DateRange => dataset
                    .date_bounds()
                    .map(|(start, end)| FacetDomain::Dates { start, end }),
                FacetId::Temperature => numeric_domain(dataset, MeasureField::Temperature),
                FacetId::Humidity => numeric_domain(dataset, MeasureField::Humidity),
                FacetId::CommonName => Some(category_domain(dataset, CategoryField::CommonName)),
                FacetId::FullName => Some(category_domain(dataset, CategoryField::FullName)),
                FacetId::IntervalLength => {
                    Some(category_domain(dataset, CategoryField::IntervalLength))
                }
                FacetId::IdMethod => Some(category_domain(dataset, CategoryField::IdMethod)),
                FacetId::SiteName => Some(category_domain(dataset, CategoryField::SiteName)),
                FacetId::Observer => Some(category_domain(dataset, CategoryField::Observer)),
            };
            if let Some(domain) = domain {
                facets.insert(
                    id,
                    Facet {
                        id,
                        kind: id.kind(),
                        domain,
                    },
                );
            }
        }

        log::debug!("Registered {} facets", facets.len());
        Self { facets }
    }

    pub fn get(&self, id: FacetId) -> Option<&Facet> {
        self.facets.get(&id)
    }

    pub fn is_available(&self, id: FacetId) -> bool {
        self.facets.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.values()
    }

    /// Facets a caller should offer as controls: available and not inert.
    pub fn offered(&self) -> impl Iterator<Item = &Facet> {
        self.facets.values().filter(|f| !f.is_inert())
    }

    /// Refuses selections that name a facet this dataset does not have.
    pub fn check_selection(&self, selection: &FacetSelection) -> Result<(), EngineError> {
        match selection.facets().find(|id| !self.is_available(*id)) {
            Some(facet) => Err(EngineError::UnavailableFacet { facet }),
            None => Ok(()),
        }
    }
}

fn year_domain(dataset: &Dataset) -> FacetDomain {
    let years: BTreeSet<i32> = dataset.iter().map(|r| r.date.year()).collect();
    FacetDomain::Years {
        years: years.into_iter().collect(),
    }
}

fn category_domain(dataset: &Dataset, field: CategoryField) -> FacetDomain {
    let values: BTreeSet<&str> = dataset.iter().filter_map(|r| field.value_of(r)).collect();
    FacetDomain::Values {
        values: values.into_iter().map(str::to_string).collect(),
    }
}

/// `None` when every value is null.
fn numeric_domain(dataset: &Dataset, field: MeasureField) -> Option<FacetDomain> {
    let mut values = dataset.iter().filter_map(|r| field.value_of(r));
    let first = values.next()?;
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    Some(FacetDomain::Numeric { min, max })
}
