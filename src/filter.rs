//! Filter engine: facet predicates combined by AND over an immutable dataset.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::data_models::{Dataset, Observation};
use crate::errors::EngineError;
use crate::facets::{CategoryField, FacetId, FacetRegistry, MeasureField};

/// One active facet constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Year(i32),
    /// Exact text match against the row's value.
    Category { field: CategoryField, value: String },
    /// Inclusive on both ends; null values never match.
    Range {
        field: MeasureField,
        low: f64,
        high: f64,
    },
    /// Inclusive on both ends.
    Dates { start: NaiveDate, end: NaiveDate },
}

impl Predicate {
    pub fn facet(&self) -> FacetId {
        match self {
            Predicate::Year(_) => FacetId::Year,
            Predicate::Category { field, .. } => field.facet(),
            Predicate::Range { field, .. } => field.facet(),
            Predicate::Dates { .. } => FacetId::DateRange,
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        match self {
            Predicate::Year(year) => obs.date.year() == *year,
            Predicate::Category { field, value } => field.value_of(obs) == Some(value.as_str()),
            Predicate::Range { field, low, high } => field
                .value_of(obs)
                .map_or(false, |v| *low <= v && v <= *high),
            Predicate::Dates { start, end } => *start <= obs.date && obs.date <= *end,
        }
    }
}

/// Immutable set of user choices, at most one predicate per facet. Facets
/// without a predicate impose no constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetSelection {
    predicates: BTreeMap<FacetId, Predicate>,
}

impl FacetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `predicate`, replacing any earlier choice for the same facet.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.insert(predicate.facet(), predicate);
        self
    }

    pub fn year(self, year: i32) -> Self {
        self.with(Predicate::Year(year))
    }

    pub fn category(self, field: CategoryField, value: impl Into<String>) -> Self {
        self.with(Predicate::Category {
            field,
            value: value.into(),
        })
    }

    pub fn range(self, field: MeasureField, low: f64, high: f64) -> Self {
        self.with(Predicate::Range { field, low, high })
    }

    pub fn dates(self, start: NaiveDate, end: NaiveDate) -> Self {
        self.with(Predicate::Dates { start, end })
    }

    pub fn without(mut self, facet: FacetId) -> Self {
        self.predicates.remove(&facet);
        self
    }

    pub fn get(&self, facet: FacetId) -> Option<&Predicate> {
        self.predicates.get(&facet)
    }

    pub fn facets(&self) -> impl Iterator<Item = FacetId> + '_ {
        self.predicates.keys().copied()
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.values()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.predicates.values().all(|p| p.matches(obs))
    }
}

/// Ordered subset of a dataset's rows, held as indices into it.
#[derive(Debug, Clone)]
pub struct View<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> View<'a> {
    /// Every row of the dataset.
    pub fn all(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// Narrows this view further; the source dataset is untouched.
    pub fn refine(&self, selection: &FacetSelection) -> View<'a> {
        let rows = self.dataset.rows();
        View {
            dataset: self.dataset,
            indices: self
                .indices
                .iter()
                .copied()
                .filter(|&i| selection.matches(&rows[i]))
                .collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a Observation> + '_ {
        let rows = self.dataset.rows();
        self.indices.iter().map(move |&i| &rows[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Materializes the view as an owned dataset with the same schema.
    pub fn to_dataset(&self) -> Dataset {
        Dataset::new(self.rows().cloned().collect(), self.dataset.schema().clone())
    }
}

impl PartialEq for View<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.dataset, other.dataset) && self.indices == other.indices
    }
}

impl<'a, 'v> IntoIterator for &'v View<'a> {
    type Item = &'a Observation;
    type IntoIter = Box<dyn Iterator<Item = &'a Observation> + 'v>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.rows())
    }
}

/// Rows of `dataset` satisfying every predicate in `selection`.
pub fn apply<'a>(dataset: &'a Dataset, selection: &FacetSelection) -> View<'a> {
    let view = View::all(dataset).refine(selection);
    log::debug!(
        "Filter with {} active facets kept {}/{} rows",
        selection.len(),
        view.len(),
        dataset.len()
    );
    view
}

/// [`apply`], after refusing selections on facets the registry lacks.
pub fn apply_checked<'a>(
    registry: &FacetRegistry,
    dataset: &'a Dataset,
    selection: &FacetSelection,
) -> Result<View<'a>, EngineError> {
    registry.check_selection(selection)?;
    Ok(apply(dataset, selection))
}
