//! Schema normalization: canonical column names, per-field best-effort
//! coercion, and row admission.

use chrono::{NaiveDate, NaiveTime};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::data_models::{Column, Dataset, Observation, RawRecord, RawValue, Schema, COLUMN_COUNT};
use crate::errors::EngineError;
use crate::utils::{self, CountEncoding};
use crate::validation::{self, AdmissionPolicy, DropReason};

/// Tokens the CSV layer commonly leaves behind for missing cells.
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "-nan", "<NA>",
];

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub admission: AdmissionPolicy,
    pub count_encoding: CountEncoding,
    pub null_markers: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::default(),
            count_encoding: CountEncoding::default(),
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of one normalization pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeOutcome {
    #[serde(skip)]
    pub dataset: Dataset,
    pub dropped: usize,
    pub drop_reasons: BTreeMap<DropReason, usize>,
    /// Non-null cells that failed to coerce, per column.
    pub parse_failures: BTreeMap<Column, usize>,
    /// Normalized names of source columns outside the canonical set.
    pub ignored_columns: Vec<String>,
}

type RowCells<'r> = [Option<&'r RawValue>; COLUMN_COUNT];

/// Normalizes raw records into the canonical dataset.
///
/// Never fails per row or per field. The only error is structural: a
/// required column that no source row carries at all.
pub fn normalize(
    records: &[RawRecord],
    options: &NormalizeOptions,
) -> Result<NormalizeOutcome, EngineError> {
    let mut name_cache: HashMap<&str, Option<Column>> = HashMap::new();
    let mut ignored: BTreeSet<String> = BTreeSet::new();
    let mut schema = Schema::default();

    let mut rows_cells: Vec<RowCells<'_>> = Vec::with_capacity(records.len());
    for record in records {
        let mut cells: RowCells<'_> = [None; COLUMN_COUNT];
        for (raw_name, value) in record.fields() {
            let column = *name_cache.entry(raw_name).or_insert_with(|| {
                let canonical = utils::normalize_column_name(raw_name);
                let column = Column::from_canonical(&canonical);
                if column.is_none() {
                    debug!("Ignoring non-canonical column '{}'", canonical);
                    ignored.insert(canonical);
                }
                column
            });
            if let Some(column) = column {
                schema.insert(column);
                let slot = &mut cells[column.index()];
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
        }
        rows_cells.push(cells);
    }

    if !records.is_empty() {
        if let Some(&missing) = options
            .admission
            .required_columns()
            .iter()
            .find(|c| !schema.contains(**c))
        {
            return Err(EngineError::MissingRequiredColumn { column: missing });
        }
    }

    let mut coercer = Coercer::new(options);
    let mut rows = Vec::with_capacity(rows_cells.len());
    let mut drop_reasons: BTreeMap<DropReason, usize> = BTreeMap::new();

    for cells in &rows_cells {
        match coercer.observation(cells) {
            Ok(observation) => rows.push(observation),
            Err(reason) => *drop_reasons.entry(reason).or_insert(0) += 1,
        }
    }

    let dropped = drop_reasons.values().sum();
    info!(
        "Normalized {} raw rows: {} admitted, {} dropped, {} canonical columns",
        records.len(),
        rows.len(),
        dropped,
        schema.len()
    );

    Ok(NormalizeOutcome {
        dataset: Dataset::new(rows, schema),
        dropped,
        drop_reasons,
        parse_failures: coercer.failures,
        ignored_columns: ignored.into_iter().collect(),
    })
}

/// Per-pass coercion state: the null markers and the failure counters.
struct Coercer<'o> {
    options: &'o NormalizeOptions,
    failures: BTreeMap<Column, usize>,
}

impl<'o> Coercer<'o> {
    fn new(options: &'o NormalizeOptions) -> Self {
        Self {
            options,
            failures: BTreeMap::new(),
        }
    }

    fn observation(&mut self, cells: &RowCells<'_>) -> Result<Observation, DropReason> {
        let date = self.date(cells);
        let common_name = self.text(cells, Column::CommonName);
        let count = self.count(cells);

        let (date, common_name) =
            validation::check_admission(date, common_name, count, self.options.admission)?;

        let scientific_name = self.text(cells, Column::ScientificName);
        let full_name = Observation::derive_full_name(&common_name, scientific_name.as_deref());

        Ok(Observation {
            date,
            start_time: self.time(cells, Column::StartTime),
            end_time: self.time(cells, Column::EndTime),
            common_name,
            scientific_name,
            full_name,
            interval_length: self.text(cells, Column::IntervalLength),
            initial_three_min_cnt: count,
            temperature: self.real(cells, Column::Temperature),
            humidity: self.real(cells, Column::Humidity),
            id_method: self.text(cells, Column::IdMethod),
            site_name: self.text(cells, Column::SiteName),
            observer: self.text(cells, Column::Observer),
        })
    }

    /// The cell with null markers and blanks folded to `None`.
    fn cell<'r>(&self, cells: &RowCells<'r>, column: Column) -> Option<&'r RawValue> {
        match cells[column.index()]? {
            RawValue::Empty => None,
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() || self.options.null_markers.iter().any(|m| m == trimmed) {
                    None
                } else {
                    cells[column.index()]
                }
            }
            RawValue::Number(n) if n.is_nan() => None,
            RawValue::Number(_) => cells[column.index()],
        }
    }

    fn record_failure(&mut self, column: Column, message: &str) {
        debug!("{}: {}; setting field to null", column, message);
        *self.failures.entry(column).or_insert(0) += 1;
    }

    fn text(&self, cells: &RowCells<'_>, column: Column) -> Option<String> {
        match self.cell(cells, column)? {
            RawValue::Text(s) => Some(s.trim().to_string()),
            RawValue::Number(n) => Some(utils::format_number(*n)),
            RawValue::Empty => None,
        }
    }

    fn date(&mut self, cells: &RowCells<'_>) -> Option<NaiveDate> {
        match self.cell(cells, Column::Date)? {
            RawValue::Text(s) => match utils::parse_date(s) {
                Ok(date) => Some(date),
                Err(e) => {
                    self.record_failure(Column::Date, &e);
                    None
                }
            },
            _ => {
                self.record_failure(Column::Date, "numeric value is not a calendar date");
                None
            }
        }
    }

    fn time(&mut self, cells: &RowCells<'_>, column: Column) -> Option<NaiveTime> {
        match self.cell(cells, column)? {
            RawValue::Text(s) => match utils::parse_time(s) {
                Ok(time) => Some(time),
                Err(e) => {
                    self.record_failure(column, &e);
                    None
                }
            },
            _ => {
                self.record_failure(column, "numeric value is not a time of day");
                None
            }
        }
    }

    fn count(&mut self, cells: &RowCells<'_>) -> Option<u64> {
        let encoding = self.options.count_encoding;
        let parsed = match self.cell(cells, Column::InitialThreeMinCnt)? {
            RawValue::Text(s) => utils::parse_count_text(s, encoding),
            RawValue::Number(n) => utils::count_from_number(*n, encoding),
            RawValue::Empty => return None,
        };
        match parsed {
            Ok(count) => Some(count),
            Err(e) => {
                self.record_failure(Column::InitialThreeMinCnt, &e);
                None
            }
        }
    }

    fn real(&mut self, cells: &RowCells<'_>, column: Column) -> Option<f64> {
        let parsed = match self.cell(cells, column)? {
            RawValue::Text(s) => utils::parse_real_text(s),
            RawValue::Number(n) => utils::finite(*n),
            RawValue::Empty => return None,
        };
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                self.record_failure(column, &e);
                None
            }
        }
    }
}
