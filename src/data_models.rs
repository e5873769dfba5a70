use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A single raw cell as handed over by the loading layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

/// One raw row: column name (arbitrary casing/spacing) to value, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Builder form of [`RawRecord::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.push(name, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub const COLUMN_COUNT: usize = 12;

/// Canonical columns understood by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Date,
    StartTime,
    EndTime,
    CommonName,
    ScientificName,
    IntervalLength,
    InitialThreeMinCnt,
    Temperature,
    Humidity,
    IdMethod,
    SiteName,
    Observer,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Date,
        Column::StartTime,
        Column::EndTime,
        Column::CommonName,
        Column::ScientificName,
        Column::IntervalLength,
        Column::InitialThreeMinCnt,
        Column::Temperature,
        Column::Humidity,
        Column::IdMethod,
        Column::SiteName,
        Column::Observer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::StartTime => "start_time",
            Column::EndTime => "end_time",
            Column::CommonName => "common_name",
            Column::ScientificName => "scientific_name",
            Column::IntervalLength => "interval_length",
            Column::InitialThreeMinCnt => "initial_three_min_cnt",
            Column::Temperature => "temperature",
            Column::Humidity => "humidity",
            Column::IdMethod => "id_method",
            Column::SiteName => "site_name",
            Column::Observer => "observer",
        }
    }

    /// Looks up an already-normalized column name.
    pub fn from_canonical(name: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    /// Position in [`Column::ALL`], used for fixed-size per-row lookups.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which canonical columns the source actually carried. Built once by the
/// normalizer and consulted instead of ad hoc presence checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: BTreeSet<Column>,
}

impl Schema {
    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
        }
    }

    pub fn contains(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn insert(&mut self, column: Column) {
        self.columns.insert(column);
    }
}

/// One admitted row of the normalized dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub common_name: String,
    pub scientific_name: Option<String>,
    pub full_name: String,
    pub interval_length: Option<String>,
    pub initial_three_min_cnt: Option<u64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub id_method: Option<String>,
    pub site_name: Option<String>,
    pub observer: Option<String>,
}

impl Observation {
    /// `"{common} ({scientific})"` when a non-blank scientific name exists,
    /// otherwise the common name alone.
    pub fn derive_full_name(common_name: &str, scientific_name: Option<&str>) -> String {
        match scientific_name.map(str::trim) {
            Some(scientific) if !scientific.is_empty() => {
                format!("{} ({})", common_name, scientific)
            }
            _ => common_name.to_string(),
        }
    }

    /// Count with null read as zero, for summation.
    pub fn count_or_zero(&self) -> u64 {
        self.initial_three_min_cnt.unwrap_or(0)
    }

    /// Renders the row back into a raw record holding only the columns in
    /// `schema`, in canonical form.
    pub fn to_raw(&self, schema: &Schema) -> RawRecord {
        let mut raw = RawRecord::new();
        for column in schema.columns() {
            let value = match column {
                Column::Date => RawValue::Text(self.date.format("%Y-%m-%d").to_string()),
                Column::StartTime => time_to_raw(self.start_time),
                Column::EndTime => time_to_raw(self.end_time),
                Column::CommonName => RawValue::Text(self.common_name.clone()),
                Column::ScientificName => text_to_raw(&self.scientific_name),
                Column::IntervalLength => text_to_raw(&self.interval_length),
                Column::InitialThreeMinCnt => self
                    .initial_three_min_cnt
                    .map_or(RawValue::Empty, |c| RawValue::Number(c as f64)),
                Column::Temperature => self.temperature.map_or(RawValue::Empty, RawValue::Number),
                Column::Humidity => self.humidity.map_or(RawValue::Empty, RawValue::Number),
                Column::IdMethod => text_to_raw(&self.id_method),
                Column::SiteName => text_to_raw(&self.site_name),
                Column::Observer => text_to_raw(&self.observer),
            };
            raw.push(column.as_str(), value);
        }
        raw
    }
}

fn time_to_raw(time: Option<NaiveTime>) -> RawValue {
    time.map_or(RawValue::Empty, |t| {
        RawValue::Text(t.format("%H:%M:%S%.f").to_string())
    })
}

fn text_to_raw(text: &Option<String>) -> RawValue {
    text.as_ref().map_or(RawValue::Empty, |t| RawValue::Text(t.clone()))
}

/// The normalized dataset: immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<Observation>,
    schema: Schema,
}

impl Dataset {
    pub fn new(rows: Vec<Observation>, schema: Schema) -> Self {
        Self { rows, schema }
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.rows.iter()
    }

    /// Earliest and latest date over the whole dataset.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    pub fn to_raw_records(&self) -> Vec<RawRecord> {
        self.rows.iter().map(|r| r.to_raw(&self.schema)).collect()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
