//! GapDash Dataset Provider
//!
//! A `Dataset` is the immutable table the dashboard is built on. It is loaded
//! once at startup, wrapped in an `Arc`, and shared read-only by every session.
//!
//! # Examples
//!
//! ```
//! use gapdash::Dataset;
//!
//! let csv = "country,continent,year\nChina,Asia,2007\nFrance,Europe,2007";
//! let dataset = Dataset::from_csv_str("tiny", csv).unwrap();
//! assert_eq!(dataset.len(), 2);
//! assert_eq!(dataset.schema().get_column_index("continent"), Some(1));
//! ```

use crate::column::{ColumnType, ColumnValue};
use crate::error::DatasetError;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// The gapminder extract shipped with the binary.
pub static BUNDLED_CSV: &str = include_str!("../fixtures/gapminder.csv");

/// Schema definition with column names and types, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(n, t)| (n.as_str(), *t))
    }
}

/// One row of the dataset.
///
/// Cloning a record is cheap: the field map is shared. Edits never touch the
/// shared map, `with_value` returns a new record instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Arc<HashMap<String, ColumnValue>>,
}

impl Record {
    pub fn new(fields: HashMap<String, ColumnValue>) -> Self {
        Record {
            fields: Arc::new(fields),
        }
    }

    /// Build a record from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ColumnValue>,
    {
        Record::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.fields.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this record with one field replaced
    pub fn with_value(&self, column: &str, value: ColumnValue) -> Record {
        let mut fields = (*self.fields).clone();
        fields.insert(column.to_string(), value);
        Record::new(fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// JSON object for the wire, restricted to `columns`
    pub fn to_json(&self, columns: &[&str]) -> serde_json::Map<String, JsonValue> {
        columns
            .iter()
            .filter_map(|c| self.get(c).map(|v| (c.to_string(), v.to_json())))
            .collect()
    }
}

/// Immutable in-memory table: a schema and an ordered list of records.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    schema: Schema,
    records: Vec<Record>,
}

impl Dataset {
    pub fn from_records(name: impl Into<String>, schema: Schema, records: Vec<Record>) -> Self {
        Dataset {
            name: name.into(),
            schema,
            records,
        }
    }

    /// The bundled gapminder extract
    pub fn bundled() -> Result<Dataset, DatasetError> {
        Dataset::from_csv_str("gapminder", BUNDLED_CSV)
    }

    /// Load a `.csv` or `.json` file, picking the parser by extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset")
            .to_string();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();

        let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match extension.as_str() {
            "csv" => Dataset::from_csv_str(&name, &contents),
            "json" => Dataset::from_json_str(&name, &contents),
            other => Err(DatasetError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_csv_str(name: &str, csv: &str) -> Result<Dataset, DatasetError> {
        Dataset::from_csv_reader(name, csv.as_bytes())
    }

    /// Parse CSV with a header row.
    ///
    /// Column types are inferred over every row: a column is Int32 only if
    /// every non-empty field fits, otherwise it widens to Int64, Float64 and
    /// finally String. Empty fields are Null.
    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Dataset, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let header: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        if header.is_empty() || header.iter().all(|h| h.is_empty()) {
            return Err(DatasetError::Empty(name.to_string()));
        }

        let mut raw_rows: Vec<Vec<String>> = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            if record.len() != header.len() {
                return Err(DatasetError::RaggedRow {
                    row: i + 1,
                    expected: header.len(),
                    found: record.len(),
                });
            }
            raw_rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        if raw_rows.is_empty() {
            return Err(DatasetError::Empty(name.to_string()));
        }

        let types: Vec<ColumnType> = (0..header.len())
            .map(|col| {
                raw_rows
                    .iter()
                    .filter_map(|row| infer_field_type(&row[col]))
                    .reduce(ColumnType::widen)
                    .unwrap_or(ColumnType::String)
            })
            .collect();

        let mut records = Vec::with_capacity(raw_rows.len());
        for (i, row) in raw_rows.iter().enumerate() {
            let mut fields = HashMap::with_capacity(header.len());
            for ((column, field), column_type) in header.iter().zip(row).zip(&types) {
                let value = parse_field(field, *column_type).ok_or_else(|| {
                    DatasetError::InvalidFormat(format!(
                        "row {}: cannot read '{}' as {:?} for column '{}'",
                        i + 1,
                        field,
                        column_type,
                        column
                    ))
                })?;
                fields.insert(column.clone(), value);
            }
            records.push(Record::new(fields));
        }

        let schema = Schema::new(header.into_iter().zip(types).collect());
        Ok(Dataset::from_records(name, schema, records))
    }

    /// Parse a JSON array of objects.
    ///
    /// Columns are the union of all keys in first-seen order. A row may omit
    /// a key; the record then simply has no value for that column.
    pub fn from_json_str(name: &str, json: &str) -> Result<Dataset, DatasetError> {
        let parsed: JsonValue = serde_json::from_str(json)?;
        let items = parsed
            .as_array()
            .ok_or_else(|| DatasetError::InvalidFormat("expected an array of objects".to_string()))?;

        if items.is_empty() {
            return Err(DatasetError::Empty(name.to_string()));
        }

        let mut columns: Vec<(String, Option<ColumnType>)> = Vec::new();
        let mut records = Vec::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let obj = item.as_object().ok_or_else(|| {
                DatasetError::InvalidFormat(format!("row {} is not an object", i + 1))
            })?;

            let mut fields = HashMap::with_capacity(obj.len());
            for (key, value) in obj {
                let cv = ColumnValue::from_json(value).ok_or_else(|| {
                    DatasetError::InvalidFormat(format!(
                        "row {}: column '{}' holds a nested value",
                        i + 1,
                        key
                    ))
                })?;

                let slot = match columns.iter().position(|(n, _)| n == key) {
                    Some(pos) => pos,
                    None => {
                        columns.push((key.clone(), None));
                        columns.len() - 1
                    }
                };
                if let Some(t) = cv.column_type() {
                    let merged = columns[slot].1.map_or(t, |existing| existing.widen(t));
                    columns[slot].1 = Some(merged);
                }
                fields.insert(key.clone(), cv);
            }
            records.push(Record::new(fields));
        }

        let schema = Schema::new(
            columns
                .into_iter()
                .map(|(n, t)| (n, t.unwrap_or(ColumnType::String)))
                .collect(),
        );
        Ok(Dataset::from_records(name, schema, records))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }
}

/// Infer the type of a single CSV field, `None` for an empty field
fn infer_field_type(field: &str) -> Option<ColumnType> {
    if field.is_empty() {
        return None;
    }
    if field.parse::<i32>().is_ok() {
        return Some(ColumnType::Int32);
    }
    if field.parse::<i64>().is_ok() {
        return Some(ColumnType::Int64);
    }
    if field.parse::<f64>().is_ok() {
        return Some(ColumnType::Float64);
    }
    if field.eq_ignore_ascii_case("true") || field.eq_ignore_ascii_case("false") {
        return Some(ColumnType::Bool);
    }
    Some(ColumnType::String)
}

/// Parse a CSV field as `column_type`. Empty fields are Null.
fn parse_field(field: &str, column_type: ColumnType) -> Option<ColumnValue> {
    if field.is_empty() {
        return Some(ColumnValue::Null);
    }
    match column_type {
        ColumnType::Int32 => field.parse().ok().map(ColumnValue::Int32),
        ColumnType::Int64 => field.parse().ok().map(ColumnValue::Int64),
        ColumnType::Float64 => field.parse().ok().map(ColumnValue::Float64),
        ColumnType::Bool => match field.to_ascii_lowercase().as_str() {
            "true" => Some(ColumnValue::Bool(true)),
            "false" => Some(ColumnValue::Bool(false)),
            _ => None,
        },
        ColumnType::String => Some(ColumnValue::String(field.to_string())),
    }
}
