/// GapDash Table View
///
/// The server-side state behind the browser table: sort keys, per-column
/// filters, pagination, cell edits, column selection and hidden columns.
/// The view never mutates the shared `Dataset`; edits live in a per-view
/// overlay keyed by dataset row id.
///
/// The rows matching the active filters, in sort order and ignoring
/// pagination, are the *visible row set*. It is exposed through
/// `derived_virtual_data`, which stays `None` until the user first acts on
/// the table.

use crate::column::{ColumnType, ColumnValue};
use crate::dataset::{Dataset, Record};
use crate::expr::{parse_filter, FilterExpr};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Rows per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Sort order specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Ascending order (smallest first)
    Ascending,
    /// Descending order (largest first)
    Descending,
}

/// A single sort key specifying a column and order
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    /// Column name to sort by
    pub column: String,
    /// Sort order (ascending or descending)
    pub order: SortOrder,
    /// Whether NULL values should be placed first or last
    pub nulls_first: bool,
}

impl SortKey {
    /// Create a new sort key with ascending order (nulls last)
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
            nulls_first: false,
        }
    }

    /// Create a new sort key with descending order (nulls last)
    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
            nulls_first: false,
        }
    }
}

/// Whether the user may sort by one column or by several at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    Single,
    #[default]
    Multi,
}

/// Outcome of setting a column's filter text
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStatus {
    /// The expression parsed and is now active
    Applied,
    /// Empty text removed the column's filter
    Cleared,
    /// The expression did not parse; the column keeps its previous filter
    Invalid(String),
}

pub struct TableView {
    source: Arc<Dataset>,
    /// Edited rows, keyed by dataset row id
    edits: HashMap<usize, Record>,
    filters: BTreeMap<String, FilterExpr>,
    invalid_filters: BTreeMap<String, String>,
    sort_keys: Vec<SortKey>,
    sort_mode: SortMode,
    page_size: usize,
    page_current: usize,
    selected_column: Option<String>,
    hidden_columns: BTreeSet<String>,
    /// visible[view_pos] = dataset row id, filtered then sorted
    visible: Vec<usize>,
    /// Set by the first sort, filter, page or edit action
    interacted: bool,
}

impl TableView {
    pub fn new(source: Arc<Dataset>) -> Self {
        let visible = (0..source.len()).collect();
        TableView {
            source,
            edits: HashMap::new(),
            filters: BTreeMap::new(),
            invalid_filters: BTreeMap::new(),
            sort_keys: Vec::new(),
            sort_mode: SortMode::default(),
            page_size: DEFAULT_PAGE_SIZE,
            page_current: 0,
            selected_column: None,
            hidden_columns: BTreeSet::new(),
            visible,
            interacted: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }

    pub fn dataset(&self) -> &Dataset {
        &self.source
    }

    /// The row as this view sees it, edits included
    pub fn record(&self, row_id: usize) -> Option<&Record> {
        self.edits.get(&row_id).or_else(|| self.source.get(row_id))
    }

    fn column_type(&self, column: &str) -> Result<ColumnType, String> {
        self.source
            .schema()
            .get_column_type(column)
            .ok_or_else(|| format!("Column '{}' not found in table", column))
    }

    /// Replace the sort keys. In single mode only the last key is kept.
    pub fn set_sort(&mut self, mut keys: Vec<SortKey>) -> Result<(), String> {
        for key in &keys {
            self.column_type(&key.column)?;
        }
        if self.sort_mode == SortMode::Single && keys.len() > 1 {
            keys = keys.split_off(keys.len() - 1);
        }

        self.sort_keys = keys;
        self.interacted = true;
        self.rebuild_index();
        Ok(())
    }

    /// Set the filter text for one column. Empty text clears it.
    pub fn set_filter(&mut self, column: &str, expression: &str) -> Result<FilterStatus, String> {
        self.column_type(column)?;
        self.interacted = true;

        if expression.trim().is_empty() {
            self.filters.remove(column);
            self.invalid_filters.remove(column);
            self.rebuild_index();
            return Ok(FilterStatus::Cleared);
        }

        match parse_filter(expression) {
            Ok(expr) => {
                self.filters.insert(column.to_string(), expr);
                self.invalid_filters.remove(column);
                self.rebuild_index();
                Ok(FilterStatus::Applied)
            }
            Err(message) => {
                log::debug!("Ignoring invalid filter on '{}': {}", column, message);
                self.invalid_filters.insert(column.to_string(), message.clone());
                Ok(FilterStatus::Invalid(message))
            }
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.invalid_filters.clear();
        self.interacted = true;
        self.rebuild_index();
    }

    /// Move to `page`, clamped into the valid range
    pub fn set_page(&mut self, page: usize) {
        self.page_current = page.min(self.page_count() - 1);
        self.interacted = true;
    }

    /// Edit one cell of the view's local copy, returning the stored value.
    pub fn edit_cell(&mut self, row_id: usize, column: &str, value: &JsonValue) -> Result<ColumnValue, String> {
        let column_type = self.column_type(column)?;
        let record = self
            .record(row_id)
            .ok_or_else(|| format!("Row {} out of range [0, {})", row_id, self.source.len()))?;

        let coerced = ColumnValue::coerce_json(value, column_type)?;
        let edited = record.with_value(column, coerced.clone());
        self.edits.insert(row_id, edited);
        self.interacted = true;
        self.rebuild_index();
        Ok(coerced)
    }

    /// Select a single column, or clear the selection with `None`
    pub fn select_column(&mut self, column: Option<String>) -> Result<(), String> {
        if let Some(c) = &column {
            self.column_type(c)?;
        }
        self.selected_column = column;
        Ok(())
    }

    pub fn set_column_hidden(&mut self, column: &str, hidden: bool) -> Result<(), String> {
        self.column_type(column)?;
        if hidden {
            self.hidden_columns.insert(column.to_string());
        } else {
            self.hidden_columns.remove(column);
        }
        Ok(())
    }

    fn rebuild_index(&mut self) {
        let schema = self.source.schema();
        let filters: Vec<(&str, ColumnType, &FilterExpr)> = self
            .filters
            .iter()
            .filter_map(|(c, e)| schema.get_column_type(c).map(|t| (c.as_str(), t, e)))
            .collect();

        let mut visible: Vec<usize> = (0..self.source.len())
            .filter(|&i| {
                let Some(record) = self.record(i) else { return false };
                filters.iter().all(|(column, column_type, expr)| {
                    let value = record.get(column).unwrap_or(&ColumnValue::Null);
                    expr.matches(value, *column_type)
                })
            })
            .collect();

        if !self.sort_keys.is_empty() {
            // sort_by is stable: ties keep dataset order
            visible.sort_by(|&a, &b| {
                for key in &self.sort_keys {
                    let val_a = self.record(a).and_then(|r| r.get(&key.column));
                    let val_b = self.record(b).and_then(|r| r.get(&key.column));

                    let cmp = Self::compare_values(val_a, val_b, key);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                Ordering::Equal
            });
        }

        self.visible = visible;
        self.page_current = self.page_current.min(self.page_count() - 1);
    }

    /// Compare two cell values according to a sort key
    fn compare_values(val_a: Option<&ColumnValue>, val_b: Option<&ColumnValue>, key: &SortKey) -> Ordering {
        let a = val_a.filter(|v| !v.is_null());
        let b = val_b.filter(|v| !v.is_null());

        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => {
                if key.nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Some(_), None) => {
                if key.nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Some(a), Some(b)) => match key.order {
                SortOrder::Ascending => a.compare(b),
                SortOrder::Descending => a.compare(b).reverse(),
            },
        }
    }

    /// Dataset row ids of the visible row set, in display order
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_current(&self) -> usize {
        self.page_current
    }

    /// Number of pages; an empty row set still has one (empty) page
    pub fn page_count(&self) -> usize {
        self.visible.len().div_ceil(self.page_size).max(1)
    }

    /// `(row_id, record)` pairs on the current page
    pub fn page_rows(&self) -> Vec<(usize, &Record)> {
        self.visible
            .iter()
            .skip(self.page_current * self.page_size)
            .take(self.page_size)
            .filter_map(|&id| self.record(id).map(|r| (id, r)))
            .collect()
    }

    /// Every row passing the filters, sorted, regardless of page.
    /// `None` until the user has sorted, filtered, paged or edited.
    pub fn derived_virtual_data(&self) -> Option<Vec<Record>> {
        if !self.interacted {
            return None;
        }
        Some(
            self.visible
                .iter()
                .filter_map(|&id| self.record(id).cloned())
                .collect(),
        )
    }

    /// Rows on the current page only
    pub fn derived_viewport_data(&self) -> Vec<Record> {
        self.page_rows().into_iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort_keys
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Columns whose last filter text failed to parse, with the parse error
    pub fn invalid_filters(&self) -> &BTreeMap<String, String> {
        &self.invalid_filters
    }

    pub fn active_filter_columns(&self) -> Vec<&str> {
        self.filters.keys().map(|c| c.as_str()).collect()
    }

    pub fn selected_column(&self) -> Option<&str> {
        self.selected_column.as_deref()
    }

    pub fn hidden_columns(&self) -> &BTreeSet<String> {
        &self.hidden_columns
    }

    /// Schema columns minus hidden ones, in schema order
    pub fn visible_columns(&self) -> Vec<&str> {
        self.source
            .schema()
            .column_names()
            .into_iter()
            .filter(|c| !self.hidden_columns.contains(*c))
            .collect()
    }

    pub fn has_interacted(&self) -> bool {
        self.interacted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnType;
    use crate::dataset::Schema;
    use serde_json::json;

    fn sample() -> Arc<Dataset> {
        let schema = Schema::new(vec![
            ("country".to_string(), ColumnType::String),
            ("continent".to_string(), ColumnType::String),
            ("lifeExp".to_string(), ColumnType::Float64),
        ]);
        let rows = [
            ("Japan", "Asia", 82.6),
            ("France", "Europe", 80.7),
            ("Kenya", "Africa", 54.1),
            ("China", "Asia", 73.0),
            ("India", "Asia", 64.7),
        ];
        let records = rows
            .iter()
            .map(|(country, continent, life)| {
                Record::from_pairs([
                    ("country", ColumnValue::from(*country)),
                    ("continent", ColumnValue::from(*continent)),
                    ("lifeExp", ColumnValue::Float64(*life)),
                ])
            })
            .collect();
        Arc::new(Dataset::from_records("sample", schema, records))
    }

    fn countries(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get("country").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_unset_until_first_interaction() {
        let mut view = TableView::new(sample());
        assert!(view.derived_virtual_data().is_none());
        assert_eq!(view.visible_len(), 5);

        view.set_page(0);
        assert_eq!(view.derived_virtual_data().unwrap().len(), 5);
    }

    #[test]
    fn test_filter_then_sort() {
        let mut view = TableView::new(sample());
        assert_eq!(view.set_filter("continent", "Asia").unwrap(), FilterStatus::Applied);
        view.set_sort(vec![SortKey::descending("lifeExp")]).unwrap();

        let rows = view.derived_virtual_data().unwrap();
        assert_eq!(countries(&rows), vec!["Japan", "China", "India"]);
    }

    #[test]
    fn test_multi_column_sort_is_stable() {
        let mut view = TableView::new(sample());
        view.set_sort(vec![SortKey::ascending("continent"), SortKey::ascending("country")])
            .unwrap();
        let rows = view.derived_virtual_data().unwrap();
        assert_eq!(countries(&rows), vec!["Kenya", "China", "India", "Japan", "France"]);

        // Ties on the only key keep dataset order
        view.set_sort(vec![SortKey::ascending("continent")]).unwrap();
        let rows = view.derived_virtual_data().unwrap();
        assert_eq!(countries(&rows), vec!["Kenya", "Japan", "China", "India", "France"]);
    }

    #[test]
    fn test_single_sort_mode_keeps_last_key() {
        let mut view = TableView::new(sample()).with_sort_mode(SortMode::Single);
        view.set_sort(vec![SortKey::ascending("continent"), SortKey::ascending("lifeExp")])
            .unwrap();
        assert_eq!(view.sort_keys(), &[SortKey::ascending("lifeExp")]);
    }

    #[test]
    fn test_invalid_filter_leaves_rows_unchanged() {
        let mut view = TableView::new(sample());
        view.set_filter("lifeExp", "> 70").unwrap();
        assert_eq!(view.visible_len(), 3);

        let status = view.set_filter("lifeExp", "> (").unwrap();
        assert!(matches!(status, FilterStatus::Invalid(_)));
        assert_eq!(view.visible_len(), 3);
        assert!(view.invalid_filters().contains_key("lifeExp"));

        view.set_filter("lifeExp", "").unwrap();
        assert_eq!(view.visible_len(), 5);
        assert!(view.invalid_filters().is_empty());
    }

    #[test]
    fn test_deeply_nested_filter_is_invalid() {
        let mut view = TableView::new(sample());
        view.set_filter("continent", "Asia").unwrap();

        let expression = format!("{}Asia", "!".repeat(60_000));
        let status = view.set_filter("continent", &expression).unwrap();
        assert_eq!(status, FilterStatus::Invalid("Filter nested too deeply".to_string()));
        assert_eq!(view.visible_len(), 3);
        assert!(view.invalid_filters().contains_key("continent"));
    }

    #[test]
    fn test_filter_matching_nothing() {
        let mut view = TableView::new(sample());
        view.set_filter("continent", "Oceania").unwrap();
        assert_eq!(view.derived_virtual_data(), Some(Vec::new()));
        assert_eq!(view.page_count(), 1);
        assert!(view.page_rows().is_empty());
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut view = TableView::new(sample());
        assert!(view.set_filter("gdp", "> 1").is_err());
        assert!(view.set_sort(vec![SortKey::ascending("gdp")]).is_err());
        assert!(view.select_column(Some("gdp".to_string())).is_err());
    }

    #[test]
    fn test_pagination() {
        let mut view = TableView::new(sample()).with_page_size(2);
        assert_eq!(view.page_count(), 3);
        assert_eq!(view.page_current(), 0);

        view.set_page(2);
        let ids: Vec<usize> = view.page_rows().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![4]);

        // Virtual data ignores paging
        assert_eq!(view.derived_virtual_data().unwrap().len(), 5);
        assert_eq!(view.derived_viewport_data().len(), 1);

        view.set_page(99);
        assert_eq!(view.page_current(), 2);

        // Shrinking the row set pulls the page back into range
        view.set_filter("continent", "Europe").unwrap();
        assert_eq!(view.page_current(), 0);
    }

    #[test]
    fn test_edits_stay_local() {
        let dataset = sample();
        let mut view = TableView::new(dataset.clone());

        let stored = view.edit_cell(2, "continent", &json!("Asia")).unwrap();
        assert_eq!(stored, ColumnValue::from("Asia"));
        assert_eq!(view.record(2).unwrap().get("continent"), Some(&ColumnValue::from("Asia")));
        assert_eq!(dataset.get(2).unwrap().get("continent"), Some(&ColumnValue::from("Africa")));

        // Edited values take part in filtering
        view.set_filter("continent", "eq Asia").unwrap();
        assert_eq!(view.visible_len(), 4);

        // A second view on the same dataset sees the original
        let other = TableView::new(dataset);
        assert_eq!(other.record(2).unwrap().get("continent"), Some(&ColumnValue::from("Africa")));
    }

    #[test]
    fn test_bad_edits_are_errors() {
        let mut view = TableView::new(sample());
        assert!(view.edit_cell(99, "continent", &json!("Asia")).is_err());
        assert!(view.edit_cell(0, "lifeExp", &json!("old")).is_err());
        assert!(view.edit_cell(0, "gdp", &json!(1)).is_err());
    }

    #[test]
    fn test_hidden_columns() {
        let mut view = TableView::new(sample());
        view.set_column_hidden("lifeExp", true).unwrap();
        assert_eq!(view.visible_columns(), vec!["country", "continent"]);
        view.set_column_hidden("lifeExp", false).unwrap();
        assert_eq!(view.visible_columns().len(), 3);
    }

    #[test]
    fn test_nulls_sort_last() {
        let schema = Schema::new(vec![("v".to_string(), ColumnType::Int32)]);
        let records = vec![
            Record::from_pairs([("v", ColumnValue::Null)]),
            Record::from_pairs([("v", ColumnValue::Int32(2))]),
            Record::from_pairs([("v", ColumnValue::Int32(1))]),
        ];
        let mut view = TableView::new(Arc::new(Dataset::from_records("n", schema, records)));

        view.set_sort(vec![SortKey::ascending("v")]).unwrap();
        assert_eq!(view.visible_indices(), &[2, 1, 0]);
        view.set_sort(vec![SortKey::descending("v")]).unwrap();
        assert_eq!(view.visible_indices(), &[1, 2, 0]);
    }
}
