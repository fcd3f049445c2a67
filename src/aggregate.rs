/// Group-by-count aggregation behind the dashboard's bar chart.
///
/// Rows are bucketed by the exact value of one grouping column. Each bucket
/// reports its row count and its share of the rows that were grouped. The
/// result is a pure function of the input rows: nothing is cached or carried
/// over between calls.

use crate::dataset::{Dataset, Record};
use crate::error::AggregationError;
use std::collections::HashMap;

/// One bar's worth of data
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCount {
    pub category: String,
    pub count: usize,
    /// 100 × count / total rows grouped
    pub percentage: f64,
}

/// Grouped counts, largest group first. Groups with equal counts keep the
/// order in which their value first appeared in the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregationResult {
    groups: Vec<GroupCount>,
}

impl AggregationResult {
    pub fn groups(&self) -> &[GroupCount] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of rows that went into some group
    pub fn total(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// 100 for any non-empty result, up to floating-point rounding
    pub fn percentage_sum(&self) -> f64 {
        self.groups.iter().map(|g| g.percentage).sum()
    }

    /// `(category, count, percentage)` triples
    pub fn triples(&self) -> Vec<(&str, usize, f64)> {
        self.groups
            .iter()
            .map(|g| (g.category.as_str(), g.count, g.percentage))
            .collect()
    }
}

/// Group `rows` by `column`.
///
/// A row whose grouping value is Null is skipped: it forms no group and does
/// not count towards the total. A row with no value at all for `column` is a
/// data-shape error.
pub fn aggregate<'a, I>(rows: I, column: &str) -> Result<AggregationResult, AggregationError>
where
    I: IntoIterator<Item = &'a Record>,
{
    // Groups in first-seen order, with a lookup from category to slot
    let mut groups: Vec<(String, usize)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for (row, record) in rows.into_iter().enumerate() {
        let value = record.get(column).ok_or_else(|| AggregationError::MissingColumn {
            column: column.to_string(),
            row,
        })?;
        if value.is_null() {
            continue;
        }

        let category = value.to_string();
        match slots.get(&category) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                slots.insert(category.clone(), groups.len());
                groups.push((category, 1));
            }
        }
    }

    let total: usize = groups.iter().map(|(_, count)| count).sum();

    let mut groups: Vec<GroupCount> = groups
        .into_iter()
        .map(|(category, count)| GroupCount {
            category,
            count,
            percentage: 100.0 * count as f64 / total as f64,
        })
        .collect();
    // Stable: equal counts stay in first-seen order
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    Ok(AggregationResult { groups })
}

/// Aggregate the table's visible row set.
///
/// `visible` is `None` before the table has reported any rows; the full
/// dataset is used in that case.
pub fn aggregate_visible(
    visible: Option<&[Record]>,
    dataset: &Dataset,
    column: &str,
) -> Result<AggregationResult, AggregationError> {
    match visible {
        Some(rows) => aggregate(rows, column),
        None => aggregate(dataset.records(), column),
    }
}
