/// GapDash - Interactive Table and Chart Dashboard
///
/// Serves an editable, sortable, filterable and paginated table of the
/// gapminder dataset next to a bar chart of the table's visible rows grouped
/// by continent. Table state lives on the server, one session per browser
/// connection; every table action re-aggregates the visible rows and
/// re-renders the chart.

pub mod column;
pub mod dataset;
pub mod expr;
pub mod view;
pub mod aggregate;
pub mod chart;
pub mod binder;
pub mod config;
pub mod context;
pub mod error;
pub mod messages;
pub mod session;

pub use column::{ColumnType, ColumnValue};
pub use dataset::{Dataset, Record, Schema};
pub use expr::{parse_filter, FilterExpr, FilterOp};
pub use view::{FilterStatus, SortKey, SortMode, SortOrder, TableView};
pub use aggregate::{aggregate, aggregate_visible, AggregationResult, GroupCount};
pub use chart::{BarChart, ChartOptions};
pub use binder::{chart_binding, Binding, ChartFrame};
pub use config::Config;
pub use context::DashboardContext;
pub use error::{AggregationError, ChartError, ConfigError, DatasetError};
pub use session::DashboardSession;

// WebSocket server modules - only when server feature is enabled
#[cfg(feature = "server")]
pub mod websocket;
#[cfg(feature = "server")]
pub mod server;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::messages::{ClientMessage, ServerMessage};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn gapminder() -> Arc<Dataset> {
        Arc::new(Dataset::bundled().unwrap())
    }

    fn continents(rows: &[Record]) -> HashSet<String> {
        rows.iter()
            .filter_map(|r| r.get("continent"))
            .map(|v| v.to_string())
            .collect()
    }

    #[test]
    fn test_complete_workflow() {
        let dataset = gapminder();
        let mut view = TableView::new(dataset.clone());

        // Nothing touched yet: the chart sees the whole dataset
        assert!(view.derived_virtual_data().is_none());
        let full = aggregate_visible(None, &dataset, "continent").unwrap();
        assert_eq!(
            full.triples().iter().map(|(c, n, _)| (*c, *n)).collect::<Vec<_>>(),
            vec![("Asia", 60), ("Europe", 48), ("Africa", 48), ("Americas", 36), ("Oceania", 24)]
        );

        // Filter, sort and page the way a user would
        view.set_filter("year", ">= 2000").unwrap();
        view.set_filter("lifeExp", "> 70").unwrap();
        view.set_sort(vec![SortKey::descending("pop")]).unwrap();
        view.set_page(0);

        let visible = view.derived_virtual_data().unwrap();
        assert!(!visible.is_empty());
        assert!(visible.len() > view.page_rows().len() || view.page_count() == 1);
        assert!(visible.iter().all(|r| {
            r.get("year").and_then(|v| v.as_i64()).is_some_and(|y| y >= 2000)
                && r.get("lifeExp").and_then(|v| v.as_f64()).is_some_and(|e| e > 70.0)
        }));

        let pops: Vec<f64> = visible
            .iter()
            .filter_map(|r| r.get("pop").and_then(|v| v.as_f64()))
            .collect();
        assert!(pops.windows(2).all(|w| w[0] >= w[1]));

        let result = aggregate(&visible, "continent").unwrap();
        assert_eq!(result.total(), visible.len());
        assert!((result.percentage_sum() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_percentages_sum_to_100_for_nonempty_sets() {
        let dataset = gapminder();
        let records = dataset.records();
        for size in [1, 2, 7, 13, 50, records.len()] {
            for start in [0, 5, 100] {
                let end = (start + size).min(records.len());
                let rows = &records[start.min(end)..end];
                if rows.is_empty() {
                    continue;
                }
                let result = aggregate(rows, "continent").unwrap();
                assert!(
                    (result.percentage_sum() - 100.0).abs() < 0.01,
                    "rows {}..{} summed to {}",
                    start,
                    end,
                    result.percentage_sum()
                );
            }
        }
    }

    #[test]
    fn test_one_group_per_distinct_value() {
        let dataset = gapminder();
        for column in ["continent", "country", "year"] {
            let result = aggregate(dataset.records(), column).unwrap();
            let distinct: HashSet<String> = dataset
                .records()
                .iter()
                .filter_map(|r| r.get(column))
                .map(|v| v.to_string())
                .collect();
            assert_eq!(result.len(), distinct.len(), "column {}", column);
        }

        let rows = &dataset.records()[..30];
        assert_eq!(aggregate(rows, "continent").unwrap().len(), continents(rows).len());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let dataset = gapminder();
        let rows = &dataset.records()[17..141];
        let first = aggregate(rows, "continent").unwrap();
        let second = aggregate(rows, "continent").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_row_set() {
        let none: &[Record] = &[];
        let result = aggregate(none, "continent").unwrap();
        assert!(result.is_empty());

        let chart = BarChart::from_aggregation(&result, &ChartOptions::default());
        assert!(chart.is_empty());
        assert!(chart.render_svg(480, 450).is_ok());
    }

    #[test]
    fn test_unset_signal_equals_full_dataset() {
        let dataset = gapminder();
        let unset = aggregate_visible(None, &dataset, "continent").unwrap();
        let explicit = aggregate_visible(Some(dataset.records()), &dataset, "continent").unwrap();
        assert_eq!(unset, explicit);
    }

    #[test]
    fn test_five_row_scenarios() {
        let schema = Schema::new(vec![("continent".to_string(), ColumnType::String)]);
        let records: Vec<Record> = ["Asia", "Asia", "Europe", "Africa", "Asia"]
            .iter()
            .map(|c| Record::from_pairs([("continent", *c)]))
            .collect();
        let dataset = Arc::new(Dataset::from_records("five", schema, records));

        let result = aggregate(dataset.records(), "continent").unwrap();
        assert_eq!(
            result.triples(),
            vec![("Asia", 3, 60.0), ("Europe", 1, 20.0), ("Africa", 1, 20.0)]
        );

        let mut view = TableView::new(dataset.clone());
        assert_eq!(
            view.set_filter("continent", "!= Asia").unwrap(),
            FilterStatus::Applied
        );
        let visible = view.derived_virtual_data().unwrap();
        assert_eq!(
            aggregate(&visible, "continent").unwrap().triples(),
            vec![("Europe", 1, 50.0), ("Africa", 1, 50.0)]
        );

        view.set_filter("continent", "eq Oceania").unwrap();
        let visible = view.derived_virtual_data().unwrap();
        assert!(visible.is_empty());
        let chart = BarChart::from_aggregation(
            &aggregate(&visible, "continent").unwrap(),
            &ChartOptions::default(),
        );
        assert_eq!(chart.bars.len(), 0);
    }

    #[test]
    fn test_session_over_bundled_dataset() {
        let ctx = Arc::new(DashboardContext::load(&Config::default()).unwrap());
        let mut session = DashboardSession::new(ctx);
        session.open();

        let messages = session.handle(ClientMessage::SetFilter {
            column: "continent".to_string(),
            expression: "Americas || Oceania".to_string(),
        });

        let Some(ServerMessage::TableState { visible_rows, rows, page_count, .. }) = messages.first() else {
            panic!("expected table state");
        };
        assert_eq!(*visible_rows, 60);
        assert_eq!(rows.len(), 20);
        assert_eq!(*page_count, 3);

        let Some(ServerMessage::Chart { bars, svg, .. }) = messages.last() else {
            panic!("expected chart");
        };
        let labels: Vec<(&str, &str)> = bars
            .iter()
            .map(|b| (b.category.as_str(), b.label.as_str()))
            .collect();
        assert_eq!(labels, vec![("Americas", "60.0%"), ("Oceania", "40.0%")]);
        assert!(svg.as_deref().is_some_and(|s| s.contains("60.0%")));
    }
}
