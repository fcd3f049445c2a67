/// One browser connection's dashboard: a private table view and the chart
/// bound to it.
///
/// Every table action goes through `handle`, which mutates the view, pushes
/// the new visible row set through the chart binding and answers with the
/// messages the client should apply. The session is transport-agnostic; the
/// WebSocket actor only moves text in and out.

use crate::binder::{chart_binding, Binding, ChartFrame};
use crate::context::DashboardContext;
use crate::dataset::Record;
use crate::messages::{ClientMessage, ColumnInfo, ServerMessage, SortSpec, TableRow};
use crate::view::{FilterStatus, SortKey, TableView};
use std::sync::Arc;

pub struct DashboardSession {
    ctx: Arc<DashboardContext>,
    view: TableView,
    chart: Binding<[Record], ChartFrame>,
}

impl DashboardSession {
    pub fn new(ctx: Arc<DashboardContext>) -> Self {
        let view = TableView::new(ctx.dataset.clone()).with_page_size(ctx.page_size);
        let chart = chart_binding(ctx.clone());
        DashboardSession { ctx, view, chart }
    }

    /// Initial render: the table's first page and the chart for the unset
    /// signal (the whole dataset).
    pub fn open(&mut self) -> Vec<ServerMessage> {
        self.refresh()
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    /// Latest chart frame, if the session has been opened
    pub fn chart(&self) -> Option<&ChartFrame> {
        self.chart.latest()
    }

    /// Parse and handle one text frame from the client
    pub fn handle_text(&mut self, text: &str) -> Vec<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.handle(msg),
            Err(e) => {
                log::debug!("Rejected client message: {}", e);
                vec![self.error_message("Invalid message format", &e.to_string())]
            }
        }
    }

    pub fn handle(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match self.apply(msg) {
            Ok(messages) => messages,
            Err(message) => vec![self.error_message("Request rejected", &message)],
        }
    }

    fn apply(&mut self, msg: ClientMessage) -> Result<Vec<ServerMessage>, String> {
        match msg {
            ClientMessage::Query => {
                if self.chart.latest().is_none() {
                    return Ok(self.refresh());
                }
                let mut messages = vec![self.table_state()];
                messages.extend(self.chart_message());
                Ok(messages)
            }

            ClientMessage::SetSort { sort_by } => {
                let keys: Vec<SortKey> = sort_by.into_iter().map(SortKey::from).collect();
                self.view.set_sort(keys)?;
                Ok(self.refresh())
            }

            ClientMessage::SetFilter { column, expression } => {
                if let FilterStatus::Invalid(reason) = self.view.set_filter(&column, &expression)? {
                    log::debug!("Filter on '{}' kept unchanged: {}", column, reason);
                }
                Ok(self.refresh())
            }

            ClientMessage::ClearFilters => {
                self.view.clear_filters();
                Ok(self.refresh())
            }

            ClientMessage::SetPage { page } => {
                self.view.set_page(page);
                Ok(self.refresh())
            }

            ClientMessage::EditCell { row_id, column, value } => {
                let stored = self.view.edit_cell(row_id, &column, &value)?;
                let mut messages = vec![ServerMessage::CellEdited {
                    row_id,
                    column,
                    value: stored.to_json(),
                }];
                messages.extend(self.refresh());
                Ok(messages)
            }

            ClientMessage::SelectColumn { column } => {
                self.view.select_column(column)?;
                Ok(vec![self.table_state()])
            }

            ClientMessage::SetColumnHidden { column, hidden } => {
                self.view.set_column_hidden(&column, hidden)?;
                Ok(vec![self.table_state()])
            }
        }
    }

    /// Re-emit the visible row set and report the table and the new chart
    fn refresh(&mut self) -> Vec<ServerMessage> {
        let visible = self.view.derived_virtual_data();
        self.chart.emit(visible.as_deref());

        let mut messages = vec![self.table_state()];
        messages.extend(self.chart_message());
        messages
    }

    fn chart_message(&self) -> Option<ServerMessage> {
        self.chart
            .latest()
            .map(|frame| ServerMessage::chart(self.chart.generation(), frame))
    }

    fn table_state(&self) -> ServerMessage {
        let schema = self.view.dataset().schema();
        let names = self.view.visible_columns();

        let columns = names
            .iter()
            .filter_map(|name| {
                schema.get_column_type(name).map(|t| ColumnInfo {
                    name: name.to_string(),
                    kind: t.wire_kind(),
                })
            })
            .collect();

        let rows = self
            .view
            .page_rows()
            .into_iter()
            .map(|(row_id, record)| TableRow {
                row_id,
                values: record.to_json(&names),
            })
            .collect();

        ServerMessage::TableState {
            columns,
            rows,
            page_current: self.view.page_current(),
            page_count: self.view.page_count(),
            page_size: self.view.page_size(),
            total_rows: self.view.dataset().len(),
            visible_rows: self.view.visible_len(),
            sort_by: self.view.sort_keys().iter().map(SortSpec::from).collect(),
            filters: self
                .view
                .active_filter_columns()
                .into_iter()
                .map(String::from)
                .collect(),
            invalid_filters: self.view.invalid_filters().clone(),
            selected_column: self.view.selected_column().map(String::from),
            hidden_columns: self.view.hidden_columns().iter().cloned().collect(),
        }
    }

    /// Detailed error text only in debug mode
    fn error_message(&self, summary: &str, detail: &str) -> ServerMessage {
        if self.ctx.debug {
            ServerMessage::error(format!("{}: {}", summary, detail))
        } else {
            ServerMessage::error(summary)
        }
    }
}
