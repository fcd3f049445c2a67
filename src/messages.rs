/// WebSocket message types for client-server communication
use crate::binder::ChartFrame;
use crate::chart::Bar;
use crate::view::{SortKey, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Sort direction as the client spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One entry of the table's `sort_by` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column_id: String,
    pub direction: SortDirection,
}

impl From<SortSpec> for SortKey {
    fn from(spec: SortSpec) -> Self {
        match spec.direction {
            SortDirection::Asc => SortKey::ascending(spec.column_id),
            SortDirection::Desc => SortKey::descending(spec.column_id),
        }
    }
}

impl From<&SortKey> for SortSpec {
    fn from(key: &SortKey) -> Self {
        SortSpec {
            column_id: key.column.clone(),
            direction: match key.order {
                SortOrder::Ascending => SortDirection::Asc,
                SortOrder::Descending => SortDirection::Desc,
            },
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Request the current table page and chart
    Query,

    /// Replace the sort keys, most significant first
    SetSort { sort_by: Vec<SortSpec> },

    /// Set one column's filter text; empty text clears it
    SetFilter { column: String, expression: String },

    /// Remove every column filter
    ClearFilters,

    /// Move to a page (0-based)
    SetPage { page: usize },

    /// Edit one cell of this session's copy of the table
    EditCell {
        row_id: usize,
        column: String,
        value: JsonValue,
    },

    /// Highlight a single column, or clear with `null`
    SelectColumn { column: Option<String> },

    /// Hide or show a column
    SetColumnHidden { column: String, hidden: bool },
}

/// Column name and its value kind (`numeric`, `text` or `boolean`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: &'static str,
}

/// A table row on the wire, tagged with its dataset row id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub row_id: usize,
    pub values: serde_json::Map<String, JsonValue>,
}

/// Messages sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The current page and everything the table needs to draw itself
    TableState {
        columns: Vec<ColumnInfo>,
        rows: Vec<TableRow>,
        page_current: usize,
        page_count: usize,
        page_size: usize,
        total_rows: usize,
        visible_rows: usize,
        sort_by: Vec<SortSpec>,
        filters: Vec<String>,
        invalid_filters: BTreeMap<String, String>,
        selected_column: Option<String>,
        hidden_columns: Vec<String>,
    },

    /// A freshly rendered chart, replacing the previous one
    Chart {
        generation: u64,
        title: String,
        x_title: String,
        y_title: String,
        bars: Vec<Bar>,
        svg: Option<String>,
    },

    /// A cell edit was stored
    CellEdited {
        row_id: usize,
        column: String,
        value: JsonValue,
    },

    /// Error occurred
    Error { message: String },
}

impl ServerMessage {
    pub fn chart(generation: u64, frame: &ChartFrame) -> Self {
        ServerMessage::Chart {
            generation,
            title: frame.chart.title.clone(),
            x_title: frame.chart.x_title.clone(),
            y_title: frame.chart.y_title.clone(),
            bars: frame.chart.bars.clone(),
            svg: frame.svg.clone(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"Query"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Query));

        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "SetSort",
            "sort_by": [
                {"column_id": "continent", "direction": "asc"},
                {"column_id": "pop", "direction": "desc"}
            ]
        }))
        .unwrap();
        let ClientMessage::SetSort { sort_by } = msg else {
            panic!("expected SetSort");
        };
        let keys: Vec<SortKey> = sort_by.into_iter().map(SortKey::from).collect();
        assert_eq!(keys, vec![SortKey::ascending("continent"), SortKey::descending("pop")]);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"SelectColumn","column":null}"#).unwrap();
        assert!(matches!(msg, ClientMessage::SelectColumn { column: None }));
    }

    #[test]
    fn test_unknown_message_is_rejected() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"DropTable"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"SetPage","page":-1}"#).is_err());
    }

    #[test]
    fn test_server_message_tagging() {
        let value = serde_json::to_value(ServerMessage::error("boom")).unwrap();
        assert_eq!(value, json!({"type": "Error", "message": "boom"}));

        let spec = SortSpec::from(&SortKey::descending("year"));
        assert_eq!(
            serde_json::to_value(spec).unwrap(),
            json!({"column_id": "year", "direction": "desc"})
        );
    }
}
