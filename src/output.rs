//! Result rendering for the CLI: tables for humans, JSON for machines.

use comfy_table::Cell;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::cli_style::{create_table, status_cell};
use crate::fanout::NodeResults;
use crate::node::Node;
use crate::proxy::CallResult;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputMode {
    #[default]
    Table,
    Json,
}

/// Convert a payload for display
///
/// Humans get `-` for no value and `Yes`/`No` for booleans. In raw mode
/// values are passed through unchanged.
pub fn textualize(value: Option<&Value>, raw: bool) -> Value {
    match (value, raw) {
        (None, true) => Value::Null,
        (Some(value), true) => value.clone(),
        (None, false) | (Some(Value::Null), false) => Value::from("-"),
        (Some(Value::Bool(true)), false) => Value::from("Yes"),
        (Some(Value::Bool(false)), false) => Value::from("No"),
        (Some(value), false) => value.clone(),
    }
}

/// Render a textualized value into a single table cell
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One output row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub cluster: String,
    pub node: String,
    pub status: u16,
    pub result: Value,
}

impl ResultRow {
    pub fn new(node: &Arc<Node>, result: &CallResult, raw: bool) -> Self {
        Self {
            cluster: node.cluster.clone(),
            node: node.name.clone(),
            status: result.status,
            result: textualize(result.payload.as_ref(), raw),
        }
    }
}

/// Flatten fan-out results into rows, keeping their order
pub fn result_rows(results: &NodeResults, raw: bool) -> Vec<ResultRow> {
    results
        .iter()
        .map(|(node, result)| ResultRow::new(node, result, raw))
        .collect()
}

/// Render rows in the requested mode
pub fn render_rows(rows: &[ResultRow], mode: OutputMode) -> serde_json::Result<String> {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(rows),
        OutputMode::Table => {
            let mut table = create_table(&["Cluster", "Node", "Status", "Result"]);
            for row in rows {
                table.add_row(vec![
                    Cell::new(&row.cluster),
                    Cell::new(&row.node),
                    status_cell(row.status),
                    Cell::new(cell_text(&row.result)),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

/// Topology listing row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRow {
    pub cluster: String,
    pub node: String,
    pub host: String,
    pub scheme: String,
}

pub fn render_nodes(nodes: &[Arc<Node>], mode: OutputMode) -> serde_json::Result<String> {
    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|node| NodeRow {
            cluster: node.cluster.clone(),
            node: node.name.clone(),
            host: node.host.clone(),
            scheme: node.scheme.clone(),
        })
        .collect();

    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&rows),
        OutputMode::Table => {
            let mut table = create_table(&["Cluster", "Node", "Host"]);
            for row in &rows {
                table.add_row(vec![
                    row.cluster.clone(),
                    row.node.clone(),
                    format!("{}://{}", row.scheme, row.host),
                ]);
            }
            Ok(table.to_string())
        }
    }
}

/// Sanitize an error message for single-line display.
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<&str>>().join(" ")
}
