//! Renderer-facing output: positioned nodes and routed edges.

use crate::ast::{Column, Schema, Table, TableGroup};
use crate::layout::NodeKind;
use crate::routing::Side;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePayload {
    pub name: String,
    pub columns: Vec<Column>,
    pub header_color: String,
    pub note: Option<String>,
    /// Columns that take part in any relationship; renderers put handles
    /// only on these.
    pub columns_with_relations: Vec<String>,
}

impl TablePayload {
    pub fn new(table: &Table, schema: &Schema) -> Self {
        let related: BTreeSet<&str> = schema
            .relationships
            .iter()
            .flat_map(|r| {
                let from = (r.from_table == table.name).then_some(r.from_column.as_str());
                let to = (r.to_table == table.name).then_some(r.to_column.as_str());
                from.into_iter().chain(to)
            })
            .collect();

        Self {
            name: table.name.clone(),
            columns: table.columns.clone(),
            header_color: table.header_color.clone(),
            note: table.note.clone(),
            columns_with_relations: table
                .columns
                .iter()
                .filter(|c| related.contains(c.name.as_str()))
                .map(|c| c.name.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterPayload {
    pub name: String,
    pub color: String,
}

impl From<&TableGroup> for ClusterPayload {
    fn from(group: &TableGroup) -> Self {
        Self {
            name: group.name.clone(),
            color: group.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Table(TablePayload),
    Cluster(ClusterPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramNode {
    pub id: String,
    pub kind: NodeKind,
    /// Top-left corner in the parent's space; drag overrides applied.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub parent_id: Option<String>,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: String,
    pub source_id: String,
    pub source_column: String,
    pub source_side: Side,
    pub target_id: String,
    pub target_column: String,
    pub target_side: Side,
    pub cardinality_label: String,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
    pub width: f64,
    pub height: f64,
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_dbml;

    #[test]
    fn test_columns_with_relations() {
        let schema = parse_dbml(
            r#"
            Table users {
                id int [pk]
                email varchar
            }
            Table orders {
                id int [pk]
                user_id int [ref: > users.id]
                note text
            }
        "#,
        )
        .schema;
        let orders = TablePayload::new(schema.table("orders").unwrap(), &schema);
        assert_eq!(orders.columns_with_relations, vec!["user_id"]);
        let users = TablePayload::new(schema.table("users").unwrap(), &schema);
        assert_eq!(users.columns_with_relations, vec!["id"]);
        assert_eq!(users.columns.len(), 2);
    }

    #[test]
    fn test_payload_json_shape() {
        let payload = Payload::Cluster(ClusterPayload {
            name: "billing".into(),
            color: "#2ecc71".into(),
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "cluster");
        assert_eq!(json["color"], "#2ecc71");
    }
}
