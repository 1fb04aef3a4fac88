//! Hover highlighting and drag overrides.
//!
//! `InteractionState` is a plain value: it is recomputed from scratch on
//! every hover event and compared by value, so leaving a node always yields
//! exactly the idle state again.

use crate::ast::Schema;
use crate::layout::cluster_node_id;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Edge id of the relationship at `index`.
pub fn edge_id(index: usize) -> String {
    format!("edge-{index}")
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "node", rename_all = "snake_case")]
pub enum Hover {
    #[default]
    Idle,
    Hovering(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionState {
    pub hover: Hover,
    pub highlighted_edges: BTreeSet<String>,
    /// Tables on the far end of a highlighted edge.
    pub highlighted_tables: BTreeSet<String>,
    /// Table -> columns taking part in a highlighted edge.
    pub highlighted_columns: BTreeMap<String, BTreeSet<String>>,
}

impl InteractionState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.hover == Hover::Idle
    }

    /// Reset, then highlight around `node_id` if it names a table.
    /// Groups and unknown ids leave the state idle.
    pub fn hover_enter(&mut self, schema: &Schema, node_id: &str) {
        *self = Self::idle();
        if schema.table(node_id).is_none() {
            debug!(node = node_id, "hover on non-table node, nothing to highlight");
            return;
        }

        for (i, rel) in schema.relationships.iter().enumerate() {
            if !rel.touches(node_id) {
                continue;
            }
            self.highlighted_edges.insert(edge_id(i));
            self.highlighted_columns
                .entry(rel.from_table.clone())
                .or_default()
                .insert(rel.from_column.clone());
            self.highlighted_columns
                .entry(rel.to_table.clone())
                .or_default()
                .insert(rel.to_column.clone());
            for table in [&rel.from_table, &rel.to_table] {
                if table != node_id {
                    self.highlighted_tables.insert(table.clone());
                }
            }
        }
        self.hover = Hover::Hovering(node_id.to_string());
    }

    pub fn hover_leave(&mut self) {
        *self = Self::idle();
    }

    /// Whether `node_id` stays at full opacity. Everything does while idle;
    /// otherwise the hovered table, its neighbors, and the groups holding
    /// any of them.
    pub fn is_related(&self, schema: &Schema, node_id: &str) -> bool {
        let Hover::Hovering(hovered) = &self.hover else {
            return true;
        };
        if node_id == hovered || self.highlighted_tables.contains(node_id) {
            return true;
        }
        std::iter::once(hovered)
            .chain(&self.highlighted_tables)
            .filter_map(|t| schema.group_of(t))
            .any(|g| cluster_node_id(&g.name) == node_id)
    }

    pub fn is_edge_highlighted(&self, edge_id: &str) -> bool {
        self.highlighted_edges.contains(edge_id)
    }

    pub fn is_column_highlighted(&self, table: &str, column: &str) -> bool {
        self.highlighted_columns
            .get(table)
            .is_some_and(|cols| cols.contains(column))
    }
}

/// Snap a coordinate to the nearest multiple of `grid`.
pub fn snap(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// Clamp a parent-local coordinate so a box of `size` stays within
/// `[0, extent]`. With a grid the upper bound is pulled inward onto it, so a
/// snapped value stays snapped.
pub fn confine(value: f64, size: f64, extent: f64, grid: f64) -> f64 {
    let mut hi = (extent - size).max(0.0);
    if grid > 0.0 {
        hi = (hi / grid).floor() * grid;
    }
    value.max(0.0).min(hi)
}

/// User-placed positions that override the computed layout. Coordinates are
/// in the node's parent space, like the layout itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DragOverrides {
    positions: BTreeMap<String, (f64, f64)>,
}

impl DragOverrides {
    pub fn get(&self, node_id: &str) -> Option<(f64, f64)> {
        self.positions.get(node_id).copied()
    }

    pub fn drag_move(&mut self, node_id: &str, x: f64, y: f64) {
        self.positions.insert(node_id.to_string(), (x, y));
    }

    /// Store the drop position snapped to `grid`; returns it.
    pub fn drag_end(&mut self, node_id: &str, x: f64, y: f64, grid: f64) -> (f64, f64) {
        let snapped = (snap(x, grid), snap(y, grid));
        self.positions.insert(node_id.to_string(), snapped);
        snapped
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}
