//! Single owner of the loaded schema, its layout and the interaction state.
//!
//! Loading is split in two so callers can compute off the event path: take a
//! ticket with [`DiagramController::begin_load`], prepare the diagram, then
//! [`DiagramController::commit`] it. Only the newest ticket may commit; older
//! results are dropped and the current diagram stays.

use crate::ast::Schema;
use crate::config::{Config, InteractionConfig};
use crate::diagram::{ClusterPayload, Diagram, DiagramEdge, DiagramNode, Payload, TablePayload};
use crate::import::{self, ImportError};
use crate::interaction::{DragOverrides, InteractionState, confine, edge_id, snap};
use crate::layout::{Layout, LayoutEngine, LayoutStage, NodeKind, cluster_node_id};
use crate::parser::parse_dbml;
use crate::routing::attachment_sides;
use tracing::{debug, info};

/// Generation number of a requested load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// A parsed and laid out schema waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDiagram {
    pub schema: Schema,
    pub layout: Layout,
    /// Human-readable parse and import problems.
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
pub struct DiagramController {
    engine: LayoutEngine,
    interaction_config: InteractionConfig,
    issued: u64,
    current: Option<LoadedDiagram>,
    interaction: InteractionState,
    drags: DragOverrides,
}

impl DiagramController {
    pub fn new(config: Config) -> Self {
        Self {
            engine: LayoutEngine::new(config.layout),
            interaction_config: config.interaction,
            ..Self::default()
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Parse DBML and lay it out. Does not touch the current diagram.
    pub fn prepare_source(&self, source: &str) -> LoadedDiagram {
        let outcome = parse_dbml(source);
        let warnings = outcome.warnings.iter().map(ToString::to_string).collect();
        self.prepare_schema(outcome.schema, warnings)
    }

    /// Import the JSON database object and lay it out.
    pub fn prepare_database(&self, json: &str) -> Result<LoadedDiagram, ImportError> {
        let (schema, issues) = import::from_json_str(json)?;
        let warnings = issues.iter().map(ToString::to_string).collect();
        Ok(self.prepare_schema(schema, warnings))
    }

    /// Lay out an already normalized schema.
    pub fn prepare_schema(&self, schema: Schema, warnings: Vec<String>) -> LoadedDiagram {
        let layout = self.engine.layout(&schema);
        LoadedDiagram {
            schema,
            layout,
            warnings,
        }
    }

    /// Swap in `loaded` if `ticket` is the newest one issued. Resets hover
    /// and drag state on success.
    pub fn commit(&mut self, ticket: LoadTicket, loaded: LoadedDiagram) -> bool {
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale load"
            );
            return false;
        }
        info!(
            tables = loaded.schema.tables.len(),
            relationships = loaded.schema.relationships.len(),
            groups = loaded.schema.groups.len(),
            warnings = loaded.warnings.len(),
            seed = loaded.layout.seed,
            "diagram loaded"
        );
        self.current = Some(loaded);
        self.interaction = InteractionState::idle();
        self.drags.clear();
        true
    }

    pub fn load_source(&mut self, source: &str) {
        let ticket = self.begin_load();
        let loaded = self.prepare_source(source);
        self.commit(ticket, loaded);
    }

    /// A JSON error leaves the current diagram and any pending ticket alone.
    pub fn load_database_json(&mut self, json: &str) -> Result<(), ImportError> {
        let loaded = self.prepare_database(json)?;
        let ticket = self.begin_load();
        self.commit(ticket, loaded);
        Ok(())
    }

    pub fn stage(&self) -> LayoutStage {
        match &self.current {
            Some(loaded) => loaded.layout.stage(),
            None => LayoutStage::Uninitialized,
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.current.as_ref().map(|l| &l.schema)
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.current.as_ref().map(|l| &l.layout)
    }

    pub fn warnings(&self) -> &[String] {
        self.current
            .as_ref()
            .map(|l| l.warnings.as_slice())
            .unwrap_or_default()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn hover_enter(&mut self, node_id: &str) {
        match &self.current {
            Some(loaded) => self.interaction.hover_enter(&loaded.schema, node_id),
            None => self.interaction.hover_leave(),
        }
    }

    pub fn hover_leave(&mut self) {
        self.interaction.hover_leave();
    }

    pub fn is_related(&self, node_id: &str) -> bool {
        match &self.current {
            Some(loaded) => self.interaction.is_related(&loaded.schema, node_id),
            None => true,
        }
    }

    /// Group members stay inside their group box.
    pub fn drag_move(&mut self, node_id: &str, x: f64, y: f64) {
        if self.knows(node_id) {
            let (x, y) = self.confined(node_id, x, y, 0.0);
            self.drags.drag_move(node_id, x, y);
        }
    }

    /// Store the snapped drop position, kept inside the group box for
    /// members. `None` for unknown nodes.
    pub fn drag_end(&mut self, node_id: &str, x: f64, y: f64) -> Option<(f64, f64)> {
        if !self.knows(node_id) {
            return None;
        }
        let grid = self.interaction_config.grid_size;
        let (x, y) = self.confined(node_id, snap(x, grid), snap(y, grid), grid);
        Some(self.drags.drag_end(node_id, x, y, grid))
    }

    fn confined(&self, node_id: &str, x: f64, y: f64, grid: f64) -> (f64, f64) {
        let Some(layout) = self.layout() else {
            return (x, y);
        };
        let Some(node) = layout.node(node_id) else {
            return (x, y);
        };
        match node.parent.as_deref().and_then(|p| layout.node(p)) {
            Some(parent) => (
                confine(x, node.width, parent.width, grid),
                confine(y, node.height, parent.height, grid),
            ),
            None => (x, y),
        }
    }

    fn knows(&self, node_id: &str) -> bool {
        let known = self
            .layout()
            .is_some_and(|layout| layout.node(node_id).is_some());
        if !known {
            debug!(node = node_id, "ignoring drag on unknown node");
        }
        known
    }

    /// Parent-space position with any drag override applied.
    fn position(&self, layout: &Layout, node_id: &str) -> Option<(f64, f64)> {
        let node = layout.node(node_id)?;
        Some(self.drags.get(node_id).unwrap_or((node.x, node.y)))
    }

    /// Global position: parent origin plus local position.
    fn absolute_position(&self, layout: &Layout, node_id: &str) -> Option<(f64, f64)> {
        let node = layout.node(node_id)?;
        let (x, y) = self.position(layout, node_id)?;
        match &node.parent {
            Some(parent) => {
                let (px, py) = self.position(layout, parent)?;
                Some((px + x, py + y))
            }
            None => Some((x, y)),
        }
    }

    /// Clusters first, then tables in declaration order.
    pub fn nodes(&self) -> Vec<DiagramNode> {
        let Some(loaded) = &self.current else {
            return Vec::new();
        };
        let schema = &loaded.schema;

        loaded
            .layout
            .nodes
            .iter()
            .filter_map(|node| {
                let payload = match node.kind {
                    NodeKind::Table => {
                        Payload::Table(TablePayload::new(schema.table(&node.id)?, schema))
                    }
                    NodeKind::Cluster => Payload::Cluster(ClusterPayload::from(
                        schema
                            .groups
                            .iter()
                            .find(|g| cluster_node_id(&g.name) == node.id)?,
                    )),
                };
                let (x, y) = self.drags.get(&node.id).unwrap_or((node.x, node.y));
                Some(DiagramNode {
                    id: node.id.clone(),
                    kind: node.kind,
                    x,
                    y,
                    width: node.width,
                    height: node.height,
                    parent_id: node.parent.clone(),
                    payload,
                })
            })
            .collect()
    }

    /// One edge per relationship, sides chosen from current positions.
    pub fn edges(&self) -> Vec<DiagramEdge> {
        let Some(loaded) = &self.current else {
            return Vec::new();
        };
        let layout = &loaded.layout;

        loaded
            .schema
            .relationships
            .iter()
            .enumerate()
            .filter_map(|(i, rel)| {
                let (ax, _) = self.absolute_position(layout, &rel.from_table)?;
                let (bx, _) = self.absolute_position(layout, &rel.to_table)?;
                let (source_side, target_side) = attachment_sides(ax, bx);
                Some(DiagramEdge {
                    id: edge_id(i),
                    source_id: rel.from_table.clone(),
                    source_column: rel.from_column.clone(),
                    source_side,
                    target_id: rel.to_table.clone(),
                    target_column: rel.to_column.clone(),
                    target_side,
                    cardinality_label: rel.cardinality.label().to_string(),
                })
            })
            .collect()
    }

    pub fn diagram(&self) -> Diagram {
        let (width, height, seed) = self
            .layout()
            .map_or((0.0, 0.0, 0), |l| (l.width, l.height, l.seed));
        Diagram {
            nodes: self.nodes(),
            edges: self.edges(),
            width,
            height,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::interaction::Hover;
    use crate::layout::Rect;
    use crate::routing::Side;

    fn controller() -> DiagramController {
        DiagramController::new(Config {
            layout: LayoutConfig {
                seed: Some(17),
                top_ticks: 400,
                ..LayoutConfig::default()
            },
            ..Config::default()
        })
    }

    const SHOP: &str = r#"
        Table users {
            id int [pk]
            email varchar
        }
        Table orders {
            id int [pk]
            user_id int [ref: > users.id]
        }
    "#;

    const BILLING: &str = r#"
        Table invoices { id int [pk] }
        Table payments {
            id int [pk]
            invoice_id int [ref: > invoices.id]
        }
        TableGroup billing { invoices payments }
        Table customers { id int [pk] }
    "#;

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.stage(), LayoutStage::Uninitialized);
        assert!(c.nodes().is_empty());
        assert!(c.edges().is_empty());
        assert!(c.is_related("anything"));
    }

    #[test]
    fn test_load_source() {
        let mut c = controller();
        c.load_source(SHOP);
        assert_eq!(c.stage(), LayoutStage::Finalized);
        let nodes = c.nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.parent_id.is_none()));
        let edges = c.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].id, "edge-0");
        assert_eq!(edges[0].source_id, "orders");
        assert_eq!(edges[0].target_column, "id");
        assert_eq!(edges[0].cardinality_label, "(n) -> (1)");
    }

    #[test]
    fn test_clusters_emitted_first() {
        let mut c = controller();
        c.load_source(BILLING);
        let ids: Vec<String> = c.nodes().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["group-billing", "invoices", "payments", "customers"]);
        let nodes = c.nodes();
        assert_eq!(nodes[1].parent_id.as_deref(), Some("group-billing"));
        assert!(matches!(&nodes[0].payload, Payload::Cluster(p) if p.name == "billing"));
    }

    #[test]
    fn test_stale_commit_discarded() {
        let mut c = controller();
        let old = c.begin_load();
        let old_diagram = c.prepare_source(SHOP);
        let new = c.begin_load();
        let new_diagram = c.prepare_source(BILLING);

        assert!(c.commit(new, new_diagram));
        assert!(!c.commit(old, old_diagram));
        assert!(c.schema().unwrap().table("payments").is_some());
        assert!(c.schema().unwrap().table("users").is_none());
    }

    #[test]
    fn test_commit_resets_interaction() {
        let mut c = controller();
        c.load_source(SHOP);
        c.hover_enter("orders");
        c.drag_move("users", 10.0, 10.0);
        c.load_source(SHOP);
        assert_eq!(c.interaction(), &InteractionState::idle());
        let users = c.layout().unwrap().node("users").unwrap().clone();
        let node = c.nodes().into_iter().find(|n| n.id == "users").unwrap();
        assert_eq!((node.x, node.y), (users.x, users.y));
    }

    #[test]
    fn test_hover_through_controller() {
        let mut c = controller();
        c.load_source(SHOP);
        c.hover_enter("orders");
        assert_eq!(c.interaction().hover, Hover::Hovering("orders".into()));
        assert!(c.is_related("users"));
        c.hover_leave();
        assert_eq!(c.interaction(), &InteractionState::idle());
    }

    #[test]
    fn test_drag_end_snaps_and_unknown_ignored() {
        let mut c = controller();
        c.load_source(SHOP);
        let layout_before = c.layout().unwrap().clone();
        assert_eq!(c.drag_end("users", 133.0, 47.0), Some((140.0, 40.0)));
        let users = c.nodes().into_iter().find(|n| n.id == "users").unwrap();
        assert_eq!((users.x, users.y), (140.0, 40.0));
        // No re-layout.
        assert_eq!(c.layout().unwrap(), &layout_before);

        assert_eq!(c.drag_end("ghost", 1.0, 1.0), None);
        c.drag_move("ghost", 1.0, 1.0);
        assert!(c.nodes().iter().all(|n| n.id != "ghost"));
    }

    #[test]
    fn test_member_drag_stays_in_group() {
        let mut c = controller();
        c.load_source(BILLING);
        let group = c.layout().unwrap().node("group-billing").unwrap().clone();
        let local_box = Rect::new(0.0, 0.0, group.width, group.height);

        let (x, y) = c.drag_end("invoices", 5000.0, 5000.0).unwrap();
        assert_eq!((x % 20.0, y % 20.0), (0.0, 0.0));
        let node = c.nodes().into_iter().find(|n| n.id == "invoices").unwrap();
        assert_eq!((node.x, node.y), (x, y));
        assert!(local_box.contains(&Rect::new(node.x, node.y, node.width, node.height)));

        c.drag_move("payments", -300.0, -300.0);
        let node = c.nodes().into_iter().find(|n| n.id == "payments").unwrap();
        assert_eq!((node.x, node.y), (0.0, 0.0));

        // Top-level nodes move freely.
        assert_eq!(c.drag_end("customers", 5000.0, 5000.0), Some((5000.0, 5000.0)));
    }

    #[test]
    fn test_routing_follows_drag() {
        let mut c = controller();
        c.load_source(SHOP);
        c.drag_end("orders", 0.0, 0.0);
        c.drag_end("users", 2000.0, 0.0);
        let edge = &c.edges()[0];
        assert_eq!((edge.source_side, edge.target_side), (Side::Right, Side::Left));

        c.drag_end("orders", 4000.0, 0.0);
        let edge = &c.edges()[0];
        assert_eq!((edge.source_side, edge.target_side), (Side::Left, Side::Right));
    }

    #[test]
    fn test_routing_uses_cluster_origin() {
        let mut c = controller();
        c.load_source(
            r#"
            Table a { id int [pk] }
            Table b { a_id int [ref: > a.id] }
            TableGroup g { b }
        "#,
        );
        // b sits at a local x of a few hundred; moving the group far left puts
        // it left of a in global terms.
        c.drag_end("a", 10000.0, 0.0);
        c.drag_end("group-g", 0.0, 0.0);
        let edge = &c.edges()[0];
        assert_eq!(edge.source_id, "b");
        assert_eq!(edge.source_side, Side::Right);

        c.drag_end("group-g", 20000.0, 0.0);
        let edge = &c.edges()[0];
        assert_eq!(edge.source_side, Side::Left);
    }

    #[test]
    fn test_load_database_json() {
        let mut c = controller();
        let json = r#"{
            "schemas": [{
                "tables": [
                    {"name": "users", "fields": [{"name": "id", "type": {"type_name": "int"}, "pk": true}]},
                    {"name": "orders", "fields": [{"name": "user_id", "type": {"type_name": "int"}}]}
                ],
                "refs": [{"endpoints": [
                    {"tableName": "orders", "fieldNames": ["user_id"], "relation": "*"},
                    {"tableName": "users", "fieldNames": ["id"], "relation": "1"}
                ]}]
            }]
        }"#;
        c.load_database_json(json).unwrap();
        assert_eq!(c.nodes().len(), 2);
        assert_eq!(c.edges()[0].cardinality_label, "(n) -> (1)");
        assert!(c.load_database_json("not json").is_err());
        // A failed import keeps the previous diagram.
        assert_eq!(c.nodes().len(), 2);
    }

    #[test]
    fn test_failed_import_keeps_pending_ticket() {
        let mut c = controller();
        let ticket = c.begin_load();
        let loaded = c.prepare_source(SHOP);
        assert!(c.load_database_json("{ broken").is_err());
        assert!(c.commit(ticket, loaded));
        assert_eq!(c.nodes().len(), 2);
    }

    #[test]
    fn test_warnings_reported() {
        let mut c = controller();
        c.load_source("Table a {\n id int\n}\nRef: a.id > missing.id\n???\n");
        assert_eq!(c.nodes().len(), 1);
        assert!(c.edges().is_empty());
        assert_eq!(c.warnings().len(), 2);
        assert!(c.warnings().iter().any(|w| w.starts_with("line 5")));
    }
}
