//! Data structures for layout computation.

use serde::Serialize;

/// Axis-aligned box, `x`/`y` at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Interiors intersect. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn overlap_area(&self, other: &Rect) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Table,
    Cluster,
}

/// Node id of a table group. `Schema::normalize` drops groups whose id is
/// also a table name.
pub fn cluster_node_id(group: &str) -> String {
    format!("group-{group}")
}

/// A positioned node. `x`/`y` are the top-left corner in the parent's
/// coordinate space: cluster-local for grouped tables, global otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    pub id: String,
    pub kind: NodeKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub parent: Option<String>,
}

impl LayoutNode {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Progress of the layout pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutStage {
    Uninitialized,
    IntraClusterSettled,
    TopLevelSettled,
    Finalized,
}

/// The complete layout result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// Cluster nodes first, then tables in declaration order.
    pub nodes: Vec<LayoutNode>,
    pub width: f64,
    pub height: f64,
    /// Seed the simulation ran with; feeding it back reproduces this layout.
    pub seed: u64,
}

impl Layout {
    pub fn empty(seed: u64) -> Self {
        Self {
            nodes: Vec::new(),
            width: 0.0,
            height: 0.0,
            seed,
        }
    }

    pub fn stage(&self) -> LayoutStage {
        LayoutStage::Finalized
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Box of `id` in global coordinates.
    pub fn absolute_rect(&self, id: &str) -> Option<Rect> {
        let node = self.node(id)?;
        let rect = node.rect();
        match &node.parent {
            Some(parent) => {
                let origin = self.node(parent)?;
                Some(rect.translate(origin.x, origin.y))
            }
            None => Some(rect),
        }
    }

    pub fn members<'a>(&'a self, cluster_id: &'a str) -> impl Iterator<Item = &'a LayoutNode> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parent.as_deref() == Some(cluster_id))
    }

    /// Nodes without a parent: clusters and standalone tables.
    pub fn top_level(&self) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }
}
