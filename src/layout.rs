//! Two-level force-directed layout.
//!
//! Tables inside a group are settled first, then groups and standalone
//! tables are settled against each other, and finally every group gets a
//! grid arrangement and a box that contains it.

mod engine;
mod finalize;
mod force;
mod intra;
mod top_level;
mod types;

pub use engine::{IntraClusterSettled, LayoutEngine, TopLevelSettled};
pub use intra::ClusterSketch;
pub use top_level::{TopKind, TopNode};
pub use types::{Layout, LayoutNode, LayoutStage, NodeKind, Rect, cluster_node_id};
