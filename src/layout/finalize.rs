//! Stage 3: final group boxes and global placement.
//!
//! Members of a group are laid out on a centered, row-major grid in
//! declaration order; the group box is sized to fit and keeps the center
//! Stage 2 gave it. A separation sweep then pushes apart any top-level boxes
//! that still overlap, and the whole diagram is moved to start at the origin.

use super::top_level::{TopKind, TopNode, grid_columns};
use super::types::{Layout, LayoutNode, NodeKind, Rect, cluster_node_id};
use crate::cluster::Partition;
use crate::config::LayoutConfig;
use crate::graph::Adjacency;
use tracing::{debug, warn};

const EPSILON: f64 = 1e-6;

/// Member boxes of one group in group-local coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPlacement {
    pub width: f64,
    pub height: f64,
    /// Top-left corner of each member, in member order.
    pub positions: Vec<(f64, f64)>,
}

pub fn grid_placement(sizes: &[(f64, f64)], config: &LayoutConfig) -> GridPlacement {
    let pad = config.group_padding;
    let per_row = grid_columns(sizes.len());
    let cell_w = sizes.iter().map(|s| s.0).fold(0.0, f64::max);

    let inner_w = per_row as f64 * cell_w + (per_row as f64 - 1.0) * pad;
    let width = (inner_w + 2.0 * pad).max(config.group_min_width) + config.group_safety_margin;

    let mut positions = Vec::with_capacity(sizes.len());
    let mut y = pad + config.group_header_height;
    for row in sizes.chunks(per_row) {
        let row_w = row.len() as f64 * cell_w + (row.len() as f64 - 1.0) * pad;
        let start_x = (width - row_w) / 2.0;
        let row_h = row.iter().map(|s| s.1).fold(0.0, f64::max);
        for (col, &(w, _)) in row.iter().enumerate() {
            let x = start_x + col as f64 * (cell_w + pad) + (cell_w - w) / 2.0;
            positions.push((x, y));
        }
        y += row_h + pad;
    }

    let content_bottom = y - pad;
    let height =
        (content_bottom + pad).max(config.group_min_height) + config.group_safety_margin;

    GridPlacement {
        width,
        height,
        positions,
    }
}

/// Push apart boxes closer than `gap`, along the axis of least penetration.
/// Returns false if overlaps remain after `passes` sweeps.
pub fn separate(rects: &mut [Rect], gap: f64, passes: usize) -> bool {
    for _ in 0..passes {
        let mut moved = false;
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                let (a, b) = (rects[i], rects[j]);
                let ox = a.right().min(b.right()) - a.x.max(b.x) + gap;
                let oy = a.bottom().min(b.bottom()) - a.y.max(b.y) + gap;
                if ox <= EPSILON || oy <= EPSILON {
                    continue;
                }
                moved = true;
                let ((acx, acy), (bcx, bcy)) = (a.center(), b.center());
                if ox <= oy {
                    let dir = if acx <= bcx { -1.0 } else { 1.0 };
                    rects[i].x += dir * ox / 2.0;
                    rects[j].x -= dir * ox / 2.0;
                } else {
                    let dir = if acy <= bcy { -1.0 } else { 1.0 };
                    rects[i].y += dir * oy / 2.0;
                    rects[j].y -= dir * oy / 2.0;
                }
            }
        }
        if !moved {
            return true;
        }
    }
    !any_overlap(rects)
}

pub fn any_overlap(rects: &[Rect]) -> bool {
    (0..rects.len()).any(|i| ((i + 1)..rects.len()).any(|j| rects[i].overlaps(&rects[j])))
}

/// Row packing in reading order of the current centers. Never overlaps.
fn shelf_pack(rects: &mut [Rect], gap: f64) {
    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| {
        let (ax, ay) = rects[a].center();
        let (bx, by) = rects[b].center();
        ay.total_cmp(&by).then(ax.total_cmp(&bx))
    });

    let area: f64 = rects.iter().map(|r| (r.width + gap) * (r.height + gap)).sum();
    let widest = rects.iter().map(|r| r.width).fold(0.0, f64::max);
    let row_limit = (area.sqrt() * 1.5).max(widest);

    let (mut x, mut y, mut row_h) = (0.0, 0.0, 0.0_f64);
    for idx in order {
        let r = &mut rects[idx];
        if x > 0.0 && x + r.width > row_limit {
            x = 0.0;
            y += row_h + gap;
            row_h = 0.0;
        }
        r.x = x;
        r.y = y;
        x += r.width + gap;
        row_h = row_h.max(r.height);
    }
}

pub fn finalize(
    partition: &Partition,
    adjacency: &Adjacency,
    sizes: &[(f64, f64)],
    top: &[TopNode],
    config: &LayoutConfig,
    seed: u64,
) -> Layout {
    if top.is_empty() {
        return Layout::empty(seed);
    }

    let mut grids = Vec::with_capacity(partition.clusters.len());
    let mut rects: Vec<Rect> = Vec::with_capacity(top.len());
    for node in top {
        match node.kind {
            TopKind::Cluster(ci) => {
                let member_sizes: Vec<(f64, f64)> = partition.clusters[ci]
                    .members
                    .iter()
                    .map(|&m| sizes[m])
                    .collect();
                let grid = grid_placement(&member_sizes, config);
                rects.push(Rect::centered(node.x, node.y, grid.width, grid.height));
                grids.push(grid);
            }
            TopKind::Table(_) => rects.push(node.rect()),
        }
    }

    if !separate(&mut rects, config.separation_gap, config.separation_passes) {
        warn!(
            nodes = rects.len(),
            "overlap left after separation, falling back to row packing"
        );
        shelf_pack(&mut rects, config.separation_gap);
    }

    let bounds = rects
        .iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();
    for r in &mut rects {
        *r = r.translate(-bounds.x, -bounds.y);
    }

    let mut nodes = Vec::with_capacity(top.len() + sizes.len());
    let mut standalone_rects = Vec::new();
    for (node, rect) in top.iter().zip(&rects) {
        match node.kind {
            TopKind::Cluster(ci) => nodes.push(LayoutNode {
                id: cluster_node_id(&partition.clusters[ci].name),
                kind: NodeKind::Cluster,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                parent: None,
            }),
            TopKind::Table(t) => standalone_rects.push((t, *rect)),
        }
    }

    for table in 0..adjacency.len() {
        let id = adjacency.name(table).to_string();
        let (w, h) = sizes[table];
        let node = match partition.cluster_of(table) {
            Some(ci) => {
                let cluster = &partition.clusters[ci];
                let slot = cluster.members.partition_point(|&m| m < table);
                let (x, y) = grids[ci].positions[slot];
                LayoutNode {
                    id,
                    kind: NodeKind::Table,
                    x,
                    y,
                    width: w,
                    height: h,
                    parent: Some(cluster_node_id(&cluster.name)),
                }
            }
            None => {
                let Some(&(_, rect)) = standalone_rects.iter().find(|(t, _)| *t == table) else {
                    continue;
                };
                LayoutNode {
                    id,
                    kind: NodeKind::Table,
                    x: rect.x,
                    y: rect.y,
                    width: w,
                    height: h,
                    parent: None,
                }
            }
        };
        nodes.push(node);
    }

    debug!(
        nodes = nodes.len(),
        width = bounds.width,
        height = bounds.height,
        "layout finalized"
    );

    Layout {
        nodes,
        width: bounds.width,
        height: bounds.height,
        seed,
    }
}
