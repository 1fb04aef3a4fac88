//! Stage 2: settle groups and standalone tables against each other.
//!
//! Each group takes part as one rigid box. The simulation is restarted a few
//! times from fresh random seedings and the candidate with the least box
//! overlap is kept, ties going to the tighter arrangement.

use super::force::{Anchor, Body, Collide, Forces, Link, Simulation, scatter};
use super::intra::ClusterSketch;
use super::types::Rect;
use crate::cluster::Partition;
use crate::config::LayoutConfig;
use crate::graph::Adjacency;
use rand::rngs::StdRng;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Jitter around a component's shared anchor.
const COMPONENT_JITTER: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopKind {
    /// Index into `Partition::clusters`.
    Cluster(usize),
    /// Table declaration index.
    Table(usize),
}

/// A top-level box with its settled center.
#[derive(Debug, Clone, PartialEq)]
pub struct TopNode {
    pub kind: TopKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl TopNode {
    pub fn rect(&self) -> Rect {
        Rect::centered(self.x, self.y, self.width, self.height)
    }

    fn radius(&self, config: &LayoutConfig) -> f64 {
        let half_diagonal = (self.width * self.width + self.height * self.height).sqrt() / 2.0;
        match self.kind {
            TopKind::Cluster(_) => half_diagonal,
            TopKind::Table(_) => {
                (half_diagonal + config.collision_padding).max(config.table_collision_min_radius)
            }
        }
    }
}

/// Box size of a group before its final grid is known. Never smaller than the
/// settled extent of its members plus padding.
pub fn provisional_size(sketch: &ClusterSketch, sizes: &[(f64, f64)], config: &LayoutConfig) -> (f64, f64) {
    let n = sketch.members.len();
    let per_row = grid_columns(n);
    let widest = sketch
        .members
        .iter()
        .map(|&m| sizes[m].0)
        .fold(config.metrics.table_width, f64::max);
    let pad = config.group_padding;

    let grid_width = (widest * per_row as f64 + (per_row as f64 + 1.0) * pad)
        .max(config.group_min_width)
        + config.group_safety_margin;
    let grid_height = (config.provisional_member_height * n as f64).max(config.group_min_height);

    let width = grid_width.max(sketch.extent.0 + 2.0 * pad);
    let height = grid_height.max(sketch.extent.1 + 2.0 * pad + config.group_header_height);
    (width, height)
}

/// Columns of the member grid: about square, at least two, at most `n`.
pub fn grid_columns(n: usize) -> usize {
    let k = (n as f64).sqrt().ceil() as usize;
    k.max(2).min(n).max(1)
}

pub fn settle_top_level(
    partition: &Partition,
    adjacency: &Adjacency,
    sizes: &[(f64, f64)],
    sketches: &[ClusterSketch],
    config: &LayoutConfig,
    rng: &mut StdRng,
) -> Vec<TopNode> {
    let mut nodes: Vec<TopNode> = sketches
        .iter()
        .enumerate()
        .map(|(ci, sketch)| {
            let (width, height) = provisional_size(sketch, sizes, config);
            TopNode {
                kind: TopKind::Cluster(ci),
                x: 0.0,
                y: 0.0,
                width,
                height,
            }
        })
        .collect();
    nodes.extend(partition.standalone.iter().map(|&t| TopNode {
        kind: TopKind::Table(t),
        x: 0.0,
        y: 0.0,
        width: sizes[t].0,
        height: sizes[t].1,
    }));

    if nodes.len() <= 1 {
        return nodes;
    }

    let slot_of = |table: usize| -> usize {
        match partition.cluster_of(table) {
            Some(ci) => ci,
            None => {
                let pos = partition.standalone.partition_point(|&s| s < table);
                sketches.len() + pos
            }
        }
    };
    let links = top_level_links(adjacency, &nodes, slot_of, config);

    let restarts = config.top_restarts.max(1);
    let mut best: Option<(Vec<TopNode>, f64, f64)> = None;
    for cycle in 0..restarts {
        let seeded = seed_positions(&nodes, partition, sketches.len(), config, rng);
        let candidate = run_cycle(seeded, &links, config, rng);
        let overlap = total_overlap(&candidate);
        let spread = spread_area(&candidate);
        debug!(cycle, overlap, spread, "top-level cycle settled");

        let better = match &best {
            None => true,
            Some((_, o, s)) => match overlap.total_cmp(o) {
                Ordering::Less => true,
                Ordering::Equal => spread < *s,
                Ordering::Greater => false,
            },
        };
        if better {
            best = Some((candidate, overlap, spread));
        }
    }

    best.map(|(nodes, _, _)| nodes).unwrap_or(nodes)
}

/// One spring per pair of top-level nodes joined by at least one relationship.
fn top_level_links(
    adjacency: &Adjacency,
    nodes: &[TopNode],
    slot_of: impl Fn(usize) -> usize,
    config: &LayoutConfig,
) -> Vec<Link> {
    let mut pairs = BTreeSet::new();
    for a in 0..adjacency.len() {
        for &b in adjacency.neighbors(a) {
            let (sa, sb) = (slot_of(a), slot_of(b));
            if sa != sb {
                pairs.insert((sa.min(sb), sa.max(sb)));
            }
        }
    }

    pairs
        .into_iter()
        .map(|(source, target)| {
            let (s, t) = (&nodes[source], &nodes[target]);
            let combined = (s.width + t.width + s.height + t.height) / 2.0;
            let both_clusters =
                matches!((s.kind, t.kind), (TopKind::Cluster(_), TopKind::Cluster(_)));
            let floor = if both_clusters {
                config.group_link_min_distance
            } else {
                config.link_min_distance
            };
            Link {
                source,
                target,
                distance: combined.max(floor),
                strength: config.top_link_strength,
            }
        })
        .collect()
}

/// Spread nodes over a region larger than they need. Standalone tables of
/// one connected component start around a shared anchor.
fn seed_positions(
    nodes: &[TopNode],
    partition: &Partition,
    cluster_count: usize,
    config: &LayoutConfig,
    rng: &mut StdRng,
) -> Vec<TopNode> {
    let scale = (nodes.len() as f64).sqrt().max(1.0);
    let span_x = config.top_spread_x * scale / 2.0;
    let span_y = config.top_spread_y * scale / 2.0;
    let mut seeded = nodes.to_vec();

    for node in seeded.iter_mut().take(cluster_count) {
        node.x = scatter(rng, span_x);
        node.y = scatter(rng, span_y);
    }

    for component in &partition.components {
        let ax = scatter(rng, span_x);
        let ay = scatter(rng, span_y);
        for &table in component {
            let pos = partition.standalone.partition_point(|&s| s < table);
            let node = &mut seeded[cluster_count + pos];
            node.x = ax + scatter(rng, COMPONENT_JITTER);
            node.y = ay + scatter(rng, COMPONENT_JITTER);
        }
    }

    seeded
}

fn run_cycle(nodes: Vec<TopNode>, links: &[Link], config: &LayoutConfig, rng: &mut StdRng) -> Vec<TopNode> {
    let bodies = nodes
        .iter()
        .map(|n| Body::at(n.x, n.y, n.radius(config)))
        .collect();

    let settled = Simulation::new(bodies, rng)
        .alpha(config.top_initial_alpha)
        .alpha_min(config.alpha_min)
        .velocity_decay(config.velocity_decay)
        .links(links.to_vec())
        .forces(Forces {
            charge: Some(config.top_charge),
            collide: Some(Collide {
                strength: 1.0,
                iterations: config.top_collide_iterations,
            }),
            center: None,
            position: Some(Anchor {
                x: 0.0,
                y: 0.0,
                strength: config.top_position_strength,
            }),
        })
        .run(config.top_ticks);

    nodes
        .into_iter()
        .zip(settled)
        .map(|(node, body)| TopNode {
            x: body.x,
            y: body.y,
            ..node
        })
        .collect()
}

pub fn total_overlap(nodes: &[TopNode]) -> f64 {
    let rects: Vec<Rect> = nodes.iter().map(TopNode::rect).collect();
    let mut total = 0.0;
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            total += rects[i].overlap_area(&rects[j]);
        }
    }
    total
}

fn spread_area(nodes: &[TopNode]) -> f64 {
    nodes
        .iter()
        .map(TopNode::rect)
        .reduce(|a, b| a.union(&b))
        .map(|r| r.width * r.height)
        .unwrap_or(0.0)
}
