//! Stage 1: settle the members of each group on their own.

use super::force::{Anchor, Body, Collide, Forces, Link, Simulation, scatter};
use super::types::Rect;
use crate::cluster::Cluster;
use crate::config::LayoutConfig;
use crate::graph::Adjacency;
use rand::rngs::StdRng;

/// Settled arrangement of one group's members.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSketch {
    /// Member table indices, in declaration order.
    pub members: Vec<usize>,
    /// Member centers relative to the members' centroid.
    pub offsets: Vec<(f64, f64)>,
    /// Width and height of the box spanning all member tables.
    pub extent: (f64, f64),
}

pub fn settle_cluster(
    cluster: &Cluster,
    adjacency: &Adjacency,
    sizes: &[(f64, f64)],
    config: &LayoutConfig,
    rng: &mut StdRng,
) -> ClusterSketch {
    let members = cluster.members.clone();
    if members.len() == 1 {
        return ClusterSketch {
            offsets: vec![(0.0, 0.0)],
            extent: sizes[members[0]],
            members,
        };
    }

    let half = config.intra_spread / 2.0;
    let bodies: Vec<Body> = members
        .iter()
        .map(|&m| {
            let (w, h) = sizes[m];
            let radius = (w * w + h * h).sqrt() / 2.0 + config.collision_padding;
            Body::at(
                scatter(rng, half),
                scatter(rng, half),
                radius,
            )
        })
        .collect();

    let links = member_links(&members, adjacency)
        .into_iter()
        .map(|(source, target)| Link {
            source,
            target,
            distance: config.intra_link_distance,
            strength: config.intra_link_strength,
        })
        .collect();

    let origin = Anchor {
        x: 0.0,
        y: 0.0,
        strength: config.intra_center_strength,
    };
    let settled = Simulation::new(bodies, rng)
        .alpha_min(config.alpha_min)
        .velocity_decay(config.velocity_decay)
        .links(links)
        .forces(Forces {
            charge: Some(config.intra_charge),
            collide: Some(Collide {
                strength: 1.0,
                iterations: 1,
            }),
            center: Some(origin),
            position: None,
        })
        .run(config.intra_ticks);

    let n = settled.len() as f64;
    let cx = settled.iter().map(|b| b.x).sum::<f64>() / n;
    let cy = settled.iter().map(|b| b.y).sum::<f64>() / n;
    let offsets: Vec<(f64, f64)> = settled.iter().map(|b| (b.x - cx, b.y - cy)).collect();

    let extent = members
        .iter()
        .zip(&offsets)
        .map(|(&m, &(x, y))| Rect::centered(x, y, sizes[m].0, sizes[m].1))
        .reduce(|a, b| a.union(&b))
        .map(|r| (r.width, r.height))
        .unwrap_or_default();

    ClusterSketch {
        members,
        offsets,
        extent,
    }
}

/// Relationship edges with both ends in `members`, as member positions.
fn member_links(members: &[usize], adjacency: &Adjacency) -> Vec<(usize, usize)> {
    let mut links = Vec::new();
    for (i, &m) in members.iter().enumerate() {
        for &next in adjacency.neighbors(m) {
            if next <= m {
                continue;
            }
            if let Ok(j) = members.binary_search(&next) {
                links.push((i, j));
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Partition;
    use crate::parser::parse_dbml;
    use rand::SeedableRng;

    fn sketch(input: &str, seed: u64) -> ClusterSketch {
        let schema = parse_dbml(input).schema;
        let adjacency = Adjacency::build(&schema);
        let partition = Partition::build(&schema, &adjacency);
        let config = LayoutConfig::default();
        let sizes: Vec<_> = schema
            .tables
            .iter()
            .map(|t| config.metrics.table_size(t))
            .collect();
        let mut rng = StdRng::seed_from_u64(seed);
        settle_cluster(&partition.clusters[0], &adjacency, &sizes, &config, &mut rng)
    }

    const BILLING: &str = r#"
        Table invoices { id int }
        Table payments {
            id int
            invoice_id int [ref: > invoices.id]
        }
        Table refunds { payment_id int [ref: > payments.id] }
        TableGroup billing { invoices payments refunds }
    "#;

    #[test]
    fn test_single_member_at_origin() {
        let s = sketch("Table a {\n id int\n}\nTableGroup g { a }", 1);
        assert_eq!(s.offsets, vec![(0.0, 0.0)]);
        assert_eq!(s.extent, (280.0, 80.0));
    }

    #[test]
    fn test_offsets_centered() {
        let s = sketch(BILLING, 9);
        assert_eq!(s.members, vec![0, 1, 2]);
        let sx: f64 = s.offsets.iter().map(|o| o.0).sum();
        let sy: f64 = s.offsets.iter().map(|o| o.1).sum();
        assert!(sx.abs() < 1e-6 && sy.abs() < 1e-6);
        assert!(s.extent.0 >= 280.0 && s.extent.1 >= 80.0);
    }

    #[test]
    fn test_members_spread_apart() {
        let s = sketch(BILLING, 4);
        for i in 0..3 {
            for j in (i + 1)..3 {
                let (a, b) = (s.offsets[i], s.offsets[j]);
                let d = ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt();
                assert!(d > 100.0, "members {i} and {j} too close: {d}");
            }
        }
    }

    #[test]
    fn test_reproducible() {
        assert_eq!(sketch(BILLING, 5), sketch(BILLING, 5));
    }

    #[test]
    fn test_member_links() {
        let schema = parse_dbml(BILLING).schema;
        let adjacency = Adjacency::build(&schema);
        assert_eq!(member_links(&[0, 1, 2], &adjacency), vec![(0, 1), (1, 2)]);
        assert_eq!(member_links(&[0, 2], &adjacency), vec![]);
    }
}
