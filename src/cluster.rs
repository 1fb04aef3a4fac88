//! Partition tables into explicit groups and standalone tables.
//!
//! Explicit `TableGroup`s always own their members. Every other table is a
//! standalone top-level node; standalone tables are never wrapped into an
//! implicit group. Their connected components are still computed so the
//! layout can start connected tables next to each other.

use crate::ast::Schema;
use crate::graph::Adjacency;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub color: String,
    /// Member table indices, in declaration order.
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub clusters: Vec<Cluster>,
    /// Tables outside every explicit group, in declaration order.
    pub standalone: Vec<usize>,
    /// Connected components among standalone tables. Each component lists
    /// its members in discovery order; components are ordered by their first
    /// member's declaration index.
    pub components: Vec<Vec<usize>>,
    /// Table index -> owning cluster index.
    owner: Vec<Option<usize>>,
}

impl Partition {
    pub fn build(schema: &Schema, adjacency: &Adjacency) -> Self {
        let mut owner: Vec<Option<usize>> = vec![None; adjacency.len()];
        let mut clusters = Vec::new();

        for group in &schema.groups {
            let cluster_idx = clusters.len();
            let mut members: Vec<usize> = group
                .tables
                .iter()
                .filter_map(|t| adjacency.index_of(t))
                .filter(|&i| owner[i].is_none())
                .collect();
            members.sort_unstable();
            members.dedup();
            if members.is_empty() {
                continue;
            }
            for &m in &members {
                owner[m] = Some(cluster_idx);
            }
            clusters.push(Cluster {
                name: group.name.clone(),
                color: group.color.clone(),
                members,
            });
        }

        let standalone: Vec<usize> = (0..adjacency.len())
            .filter(|&i| owner[i].is_none())
            .collect();
        let components = standalone_components(&standalone, &owner, adjacency);

        Self {
            clusters,
            standalone,
            components,
            owner,
        }
    }

    pub fn cluster_of(&self, table: usize) -> Option<usize> {
        self.owner.get(table).copied().flatten()
    }
}

/// Iterative depth-first search over standalone tables. Edges into explicit
/// clusters are not followed.
fn standalone_components(
    standalone: &[usize],
    owner: &[Option<usize>],
    adjacency: &Adjacency,
) -> Vec<Vec<usize>> {
    let mut visited = vec![false; adjacency.len()];
    let mut components = Vec::new();

    for &start in standalone {
        if visited[start] {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);
            // Reverse push so the lowest-index neighbor is visited first.
            for &next in adjacency.neighbors(node).iter().rev() {
                if !visited[next] && owner[next].is_none() {
                    stack.push(next);
                }
            }
        }
        components.push(component);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_dbml;

    fn partition(input: &str) -> Partition {
        let schema = parse_dbml(input).schema;
        let adjacency = Adjacency::build(&schema);
        Partition::build(&schema, &adjacency)
    }

    const SHOP: &str = r#"
        Table users { id int }
        Table orders {
            id int
            user_id int [ref: > users.id]
        }
        Table invoices {
            id int
            order_id int [ref: > orders.id]
        }
        Table payments {
            invoice_id int [ref: > invoices.id]
        }
        Table tags { id int }
        Table post_tags { tag_id int [ref: > tags.id] }
        Table audit { id int }
        TableGroup billing { payments invoices }
    "#;

    #[test]
    fn test_explicit_clusters_and_standalone() {
        let p = partition(SHOP);
        assert_eq!(p.clusters.len(), 1);
        assert_eq!(p.clusters[0].name, "billing");
        // Declaration order, not group listing order.
        assert_eq!(p.clusters[0].members, vec![2, 3]);
        assert_eq!(p.standalone, vec![0, 1, 4, 5, 6]);
        assert_eq!(p.cluster_of(3), Some(0));
        assert_eq!(p.cluster_of(0), None);
    }

    #[test]
    fn test_components_ignore_cluster_edges() {
        let p = partition(SHOP);
        // orders links to invoices, but invoices is clustered.
        assert_eq!(p.components, vec![vec![0, 1], vec![4, 5], vec![6]]);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(partition(SHOP), partition(SHOP));
    }

    #[test]
    fn test_empty() {
        let p = partition("");
        assert!(p.clusters.is_empty());
        assert!(p.standalone.is_empty());
        assert!(p.components.is_empty());
    }

    #[test]
    fn test_dfs_visit_order() {
        let p = partition(
            r#"
            Table hub { id int }
            Table a { hub_id int [ref: > hub.id] }
            Table b {
                id int
                hub_id int [ref: > hub.id]
            }
            Table c { b_id int [ref: > b.id] }
        "#,
        );
        // hub -> a, then b -> c: depth first in declaration order.
        assert_eq!(p.components, vec![vec![0, 1, 2, 3]]);
    }
}
