//! Undirected table adjacency derived from relationships.

use crate::ast::Schema;
use std::collections::HashMap;

/// Table connectivity. Tables are addressed by their declaration index;
/// neighbor lists are sorted by that index and free of duplicates, so every
/// traversal over this structure is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    names: Vec<String>,
    index: HashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn build(schema: &Schema) -> Self {
        let names: Vec<String> = schema.tables.iter().map(|t| t.name.clone()).collect();
        let index: HashMap<String, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let mut neighbors = vec![Vec::new(); names.len()];

        for rel in &schema.relationships {
            if rel.is_self_reference() {
                continue;
            }
            let (Some(&a), Some(&b)) = (index.get(&rel.from_table), index.get(&rel.to_table)) else {
                continue;
            };
            neighbors[a].push(b);
            neighbors[b].push(a);
        }

        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            names,
            index,
            neighbors,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, table: &str) -> Option<usize> {
        self.index.get(table).copied()
    }

    pub fn name(&self, idx: usize) -> &str {
        &self.names[idx]
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.neighbors[idx]
    }

    /// Neighbor names of `table`, in declaration order.
    pub fn neighbors_of(&self, table: &str) -> Vec<&str> {
        self.index_of(table)
            .map(|i| self.neighbors[i].iter().map(|&n| self.name(n)).collect())
            .unwrap_or_default()
    }

    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.neighbors[a].binary_search(&b).is_ok(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_dbml;

    fn adjacency(input: &str) -> Adjacency {
        Adjacency::build(&parse_dbml(input).schema)
    }

    #[test]
    fn test_symmetric_and_deduplicated() {
        let adj = adjacency(
            r#"
            Table users { id int }
            Table orders {
                id int
                user_id int [ref: > users.id]
                buyer_id int [ref: > users.id]
            }
            Table items {
                order_id int [ref: > orders.id]
            }
        "#,
        );
        assert_eq!(adj.len(), 3);
        assert_eq!(adj.neighbors_of("users"), vec!["orders"]);
        assert_eq!(adj.neighbors_of("orders"), vec!["users", "items"]);
        assert!(adj.are_adjacent("items", "orders"));
        assert!(!adj.are_adjacent("items", "users"));
    }

    #[test]
    fn test_self_reference_adds_nothing() {
        let adj = adjacency("Table emp {\n  id int\n  boss_id int [ref: > emp.id]\n}");
        assert!(adj.neighbors_of("emp").is_empty());
        assert!(!adj.are_adjacent("emp", "emp"));
    }

    #[test]
    fn test_unknown_table() {
        let adj = adjacency("Table a { id int }");
        assert!(adj.neighbors_of("zzz").is_empty());
        assert_eq!(adj.index_of("a"), Some(0));
    }
}
