//! Schema model shared by the DBML parser and the JSON importer.

use crate::layout::cluster_node_id;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Header/group color used when the source does not specify one.
pub const DEFAULT_COLOR: &str = "#ff7225";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Schema {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub groups: Vec<TableGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
    pub columns: Vec<Column>,
    pub header_color: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub type_name: String,
    pub is_primary_key: bool,
    pub unique: bool,
    pub not_null: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub name: Option<String>,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub cardinality: Cardinality,
}

/// Cardinality of a reference, read from `from` towards `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ManyToOne,  // >
    OneToMany,  // <
    ManyToMany, // <>
    #[default]
    OneToOne, // -
}

impl Cardinality {
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::ManyToOne),
            "<" => Some(Self::OneToMany),
            "<>" => Some(Self::ManyToMany),
            "-" => Some(Self::OneToOne),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::ManyToOne => ">",
            Self::OneToMany => "<",
            Self::ManyToMany => "<>",
            Self::OneToOne => "-",
        }
    }

    /// Edge label shown next to a rendered relationship.
    pub fn label(self) -> &'static str {
        match self {
            Self::ManyToOne => "(n) -> (1)",
            Self::OneToMany => "(1) -> (n)",
            Self::ManyToMany => "(n) -> (n)",
            Self::OneToOne => "(1) -> (1)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableGroup {
    pub name: String,
    pub tables: Vec<String>,
    pub color: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            columns: Vec::new(),
            header_color: DEFAULT_COLOR.to_string(),
            note: None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            is_primary_key: false,
            unique: false,
            not_null: false,
            note: None,
        }
    }
}

impl Relationship {
    pub fn is_self_reference(&self) -> bool {
        self.from_table == self.to_table
    }

    pub fn touches(&self, table: &str) -> bool {
        self.from_table == table || self.to_table == table
    }
}

/// A problem found while normalizing a schema. Never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaIssue {
    #[error("Duplicate table `{0}` ignored")]
    DuplicateTable(String),
    #[error("Reference {from}.{from_column} -> {to}.{to_column} points at a missing table or column")]
    DanglingReference {
        from: String,
        from_column: String,
        to: String,
        to_column: String,
    },
    #[error("Group `{group}` names unknown table `{table}`")]
    UnknownGroupMember { group: String, table: String },
    #[error("Table `{table}` already belongs to group `{owner}`, ignored in `{group}`")]
    ConflictingGroupMember {
        table: String,
        owner: String,
        group: String,
    },
    #[error("Group `{0}` has no tables")]
    EmptyGroup(String),
    #[error("Group `{group}` ignored, its node id `{id}` is already a table name")]
    GroupIdCollision { group: String, id: String },
}

impl Schema {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Group that owns `table`, if any.
    pub fn group_of(&self, table: &str) -> Option<&TableGroup> {
        self.groups
            .iter()
            .find(|g| g.tables.iter().any(|t| t == table))
    }

    /// Enforce the model invariants in place: unique table names, references
    /// that resolve to existing columns, and at most one group per table.
    /// Offending items are dropped and reported.
    pub fn normalize(&mut self) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();

        let mut seen: HashSet<String> = HashSet::new();
        self.tables.retain(|t| {
            if seen.insert(t.name.clone()) {
                true
            } else {
                issues.push(SchemaIssue::DuplicateTable(t.name.clone()));
                false
            }
        });

        // `Table users as U` lets refs and groups say `U`. Real names win.
        let aliases: HashMap<&str, &str> = self
            .tables
            .iter()
            .filter_map(|t| t.alias.as_deref().map(|a| (a, t.name.as_str())))
            .filter(|(alias, _)| !seen.contains(*alias))
            .collect();
        let canonical = |name: &mut String| {
            if let Some(real) = aliases.get(name.as_str()) {
                *name = (*real).to_string();
            }
        };
        for rel in &mut self.relationships {
            canonical(&mut rel.from_table);
            canonical(&mut rel.to_table);
        }
        for group in &mut self.groups {
            group.tables.iter_mut().for_each(&canonical);
        }

        let tables: HashMap<&str, &Table> =
            self.tables.iter().map(|t| (t.name.as_str(), t)).collect();
        let resolves = |table: &str, column: &str| {
            tables
                .get(table)
                .is_some_and(|t| t.column(column).is_some())
        };

        let mut kept = Vec::with_capacity(self.relationships.len());
        for rel in self.relationships.drain(..) {
            if resolves(&rel.from_table, &rel.from_column) && resolves(&rel.to_table, &rel.to_column)
            {
                kept.push(rel);
            } else {
                issues.push(SchemaIssue::DanglingReference {
                    from: rel.from_table,
                    from_column: rel.from_column,
                    to: rel.to_table,
                    to_column: rel.to_column,
                });
            }
        }
        self.relationships = kept;

        self.groups.retain(|g| {
            let id = cluster_node_id(&g.name);
            if tables.contains_key(id.as_str()) {
                issues.push(SchemaIssue::GroupIdCollision {
                    group: g.name.clone(),
                    id,
                });
                false
            } else {
                true
            }
        });

        let mut owner: HashMap<String, String> = HashMap::new();
        for group in &mut self.groups {
            let mut members = Vec::with_capacity(group.tables.len());
            for table in group.tables.drain(..) {
                if !tables.contains_key(table.as_str()) {
                    issues.push(SchemaIssue::UnknownGroupMember {
                        group: group.name.clone(),
                        table,
                    });
                } else if let Some(existing) = owner.get(&table) {
                    if existing != &group.name {
                        issues.push(SchemaIssue::ConflictingGroupMember {
                            table,
                            owner: existing.clone(),
                            group: group.name.clone(),
                        });
                    }
                } else {
                    owner.insert(table.clone(), group.name.clone());
                    members.push(table);
                }
            }
            group.tables = members;
        }
        self.groups.retain(|g| {
            if g.tables.is_empty() {
                issues.push(SchemaIssue::EmptyGroup(g.name.clone()));
                false
            } else {
                true
            }
        });

        issues
    }

    /// Sub-schema around one table: the table itself, every table directly
    /// related to it and only the relationships touching it. Groups are not
    /// carried over.
    pub fn focus(&self, table: &str) -> Option<Schema> {
        self.table(table)?;

        let relationships: Vec<Relationship> = self
            .relationships
            .iter()
            .filter(|r| r.touches(table))
            .cloned()
            .collect();

        let related: HashSet<&str> = relationships
            .iter()
            .flat_map(|r| [r.from_table.as_str(), r.to_table.as_str()])
            .chain(std::iter::once(table))
            .collect();

        let tables = self
            .tables
            .iter()
            .filter(|t| related.contains(t.name.as_str()))
            .cloned()
            .collect();

        Some(Schema {
            tables,
            relationships,
            groups: Vec::new(),
        })
    }
}
