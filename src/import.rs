//! Import of an already-parsed database object (the JSON shape produced by
//! DBML tooling such as `@dbml/core`'s `Database.export`).

use crate::ast::{Cardinality, Column, Relationship, Schema, SchemaIssue, Table, TableGroup, DEFAULT_COLOR};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid database JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Database {
    pub schemas: Vec<DbSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DbSchema {
    pub name: String,
    pub tables: Vec<DbTable>,
    pub table_groups: Vec<DbTableGroup>,
    pub refs: Vec<DbRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DbTable {
    pub name: String,
    pub alias: Option<String>,
    pub note: Option<String>,
    pub header_color: Option<String>,
    pub fields: Vec<DbField>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbField {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: DbFieldType,
    pub pk: bool,
    pub unique: bool,
    pub not_null: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbFieldType {
    pub type_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbTableGroup {
    pub name: String,
    pub color: Option<String>,
    pub tables: Vec<DbTableRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DbTableRef {
    pub table_name: String,
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DbRef {
    pub name: Option<String>,
    pub endpoints: Vec<DbEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DbEndpoint {
    pub schema_name: Option<String>,
    pub table_name: String,
    pub field_names: Vec<String>,
    pub relation: Option<String>,
}

/// Endpoint relations `*` / `1` to a cardinality read from the first endpoint.
fn cardinality_of(from: Option<&str>, to: Option<&str>) -> Cardinality {
    match (from, to) {
        (Some("*"), Some("1")) => Cardinality::ManyToOne,
        (Some("1"), Some("*")) => Cardinality::OneToMany,
        (Some("*"), Some("*")) => Cardinality::ManyToMany,
        _ => Cardinality::OneToOne,
    }
}

fn empty_to_none(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

impl Database {
    /// Convert the first schema into the model. Returns the normalized schema
    /// and whatever had to be dropped on the way.
    pub fn into_schema(self) -> (Schema, Vec<SchemaIssue>) {
        let Some(db) = self.schemas.into_iter().next() else {
            return (Schema::default(), Vec::new());
        };

        let tables = db
            .tables
            .into_iter()
            .map(|t| Table {
                name: t.name,
                alias: empty_to_none(t.alias),
                columns: t
                    .fields
                    .into_iter()
                    .map(|f| Column {
                        name: f.name,
                        type_name: f.typ.type_name,
                        is_primary_key: f.pk,
                        unique: f.unique,
                        not_null: f.not_null,
                        note: empty_to_none(f.note),
                    })
                    .collect(),
                header_color: empty_to_none(t.header_color)
                    .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                note: empty_to_none(t.note),
            })
            .collect();

        let groups = db
            .table_groups
            .into_iter()
            .map(|g| TableGroup {
                name: g.name,
                tables: g.tables.into_iter().map(|t| t.table_name).collect(),
                color: empty_to_none(g.color).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            })
            .collect();

        let mut relationships = Vec::with_capacity(db.refs.len());
        for r in db.refs {
            let [from, to] = match <[DbEndpoint; 2]>::try_from(r.endpoints) {
                Ok(pair) => pair,
                Err(endpoints) => {
                    warn!(endpoints = endpoints.len(), "skipping ref without exactly two endpoints");
                    continue;
                }
            };
            let (Some(from_column), Some(to_column)) =
                (from.field_names.first(), to.field_names.first())
            else {
                warn!(from = %from.table_name, to = %to.table_name, "skipping ref without fields");
                continue;
            };
            relationships.push(Relationship {
                name: empty_to_none(r.name),
                cardinality: cardinality_of(from.relation.as_deref(), to.relation.as_deref()),
                from_column: from_column.clone(),
                to_column: to_column.clone(),
                from_table: from.table_name,
                to_table: to.table_name,
            });
        }

        let mut schema = Schema {
            tables,
            relationships,
            groups,
        };
        let issues = schema.normalize();
        for issue in &issues {
            warn!(%issue, "dropping unresolved schema item");
        }
        (schema, issues)
    }
}

/// Parse the JSON database object and convert it.
pub fn from_json_str(json: &str) -> Result<(Schema, Vec<SchemaIssue>), ImportError> {
    let database: Database = serde_json::from_str(json)?;
    Ok(database.into_schema())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r##"{
        "schemas": [{
            "name": "public",
            "tables": [
                {"name": "users", "headerColor": "#123456", "fields": [
                    {"name": "id", "type": {"type_name": "int"}, "pk": true},
                    {"name": "name", "type": {"type_name": "varchar"}, "note": "display"}
                ]},
                {"name": "orders", "fields": [
                    {"name": "id", "type": {"type_name": "int"}, "pk": true},
                    {"name": "user_id", "type": {"type_name": "int"}}
                ]}
            ],
            "tableGroups": [
                {"name": "core", "tables": [{"tableName": "users", "schemaName": null}]}
            ],
            "refs": [
                {"name": null, "endpoints": [
                    {"schemaName": null, "tableName": "orders", "fieldNames": ["user_id"], "relation": "*"},
                    {"schemaName": null, "tableName": "users", "fieldNames": ["id"], "relation": "1"}
                ]},
                {"endpoints": [
                    {"tableName": "orders", "fieldNames": ["id"], "relation": "1"},
                    {"tableName": "ghost", "fieldNames": ["id"], "relation": "1"}
                ]}
            ]
        }],
        "notes": []
    }"##;

    #[test]
    fn test_import_database() {
        let (schema, issues) = from_json_str(SHOP).unwrap();
        assert_eq!(schema.tables.len(), 2);
        assert_eq!(schema.tables[0].header_color, "#123456");
        assert_eq!(schema.tables[1].header_color, DEFAULT_COLOR);
        assert!(schema.tables[0].columns[0].is_primary_key);
        assert_eq!(schema.tables[0].columns[1].note.as_deref(), Some("display"));
        assert_eq!(schema.groups[0].tables, vec!["users"]);
        assert_eq!(schema.groups[0].color, DEFAULT_COLOR);
        assert_eq!(schema.relationships.len(), 1);
        assert_eq!(schema.relationships[0].cardinality, Cardinality::ManyToOne);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_cardinality_mapping() {
        assert_eq!(cardinality_of(Some("*"), Some("1")), Cardinality::ManyToOne);
        assert_eq!(cardinality_of(Some("1"), Some("*")), Cardinality::OneToMany);
        assert_eq!(cardinality_of(Some("*"), Some("*")), Cardinality::ManyToMany);
        assert_eq!(cardinality_of(Some("1"), Some("1")), Cardinality::OneToOne);
        assert_eq!(cardinality_of(None, None), Cardinality::OneToOne);
    }

    #[test]
    fn test_empty_and_invalid() {
        let (schema, _) = from_json_str("{}").unwrap();
        assert!(schema.is_empty());
        assert!(from_json_str("not json").is_err());
    }
}
