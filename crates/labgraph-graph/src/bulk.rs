//! Bulk CSV export, import and wipe of the whole knowledge graph.
//!
//! Tables live under one root directory on the Neo4j server:
//! - `entity_tables/<Label>.csv`: one row per entity, scheme properties as columns
//! - `relationship_tables/<REL>.csv`: `sourceId`, `destinationId`
//! - `special_property_tables/<REL>_<property>.csv`: one row per list element

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use labgraph_core::scheme::{edge_schemes, schemes, EdgeScheme, EntityScheme};

use crate::client::{GraphClient, GraphError};
use crate::session::{count_column, AccessMode};
use crate::statements::Statement;

pub const ENTITY_TABLES: &str = "entity_tables";
pub const RELATIONSHIP_TABLES: &str = "relationship_tables";
pub const SPECIAL_PROPERTY_TABLES: &str = "special_property_tables";

/// Rows written or read for one table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

/// Outcome of a bulk operation.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct BulkReport {
    pub root: String,
    pub tables: Vec<TableCount>,
}

impl BulkReport {
    pub fn total_rows(&self) -> i64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Export root for a given day: `<export_dir>/<YYYY-MM-DD>`.
pub fn dated_root(export_dir: &Path, date: NaiveDate) -> PathBuf {
    export_dir.join(date.format("%Y-%m-%d").to_string())
}

// ── Table Layout ─────────────────────────────────────────────────

/// One CSV table and its location under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub path: PathBuf,
}

fn entity_table(root: &Path, scheme: &EntityScheme) -> Table {
    let name = scheme.entity_type.as_str().to_string();
    Table {
        path: root.join(ENTITY_TABLES).join(format!("{name}.csv")),
        name,
    }
}

fn relationship_table(root: &Path, edge: &EdgeScheme) -> Table {
    let name = edge.relationship.as_str().to_string();
    Table {
        path: root.join(RELATIONSHIP_TABLES).join(format!("{name}.csv")),
        name,
    }
}

fn special_property_table(root: &Path, edge: &EdgeScheme, property: &str) -> Table {
    let name = format!("{}_{property}", edge.relationship);
    Table {
        path: root.join(SPECIAL_PROPERTY_TABLES).join(format!("{name}.csv")),
        name,
    }
}

/// Stored columns of an entity table: id, name, active flag, then the rest.
fn entity_columns(scheme: &EntityScheme) -> Vec<&'static str> {
    std::iter::once(scheme.id_field)
        .chain(scheme.mutable_properties())
        .collect()
}

fn endpoints(edge: &EdgeScheme) -> (String, String) {
    let source = labgraph_core::scheme::scheme(edge.source);
    let destination = labgraph_core::scheme::scheme(edge.destination);
    (
        format!("(a:{} {{{}: row.sourceId}})", edge.source, source.id_field),
        format!(
            "(b:{} {{{}: row.destinationId}})",
            edge.destination, destination.id_field
        ),
    )
}

/// URL form expected by `LOAD CSV`.
pub fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.starts_with("file:") || raw.starts_with("http://") || raw.starts_with("https://") {
        raw.into_owned()
    } else {
        format!("file:///{}", raw.trim_start_matches('/'))
    }
}

// ── Export ───────────────────────────────────────────────────────

fn export_call(inner: String, table: &Table) -> Statement {
    Statement::new(
        "CALL apoc.export.csv.query($query, $file, {})
         YIELD rows
         RETURN rows",
    )
    .param("query", inner)
    .param("file", table.path.to_string_lossy().into_owned())
}

/// Every export statement, keyed by table name.
pub fn export_statements(root: &Path) -> Vec<(Table, Statement)> {
    let mut out = Vec::new();

    for scheme in schemes() {
        let table = entity_table(root, scheme);
        let columns = entity_columns(scheme)
            .iter()
            .map(|c| format!("n.{c} AS {c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let inner = format!(
            "MATCH (n:{}) RETURN {columns} ORDER BY toInteger(n.{})",
            scheme.entity_type, scheme.id_field
        );
        let statement = export_call(inner, &table);
        out.push((table, statement));
    }

    for edge in edge_schemes() {
        let source_id = labgraph_core::scheme::scheme(edge.source).id_field;
        let destination_id = labgraph_core::scheme::scheme(edge.destination).id_field;
        let pattern = format!(
            "MATCH (a:{})-[r:{}]->(b:{})",
            edge.source, edge.relationship, edge.destination
        );

        let table = relationship_table(root, edge);
        let inner = format!(
            "{pattern} RETURN a.{source_id} AS sourceId, b.{destination_id} AS destinationId"
        );
        let statement = export_call(inner, &table);
        out.push((table, statement));

        for property in &edge.list_properties {
            let table = special_property_table(root, edge, property.name);
            let inner = format!(
                "{pattern} UNWIND coalesce(r.{}, []) AS value \
                 RETURN a.{source_id} AS sourceId, b.{destination_id} AS destinationId, value",
                property.name
            );
            let statement = export_call(inner, &table);
            out.push((table, statement));
        }
    }

    out
}

// ── Import ───────────────────────────────────────────────────────

/// Every import statement in dependency order: entities, relationships,
/// then list properties.
pub fn import_statements(root: &Path) -> Vec<(Table, Statement)> {
    let mut out = Vec::new();

    for scheme in schemes() {
        let table = entity_table(root, scheme);
        let sets = scheme
            .mutable_properties()
            .map(|c| format!("n.{c} = row.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let statement = Statement::new(format!(
            "LOAD CSV WITH HEADERS FROM $file AS row
             MERGE (n:{} {{{}: row.{}}})
             SET {sets}
             RETURN count(*) AS rows",
            scheme.entity_type, scheme.id_field, scheme.id_field
        ))
        .param("file", file_url(&table.path));
        out.push((table, statement));
    }

    for edge in edge_schemes() {
        let (a, b) = endpoints(edge);
        let table = relationship_table(root, edge);
        let statement = Statement::new(format!(
            "LOAD CSV WITH HEADERS FROM $file AS row
             MATCH {a}
             MATCH {b}
             MERGE (a)-[:{}]->(b)
             RETURN count(*) AS rows",
            edge.relationship
        ))
        .param("file", file_url(&table.path));
        out.push((table, statement));
    }

    for edge in edge_schemes() {
        let (a, b) = endpoints(edge);
        for property in &edge.list_properties {
            let name = property.name;
            let table = special_property_table(root, edge, name);
            let statement = Statement::new(format!(
                "LOAD CSV WITH HEADERS FROM $file AS row
                 MATCH {a}-[r:{}]->{b}
                 WITH r, row, coalesce(r.{name}, []) AS current
                 SET r.{name} = CASE WHEN row.value IN current THEN current ELSE current + row.value END
                 RETURN count(*) AS rows",
                edge.relationship
            ))
            .param("file", file_url(&table.path));
            out.push((table, statement));
        }
    }

    out
}

/// Remove every node and relationship. Column `deleted`.
pub fn delete_statement() -> Statement {
    Statement::new(
        "MATCH (n)
         DETACH DELETE n
         RETURN count(n) AS deleted",
    )
}

// ── Execution ────────────────────────────────────────────────────

impl GraphClient {
    /// Export every table under `root`.
    pub async fn export_all(&self, root: &Path) -> Result<BulkReport, GraphError> {
        self.run_tables(root, export_statements(root), "rows", AccessMode::Read)
            .await
    }

    /// Import every table found under `root`.
    pub async fn import_all(&self, root: &Path) -> Result<BulkReport, GraphError> {
        self.run_tables(root, import_statements(root), "rows", AccessMode::Write)
            .await
    }

    /// Delete the whole graph, returning the number of deleted nodes.
    pub async fn delete_all(&self) -> Result<i64, GraphError> {
        let session = self.session();
        let rows = session
            .execute(&delete_statement(), AccessMode::Write)
            .await?;
        let deleted = count_column(&rows, "deleted")?;
        tracing::warn!(deleted, "Deleted all nodes");
        session.close();
        Ok(deleted)
    }

    async fn run_tables(
        &self,
        root: &Path,
        tables: Vec<(Table, Statement)>,
        column: &str,
        mode: AccessMode,
    ) -> Result<BulkReport, GraphError> {
        let session = self.session();
        let mut report = BulkReport {
            root: root.to_string_lossy().into_owned(),
            tables: Vec::with_capacity(tables.len()),
        };

        for (table, statement) in tables {
            let rows = session.execute(&statement, mode).await?;
            let count = count_column(&rows, column)?;
            tracing::info!(table = %table.name, path = %table.path.display(), rows = count, "Processed table");
            report.tables.push(TableCount {
                table: table.name,
                rows: count,
            });
        }

        tracing::info!(
            root = %report.root,
            tables = report.tables.len(),
            rows = report.total_rows(),
            "Bulk operation complete"
        );
        session.close();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dated_root_uses_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            dated_root(Path::new("/var/lib/neo4j/import"), date),
            PathBuf::from("/var/lib/neo4j/import/2024-03-09")
        );
    }

    #[test]
    fn export_covers_every_table() {
        let statements = export_statements(Path::new("/exports"));
        let list_properties: usize = edge_schemes().iter().map(|e| e.list_properties.len()).sum();
        assert_eq!(statements.len(), 8 + 11 + list_properties);

        let (table, st) = &statements[0];
        assert_eq!(table.path, PathBuf::from("/exports/entity_tables/Lab.csv"));
        assert!(st.cypher.contains("apoc.export.csv.query($query, $file"));
        assert!(st.params.iter().any(|(k, _)| k == "query"));
    }

    #[test]
    fn special_tables_are_named_by_relationship_and_property() {
        let statements = export_statements(Path::new("/exports"));
        assert!(statements.iter().any(|(t, _)| t.path
            == PathBuf::from("/exports/special_property_tables/ACTIVE_AT_researchedAreaIds.csv")));
        assert!(statements.iter().any(|(t, _)| t.path
            == PathBuf::from("/exports/relationship_tables/WROTE_REGARD_TO.csv")));
    }

    #[test]
    fn import_loads_entities_before_relationships() {
        let statements = import_statements(Path::new("/imports"));
        let first_relationship = statements
            .iter()
            .position(|(t, _)| t.path.starts_with("/imports/relationship_tables"))
            .unwrap();
        let last_entity = statements
            .iter()
            .rposition(|(t, _)| t.path.starts_with("/imports/entity_tables"))
            .unwrap();
        assert!(last_entity < first_relationship);

        let (_, lab) = &statements[0];
        assert!(lab.cypher.contains("MERGE (n:Lab {labId: row.labId})"));
        assert!(lab.cypher.contains("n.labName = row.labName"));
    }

    #[test]
    fn import_appends_list_values_without_duplicates() {
        let statements = import_statements(Path::new("/imports"));
        let (_, st) = statements
            .iter()
            .find(|(t, _)| t.name == "USING_researchSetupIds")
            .unwrap();
        assert!(st.cypher.contains("row.value IN current"));
        assert!(st
            .cypher
            .contains("MATCH (a:Researcher {researcherId: row.sourceId})-[r:USING]->(b:Product {productId: row.destinationId})"));
    }

    #[test]
    fn file_urls_are_absolute() {
        assert_eq!(
            file_url(Path::new("/imports/entity_tables/Lab.csv")),
            "file:///imports/entity_tables/Lab.csv"
        );
        assert_eq!(
            file_url(Path::new("https://example.org/Lab.csv")),
            "https://example.org/Lab.csv"
        );
    }
}
