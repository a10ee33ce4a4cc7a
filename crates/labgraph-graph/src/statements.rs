//! Cypher statement builders for the knowledge graph.
//!
//! Only canonical labels, relationship types and scheme property names are
//! written into statement text. Every request value is a bound parameter.

use neo4rs::{query, Query};

use labgraph_core::request::{PropertyMap, PropertyValue};
use labgraph_core::scheme::{scheme, Direction, EntityScheme, Hop, SECTION_LIMIT};
use labgraph_core::types::{EntityType, ResolvedEdge};

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i64),
    List(Vec<String>),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Vec<String>> for Param {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&PropertyValue> for Param {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Text(s) => Self::Text(s.clone()),
            PropertyValue::List(items) => Self::List(items.clone()),
        }
    }
}

/// Cypher text plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub cypher: String,
    pub params: Vec<(String, Param)>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Look up a bound parameter by name.
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Convert into a driver query.
    pub fn to_query(&self) -> Query {
        self.params
            .iter()
            .fold(query(&self.cypher), |q, (key, value)| match value {
                Param::Text(s) => q.param(key, s.clone()),
                Param::Int(i) => q.param(key, *i),
                Param::List(items) => q.param(key, items.clone()),
            })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn node(var: &str, entity_type: EntityType, id_param: &str) -> String {
    format!(
        "({var}:{entity_type} {{{}: ${id_param}}})",
        scheme(entity_type).id_field
    )
}

fn set_clauses(var: &str, properties: &PropertyMap) -> (String, Vec<(String, Param)>) {
    let mut clauses = Vec::with_capacity(properties.len());
    let mut params = Vec::with_capacity(properties.len());
    for (key, value) in properties {
        let name = format!("p_{key}");
        clauses.push(format!("{var}.{key} = ${name}"));
        params.push((name, Param::from(value)));
    }
    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!("SET {}", clauses.join(", ")), params)
    }
}

/// Ordering key putting active entities first, then ascending id.
fn order_by_active(var: &str, target: &EntityScheme) -> String {
    let by_id = format!("toInteger({var}.{})", target.id_field);
    match target.active_field {
        Some(field) => format!(
            "CASE WHEN toString({var}.{field}) = 'true' THEN 0 ELSE 1 END, {by_id}"
        ),
        None => by_id,
    }
}

/// Render a path pattern from `n` through `hops`, ending at `m`.
fn path_pattern(start: EntityType, hops: &[Hop], target: EntityType) -> String {
    let mut pattern = String::from("(n)");
    let mut from = start;
    for (i, hop) in hops.iter().enumerate() {
        let next = hop.target(from);
        let last = i + 1 == hops.len();
        let node = if last {
            format!("(m:{target})")
        } else {
            match next {
                Some(t) => format!("(:{t})"),
                None => "()".to_string(),
            }
        };
        let rel = hop.relationship.as_str();
        match hop.direction {
            Direction::Outgoing => pattern.push_str(&format!("-[:{rel}]->{node}")),
            Direction::Incoming => pattern.push_str(&format!("<-[:{rel}]-{node}")),
        }
        if let Some(t) = next {
            from = t;
        }
    }
    pattern
}

// ── Writes ───────────────────────────────────────────────────────

/// Create an entity with the next free id of its type.
///
/// The id is `max + 1` over the existing ids, computed inside the statement.
/// Returns one row with column `id`.
pub fn entity_creation(scheme: &EntityScheme, properties: &PropertyMap) -> Statement {
    let label = scheme.entity_type.as_str();
    let id_field = scheme.id_field;
    let (set, params) = set_clauses("n", properties);
    let cypher = format!(
        "OPTIONAL MATCH (existing:{label})
         WITH coalesce(max(toInteger(existing.{id_field})), 0) + 1 AS nextId
         CREATE (n:{label} {{{id_field}: toString(nextId)}})
         {set}
         RETURN n.{id_field} AS id"
    );
    Statement {
        cypher,
        params,
    }
}

/// Create every edge in one statement, one independent subquery per edge.
///
/// An edge whose endpoints do not match creates nothing while the others
/// still run. With `new_entity`, the endpoint of that type takes the given id.
/// Returns one row with column `created`.
pub fn relationship_creation(
    edges: &[ResolvedEdge],
    new_entity: Option<(EntityType, &str)>,
) -> Statement {
    if edges.is_empty() {
        return Statement::new("RETURN 0 AS created");
    }

    let mut blocks = Vec::with_capacity(edges.len());
    let mut counters = Vec::with_capacity(edges.len());
    let mut params = Vec::new();

    for (i, edge) in edges.iter().enumerate() {
        let edge = match new_entity {
            Some((entity_type, id)) => edge.with_new_entity_id(entity_type, id),
            None => edge.clone(),
        };
        let source_param = format!("e{i}_source");
        let destination_param = format!("e{i}_destination");
        let mut sets = Vec::new();
        for (key, ids) in &edge.properties {
            let name = format!("e{i}_{key}");
            sets.push(format!("r.{key} = ${name}"));
            params.push((name, Param::List(ids.clone())));
        }
        let set = if sets.is_empty() {
            String::new()
        } else {
            format!(" SET {}", sets.join(", "))
        };

        blocks.push(format!(
            "CALL {{ MATCH {} MATCH {} CREATE (a)-[r:{}]->(b){set} RETURN count(r) AS created{i} }}",
            node("a", edge.source.entity_type, &source_param),
            node("b", edge.destination.entity_type, &destination_param),
            edge.relationship,
        ));
        counters.push(format!("created{i}"));
        params.push((source_param, Param::Text(edge.source.id.clone())));
        params.push((destination_param, Param::Text(edge.destination.id.clone())));
    }

    Statement {
        cypher: format!("{}\nRETURN {} AS created", blocks.join("\n"), counters.join(" + ")),
        params,
    }
}

/// Set properties on one entity. Returns one row with column `matched`.
pub fn property_set(scheme: &EntityScheme, id: &str, properties: &PropertyMap) -> Statement {
    let (set, params) = set_clauses("n", properties);
    let cypher = format!(
        "MATCH {}
         {set}
         RETURN count(n) AS matched",
        node("n", scheme.entity_type, "id")
    );
    Statement {
        cypher,
        params,
    }
    .param("id", id)
}

// ── Reads ────────────────────────────────────────────────────────

/// Every entity of a type, ascending by id. Column `n`.
pub fn read_all(entity_type: EntityType) -> Statement {
    let id_field = scheme(entity_type).id_field;
    Statement::new(format!(
        "MATCH (n:{entity_type})
         RETURN n
         ORDER BY toInteger(n.{id_field})"
    ))
}

/// An entity and the neighbors of each of its page sections.
///
/// Columns: `n` for the entity, `s0`, `s1`, ... for the sections in scheme
/// order. Each section is capped at [`SECTION_LIMIT`], lists active entities
/// first, and never contains the entity itself.
pub fn read_by_id(entity_type: EntityType, id: &str) -> Statement {
    let entity = scheme(entity_type);
    let mut calls = Vec::with_capacity(entity.sections.len());
    let mut columns = vec!["n".to_string()];

    for (i, section) in entity.sections.iter().enumerate() {
        let pattern = path_pattern(entity_type, &section.hops, section.entity_type);
        let order = order_by_active("m", scheme(section.entity_type));
        calls.push(format!(
            "CALL {{
           WITH n
           MATCH {pattern}
           WHERE m <> n
           WITH DISTINCT m
           ORDER BY {order}
           LIMIT {SECTION_LIMIT}
           RETURN collect(m) AS s{i}
         }}"
        ));
        columns.push(format!("s{i}"));
    }

    Statement::new(format!(
        "MATCH {}
         {}
         RETURN {}",
        node("n", entity_type, "id"),
        calls.join("\n         "),
        columns.join(", ")
    ))
    .param("id", id)
}

/// Entities whose display name contains the term, prefix matches first.
/// Column `n`.
pub fn search(entity_type: EntityType, term: &str, limit: usize) -> Statement {
    let name = scheme(entity_type).name_field;
    Statement::new(format!(
        "MATCH (n:{entity_type})
         WHERE toLower(n.{name}) CONTAINS toLower($term)
         RETURN n
         ORDER BY CASE WHEN toLower(n.{name}) STARTS WITH toLower($term) THEN 0 ELSE 1 END,
                  toLower(n.{name})
         LIMIT $limit"
    ))
    .param("term", term)
    .param("limit", i64::try_from(limit).unwrap_or(i64::MAX))
}

/// Column `found`: the number of matching entities.
pub fn entity_exists(entity_type: EntityType, id: &str) -> Statement {
    Statement::new(format!(
        "MATCH {}
         RETURN count(n) AS found",
        node("n", entity_type, "id")
    ))
    .param("id", id)
}

/// Column `found`: the number of matching relationships.
pub fn relationship_exists(edge: &ResolvedEdge) -> Statement {
    Statement::new(format!(
        "MATCH {}-[r:{}]->{}
         RETURN count(r) AS found",
        node("a", edge.source.entity_type, "source"),
        edge.relationship,
        node("b", edge.destination.entity_type, "destination"),
    ))
    .param("source", edge.source.id.as_str())
    .param("destination", edge.destination.id.as_str())
}

/// Column `maxId`: the largest numeric id of a type, 0 if there is none.
pub fn max_id(entity_type: EntityType) -> Statement {
    let id_field = scheme(entity_type).id_field;
    Statement::new(format!(
        "MATCH (n:{entity_type})
         RETURN coalesce(max(toInteger(n.{id_field})), 0) AS maxId"
    ))
}
