//! In-memory [`GraphStore`] used for tests and local experiments.
//!
//! Mirrors the semantics of the Neo4j statements: ids are assigned as
//! `max + 1`, relationship rows whose endpoints are missing are skipped, and
//! page sections are capped at [`SECTION_LIMIT`] with active entities first.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{LabGraphError, Result};
use crate::request::{PropertyMap, PropertyValue};
use crate::scheme::{next_entity_id, scheme, Direction, Hop, SECTION_LIMIT};
use crate::store::{CreatedEntity, GraphStore, NodeProperties, PageRecord};
use crate::types::{EntityRef, EntityType, ResolvedEdge};

#[derive(Default)]
struct MemoryGraph {
    nodes: BTreeMap<EntityType, BTreeMap<String, NodeProperties>>,
    edges: Vec<ResolvedEdge>,
}

impl MemoryGraph {
    fn contains(&self, entity: &EntityRef) -> bool {
        self.nodes
            .get(&entity.entity_type)
            .is_some_and(|nodes| nodes.contains_key(&entity.id))
    }

    fn has_edge(&self, edge: &ResolvedEdge) -> bool {
        self.edges.iter().any(|e| {
            e.relationship == edge.relationship
                && e.source == edge.source
                && e.destination == edge.destination
        })
    }

    /// Insert an edge if both endpoints exist. Returns whether it was created.
    fn connect(&mut self, edge: &ResolvedEdge) -> bool {
        if !self.contains(&edge.source) || !self.contains(&edge.destination) {
            return false;
        }
        self.edges.push(edge.clone());
        true
    }

    fn neighbors(&self, start: &EntityRef, hops: &[Hop]) -> BTreeSet<EntityRef> {
        let mut frontier = BTreeSet::from([start.clone()]);
        for hop in hops {
            frontier = self
                .edges
                .iter()
                .filter(|e| e.relationship == hop.relationship)
                .filter_map(|e| match hop.direction {
                    Direction::Outgoing if frontier.contains(&e.source) => {
                        Some(e.destination.clone())
                    }
                    Direction::Incoming if frontier.contains(&e.destination) => {
                        Some(e.source.clone())
                    }
                    _ => None,
                })
                .collect();
        }
        frontier.remove(start);
        frontier
    }
}

/// A [`GraphStore`] backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    graph: Mutex<MemoryGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryGraph>> {
        self.graph
            .lock()
            .map_err(|_| LabGraphError::Internal("memory store lock poisoned".to_string()))
    }

    /// Seed an entity directly. `properties` must be a JSON object; the id
    /// field is filled in from `id`.
    pub fn insert_entity(&self, entity_type: EntityType, id: &str, properties: Value) -> Result<()> {
        let mut props = match properties {
            Value::Object(map) => map,
            _ => return Err(LabGraphError::bad_request("entity properties must be an object")),
        };
        props.insert(
            scheme(entity_type).id_field.to_string(),
            Value::String(id.to_string()),
        );
        self.lock()?
            .nodes
            .entry(entity_type)
            .or_default()
            .insert(id.to_string(), props);
        Ok(())
    }

    /// Current properties of an entity, if it exists.
    pub fn entity(&self, entity_type: EntityType, id: &str) -> Result<Option<NodeProperties>> {
        Ok(self
            .lock()?
            .nodes
            .get(&entity_type)
            .and_then(|nodes| nodes.get(id))
            .cloned())
    }

    pub fn relationship_count(&self) -> Result<usize> {
        Ok(self.lock()?.edges.len())
    }
}

fn numeric_id(id: &str) -> Option<u64> {
    id.parse().ok()
}

fn to_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Text(s) => Value::String(s.clone()),
        PropertyValue::List(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
    }
}

fn is_active(props: &NodeProperties, active_field: Option<&str>) -> bool {
    active_field
        .and_then(|field| props.get(field))
        .is_some_and(|v| v == "true" || v == &Value::Bool(true))
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn entity_exists(&self, entity_type: EntityType, id: &str) -> Result<bool> {
        Ok(self.lock()?.contains(&EntityRef::new(entity_type, id)))
    }

    async fn relationship_exists(&self, edge: &ResolvedEdge) -> Result<bool> {
        Ok(self.lock()?.has_edge(edge))
    }

    async fn create_entity(
        &self,
        entity_type: EntityType,
        properties: &PropertyMap,
        edges: &[ResolvedEdge],
    ) -> Result<CreatedEntity> {
        let mut graph = self.lock()?;
        let nodes = graph.nodes.entry(entity_type).or_default();
        let max = nodes.keys().filter_map(|id| numeric_id(id)).max();
        let id = next_entity_id(max)?.to_string();

        let mut props: NodeProperties = properties
            .iter()
            .map(|(k, v)| (k.clone(), to_json(v)))
            .collect();
        props.insert(
            scheme(entity_type).id_field.to_string(),
            Value::String(id.clone()),
        );
        nodes.insert(id.clone(), props);

        let mut relationships_created = 0;
        for edge in edges {
            if graph.connect(&edge.with_new_entity_id(entity_type, &id)) {
                relationships_created += 1;
            }
        }
        Ok(CreatedEntity {
            id,
            relationships_created,
        })
    }

    async fn create_relationships(&self, edges: &[ResolvedEdge]) -> Result<u64> {
        let mut graph = self.lock()?;
        Ok(edges.iter().filter(|edge| graph.connect(edge)).count() as u64)
    }

    async fn set_properties(
        &self,
        entity_type: EntityType,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<u64> {
        let mut graph = self.lock()?;
        let Some(node) = graph
            .nodes
            .get_mut(&entity_type)
            .and_then(|nodes| nodes.get_mut(id))
        else {
            return Ok(0);
        };
        for (key, value) in properties {
            node.insert(key.clone(), to_json(value));
        }
        Ok(1)
    }

    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<NodeProperties>> {
        let graph = self.lock()?;
        let mut entries: Vec<_> = graph
            .nodes
            .get(&entity_type)
            .map(|nodes| nodes.iter().collect())
            .unwrap_or_default();
        entries.sort_by_key(|(id, _)| numeric_id(id));
        Ok(entries.into_iter().map(|(_, props)| props.clone()).collect())
    }

    async fn fetch_page(&self, entity_type: EntityType, id: &str) -> Result<Option<PageRecord>> {
        let graph = self.lock()?;
        let start = EntityRef::new(entity_type, id);
        let Some(entity) = graph
            .nodes
            .get(&entity_type)
            .and_then(|nodes| nodes.get(id))
            .cloned()
        else {
            return Ok(None);
        };

        let sections = scheme(entity_type)
            .sections
            .iter()
            .map(|section| {
                let active_field = scheme(section.entity_type).active_field;
                let mut found: Vec<NodeProperties> = graph
                    .neighbors(&start, &section.hops)
                    .into_iter()
                    .filter_map(|r| graph.nodes.get(&r.entity_type)?.get(&r.id).cloned())
                    .collect();
                // Stable sort keeps id order within each group.
                found.sort_by_key(|props| !is_active(props, active_field));
                found.truncate(SECTION_LIMIT);
                found
            })
            .collect();

        Ok(Some(PageRecord { entity, sections }))
    }

    async fn search(
        &self,
        entity_type: EntityType,
        term: &str,
        limit: usize,
    ) -> Result<Vec<NodeProperties>> {
        let graph = self.lock()?;
        let name_field = scheme(entity_type).name_field;
        let needle = term.to_lowercase();

        let mut hits: Vec<(bool, String, NodeProperties)> = graph
            .nodes
            .get(&entity_type)
            .into_iter()
            .flat_map(|nodes| nodes.values())
            .filter_map(|props| {
                let name = props.get(name_field)?.as_str()?.to_lowercase();
                name.contains(&needle)
                    .then(|| (!name.starts_with(&needle), name, props.clone()))
            })
            .collect();
        hits.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        Ok(hits.into_iter().take(limit).map(|(_, _, p)| p).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::RelationshipType;

    fn edge(
        relationship: RelationshipType,
        source: (EntityType, &str),
        destination: (EntityType, &str),
    ) -> ResolvedEdge {
        ResolvedEdge {
            relationship,
            source: EntityRef::new(source.0, source.1),
            destination: EntityRef::new(destination.0, destination.1),
            properties: vec![],
        }
    }

    #[tokio::test]
    async fn next_id_follows_existing_maximum() {
        let store = MemoryStore::new();
        for id in ["1", "2", "5"] {
            store
                .insert_entity(EntityType::Lab, id, json!({ "labName": format!("Lab {id}") }))
                .unwrap();
        }

        let mut props = PropertyMap::new();
        props.insert("labName".into(), PropertyValue::Text("Optics Lab".into()));
        let created = store
            .create_entity(EntityType::Lab, &props, &[])
            .await
            .unwrap();

        assert_eq!(created.id, "6");
        let lab = store.entity(EntityType::Lab, "6").unwrap().unwrap();
        assert_eq!(lab["labId"], "6");
        assert_eq!(lab["labName"], "Optics Lab");
    }

    #[tokio::test]
    async fn creation_after_largest_id_fails_cleanly() {
        let store = MemoryStore::new();
        store
            .insert_entity(EntityType::Lab, &u64::MAX.to_string(), json!({}))
            .unwrap();

        let err = store
            .create_entity(EntityType::Lab, &PropertyMap::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LabGraphError::Internal(_)));
    }

    #[tokio::test]
    async fn first_entity_gets_id_one() {
        let store = MemoryStore::new();
        let created = store
            .create_entity(EntityType::Faculty, &PropertyMap::new(), &[])
            .await
            .unwrap();
        assert_eq!(created.id, "1");
    }

    #[tokio::test]
    async fn unmatched_rows_do_not_block_siblings() {
        let store = MemoryStore::new();
        store.insert_entity(EntityType::Researcher, "7", json!({})).unwrap();
        store.insert_entity(EntityType::Product, "2", json!({})).unwrap();

        let created = store
            .create_relationships(&[
                edge(
                    RelationshipType::Using,
                    (EntityType::Researcher, "7"),
                    (EntityType::Product, "2"),
                ),
                edge(
                    RelationshipType::Using,
                    (EntityType::Researcher, "7"),
                    (EntityType::Product, "99"),
                ),
            ])
            .await
            .unwrap();

        assert_eq!(created, 1);
        assert_eq!(store.relationship_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn page_sections_put_active_products_first() {
        let store = MemoryStore::new();
        store.insert_entity(EntityType::Lab, "1", json!({ "labName": "Optics" })).unwrap();
        store
            .insert_entity(EntityType::Product, "1", json!({ "productActive": "false" }))
            .unwrap();
        store
            .insert_entity(EntityType::Product, "2", json!({ "productActive": "true" }))
            .unwrap();
        store
            .create_relationships(&[
                edge(
                    RelationshipType::UsedAt,
                    (EntityType::Product, "1"),
                    (EntityType::Lab, "1"),
                ),
                edge(
                    RelationshipType::UsedAt,
                    (EntityType::Product, "2"),
                    (EntityType::Lab, "1"),
                ),
            ])
            .await
            .unwrap();

        let page = store.fetch_page(EntityType::Lab, "1").await.unwrap().unwrap();
        let lab = scheme(EntityType::Lab);
        let used = lab
            .sections
            .iter()
            .position(|s| s.label == "Used Products")
            .unwrap();
        let ids: Vec<_> = page.sections[used]
            .iter()
            .map(|p| p["productId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn recommendations_exclude_the_entity_itself() {
        let store = MemoryStore::new();
        for id in ["1", "2"] {
            store.insert_entity(EntityType::Lab, id, json!({})).unwrap();
        }
        store.insert_entity(EntityType::ResearchArea, "1", json!({})).unwrap();
        store
            .create_relationships(&[
                edge(
                    RelationshipType::WasResearchedAt,
                    (EntityType::ResearchArea, "1"),
                    (EntityType::Lab, "1"),
                ),
                edge(
                    RelationshipType::WasResearchedAt,
                    (EntityType::ResearchArea, "1"),
                    (EntityType::Lab, "2"),
                ),
            ])
            .await
            .unwrap();

        let page = store.fetch_page(EntityType::Lab, "1").await.unwrap().unwrap();
        let related = scheme(EntityType::Lab)
            .sections
            .iter()
            .position(|s| s.label == "Related Labs")
            .unwrap();
        assert_eq!(page.sections[related].len(), 1);
        assert_eq!(page.sections[related][0]["labId"], "2");
    }

    #[tokio::test]
    async fn search_ranks_prefix_matches_first() {
        let store = MemoryStore::new();
        store
            .insert_entity(EntityType::Lab, "1", json!({ "labName": "Applied Optics" }))
            .unwrap();
        store
            .insert_entity(EntityType::Lab, "2", json!({ "labName": "Optics Lab" }))
            .unwrap();
        store
            .insert_entity(EntityType::Lab, "3", json!({ "labName": "Robotics" }))
            .unwrap();

        let hits = store.search(EntityType::Lab, "OPTICS", 20).await.unwrap();
        let names: Vec<_> = hits.iter().map(|p| p["labName"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Optics Lab", "Applied Optics"]);
    }
}
