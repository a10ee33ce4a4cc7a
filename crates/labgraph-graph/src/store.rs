//! [`GraphStore`] over a Neo4j session.

use async_trait::async_trait;

use labgraph_core::request::PropertyMap;
use labgraph_core::scheme::scheme;
use labgraph_core::store::{CreatedEntity, GraphStore, NodeProperties, PageRecord};
use labgraph_core::types::{EntityType, ResolvedEdge};
use labgraph_core::{LabGraphError, Result};

use crate::client::GraphError;
use crate::session::{count_column, node_column, node_list_column, AccessMode, GraphSession};
use crate::statements;

impl GraphSession {
    /// Largest numeric id of a type, if any entity exists.
    pub async fn max_entity_id(&self, entity_type: EntityType) -> Result<Option<u64>> {
        let rows = self
            .execute(&statements::max_id(entity_type), AccessMode::Read)
            .await?;
        let max = count_column(&rows, "maxId")?;
        Ok(u64::try_from(max).ok().filter(|m| *m > 0))
    }

    async fn create_entity_once(
        &self,
        entity_type: EntityType,
        properties: &PropertyMap,
        edges: &[ResolvedEdge],
    ) -> std::result::Result<CreatedEntity, GraphError> {
        let creation = statements::entity_creation(scheme(entity_type), properties);
        let mut assigned: Option<String> = None;

        let outputs = self
            .execute_chain(creation, |rows| {
                if assigned.is_some() {
                    return Ok(None);
                }
                let row = rows.first().ok_or_else(|| {
                    GraphError::Serialization("entity creation returned no row".to_string())
                })?;
                let id: String = row
                    .get("id")
                    .map_err(|e| GraphError::Serialization(format!("Failed to read id: {e}")))?;
                let following = (!edges.is_empty())
                    .then(|| statements::relationship_creation(edges, Some((entity_type, &id))));
                assigned = Some(id);
                Ok(following)
            })
            .await?;

        let id = assigned.ok_or_else(|| {
            GraphError::Serialization("entity creation returned no id".to_string())
        })?;
        let relationships_created = match outputs.get(1) {
            Some(rows) => count_column(rows, "created")?,
            None => 0,
        };
        Ok(CreatedEntity {
            id,
            relationships_created: u64::try_from(relationships_created).unwrap_or(0),
        })
    }
}

#[async_trait]
impl GraphStore for GraphSession {
    async fn entity_exists(&self, entity_type: EntityType, id: &str) -> Result<bool> {
        let rows = self
            .execute(&statements::entity_exists(entity_type, id), AccessMode::Read)
            .await?;
        Ok(count_column(&rows, "found")? > 0)
    }

    async fn relationship_exists(&self, edge: &ResolvedEdge) -> Result<bool> {
        let rows = self
            .execute(&statements::relationship_exists(edge), AccessMode::Read)
            .await?;
        Ok(count_column(&rows, "found")? > 0)
    }

    async fn create_entity(
        &self,
        entity_type: EntityType,
        properties: &PropertyMap,
        edges: &[ResolvedEdge],
    ) -> Result<CreatedEntity> {
        let mut attempt = 1;
        loop {
            match self.create_entity_once(entity_type, properties, edges).await {
                Ok(created) => {
                    tracing::info!(
                        request_id = %self.request_id(),
                        entity_type = %entity_type,
                        id = %created.id,
                        relationships = created.relationships_created,
                        "Created entity"
                    );
                    return Ok(created);
                }
                Err(e) if e.is_constraint_violation() && attempt < self.id_retry_attempts => {
                    tracing::warn!(
                        request_id = %self.request_id(),
                        entity_type = %entity_type,
                        attempt,
                        "Entity id taken by a concurrent creation, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn create_relationships(&self, edges: &[ResolvedEdge]) -> Result<u64> {
        if edges.is_empty() {
            return Ok(0);
        }
        let rows = self
            .execute(
                &statements::relationship_creation(edges, None),
                AccessMode::Write,
            )
            .await?;
        let created = count_column(&rows, "created")?;
        if created < edges.len() as i64 {
            tracing::warn!(
                request_id = %self.request_id(),
                requested = edges.len(),
                created,
                "Some relationships matched no endpoints"
            );
        }
        Ok(u64::try_from(created).unwrap_or(0))
    }

    async fn set_properties(
        &self,
        entity_type: EntityType,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<u64> {
        let rows = self
            .execute(
                &statements::property_set(scheme(entity_type), id, properties),
                AccessMode::Write,
            )
            .await?;
        Ok(u64::try_from(count_column(&rows, "matched")?).unwrap_or(0))
    }

    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<NodeProperties>> {
        let rows = self
            .execute(&statements::read_all(entity_type), AccessMode::Read)
            .await?;
        rows.iter()
            .map(|row| node_column(row, "n").map_err(LabGraphError::from))
            .collect()
    }

    async fn fetch_page(&self, entity_type: EntityType, id: &str) -> Result<Option<PageRecord>> {
        let rows = self
            .execute(&statements::read_by_id(entity_type, id), AccessMode::Read)
            .await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let entity = node_column(row, "n")?;
        let sections = (0..scheme(entity_type).sections.len())
            .map(|i| node_list_column(row, &format!("s{i}")))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Some(PageRecord { entity, sections }))
    }

    async fn search(
        &self,
        entity_type: EntityType,
        term: &str,
        limit: usize,
    ) -> Result<Vec<NodeProperties>> {
        let rows = self
            .execute(&statements::search(entity_type, term, limit), AccessMode::Read)
            .await?;
        rows.iter()
            .map(|row| node_column(row, "n").map_err(LabGraphError::from))
            .collect()
    }

    fn release(self: Box<Self>) {
        (*self).close();
    }
}
