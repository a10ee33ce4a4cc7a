//! Mutations: validate against the live graph, then write.

use serde::Serialize;

use labgraph_core::request::{MutationRequest, PropertyMap};
use labgraph_core::types::{EntityType, ResolvedEdge};
use labgraph_core::validate::{validate, Route, ValidatedMutation};
use labgraph_core::{GraphStore, LabGraphError, Result};

/// Result of a successful mutation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub status: u16,
    pub message: String,
    pub entity_type: EntityType,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships_created: Option<u64>,
}

/// Validate `request` against `route` and apply it.
pub async fn submit(
    store: &dyn GraphStore,
    route: &Route,
    request: MutationRequest,
) -> Result<Confirmation> {
    match validate(store, route, request).await? {
        ValidatedMutation::Properties {
            entity_type,
            id,
            properties,
        } => set_properties(store, entity_type, &id, &properties).await,
        ValidatedMutation::Relationships { edges } => {
            create_relationships(store, route, &edges).await
        }
        ValidatedMutation::Entity {
            entity_type,
            properties,
            edges,
        } => create_entity(store, entity_type, &properties, &edges).await,
    }
}

pub async fn set_properties(
    store: &dyn GraphStore,
    entity_type: EntityType,
    id: &str,
    properties: &PropertyMap,
) -> Result<Confirmation> {
    let matched = store.set_properties(entity_type, id, properties).await?;
    if matched == 0 {
        // Deleted between validation and write.
        return Err(LabGraphError::EntityIdNotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        });
    }
    tracing::info!(%entity_type, id, count = properties.len(), "Updated properties");
    Ok(Confirmation {
        status: 200,
        message: format!("updated {} properties of {entity_type} {id}", properties.len()),
        entity_type,
        entity_id: id.to_string(),
        relationships_created: None,
    })
}

pub async fn create_relationships(
    store: &dyn GraphStore,
    route: &Route,
    edges: &[ResolvedEdge],
) -> Result<Confirmation> {
    let created = store.create_relationships(edges).await?;
    tracing::info!(
        entity_type = %route.entity_type,
        id = %route.entity_id,
        requested = edges.len(),
        created,
        "Created relationships"
    );
    Ok(Confirmation {
        status: 201,
        message: format!("created {created} of {} relationships", edges.len()),
        entity_type: route.entity_type,
        entity_id: route.entity_id.clone(),
        relationships_created: Some(created),
    })
}

pub async fn create_entity(
    store: &dyn GraphStore,
    entity_type: EntityType,
    properties: &PropertyMap,
    edges: &[ResolvedEdge],
) -> Result<Confirmation> {
    let created = store.create_entity(entity_type, properties, edges).await?;
    Ok(Confirmation {
        status: 201,
        message: format!("created {entity_type} {}", created.id),
        entity_type,
        entity_id: created.id,
        relationships_created: Some(created.relationships_created),
    })
}
