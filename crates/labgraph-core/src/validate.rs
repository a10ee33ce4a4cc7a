//! Request validation against the scheme registry and the live graph.
//!
//! Validation runs before any write is issued. Shape checks are pure;
//! existence and duplication checks go through the [`GraphStore`] one at a
//! time, so a single request may cost several graph round-trips. Nothing is
//! cached between requests.

use std::collections::HashSet;

use crate::error::{LabGraphError, Result};
use crate::request::{EdgePayload, MutationRequest, PropertyMap, PropertyValue};
use crate::scheme::{edge_scheme, scheme, EntityScheme, UNASSIGNED_ID};
use crate::store::GraphStore;
use crate::types::{
    resolve_entity_type, resolve_relationship_type, EntityRef, EntityType, ResolvedEdge,
};

/// The entity addressed by the request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl Route {
    /// Route to an existing entity, e.g. `/entity/lab/3`.
    pub fn existing(entity_type: &str, entity_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            entity_type: resolve_entity_type(entity_type)?,
            entity_id: entity_id.into(),
        })
    }

    /// Route for creating a new entity, e.g. `/entity/lab`.
    pub fn creation(entity_type: &str) -> Result<Self> {
        Self::existing(entity_type, UNASSIGNED_ID)
    }

    pub fn is_creation(&self) -> bool {
        self.entity_id == UNASSIGNED_ID
    }
}

/// A mutation that passed validation, ready for statement building.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedMutation {
    Properties {
        entity_type: EntityType,
        id: String,
        properties: PropertyMap,
    },
    Entity {
        entity_type: EntityType,
        properties: PropertyMap,
        edges: Vec<ResolvedEdge>,
    },
    Relationships {
        edges: Vec<ResolvedEdge>,
    },
}

/// Validate a mutation request addressed to `route`.
pub async fn validate(
    store: &dyn GraphStore,
    route: &Route,
    request: MutationRequest,
) -> Result<ValidatedMutation> {
    tracing::debug!(
        object = request.object(),
        entity_type = %route.entity_type,
        entity_id = %route.entity_id,
        "Validating mutation"
    );

    match request {
        MutationRequest::Properties(payload) => {
            let entity_type = match_route_type(route, &payload.entity_type)?;
            if payload.entity_id != route.entity_id {
                return Err(LabGraphError::bad_request(
                    "entity id does not match route's entity id",
                ));
            }
            ensure_exists(store, entity_type, &payload.entity_id).await?;
            let properties = validate_properties(scheme(entity_type), &payload.properties)?;
            Ok(ValidatedMutation::Properties {
                entity_type,
                id: payload.entity_id,
                properties,
            })
        }
        MutationRequest::Entity(payload) => {
            if !route.is_creation() {
                return Err(LabGraphError::bad_request(
                    "entities can only be created on their type's route",
                ));
            }
            let entity_type = match_route_type(route, &payload.entity_type)?;
            if payload.entity_id != UNASSIGNED_ID {
                return Err(LabGraphError::bad_request(format!(
                    "new entity id must be {UNASSIGNED_ID}, got {}",
                    payload.entity_id
                )));
            }
            let properties = validate_properties(scheme(entity_type), &payload.properties)?;
            let mut edges = Vec::with_capacity(payload.relationships.len());
            for edge in &payload.relationships {
                edges.push(validate_edge(store, route, edge, true).await?);
            }
            ensure_distinct(&edges)?;
            Ok(ValidatedMutation::Entity {
                entity_type,
                properties,
                edges,
            })
        }
        MutationRequest::Relationships(payload) => {
            if route.is_creation() {
                return Err(LabGraphError::bad_request(
                    "relationships must be posted to an existing entity's route",
                ));
            }
            if payload.relationships.is_empty() {
                return Err(LabGraphError::bad_request("no relationships supplied"));
            }
            let mut edges = Vec::with_capacity(payload.relationships.len());
            for edge in &payload.relationships {
                edges.push(validate_edge(store, route, edge, false).await?);
            }
            ensure_distinct(&edges)?;
            Ok(ValidatedMutation::Relationships { edges })
        }
    }
}

fn match_route_type(route: &Route, declared: &str) -> Result<EntityType> {
    let entity_type = resolve_entity_type(declared)?;
    if entity_type != route.entity_type {
        return Err(LabGraphError::bad_request(
            "entity type does not match route's entity type",
        ));
    }
    Ok(entity_type)
}

async fn ensure_exists(store: &dyn GraphStore, entity_type: EntityType, id: &str) -> Result<()> {
    if store.entity_exists(entity_type, id).await? {
        Ok(())
    } else {
        Err(LabGraphError::EntityIdNotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        })
    }
}

/// Reject a payload that names the same directed relationship twice.
fn ensure_distinct(edges: &[ResolvedEdge]) -> Result<()> {
    let mut seen = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !seen.insert((edge.relationship, &edge.source, &edge.destination)) {
            return Err(LabGraphError::RelationshipAlreadyExists {
                relationship: edge.relationship.to_string(),
                source_type: edge.source.entity_type.to_string(),
                source_id: edge.source.id.clone(),
                destination_type: edge.destination.entity_type.to_string(),
                destination_id: edge.destination.id.clone(),
            });
        }
    }
    Ok(())
}

/// Check every key against the scheme's mutable properties and convert the
/// values.
pub fn validate_properties(
    scheme: &EntityScheme,
    properties: &serde_json::Map<String, serde_json::Value>,
) -> Result<PropertyMap> {
    let mut validated = PropertyMap::new();
    for (key, value) in properties {
        if !scheme.is_mutable(key) {
            return Err(LabGraphError::UnknownProperty {
                entity_type: scheme.entity_type.to_string(),
                property: key.clone(),
            });
        }
        validated.insert(key.clone(), PropertyValue::from_json(key, value)?);
    }
    Ok(validated)
}

/// Validate one relationship of a payload posted to `route`.
///
/// With `newly_created`, the route's side refers to the entity being created
/// and must carry the unassigned id; only the other side is checked for
/// existence, and no duplication check is made.
pub async fn validate_edge(
    store: &dyn GraphStore,
    route: &Route,
    edge: &EdgePayload,
    newly_created: bool,
) -> Result<ResolvedEdge> {
    let relationship = resolve_relationship_type(&edge.relationship_type)?;
    let source_type = resolve_entity_type(&edge.source_entity_type)?;
    let destination_type = resolve_entity_type(&edge.destination_entity_type)?;

    if source_type == destination_type {
        return Err(LabGraphError::bad_request(format!(
            "relationships between two {source_type} entities are not supported"
        )));
    }

    let route_is_source = source_type == route.entity_type;
    let route_side_id = if route_is_source {
        &edge.source_entity_id
    } else if destination_type == route.entity_type {
        &edge.destination_entity_id
    } else {
        return Err(LabGraphError::bad_request(format!(
            "relationship {relationship} does not involve the route's entity type {}",
            route.entity_type
        )));
    };
    if *route_side_id != route.entity_id {
        return Err(LabGraphError::bad_request(if newly_created {
            format!("relationships of a new entity must refer to it with id {UNASSIGNED_ID}")
        } else {
            "relationship entity id does not match route's entity id".to_string()
        }));
    }

    for side in [source_type, destination_type] {
        if scheme(side).find_edge(relationship).is_none() {
            return Err(LabGraphError::EntityHasNoSuchRelationship {
                entity_type: side.to_string(),
                relationship: relationship.to_string(),
            });
        }
    }
    let declared = edge_scheme(relationship);
    if declared.source != source_type {
        return Err(LabGraphError::bad_request(format!(
            "relationship direction is reversed: expected {} -[{}]-> {}",
            declared.source, relationship, declared.destination
        )));
    }

    let mut properties = Vec::with_capacity(edge.properties.len());
    for (key, value) in &edge.properties {
        if declared.list_property(key).is_none() {
            return Err(LabGraphError::bad_request(format!(
                "unknown property '{key}' for relationship {relationship}"
            )));
        }
        match PropertyValue::from_json(key, value)? {
            PropertyValue::List(ids) => properties.push((key.clone(), ids)),
            PropertyValue::Text(_) => {
                return Err(LabGraphError::bad_request(format!(
                    "relationship property '{key}' must be a list of ids"
                )))
            }
        }
    }

    let resolved = ResolvedEdge {
        relationship,
        source: EntityRef::new(source_type, edge.source_entity_id.clone()),
        destination: EntityRef::new(destination_type, edge.destination_entity_id.clone()),
        properties,
    };

    if newly_created {
        let other = if route_is_source {
            &resolved.destination
        } else {
            &resolved.source
        };
        ensure_exists(store, other.entity_type, &other.id).await?;
        return Ok(resolved);
    }

    ensure_exists(store, source_type, &resolved.source.id).await?;
    ensure_exists(store, destination_type, &resolved.destination.id).await?;

    if store.relationship_exists(&resolved).await? {
        return Err(LabGraphError::RelationshipAlreadyExists {
            relationship: relationship.to_string(),
            source_type: source_type.to_string(),
            source_id: resolved.source.id,
            destination_type: destination_type.to_string(),
            destination_id: resolved.destination.id,
        });
    }

    Ok(resolved)
}
