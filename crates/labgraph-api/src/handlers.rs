//! Per-entity-type read handlers.

use std::collections::BTreeMap;

use serde_json::Value;

use labgraph_core::scheme::{scheme, EntityScheme, SECTION_LIMIT};
use labgraph_core::shape::{shape_list, shape_page};
use labgraph_core::types::{resolve_entity_type, EntityType};
use labgraph_core::{GraphStore, LabGraphError, Result};

/// Read operations for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityHandler {
    scheme: &'static EntityScheme,
}

impl EntityHandler {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            scheme: scheme(entity_type),
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.scheme.entity_type
    }

    pub fn scheme(&self) -> &'static EntityScheme {
        self.scheme
    }

    /// The page document of one entity.
    pub async fn get_by_id(&self, store: &dyn GraphStore, id: &str) -> Result<Value> {
        match store.fetch_page(self.entity_type(), id).await? {
            Some(record) => Ok(shape_page(self.scheme, record)),
            None => Err(LabGraphError::EntityIdNotFound {
                entity_type: self.entity_type().to_string(),
                id: id.to_string(),
            }),
        }
    }

    pub async fn get_all(&self, store: &dyn GraphStore) -> Result<Value> {
        Ok(shape_list(store.fetch_all(self.entity_type()).await?))
    }

    /// Best matches of `term` against the display name.
    pub async fn search(&self, store: &dyn GraphStore, term: &str) -> Result<Value> {
        let hits = store
            .search(self.entity_type(), term.trim(), SECTION_LIMIT)
            .await?;
        Ok(shape_list(hits))
    }
}

/// Handlers keyed by canonical entity type.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<EntityType, EntityHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: EntityType::ALL
                .into_iter()
                .map(|t| (t, EntityHandler::new(t)))
                .collect(),
        }
    }

    /// Resolve a client-supplied type name to its handler.
    pub fn get(&self, name: &str) -> Result<&EntityHandler> {
        let entity_type = resolve_entity_type(name)?;
        self.handlers
            .get(&entity_type)
            .ok_or_else(|| LabGraphError::EntityTypeNotFound(name.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = &EntityHandler> {
        self.handlers.values()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
