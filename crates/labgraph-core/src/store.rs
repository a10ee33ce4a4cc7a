//! The graph access seam used by the validator and the API layer.
//!
//! Implemented over Neo4j by `labgraph-graph`. Every call is a round-trip to
//! the live graph; implementations must not cache across calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::request::PropertyMap;
use crate::types::{EntityType, ResolvedEdge};

/// Properties of a fetched node, as returned to clients.
pub type NodeProperties = serde_json::Map<String, serde_json::Value>;

/// An entity together with the neighbors of each of its page sections.
///
/// `sections[i]` holds the neighbors of `scheme.sections[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRecord {
    pub entity: NodeProperties,
    pub sections: Vec<Vec<NodeProperties>>,
}

/// Outcome of creating an entity together with its relationships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntity {
    pub id: String,
    pub relationships_created: u64,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Whether an entity of this type with this id exists.
    async fn entity_exists(&self, entity_type: EntityType, id: &str) -> Result<bool>;

    /// Whether this exact directed relationship already exists.
    async fn relationship_exists(&self, edge: &ResolvedEdge) -> Result<bool>;

    /// Create an entity with the next free id of its type, plus relationships
    /// whose endpoint of `entity_type` refers to it, all in one transaction.
    async fn create_entity(
        &self,
        entity_type: EntityType,
        properties: &PropertyMap,
        edges: &[ResolvedEdge],
    ) -> Result<CreatedEntity>;

    /// Create relationships between existing entities, returning how many
    /// were created.
    async fn create_relationships(&self, edges: &[ResolvedEdge]) -> Result<u64>;

    /// Set properties on an existing entity, returning how many nodes matched.
    async fn set_properties(
        &self,
        entity_type: EntityType,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<u64>;

    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<NodeProperties>>;

    async fn fetch_page(&self, entity_type: EntityType, id: &str) -> Result<Option<PageRecord>>;

    /// Entities whose display name contains `term`, best matches first.
    async fn search(
        &self,
        entity_type: EntityType,
        term: &str,
        limit: usize,
    ) -> Result<Vec<NodeProperties>>;

    /// Release the store at the end of a request.
    fn release(self: Box<Self>) {}
}

/// A shared store releases its inner store once the last handle is released.
#[async_trait]
impl<T: GraphStore> GraphStore for Arc<T> {
    async fn entity_exists(&self, entity_type: EntityType, id: &str) -> Result<bool> {
        (**self).entity_exists(entity_type, id).await
    }

    async fn relationship_exists(&self, edge: &ResolvedEdge) -> Result<bool> {
        (**self).relationship_exists(edge).await
    }

    async fn create_entity(
        &self,
        entity_type: EntityType,
        properties: &PropertyMap,
        edges: &[ResolvedEdge],
    ) -> Result<CreatedEntity> {
        (**self).create_entity(entity_type, properties, edges).await
    }

    async fn create_relationships(&self, edges: &[ResolvedEdge]) -> Result<u64> {
        (**self).create_relationships(edges).await
    }

    async fn set_properties(
        &self,
        entity_type: EntityType,
        id: &str,
        properties: &PropertyMap,
    ) -> Result<u64> {
        (**self).set_properties(entity_type, id, properties).await
    }

    async fn fetch_all(&self, entity_type: EntityType) -> Result<Vec<NodeProperties>> {
        (**self).fetch_all(entity_type).await
    }

    async fn fetch_page(&self, entity_type: EntityType, id: &str) -> Result<Option<PageRecord>> {
        (**self).fetch_page(entity_type, id).await
    }

    async fn search(
        &self,
        entity_type: EntityType,
        term: &str,
        limit: usize,
    ) -> Result<Vec<NodeProperties>> {
        (**self).search(entity_type, term, limit).await
    }

    fn release(self: Box<Self>) {
        if let Ok(inner) = Arc::try_unwrap(*self) {
            Box::new(inner).release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingStore {
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GraphStore for CountingStore {
        async fn entity_exists(&self, _: EntityType, _: &str) -> Result<bool> {
            Ok(false)
        }

        async fn relationship_exists(&self, _: &ResolvedEdge) -> Result<bool> {
            Ok(false)
        }

        async fn create_entity(
            &self,
            _: EntityType,
            _: &PropertyMap,
            _: &[ResolvedEdge],
        ) -> Result<CreatedEntity> {
            Ok(CreatedEntity {
                id: "1".into(),
                relationships_created: 0,
            })
        }

        async fn create_relationships(&self, _: &[ResolvedEdge]) -> Result<u64> {
            Ok(0)
        }

        async fn set_properties(&self, _: EntityType, _: &str, _: &PropertyMap) -> Result<u64> {
            Ok(0)
        }

        async fn fetch_all(&self, _: EntityType) -> Result<Vec<NodeProperties>> {
            Ok(vec![])
        }

        async fn fetch_page(&self, _: EntityType, _: &str) -> Result<Option<PageRecord>> {
            Ok(None)
        }

        async fn search(&self, _: EntityType, _: &str, _: usize) -> Result<Vec<NodeProperties>> {
            Ok(vec![])
        }

        fn release(self: Box<Self>) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn shared_store_releases_with_its_last_handle() {
        let releases = Arc::new(AtomicUsize::new(0));
        let shared = Arc::new(CountingStore {
            releases: Arc::clone(&releases),
        });
        let other = Arc::clone(&shared);

        let boxed: Box<dyn GraphStore> = Box::new(shared);
        boxed.release();
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        let boxed: Box<dyn GraphStore> = Box::new(other);
        boxed.release();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
