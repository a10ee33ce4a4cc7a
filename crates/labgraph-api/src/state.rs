//! Application state.

use std::sync::Arc;

use labgraph_core::memory::MemoryStore;
use labgraph_core::GraphStore;
use labgraph_graph::GraphClient;

use crate::handlers::HandlerRegistry;

/// Hands out one store per request.
pub trait StoreProvider: Send + Sync {
    fn open(&self) -> Box<dyn GraphStore>;
}

/// Neo4j sessions from a pooled client.
pub struct GraphSessions {
    client: GraphClient,
    id_retry_attempts: u32,
}

impl GraphSessions {
    pub fn new(client: GraphClient, id_retry_attempts: u32) -> Self {
        Self {
            client,
            id_retry_attempts,
        }
    }
}

impl StoreProvider for GraphSessions {
    fn open(&self) -> Box<dyn GraphStore> {
        Box::new(
            self.client
                .session()
                .with_id_retry_attempts(self.id_retry_attempts),
        )
    }
}

/// Every request shares one in-memory graph.
impl StoreProvider for Arc<MemoryStore> {
    fn open(&self) -> Box<dyn GraphStore> {
        Box::new(Arc::clone(self))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<dyn StoreProvider>,
    pub handlers: Arc<HandlerRegistry>,
}

impl AppState {
    pub fn new(stores: Arc<dyn StoreProvider>) -> Self {
        Self {
            stores,
            handlers: Arc::new(HandlerRegistry::new()),
        }
    }

    pub fn open_store(&self) -> Box<dyn GraphStore> {
        self.stores.open()
    }
}
