//! labgraph-core: Entity schemes, request validation, and shared types for LabGraph.
//!
//! This crate holds everything about the research-lab knowledge graph that
//! does not depend on a particular database driver:
//! - Entity and relationship types, with case-insensitive resolution
//! - The scheme registry describing ids, properties, edges and page sections
//! - Client mutation payloads and their validation against the live graph
//! - The `GraphStore` seam the validator and API talk to, with an in-memory implementation
//! - Shaping of fetched records into page documents
//! - The error taxonomy shared by every layer

pub mod error;
pub mod memory;
pub mod request;
pub mod scheme;
pub mod shape;
pub mod store;
pub mod types;
pub mod validate;

pub use error::{ErrorKind, LabGraphError, Result};
pub use scheme::{EdgeScheme, EntityScheme};
pub use store::GraphStore;
pub use types::{EntityType, RelationshipType};
