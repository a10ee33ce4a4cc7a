//! labgraph-graph: Neo4j client for the research-lab knowledge graph.
//!
//! Every graph read and write issued by the API flows through this crate.
//! Statements are built from the scheme registry with only canonical labels,
//! relationship types and property names in their text; request values are
//! always bound as parameters.

pub mod bulk;
pub mod client;
pub mod session;
pub mod statements;
mod store;

pub use bulk::{BulkReport, TableCount};
pub use client::{GraphClient, GraphConfig, GraphError};
pub use session::{AccessMode, GraphSession};
pub use statements::{Param, Statement};
