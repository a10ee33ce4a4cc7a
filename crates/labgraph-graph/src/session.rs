//! Per-request graph sessions.
//!
//! A session is opened by the request handler, tagged with a request id,
//! and released on every exit path: explicitly through [`GraphSession::close`]
//! or, on early return, when it is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use neo4rs::Row;
use serde_json::Value;
use uuid::Uuid;

use labgraph_core::store::NodeProperties;

use crate::client::{GraphClient, GraphError};
use crate::statements::Statement;

/// Default number of attempts for entity creation when a concurrent
/// creation took the same id.
pub const DEFAULT_ID_RETRY_ATTEMPTS: u32 = 3;

/// Whether a statement reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// A unit of graph work scoped to one request.
pub struct GraphSession {
    client: GraphClient,
    request_id: Uuid,
    opened: Instant,
    pub(crate) id_retry_attempts: u32,
    failed: AtomicBool,
    closed: AtomicBool,
}

impl GraphSession {
    pub(crate) fn new(client: GraphClient) -> Self {
        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, "Opened graph session");
        Self {
            client,
            request_id,
            opened: Instant::now(),
            id_retry_attempts: DEFAULT_ID_RETRY_ATTEMPTS,
            failed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Bound the retries of entity creation on id collisions.
    pub fn with_id_retry_attempts(mut self, attempts: u32) -> Self {
        self.id_retry_attempts = attempts.max(1);
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Run one statement and collect its rows.
    ///
    /// Reads stream their rows directly; writes run in a transaction that is
    /// committed only if the statement succeeds.
    pub async fn execute(
        &self,
        statement: &Statement,
        mode: AccessMode,
    ) -> Result<Vec<Row>, GraphError> {
        let result = match mode {
            AccessMode::Read => self.client.query_rows(statement.to_query()).await,
            AccessMode::Write => self.write(std::slice::from_ref(statement)).await,
        };
        self.observe(result, mode)
    }

    /// Run dependent statements in one write transaction.
    ///
    /// `next` builds each following statement from the rows of the previous
    /// one; returning `None` stops the chain. Rows of every executed
    /// statement are returned in order.
    pub async fn execute_chain<F>(
        &self,
        first: Statement,
        mut next: F,
    ) -> Result<Vec<Vec<Row>>, GraphError>
    where
        F: FnMut(&[Row]) -> Result<Option<Statement>, GraphError> + Send,
    {
        let result: Result<Vec<Vec<Row>>, GraphError> = async {
            let mut txn = self.client.start_txn().await?;
            let mut outputs: Vec<Vec<Row>> = Vec::new();
            let mut current = Some(first);
            while let Some(statement) = current.take() {
                let rows = match fetch(&mut txn, &statement).await {
                    Ok(rows) => rows,
                    Err(e) => {
                        let _ = txn.rollback().await;
                        return Err(e);
                    }
                };
                current = match next(&rows) {
                    Ok(following) => following,
                    Err(e) => {
                        let _ = txn.rollback().await;
                        return Err(e);
                    }
                };
                outputs.push(rows);
            }
            txn.commit().await?;
            Ok(outputs)
        }
        .await;
        self.observe(result, AccessMode::Write)
    }

    async fn write(&self, statements: &[Statement]) -> Result<Vec<Row>, GraphError> {
        let mut txn = self.client.start_txn().await?;
        let mut rows = Vec::new();
        for statement in statements {
            match fetch(&mut txn, statement).await {
                Ok(mut batch) => rows.append(&mut batch),
                Err(e) => {
                    let _ = txn.rollback().await;
                    return Err(e);
                }
            }
        }
        txn.commit().await?;
        Ok(rows)
    }

    fn observe<T>(&self, result: Result<T, GraphError>, mode: AccessMode) -> Result<T, GraphError> {
        if let Err(e) = &result {
            self.failed.store(true, Ordering::Relaxed);
            tracing::error!(
                request_id = %self.request_id,
                ?mode,
                error = %e,
                "Graph statement failed"
            );
        }
        result
    }

    /// Release the session.
    pub fn close(self) {
        self.release_once("closed");
    }

    fn release_once(&self, how: &str) {
        if self.closed.swap(true, Ordering::Relaxed) {
            return;
        }
        tracing::debug!(
            request_id = %self.request_id,
            failed = self.has_failed(),
            elapsed_ms = self.opened.elapsed().as_millis() as u64,
            how,
            "Released graph session"
        );
    }
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        self.release_once("dropped");
    }
}

async fn fetch(txn: &mut neo4rs::Txn, statement: &Statement) -> Result<Vec<Row>, GraphError> {
    let mut stream = txn.execute(statement.to_query()).await?;
    let mut rows = Vec::new();
    while let Some(row) = stream.next(txn.handle()).await? {
        rows.push(row);
    }
    Ok(rows)
}

// ── Row Decoding ─────────────────────────────────────────────────

/// Read an integer column, treating a missing row as zero.
pub(crate) fn count_column(rows: &[Row], column: &str) -> Result<i64, GraphError> {
    match rows.first() {
        Some(row) => row
            .get::<i64>(column)
            .map_err(|e| GraphError::Serialization(format!("Failed to read {column}: {e}"))),
        None => Ok(0),
    }
}

pub(crate) fn node_column(row: &Row, column: &str) -> Result<NodeProperties, GraphError> {
    let node: neo4rs::Node = row
        .get(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to deserialize node: {e}")))?;
    Ok(node_properties(&node))
}

pub(crate) fn node_list_column(row: &Row, column: &str) -> Result<Vec<NodeProperties>, GraphError> {
    let nodes: Vec<neo4rs::Node> = row
        .get(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to deserialize {column}: {e}")))?;
    Ok(nodes.iter().map(node_properties).collect())
}

/// Convert a node's properties to JSON, keeping every key.
pub(crate) fn node_properties(node: &neo4rs::Node) -> NodeProperties {
    let mut props = NodeProperties::new();
    for key in node.keys() {
        if let Some(value) = property_value(node, key) {
            props.insert(key.to_string(), value);
        }
    }
    props
}

fn property_value(node: &neo4rs::Node, key: &str) -> Option<Value> {
    if let Ok(s) = node.get::<String>(key) {
        return Some(Value::String(s));
    }
    if let Ok(b) = node.get::<bool>(key) {
        return Some(Value::Bool(b));
    }
    if let Ok(i) = node.get::<i64>(key) {
        return Some(Value::from(i));
    }
    if let Ok(f) = node.get::<f64>(key) {
        return serde_json::Number::from_f64(f).map(Value::Number);
    }
    if let Ok(items) = node.get::<Vec<String>>(key) {
        return Some(Value::Array(items.into_iter().map(Value::String).collect()));
    }
    None
}
