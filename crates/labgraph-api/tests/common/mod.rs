//! Shared helpers for router tests against an in-memory graph.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use labgraph_api::create_router;
use labgraph_api::state::AppState;
use labgraph_core::memory::MemoryStore;
use labgraph_core::EntityType;

/// A small graph: Lab 3, Researcher 7, Product 2, Faculty 1.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_entity(EntityType::Lab, "3", json!({ "labName": "Photonics" }))
        .unwrap();
    store
        .insert_entity(
            EntityType::Researcher,
            "7",
            json!({ "researcherName": "Ada Lovelace", "researcherActive": "true" }),
        )
        .unwrap();
    store
        .insert_entity(
            EntityType::Product,
            "2",
            json!({ "productName": "Laser", "productActive": "true" }),
        )
        .unwrap();
    store
        .insert_entity(EntityType::Faculty, "1", json!({ "facultyName": "Physics" }))
        .unwrap();
    store
}

pub fn app(store: &Arc<MemoryStore>) -> Router {
    create_router(AppState::new(Arc::new(Arc::clone(store))))
}

pub async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}
