//! Route handlers.
//!
//! Every handler that touches the graph opens one store for the request and
//! releases it before the response is built, whatever the outcome.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use labgraph_core::request::MutationRequest;
use labgraph_core::scheme::EntityScheme;
use labgraph_core::validate::Route;
use labgraph_core::LabGraphError;

use crate::error::ApiResult;
use crate::service::{self, Confirmation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── Schemes ──────────────────────────────────────────────────────

pub async fn list_schemes(State(state): State<AppState>) -> Json<Vec<&'static EntityScheme>> {
    Json(state.handlers.all().map(|h| h.scheme()).collect())
}

pub async fn get_scheme(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<&'static EntityScheme>> {
    Ok(Json(state.handlers.get(&entity_type)?.scheme()))
}

// ── Reads ────────────────────────────────────────────────────────

pub async fn get_all(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<Value>> {
    let handler = state.handlers.get(&entity_type)?;
    let store = state.open_store();
    let result = handler.get_all(store.as_ref()).await;
    store.release();
    Ok(Json(result?))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let handler = state.handlers.get(&entity_type)?;
    let store = state.open_store();
    let result = handler.get_by_id(store.as_ref(), &id).await;
    store.release();
    Ok(Json(result?))
}

pub async fn search(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Value>> {
    let handler = state.handlers.get(&entity_type)?;
    let store = state.open_store();
    let result = handler.search(store.as_ref(), &params.q).await;
    store.release();
    Ok(Json(result?))
}

// ── Mutations ────────────────────────────────────────────────────

/// `POST /entity/{type}`: create an entity.
pub async fn create_entity(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Confirmation>)> {
    let route = Route::creation(&entity_type)?;
    submit(&state, &route, &body).await
}

/// `POST /entity/{type}/{id}`: set properties or create relationships,
/// depending on the payload's `object` tag.
pub async fn mutate_entity(
    State(state): State<AppState>,
    Path((entity_type, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Confirmation>)> {
    let route = Route::existing(&entity_type, id)?;
    submit(&state, &route, &body).await
}

async fn submit(
    state: &AppState,
    route: &Route,
    body: &[u8],
) -> ApiResult<(StatusCode, Json<Confirmation>)> {
    let request = parse_request(body)?;
    let store = state.open_store();
    let result = service::submit(store.as_ref(), route, request).await;
    store.release();

    let confirmation = result?;
    let status = StatusCode::from_u16(confirmation.status).unwrap_or(StatusCode::OK);
    Ok((status, Json(confirmation)))
}

fn parse_request(body: &[u8]) -> Result<MutationRequest, LabGraphError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| LabGraphError::bad_request(format!("invalid JSON body: {e}")))?;
    MutationRequest::from_json(value)
}
