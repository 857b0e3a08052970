use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppError;
use crate::media::{MediaNode, MediaNodeConfig};
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct LoadRequest {
    pub current_load: i64,
}

fn node_json(node: &MediaNode) -> serde_json::Value {
    serde_json::json!({
        "id": node.id,
        "hostname": node.hostname,
        "port": node.port,
        "turn_hostname": node.turn_hostname,
        "latitude": node.coordinate.latitude,
        "longitude": node.coordinate.longitude,
        "current_load": node.current_load(),
        "capacity": node.capacity(),
        "routers": node.router_count(),
        "closed": node.closed()
    })
}

fn find_node(state: &AppState, node_id: &str) -> Result<Arc<MediaNode>, AppError> {
    state
        .media
        .node(node_id)
        .ok_or_else(|| AppError::NotFound("media_node_not_found".to_string()))
}

pub async fn list_nodes(State(state): State<AppState>) -> Json<serde_json::Value> {
    let nodes: Vec<serde_json::Value> = state
        .media
        .nodes()
        .iter()
        .map(|node| node_json(node))
        .collect();

    Json(serde_json::json!({ "data": nodes }))
}

pub async fn add_node(
    State(state): State<AppState>,
    Json(input): Json<MediaNodeConfig>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let node = state.media.add_node(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "data": node_json(&node) })),
    ))
}

pub async fn remove_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if state.media.remove_node(&node_id).await?.is_none() {
        return Err(AppError::NotFound("media_node_not_found".to_string()));
    }
    for entry in state.rooms.iter() {
        entry.value().remove_media_node(&node_id);
    }

    Ok(Json(serde_json::json!({ "data": { "ok": true } })))
}

pub async fn update_load(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
    Json(input): Json<LoadRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let node = find_node(&state, &node_id)?;
    node.set_load(input.current_load);

    Ok(Json(serde_json::json!({ "data": node_json(&node) })))
}

pub async fn close(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.media.close().await;

    Json(serde_json::json!({ "data": { "ok": true } }))
}
