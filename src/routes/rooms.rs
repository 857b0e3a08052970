use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::geo::Coordinate;
use crate::room::{Peer, Room};
use crate::state::AppState;

#[derive(serde::Deserialize)]
pub struct PeerRequest {
    pub peer_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl PeerRequest {
    fn peer(&self) -> Result<Peer, AppError> {
        let coordinate = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                let c = Coordinate::new(latitude, longitude);
                if !c.is_valid() {
                    return Err(AppError::BadRequest("invalid peer coordinate".to_string()));
                }
                Some(c)
            }
            (None, None) => None,
            _ => {
                return Err(AppError::BadRequest(
                    "latitude and longitude must be given together".to_string(),
                ))
            }
        };
        Ok(Peer::new(&self.peer_id, coordinate))
    }
}

#[derive(serde::Deserialize)]
pub struct CandidatesRequest {
    pub room_id: String,
    #[serde(flatten)]
    pub peer: PeerRequest,
}

pub async fn get_router(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(input): Json<PeerRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let peer = input.peer()?;
    let room = state.room(&room_id);
    let (router, node) = state.media.get_router(&room, &peer).await?;
    room.add_media_node(&node.id);

    Ok(Json(serde_json::json!({
        "data": {
            "room_id": room.id,
            "session_id": room.session_id,
            "router": router,
            "media_node": {
                "id": node.id,
                "hostname": node.hostname,
                "port": node.port,
                "turn_hostname": node.turn_hostname
            }
        }
    })))
}

pub async fn candidates(
    State(state): State<AppState>,
    Json(input): Json<CandidatesRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let peer = input.peer.peer()?;
    let room = state
        .find_room(&input.room_id)
        .unwrap_or_else(|| Arc::new(Room::new(&input.room_id, "")));
    let candidates = state.media.candidates(&room, &peer)?;

    Ok(Json(serde_json::json!({ "data": candidates })))
}

/// Closes the room's routers on every node serving it and forgets the room.
pub async fn close_router(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let room = state
        .remove_room(&room_id)
        .ok_or_else(|| AppError::NotFound("room_not_found".to_string()))?;

    let mut closed = 0;
    for node_id in room.media_node_ids() {
        let Some(node) = state.media.node(&node_id) else {
            continue;
        };
        if node.close_router(&room.session_id).await.is_some() {
            closed += 1;
        }
    }
    tracing::info!("closed room {} ({closed} routers)", room.id);

    Ok(Json(serde_json::json!({ "data": { "room_id": room.id, "closed": closed } })))
}
