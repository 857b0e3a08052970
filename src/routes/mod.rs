mod health;
mod media;
mod rooms;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the control API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/version", get(health::version))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Media nodes
        .route(
            "/media/nodes",
            get(media::list_nodes).post(media::add_node),
        )
        .route("/media/nodes/{node_id}", delete(media::remove_node))
        .route("/media/nodes/{node_id}/load", post(media::update_load))
        .route("/media/close", post(media::close))
        // Rooms
        .route(
            "/rooms/{room_id}/router",
            post(rooms::get_router).delete(rooms::close_router),
        )
        .route("/candidates", post(rooms::candidates))
}
