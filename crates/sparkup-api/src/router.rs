//! Route definitions for the SparkUp HTTP API.
//!
//! REST routes are mounted under `/api`; the WebSocket upgrade lives at
//! `/ws`.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Build the router and thread `AppState` through every route.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new().merge(chat_routes()).merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .with_state(state)
}

/// Chat endpoints: room list, history, members
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/chat/rooms/{id}", post(handlers::chat::list_rooms))
        .route("/chat/rooms/{id}/members", get(handlers::chat::list_members))
        .route("/chat/messages", post(handlers::chat::message_history))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
