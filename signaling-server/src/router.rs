use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::rendezvous::{user_connected, Rendezvous};

#[allow(clippy::unused_async)]
async fn health_handler() -> &'static str {
    "OK"
}

#[allow(clippy::unused_async)]
async fn ws_handler(State(rendezvous): State<Rendezvous>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| user_connected(socket, rendezvous))
}

pub fn create(rendezvous: Rendezvous) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .with_state(rendezvous)
}
