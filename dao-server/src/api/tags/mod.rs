//! Tag routes

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/tags", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/hot", get(handler::hot))
}
