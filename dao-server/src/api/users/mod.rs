//! User profile routes

mod handler;

use axum::{Router, routing::get, routing::put};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/users", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/me", put(handler::update_me))
        .route("/{address}", get(handler::profile))
        .route("/{address}/posts", get(handler::posts_of))
}
