//! Red-packet routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /v1/redpackets | POST | session |
//! | /v1/redpackets/sent | GET | session |
//! | /v1/redpackets/claimed | GET | session |
//! | /v1/redpackets/{id} | GET | session |
//! | /v1/redpackets/{id}/claim | POST | session |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/redpackets", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create))
        .route("/sent", get(handler::sent))
        .route("/claimed", get(handler::claimed))
        .route("/{id}", get(handler::detail))
        .route("/{id}/claim", post(handler::claim))
}
