//! Notification routes
//!
//! | Path | Method | Auth |
//! |------|--------|------|
//! | /v1/msgs/groups | GET | session |
//! | /v1/msgs/pair | GET / DELETE | session |
//! | /v1/msgs/read | PUT | session |
//! | /v1/msgs/unread | GET | session |
//! | /v1/msgs/{send_id} | DELETE | session |

mod handler;

use axum::{
    Router,
    routing::{delete, get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/v1/msgs", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/groups", get(handler::groups))
        .route("/pair", get(handler::pair).delete(handler::delete_pair))
        .route("/read", put(handler::put_read))
        .route("/unread", get(handler::unread))
        .route("/{send_id}", delete(handler::delete_one))
}
